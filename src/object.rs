//! Classification of live runtime objects.
//!
//! The host runtime exposes its reflection through [`Introspect`];
//! [`classify`] maps an object onto the closed set of [`InspectObject`]
//! kinds, each of which has its own lookup strategy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CinspectError, Result};

/// What the host's own reflection returns for objects defined in the
/// dynamic language itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSource {
    pub source: String,
    #[serde(default)]
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
}

/// The object a built-in method is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Receiver {
    /// Bound to a class, as class methods are.
    Type { name: String },
    /// Bound to an instance of `class_name`.
    Instance { class_name: String },
}

/// Reflection capabilities of the host runtime.
pub trait Introspect {
    /// `None` when native reflection cannot produce source for the object.
    fn native_source(&self) -> Option<NativeSource>;
    fn is_builtin(&self) -> bool;
    fn is_method_descriptor(&self) -> bool;
    fn is_module(&self) -> bool;
    fn is_type(&self) -> bool;
    fn name(&self) -> Option<String>;
    /// Declaring module; absent for methods bound to a receiver.
    fn module_name(&self) -> Option<String>;
    fn receiver(&self) -> Option<Receiver>;
    /// Class a method descriptor was declared on.
    fn owner_type(&self) -> Option<String>;
    /// Runtime class of the object.
    fn class_of(&self) -> Option<TypeInfo>;
}

/// A reflection snapshot taken by the embedding host, usually shipped as
/// JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeObject {
    pub name: Option<String>,
    pub module: Option<String>,
    pub builtin: bool,
    pub method_descriptor: bool,
    pub module_object: bool,
    pub type_object: bool,
    pub receiver: Option<Receiver>,
    pub owner: Option<String>,
    pub class: Option<TypeInfo>,
    pub source: Option<String>,
    pub file: Option<PathBuf>,
}

impl Introspect for RuntimeObject {
    fn native_source(&self) -> Option<NativeSource> {
        self.source.as_ref().map(|source| NativeSource {
            source: source.clone(),
            file: self.file.clone().unwrap_or_default(),
        })
    }

    fn is_builtin(&self) -> bool {
        self.builtin
    }

    fn is_method_descriptor(&self) -> bool {
        self.method_descriptor
    }

    fn is_module(&self) -> bool {
        self.module_object
    }

    fn is_type(&self) -> bool {
        self.type_object
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn module_name(&self) -> Option<String> {
        self.module.clone()
    }

    fn receiver(&self) -> Option<Receiver> {
        self.receiver.clone()
    }

    fn owner_type(&self) -> Option<String> {
        self.owner.clone()
    }

    fn class_of(&self) -> Option<TypeInfo> {
        self.class.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectObject {
    /// Defined in the dynamic language; native reflection handles it.
    Plain { name: String, native: NativeSource },
    BuiltinFunction {
        name: String,
        module: Option<String>,
    },
    BuiltinMethod {
        name: String,
        module: Option<String>,
        receiver: Option<Receiver>,
    },
    MethodDescriptor { name: String, owner: Option<String> },
    Module { name: String },
    Type { name: String, module: Option<String> },
}

impl InspectObject {
    pub fn function(name: impl Into<String>, module: Option<String>) -> Self {
        Self::BuiltinFunction {
            name: name.into(),
            module,
        }
    }

    pub fn bound_method(name: impl Into<String>, receiver: Receiver) -> Self {
        Self::BuiltinMethod {
            name: name.into(),
            module: None,
            receiver: Some(receiver),
        }
    }

    pub fn descriptor(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::MethodDescriptor {
            name: name.into(),
            owner: Some(owner.into()),
        }
    }

    pub fn module(name: impl Into<String>) -> Self {
        Self::Module { name: name.into() }
    }

    pub fn type_(name: impl Into<String>) -> Self {
        Self::Type {
            name: name.into(),
            module: None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Plain { name, .. }
            | Self::BuiltinFunction { name, .. }
            | Self::BuiltinMethod { name, .. }
            | Self::MethodDescriptor { name, .. }
            | Self::Module { name }
            | Self::Type { name, .. } => name,
        }
    }

    pub fn module_name(&self) -> Option<&str> {
        match self {
            Self::BuiltinFunction { module, .. }
            | Self::BuiltinMethod { module, .. }
            | Self::Type { module, .. } => module.as_deref(),
            Self::Plain { .. } | Self::MethodDescriptor { .. } | Self::Module { .. } => None,
        }
    }

    /// Enclosing type: the receiver itself for class-bound methods, the
    /// receiver's class for instance-bound ones.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::BuiltinMethod { receiver, .. } => match receiver.as_ref()? {
                Receiver::Type { name } => Some(name.as_str()),
                Receiver::Instance { class_name } => Some(class_name.as_str()),
            },
            Self::MethodDescriptor { owner, .. } => owner.as_deref(),
            Self::Type { name, .. } => Some(name.as_str()),
            Self::Plain { .. } | Self::BuiltinFunction { .. } | Self::Module { .. } => None,
        }
    }
}

/// First match wins, in this order: native source, built-in callable,
/// method descriptor, module, type, instance of a type.
pub fn classify(obj: &dyn Introspect) -> Result<InspectObject> {
    if let Some(native) = obj.native_source() {
        return Ok(InspectObject::Plain {
            name: obj.name().unwrap_or_default(),
            native,
        });
    }

    if obj.is_builtin() {
        let name = required_name(obj)?;
        return Ok(match obj.module_name() {
            None => InspectObject::BuiltinMethod {
                name,
                module: None,
                receiver: obj.receiver(),
            },
            Some(module) => InspectObject::BuiltinFunction {
                name,
                module: Some(module),
            },
        });
    }

    if obj.is_method_descriptor() {
        return Ok(InspectObject::MethodDescriptor {
            name: required_name(obj)?,
            owner: obj.owner_type(),
        });
    }

    if obj.is_module() {
        return Ok(InspectObject::Module {
            name: required_name(obj)?,
        });
    }

    if obj.is_type() {
        return Ok(InspectObject::Type {
            name: required_name(obj)?,
            module: obj.module_name(),
        });
    }

    if let Some(class) = obj.class_of() {
        return Ok(InspectObject::Type {
            name: class.name,
            module: class.module,
        });
    }

    Err(CinspectError::UnsupportedObjectKind(
        obj.name().unwrap_or_else(|| "<anonymous>".to_string()),
    ))
}

fn required_name(obj: &dyn Introspect) -> Result<String> {
    obj.name()
        .ok_or_else(|| CinspectError::UnsupportedObjectKind("object without a name".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin(name: &str) -> RuntimeObject {
        RuntimeObject {
            name: Some(name.to_string()),
            builtin: true,
            ..RuntimeObject::default()
        }
    }

    #[test]
    fn native_source_takes_priority() -> anyhow::Result<()> {
        let obj = RuntimeObject {
            source: Some("def f():\n    pass\n".to_string()),
            file: Some(PathBuf::from("/lib/f.py")),
            ..builtin("f")
        };
        let InspectObject::Plain { native, .. } = classify(&obj)? else {
            panic!("expected a plain object");
        };
        assert_eq!(native.file, PathBuf::from("/lib/f.py"));
        Ok(())
    }

    #[test]
    fn builtin_with_module_is_a_function() -> anyhow::Result<()> {
        let obj = RuntimeObject {
            module: Some("gc".to_string()),
            ..builtin("collect")
        };
        let classified = classify(&obj)?;
        assert_eq!(
            classified,
            InspectObject::function("collect", Some("gc".to_string()))
        );
        assert_eq!(classified.type_name(), None);
        assert_eq!(classified.module_name(), Some("gc"));
        Ok(())
    }

    #[test]
    fn bound_method_type_name_follows_receiver() -> anyhow::Result<()> {
        let on_instance = RuntimeObject {
            receiver: Some(Receiver::Instance {
                class_name: "list".to_string(),
            }),
            ..builtin("append")
        };
        assert_eq!(classify(&on_instance)?.type_name(), Some("list"));

        let on_class = RuntimeObject {
            receiver: Some(Receiver::Type {
                name: "dict".to_string(),
            }),
            ..builtin("fromkeys")
        };
        let classified = classify(&on_class)?;
        assert!(matches!(classified, InspectObject::BuiltinMethod { .. }));
        assert_eq!(classified.type_name(), Some("dict"));
        Ok(())
    }

    #[test]
    fn descriptor_uses_owner_and_ignores_module() -> anyhow::Result<()> {
        let obj = RuntimeObject {
            name: Some("append".to_string()),
            module: Some("builtins".to_string()),
            method_descriptor: true,
            owner: Some("list".to_string()),
            ..RuntimeObject::default()
        };
        let classified = classify(&obj)?;
        assert_eq!(classified.type_name(), Some("list"));
        assert_eq!(classified.module_name(), None);
        Ok(())
    }

    #[test]
    fn modules_types_and_instances() -> anyhow::Result<()> {
        let module = RuntimeObject {
            name: Some("gc".to_string()),
            module_object: true,
            ..RuntimeObject::default()
        };
        assert_eq!(classify(&module)?, InspectObject::module("gc"));

        let ty = RuntimeObject {
            name: Some("list".to_string()),
            type_object: true,
            ..RuntimeObject::default()
        };
        assert_eq!(classify(&ty)?.type_name(), Some("list"));

        let instance = RuntimeObject {
            class: Some(TypeInfo {
                name: "set".to_string(),
                module: Some("builtins".to_string()),
            }),
            ..RuntimeObject::default()
        };
        assert_eq!(classify(&instance)?.name(), "set");
        Ok(())
    }

    #[test]
    fn unrecognized_objects_are_rejected() {
        let err = classify(&RuntimeObject::default()).unwrap_err();
        assert!(matches!(err, CinspectError::UnsupportedObjectKind(_)));
    }

    #[test]
    fn snapshot_deserializes_from_json() -> anyhow::Result<()> {
        let obj: RuntimeObject = serde_json::from_str(
            r#"{
                "name": "append",
                "builtin": true,
                "receiver": {"instance": {"class_name": "list"}}
            }"#,
        )?;
        let expected = InspectObject::bound_method(
            "append",
            Receiver::Instance {
                class_name: "list".to_string(),
            },
        );
        assert_eq!(classify(&obj)?, expected);
        Ok(())
    }
}
