//! Per-namespace identifiers of classes, methods and fields

use crate::classfile::descriptor::parse_method_descriptor;
use crate::classfile::ClassFileResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassIdentifier {
    /// Internal binary name, e.g. `a/b/C`
    pub name: String,
    pub namespace: String,
}

impl ClassIdentifier {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { name: name.into(), namespace: namespace.into() }
    }
}

/// A method is identified by its name and parameter types. The return type
/// is kept on the `MethodMapping` itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodIdentifier {
    pub name: String,
    /// Field descriptors of the parameters, in order
    pub parameters: Vec<String>,
    pub namespace: String,
}

impl MethodIdentifier {
    pub fn new(name: impl Into<String>, parameters: Vec<String>, namespace: impl Into<String>) -> Self {
        Self { name: name.into(), parameters, namespace: namespace.into() }
    }

    /// Identifier for `name` with the parameters of a method `descriptor`
    pub fn from_descriptor(name: &str, descriptor: &str, namespace: &str) -> ClassFileResult<Self> {
        let (parameters, _) = parse_method_descriptor(descriptor)?;
        Ok(Self::new(name, parameters.into_iter().map(str::to_string).collect(), namespace))
    }

    pub fn descriptor(&self, return_type: &str) -> String {
        crate::classfile::descriptor::method_descriptor(&self.parameters, return_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldIdentifier {
    pub name: String,
    pub namespace: String,
}

impl FieldIdentifier {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { name: name.into(), namespace: namespace.into() }
    }
}
