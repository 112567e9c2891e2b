//! In-memory mapping model
//!
//! Every class, method and field mapping is shared behind an `Arc` and indexed
//! under each of its per-namespace identifiers, so a lookup works from any
//! namespace the node carries a name in.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::identifier::{ClassIdentifier, FieldIdentifier, MethodIdentifier};
use crate::classfile::descriptor::{parse_method_descriptor, validate_field_descriptor};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct MethodMapping {
    identifiers: HashMap<String, MethodIdentifier>,
    return_types: HashMap<String, String>,
    /// Sparse parameter index -> namespace -> name
    parameter_names: BTreeMap<u32, HashMap<String, String>>,
}

impl MethodMapping {
    pub fn identifier(&self, namespace: &str) -> Option<&MethodIdentifier> {
        self.identifiers.get(namespace)
    }

    pub fn return_type(&self, namespace: &str) -> Option<&str> {
        self.return_types.get(namespace).map(String::as_str)
    }

    /// Full method descriptor in `namespace`
    pub fn descriptor(&self, namespace: &str) -> Option<String> {
        let identifier = self.identifier(namespace)?;
        Some(identifier.descriptor(self.return_type(namespace)?))
    }

    pub fn parameter_names(&self) -> &BTreeMap<u32, HashMap<String, String>> {
        &self.parameter_names
    }

    pub fn parameter_name(&self, index: u32, namespace: &str) -> Option<&str> {
        self.parameter_names.get(&index)?.get(namespace).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct FieldMapping {
    identifiers: HashMap<String, FieldIdentifier>,
    types: HashMap<String, String>,
}

impl FieldMapping {
    pub fn identifier(&self, namespace: &str) -> Option<&FieldIdentifier> {
        self.identifiers.get(namespace)
    }

    /// Field descriptor in `namespace`
    pub fn field_type(&self, namespace: &str) -> Option<&str> {
        self.types.get(namespace).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct ClassMapping {
    identifiers: HashMap<String, ClassIdentifier>,
    methods: HashMap<MethodIdentifier, Arc<MethodMapping>>,
    fields: HashMap<FieldIdentifier, Arc<FieldMapping>>,
    method_list: Vec<Arc<MethodMapping>>,
    field_list: Vec<Arc<FieldMapping>>,
}

impl ClassMapping {
    pub fn identifier(&self, namespace: &str) -> Option<&ClassIdentifier> {
        self.identifiers.get(namespace)
    }

    pub fn method(&self, identifier: &MethodIdentifier) -> Option<&MethodMapping> {
        self.methods.get(identifier).map(Arc::as_ref)
    }

    pub fn field(&self, identifier: &FieldIdentifier) -> Option<&FieldMapping> {
        self.fields.get(identifier).map(Arc::as_ref)
    }

    /// Each method mapping once, in insertion order
    pub fn methods(&self) -> impl Iterator<Item = &MethodMapping> {
        self.method_list.iter().map(Arc::as_ref)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.field_list.iter().map(Arc::as_ref)
    }
}

#[derive(Debug, Default)]
pub struct ArchiveMapping {
    namespaces: BTreeSet<String>,
    classes: HashMap<ClassIdentifier, Arc<ClassMapping>>,
    class_list: Vec<Arc<ClassMapping>>,
}

impl ArchiveMapping {
    pub fn builder() -> ArchiveMappingBuilder {
        ArchiveMappingBuilder::default()
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }

    pub fn class(&self, identifier: &ClassIdentifier) -> Option<&ClassMapping> {
        self.classes.get(identifier).map(Arc::as_ref)
    }

    pub fn class_by_name(&self, name: &str, namespace: &str) -> Option<&ClassMapping> {
        self.class(&ClassIdentifier::new(name, namespace))
    }

    /// Each class mapping once, in insertion order
    pub fn classes(&self) -> impl Iterator<Item = &ClassMapping> {
        self.class_list.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.class_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.class_list.is_empty()
    }

    /// Name of class `name` from namespace `from` in namespace `to`
    pub fn map_class_name(&self, name: &str, from: &str, to: &str) -> Option<&str> {
        self.class_by_name(name, from)?.identifier(to).map(|id| id.name.as_str())
    }
}

/// Names of one method across namespaces
#[derive(Debug, Default, Clone)]
pub struct MethodMappingBuilder {
    names: Vec<(String, String, String)>,
    parameters: Vec<(u32, String, String)>,
}

impl MethodMappingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The method's name and full descriptor in `namespace`
    pub fn name(mut self, namespace: &str, name: &str, descriptor: &str) -> Self {
        self.names.push((namespace.to_string(), name.to_string(), descriptor.to_string()));
        self
    }

    pub fn parameter(mut self, index: u32, namespace: &str, name: &str) -> Self {
        self.parameters.push((index, namespace.to_string(), name.to_string()));
        self
    }

    fn build(self, owner: &str) -> Result<MethodMapping> {
        let mut mapping = MethodMapping::default();
        for (namespace, name, descriptor) in self.names {
            let (parameters, return_type) = parse_method_descriptor(&descriptor).map_err(|e| {
                Error::malformed_mapping(format!("{}.{}", owner, name), e.to_string())
            })?;
            let parameters = parameters.into_iter().map(str::to_string).collect();
            mapping.return_types.insert(namespace.clone(), return_type.to_string());
            mapping
                .identifiers
                .insert(namespace.clone(), MethodIdentifier::new(name, parameters, namespace));
        }
        for (index, namespace, name) in self.parameters {
            mapping.parameter_names.entry(index).or_default().insert(namespace, name);
        }
        Ok(mapping)
    }
}

/// Names of one field across namespaces
#[derive(Debug, Default, Clone)]
pub struct FieldMappingBuilder {
    names: Vec<(String, String, String)>,
}

impl FieldMappingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, namespace: &str, name: &str, descriptor: &str) -> Self {
        self.names.push((namespace.to_string(), name.to_string(), descriptor.to_string()));
        self
    }

    fn build(self, owner: &str) -> Result<FieldMapping> {
        let mut mapping = FieldMapping::default();
        for (namespace, name, descriptor) in self.names {
            validate_field_descriptor(&descriptor).map_err(|e| {
                Error::malformed_mapping(format!("{}.{}", owner, name), e.to_string())
            })?;
            mapping.types.insert(namespace.clone(), descriptor);
            mapping.identifiers.insert(namespace.clone(), FieldIdentifier::new(name, namespace));
        }
        Ok(mapping)
    }
}

/// Names of one class across namespaces, with its members
#[derive(Debug, Default, Clone)]
pub struct ClassMappingBuilder {
    names: Vec<(String, String)>,
    methods: Vec<MethodMappingBuilder>,
    fields: Vec<FieldMappingBuilder>,
}

impl ClassMappingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, namespace: &str, name: &str) -> Self {
        self.names.push((namespace.to_string(), name.to_string()));
        self
    }

    pub fn method(mut self, method: MethodMappingBuilder) -> Self {
        self.methods.push(method);
        self
    }

    pub fn field(mut self, field: FieldMappingBuilder) -> Self {
        self.fields.push(field);
        self
    }

    fn build(self) -> Result<ClassMapping> {
        let owner = self.names.first().map(|(_, name)| name.clone()).unwrap_or_default();
        let mut mapping = ClassMapping::default();
        for (namespace, name) in self.names {
            mapping.identifiers.insert(namespace.clone(), ClassIdentifier::new(name, namespace));
        }
        for method in self.methods {
            let method = Arc::new(method.build(&owner)?);
            for identifier in method.identifiers.values() {
                if mapping.methods.insert(identifier.clone(), method.clone()).is_some() {
                    return Err(Error::malformed_mapping(
                        format!("{}.{}", owner, identifier.name),
                        format!("method mapped twice in namespace {}", identifier.namespace),
                    ));
                }
            }
            mapping.method_list.push(method);
        }
        for field in self.fields {
            let field = Arc::new(field.build(&owner)?);
            for identifier in field.identifiers.values() {
                if mapping.fields.insert(identifier.clone(), field.clone()).is_some() {
                    return Err(Error::malformed_mapping(
                        format!("{}.{}", owner, identifier.name),
                        format!("field mapped twice in namespace {}", identifier.namespace),
                    ));
                }
            }
            mapping.field_list.push(field);
        }
        Ok(mapping)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ArchiveMappingBuilder {
    classes: Vec<ClassMappingBuilder>,
}

impl ArchiveMappingBuilder {
    pub fn class(mut self, class: ClassMappingBuilder) -> Self {
        self.classes.push(class);
        self
    }

    /// Index every node under each of its identifiers. A class identifier
    /// that appears twice in one namespace is rejected.
    pub fn build(self) -> Result<ArchiveMapping> {
        let mut mapping = ArchiveMapping::default();
        for class in self.classes {
            let class = Arc::new(class.build()?);
            for identifier in class.identifiers.values() {
                mapping.namespaces.insert(identifier.namespace.clone());
                if mapping.classes.insert(identifier.clone(), class.clone()).is_some() {
                    return Err(Error::malformed_mapping(
                        identifier.name.clone(),
                        format!("class mapped twice in namespace {}", identifier.namespace),
                    ));
                }
            }
            mapping.class_list.push(class);
        }
        log::debug!("Built mapping with {} classes over {} namespaces", mapping.len(), mapping.namespaces.len());
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ArchiveMapping {
        ArchiveMapping::builder()
            .class(
                ClassMappingBuilder::new()
                    .name("obf", "a")
                    .name("named", "com/example/Widget")
                    .method(
                        MethodMappingBuilder::new()
                            .name("obf", "b", "(La;I)V")
                            .name("named", "resize", "(Lcom/example/Widget;I)V")
                            .parameter(0, "named", "other")
                            .parameter(1, "named", "size"),
                    )
                    .field(FieldMappingBuilder::new().name("obf", "c", "I").name("named", "width", "I")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_class_lookup_from_either_namespace() {
        let mapping = sample();
        assert_eq!(mapping.map_class_name("a", "obf", "named"), Some("com/example/Widget"));
        assert_eq!(mapping.map_class_name("com/example/Widget", "named", "obf"), Some("a"));
        assert_eq!(mapping.map_class_name("missing", "obf", "named"), None);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.namespaces().collect::<Vec<_>>(), vec!["named", "obf"]);
    }

    #[test]
    fn test_member_lookup_by_identifier() {
        let mapping = sample();
        let class = mapping.class_by_name("a", "obf").unwrap();
        let id = MethodIdentifier::from_descriptor("b", "(La;I)V", "obf").unwrap();
        let method = class.method(&id).unwrap();
        assert_eq!(method.identifier("named").unwrap().name, "resize");
        assert_eq!(method.descriptor("named").unwrap(), "(Lcom/example/Widget;I)V");
        assert_eq!(method.parameter_name(1, "named"), Some("size"));
        assert_eq!(method.parameter_name(1, "obf"), None);

        let field = class.field(&FieldIdentifier::new("width", "named")).unwrap();
        assert_eq!(field.identifier("obf").unwrap().name, "c");
        assert_eq!(field.field_type("obf"), Some("I"));
        assert_eq!(class.methods().count(), 1);
    }

    #[test]
    fn test_duplicate_class_identifier_is_rejected() {
        let result = ArchiveMapping::builder()
            .class(ClassMappingBuilder::new().name("obf", "a").name("named", "x/One"))
            .class(ClassMappingBuilder::new().name("obf", "a").name("named", "x/Two"))
            .build();
        assert!(matches!(result, Err(Error::MalformedMapping { .. })));
    }

    #[test]
    fn test_bad_descriptor_is_rejected() {
        let result = ArchiveMapping::builder()
            .class(
                ClassMappingBuilder::new()
                    .name("obf", "a")
                    .method(MethodMappingBuilder::new().name("obf", "b", "(La")),
            )
            .build();
        assert!(matches!(result, Err(Error::MalformedMapping { .. })));
    }
}
