//! Rebuilds `MethodParameters` from the parameter names a mapping records

use crate::classfile::attribute::{method_parameters_to_bytes, AttributeInfo, MethodParameter};
use crate::classfile::defs::{access_flags::ACC_SYNTHETIC, attribute_names::METHOD_PARAMETERS};
use crate::classfile::ClassFile;
use crate::error::{Error, Result};
use crate::mapping::{ArchiveMapping, MethodIdentifier};

pub struct ParameterMetadataRewriter<'a> {
    mappings: &'a ArchiveMapping,
    namespace: String,
    prefix: String,
}

impl<'a> ParameterMetadataRewriter<'a> {
    /// `namespace` is the namespace `rewrite` sees class and method names in
    pub fn new(mappings: &'a ArchiveMapping, namespace: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self { mappings, namespace: namespace.into(), prefix: prefix.into() }
    }

    /// Replace the parameter list of every method whose mapping records
    /// parameter names. Indices without a name in the namespace get
    /// `{prefix}{index}`. Methods without recorded names keep their attribute.
    pub fn rewrite(&self, class: &mut ClassFile) -> Result<()> {
        let class_name = class.name()?.to_string();
        let Some(mapping) = self.mappings.class_by_name(&class_name, &self.namespace) else {
            return Ok(());
        };
        let pool = &mut class.constant_pool;
        for method in &mut class.methods {
            let name = pool.utf8(method.name_index)?;
            let descriptor = pool.utf8(method.descriptor_index)?;
            let identifier = MethodIdentifier::from_descriptor(name, descriptor, &self.namespace)?;
            let Some(method_mapping) = mapping.method(&identifier) else {
                continue;
            };
            let names = method_mapping.parameter_names();
            let Some(&last) = names.keys().next_back() else {
                continue;
            };
            if last > u8::MAX as u32 - 1 {
                return Err(Error::malformed_mapping(
                    format!("{}.{}", class_name, identifier.name),
                    format!("parameter index {} out of range", last),
                ));
            }

            let mut parameters = Vec::with_capacity(last as usize + 1);
            for index in 0..=last {
                let name = match method_mapping.parameter_name(index, &self.namespace) {
                    Some(name) => name.to_string(),
                    None => format!("{}{}", self.prefix, index),
                };
                parameters.push(MethodParameter { name_index: pool.add_utf8(&name)?, access_flags: ACC_SYNTHETIC });
            }
            log::debug!("Rewrote {} parameters of {}.{}", parameters.len(), class_name, identifier.name);

            let attribute = AttributeInfo::new(pool.add_utf8(METHOD_PARAMETERS)?, method_parameters_to_bytes(&parameters));
            match method.attribute_position(pool, METHOD_PARAMETERS) {
                Some(position) => method.attributes[position] = attribute,
                None => method.attributes.push(attribute),
            }
        }
        Ok(())
    }
}
