//! Applies a `NamespaceRemapper` to a decoded class
//!
//! The constant pool is rewritten by repointing `Class`, member reference,
//! `MethodType` and dynamic entries at fresh `Utf8`/`NameAndType` entries.
//! Existing `Utf8` entries are never changed, since a string literal may share
//! one with a class name. Instruction bytes keep their operands: every index
//! they hold still names the same, now remapped, entry.

use crate::classfile::attribute::{
    annotations_to_bytes, element_value_to_bytes, inner_classes_to_bytes, local_variables_to_bytes,
    parameter_annotations_to_bytes, parse_annotations, parse_bootstrap_methods, parse_element_value,
    parse_inner_classes, parse_local_variables, parse_parameter_annotations, parse_record, record_to_bytes,
    Annotation, AttributeInfo, BootstrapMethod, CodeAttribute, ElementValue,
};
use crate::classfile::defs::attribute_names::*;
use crate::classfile::defs::LAMBDA_METAFACTORY;
use crate::classfile::descriptor::parse_method_descriptor;
use crate::classfile::field::FieldInfo;
use crate::classfile::method::MethodInfo;
use crate::classfile::{ClassFile, ClassFileError, Constant, ConstantPool};
use crate::error::Result;

use super::remapper::NamespaceRemapper;

pub struct ClassRemapper<'r, 'a> {
    remapper: &'r NamespaceRemapper<'a>,
}

impl<'r, 'a> ClassRemapper<'r, 'a> {
    pub fn new(remapper: &'r NamespaceRemapper<'a>) -> Self {
        Self { remapper }
    }

    /// Rewrite `class` in place and return its new internal name
    pub fn remap(&self, class: &mut ClassFile) -> Result<String> {
        let snapshot = class.constant_pool.clone();
        let class_name = snapshot.class_name(class.this_class)?.to_string();
        let bootstraps = bootstrap_methods(&snapshot, &class.attributes)?;
        let mut rewriter = PoolRewriter {
            remapper: self.remapper,
            snapshot: &snapshot,
            bootstraps: &bootstraps,
            pool: &mut class.constant_pool,
            class_name: &class_name,
        };
        rewriter.remap_constants()?;
        for field in &mut class.fields {
            rewriter.remap_field(field)?;
        }
        for method in &mut class.methods {
            rewriter.remap_method(method)?;
        }
        rewriter.remap_attributes(&mut class.attributes)?;

        let mapped = class.name()?.to_string();
        if mapped != class_name {
            log::debug!("Remapped class {} -> {}", class_name, mapped);
        }
        Ok(mapped)
    }
}

/// Reads names from the untouched `snapshot` and appends their replacements to `pool`
struct PoolRewriter<'c> {
    remapper: &'c NamespaceRemapper<'c>,
    snapshot: &'c ConstantPool,
    bootstraps: &'c [BootstrapMethod],
    pool: &'c mut ConstantPool,
    class_name: &'c str,
}

impl<'c> PoolRewriter<'c> {
    /// Index of a Utf8 holding `value`; `index` itself when it already does
    fn replace_utf8(&mut self, index: u16, value: &str) -> Result<u16> {
        if self.snapshot.utf8(index)? == value {
            Ok(index)
        } else {
            Ok(self.pool.add_utf8(value)?)
        }
    }

    fn map_utf8(
        &mut self,
        index: u16,
        map: impl FnOnce(&NamespaceRemapper<'c>, &str) -> Result<String>,
    ) -> Result<u16> {
        let mapped = map(self.remapper, self.snapshot.utf8(index)?)?;
        self.replace_utf8(index, &mapped)
    }

    fn name_and_type(&mut self, index: u16, name: &str, descriptor: &str) -> Result<u16> {
        if self.snapshot.name_and_type(index)? == (name, descriptor) {
            Ok(index)
        } else {
            Ok(self.pool.add_name_and_type(name, descriptor)?)
        }
    }

    fn remap_constants(&mut self) -> Result<()> {
        let snapshot = self.snapshot;
        let remapper = self.remapper;
        let bootstraps = self.bootstraps;
        for (index, constant) in snapshot.iter() {
            let replacement = match *constant {
                Constant::Class(name_index) => {
                    let mapped = self.map_utf8(name_index, |r, name| r.map_type(name))?;
                    (mapped != name_index).then_some(Constant::Class(mapped))
                }
                Constant::FieldRef(class_index, nat_index) => {
                    let (owner, name, descriptor) = snapshot.member_ref(index)?;
                    let name = remapper.map_field_name(owner, name, descriptor)?;
                    let descriptor = remapper.map_descriptor(descriptor)?;
                    let mapped = self.name_and_type(nat_index, &name, &descriptor)?;
                    (mapped != nat_index).then_some(Constant::FieldRef(class_index, mapped))
                }
                Constant::MethodRef(class_index, nat_index) | Constant::InterfaceMethodRef(class_index, nat_index) => {
                    let (owner, name, descriptor) = snapshot.member_ref(index)?;
                    let name = remapper.map_method_name(owner, name, descriptor)?;
                    let descriptor = remapper.map_method_descriptor(descriptor)?;
                    let mapped = self.name_and_type(nat_index, &name, &descriptor)?;
                    (mapped != nat_index).then(|| match constant {
                        Constant::MethodRef(..) => Constant::MethodRef(class_index, mapped),
                        _ => Constant::InterfaceMethodRef(class_index, mapped),
                    })
                }
                Constant::MethodType(descriptor_index) => {
                    let mapped = self.map_utf8(descriptor_index, |r, d| r.map_method_descriptor(d))?;
                    (mapped != descriptor_index).then_some(Constant::MethodType(mapped))
                }
                Constant::InvokeDynamic(bootstrap, nat_index) => {
                    let (name, descriptor) = snapshot.name_and_type(nat_index)?;
                    let lambda = match bootstraps.get(bootstrap as usize) {
                        Some(method) => lambda_interface_method(snapshot, method, descriptor)?,
                        None => None,
                    };
                    let name = match lambda {
                        Some((interface, sam_descriptor)) => remapper.map_method_name(interface, name, sam_descriptor)?,
                        None => name.to_string(),
                    };
                    let descriptor = remapper.map_method_descriptor(descriptor)?;
                    let mapped = self.name_and_type(nat_index, &name, &descriptor)?;
                    (mapped != nat_index).then_some(Constant::InvokeDynamic(bootstrap, mapped))
                }
                Constant::Dynamic(bootstrap, nat_index) => {
                    let (name, descriptor) = snapshot.name_and_type(nat_index)?;
                    let descriptor = remapper.map_descriptor(descriptor)?;
                    let mapped = self.name_and_type(nat_index, name, &descriptor)?;
                    (mapped != nat_index).then_some(Constant::Dynamic(bootstrap, mapped))
                }
                _ => None,
            };
            if let Some(replacement) = replacement {
                self.pool.set(index, replacement)?;
            }
        }
        Ok(())
    }

    fn remap_field(&mut self, field: &mut FieldInfo) -> Result<()> {
        let name = self.snapshot.utf8(field.name_index)?;
        let descriptor = self.snapshot.utf8(field.descriptor_index)?;
        let mapped = self.remapper.map_field_name(self.class_name, name, descriptor)?;
        field.name_index = self.replace_utf8(field.name_index, &mapped)?;
        field.descriptor_index = self.map_utf8(field.descriptor_index, |r, d| r.map_descriptor(d))?;
        self.remap_attributes(&mut field.attributes)
    }

    fn remap_method(&mut self, method: &mut MethodInfo) -> Result<()> {
        let name = self.snapshot.utf8(method.name_index)?;
        let descriptor = self.snapshot.utf8(method.descriptor_index)?;
        let mapped = self.remapper.map_method_name(self.class_name, name, descriptor)?;
        method.name_index = self.replace_utf8(method.name_index, &mapped)?;
        method.descriptor_index = self.map_utf8(method.descriptor_index, |r, d| r.map_method_descriptor(d))?;
        self.remap_attributes(&mut method.attributes)
    }

    fn remap_attributes(&mut self, attributes: &mut [AttributeInfo]) -> Result<()> {
        let snapshot = self.snapshot;
        for attribute in attributes {
            let name = snapshot.utf8(attribute.name_index)?;
            let info = &attribute.info;
            attribute.info = match name {
                SIGNATURE => {
                    let index = single_index(name, info)?;
                    let mapped = self.map_utf8(index, |r, s| r.map_signature(s))?;
                    mapped.to_be_bytes().to_vec()
                }
                CODE => {
                    let mut code = CodeAttribute::parse(info)?;
                    self.remap_attributes(&mut code.attributes)?;
                    code.to_bytes()
                }
                LOCAL_VARIABLE_TABLE | LOCAL_VARIABLE_TYPE_TABLE => {
                    let mut entries = parse_local_variables(name, info)?;
                    for entry in &mut entries {
                        entry.descriptor_index = if name == LOCAL_VARIABLE_TABLE {
                            self.map_utf8(entry.descriptor_index, |r, d| r.map_descriptor(d))?
                        } else {
                            self.map_utf8(entry.descriptor_index, |r, s| r.map_signature(s))?
                        };
                    }
                    local_variables_to_bytes(&entries)
                }
                RUNTIME_VISIBLE_ANNOTATIONS | RUNTIME_INVISIBLE_ANNOTATIONS => {
                    let mut annotations = parse_annotations(name, info)?;
                    for annotation in &mut annotations {
                        self.remap_annotation(annotation)?;
                    }
                    annotations_to_bytes(&annotations)
                }
                RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS | RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => {
                    let mut parameters = parse_parameter_annotations(name, info)?;
                    for annotation in parameters.iter_mut().flatten() {
                        self.remap_annotation(annotation)?;
                    }
                    parameter_annotations_to_bytes(&parameters)
                }
                ANNOTATION_DEFAULT => {
                    let mut value = parse_element_value(info)?;
                    self.remap_element_value(&mut value)?;
                    element_value_to_bytes(&value)
                }
                INNER_CLASSES => self.remap_inner_classes(info)?,
                ENCLOSING_METHOD => self.remap_enclosing_method(info)?,
                RECORD => {
                    let mut components = parse_record(info)?;
                    for component in &mut components {
                        let name = snapshot.utf8(component.name_index)?;
                        let descriptor = snapshot.utf8(component.descriptor_index)?;
                        let mapped = self.remapper.map_field_name(self.class_name, name, descriptor)?;
                        component.name_index = self.replace_utf8(component.name_index, &mapped)?;
                        component.descriptor_index =
                            self.map_utf8(component.descriptor_index, |r, d| r.map_descriptor(d))?;
                        self.remap_attributes(&mut component.attributes)?;
                    }
                    record_to_bytes(&components)
                }
                _ => continue,
            };
        }
        Ok(())
    }

    fn remap_inner_classes(&mut self, info: &[u8]) -> Result<Vec<u8>> {
        let snapshot = self.snapshot;
        let mut entries = parse_inner_classes(info)?;
        for entry in entries.iter_mut().filter(|e| e.inner_name_index != 0) {
            let inner = snapshot.class_name(entry.inner_class_info_index)?;
            let simple = snapshot.utf8(entry.inner_name_index)?;
            let mapped = self.remapper.map_inner_class_name(inner, simple)?;
            entry.inner_name_index = self.replace_utf8(entry.inner_name_index, &mapped)?;
        }
        Ok(inner_classes_to_bytes(&entries))
    }

    /// `class_index` is a Class entry and is remapped with the pool;
    /// `method_index` is a NameAndType and 0 outside a method
    fn remap_enclosing_method(&mut self, info: &[u8]) -> Result<Vec<u8>> {
        let [c0, c1, m0, m1] = <[u8; 4]>::try_from(info).map_err(|_| ClassFileError::MalformedAttribute {
            name: ENCLOSING_METHOD.to_string(),
            reason: format!("expected 4 bytes, found {}", info.len()),
        })?;
        let class_index = u16::from_be_bytes([c0, c1]);
        let mut method_index = u16::from_be_bytes([m0, m1]);
        if method_index != 0 {
            let owner = self.snapshot.class_name(class_index)?;
            let (name, descriptor) = self.snapshot.name_and_type(method_index)?;
            let mapped_name = self.remapper.map_method_name(owner, name, descriptor)?;
            let mapped_descriptor = self.remapper.map_method_descriptor(descriptor)?;
            method_index = self.name_and_type(method_index, &mapped_name, &mapped_descriptor)?;
        }
        let mut bytes = class_index.to_be_bytes().to_vec();
        bytes.extend_from_slice(&method_index.to_be_bytes());
        Ok(bytes)
    }

    fn remap_annotation(&mut self, annotation: &mut Annotation) -> Result<()> {
        let snapshot = self.snapshot;
        let owner = internal_name(snapshot.utf8(annotation.type_index)?);
        for (name_index, value) in &mut annotation.elements {
            if let Some(owner) = owner {
                let name = snapshot.utf8(*name_index)?;
                let mapped = self.remapper.map_annotation_element(owner, name)?;
                *name_index = self.replace_utf8(*name_index, &mapped)?;
            }
            self.remap_element_value(value)?;
        }
        annotation.type_index = self.map_utf8(annotation.type_index, |r, d| r.map_descriptor(d))?;
        Ok(())
    }

    fn remap_element_value(&mut self, value: &mut ElementValue) -> Result<()> {
        let snapshot = self.snapshot;
        match value {
            ElementValue::Const { .. } => {}
            ElementValue::Enum { type_name_index, const_name_index } => {
                let descriptor = snapshot.utf8(*type_name_index)?;
                if let Some(owner) = internal_name(descriptor) {
                    let name = snapshot.utf8(*const_name_index)?;
                    let mapped = self.remapper.map_field_name(owner, name, descriptor)?;
                    *const_name_index = self.replace_utf8(*const_name_index, &mapped)?;
                }
                *type_name_index = self.map_utf8(*type_name_index, |r, d| r.map_descriptor(d))?;
            }
            ElementValue::Class { class_info_index } => {
                *class_info_index = self.map_utf8(*class_info_index, |r, d| r.map_descriptor(d))?;
            }
            ElementValue::Annotation(annotation) => self.remap_annotation(annotation)?,
            ElementValue::Array(values) => {
                for value in values {
                    self.remap_element_value(value)?;
                }
            }
        }
        Ok(())
    }
}

/// Entries of the class's BootstrapMethods attribute, if it has one
fn bootstrap_methods(pool: &ConstantPool, attributes: &[AttributeInfo]) -> Result<Vec<BootstrapMethod>> {
    for attribute in attributes {
        if pool.utf8(attribute.name_index)? == BOOTSTRAP_METHODS {
            return Ok(parse_bootstrap_methods(&attribute.info)?);
        }
    }
    Ok(Vec::new())
}

/// Interface and method descriptor a `LambdaMetafactory` call site
/// implements. The call-site name is that interface method's name. `None`
/// for any other bootstrap method.
fn lambda_interface_method<'p>(
    pool: &'p ConstantPool,
    bootstrap: &BootstrapMethod,
    descriptor: &'p str,
) -> Result<Option<(&'p str, &'p str)>> {
    let Constant::MethodHandle(_, reference) = *pool.get(bootstrap.method_ref)? else {
        return Ok(None);
    };
    let (owner, name, _) = pool.member_ref(reference)?;
    if owner != LAMBDA_METAFACTORY || !matches!(name, "metafactory" | "altMetafactory") {
        return Ok(None);
    }
    let Some(&sam) = bootstrap.arguments.first() else {
        return Ok(None);
    };
    let Constant::MethodType(sam_descriptor) = *pool.get(sam)? else {
        return Ok(None);
    };
    let (_, return_type) = parse_method_descriptor(descriptor)?;
    let Some(interface) = internal_name(return_type) else {
        return Ok(None);
    };
    Ok(Some((interface, pool.utf8(sam_descriptor)?)))
}

/// `a/B` for the descriptor `La/B;`
fn internal_name(descriptor: &str) -> Option<&str> {
    descriptor.strip_prefix('L')?.strip_suffix(';')
}

fn single_index(name: &str, info: &[u8]) -> Result<u16> {
    match *info {
        [hi, lo] => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(ClassFileError::MalformedAttribute {
            name: name.to_string(),
            reason: format!("expected 2 bytes, found {}", info.len()),
        }
        .into()),
    }
}
