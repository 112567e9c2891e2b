//! Attributes and exception table structures for Java class files
//!
//! Attributes stay as raw `AttributeInfo` payloads inside the tree; the typed
//! views below are decoded on demand by whoever needs to rewrite them.

use super::error::{ClassFileError, ClassFileResult};
use super::reader::{read_attributes, ByteReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn new(name_index: u16, info: Vec<u8>) -> Self {
        Self { name_index, info }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&(self.info.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.info);
        bytes
    }
}

fn malformed(name: &str, err: ClassFileError) -> ClassFileError {
    ClassFileError::MalformedAttribute { name: name.to_string(), reason: err.to_string() }
}

fn ensure_consumed(name: &str, reader: &ByteReader<'_>) -> ClassFileResult<()> {
    if reader.is_empty() {
        Ok(())
    } else {
        Err(ClassFileError::MalformedAttribute {
            name: name.to_string(),
            reason: format!("trailing bytes after offset {}", reader.position()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self {
            max_stack,
            max_locals,
            code,
            exception_table: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn parse(info: &[u8]) -> ClassFileResult<Self> {
        let parse = || -> ClassFileResult<Self> {
            let mut reader = ByteReader::new(info);
            let max_stack = reader.u16()?;
            let max_locals = reader.u16()?;
            let code_length = reader.u32()? as usize;
            let code = reader.bytes(code_length)?.to_vec();
            let table_length = reader.u16()?;
            let mut exception_table = Vec::with_capacity(table_length as usize);
            for _ in 0..table_length {
                exception_table.push(ExceptionTableEntry::new(
                    reader.u16()?,
                    reader.u16()?,
                    reader.u16()?,
                    reader.u16()?,
                ));
            }
            let attributes = read_attributes(&mut reader)?;
            ensure_consumed("Code", &reader)?;
            Ok(Self { max_stack, max_locals, code, exception_table, attributes })
        };
        parse().map_err(|e| malformed("Code", e))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.max_stack.to_be_bytes());
        bytes.extend_from_slice(&self.max_locals.to_be_bytes());
        bytes.extend_from_slice(&(self.code.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.code);
        bytes.extend_from_slice(&(self.exception_table.len() as u16).to_be_bytes());
        for entry in &self.exception_table {
            bytes.extend_from_slice(&entry.to_bytes());
        }
        bytes.extend_from_slice(&(self.attributes.len() as u16).to_be_bytes());
        for attribute in &self.attributes {
            bytes.extend_from_slice(&attribute.to_bytes());
        }
        bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// 0 for catch-all (`finally`)
    pub catch_type: u16,
}

impl ExceptionTableEntry {
    pub fn new(start_pc: u16, end_pc: u16, handler_pc: u16, catch_type: u16) -> Self {
        Self { start_pc, end_pc, handler_pc, catch_type }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.start_pc.to_be_bytes());
        bytes.extend_from_slice(&self.end_pc.to_be_bytes());
        bytes.extend_from_slice(&self.handler_pc.to_be_bytes());
        bytes.extend_from_slice(&self.catch_type.to_be_bytes());
        bytes
    }
}

/// One row of a LocalVariableTable or LocalVariableTypeTable. In the type table
/// `descriptor_index` points at a generic signature instead of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

pub fn parse_local_variables(name: &str, info: &[u8]) -> ClassFileResult<Vec<LocalVariableEntry>> {
    let parse = || -> ClassFileResult<Vec<LocalVariableEntry>> {
        let mut reader = ByteReader::new(info);
        let count = reader.u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(LocalVariableEntry {
                start_pc: reader.u16()?,
                length: reader.u16()?,
                name_index: reader.u16()?,
                descriptor_index: reader.u16()?,
                index: reader.u16()?,
            });
        }
        ensure_consumed(name, &reader)?;
        Ok(entries)
    };
    parse().map_err(|e| malformed(name, e))
}

pub fn local_variables_to_bytes(entries: &[LocalVariableEntry]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for e in entries {
        bytes.extend_from_slice(&e.start_pc.to_be_bytes());
        bytes.extend_from_slice(&e.length.to_be_bytes());
        bytes.extend_from_slice(&e.name_index.to_be_bytes());
        bytes.extend_from_slice(&e.descriptor_index.to_be_bytes());
        bytes.extend_from_slice(&e.index.to_be_bytes());
    }
    bytes
}

/// One formal parameter of a MethodParameters attribute; `name_index` 0 means unnamed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameter {
    pub name_index: u16,
    pub access_flags: u16,
}

pub fn parse_method_parameters(info: &[u8]) -> ClassFileResult<Vec<MethodParameter>> {
    let parse = || -> ClassFileResult<Vec<MethodParameter>> {
        let mut reader = ByteReader::new(info);
        let count = reader.u8()?;
        let mut parameters = Vec::with_capacity(count as usize);
        for _ in 0..count {
            parameters.push(MethodParameter { name_index: reader.u16()?, access_flags: reader.u16()? });
        }
        ensure_consumed("MethodParameters", &reader)?;
        Ok(parameters)
    };
    parse().map_err(|e| malformed("MethodParameters", e))
}

pub fn method_parameters_to_bytes(parameters: &[MethodParameter]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(1 + parameters.len() * 4);
    bytes.push(parameters.len() as u8);
    for p in parameters {
        bytes.extend_from_slice(&p.name_index.to_be_bytes());
        bytes.extend_from_slice(&p.access_flags.to_be_bytes());
    }
    bytes
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassEntry {
    pub inner_class_info_index: u16,
    pub outer_class_info_index: u16,
    /// 0 for anonymous classes
    pub inner_name_index: u16,
    pub inner_class_access_flags: u16,
}

pub fn parse_inner_classes(info: &[u8]) -> ClassFileResult<Vec<InnerClassEntry>> {
    let parse = || -> ClassFileResult<Vec<InnerClassEntry>> {
        let mut reader = ByteReader::new(info);
        let count = reader.u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(InnerClassEntry {
                inner_class_info_index: reader.u16()?,
                outer_class_info_index: reader.u16()?,
                inner_name_index: reader.u16()?,
                inner_class_access_flags: reader.u16()?,
            });
        }
        ensure_consumed("InnerClasses", &reader)?;
        Ok(entries)
    };
    parse().map_err(|e| malformed("InnerClasses", e))
}

pub fn inner_classes_to_bytes(entries: &[InnerClassEntry]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for e in entries {
        bytes.extend_from_slice(&e.inner_class_info_index.to_be_bytes());
        bytes.extend_from_slice(&e.outer_class_info_index.to_be_bytes());
        bytes.extend_from_slice(&e.inner_name_index.to_be_bytes());
        bytes.extend_from_slice(&e.inner_class_access_flags.to_be_bytes());
    }
    bytes
}

/// One entry of a BootstrapMethods attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    /// `CONSTANT_MethodHandle` of the bootstrap method
    pub method_ref: u16,
    pub arguments: Vec<u16>,
}

pub fn parse_bootstrap_methods(info: &[u8]) -> ClassFileResult<Vec<BootstrapMethod>> {
    let parse = || -> ClassFileResult<Vec<BootstrapMethod>> {
        let mut reader = ByteReader::new(info);
        let count = reader.u16()?;
        let mut methods = Vec::with_capacity(count as usize);
        for _ in 0..count {
            methods.push(BootstrapMethod { method_ref: reader.u16()?, arguments: reader.u16_list()? });
        }
        ensure_consumed("BootstrapMethods", &reader)?;
        Ok(methods)
    };
    parse().map_err(|e| malformed("BootstrapMethods", e))
}

pub fn bootstrap_methods_to_bytes(methods: &[BootstrapMethod]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(methods.len() as u16).to_be_bytes());
    for method in methods {
        bytes.extend_from_slice(&method.method_ref.to_be_bytes());
        bytes.extend_from_slice(&(method.arguments.len() as u16).to_be_bytes());
        for argument in &method.arguments {
            bytes.extend_from_slice(&argument.to_be_bytes());
        }
    }
    bytes
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordComponent {
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

pub fn parse_record(info: &[u8]) -> ClassFileResult<Vec<RecordComponent>> {
    let parse = || -> ClassFileResult<Vec<RecordComponent>> {
        let mut reader = ByteReader::new(info);
        let count = reader.u16()?;
        let mut components = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_index = reader.u16()?;
            let descriptor_index = reader.u16()?;
            let attributes = read_attributes(&mut reader)?;
            components.push(RecordComponent { name_index, descriptor_index, attributes });
        }
        ensure_consumed("Record", &reader)?;
        Ok(components)
    };
    parse().map_err(|e| malformed("Record", e))
}

pub fn record_to_bytes(components: &[RecordComponent]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(components.len() as u16).to_be_bytes());
    for c in components {
        bytes.extend_from_slice(&c.name_index.to_be_bytes());
        bytes.extend_from_slice(&c.descriptor_index.to_be_bytes());
        bytes.extend_from_slice(&(c.attributes.len() as u16).to_be_bytes());
        for attribute in &c.attributes {
            bytes.extend_from_slice(&attribute.to_bytes());
        }
    }
    bytes
}

/// `annotation` structure of JVMS 4.7.16
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Utf8 holding a field descriptor
    pub type_index: u16,
    pub elements: Vec<(u16, ElementValue)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
    /// Primitive or String constant (`B C D F I J S Z s`)
    Const { tag: u8, const_value_index: u16 },
    Enum { type_name_index: u16, const_name_index: u16 },
    /// Utf8 holding a return descriptor
    Class { class_info_index: u16 },
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl Annotation {
    fn read(reader: &mut ByteReader<'_>) -> ClassFileResult<Self> {
        let type_index = reader.u16()?;
        let count = reader.u16()?;
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_index = reader.u16()?;
            elements.push((name_index, ElementValue::read(reader)?));
        }
        Ok(Self { type_index, elements })
    }

    fn write(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.type_index.to_be_bytes());
        bytes.extend_from_slice(&(self.elements.len() as u16).to_be_bytes());
        for (name_index, value) in &self.elements {
            bytes.extend_from_slice(&name_index.to_be_bytes());
            value.write(bytes);
        }
    }
}

impl ElementValue {
    fn read(reader: &mut ByteReader<'_>) -> ClassFileResult<Self> {
        let tag = reader.u8()?;
        Ok(match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
                ElementValue::Const { tag, const_value_index: reader.u16()? }
            }
            b'e' => ElementValue::Enum { type_name_index: reader.u16()?, const_name_index: reader.u16()? },
            b'c' => ElementValue::Class { class_info_index: reader.u16()? },
            b'@' => ElementValue::Annotation(Annotation::read(reader)?),
            b'[' => {
                let count = reader.u16()?;
                let values = (0..count)
                    .map(|_| ElementValue::read(reader))
                    .collect::<ClassFileResult<Vec<_>>>()?;
                ElementValue::Array(values)
            }
            other => {
                return Err(ClassFileError::MalformedAttribute {
                    name: "annotation".to_string(),
                    reason: format!("unknown element value tag {:?}", other as char),
                })
            }
        })
    }

    fn write(&self, bytes: &mut Vec<u8>) {
        match self {
            ElementValue::Const { tag, const_value_index } => {
                bytes.push(*tag);
                bytes.extend_from_slice(&const_value_index.to_be_bytes());
            }
            ElementValue::Enum { type_name_index, const_name_index } => {
                bytes.push(b'e');
                bytes.extend_from_slice(&type_name_index.to_be_bytes());
                bytes.extend_from_slice(&const_name_index.to_be_bytes());
            }
            ElementValue::Class { class_info_index } => {
                bytes.push(b'c');
                bytes.extend_from_slice(&class_info_index.to_be_bytes());
            }
            ElementValue::Annotation(annotation) => {
                bytes.push(b'@');
                annotation.write(bytes);
            }
            ElementValue::Array(values) => {
                bytes.push(b'[');
                bytes.extend_from_slice(&(values.len() as u16).to_be_bytes());
                for value in values {
                    value.write(bytes);
                }
            }
        }
    }
}

/// RuntimeVisibleAnnotations / RuntimeInvisibleAnnotations
pub fn parse_annotations(name: &str, info: &[u8]) -> ClassFileResult<Vec<Annotation>> {
    let parse = || -> ClassFileResult<Vec<Annotation>> {
        let mut reader = ByteReader::new(info);
        let count = reader.u16()?;
        let annotations = (0..count)
            .map(|_| Annotation::read(&mut reader))
            .collect::<ClassFileResult<Vec<_>>>()?;
        ensure_consumed(name, &reader)?;
        Ok(annotations)
    };
    parse().map_err(|e| malformed(name, e))
}

pub fn annotations_to_bytes(annotations: &[Annotation]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(annotations.len() as u16).to_be_bytes());
    for annotation in annotations {
        annotation.write(&mut bytes);
    }
    bytes
}

/// Runtime(In)VisibleParameterAnnotations: one annotation list per parameter
pub fn parse_parameter_annotations(name: &str, info: &[u8]) -> ClassFileResult<Vec<Vec<Annotation>>> {
    let parse = || -> ClassFileResult<Vec<Vec<Annotation>>> {
        let mut reader = ByteReader::new(info);
        let parameters = reader.u8()?;
        let mut result = Vec::with_capacity(parameters as usize);
        for _ in 0..parameters {
            let count = reader.u16()?;
            let annotations = (0..count)
                .map(|_| Annotation::read(&mut reader))
                .collect::<ClassFileResult<Vec<_>>>()?;
            result.push(annotations);
        }
        ensure_consumed(name, &reader)?;
        Ok(result)
    };
    parse().map_err(|e| malformed(name, e))
}

pub fn parameter_annotations_to_bytes(parameters: &[Vec<Annotation>]) -> Vec<u8> {
    let mut bytes = vec![parameters.len() as u8];
    for annotations in parameters {
        bytes.extend_from_slice(&(annotations.len() as u16).to_be_bytes());
        for annotation in annotations {
            annotation.write(&mut bytes);
        }
    }
    bytes
}

/// AnnotationDefault carries a single element value
pub fn parse_element_value(info: &[u8]) -> ClassFileResult<ElementValue> {
    let parse = || -> ClassFileResult<ElementValue> {
        let mut reader = ByteReader::new(info);
        let value = ElementValue::read(&mut reader)?;
        ensure_consumed("AnnotationDefault", &reader)?;
        Ok(value)
    };
    parse().map_err(|e| malformed("AnnotationDefault", e))
}

pub fn element_value_to_bytes(value: &ElementValue) -> Vec<u8> {
    let mut bytes = Vec::new();
    value.write(&mut bytes);
    bytes
}
