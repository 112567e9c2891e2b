//! Constant pool and constants for Java class files

use std::collections::HashMap;

use super::error::{ClassFileError, ClassFileResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    /// A `CONSTANT_Utf8` whose modified UTF-8 payload does not decode to a valid
    /// string (unpaired surrogates). Kept byte-for-byte, never remapped.
    RawUtf8(Vec<u8>),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
    /// Second slot occupied by a preceding Long or Double
    Unusable,
}

pub(crate) mod constant_tags {
    pub const CONSTANT_UTF8: u8 = 1;
    pub const CONSTANT_INTEGER: u8 = 3;
    pub const CONSTANT_FLOAT: u8 = 4;
    pub const CONSTANT_LONG: u8 = 5;
    pub const CONSTANT_DOUBLE: u8 = 6;
    pub const CONSTANT_CLASS: u8 = 7;
    pub const CONSTANT_STRING: u8 = 8;
    pub const CONSTANT_FIELDREF: u8 = 9;
    pub const CONSTANT_METHODREF: u8 = 10;
    pub const CONSTANT_INTERFACEMETHODREF: u8 = 11;
    pub const CONSTANT_NAMEANDTYPE: u8 = 12;
    pub const CONSTANT_METHODHANDLE: u8 = 15;
    pub const CONSTANT_METHODTYPE: u8 = 16;
    pub const CONSTANT_DYNAMIC: u8 = 17;
    pub const CONSTANT_INVOKEDYNAMIC: u8 = 18;
    pub const CONSTANT_MODULE: u8 = 19;
    pub const CONSTANT_PACKAGE: u8 = 20;
}

impl Constant {
    /// Number of pool slots this constant occupies
    pub fn slots(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        use constant_tags::*;
        let mut bytes = Vec::new();
        match self {
            Constant::Utf8(value) => {
                bytes.push(CONSTANT_UTF8);
                let utf8_bytes = encode_modified_utf8(value);
                bytes.extend_from_slice(&(utf8_bytes.len() as u16).to_be_bytes());
                bytes.extend_from_slice(&utf8_bytes);
            }
            Constant::RawUtf8(raw) => {
                bytes.push(CONSTANT_UTF8);
                bytes.extend_from_slice(&(raw.len() as u16).to_be_bytes());
                bytes.extend_from_slice(raw);
            }
            Constant::Integer(value) => {
                bytes.push(CONSTANT_INTEGER);
                bytes.extend_from_slice(&value.to_be_bytes());
            }
            Constant::Float(value) => {
                bytes.push(CONSTANT_FLOAT);
                bytes.extend_from_slice(&value.to_bits().to_be_bytes());
            }
            Constant::Long(value) => {
                bytes.push(CONSTANT_LONG);
                bytes.extend_from_slice(&value.to_be_bytes());
            }
            Constant::Double(value) => {
                bytes.push(CONSTANT_DOUBLE);
                bytes.extend_from_slice(&value.to_bits().to_be_bytes());
            }
            Constant::Class(name_index) => {
                bytes.push(CONSTANT_CLASS);
                bytes.extend_from_slice(&name_index.to_be_bytes());
            }
            Constant::String(string_index) => {
                bytes.push(CONSTANT_STRING);
                bytes.extend_from_slice(&string_index.to_be_bytes());
            }
            Constant::FieldRef(class_index, name_and_type_index) => {
                bytes.push(CONSTANT_FIELDREF);
                bytes.extend_from_slice(&class_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::MethodRef(class_index, name_and_type_index) => {
                bytes.push(CONSTANT_METHODREF);
                bytes.extend_from_slice(&class_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::InterfaceMethodRef(class_index, name_and_type_index) => {
                bytes.push(CONSTANT_INTERFACEMETHODREF);
                bytes.extend_from_slice(&class_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::NameAndType(name_index, descriptor_index) => {
                bytes.push(CONSTANT_NAMEANDTYPE);
                bytes.extend_from_slice(&name_index.to_be_bytes());
                bytes.extend_from_slice(&descriptor_index.to_be_bytes());
            }
            Constant::MethodHandle(reference_kind, reference_index) => {
                bytes.push(CONSTANT_METHODHANDLE);
                bytes.push(*reference_kind);
                bytes.extend_from_slice(&reference_index.to_be_bytes());
            }
            Constant::MethodType(descriptor_index) => {
                bytes.push(CONSTANT_METHODTYPE);
                bytes.extend_from_slice(&descriptor_index.to_be_bytes());
            }
            Constant::Dynamic(bootstrap_method_attr_index, name_and_type_index) => {
                bytes.push(CONSTANT_DYNAMIC);
                bytes.extend_from_slice(&bootstrap_method_attr_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::InvokeDynamic(bootstrap_method_attr_index, name_and_type_index) => {
                bytes.push(CONSTANT_INVOKEDYNAMIC);
                bytes.extend_from_slice(&bootstrap_method_attr_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::Module(name_index) => {
                bytes.push(CONSTANT_MODULE);
                bytes.extend_from_slice(&name_index.to_be_bytes());
            }
            Constant::Package(name_index) => {
                bytes.push(CONSTANT_PACKAGE);
                bytes.extend_from_slice(&name_index.to_be_bytes());
            }
            Constant::Unusable => {}
        }
        bytes
    }
}

/// Constant pool with 1-based indexing. Long and Double constants are followed
/// by an `Unusable` slot so that `constants[i - 1]` is always entry `i`.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    pub(crate) constants: Vec<Constant>,
    utf8_lookup: HashMap<String, u16>,
    class_lookup: HashMap<u16, u16>,
    name_and_type_lookup: HashMap<(u16, u16), u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from decoded constants, indexing the entries that can be reused
    pub(crate) fn from_constants(constants: Vec<Constant>) -> Self {
        let mut pool = Self { constants, ..Self::default() };
        for i in 0..pool.constants.len() {
            let index = (i + 1) as u16;
            pool.index_entry(index);
        }
        pool
    }

    fn index_entry(&mut self, index: u16) {
        match &self.constants[index as usize - 1] {
            Constant::Utf8(value) => {
                self.utf8_lookup.entry(value.clone()).or_insert(index);
            }
            Constant::Class(name_index) => {
                self.class_lookup.entry(*name_index).or_insert(index);
            }
            Constant::NameAndType(name_index, descriptor_index) => {
                self.name_and_type_lookup
                    .entry((*name_index, *descriptor_index))
                    .or_insert(index);
            }
            _ => {}
        }
    }

    /// The `constant_pool_count` value written to the class file
    pub fn count(&self) -> u16 {
        (self.constants.len() + 1) as u16
    }

    /// Iterate `(index, constant)` pairs, skipping the unusable half of wide entries
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.constants
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| ((i + 1) as u16, c))
    }

    pub fn get(&self, index: u16) -> ClassFileResult<&Constant> {
        if index == 0 {
            return Err(ClassFileError::InvalidIndex(index));
        }
        match self.constants.get(index as usize - 1) {
            Some(Constant::Unusable) | None => Err(ClassFileError::InvalidIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8(&self, index: u16) -> ClassFileResult<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            _ => Err(ClassFileError::UnexpectedConstant { index, expected: "Utf8" }),
        }
    }

    /// Internal name (or array descriptor) of a `CONSTANT_Class`
    pub fn class_name(&self, index: u16) -> ClassFileResult<&str> {
        match self.get(index)? {
            Constant::Class(name_index) => self.utf8(*name_index),
            _ => Err(ClassFileError::UnexpectedConstant { index, expected: "Class" }),
        }
    }

    pub fn name_and_type(&self, index: u16) -> ClassFileResult<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType(name_index, descriptor_index) => {
                Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
            }
            _ => Err(ClassFileError::UnexpectedConstant { index, expected: "NameAndType" }),
        }
    }

    /// Owner, name and descriptor of a field, method or interface method reference
    pub fn member_ref(&self, index: u16) -> ClassFileResult<(&str, &str, &str)> {
        match self.get(index)? {
            Constant::FieldRef(class_index, nat_index)
            | Constant::MethodRef(class_index, nat_index)
            | Constant::InterfaceMethodRef(class_index, nat_index) => {
                let owner = self.class_name(*class_index)?;
                let (name, descriptor) = self.name_and_type(*nat_index)?;
                Ok((owner, name, descriptor))
            }
            _ => Err(ClassFileError::UnexpectedConstant { index, expected: "member reference" }),
        }
    }

    /// Replace the entry at `index`. Width must not change.
    pub fn set(&mut self, index: u16, constant: Constant) -> ClassFileResult<()> {
        let slot = self
            .constants
            .get_mut((index as usize).wrapping_sub(1))
            .ok_or(ClassFileError::InvalidIndex(index))?;
        if slot.slots() != constant.slots() || matches!(slot, Constant::Unusable) {
            return Err(ClassFileError::InvalidIndex(index));
        }
        *slot = constant;
        self.index_entry(index);
        Ok(())
    }

    fn push(&mut self, constant: Constant) -> ClassFileResult<u16> {
        let slots = constant.slots();
        if self.constants.len() + slots > u16::MAX as usize - 1 {
            return Err(ClassFileError::OutOfSpace);
        }
        self.constants.push(constant);
        let index = self.constants.len() as u16;
        if slots == 2 {
            self.constants.push(Constant::Unusable);
        }
        self.index_entry(index);
        Ok(index)
    }

    /// Index of a `CONSTANT_Utf8` holding `value`, appending one if needed
    pub fn add_utf8(&mut self, value: &str) -> ClassFileResult<u16> {
        if let Some(&index) = self.utf8_lookup.get(value) {
            return Ok(index);
        }
        self.push(Constant::Utf8(value.to_string()))
    }

    pub fn add_class(&mut self, name: &str) -> ClassFileResult<u16> {
        let name_index = self.add_utf8(name)?;
        if let Some(&index) = self.class_lookup.get(&name_index) {
            return Ok(index);
        }
        self.push(Constant::Class(name_index))
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> ClassFileResult<u16> {
        let name_index = self.add_utf8(name)?;
        let descriptor_index = self.add_utf8(descriptor)?;
        if let Some(&index) = self.name_and_type_lookup.get(&(name_index, descriptor_index)) {
            return Ok(index);
        }
        self.push(Constant::NameAndType(name_index, descriptor_index))
    }

    pub fn add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> ClassFileResult<u16> {
        let class_index = self.add_class(class)?;
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.push(Constant::MethodRef(class_index, name_and_type_index))
    }

    pub fn add_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> ClassFileResult<u16> {
        let class_index = self.add_class(class)?;
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.push(Constant::FieldRef(class_index, name_and_type_index))
    }

    pub fn add_interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> ClassFileResult<u16> {
        let class_index = self.add_class(class)?;
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.push(Constant::InterfaceMethodRef(class_index, name_and_type_index))
    }

    pub fn add_method_handle(&mut self, reference_kind: u8, reference_index: u16) -> ClassFileResult<u16> {
        self.push(Constant::MethodHandle(reference_kind, reference_index))
    }

    pub fn add_method_type(&mut self, descriptor: &str) -> ClassFileResult<u16> {
        let descriptor_index = self.add_utf8(descriptor)?;
        self.push(Constant::MethodType(descriptor_index))
    }

    /// `bootstrap` indexes the class's BootstrapMethods attribute
    pub fn add_invoke_dynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> ClassFileResult<u16> {
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.push(Constant::InvokeDynamic(bootstrap, name_and_type_index))
    }

    pub fn add_string(&mut self, value: &str) -> ClassFileResult<u16> {
        let utf8_index = self.add_utf8(value)?;
        self.push(Constant::String(utf8_index))
    }

    pub fn add_integer(&mut self, value: i32) -> ClassFileResult<u16> {
        self.push(Constant::Integer(value))
    }

    pub fn add_long(&mut self, value: i64) -> ClassFileResult<u16> {
        self.push(Constant::Long(value))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.count().to_be_bytes());
        for constant in &self.constants {
            bytes.extend_from_slice(&constant.to_bytes());
        }
        bytes
    }
}

/// Decode the JVM's modified UTF-8. Returns `None` for payloads that do not form
/// a valid Rust string (e.g. unpaired surrogates).
pub(crate) fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1)?;
            units.push((((b & 0x1F) as u16) << 6) | (b2 & 0x3F) as u16);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1)?;
            let b3 = *bytes.get(i + 2)?;
            units.push((((b & 0x0F) as u16) << 12) | (((b2 & 0x3F) as u16) << 6) | (b3 & 0x3F) as u16);
            i += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}

pub(crate) fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
