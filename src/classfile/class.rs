//! Core classfile structure: ClassFile

use super::attribute::AttributeInfo;
use super::constpool::ConstantPool;
use super::defs::{access_flags, major_versions, MAGIC};
use super::error::ClassFileResult;
use super::field::FieldInfo;
use super::method::MethodInfo;

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    pub fn new() -> Self {
        Self {
            magic: MAGIC,
            minor_version: 0,
            major_version: major_versions::JAVA_8,
            constant_pool: ConstantPool::new(),
            access_flags: 0,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Internal name recorded in `this_class`
    pub fn name(&self) -> ClassFileResult<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> ClassFileResult<Option<&str>> {
        match self.super_class {
            0 => Ok(None),
            index => self.constant_pool.class_name(index).map(Some),
        }
    }

    pub fn interface_names(&self) -> ClassFileResult<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&index| self.constant_pool.class_name(index))
            .collect()
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & access_flags::ACC_INTERFACE != 0
    }

    /// Name of an attribute attached anywhere in this class
    pub fn attribute_name(&self, attribute: &AttributeInfo) -> ClassFileResult<&str> {
        self.constant_pool.utf8(attribute.name_index)
    }

    /// First class-level attribute called `name`
    pub fn find_attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes
            .iter()
            .find(|a| self.constant_pool.utf8(a.name_index).map(|n| n == name).unwrap_or(false))
    }
}

impl Default for ClassFile {
    fn default() -> Self {
        Self::new()
    }
}
