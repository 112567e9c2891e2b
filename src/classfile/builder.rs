//! Programmatic construction of small class files
//!
//! Fixture API: the remapping pipeline never builds classes itself. This
//! module exists so that this crate's tests, and tests of code using it, can
//! synthesize archives without a Java compiler. It only covers what such
//! fixtures need (fields, abstract and coded methods, raw attributes) and
//! makes no attempt at being a general class generator.
//!
//! Constant pool errors are deferred and reported by `build`/`into_class_file`.

use super::attribute::{AttributeInfo, CodeAttribute, ExceptionTableEntry};
use super::class::ClassFile;
use super::constpool::ConstantPool;
use super::defs::{access_flags, attribute_names};
use super::error::{ClassFileError, ClassFileResult};
use super::field::FieldInfo;
use super::method::MethodInfo;
use super::writer::class_file_to_bytes;

/// Code of one method, as handed to `ClassBuilder::method_with_code`
#[derive(Debug, Clone, Default)]
pub struct MethodBody {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    /// Attributes of the Code attribute, such as a StackMapTable
    pub attributes: Vec<AttributeInfo>,
}

impl MethodBody {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self { max_stack, max_locals, code, exception_table: Vec::new(), attributes: Vec::new() }
    }

    pub fn with_handler(mut self, entry: ExceptionTableEntry) -> Self {
        self.exception_table.push(entry);
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeInfo) -> Self {
        self.attributes.push(attribute);
        self
    }
}

pub struct ClassBuilder {
    class: ClassFile,
    error: Option<ClassFileError>,
}

impl ClassBuilder {
    pub fn new(name: &str, super_name: Option<&str>) -> Self {
        let mut builder = Self { class: ClassFile::new(), error: None };
        builder.class.access_flags = access_flags::ACC_PUBLIC | access_flags::ACC_SUPER;
        builder.apply(|class| {
            class.this_class = class.constant_pool.add_class(name)?;
            if let Some(super_name) = super_name {
                class.super_class = class.constant_pool.add_class(super_name)?;
            }
            Ok(())
        })
    }

    fn apply(mut self, f: impl FnOnce(&mut ClassFile) -> ClassFileResult<()>) -> Self {
        if self.error.is_none() {
            if let Err(e) = f(&mut self.class) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn version(mut self, major: u16) -> Self {
        self.class.major_version = major;
        self
    }

    pub fn access(mut self, flags: u16) -> Self {
        self.class.access_flags = flags;
        self
    }

    /// Add an implemented interface
    pub fn interface(self, name: &str) -> Self {
        self.apply(|class| {
            let index = class.constant_pool.add_class(name)?;
            class.interfaces.push(index);
            Ok(())
        })
    }

    pub fn field(self, name: &str, descriptor: &str) -> Self {
        self.apply(|class| {
            let name_index = class.constant_pool.add_utf8(name)?;
            let descriptor_index = class.constant_pool.add_utf8(descriptor)?;
            class.fields.push(FieldInfo::new(access_flags::ACC_PUBLIC, name_index, descriptor_index));
            Ok(())
        })
    }

    /// Add an abstract method
    pub fn method(self, name: &str, descriptor: &str) -> Self {
        self.apply(|class| {
            let name_index = class.constant_pool.add_utf8(name)?;
            let descriptor_index = class.constant_pool.add_utf8(descriptor)?;
            let flags = access_flags::ACC_PUBLIC | access_flags::ACC_ABSTRACT;
            class.methods.push(MethodInfo::new(flags, name_index, descriptor_index));
            Ok(())
        })
    }

    /// Add a method whose body is produced by `body`, which may add the
    /// constants its instructions reference
    pub fn method_with_code<F>(self, access: u16, name: &str, descriptor: &str, body: F) -> Self
    where
        F: FnOnce(&mut ConstantPool) -> ClassFileResult<MethodBody>,
    {
        self.apply(|class| {
            let pool = &mut class.constant_pool;
            let name_index = pool.add_utf8(name)?;
            let descriptor_index = pool.add_utf8(descriptor)?;
            let body = body(pool)?;
            let mut code = CodeAttribute::new(body.max_stack, body.max_locals, body.code);
            code.exception_table = body.exception_table;
            code.attributes = body.attributes;
            let code_name = pool.add_utf8(attribute_names::CODE)?;
            let mut method = MethodInfo::new(access, name_index, descriptor_index);
            method.attributes.push(AttributeInfo::new(code_name, code.to_bytes()));
            class.methods.push(method);
            Ok(())
        })
    }

    /// Attach a raw attribute to the most recently added method
    pub fn method_attribute<F>(self, name: &str, info: F) -> Self
    where
        F: FnOnce(&mut ConstantPool) -> ClassFileResult<Vec<u8>>,
    {
        self.apply(|class| {
            let name_index = class.constant_pool.add_utf8(name)?;
            let info = info(&mut class.constant_pool)?;
            let method = class.methods.last_mut().ok_or_else(|| ClassFileError::MalformedAttribute {
                name: name.to_string(),
                reason: "no method to attach to".to_string(),
            })?;
            method.attributes.push(AttributeInfo::new(name_index, info));
            Ok(())
        })
    }

    /// Attach a raw class-level attribute
    pub fn attribute<F>(self, name: &str, info: F) -> Self
    where
        F: FnOnce(&mut ConstantPool) -> ClassFileResult<Vec<u8>>,
    {
        self.apply(|class| {
            let name_index = class.constant_pool.add_utf8(name)?;
            let info = info(&mut class.constant_pool)?;
            class.attributes.push(AttributeInfo::new(name_index, info));
            Ok(())
        })
    }

    pub fn into_class_file(self) -> ClassFileResult<ClassFile> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.class),
        }
    }

    pub fn build(self) -> ClassFileResult<Vec<u8>> {
        self.into_class_file().map(|class| class_file_to_bytes(&class))
    }
}
