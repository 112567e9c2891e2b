//! Class file decoding: bytes to `ClassFile` tree, or just the header

use super::attribute::AttributeInfo;
use super::class::ClassFile;
use super::constpool::{constant_tags::*, decode_modified_utf8, Constant, ConstantPool};
use super::defs::MAGIC;
use super::error::{ClassFileError, ClassFileResult};
use super::field::FieldInfo;
use super::method::MethodInfo;

/// Big-endian cursor over class file bytes
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn bytes(&mut self, len: usize) -> ClassFileResult<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len()).ok_or(
            ClassFileError::UnexpectedEof {
                offset: self.pos,
                needed: len.saturating_sub(self.data.len().saturating_sub(self.pos)),
            },
        )?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn u8(&mut self) -> ClassFileResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> ClassFileResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> ClassFileResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> ClassFileResult<u64> {
        let hi = self.u32()? as u64;
        let lo = self.u32()? as u64;
        Ok((hi << 32) | lo)
    }

    pub fn u16_list(&mut self) -> ClassFileResult<Vec<u16>> {
        let count = self.u16()?;
        (0..count).map(|_| self.u16()).collect()
    }
}

/// Just enough of a class file to place it in a hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub access_flags: u16,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
}

impl ClassHeader {
    /// Decode the constant pool and the header, stopping before fields
    pub fn parse(bytes: &[u8]) -> ClassFileResult<Self> {
        let mut reader = ByteReader::new(bytes);
        read_magic(&mut reader)?;
        let _minor = reader.u16()?;
        let _major = reader.u16()?;
        let pool = read_constant_pool(&mut reader)?;
        let access_flags = reader.u16()?;
        let this_class = reader.u16()?;
        let super_class = reader.u16()?;
        let interfaces = reader.u16_list()?;

        let name = pool.class_name(this_class)?.to_string();
        let super_name = match super_class {
            0 => None,
            index => Some(pool.class_name(index)?.to_string()),
        };
        let interfaces = interfaces
            .iter()
            .map(|&index| pool.class_name(index).map(str::to_string))
            .collect::<ClassFileResult<Vec<_>>>()?;

        Ok(Self { access_flags, name, super_name, interfaces })
    }
}

/// Decode a complete class file
pub fn parse_class(bytes: &[u8]) -> ClassFileResult<ClassFile> {
    let mut reader = ByteReader::new(bytes);
    let magic = read_magic(&mut reader)?;
    let minor_version = reader.u16()?;
    let major_version = reader.u16()?;
    let constant_pool = read_constant_pool(&mut reader)?;
    let access_flags = reader.u16()?;
    let this_class = reader.u16()?;
    let super_class = reader.u16()?;
    let interfaces = reader.u16_list()?;

    let field_count = reader.u16()?;
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        let access_flags = reader.u16()?;
        let name_index = reader.u16()?;
        let descriptor_index = reader.u16()?;
        let mut field = FieldInfo::new(access_flags, name_index, descriptor_index);
        field.attributes = read_attributes(&mut reader)?;
        fields.push(field);
    }

    let method_count = reader.u16()?;
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        let access_flags = reader.u16()?;
        let name_index = reader.u16()?;
        let descriptor_index = reader.u16()?;
        let mut method = MethodInfo::new(access_flags, name_index, descriptor_index);
        method.attributes = read_attributes(&mut reader)?;
        methods.push(method);
    }

    let attributes = read_attributes(&mut reader)?;

    Ok(ClassFile {
        magic,
        minor_version,
        major_version,
        constant_pool,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    })
}

fn read_magic(reader: &mut ByteReader<'_>) -> ClassFileResult<u32> {
    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ClassFileError::InvalidMagic(magic));
    }
    Ok(magic)
}

pub(crate) fn read_attributes(reader: &mut ByteReader<'_>) -> ClassFileResult<Vec<AttributeInfo>> {
    let count = reader.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = reader.u16()?;
        let length = reader.u32()? as usize;
        let info = reader.bytes(length)?.to_vec();
        attributes.push(AttributeInfo::new(name_index, info));
    }
    Ok(attributes)
}

fn read_constant_pool(reader: &mut ByteReader<'_>) -> ClassFileResult<ConstantPool> {
    let count = reader.u16()?;
    let mut constants: Vec<Constant> = Vec::with_capacity(count as usize);
    let mut index: u16 = 1;
    while index < count {
        let tag = reader.u8()?;
        let constant = match tag {
            CONSTANT_UTF8 => {
                let len = reader.u16()? as usize;
                let raw = reader.bytes(len)?;
                match decode_modified_utf8(raw) {
                    Some(value) => Constant::Utf8(value),
                    None => {
                        log::debug!("constant #{} is not valid modified UTF-8, keeping raw bytes", index);
                        Constant::RawUtf8(raw.to_vec())
                    }
                }
            }
            CONSTANT_INTEGER => Constant::Integer(reader.u32()? as i32),
            CONSTANT_FLOAT => Constant::Float(f32::from_bits(reader.u32()?)),
            CONSTANT_LONG => Constant::Long(reader.u64()? as i64),
            CONSTANT_DOUBLE => Constant::Double(f64::from_bits(reader.u64()?)),
            CONSTANT_CLASS => Constant::Class(reader.u16()?),
            CONSTANT_STRING => Constant::String(reader.u16()?),
            CONSTANT_FIELDREF => Constant::FieldRef(reader.u16()?, reader.u16()?),
            CONSTANT_METHODREF => Constant::MethodRef(reader.u16()?, reader.u16()?),
            CONSTANT_INTERFACEMETHODREF => Constant::InterfaceMethodRef(reader.u16()?, reader.u16()?),
            CONSTANT_NAMEANDTYPE => Constant::NameAndType(reader.u16()?, reader.u16()?),
            CONSTANT_METHODHANDLE => Constant::MethodHandle(reader.u8()?, reader.u16()?),
            CONSTANT_METHODTYPE => Constant::MethodType(reader.u16()?),
            CONSTANT_DYNAMIC => Constant::Dynamic(reader.u16()?, reader.u16()?),
            CONSTANT_INVOKEDYNAMIC => Constant::InvokeDynamic(reader.u16()?, reader.u16()?),
            CONSTANT_MODULE => Constant::Module(reader.u16()?),
            CONSTANT_PACKAGE => Constant::Package(reader.u16()?),
            tag => return Err(ClassFileError::UnknownConstantTag { tag, index }),
        };
        let wide = constant.slots() == 2;
        constants.push(constant);
        index += 1;
        if wide {
            constants.push(Constant::Unusable);
            index += 1;
        }
    }
    Ok(ConstantPool::from_constants(constants))
}
