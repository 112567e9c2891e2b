//! Trait-based serialization for classfile structures, plus the frame-aware `ClassWriter`

use std::io::Write;

use super::analysis::FrameComputer;
use super::attribute::{AttributeInfo, CodeAttribute};
use super::class::ClassFile;
use super::constpool::ConstantPool;
use super::defs::{attribute_names, FIRST_FRAME_VERSION};
use super::error::ClassFileResult;
use super::frame::StackMapTable;
use super::hierarchy::TypeLoader;

/// An object which can be written into a classfile.
pub trait ClassfileWritable {
    /// Writes the bytes of this object into the given buffer.
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()>;

    /// Writes the bytes of this object into a newly created buffer.
    fn to_classfile_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        let _ = self.write_to_classfile(&mut buffer);
        buffer
    }
}

impl ClassfileWritable for ClassFile {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        buffer.write_all(&self.magic.to_be_bytes())?;
        buffer.write_all(&self.minor_version.to_be_bytes())?;
        buffer.write_all(&self.major_version.to_be_bytes())?;

        self.constant_pool.write_to_classfile(buffer)?;

        buffer.write_all(&self.access_flags.to_be_bytes())?;
        buffer.write_all(&self.this_class.to_be_bytes())?;
        buffer.write_all(&self.super_class.to_be_bytes())?;

        buffer.write_all(&(self.interfaces.len() as u16).to_be_bytes())?;
        for interface in &self.interfaces {
            buffer.write_all(&interface.to_be_bytes())?;
        }

        buffer.write_all(&(self.fields.len() as u16).to_be_bytes())?;
        for field in &self.fields {
            buffer.write_all(&field.to_bytes())?;
        }

        buffer.write_all(&(self.methods.len() as u16).to_be_bytes())?;
        for method in &self.methods {
            buffer.write_all(&method.to_bytes())?;
        }

        buffer.write_all(&(self.attributes.len() as u16).to_be_bytes())?;
        for attribute in &self.attributes {
            buffer.write_all(&attribute.to_bytes())?;
        }
        Ok(())
    }
}

impl ClassfileWritable for ConstantPool {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        buffer.write_all(&self.to_bytes())
    }
}

/// Serialize a class tree as-is
pub fn class_file_to_bytes(class_file: &ClassFile) -> Vec<u8> {
    class_file.to_classfile_bytes()
}

/// Encodes class trees, optionally recomputing every method's StackMapTable.
/// Reference types are merged through `loader`.
pub struct ClassWriter<'a> {
    loader: &'a dyn TypeLoader,
    compute_frames: bool,
}

impl<'a> ClassWriter<'a> {
    pub fn new(loader: &'a dyn TypeLoader) -> Self {
        Self { loader, compute_frames: true }
    }

    pub fn with_compute_frames(mut self, compute_frames: bool) -> Self {
        self.compute_frames = compute_frames;
        self
    }

    /// Encode `class`. Frame computation may append constants to its pool.
    pub fn write(&self, class: &mut ClassFile) -> ClassFileResult<Vec<u8>> {
        if self.compute_frames && class.major_version >= FIRST_FRAME_VERSION {
            self.recompute_frames(class)?;
        }
        Ok(class_file_to_bytes(class))
    }

    fn recompute_frames(&self, class: &mut ClassFile) -> ClassFileResult<()> {
        let class_name = class.name()?.to_string();
        for i in 0..class.methods.len() {
            let method = &class.methods[i];
            let Some(position) = method.attribute_position(&class.constant_pool, attribute_names::CODE) else {
                continue;
            };
            let mut code = CodeAttribute::parse(&method.attributes[position].info)?;
            let name = class.constant_pool.utf8(method.name_index)?.to_string();
            let descriptor = class.constant_pool.utf8(method.descriptor_index)?.to_string();
            let computed = FrameComputer::new(self.loader, &class.constant_pool, &class_name)
                .compute(&name, &descriptor, method.is_static(), &code);

            let computed = match computed {
                Ok(computed) => computed,
                Err(e) => {
                    log::warn!("Keeping original frames of {}.{}{}: {}", class_name, name, descriptor, e);
                    continue;
                }
            };

            let pool = &mut class.constant_pool;
            let existing = code.attributes.iter().position(|a| {
                pool.utf8(a.name_index).map(|n| n == attribute_names::STACK_MAP_TABLE).unwrap_or(false)
            });
            let table = StackMapTable::compress(&computed.initial_locals, &computed.frames);
            if table.frames.is_empty() {
                if let Some(p) = existing {
                    code.attributes.remove(p);
                }
            } else {
                let info = table.to_bytes(pool)?;
                let attribute = AttributeInfo::new(pool.add_utf8(attribute_names::STACK_MAP_TABLE)?, info);
                match existing {
                    Some(p) => code.attributes[p] = attribute,
                    None => code.attributes.push(attribute),
                }
            }
            log::debug!("Recomputed {} frames for {}.{}{}", table.frames.len(), class_name, name, descriptor);
            class.methods[i].attributes[position].info = code.to_bytes();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::builder::{ClassBuilder, MethodBody};
    use crate::classfile::defs::{access_flags::*, OBJECT_CLASS};
    use crate::classfile::frame::{StackMapFrame, VerificationType};
    use crate::classfile::hierarchy::HierarchyNode;
    use crate::classfile::opcodes::*;
    use crate::classfile::reader::parse_class;

    struct FlatLoader;

    impl TypeLoader for FlatLoader {
        fn load_type(&self, name: &str) -> Option<HierarchyNode> {
            Some(HierarchyNode::new(name, Some(OBJECT_CLASS.to_string())))
        }
    }

    /// Knows no classes at all
    struct EmptyLoader;

    impl TypeLoader for EmptyLoader {
        fn load_type(&self, _name: &str) -> Option<HierarchyNode> {
            None
        }
    }

    fn stack_map(class: &ClassFile, method: usize) -> Option<StackMapTable> {
        let pool = &class.constant_pool;
        let position = class.methods[method].attribute_position(pool, attribute_names::CODE)?;
        let code = CodeAttribute::parse(&class.methods[method].attributes[position].info).unwrap();
        code.attributes
            .iter()
            .find(|a| pool.utf8(a.name_index).unwrap() == attribute_names::STACK_MAP_TABLE)
            .map(|a| StackMapTable::parse(&a.info, pool).unwrap())
    }

    fn branching_class() -> ClassFile {
        ClassBuilder::new("a/Host", Some(OBJECT_CLASS))
            .method_with_code(ACC_PUBLIC | ACC_STATIC, "abs", "(I)I", |_| {
                Ok(MethodBody::new(1, 1, vec![ILOAD_0, IFGE, 0, 6, ILOAD_0, INEG, IRETURN, ILOAD_0, IRETURN]))
            })
            .into_class_file()
            .unwrap()
    }

    #[test]
    fn test_write_adds_frames_at_branch_targets() {
        let mut class = branching_class();
        let bytes = ClassWriter::new(&FlatLoader).write(&mut class).unwrap();
        let reparsed = parse_class(&bytes).unwrap();
        let table = stack_map(&reparsed, 0).unwrap();
        assert_eq!(table.offsets(), vec![7]);
        assert_eq!(table.frames[0], StackMapFrame::Same { offset_delta: 7 });
    }

    #[test]
    fn test_frames_skipped_when_disabled_or_old_version() {
        let mut class = branching_class();
        let bytes = ClassWriter::new(&FlatLoader).with_compute_frames(false).write(&mut class).unwrap();
        assert!(stack_map(&parse_class(&bytes).unwrap(), 0).is_none());

        let mut class = branching_class();
        class.major_version = 49;
        let bytes = ClassWriter::new(&FlatLoader).write(&mut class).unwrap();
        assert!(stack_map(&parse_class(&bytes).unwrap(), 0).is_none());
    }

    #[test]
    fn test_unsupported_method_keeps_original_table() {
        let mut class = ClassBuilder::new("a/Host", Some(OBJECT_CLASS))
            .method_with_code(ACC_PUBLIC | ACC_STATIC, "old", "()V", |_| {
                Ok(MethodBody::new(1, 1, vec![JSR, 0, 4, RETURN, ASTORE_0, RET, 0]))
            })
            .into_class_file()
            .unwrap();
        let before = class.methods[0].attributes.clone();
        ClassWriter::new(&FlatLoader).write(&mut class).unwrap();
        assert_eq!(class.methods[0].attributes, before);
    }

    #[test]
    fn test_merged_stack_value_is_encoded_through_pool() {
        let mut class = ClassBuilder::new("a/Host", Some(OBJECT_CLASS))
            .method_with_code(ACC_PUBLIC | ACC_STATIC, "pick", "(Z)Ljava/lang/Object;", |pool| {
                let text = pool.add_string("text")? as u8;
                Ok(MethodBody::new(1, 1, vec![ILOAD_0, IFEQ, 0, 8, LDC, text, GOTO, 0, 4, ACONST_NULL, ARETURN]))
            })
            .into_class_file()
            .unwrap();
        let bytes = ClassWriter::new(&FlatLoader).write(&mut class).unwrap();
        let reparsed = parse_class(&bytes).unwrap();
        let table = stack_map(&reparsed, 0).unwrap();
        assert_eq!(table.offsets(), vec![9, 10]);
        assert_eq!(
            table.frames[1],
            StackMapFrame::SameLocals1StackItem {
                offset_delta: 0,
                stack: VerificationType::object("java/lang/String"),
            }
        );
    }

    #[test]
    fn test_unresolvable_merge_keeps_original_table() {
        let original = StackMapTable {
            frames: vec![
                StackMapFrame::Same { offset_delta: 11 },
                StackMapFrame::SameLocals1StackItem { offset_delta: 3, stack: VerificationType::object("a/Base") },
            ],
        };
        let mut class = ClassBuilder::new("a/Host", Some(OBJECT_CLASS))
            .method_with_code(ACC_PUBLIC | ACC_STATIC, "pick", "(ILjava/lang/Object;)Ljava/lang/Object;", |pool| {
                let [o1, o2] = pool.add_class("a/One")?.to_be_bytes();
                let [t1, t2] = pool.add_class("a/Two")?.to_be_bytes();
                let name = pool.add_utf8(attribute_names::STACK_MAP_TABLE)?;
                let table = AttributeInfo::new(name, original.to_bytes(pool)?);
                Ok(MethodBody::new(1, 2, vec![
                    ILOAD_0, IFEQ, 0, 10,
                    ALOAD_1, CHECKCAST, o1, o2,
                    GOTO, 0, 7,
                    ALOAD_1, CHECKCAST, t1, t2,
                    ARETURN,
                ])
                .with_attribute(table))
            })
            .into_class_file()
            .unwrap();
        let bytes = ClassWriter::new(&EmptyLoader).write(&mut class).unwrap();
        assert_eq!(stack_map(&parse_class(&bytes).unwrap(), 0), Some(original));
    }
}
