// Common test utilities
#![allow(dead_code)]

use jremap::archive::{class_entry_name, ArchiveReference, Entry};
use jremap::classfile::builder::{ClassBuilder, MethodBody};
use jremap::classfile::defs::access_flags::{ACC_PUBLIC, ACC_STATIC};
use jremap::classfile::attribute::CodeAttribute;
use jremap::classfile::defs::attribute_names::{CODE, STACK_MAP_TABLE};
use jremap::classfile::frame::StackMapTable;
use jremap::classfile::method::MethodInfo;
use jremap::classfile::opcodes::*;
use jremap::classfile::{class_file_to_bytes, parse_class, ClassFile, Constant};
use jremap::mapping::{ArchiveMapping, ClassMappingBuilder, FieldMappingBuilder, MethodMappingBuilder};

/// Initialize logger for diagnostics
pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// Archive entry holding the class built by `builder`
pub fn entry(builder: ClassBuilder) -> Entry {
    let class = builder.into_class_file().unwrap();
    Entry::new(class_entry_name(class.name().unwrap()), class_file_to_bytes(&class))
}

pub fn class_at(archive: &ArchiveReference, name: &str) -> ClassFile {
    let entry = archive
        .get(&class_entry_name(name))
        .unwrap_or_else(|| panic!("no entry for {}", name));
    parse_class(&entry.bytes).unwrap()
}

pub fn method_named<'c>(class: &'c ClassFile, name: &str) -> &'c MethodInfo {
    class
        .methods
        .iter()
        .find(|m| class.constant_pool.utf8(m.name_index).unwrap() == name)
        .unwrap_or_else(|| panic!("no method {}", name))
}

/// StackMapTable of the Code of method `name`, if it has one
pub fn stack_map(class: &ClassFile, name: &str) -> Option<StackMapTable> {
    let pool = &class.constant_pool;
    let method = method_named(class, name);
    let code = CodeAttribute::parse(&method.attributes[method.attribute_position(pool, CODE)?].info).unwrap();
    code.attributes
        .iter()
        .find(|a| pool.utf8(a.name_index).unwrap() == STACK_MAP_TABLE)
        .map(|a| StackMapTable::parse(&a.info, pool).unwrap())
}

/// `owner.name descriptor` of every field and method reference in the pool
pub fn member_refs(class: &ClassFile) -> Vec<String> {
    let pool = &class.constant_pool;
    let mut refs = pool
        .iter()
        .filter(|(_, c)| matches!(c, Constant::FieldRef(..) | Constant::MethodRef(..) | Constant::InterfaceMethodRef(..)))
        .map(|(i, _)| {
            let (owner, name, descriptor) = pool.member_ref(i).unwrap();
            format!("{}.{}{}", owner, name, descriptor)
        })
        .collect::<Vec<_>>();
    refs.sort();
    refs
}

/// Every name a class declares or references, one line each, sorted
pub fn describe(archive: &ArchiveReference) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in archive.iter().filter(|e| e.is_class()) {
        let class = parse_class(&entry.bytes).unwrap();
        let pool = &class.constant_pool;
        let name = class.name().unwrap();
        lines.push(format!("{} class {} extends {:?}", entry.name, name, class.super_name().unwrap()));
        for field in &class.fields {
            let field_name = pool.utf8(field.name_index).unwrap();
            lines.push(format!("{} field {}:{}", name, field_name, pool.utf8(field.descriptor_index).unwrap()));
        }
        for method in &class.methods {
            let method_name = pool.utf8(method.name_index).unwrap();
            lines.push(format!("{} method {}{}", name, method_name, pool.utf8(method.descriptor_index).unwrap()));
        }
        lines.extend(member_refs(&class).into_iter().map(|r| format!("{} ref {}", name, r)));
    }
    lines.sort();
    lines
}

/// Mapping from `obf` to `named`:
/// `a` → `pkg/Animal` (methods `m` → `speak`, `n` → `greet`, field `f` → `legs`),
/// `b` → `pkg/Dog`, `c` → `pkg/Cat`
pub fn animal_mappings() -> ArchiveMapping {
    ArchiveMapping::builder()
        .class(
            ClassMappingBuilder::new()
                .name("obf", "a")
                .name("named", "pkg/Animal")
                .method(MethodMappingBuilder::new().name("obf", "m", "()V").name("named", "speak", "()V"))
                .method(
                    MethodMappingBuilder::new()
                        .name("obf", "n", "(La;II)V")
                        .name("named", "greet", "(Lpkg/Animal;II)V")
                        .parameter(0, "named", "foo")
                        .parameter(2, "named", "bar"),
                )
                .field(FieldMappingBuilder::new().name("obf", "f", "I").name("named", "legs", "I")),
        )
        .class(ClassMappingBuilder::new().name("obf", "b").name("named", "pkg/Dog"))
        .class(ClassMappingBuilder::new().name("obf", "c").name("named", "pkg/Cat"))
        .build()
        .unwrap()
}

/// Classes `a`, `b extends a`, `c extends a`, and two unmapped users of them:
/// `x/User.run(Lb;)V` calls `m` and reads `f` through `b` and `a`, and
/// `x/Host.pick(Z)La;` returns either a new `b` or a new `c`
pub fn animal_archive() -> ArchiveReference {
    let mut archive = ArchiveReference::new("animals");
    archive.insert(entry(
        ClassBuilder::new("a", Some("java/lang/Object"))
            .field("f", "I")
            .method_with_code(ACC_PUBLIC, "m", "()V", |_| Ok(MethodBody::new(0, 1, vec![RETURN])))
            .method_with_code(ACC_PUBLIC, "n", "(La;II)V", |_| Ok(MethodBody::new(0, 4, vec![RETURN]))),
    ));
    archive.insert(entry(ClassBuilder::new("b", Some("a"))));
    archive.insert(entry(ClassBuilder::new("c", Some("a"))));
    archive.insert(entry(ClassBuilder::new("x/User", Some("java/lang/Object")).method_with_code(
        ACC_PUBLIC | ACC_STATIC,
        "run",
        "(Lb;)V",
        |pool| {
            let via_b = pool.add_method_ref("b", "m", "()V")?.to_be_bytes();
            let via_a = pool.add_method_ref("a", "m", "()V")?.to_be_bytes();
            let field = pool.add_field_ref("b", "f", "I")?.to_be_bytes();
            Ok(MethodBody::new(1, 1, vec![
                ALOAD_0, INVOKEVIRTUAL, via_b[0], via_b[1],
                ALOAD_0, INVOKEVIRTUAL, via_a[0], via_a[1],
                ALOAD_0, GETFIELD, field[0], field[1], POP,
                RETURN,
            ]))
        },
    )));
    archive.insert(entry(ClassBuilder::new("x/Host", Some("java/lang/Object")).method_with_code(
        ACC_PUBLIC | ACC_STATIC,
        "pick",
        "(Z)La;",
        |pool| {
            let dog = pool.add_class("b")?.to_be_bytes();
            let dog_init = pool.add_method_ref("b", "<init>", "()V")?.to_be_bytes();
            let cat = pool.add_class("c")?.to_be_bytes();
            let cat_init = pool.add_method_ref("c", "<init>", "()V")?.to_be_bytes();
            Ok(MethodBody::new(2, 1, vec![
                ILOAD_0, IFEQ, 0, 13,
                NEW, dog[0], dog[1], DUP, INVOKESPECIAL, dog_init[0], dog_init[1],
                GOTO, 0, 10,
                NEW, cat[0], cat[1], DUP, INVOKESPECIAL, cat_init[0], cat_init[1],
                ARETURN,
            ]))
        },
    )));
    archive
}
