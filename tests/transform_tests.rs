//! End-to-end tests of a transformation pass over in-memory archives

mod common;

use common::*;
use jremap::archive::{class_entry_name, ArchiveReader, ArchiveReference, Entry};
use jremap::classfile::attribute::{
    bootstrap_methods_to_bytes, parse_method_parameters, AttributeInfo, BootstrapMethod, CodeAttribute,
};
use jremap::classfile::builder::{ClassBuilder, MethodBody};
use jremap::classfile::defs::access_flags::{ACC_ABSTRACT, ACC_INTERFACE, ACC_PUBLIC, ACC_STATIC, ACC_SYNTHETIC};
use jremap::classfile::defs::attribute_names::{BOOTSTRAP_METHODS, METHOD_PARAMETERS, STACK_MAP_TABLE};
use jremap::classfile::defs::{LAMBDA_METAFACTORY, REF_INVOKE_STATIC};
use jremap::classfile::{ClassFile, Constant};
use jremap::classfile::frame::{StackMapFrame, StackMapTable, VerificationType};
use jremap::classfile::opcodes::*;
use jremap::mapping::{ArchiveMapping, ClassMappingBuilder, MethodMappingBuilder};
use jremap::{transform_archive, transform_archive_with, Config, Error, FailurePolicy};

fn to_named(archive: &mut ArchiveReference, mappings: &ArchiveMapping) -> jremap::TransformReport {
    transform_archive(archive, &[], mappings, "obf", "named").unwrap()
}

#[test]
fn test_classes_are_renamed_and_unmapped_classes_keep_their_name() {
    init_logger();
    let mut archive = animal_archive();
    let report = to_named(&mut archive, &animal_mappings());

    assert_eq!(report.transformed.len(), 5);
    assert_eq!(report.renames.len(), 3);
    assert!(report.failures.is_empty());
    assert_eq!(
        archive.names().collect::<Vec<_>>(),
        vec!["pkg/Animal.class", "pkg/Cat.class", "pkg/Dog.class", "x/Host.class", "x/User.class"]
    );
    assert_eq!(class_at(&archive, "x/User").name().unwrap(), "x/User");
    assert_eq!(class_at(&archive, "pkg/Dog").super_name().unwrap(), Some("pkg/Animal"));
}

#[test]
fn test_inherited_members_map_through_subclass_and_declaring_class() {
    init_logger();
    let mut archive = animal_archive();
    to_named(&mut archive, &animal_mappings());

    let user = class_at(&archive, "x/User");
    assert_eq!(
        member_refs(&user),
        vec!["pkg/Animal.speak()V", "pkg/Dog.legsI", "pkg/Dog.speak()V"]
    );
    let animal = class_at(&archive, "pkg/Animal");
    let pool = &animal.constant_pool;
    assert_eq!(pool.utf8(animal.fields[0].name_index).unwrap(), "legs");
    assert_eq!(pool.utf8(method_named(&animal, "greet").descriptor_index).unwrap(), "(Lpkg/Animal;II)V");
    assert_eq!(pool.utf8(method_named(&animal, "speak").descriptor_index).unwrap(), "()V");
}

#[test]
fn test_round_trip_restores_every_name() {
    init_logger();
    let original = animal_archive();
    let mappings = animal_mappings();
    let mut archive = original.clone();
    transform_archive(&mut archive, &[], &mappings, "obf", "named").unwrap();
    assert_ne!(describe(&archive), describe(&original));
    transform_archive(&mut archive, &[], &mappings, "named", "obf").unwrap();
    assert_eq!(describe(&archive), describe(&original));
}

#[test]
fn test_second_pass_is_a_no_op() {
    init_logger();
    let mappings = animal_mappings();
    let mut archive = animal_archive();
    to_named(&mut archive, &mappings);
    let once = archive.clone();
    let report = to_named(&mut archive, &mappings);

    assert!(report.renames.is_empty());
    assert_eq!(archive.names().collect::<Vec<_>>(), once.names().collect::<Vec<_>>());
    for entry in once.iter() {
        assert_eq!(archive.get(&entry.name).unwrap().bytes, entry.bytes, "{} changed", entry.name);
    }
}

#[test]
fn test_parameter_names_fill_gaps_with_synthetic_placeholders() {
    init_logger();
    let mut archive = animal_archive();
    to_named(&mut archive, &animal_mappings());

    let animal = class_at(&archive, "pkg/Animal");
    let pool = &animal.constant_pool;
    let greet = method_named(&animal, "greet");
    let position = greet.attribute_position(pool, METHOD_PARAMETERS).unwrap();
    let parameters = parse_method_parameters(&greet.attributes[position].info).unwrap();
    let names = parameters.iter().map(|p| pool.utf8(p.name_index).unwrap()).collect::<Vec<_>>();
    assert_eq!(names, vec!["foo", "arg1", "bar"]);
    assert!(parameters.iter().all(|p| p.access_flags == ACC_SYNTHETIC));

    let speak = method_named(&animal, "speak");
    assert!(speak.attribute_position(pool, METHOD_PARAMETERS).is_none());
}

#[test]
fn test_parameter_prefix_is_configurable() {
    init_logger();
    let mut archive = animal_archive();
    let config = Config::new().with_parallel(false).with_parameter_prefix("p");
    transform_archive_with(&mut archive, &[], &animal_mappings(), "obf", "named", &config).unwrap();

    let animal = class_at(&archive, "pkg/Animal");
    let greet = method_named(&animal, "greet");
    let position = greet.attribute_position(&animal.constant_pool, METHOD_PARAMETERS).unwrap();
    let parameters = parse_method_parameters(&greet.attributes[position].info).unwrap();
    assert_eq!(animal.constant_pool.utf8(parameters[1].name_index).unwrap(), "p1");
}

fn single_rename() -> ArchiveMapping {
    ArchiveMapping::builder()
        .class(ClassMappingBuilder::new().name("obf", "a/B").name("named", "a/C"))
        .build()
        .unwrap()
}

#[test]
fn test_renamed_class_moves_to_new_entry() {
    init_logger();
    let mut archive = ArchiveReference::new("single");
    archive.insert(entry(ClassBuilder::new("a/B", Some("java/lang/Object"))));
    archive.insert(Entry::new("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".to_vec()));
    let report = to_named(&mut archive, &single_rename());

    assert!(!archive.contains("a/B.class"));
    assert_eq!(archive.names().filter(|n| *n == "a/C.class").count(), 1);
    assert_eq!(class_at(&archive, "a/C").name().unwrap(), "a/C");
    assert!(archive.contains("META-INF/MANIFEST.MF"));
    assert_eq!(report.renames, vec![("a/B.class".to_string(), "a/C.class".to_string())]);
}

#[test]
fn test_write_conflict_leaves_archive_unchanged() {
    init_logger();
    let mut archive = ArchiveReference::new("conflict");
    archive.insert(entry(ClassBuilder::new("a/B", Some("java/lang/Object"))));
    archive.insert(entry(ClassBuilder::new("a/C", Some("java/lang/Object"))));
    let before = archive.clone();

    let result = transform_archive(&mut archive, &[], &single_rename(), "obf", "named");
    match result {
        Err(Error::WriteConflict { destination, sources }) => {
            assert_eq!(destination, "a/C.class");
            assert_eq!(sources.len(), 2);
        }
        other => panic!("expected write conflict, got {:?}", other),
    }
    assert_eq!(archive.iter().collect::<Vec<_>>(), before.iter().collect::<Vec<_>>());
}

#[test]
fn test_corrupt_entry_fails_fast_by_default() {
    init_logger();
    let mut archive = animal_archive();
    archive.insert(Entry::new("bad.class", vec![0xCA, 0xFE, 0xBA, 0xBE, 0]));
    let before = archive.clone();

    match transform_archive(&mut archive, &[], &animal_mappings(), "obf", "named") {
        Err(Error::Entry { name, .. }) => assert_eq!(name, "bad.class"),
        other => panic!("expected entry failure, got {:?}", other),
    }
    assert_eq!(archive.iter().collect::<Vec<_>>(), before.iter().collect::<Vec<_>>());
}

#[test]
fn test_skip_and_continue_commits_the_rest() {
    init_logger();
    let mut archive = animal_archive();
    archive.insert(Entry::new("bad.class", vec![0xCA, 0xFE, 0xBA, 0xBE, 0]));
    let config = Config::new().with_failure_policy(FailurePolicy::SkipAndContinue);
    let report = transform_archive_with(&mut archive, &[], &animal_mappings(), "obf", "named", &config).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "bad.class");
    assert_eq!(archive.get("bad.class").unwrap().bytes.as_ref(), &[0xCA, 0xFE, 0xBA, 0xBE, 0]);
    assert!(archive.contains("pkg/Dog.class"));
    assert!(!archive.contains("b.class"));
}

#[test]
fn test_frames_merge_siblings_in_destination_namespace() {
    init_logger();
    let mut archive = animal_archive();
    to_named(&mut archive, &animal_mappings());

    let table = stack_map(&class_at(&archive, "x/Host"), "pick").unwrap();

    assert_eq!(table.offsets(), vec![14, 21]);
    assert_eq!(
        table.frames[1],
        StackMapFrame::SameLocals1StackItem { offset_delta: 6, stack: VerificationType::object("pkg/Animal") }
    );
}

#[test]
fn test_frames_are_left_alone_when_disabled() {
    init_logger();
    let mut archive = animal_archive();
    let config = Config::new().with_compute_frames(false);
    transform_archive_with(&mut archive, &[], &animal_mappings(), "obf", "named", &config).unwrap();

    let host = class_at(&archive, "x/Host");
    let pick = method_named(&host, "pick");
    let code = CodeAttribute::parse(&pick.attributes[0].info).unwrap();
    assert!(code.attributes.is_empty());
}

#[test]
fn test_members_inherited_from_dependencies_are_mapped() {
    init_logger();
    let mut dependency = ArchiveReference::new("lib");
    dependency.insert(entry(
        ClassBuilder::new("l", Some("java/lang/Object"))
            .method_with_code(ACC_PUBLIC, "m", "()V", |_| Ok(MethodBody::new(0, 1, vec![RETURN]))),
    ));
    let mut archive = ArchiveReference::new("app");
    archive.insert(entry(ClassBuilder::new("e", Some("l")).method_with_code(
        ACC_PUBLIC | ACC_STATIC,
        "go",
        "(Le;)V",
        |pool| {
            let call = pool.add_method_ref("e", "m", "()V")?.to_be_bytes();
            Ok(MethodBody::new(1, 1, vec![ALOAD_0, INVOKEVIRTUAL, call[0], call[1], RETURN]))
        },
    )));
    let mappings = ArchiveMapping::builder()
        .class(
            ClassMappingBuilder::new()
                .name("obf", "l")
                .name("named", "lib/Task")
                .method(MethodMappingBuilder::new().name("obf", "m", "()V").name("named", "run", "()V")),
        )
        .class(ClassMappingBuilder::new().name("obf", "e").name("named", "app/Job"))
        .build()
        .unwrap();

    let dependencies: Vec<&dyn ArchiveReader> = vec![&dependency];
    transform_archive(&mut archive, &dependencies, &mappings, "obf", "named").unwrap();

    let job = class_at(&archive, "app/Job");
    assert_eq!(job.super_name().unwrap(), Some("lib/Task"));
    assert_eq!(member_refs(&job), vec!["app/Job.run()V".to_string()]);
    assert!(dependency.contains(&class_entry_name("l")));
}

/// `i` is an interface declaring `v(I)I`, `k` implements it
fn func_mappings() -> ArchiveMapping {
    ArchiveMapping::builder()
        .class(
            ClassMappingBuilder::new()
                .name("obf", "i")
                .name("named", "pkg/Func")
                .method(MethodMappingBuilder::new().name("obf", "v", "(I)I").name("named", "apply", "(I)I")),
        )
        .class(ClassMappingBuilder::new().name("obf", "k").name("named", "pkg/Impl"))
        .build()
        .unwrap()
}

fn func_archive() -> ArchiveReference {
    let mut archive = ArchiveReference::new("func");
    archive.insert(entry(
        ClassBuilder::new("i", Some("java/lang/Object"))
            .access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
            .method("v", "(I)I"),
    ));
    archive.insert(entry(
        ClassBuilder::new("k", Some("java/lang/Object"))
            .interface("i")
            .method_with_code(ACC_PUBLIC, "v", "(I)I", |_| Ok(MethodBody::new(1, 2, vec![ILOAD_1, IRETURN]))),
    ));
    archive
}

/// `(bootstrap index, name, descriptor)` of every invokedynamic constant
fn call_sites(class: &ClassFile) -> Vec<(u16, String, String)> {
    let pool = &class.constant_pool;
    let mut sites = pool
        .iter()
        .filter_map(|(_, c)| match *c {
            Constant::InvokeDynamic(bootstrap, nat) => {
                let (name, descriptor) = pool.name_and_type(nat).unwrap();
                Some((bootstrap, name.to_string(), descriptor.to_string()))
            }
            _ => None,
        })
        .collect::<Vec<_>>();
    sites.sort();
    sites
}

#[test]
fn test_interface_member_maps_through_implementing_class() {
    init_logger();
    let mut archive = func_archive();
    archive.insert(entry(ClassBuilder::new("x/Caller", Some("java/lang/Object")).method_with_code(
        ACC_PUBLIC | ACC_STATIC,
        "call",
        "(Lk;)I",
        |pool| {
            let via_class = pool.add_method_ref("k", "v", "(I)I")?.to_be_bytes();
            let via_interface = pool.add_interface_method_ref("i", "v", "(I)I")?.to_be_bytes();
            Ok(MethodBody::new(2, 1, vec![
                ALOAD_0, ICONST_1, INVOKEVIRTUAL, via_class[0], via_class[1], POP,
                ALOAD_0, ICONST_1, INVOKEINTERFACE, via_interface[0], via_interface[1], 2, 0,
                IRETURN,
            ]))
        },
    )));
    to_named(&mut archive, &func_mappings());

    assert_eq!(
        member_refs(&class_at(&archive, "x/Caller")),
        vec!["pkg/Func.apply(I)I", "pkg/Impl.apply(I)I"]
    );
    let implementation = class_at(&archive, "pkg/Impl");
    method_named(&implementation, "apply");
    assert_eq!(
        implementation.constant_pool.class_name(implementation.interfaces[0]).unwrap(),
        "pkg/Func"
    );
}

#[test]
fn test_lambda_call_site_follows_interface_method() {
    init_logger();
    const METAFACTORY_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;\
        Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;\
        Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";
    let mut archive = func_archive();
    archive.insert(entry(
        ClassBuilder::new("x/Lam", Some("java/lang/Object"))
            .method_with_code(ACC_PUBLIC | ACC_STATIC, "run", "()I", |pool| {
                let lambda = pool.add_invoke_dynamic(0, "v", "()Li;")?.to_be_bytes();
                let other = pool.add_invoke_dynamic(1, "v", "()Li;")?.to_be_bytes();
                let call = pool.add_interface_method_ref("i", "v", "(I)I")?.to_be_bytes();
                Ok(MethodBody::new(2, 0, vec![
                    INVOKEDYNAMIC, lambda[0], lambda[1], 0, 0, POP,
                    INVOKEDYNAMIC, other[0], other[1], 0, 0,
                    ICONST_1, INVOKEINTERFACE, call[0], call[1], 2, 0,
                    IRETURN,
                ]))
            })
            .method_with_code(ACC_STATIC | ACC_SYNTHETIC, "lambda$run$0", "(I)I", |_| {
                Ok(MethodBody::new(2, 1, vec![ILOAD_0, ICONST_1, IADD, IRETURN]))
            })
            .attribute(BOOTSTRAP_METHODS, |pool| {
                let metafactory = pool.add_method_ref(LAMBDA_METAFACTORY, "metafactory", METAFACTORY_DESCRIPTOR)?;
                let metafactory = pool.add_method_handle(REF_INVOKE_STATIC, metafactory)?;
                let other = pool.add_method_ref("x/Factory", "make", METAFACTORY_DESCRIPTOR)?;
                let other = pool.add_method_handle(REF_INVOKE_STATIC, other)?;
                let sam = pool.add_method_type("(I)I")?;
                let body = pool.add_method_ref("x/Lam", "lambda$run$0", "(I)I")?;
                let body = pool.add_method_handle(REF_INVOKE_STATIC, body)?;
                Ok(bootstrap_methods_to_bytes(&[
                    BootstrapMethod { method_ref: metafactory, arguments: vec![sam, body, sam] },
                    BootstrapMethod { method_ref: other, arguments: vec![sam] },
                ]))
            }),
    ));
    to_named(&mut archive, &func_mappings());

    let lam = class_at(&archive, "x/Lam");
    assert_eq!(
        call_sites(&lam),
        vec![
            (0, "apply".to_string(), "()Lpkg/Func;".to_string()),
            (1, "v".to_string(), "()Lpkg/Func;".to_string()),
        ]
    );
    assert!(member_refs(&lam).contains(&"pkg/Func.apply(I)I".to_string()));
    assert!(member_refs(&lam).contains(&"x/Lam.lambda$run$0(I)I".to_string()));
}

/// `static int size(boolean z)` choosing between two platform collections:
/// `(z ? new ArrayList() : new ArrayDeque()).size()`
fn platform_merge_class(frames: Option<StackMapTable>) -> Entry {
    entry(ClassBuilder::new("x/Plat", Some("java/lang/Object")).method_with_code(
        ACC_PUBLIC | ACC_STATIC,
        "size",
        "(Z)I",
        |pool| {
            let list = pool.add_class("java/util/ArrayList")?.to_be_bytes();
            let list_init = pool.add_method_ref("java/util/ArrayList", "<init>", "()V")?.to_be_bytes();
            let deque = pool.add_class("java/util/ArrayDeque")?.to_be_bytes();
            let deque_init = pool.add_method_ref("java/util/ArrayDeque", "<init>", "()V")?.to_be_bytes();
            let size = pool.add_method_ref("java/util/AbstractCollection", "size", "()I")?.to_be_bytes();
            let mut body = MethodBody::new(2, 1, vec![
                ILOAD_0, IFEQ, 0, 13,
                NEW, list[0], list[1], DUP, INVOKESPECIAL, list_init[0], list_init[1],
                GOTO, 0, 10,
                NEW, deque[0], deque[1], DUP, INVOKESPECIAL, deque_init[0], deque_init[1],
                INVOKEVIRTUAL, size[0], size[1],
                IRETURN,
            ]);
            if let Some(frames) = &frames {
                let name = pool.add_utf8(STACK_MAP_TABLE)?;
                body = body.with_attribute(AttributeInfo::new(name, frames.to_bytes(pool)?));
            }
            Ok(body)
        },
    ))
}

fn collection_frames() -> StackMapTable {
    StackMapTable {
        frames: vec![
            StackMapFrame::Same { offset_delta: 14 },
            StackMapFrame::SameLocals1StackItem {
                offset_delta: 6,
                stack: VerificationType::object("java/util/AbstractCollection"),
            },
        ],
    }
}

#[test]
fn test_merge_with_unknown_platform_type_keeps_original_frames() {
    init_logger();
    let mut archive = ArchiveReference::new("plat");
    archive.insert(platform_merge_class(Some(collection_frames())));
    to_named(&mut archive, &animal_mappings());

    let table = stack_map(&class_at(&archive, "x/Plat"), "size").unwrap();
    assert_eq!(table, collection_frames());
}

#[test]
fn test_platform_archive_dependency_supplies_merge_ancestor() {
    init_logger();
    let mut platform = ArchiveReference::new("rt");
    platform.insert(entry(ClassBuilder::new("java/util/ArrayDeque", Some("java/util/AbstractCollection"))));
    let mut archive = ArchiveReference::new("plat");
    archive.insert(platform_merge_class(None));

    let dependencies: Vec<&dyn ArchiveReader> = vec![&platform];
    transform_archive(&mut archive, &dependencies, &animal_mappings(), "obf", "named").unwrap();

    let table = stack_map(&class_at(&archive, "x/Plat"), "size").unwrap();
    assert_eq!(table, collection_frames());
}
