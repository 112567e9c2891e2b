//! Archive-wide namespace transformation
//!
//! A pass runs in five phases:
//!
//! ```text
//! Inheritance trees → Remapper + Writer → per-entry rewrite (rayon) → conflict check → commit
//!                                           ↓
//!                          decode → remap → parameters → encode
//! ```
//!
//! The archive is only read until every entry has been rewritten; all results
//! are then committed in one serialized phase.

pub mod class_remapper;
pub mod hierarchy;
pub mod inheritance;
pub mod parameters;
pub mod remapper;

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;

pub use class_remapper::ClassRemapper;
pub use hierarchy::{
    ArchiveTypeSource, DependencyTypeSource, HierarchyAwareWriter, PlatformTypeSource, TypeSource,
};
pub use inheritance::{InheritancePath, InheritanceTree, NodeId};
pub use parameters::ParameterMetadataRewriter;
pub use remapper::NamespaceRemapper;

use crate::archive::{class_entry_name, ArchiveReader, ArchiveReference, DelegatingArchiveReader, Entry};
use crate::classfile::parse_class;
use crate::config::{Config, FailurePolicy};
use crate::error::{Error, Result};
use crate::mapping::ArchiveMapping;

/// Outcome of one pass
#[derive(Debug, Default)]
pub struct TransformReport {
    /// Final entry names of every rewritten class
    pub transformed: Vec<String>,
    /// `(old entry name, new entry name)` of every renamed class
    pub renames: Vec<(String, String)>,
    /// Entries left untouched under `FailurePolicy::SkipAndContinue`
    pub failures: Vec<(String, Error)>,
}

/// Rewrite every class of `archive` from namespace `from` to `to` with the default `Config`
pub fn transform_archive(
    archive: &mut ArchiveReference,
    dependencies: &[&dyn ArchiveReader],
    mappings: &ArchiveMapping,
    from: &str,
    to: &str,
) -> Result<TransformReport> {
    transform_archive_with(archive, dependencies, mappings, from, to, &Config::default())
}

/// Rewrite every class of `archive` from namespace `from` to `to`.
///
/// Dependencies are only consulted for hierarchy facts. Under
/// `FailurePolicy::FailFast` the first failing entry aborts the pass and the
/// archive is left unchanged; a write conflict always does.
pub fn transform_archive_with(
    archive: &mut ArchiveReference,
    dependencies: &[&dyn ArchiveReader],
    mappings: &ArchiveMapping,
    from: &str,
    to: &str,
    config: &Config,
) -> Result<TransformReport> {
    log::info!("Transforming {} from {} to {}", archive.name(), from, to);
    let results = rewrite_entries(archive, dependencies, mappings, from, to, config);

    let mut rewritten = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (name, result) in results {
        match result {
            Ok(output) => rewritten.push((name, output)),
            Err(e) => match config.failure_policy {
                FailurePolicy::FailFast => return Err(e.in_entry(name)),
                FailurePolicy::SkipAndContinue => {
                    log::warn!("Leaving {} untouched: {}", name, e);
                    failures.push((name, e));
                }
            },
        }
    }

    // Phase 4: Conflict check
    check_conflicts(archive, &rewritten)?;

    // Phase 5: Commit. Renamed sources are removed first so swapped names survive.
    let mut report = TransformReport { failures, ..TransformReport::default() };
    for (name, output) in &rewritten {
        if *name != output.name {
            archive.remove(name);
            report.renames.push((name.clone(), output.name.clone()));
        }
    }
    for (_, output) in rewritten {
        report.transformed.push(output.name.clone());
        archive.insert(output);
    }
    log::info!(
        "Transformed {} classes ({} renamed, {} failed)",
        report.transformed.len(),
        report.renames.len(),
        report.failures.len()
    );
    Ok(report)
}

/// Phases 1 to 3, reading `archive` only
fn rewrite_entries(
    archive: &ArchiveReference,
    dependencies: &[&dyn ArchiveReader],
    mappings: &ArchiveMapping,
    from: &str,
    to: &str,
    config: &Config,
) -> Vec<(String, Result<Entry>)> {
    // Phase 1: Inheritance trees
    let reader = DelegatingArchiveReader::with_dependencies(archive, dependencies);
    let tree = InheritanceTree::build(archive, &reader);

    // Phase 2: Shared remapper and writer
    let remapper = NamespaceRemapper::new(mappings, from, to, &tree, &reader);
    let writer = HierarchyAwareWriter::new(archive, dependencies, &remapper).with_compute_frames(config.compute_frames);
    let parameters = ParameterMetadataRewriter::new(mappings, to, config.parameter_prefix.as_str());
    let pass = EntryPass { reader: &reader, remapper: &remapper, writer: &writer, parameters: &parameters };

    // Phase 3: Per-entry rewrite
    let names = archive.iter().filter(|e| e.is_class()).map(|e| e.name.as_str()).collect::<Vec<_>>();
    log::debug!("Rewriting {} class entries (parallel: {})", names.len(), config.parallel);
    let rewrite = |name: &&str| (name.to_string(), pass.rewrite(name));
    if config.parallel {
        names.par_iter().map(rewrite).collect()
    } else {
        names.iter().map(rewrite).collect()
    }
}

struct EntryPass<'p, 'a> {
    reader: &'p DelegatingArchiveReader<'a>,
    remapper: &'p NamespaceRemapper<'a>,
    writer: &'p HierarchyAwareWriter<'a>,
    parameters: &'p ParameterMetadataRewriter<'a>,
}

impl EntryPass<'_, '_> {
    /// Decode, remap, rebuild parameters and encode one class entry
    fn rewrite(&self, name: &str) -> Result<Entry> {
        let entry = self.reader.require(name)?;
        let mut class = parse_class(&entry.bytes)?;
        let original = class.name()?.to_string();
        let mapped = ClassRemapper::new(self.remapper).remap(&mut class)?;
        self.parameters.rewrite(&mut class)?;
        let bytes = self.writer.write(&mut class)?;
        Ok(Entry::new(destination_name(&entry.name, &original, &mapped), bytes))
    }
}

/// Entry name for a class renamed from `original` to `mapped`. A directory
/// prefix in front of the class path (as in multi-release jars) is kept.
fn destination_name(entry_name: &str, original: &str, mapped: &str) -> String {
    if original == mapped {
        return entry_name.to_string();
    }
    match entry_name.strip_suffix(&class_entry_name(original)) {
        Some(prefix) => format!("{}{}", prefix, class_entry_name(mapped)),
        None => class_entry_name(mapped),
    }
}

/// Every destination must be produced once, and must not land on an entry
/// that stays in the archive
fn check_conflicts(archive: &ArchiveReference, rewritten: &[(String, Entry)]) -> Result<()> {
    let sources = rewritten.iter().map(|(name, _)| name.as_str()).collect::<HashSet<_>>();
    let mut destinations: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (name, output) in rewritten {
        destinations.entry(output.name.as_str()).or_default().push(name.clone());
    }
    for (destination, mut writers) in destinations {
        if archive.contains(destination) && !sources.contains(destination) {
            writers.insert(0, destination.to_string());
        }
        if writers.len() > 1 {
            log::warn!("Write conflict on {}: {:?}", destination, writers);
            return Err(Error::WriteConflict { destination: destination.to_string(), sources: writers });
        }
    }
    Ok(())
}
