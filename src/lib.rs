//! Archive namespace remapper (jremap)
//!
//! Rewrites the compiled classes of an archive from one naming namespace to
//! another using a precomputed mapping, keeping the archive structurally valid.
//!
//! ## Architecture
//!
//! - **classfile**: Class-file tree, reader, writer and StackMapTable frame computation
//! - **mapping**: In-memory mapping model with per-namespace identifiers
//! - **archive**: Named entries, dependency readers, jar and directory I/O
//! - **transform**: Hierarchy-aware remapping engine and the pass orchestrator
//!
//! ## Transformation Flow
//!
//! ```text
//! Archive → Inheritance trees → per class: decode → remap → parameters → encode → commit
//!                                                                          ↓
//!                                                     frames via the hierarchy hook
//! ```

pub mod archive;
pub mod classfile;
pub mod config;
pub mod consts;
pub mod error;
pub mod mapping;
pub mod transform;

pub use archive::{ArchiveReader, ArchiveReference, DelegatingArchiveReader, Entry};
pub use config::{Config, FailurePolicy};
pub use error::{Error, Result};
pub use mapping::ArchiveMapping;
pub use transform::{transform_archive, transform_archive_with, TransformReport};

/// Load the archive at `input`, transform it and save it to `output`.
///
/// Paths ending in `.jar` or `.zip` are zip archives, anything else a directory.
pub fn transform_file(
    input: impl AsRef<std::path::Path>,
    output: impl AsRef<std::path::Path>,
    dependencies: &[&dyn ArchiveReader],
    mappings: &ArchiveMapping,
    from: &str,
    to: &str,
    config: &Config,
) -> Result<TransformReport> {
    let mut archive = ArchiveReference::open(input)?;
    let report = transform_archive_with(&mut archive, dependencies, mappings, from, to, config)?;
    archive.save(output)?;
    Ok(report)
}
