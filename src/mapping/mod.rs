//! Mapping model consumed by the remapper
//!
//! Building the model from a textual mapping format is left to callers; the
//! builders here are the programmatic way in.

pub mod identifier;
pub mod model;

pub use identifier::{ClassIdentifier, FieldIdentifier, MethodIdentifier};
pub use model::{
    ArchiveMapping, ArchiveMappingBuilder, ClassMapping, ClassMappingBuilder, FieldMapping, FieldMappingBuilder,
    MethodMapping, MethodMappingBuilder,
};
