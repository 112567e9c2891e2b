//! Class file layer
//!
//! Decodes class files into an editable tree, encodes them back, and optionally
//! recomputes StackMapTable frames against a pluggable class hierarchy.

pub mod analysis;
pub mod attribute;
pub mod builder;
pub mod class;
pub mod constpool;
pub mod defs;
pub mod descriptor;
pub mod error;
pub mod field;
pub mod frame;
pub mod hierarchy;
pub mod method;
pub mod opcodes;
pub mod reader;
pub mod writer;

// Re-export commonly used types
pub use class::ClassFile;
pub use constpool::{Constant, ConstantPool};
pub use error::{ClassFileError, ClassFileResult, FrameError, FrameResult};
pub use hierarchy::{HierarchyNode, TypeLoader};
pub use reader::{parse_class, ClassHeader};
pub use writer::{class_file_to_bytes, ClassWriter};
