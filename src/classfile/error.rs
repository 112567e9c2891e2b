//! Specific error types for class file decoding and encoding

use thiserror::Error;

/// Errors that can occur while reading or writing a class file
#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error("Invalid magic number: {0:#010x}")]
    InvalidMagic(u32),
    #[error("Unexpected end of class data at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("Unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },
    #[error("Invalid constant pool index: {0}")]
    InvalidIndex(u16),
    #[error("Constant pool index {index} is not a {expected}")]
    UnexpectedConstant { index: u16, expected: &'static str },
    #[error("Constant pool is out of space")]
    OutOfSpace,
    #[error("Invalid descriptor: {descriptor}")]
    InvalidDescriptor { descriptor: String },
    #[error("Malformed {name} attribute: {reason}")]
    MalformedAttribute { name: String, reason: String },
    #[error("Invalid modified UTF-8 string at constant pool index {0}")]
    InvalidUtf8(u16),
}

/// Generic result type for class file operations
pub type ClassFileResult<T> = Result<T, ClassFileError>;

/// Reasons a method body's frames could not be recomputed
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Unsupported instruction {opcode:#04x} at pc {pc}")]
    UnsupportedInstruction { opcode: u8, pc: usize },
    #[error("Unreachable code at pc {pc}")]
    UnreachableCode { pc: usize },
    #[error("Operand stack underflow at pc {pc}")]
    StackUnderflow { pc: usize },
    #[error("Operand stack heights disagree at pc {pc}")]
    StackHeightMismatch { pc: usize },
    #[error("Branch at pc {pc} targets {target}, which is not an instruction")]
    InvalidBranchTarget { pc: usize, target: i64 },
    #[error("Instruction at pc {pc} is truncated")]
    Truncated { pc: usize },
    #[error("Hierarchy of {name} is unknown")]
    UnknownType { name: String },
    #[error("Local variable {index} is out of range at pc {pc}")]
    InvalidLocal { index: usize, pc: usize },
    #[error(transparent)]
    ClassFile(#[from] ClassFileError),
}

pub type FrameResult<T> = Result<T, FrameError>;
