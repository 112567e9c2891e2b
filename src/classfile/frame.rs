//! StackMapTable frames: model, encoding and compression of computed frames

use super::constpool::ConstantPool;
use super::error::{ClassFileError, ClassFileResult};
use super::reader::ByteReader;

/// VerificationTypeInfo as defined in JVMS 4.7.4
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    /// Internal name or array descriptor, as stored in `CONSTANT_Class`
    Object(String),
    /// Offset of the `new` instruction that created the value
    Uninitialized(u16),
}

impl VerificationType {
    pub fn object(name: impl Into<String>) -> Self {
        VerificationType::Object(name.into())
    }

    /// Long and Double take two local slots
    pub fn is_wide(&self) -> bool {
        matches!(self, VerificationType::Long | VerificationType::Double)
    }

    /// Type of a value described by a field descriptor
    pub fn from_descriptor(descriptor: &str) -> Self {
        match descriptor.as_bytes().first() {
            Some(b'Z' | b'B' | b'C' | b'S' | b'I') => VerificationType::Integer,
            Some(b'F') => VerificationType::Float,
            Some(b'J') => VerificationType::Long,
            Some(b'D') => VerificationType::Double,
            Some(b'[') => VerificationType::Object(descriptor.to_string()),
            Some(b'L') if descriptor.len() > 2 => {
                VerificationType::Object(descriptor[1..descriptor.len() - 1].to_string())
            }
            _ => VerificationType::Top,
        }
    }

    fn write(&self, pool: &mut ConstantPool, bytes: &mut Vec<u8>) -> ClassFileResult<()> {
        match self {
            VerificationType::Top => bytes.push(0),
            VerificationType::Integer => bytes.push(1),
            VerificationType::Float => bytes.push(2),
            VerificationType::Double => bytes.push(3),
            VerificationType::Long => bytes.push(4),
            VerificationType::Null => bytes.push(5),
            VerificationType::UninitializedThis => bytes.push(6),
            VerificationType::Object(name) => {
                bytes.push(7);
                bytes.extend_from_slice(&pool.add_class(name)?.to_be_bytes());
            }
            VerificationType::Uninitialized(offset) => {
                bytes.push(8);
                bytes.extend_from_slice(&offset.to_be_bytes());
            }
        }
        Ok(())
    }

    fn read(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> ClassFileResult<Self> {
        Ok(match reader.u8()? {
            0 => VerificationType::Top,
            1 => VerificationType::Integer,
            2 => VerificationType::Float,
            3 => VerificationType::Double,
            4 => VerificationType::Long,
            5 => VerificationType::Null,
            6 => VerificationType::UninitializedThis,
            7 => VerificationType::Object(pool.class_name(reader.u16()?)?.to_string()),
            8 => VerificationType::Uninitialized(reader.u16()?),
            tag => {
                return Err(ClassFileError::MalformedAttribute {
                    name: "StackMapTable".to_string(),
                    reason: format!("unknown verification type tag {}", tag),
                })
            }
        })
    }
}

/// StackMapFrame variants as defined in JVMS 4.7.4. `Same` and
/// `SameLocals1StackItem` pick their extended encoding when the delta needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackMapFrame {
    Same { offset_delta: u16 },
    SameLocals1StackItem { offset_delta: u16, stack: VerificationType },
    /// k in {1,2,3}
    Chop { k: u8, offset_delta: u16 },
    /// locals.len() in {1,2,3}
    Append { offset_delta: u16, locals: Vec<VerificationType> },
    Full { offset_delta: u16, locals: Vec<VerificationType>, stack: Vec<VerificationType> },
}

impl StackMapFrame {
    pub fn offset_delta(&self) -> u16 {
        match self {
            StackMapFrame::Same { offset_delta }
            | StackMapFrame::SameLocals1StackItem { offset_delta, .. }
            | StackMapFrame::Chop { offset_delta, .. }
            | StackMapFrame::Append { offset_delta, .. }
            | StackMapFrame::Full { offset_delta, .. } => *offset_delta,
        }
    }

    fn write(&self, pool: &mut ConstantPool, bytes: &mut Vec<u8>) -> ClassFileResult<()> {
        match self {
            StackMapFrame::Same { offset_delta } => {
                if *offset_delta <= 63 {
                    bytes.push(*offset_delta as u8);
                } else {
                    bytes.push(251); // same_frame_extended
                    bytes.extend_from_slice(&offset_delta.to_be_bytes());
                }
            }
            StackMapFrame::SameLocals1StackItem { offset_delta, stack } => {
                if *offset_delta <= 63 {
                    bytes.push(64 + *offset_delta as u8);
                } else {
                    bytes.push(247); // same_locals_1_stack_item_frame_extended
                    bytes.extend_from_slice(&offset_delta.to_be_bytes());
                }
                stack.write(pool, bytes)?;
            }
            StackMapFrame::Chop { k, offset_delta } => {
                bytes.push(251 - *k);
                bytes.extend_from_slice(&offset_delta.to_be_bytes());
            }
            StackMapFrame::Append { offset_delta, locals } => {
                bytes.push(251 + locals.len() as u8);
                bytes.extend_from_slice(&offset_delta.to_be_bytes());
                for local in locals {
                    local.write(pool, bytes)?;
                }
            }
            StackMapFrame::Full { offset_delta, locals, stack } => {
                bytes.push(255);
                bytes.extend_from_slice(&offset_delta.to_be_bytes());
                bytes.extend_from_slice(&(locals.len() as u16).to_be_bytes());
                for local in locals {
                    local.write(pool, bytes)?;
                }
                bytes.extend_from_slice(&(stack.len() as u16).to_be_bytes());
                for item in stack {
                    item.write(pool, bytes)?;
                }
            }
        }
        Ok(())
    }

    fn read(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> ClassFileResult<Self> {
        let tag = reader.u8()?;
        Ok(match tag {
            0..=63 => StackMapFrame::Same { offset_delta: tag as u16 },
            64..=127 => StackMapFrame::SameLocals1StackItem {
                offset_delta: (tag - 64) as u16,
                stack: VerificationType::read(reader, pool)?,
            },
            247 => StackMapFrame::SameLocals1StackItem {
                offset_delta: reader.u16()?,
                stack: VerificationType::read(reader, pool)?,
            },
            248..=250 => StackMapFrame::Chop { k: 251 - tag, offset_delta: reader.u16()? },
            251 => StackMapFrame::Same { offset_delta: reader.u16()? },
            252..=254 => {
                let offset_delta = reader.u16()?;
                let locals = (0..tag - 251)
                    .map(|_| VerificationType::read(reader, pool))
                    .collect::<ClassFileResult<Vec<_>>>()?;
                StackMapFrame::Append { offset_delta, locals }
            }
            255 => {
                let offset_delta = reader.u16()?;
                let local_count = reader.u16()?;
                let locals = (0..local_count)
                    .map(|_| VerificationType::read(reader, pool))
                    .collect::<ClassFileResult<Vec<_>>>()?;
                let stack_count = reader.u16()?;
                let stack = (0..stack_count)
                    .map(|_| VerificationType::read(reader, pool))
                    .collect::<ClassFileResult<Vec<_>>>()?;
                StackMapFrame::Full { offset_delta, locals, stack }
            }
            reserved => {
                return Err(ClassFileError::MalformedAttribute {
                    name: "StackMapTable".to_string(),
                    reason: format!("reserved frame type {}", reserved),
                })
            }
        })
    }
}

/// A computed frame at an absolute code offset. Locals are in compact form:
/// one entry per value, wide values not followed by `Top`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameState {
    pub pc: u16,
    pub locals: Vec<VerificationType>,
    pub stack: Vec<VerificationType>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StackMapTable {
    pub frames: Vec<StackMapFrame>,
}

impl StackMapTable {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Delta-encode computed frames against the method's initial locals,
    /// choosing the smallest frame type for each
    pub fn compress(initial_locals: &[VerificationType], states: &[FrameState]) -> Self {
        let mut frames = Vec::with_capacity(states.len());
        let mut previous_locals = initial_locals;
        let mut previous_pc: Option<u16> = None;
        for state in states {
            let offset_delta = match previous_pc {
                None => state.pc,
                Some(prev) => state.pc - prev - 1,
            };
            frames.push(compress_frame(previous_locals, state, offset_delta));
            previous_locals = &state.locals;
            previous_pc = Some(state.pc);
        }
        Self { frames }
    }

    /// Absolute offsets of every frame
    pub fn offsets(&self) -> Vec<u16> {
        let mut offsets = Vec::with_capacity(self.frames.len());
        let mut previous: Option<u16> = None;
        for frame in &self.frames {
            let pc = match previous {
                None => frame.offset_delta(),
                Some(prev) => prev + frame.offset_delta() + 1,
            };
            offsets.push(pc);
            previous = Some(pc);
        }
        offsets
    }

    pub fn parse(info: &[u8], pool: &ConstantPool) -> ClassFileResult<Self> {
        let mut reader = ByteReader::new(info);
        let count = reader.u16()?;
        let frames = (0..count)
            .map(|_| StackMapFrame::read(&mut reader, pool))
            .collect::<ClassFileResult<Vec<_>>>()?;
        if !reader.is_empty() {
            return Err(ClassFileError::MalformedAttribute {
                name: "StackMapTable".to_string(),
                reason: format!("trailing bytes after offset {}", reader.position()),
            });
        }
        Ok(Self { frames })
    }

    /// Encode the table, adding `CONSTANT_Class` entries for object types
    pub fn to_bytes(&self, pool: &mut ConstantPool) -> ClassFileResult<Vec<u8>> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.frames.len() as u16).to_be_bytes());
        for frame in &self.frames {
            frame.write(pool, &mut bytes)?;
        }
        Ok(bytes)
    }
}

fn compress_frame(previous: &[VerificationType], state: &FrameState, offset_delta: u16) -> StackMapFrame {
    let locals = &state.locals;
    let stack = &state.stack;
    if locals.as_slice() == previous {
        match stack.len() {
            0 => return StackMapFrame::Same { offset_delta },
            1 => return StackMapFrame::SameLocals1StackItem { offset_delta, stack: stack[0].clone() },
            _ => {}
        }
    } else if stack.is_empty() {
        if locals.len() < previous.len() && previous.starts_with(locals) {
            let k = previous.len() - locals.len();
            if k <= 3 {
                return StackMapFrame::Chop { k: k as u8, offset_delta };
            }
        } else if locals.len() > previous.len() && locals.starts_with(previous) {
            let added = &locals[previous.len()..];
            if added.len() <= 3 {
                return StackMapFrame::Append { offset_delta, locals: added.to_vec() };
            }
        }
    }
    StackMapFrame::Full { offset_delta, locals: locals.clone(), stack: stack.clone() }
}
