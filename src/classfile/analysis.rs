//! Data-flow analysis that recomputes a method's StackMapTable frames
//!
//! Locals are tracked per slot (wide values are followed by `Top`), the operand
//! stack per value. Reference types meeting at a join point are merged through
//! the `TypeLoader` hook, which is where the remapped hierarchy comes in.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::attribute::CodeAttribute;
use super::constpool::{Constant, ConstantPool};
use super::defs::{CONSTRUCTOR_METHOD_NAME, OBJECT_CLASS};
use super::descriptor::parse_method_descriptor;
use super::error::{ClassFileError, FrameError, FrameResult};
use super::frame::{FrameState, VerificationType};
use super::hierarchy::TypeLoader;
use super::opcodes::*;

const THROWABLE_CLASS: &str = "java/lang/Throwable";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    locals: Vec<VerificationType>,
    stack: Vec<VerificationType>,
}

impl Frame {
    fn pop(&mut self, pc: usize) -> FrameResult<VerificationType> {
        self.stack.pop().ok_or(FrameError::StackUnderflow { pc })
    }

    fn pop_n(&mut self, n: usize, pc: usize) -> FrameResult<()> {
        if self.stack.len() < n {
            return Err(FrameError::StackUnderflow { pc });
        }
        self.stack.truncate(self.stack.len() - n);
        Ok(())
    }

    fn push(&mut self, value: VerificationType) {
        self.stack.push(value);
    }

    fn local(&self, index: usize, pc: usize) -> FrameResult<VerificationType> {
        self.locals.get(index).cloned().ok_or(FrameError::InvalidLocal { index, pc })
    }

    fn set_local(&mut self, index: usize, value: VerificationType, pc: usize) -> FrameResult<()> {
        let width = if value.is_wide() { 2 } else { 1 };
        if index + width > self.locals.len() {
            return Err(FrameError::InvalidLocal { index, pc });
        }
        if index > 0 && self.locals[index - 1].is_wide() {
            self.locals[index - 1] = VerificationType::Top;
        }
        if self.locals[index].is_wide() && width == 1 && index + 1 < self.locals.len() {
            self.locals[index + 1] = VerificationType::Top;
        }
        self.locals[index] = value;
        if width == 2 {
            self.locals[index + 1] = VerificationType::Top;
        }
        Ok(())
    }

    /// Replace every occurrence of an uninitialized value once its constructor ran
    fn initialize(&mut self, uninitialized: &VerificationType, initialized: &VerificationType) {
        for slot in self.locals.iter_mut().chain(self.stack.iter_mut()) {
            if slot == uninitialized {
                *slot = initialized.clone();
            }
        }
    }

    fn compact_locals(&self) -> Vec<VerificationType> {
        let mut compact = Vec::with_capacity(self.locals.len());
        let mut i = 0;
        while i < self.locals.len() {
            let value = &self.locals[i];
            compact.push(value.clone());
            i += if value.is_wide() { 2 } else { 1 };
        }
        while compact.last() == Some(&VerificationType::Top) {
            compact.pop();
        }
        compact
    }
}

fn is_category2(value: &VerificationType) -> bool {
    value.is_wide()
}

/// Outcome of interpreting one instruction
struct Step {
    frame: Frame,
    successors: Vec<usize>,
    falls_through: bool,
}

struct Handler {
    start: usize,
    end: usize,
    handler: usize,
    catch_type: VerificationType,
}

/// Frames computed for one method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedFrames {
    /// Locals implied by the method descriptor, in compact form
    pub initial_locals: Vec<VerificationType>,
    pub frames: Vec<FrameState>,
}

pub struct FrameComputer<'a> {
    loader: &'a dyn TypeLoader,
    pool: &'a ConstantPool,
    class_name: &'a str,
}

impl<'a> FrameComputer<'a> {
    pub fn new(loader: &'a dyn TypeLoader, pool: &'a ConstantPool, class_name: &'a str) -> Self {
        Self { loader, pool, class_name }
    }

    pub fn compute(
        &self,
        method_name: &str,
        descriptor: &str,
        is_static: bool,
        body: &CodeAttribute,
    ) -> FrameResult<ComputedFrames> {
        let code = body.code.as_slice();
        let initial = self.initial_frame(method_name, descriptor, is_static, body.max_locals as usize)?;

        let mut starts = BTreeSet::new();
        let mut pc = 0;
        while pc < code.len() {
            starts.insert(pc);
            pc += instruction_length(code, pc).ok_or(FrameError::Truncated { pc })?;
        }

        let handlers = body
            .exception_table
            .iter()
            .map(|entry| {
                let handler = entry.handler_pc as usize;
                if !starts.contains(&handler) {
                    return Err(FrameError::InvalidBranchTarget { pc: entry.start_pc as usize, target: handler as i64 });
                }
                let catch_type = match entry.catch_type {
                    0 => VerificationType::object(THROWABLE_CLASS),
                    index => VerificationType::object(self.pool.class_name(index)?),
                };
                Ok(Handler { start: entry.start_pc as usize, end: entry.end_pc as usize, handler, catch_type })
            })
            .collect::<FrameResult<Vec<_>>>()?;

        let mut leaders: BTreeSet<usize> = handlers.iter().map(|h| h.handler).collect();
        let mut frames: BTreeMap<usize, Frame> = BTreeMap::new();
        let mut queue = VecDeque::new();
        frames.insert(0, initial.clone());
        queue.push_back(0usize);

        while let Some(pc) = queue.pop_front() {
            let Some(input) = frames.get(&pc).cloned() else { continue };
            let step = self.execute(code, pc, &input)?;

            for handler in handlers.iter().filter(|h| h.start <= pc && pc < h.end) {
                for locals in [&input.locals, &step.frame.locals] {
                    let incoming = Frame { locals: locals.clone(), stack: vec![handler.catch_type.clone()] };
                    self.merge_into(&mut frames, &mut queue, handler.handler, incoming)?;
                }
            }

            for &target in &step.successors {
                if !starts.contains(&target) {
                    return Err(FrameError::InvalidBranchTarget { pc, target: target as i64 });
                }
                leaders.insert(target);
                self.merge_into(&mut frames, &mut queue, target, step.frame.clone())?;
            }

            let next = pc + instruction_length(code, pc).ok_or(FrameError::Truncated { pc })?;
            if step.falls_through {
                if next >= code.len() {
                    return Err(FrameError::InvalidBranchTarget { pc, target: next as i64 });
                }
                self.merge_into(&mut frames, &mut queue, next, step.frame)?;
            } else if next < code.len() {
                leaders.insert(next);
            }
        }

        if let Some(&pc) = starts.iter().find(|&&pc| !frames.contains_key(&pc)) {
            return Err(FrameError::UnreachableCode { pc });
        }

        let frames = leaders
            .iter()
            .filter_map(|pc| frames.get(pc).map(|frame| (pc, frame)))
            .map(|(&pc, frame)| FrameState { pc: pc as u16, locals: frame.compact_locals(), stack: frame.stack.clone() })
            .collect();
        Ok(ComputedFrames { initial_locals: initial.compact_locals(), frames })
    }

    fn initial_frame(&self, name: &str, descriptor: &str, is_static: bool, max_locals: usize) -> FrameResult<Frame> {
        let (params, _) = parse_method_descriptor(descriptor)?;
        let mut locals = Vec::with_capacity(max_locals);
        if !is_static {
            if name == CONSTRUCTOR_METHOD_NAME && self.class_name != OBJECT_CLASS {
                locals.push(VerificationType::UninitializedThis);
            } else {
                locals.push(VerificationType::object(self.class_name));
            }
        }
        for param in params {
            let value = VerificationType::from_descriptor(param);
            let wide = value.is_wide();
            locals.push(value);
            if wide {
                locals.push(VerificationType::Top);
            }
        }
        if locals.len() > max_locals {
            return Err(FrameError::InvalidLocal { index: locals.len() - 1, pc: 0 });
        }
        locals.resize(max_locals, VerificationType::Top);
        Ok(Frame { locals, stack: Vec::new() })
    }

    fn merge_into(
        &self,
        frames: &mut BTreeMap<usize, Frame>,
        queue: &mut VecDeque<usize>,
        target: usize,
        incoming: Frame,
    ) -> FrameResult<()> {
        let Some(existing) = frames.get_mut(&target) else {
            frames.insert(target, incoming);
            queue.push_back(target);
            return Ok(());
        };
        if existing.stack.len() != incoming.stack.len() {
            return Err(FrameError::StackHeightMismatch { pc: target });
        }
        let mut changed = false;
        let pairs = existing
            .locals
            .iter_mut()
            .zip(incoming.locals.iter())
            .chain(existing.stack.iter_mut().zip(incoming.stack.iter()));
        for (slot, value) in pairs {
            let merged = self.merge_type(slot, value)?;
            if merged != *slot {
                *slot = merged;
                changed = true;
            }
        }
        if changed && !queue.contains(&target) {
            queue.push_back(target);
        }
        Ok(())
    }

    fn merge_type(&self, a: &VerificationType, b: &VerificationType) -> FrameResult<VerificationType> {
        use VerificationType::*;
        if a == b {
            return Ok(a.clone());
        }
        Ok(match (a, b) {
            (Null, Object(_)) => b.clone(),
            (Object(_), Null) => a.clone(),
            (Object(x), Object(y)) => Object(self.merge_reference(x, y)?),
            _ => Top,
        })
    }

    /// Fails when the loader cannot supply a class involved in the merge
    fn merge_reference(&self, a: &str, b: &str) -> FrameResult<String> {
        if a == b {
            return Ok(a.to_string());
        }
        match (a.strip_prefix('['), b.strip_prefix('[')) {
            (Some(ea), Some(eb)) if is_reference_descriptor(ea) && is_reference_descriptor(eb) => {
                Ok(array_of(&self.merge_reference(&descriptor_type(ea), &descriptor_type(eb))?))
            }
            (None, None) => self.loader.common_super_class(a, b),
            _ => Ok(OBJECT_CLASS.to_string()),
        }
    }

    fn execute(&self, code: &[u8], pc: usize, input: &Frame) -> FrameResult<Step> {
        use VerificationType::*;
        let truncated = || FrameError::Truncated { pc };
        let u16_at = |offset: usize| read_u16(code, pc + offset).ok_or_else(truncated);
        let branch = |offset: i64| -> FrameResult<usize> {
            let target = pc as i64 + offset;
            if target < 0 || target >= code.len() as i64 {
                return Err(FrameError::InvalidBranchTarget { pc, target });
            }
            Ok(target as usize)
        };

        let mut frame = input.clone();
        let mut successors = Vec::new();
        let mut falls_through = true;
        let op = code[pc];

        match op {
            NOP => {}
            ACONST_NULL => frame.push(Null),
            ICONST_M1..=ICONST_5 | BIPUSH | SIPUSH => frame.push(Integer),
            LCONST_0 | LCONST_1 => frame.push(Long),
            FCONST_0..=FCONST_2 => frame.push(Float),
            DCONST_0 | DCONST_1 => frame.push(Double),
            LDC => {
                let index = *code.get(pc + 1).ok_or_else(truncated)? as u16;
                frame.push(self.constant_type(index)?);
            }
            LDC_W | LDC2_W => frame.push(self.constant_type(u16_at(1)?)?),
            ILOAD..=ALOAD => {
                let index = *code.get(pc + 1).ok_or_else(truncated)? as usize;
                self.load(&mut frame, op - ILOAD, index, pc)?;
            }
            ILOAD_0..=ALOAD_3 => {
                let offset = op - ILOAD_0;
                self.load(&mut frame, offset / 4, (offset % 4) as usize, pc)?;
            }
            ISTORE..=ASTORE => {
                let index = *code.get(pc + 1).ok_or_else(truncated)? as usize;
                self.store(&mut frame, op - ISTORE, index, pc)?;
            }
            ISTORE_0..=ASTORE_3 => {
                let offset = op - ISTORE_0;
                self.store(&mut frame, offset / 4, (offset % 4) as usize, pc)?;
            }
            IALOAD | BALOAD | CALOAD | SALOAD => binary(&mut frame, Integer, pc)?,
            LALOAD => binary(&mut frame, Long, pc)?,
            FALOAD => binary(&mut frame, Float, pc)?,
            DALOAD => binary(&mut frame, Double, pc)?,
            AALOAD => {
                frame.pop(pc)?;
                let element = match frame.pop(pc)? {
                    Object(array) if array.starts_with('[') => VerificationType::from_descriptor(&array[1..]),
                    _ => Null,
                };
                frame.push(element);
            }
            IASTORE..=SASTORE => frame.pop_n(3, pc)?,
            POP => {
                frame.pop(pc)?;
            }
            POP2 => {
                if !is_category2(&frame.pop(pc)?) {
                    frame.pop(pc)?;
                }
            }
            DUP => {
                let v1 = frame.pop(pc)?;
                frame.push(v1.clone());
                frame.push(v1);
            }
            DUP_X1 => {
                let v1 = frame.pop(pc)?;
                let v2 = frame.pop(pc)?;
                frame.stack.extend([v1.clone(), v2, v1]);
            }
            DUP_X2 => {
                let v1 = frame.pop(pc)?;
                let v2 = frame.pop(pc)?;
                if is_category2(&v2) {
                    frame.stack.extend([v1.clone(), v2, v1]);
                } else {
                    let v3 = frame.pop(pc)?;
                    frame.stack.extend([v1.clone(), v3, v2, v1]);
                }
            }
            DUP2 => {
                let v1 = frame.pop(pc)?;
                if is_category2(&v1) {
                    frame.stack.extend([v1.clone(), v1]);
                } else {
                    let v2 = frame.pop(pc)?;
                    frame.stack.extend([v2.clone(), v1.clone(), v2, v1]);
                }
            }
            DUP2_X1 => {
                let v1 = frame.pop(pc)?;
                if is_category2(&v1) {
                    let v2 = frame.pop(pc)?;
                    frame.stack.extend([v1.clone(), v2, v1]);
                } else {
                    let v2 = frame.pop(pc)?;
                    let v3 = frame.pop(pc)?;
                    frame.stack.extend([v2.clone(), v1.clone(), v3, v2, v1]);
                }
            }
            DUP2_X2 => {
                let v1 = frame.pop(pc)?;
                if is_category2(&v1) {
                    let v2 = frame.pop(pc)?;
                    if is_category2(&v2) {
                        frame.stack.extend([v1.clone(), v2, v1]);
                    } else {
                        let v3 = frame.pop(pc)?;
                        frame.stack.extend([v1.clone(), v3, v2, v1]);
                    }
                } else {
                    let v2 = frame.pop(pc)?;
                    let v3 = frame.pop(pc)?;
                    if is_category2(&v3) {
                        frame.stack.extend([v2.clone(), v1.clone(), v3, v2, v1]);
                    } else {
                        let v4 = frame.pop(pc)?;
                        frame.stack.extend([v2.clone(), v1.clone(), v4, v3, v2, v1]);
                    }
                }
            }
            SWAP => {
                let v1 = frame.pop(pc)?;
                let v2 = frame.pop(pc)?;
                frame.stack.extend([v1, v2]);
            }
            IADD | ISUB | IMUL | IDIV | IREM | ISHL | ISHR | IUSHR | IAND | IOR | IXOR => {
                binary(&mut frame, Integer, pc)?
            }
            LADD | LSUB | LMUL | LDIV | LREM | LSHL | LSHR | LUSHR | LAND | LOR | LXOR => {
                binary(&mut frame, Long, pc)?
            }
            FADD | FSUB | FMUL | FDIV | FREM => binary(&mut frame, Float, pc)?,
            DADD | DSUB | DMUL | DDIV | DREM => binary(&mut frame, Double, pc)?,
            LCMP | FCMPL | FCMPG | DCMPL | DCMPG => binary(&mut frame, Integer, pc)?,
            INEG | L2I | F2I | D2I | I2B | I2C | I2S | ARRAYLENGTH | INSTANCEOF => {
                unary(&mut frame, Integer, pc)?
            }
            LNEG | I2L | F2L | D2L => unary(&mut frame, Long, pc)?,
            FNEG | I2F | L2F | D2F => unary(&mut frame, Float, pc)?,
            DNEG | I2D | L2D | F2D => unary(&mut frame, Double, pc)?,
            IINC => {
                let index = *code.get(pc + 1).ok_or_else(truncated)? as usize;
                frame.local(index, pc)?;
            }
            IFEQ..=IFLE | IFNULL | IFNONNULL => {
                frame.pop(pc)?;
                successors.push(branch(read_i16(code, pc + 1).ok_or_else(truncated)? as i64)?);
            }
            IF_ICMPEQ..=IF_ACMPNE => {
                frame.pop_n(2, pc)?;
                successors.push(branch(read_i16(code, pc + 1).ok_or_else(truncated)? as i64)?);
            }
            GOTO => {
                successors.push(branch(read_i16(code, pc + 1).ok_or_else(truncated)? as i64)?);
                falls_through = false;
            }
            GOTO_W => {
                successors.push(branch(read_i32(code, pc + 1).ok_or_else(truncated)? as i64)?);
                falls_through = false;
            }
            TABLESWITCH | LOOKUPSWITCH => {
                frame.pop(pc)?;
                for offset in switch_offsets(code, pc).ok_or_else(truncated)? {
                    successors.push(branch(offset as i64)?);
                }
                falls_through = false;
            }
            IRETURN..=ARETURN | ATHROW => {
                frame.pop(pc)?;
                falls_through = false;
            }
            RETURN => falls_through = false,
            GETSTATIC | GETFIELD => {
                let (_, _, descriptor) = self.pool.member_ref(u16_at(1)?)?;
                if op == GETFIELD {
                    frame.pop(pc)?;
                }
                frame.push(VerificationType::from_descriptor(descriptor));
            }
            PUTSTATIC => frame.pop_n(1, pc)?,
            PUTFIELD => frame.pop_n(2, pc)?,
            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE => {
                let (_, name, descriptor) = self.pool.member_ref(u16_at(1)?)?;
                let (params, ret) = parse_method_descriptor(descriptor)?;
                frame.pop_n(params.len(), pc)?;
                if op != INVOKESTATIC {
                    let receiver = frame.pop(pc)?;
                    if op == INVOKESPECIAL && name == CONSTRUCTOR_METHOD_NAME {
                        let initialized = match &receiver {
                            UninitializedThis => Some(VerificationType::object(self.class_name)),
                            Uninitialized(new_pc) => {
                                let class_index =
                                    read_u16(code, *new_pc as usize + 1).ok_or(FrameError::Truncated { pc: *new_pc as usize })?;
                                Some(VerificationType::object(self.pool.class_name(class_index)?))
                            }
                            _ => None,
                        };
                        if let Some(initialized) = initialized {
                            frame.initialize(&receiver, &initialized);
                        }
                    }
                }
                if ret != "V" {
                    frame.push(VerificationType::from_descriptor(ret));
                }
            }
            INVOKEDYNAMIC => {
                let index = u16_at(1)?;
                let descriptor = match self.pool.get(index)? {
                    Constant::InvokeDynamic(_, nat) => self.pool.name_and_type(*nat)?.1,
                    _ => return Err(ClassFileError::UnexpectedConstant { index, expected: "InvokeDynamic" }.into()),
                };
                let (params, ret) = parse_method_descriptor(descriptor)?;
                frame.pop_n(params.len(), pc)?;
                if ret != "V" {
                    frame.push(VerificationType::from_descriptor(ret));
                }
            }
            NEW => frame.push(Uninitialized(pc as u16)),
            NEWARRAY => {
                let element = match *code.get(pc + 1).ok_or_else(truncated)? {
                    4 => "[Z",
                    5 => "[C",
                    6 => "[F",
                    7 => "[D",
                    8 => "[B",
                    9 => "[S",
                    10 => "[I",
                    11 => "[J",
                    _ => return Err(FrameError::UnsupportedInstruction { opcode: op, pc }),
                };
                unary(&mut frame, VerificationType::object(element), pc)?;
            }
            ANEWARRAY => {
                let component = self.pool.class_name(u16_at(1)?)?;
                unary(&mut frame, VerificationType::object(array_of(component)), pc)?;
            }
            CHECKCAST => {
                let target = self.pool.class_name(u16_at(1)?)?;
                unary(&mut frame, VerificationType::object(target), pc)?;
            }
            MONITORENTER | MONITOREXIT => frame.pop_n(1, pc)?,
            MULTIANEWARRAY => {
                let class = self.pool.class_name(u16_at(1)?)?;
                let dimensions = *code.get(pc + 3).ok_or_else(truncated)? as usize;
                frame.pop_n(dimensions, pc)?;
                frame.push(VerificationType::object(class));
            }
            WIDE => {
                let inner = *code.get(pc + 1).ok_or_else(truncated)?;
                let index = u16_at(2)? as usize;
                match inner {
                    ILOAD..=ALOAD => self.load(&mut frame, inner - ILOAD, index, pc)?,
                    ISTORE..=ASTORE => self.store(&mut frame, inner - ISTORE, index, pc)?,
                    IINC => {
                        frame.local(index, pc)?;
                    }
                    _ => return Err(FrameError::UnsupportedInstruction { opcode: inner, pc }),
                }
            }
            _ => return Err(FrameError::UnsupportedInstruction { opcode: op, pc }),
        }

        Ok(Step { frame, successors, falls_through })
    }

    /// `kind` follows the opcode order: int, long, float, double, reference
    fn load(&self, frame: &mut Frame, kind: u8, index: usize, pc: usize) -> FrameResult<()> {
        let value = frame.local(index, pc)?;
        let pushed = match kind {
            0 => VerificationType::Integer,
            1 => VerificationType::Long,
            2 => VerificationType::Float,
            3 => VerificationType::Double,
            _ => value,
        };
        frame.push(pushed);
        Ok(())
    }

    fn store(&self, frame: &mut Frame, kind: u8, index: usize, pc: usize) -> FrameResult<()> {
        let value = frame.pop(pc)?;
        let stored = match kind {
            0 => VerificationType::Integer,
            1 => VerificationType::Long,
            2 => VerificationType::Float,
            3 => VerificationType::Double,
            _ => value,
        };
        frame.set_local(index, stored, pc)
    }

    fn constant_type(&self, index: u16) -> FrameResult<VerificationType> {
        Ok(match self.pool.get(index)? {
            Constant::Integer(_) => VerificationType::Integer,
            Constant::Float(_) => VerificationType::Float,
            Constant::Long(_) => VerificationType::Long,
            Constant::Double(_) => VerificationType::Double,
            Constant::String(_) => VerificationType::object("java/lang/String"),
            Constant::Class(_) => VerificationType::object("java/lang/Class"),
            Constant::MethodType(_) => VerificationType::object("java/lang/invoke/MethodType"),
            Constant::MethodHandle(..) => VerificationType::object("java/lang/invoke/MethodHandle"),
            Constant::Dynamic(_, nat) => VerificationType::from_descriptor(self.pool.name_and_type(*nat)?.1),
            _ => return Err(ClassFileError::UnexpectedConstant { index, expected: "loadable constant" }.into()),
        })
    }
}

fn unary(frame: &mut Frame, result: VerificationType, pc: usize) -> FrameResult<()> {
    frame.pop(pc)?;
    frame.push(result);
    Ok(())
}

fn binary(frame: &mut Frame, result: VerificationType, pc: usize) -> FrameResult<()> {
    frame.pop_n(2, pc)?;
    frame.push(result);
    Ok(())
}

/// Relative branch offsets of a tableswitch/lookupswitch, default first
fn switch_offsets(code: &[u8], pc: usize) -> Option<Vec<i32>> {
    let pad = (4 - ((pc + 1) % 4)) % 4;
    let base = pc + 1 + pad;
    let mut offsets = vec![read_i32(code, base)?];
    if code[pc] == TABLESWITCH {
        let low = read_i32(code, base + 4)?;
        let high = read_i32(code, base + 8)?;
        let count = (high as i64 - low as i64 + 1).max(0) as usize;
        for i in 0..count {
            offsets.push(read_i32(code, base + 12 + i * 4)?);
        }
    } else {
        let pairs = read_i32(code, base + 4)?.max(0) as usize;
        for i in 0..pairs {
            offsets.push(read_i32(code, base + 8 + i * 8 + 4)?);
        }
    }
    Some(offsets)
}

fn is_reference_descriptor(descriptor: &str) -> bool {
    descriptor.starts_with('L') || descriptor.starts_with('[')
}

/// `La/B;` to `a/B`; array descriptors stay as they are
fn descriptor_type(descriptor: &str) -> String {
    match descriptor.strip_prefix('L').and_then(|d| d.strip_suffix(';')) {
        Some(name) => name.to_string(),
        None => descriptor.to_string(),
    }
}

fn array_of(component: &str) -> String {
    if component.starts_with('[') {
        format!("[{}", component)
    } else {
        format!("[L{};", component)
    }
}
