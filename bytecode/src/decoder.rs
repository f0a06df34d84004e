use crate::instruction::Instruction;
use crate::op::Op;

/// Decodes a bytecode byte slice into [`Instruction`]s.
///
/// # Safety contract
///
/// The bytecode **must** be well-formed (as produced by [`Code`]).
/// In debug builds, malformed bytecode triggers a panic via
/// `debug_assert!`. In release builds, malformed bytecode is **undefined
/// behaviour**.
///
/// [`Code`]: crate::Code
pub struct BytecodeDecoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BytecodeDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current byte offset in the stream.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Whether the decoder has reached the end of the bytecode.
    #[inline(always)]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Decode the next instruction, or `None` at end-of-stream.
    ///
    /// See the [struct-level safety docs](BytecodeDecoder) — the bytecode
    /// must be well-formed.
    #[inline(always)]
    pub fn decode_next(&mut self) -> Option<Instruction> {
        if self.is_at_end() {
            return None;
        }
        Some(unsafe { self.decode() })
    }

    /// # Safety
    ///
    /// At least one byte must remain, and the remaining bytes must form a
    /// valid instruction.
    #[inline(always)]
    unsafe fn decode(&mut self) -> Instruction {
        let byte = unsafe { self.read_u8() };
        let op = unsafe { Op::from_u8_unchecked(byte) };

        unsafe {
            match op {
                Op::Nil => Instruction::Nil,
                Op::PushSelf => Instruction::PushSelf,
                Op::True => Instruction::True,
                Op::False => Instruction::False,

                Op::PushInt => Instruction::PushInt {
                    value: self.read_i32(),
                },
                Op::PushFloat => Instruction::PushFloat {
                    value: self.read_f32(),
                },
                Op::PushChar => Instruction::PushChar {
                    idx: self.read_u16(),
                },
                Op::PushLiteral => Instruction::PushLiteral {
                    idx: self.read_u16(),
                },
                Op::PushGlobal => Instruction::PushGlobal {
                    idx: self.read_u16(),
                },
                Op::PushField => Instruction::PushField {
                    idx: self.read_u16(),
                },
                Op::PushLocal => {
                    let delta = self.read_u16();
                    let idx = self.read_u16();
                    Instruction::PushLocal { delta, idx }
                }
                Op::PushArray => Instruction::PushArray {
                    count: self.read_u16(),
                },

                Op::StoreField => Instruction::StoreField {
                    idx: self.read_u16(),
                },
                Op::StoreLocal => {
                    let delta = self.read_u16();
                    let idx = self.read_u16();
                    Instruction::StoreLocal { delta, idx }
                }

                Op::Pop => Instruction::Pop,

                Op::Send => {
                    let argc = self.read_u8();
                    let selector_idx = self.read_u16();
                    Instruction::Send { argc, selector_idx }
                }
                Op::SendSuper => {
                    let argc = self.read_u8();
                    let selector_idx = self.read_u16();
                    Instruction::SendSuper { argc, selector_idx }
                }

                Op::Block => Instruction::Block {
                    idx: self.read_u16(),
                },
                Op::BlockReturn => Instruction::BlockReturn,
                Op::Return => Instruction::Return,
            }
        }
    }

    #[inline(always)]
    unsafe fn read_u8(&mut self) -> u8 {
        debug_assert!(self.pos < self.bytes.len(), "read_u8 out of bounds");
        let v = unsafe { *self.bytes.get_unchecked(self.pos) };
        self.pos += 1;
        v
    }

    #[inline(always)]
    unsafe fn read_u16(&mut self) -> u16 {
        debug_assert!(
            self.pos + 2 <= self.bytes.len(),
            "read_u16 out of bounds"
        );
        let ptr = unsafe { self.bytes.as_ptr().add(self.pos) } as *const u16;
        let v = u16::from_le(unsafe { ptr.read_unaligned() });
        self.pos += 2;
        v
    }

    #[inline(always)]
    unsafe fn read_i32(&mut self) -> i32 {
        debug_assert!(
            self.pos + 4 <= self.bytes.len(),
            "read_i32 out of bounds"
        );
        let ptr = unsafe { self.bytes.as_ptr().add(self.pos) } as *const i32;
        let v = i32::from_le(unsafe { ptr.read_unaligned() });
        self.pos += 4;
        v
    }

    #[inline(always)]
    unsafe fn read_f32(&mut self) -> f32 {
        f32::from_bits(unsafe { self.read_i32() } as u32)
    }
}

impl<'a> Iterator for BytecodeDecoder<'a> {
    type Item = Instruction;

    #[inline(always)]
    fn next(&mut self) -> Option<Instruction> {
        self.decode_next()
    }
}
