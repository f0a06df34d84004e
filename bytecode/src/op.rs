/// Bytecode opcodes for the stack machine.
///
/// Operand widths are fixed per opcode and encoded little-endian: literal
/// pool indices, field indices, local slot indices, scope deltas, array
/// element counts and block indices are `u16`; send argument counts are
/// `u8`; integer immediates are `i32` and float immediates `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// Push the nil singleton.
    Nil = 0x00,

    /// Push the receiver of the current method.
    PushSelf,

    /// Push the true singleton.
    True,

    /// Push the false singleton.
    False,

    /// Push an integer immediate.
    /// Operands: `value:i32`
    PushInt,

    /// Push a float immediate.
    /// Operands: `value:f32`
    PushFloat,

    /// Push a character from the literal pool.
    /// Operands: `idx:u16`
    PushChar,

    /// Push a string from the literal pool.
    /// Operands: `idx:u16`
    PushLiteral,

    /// Push a global resolved by name at run time.
    /// Operands: `idx:u16` (literal pool index of the name)
    PushGlobal,

    /// Push an instance field of the receiver.
    /// Operands: `idx:u16`
    PushField,

    /// Push slot `idx` from the closure environment `delta` frames up.
    /// Operands: `delta:u16`, `idx:u16`
    PushLocal,

    /// Pop `count` values and push a new array of them.
    /// Operands: `count:u16`
    PushArray,

    /// Store the top of stack into an instance field of the receiver.
    /// Operands: `idx:u16`
    StoreField,

    /// Store the top of stack into slot `idx`, `delta` frames up.
    /// Operands: `delta:u16`, `idx:u16`
    StoreLocal,

    /// Discard the top of stack.
    Pop,

    /// Send a message; lookup starts at the receiver's class.
    /// Operands: `argc:u8`, `selector_idx:u16`
    Send,

    /// Send a message; lookup starts at the superclass of the class that
    /// defines the current method.
    /// Operands: `argc:u8`, `selector_idx:u16`
    SendSuper,

    /// Materialize a closure over the given nested compiled block.
    /// Operands: `idx:u16` (slot in the enclosing block's nested array)
    Block,

    /// Return the top of stack to the closure's invoker.
    BlockReturn,

    /// Non-local return from the enclosing method.
    Return,
}

impl Op {
    pub const COUNT: usize = Op::Return as usize + 1;

    /// Convert a raw byte to an opcode without a bounds check.
    ///
    /// # Safety
    ///
    /// `byte` must be a valid opcode value (`< Op::COUNT`).
    #[inline(always)]
    pub unsafe fn from_u8_unchecked(byte: u8) -> Self {
        debug_assert!(
            (byte as usize) < Self::COUNT,
            "invalid opcode: 0x{byte:02x}"
        );
        unsafe { core::mem::transmute::<u8, Op>(byte) }
    }
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        if byte < Self::COUNT as u8 {
            // SAFETY: Op is repr(u8) with contiguous variants starting at 0.
            Ok(unsafe { core::mem::transmute::<u8, Op>(byte) })
        } else {
            Err(byte)
        }
    }
}
