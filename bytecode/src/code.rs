use crate::op::Op;

/// An instruction stream fragment.
///
/// `Code` is an immutable-by-convention byte sequence combined with
/// [`join`](Code::join): join is associative and order-preserving, and
/// [`Code::none`] is its identity, so fragments compose in any grouping as
/// a traversal returns partial results up the call stack. Joining consumes
/// both operands, so a reused fragment is cloned rather than mutated in
/// place.
///
/// One constructor exists per abstract instruction; each emits the fixed
/// little-endian encoding documented on [`Op`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Code {
    bytes: Vec<u8>,
}

impl Code {
    /// The empty fragment, identity of [`join`](Code::join).
    pub fn none() -> Self {
        Self { bytes: Vec::new() }
    }

    /// A fragment holding a single operand-less opcode.
    pub fn of(op: Op) -> Self {
        Self {
            bytes: vec![op as u8],
        }
    }

    /// Concatenate two fragments, this one first.
    #[must_use]
    pub fn join(mut self, other: Code) -> Code {
        self.bytes.extend_from_slice(&other.bytes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    // ── emit helpers ───────────────────────────────────────────────

    fn with_u16(mut self, v: u16) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn with_i32(mut self, v: i32) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn with_f32(mut self, v: f32) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn with_u8(mut self, v: u8) -> Self {
        self.bytes.push(v);
        self
    }

    // ── instruction constructors ───────────────────────────────────

    /// `Nil` — push the nil singleton.
    pub fn push_nil() -> Code {
        Code::of(Op::Nil)
    }

    /// `PushSelf` — push the current receiver.
    pub fn push_self() -> Code {
        Code::of(Op::PushSelf)
    }

    /// `True` — push the true singleton.
    pub fn push_true() -> Code {
        Code::of(Op::True)
    }

    /// `False` — push the false singleton.
    pub fn push_false() -> Code {
        Code::of(Op::False)
    }

    /// `PushInt <value:i32>` — push an integer immediate.
    pub fn push_int(value: i32) -> Code {
        Code::of(Op::PushInt).with_i32(value)
    }

    /// `PushFloat <value:f32>` — push a float immediate.
    pub fn push_float(value: f32) -> Code {
        Code::of(Op::PushFloat).with_f32(value)
    }

    /// `PushChar <idx:u16>` — push a pooled character literal.
    pub fn push_char(idx: u16) -> Code {
        Code::of(Op::PushChar).with_u16(idx)
    }

    /// `PushLiteral <idx:u16>` — push a pooled string literal.
    pub fn push_literal(idx: u16) -> Code {
        Code::of(Op::PushLiteral).with_u16(idx)
    }

    /// `PushGlobal <idx:u16>` — late-bound global lookup by pooled name.
    pub fn push_global(idx: u16) -> Code {
        Code::of(Op::PushGlobal).with_u16(idx)
    }

    /// `PushField <idx:u16>` — push an instance field of the receiver.
    pub fn push_field(idx: u16) -> Code {
        Code::of(Op::PushField).with_u16(idx)
    }

    /// `PushLocal <delta:u16> <idx:u16>` — push a closure-environment slot.
    pub fn push_local(delta: u16, idx: u16) -> Code {
        Code::of(Op::PushLocal).with_u16(delta).with_u16(idx)
    }

    /// `PushArray <count:u16>` — pop `count` values, push a new array.
    pub fn push_array(count: u16) -> Code {
        Code::of(Op::PushArray).with_u16(count)
    }

    /// `StoreField <idx:u16>` — store into an instance field.
    pub fn store_field(idx: u16) -> Code {
        Code::of(Op::StoreField).with_u16(idx)
    }

    /// `StoreLocal <delta:u16> <idx:u16>` — store into an environment slot.
    pub fn store_local(delta: u16, idx: u16) -> Code {
        Code::of(Op::StoreLocal).with_u16(delta).with_u16(idx)
    }

    /// `Pop` — discard the top of stack.
    pub fn pop() -> Code {
        Code::of(Op::Pop)
    }

    /// `Send <argc:u8> <selector_idx:u16>` — dynamic dispatch.
    pub fn send(argc: u8, selector_idx: u16) -> Code {
        Code::of(Op::Send).with_u8(argc).with_u16(selector_idx)
    }

    /// `SendSuper <argc:u8> <selector_idx:u16>` — dispatch starting at the
    /// superclass of the defining class.
    pub fn send_super(argc: u8, selector_idx: u16) -> Code {
        Code::of(Op::SendSuper).with_u8(argc).with_u16(selector_idx)
    }

    /// `Block <idx:u16>` — materialize a closure over a nested block.
    pub fn block(idx: u16) -> Code {
        Code::of(Op::Block).with_u16(idx)
    }

    /// `BlockReturn` — return the top of stack to the closure's invoker.
    pub fn block_return() -> Code {
        Code::of(Op::BlockReturn)
    }

    /// `Return` — non-local return from the enclosing method.
    pub fn method_return() -> Code {
        Code::of(Op::Return)
    }
}
