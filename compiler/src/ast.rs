//! Annotated syntax tree for one compilation unit.
//!
//! The tree arrives from the upstream parsing and resolution passes with
//! its scope and symbol annotations already in place: every class, method
//! and block node carries the [`ScopeId`] of its scope, and every
//! identifier use carries the [`SymbolId`] it resolved to (or `None` when
//! resolution failed — such uses compile to late-bound global lookups).
//!
//! Expressions live in an [`AstArena`] and refer to each other by
//! [`ExprId`].

use crate::symbols::{ScopeId, SymbolId};

/// Index of an expression node in the [`AstArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub kind: ExprKind,
}

/// Arena of expression nodes for one compilation unit.
#[derive(Debug, Default)]
pub struct AstArena {
    nodes: Vec<ExprNode>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(ExprNode { kind });
        id
    }

    pub fn get(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The different forms an expression can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal, kept as source text: text containing a decimal
    /// point compiles to a float immediate, anything else to an integer.
    Number(String),
    /// Character literal text, pooled.
    Char(String),
    /// String literal text (quotes included or not — the pool strips
    /// them), pooled.
    Str(String),
    /// `nil`.
    Nil,
    /// `true`.
    True,
    /// `false`.
    False,
    /// `self`.
    SelfRef,
    /// `super`. Only meaningful as a message receiver; a bare `super`
    /// pushes the receiver like `self`.
    SuperRef,

    /// An identifier use with its resolved binding, or `None` when the
    /// upstream pass could not resolve it.
    Ident {
        name: String,
        symbol: Option<SymbolId>,
    },

    /// `target := value`. The target must be an [`ExprKind::Ident`].
    Assign { target: ExprId, value: ExprId },

    /// `^ expr` — non-local return from the enclosing method, even when
    /// written inside a block.
    Return(ExprId),

    /// `receiver selector`.
    UnaryMessage { receiver: ExprId, selector: String },

    /// `receiver op argument`. Chains nest through the receiver.
    BinaryMessage {
        receiver: ExprId,
        operator: String,
        argument: ExprId,
    },

    /// `receiver key1: arg1 key2: arg2 …`.
    KeywordMessage {
        receiver: ExprId,
        pairs: Vec<KeywordPair>,
    },

    /// `{ e1. e2. … }` — array literal.
    Array(Vec<ExprId>),

    /// `[ … ]` — block literal. The body compiles into the block scope's
    /// own compiled block; the literal itself compiles to a single
    /// block-create instruction.
    Block { scope: ScopeId, body: Vec<ExprId> },
}

/// One `keyword: argument` pair of a keyword message. The keyword text
/// keeps its trailing colon; the full selector is the concatenation of all
/// pair keywords in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordPair {
    pub keyword: String,
    pub argument: ExprId,
}

/// A compilation unit: class definitions plus optional top-level code.
#[derive(Debug, Default)]
pub struct File {
    pub classes: Vec<ClassDef>,
    pub main: Option<MainDef>,
}

/// A class definition with its annotated scope and member methods.
#[derive(Debug)]
pub struct ClassDef {
    pub scope: ScopeId,
    pub methods: Vec<MethodDef>,
}

/// A method body. Local-variable declarations are already registered in
/// the scope by the upstream pass and produce no code.
#[derive(Debug)]
pub struct MethodDef {
    pub scope: ScopeId,
    pub body: Vec<ExprId>,
}

/// Top-level code, compiled like a method of a synthetic class scope.
#[derive(Debug)]
pub struct MainDef {
    pub class_scope: ScopeId,
    pub scope: ScopeId,
    pub body: Vec<ExprId>,
}
