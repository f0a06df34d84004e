//! Scope and symbol model for one compilation unit.
//!
//! All scopes live in a single arena owned by [`SymbolTable`]; scopes refer
//! to their lexical parent by arena index, so upward navigation needs no
//! back-pointers and no reference cycles. The scope tree is built entirely
//! by the upstream definition pass; code generation reads it and attaches
//! one [`CompiledBlock`] per callable scope.

use std::collections::HashMap;
use std::rc::Rc;

/// Index of a scope in the [`SymbolTable`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// Index of a symbol in the [`SymbolTable`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

/// Storage class of a resolved identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Instance field of a class; `index` is global across the chain.
    Field,
    /// Method or block argument; `index` is a slot in the shared
    /// argument+local sequence of its callable scope.
    Argument,
    /// Local variable; indexed after the arguments of its callable scope.
    Local,
    /// A class name, pushed as a late-bound global.
    Class,
}

/// A declared name.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// The scope that declares this symbol.
    pub scope: ScopeId,
    /// Slot index within the declaring scope (see [`SymbolKind`]).
    pub index: usize,
}

/// Deduplicating table of string-like literals, one per class scope.
///
/// Selector text, string/char literal text and source file names all funnel
/// through [`get_or_add`](LiteralPool::get_or_add), keyed by content with
/// quote delimiters stripped. Indices are stable for the life of the pool.
#[derive(Debug, Clone, Default)]
pub struct LiteralPool {
    entries: Vec<String>,
    index: HashMap<String, u16>,
}

impl LiteralPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index of `text`, adding it if not yet pooled.
    pub fn get_or_add(&mut self, text: &str) -> u16 {
        let key = if text.contains('\'') {
            text.replace('\'', "")
        } else {
            text.to_string()
        };
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.entries.len() as u16;
        self.entries.push(key.clone());
        self.index.insert(key, idx);
        idx
    }

    pub fn get(&self, idx: u16) -> Option<&str> {
        self.entries.get(idx as usize).map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The bytecode artifact of one method or block body.
///
/// `class` and `scope` are arena indices (navigation only); literal indices
/// in `bytecode` are interpreted against the owning class's pool. Nested
/// blocks are wired bottom-up: each slot in `blocks` holds the compiled
/// block of the direct child with that block index.
#[derive(Debug)]
pub struct CompiledBlock {
    pub class: ScopeId,
    pub scope: ScopeId,
    pub name: String,
    pub num_args: usize,
    pub num_locals: usize,
    pub bytecode: Vec<u8>,
    pub blocks: Vec<Rc<CompiledBlock>>,
}

/// Class scope payload.
#[derive(Debug)]
pub struct ClassScope {
    pub superclass: Option<ScopeId>,
    /// The class's own `Class` symbol, declared in the global scope.
    pub symbol: SymbolId,
    pub fields: Vec<SymbolId>,
    pub methods: Vec<ScopeId>,
    /// Blocks nested anywhere inside this class's methods.
    pub num_nested_blocks: usize,
    pool: Option<LiteralPool>,
}

/// Method or block scope payload. Methods and blocks are unified: both own
/// an argument+local slot sequence and an ordered list of directly nested
/// block scopes.
#[derive(Debug)]
pub struct CallableScope {
    pub args: Vec<SymbolId>,
    pub locals: Vec<SymbolId>,
    /// Directly nested block scopes; position is the block index.
    pub blocks: Vec<ScopeId>,
    /// Position among sibling blocks, assigned at definition time.
    /// Zero (and unused) for method scopes.
    pub block_index: usize,
    compiled: Option<Rc<CompiledBlock>>,
}

#[derive(Debug)]
pub enum ScopeKind {
    Global { classes: HashMap<String, ScopeId> },
    Class(ClassScope),
    Callable(CallableScope),
}

#[derive(Debug)]
pub struct Scope {
    pub name: String,
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
}

/// Arena of every scope and symbol in a compilation unit.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub const GLOBALS: ScopeId = ScopeId(0);

    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                name: "globals".to_string(),
                parent: None,
                kind: ScopeKind::Global {
                    classes: HashMap::new(),
                },
            }],
            symbols: Vec::new(),
        }
    }

    fn alloc_scope(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(scope);
        id
    }

    fn alloc_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    /// The class payload of `id`. Panics if `id` is not a class scope.
    pub fn class(&self, id: ScopeId) -> &ClassScope {
        match &self.scope(id).kind {
            ScopeKind::Class(class) => class,
            _ => panic!("scope {:?} is not a class scope", self.scope(id).name),
        }
    }

    fn class_mut(&mut self, id: ScopeId) -> &mut ClassScope {
        match &mut self.scopes[id.0 as usize].kind {
            ScopeKind::Class(class) => class,
            _ => panic!("scope is not a class scope"),
        }
    }

    /// The callable payload of `id`. Panics if `id` is not a method/block.
    pub fn callable(&self, id: ScopeId) -> &CallableScope {
        match &self.scope(id).kind {
            ScopeKind::Callable(callable) => callable,
            _ => panic!(
                "scope {:?} is not a method or block scope",
                self.scope(id).name
            ),
        }
    }

    fn callable_mut(&mut self, id: ScopeId) -> &mut CallableScope {
        match &mut self.scopes[id.0 as usize].kind {
            ScopeKind::Callable(callable) => callable,
            _ => panic!("scope is not a method or block scope"),
        }
    }

    // ── definition API (upstream definition pass) ──────────────────

    pub fn define_class(
        &mut self,
        name: &str,
        superclass: Option<ScopeId>,
    ) -> ScopeId {
        let symbol = self.alloc_symbol(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Class,
            scope: Self::GLOBALS,
            index: 0,
        });
        let id = self.alloc_scope(Scope {
            name: name.to_string(),
            parent: Some(Self::GLOBALS),
            kind: ScopeKind::Class(ClassScope {
                superclass,
                symbol,
                fields: Vec::new(),
                methods: Vec::new(),
                num_nested_blocks: 0,
                pool: None,
            }),
        });
        match &mut self.scopes[Self::GLOBALS.0 as usize].kind {
            ScopeKind::Global { classes } => {
                let index = classes.len();
                classes.insert(name.to_string(), id);
                self.symbols[symbol.0 as usize].index = index;
            }
            _ => unreachable!("scope 0 is always the global scope"),
        }
        id
    }

    pub fn define_method(&mut self, class: ScopeId, selector: &str) -> ScopeId {
        let id = self.alloc_scope(Scope {
            name: selector.to_string(),
            parent: Some(class),
            kind: ScopeKind::Callable(CallableScope {
                args: Vec::new(),
                locals: Vec::new(),
                blocks: Vec::new(),
                block_index: 0,
                compiled: None,
            }),
        });
        self.class_mut(class).methods.push(id);
        id
    }

    /// Define a block scope directly nested in `parent` (a callable scope).
    /// Its block index is its position among the siblings defined so far.
    pub fn define_block(&mut self, parent: ScopeId) -> ScopeId {
        let block_index = self.callable(parent).blocks.len();
        let name = format!("{}-block{}", self.scope(parent).name, block_index);
        let id = self.alloc_scope(Scope {
            name,
            parent: Some(parent),
            kind: ScopeKind::Callable(CallableScope {
                args: Vec::new(),
                locals: Vec::new(),
                blocks: Vec::new(),
                block_index,
                compiled: None,
            }),
        });
        self.callable_mut(parent).blocks.push(id);
        let class = self.enclosing_class(parent);
        self.class_mut(class).num_nested_blocks += 1;
        id
    }

    /// Define an instance field. Fields keep one global numbering across
    /// the inheritance chain: the first own field of a class gets the
    /// total field count of its superclass chain.
    pub fn define_field(&mut self, class: ScopeId, name: &str) -> SymbolId {
        let index = self.field_base(class) + self.class(class).fields.len();
        let symbol = self.alloc_symbol(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Field,
            scope: class,
            index,
        });
        self.class_mut(class).fields.push(symbol);
        symbol
    }

    /// Define a method/block argument. Arguments must be defined before
    /// any locals of the same scope; they occupy the leading slots of the
    /// shared argument+local sequence.
    pub fn define_argument(
        &mut self,
        callable: ScopeId,
        name: &str,
    ) -> SymbolId {
        debug_assert!(
            self.callable(callable).locals.is_empty(),
            "arguments must be defined before locals"
        );
        let index = self.callable(callable).args.len();
        let symbol = self.alloc_symbol(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Argument,
            scope: callable,
            index,
        });
        self.callable_mut(callable).args.push(symbol);
        symbol
    }

    /// Define a local variable, slotted after the arguments.
    pub fn define_local(&mut self, callable: ScopeId, name: &str) -> SymbolId {
        let callable_scope = self.callable(callable);
        let index = callable_scope.args.len() + callable_scope.locals.len();
        let symbol = self.alloc_symbol(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Local,
            scope: callable,
            index,
        });
        self.callable_mut(callable).locals.push(symbol);
        symbol
    }

    // ── lookup ─────────────────────────────────────────────────────

    /// A symbol declared directly in `scope` (no chain walk). Used by the
    /// definition pass to detect redefinitions.
    pub fn member(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        match &self.scope(scope).kind {
            ScopeKind::Global { classes } => classes
                .get(name)
                .map(|&class| self.class(class).symbol),
            ScopeKind::Class(class) => class
                .fields
                .iter()
                .copied()
                .find(|&sym| self.symbol(sym).name == name),
            ScopeKind::Callable(callable) => callable
                .args
                .iter()
                .chain(callable.locals.iter())
                .copied()
                .find(|&sym| self.symbol(sym).name == name),
        }
    }

    /// Resolve `name` from `scope` outward along the enclosing-scope
    /// chain: argument/local slots of each callable scope, then fields of
    /// the enclosing class and its superclasses, then global class names.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            match &self.scope(id).kind {
                ScopeKind::Class(class) => {
                    // Inherited fields resolve through the superclass chain.
                    if let Some(sym) = self.member(id, name) {
                        return Some(sym);
                    }
                    if let Some(superclass) = class.superclass {
                        let mut chain = Some(superclass);
                        while let Some(class_id) = chain {
                            if let Some(sym) = self.member(class_id, name) {
                                return Some(sym);
                            }
                            chain = self.class(class_id).superclass;
                        }
                    }
                }
                _ => {
                    if let Some(sym) = self.member(id, name) {
                        return Some(sym);
                    }
                }
            }
            current = self.scope(id).parent;
        }
        None
    }

    /// Total field count of `class` including its superclass chain.
    pub fn field_count(&self, class: ScopeId) -> usize {
        self.field_base(class) + self.class(class).fields.len()
    }

    fn field_base(&self, class: ScopeId) -> usize {
        match self.class(class).superclass {
            Some(superclass) => self.field_count(superclass),
            None => 0,
        }
    }

    // ── navigation ─────────────────────────────────────────────────

    /// The class scope the enclosing-scope chain of `scope` terminates at.
    /// Panics if the chain never reaches a class (a contract violation of
    /// the upstream definition pass).
    pub fn enclosing_class(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        loop {
            if let ScopeKind::Class(_) = self.scope(current).kind {
                return current;
            }
            current = self.scope(current).parent.unwrap_or_else(|| {
                panic!(
                    "scope {:?} has no enclosing class scope",
                    self.scope(scope).name
                )
            });
        }
    }

    /// Lexical nesting distance from `from` to `owner` in enclosing-scope
    /// hops; 0 when `from` is `owner`. Panics if `owner` is not on the
    /// chain.
    pub fn delta(&self, from: ScopeId, owner: ScopeId) -> usize {
        let mut hops = 0;
        let mut current = from;
        while current != owner {
            if let ScopeKind::Class(_) = self.scope(current).kind {
                panic!(
                    "scope {:?} does not enclose a reference in {:?}",
                    self.scope(owner).name,
                    self.scope(from).name
                );
            }
            current = self.scope(current).parent.unwrap_or_else(|| {
                panic!(
                    "scope {:?} does not enclose a reference in {:?}",
                    self.scope(owner).name,
                    self.scope(from).name
                )
            });
            hops += 1;
        }
        hops
    }

    /// `Class>>method>>…` qualifier for diagnostics.
    pub fn qualified_name(&self, scope: ScopeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            if id != Self::GLOBALS {
                names.push(self.scope(id).name.clone());
            }
            current = self.scope(id).parent;
        }
        names.reverse();
        names.join(">>")
    }

    // ── literal pool ───────────────────────────────────────────────

    /// The literal pool of a class scope, created lazily on first use.
    pub fn pool_mut(&mut self, class: ScopeId) -> &mut LiteralPool {
        self.class_mut(class).pool.get_or_insert_with(LiteralPool::new)
    }

    /// The literal pool of a class scope, if any literal was registered.
    pub fn pool(&self, class: ScopeId) -> Option<&LiteralPool> {
        self.class(class).pool.as_ref()
    }

    // ── compiled output ────────────────────────────────────────────

    /// Attach the compiled block of a callable scope. Each scope is
    /// compiled exactly once.
    pub fn attach_compiled(&mut self, scope: ScopeId, block: Rc<CompiledBlock>) {
        let callable = self.callable_mut(scope);
        assert!(
            callable.compiled.is_none(),
            "scope was compiled twice"
        );
        callable.compiled = Some(block);
    }

    pub fn compiled(&self, scope: ScopeId) -> Option<&Rc<CompiledBlock>> {
        self.callable(scope).compiled.as_ref()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
