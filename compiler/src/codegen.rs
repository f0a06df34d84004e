//! Bytecode generation.
//!
//! A single walk over the annotated tree produces one [`CompiledBlock`]
//! per method and block scope and returns the joined top-level [`Code`].
//! The generator owns all traversal context itself: a scope stack that is
//! pushed and popped in strict pairs, the current class scope (literal
//! pool and field lookups resolve against it), and a stack of in-progress
//! frames holding the nested-block slots of each open callable scope.

use std::rc::Rc;

use bytecode::Code;
use log::{debug, trace};

use crate::ast::{AstArena, ClassDef, ExprId, ExprKind, File, MainDef, MethodDef};
use crate::symbols::{CompiledBlock, ScopeId, SymbolId, SymbolKind, SymbolTable};

/// An open callable scope: its nested-block slots fill in as the walk
/// reaches each directly nested block literal.
struct Frame {
    scope: ScopeId,
    blocks: Vec<Option<Rc<CompiledBlock>>>,
}

pub struct CodeGenerator<'a> {
    arena: &'a AstArena,
    table: &'a mut SymbolTable,
    scopes: Vec<ScopeId>,
    current_class: Option<ScopeId>,
    frames: Vec<Frame>,
    file_name: Option<String>,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(arena: &'a AstArena, table: &'a mut SymbolTable) -> Self {
        Self {
            arena,
            table,
            scopes: vec![SymbolTable::GLOBALS],
            current_class: None,
            frames: Vec::new(),
            file_name: None,
        }
    }

    /// Pool the source file name in every class compiled afterwards.
    pub fn set_file_name(&mut self, name: &str) {
        self.file_name = Some(name.to_string());
    }

    /// Generate code for a whole compilation unit. Compiled blocks are
    /// attached to their scopes in the symbol table as a side effect.
    pub fn generate(&mut self, file: &File) -> Code {
        let mut code = Code::none();
        for class in &file.classes {
            code = code.join(self.gen_class(class));
        }
        if let Some(main) = &file.main {
            code = code.join(self.gen_main(main));
        }
        code
    }

    fn gen_class(&mut self, class: &ClassDef) -> Code {
        self.scopes.push(class.scope);
        let enclosing = self.current_class.replace(class.scope);
        self.register_file_name(class.scope);
        debug!("generating class {}", self.table.scope(class.scope).name);

        let mut code = Code::none();
        for method in &class.methods {
            code = code.join(self.gen_method(method));
        }
        // Class-initializer failsafe, always present.
        let code = code
            .join(Code::pop())
            .join(Code::push_self())
            .join(Code::method_return());

        self.current_class = enclosing;
        self.scopes.pop();
        code
    }

    fn gen_method(&mut self, method: &MethodDef) -> Code {
        self.gen_callable(method.scope, &method.body)
    }

    /// Top-level code compiles exactly like a method of its synthetic
    /// class scope.
    fn gen_main(&mut self, main: &MainDef) -> Code {
        let enclosing = self.current_class.replace(main.class_scope);
        self.register_file_name(main.class_scope);
        let code = self.gen_callable(main.scope, &main.body);
        self.current_class = enclosing;
        code
    }

    /// Method/main body: statements with a discard between each pair,
    /// then the `pop, push self, return` failsafe. An empty body skips
    /// the pop so the failsafe never underflows the stack.
    fn gen_callable(&mut self, scope: ScopeId, body: &[ExprId]) -> Code {
        self.scopes.push(scope);
        self.push_frame(scope);

        let mut code = self.gen_body(body);
        if !body.is_empty() {
            code = code.join(Code::pop());
        }
        code = code.join(Code::push_self()).join(Code::method_return());

        self.pop_frame(&code);
        self.scopes.pop();
        code
    }

    /// A block literal compiles to a single block-create instruction at
    /// the use site; the body goes into the block's own compiled block,
    /// terminated by `block_return` (with an implicit nil when empty).
    fn gen_block(&mut self, scope: ScopeId, body: &[ExprId]) -> Code {
        let index = self.table.callable(scope).block_index;
        self.scopes.push(scope);
        self.push_frame(scope);

        let mut code = self.gen_body(body);
        if body.is_empty() {
            code = code.join(Code::push_nil());
        }
        code = code.join(Code::block_return());

        let compiled = self.pop_frame(&code);
        self.scopes.pop();

        let parent = self
            .frames
            .last_mut()
            .unwrap_or_else(|| panic!("block scope without an open enclosing frame"));
        parent.blocks[index] = Some(compiled);
        Code::block(index as u16)
    }

    fn gen_body(&mut self, body: &[ExprId]) -> Code {
        let mut code = Code::none();
        for (i, &stmt) in body.iter().enumerate() {
            if i > 0 {
                code = code.join(Code::pop());
            }
            code = code.join(self.gen_expr(stmt));
        }
        code
    }

    fn gen_expr(&mut self, id: ExprId) -> Code {
        let arena = self.arena;
        match &arena.get(id).kind {
            ExprKind::Number(text) => {
                if text.contains('.') {
                    let value: f32 = text.parse().unwrap_or_else(|_| {
                        panic!("malformed float literal {:?}", text)
                    });
                    Code::push_float(value)
                } else {
                    let value: i32 = text.parse().unwrap_or_else(|_| {
                        panic!("malformed integer literal {:?}", text)
                    });
                    Code::push_int(value)
                }
            }
            ExprKind::Char(text) => {
                let idx = self.lit(text);
                Code::push_char(idx)
            }
            ExprKind::Str(text) => {
                let idx = self.lit(text);
                Code::push_literal(idx)
            }
            ExprKind::Nil => Code::push_nil(),
            ExprKind::True => Code::push_true(),
            ExprKind::False => Code::push_false(),
            ExprKind::SelfRef => Code::push_self(),
            // A bare `super` evaluates to the receiver; only sends treat
            // it specially.
            ExprKind::SuperRef => Code::push_self(),
            ExprKind::Ident { name, symbol } => self.gen_push(name, *symbol),
            ExprKind::Assign { target, value } => {
                let value_code = self.gen_expr(*value);
                value_code.join(self.gen_store(*target))
            }
            // `^expr` always returns from the enclosing method, even
            // inside a block.
            ExprKind::Return(expr) => {
                self.gen_expr(*expr).join(Code::method_return())
            }
            ExprKind::UnaryMessage { receiver, selector } => {
                let (code, is_super) = self.gen_receiver(*receiver);
                let selector_idx = self.lit(selector);
                code.join(self.send(is_super, 0, selector_idx))
            }
            ExprKind::BinaryMessage {
                receiver,
                operator,
                argument,
            } => {
                let (code, is_super) = self.gen_receiver(*receiver);
                let code = code.join(self.gen_expr(*argument));
                let selector_idx = self.lit(operator);
                code.join(self.send(is_super, 1, selector_idx))
            }
            ExprKind::KeywordMessage { receiver, pairs } => {
                let (mut code, is_super) = self.gen_receiver(*receiver);
                for pair in pairs {
                    code = code.join(self.gen_expr(pair.argument));
                }
                let selector: String =
                    pairs.iter().map(|pair| pair.keyword.as_str()).collect();
                let argc = selector.matches(':').count() as u8;
                let selector_idx = self.lit(&selector);
                code.join(self.send(is_super, argc, selector_idx))
            }
            ExprKind::Array(elements) => {
                let mut code = Code::none();
                for &element in elements {
                    code = code.join(self.gen_expr(element));
                }
                code.join(Code::push_array(elements.len() as u16))
            }
            ExprKind::Block { scope, body } => self.gen_block(*scope, body),
        }
    }

    /// Receiver of a send. `super` pushes the receiver like `self` but
    /// flips the send to dispatch above the current class.
    fn gen_receiver(&mut self, receiver: ExprId) -> (Code, bool) {
        if let ExprKind::SuperRef = self.arena.get(receiver).kind {
            (Code::push_self(), true)
        } else {
            (self.gen_expr(receiver), false)
        }
    }

    fn send(&self, is_super: bool, argc: u8, selector_idx: u16) -> Code {
        if is_super {
            Code::send_super(argc, selector_idx)
        } else {
            Code::send(argc, selector_idx)
        }
    }

    /// Push a resolved identifier by storage class; an unresolved name
    /// degrades to a late-bound global push so the VM can report it at
    /// run time.
    fn gen_push(&mut self, name: &str, symbol: Option<SymbolId>) -> Code {
        let Some(symbol) = symbol else {
            trace!("unresolved identifier {:?} pushed as global", name);
            let idx = self.lit(name);
            return Code::push_global(idx);
        };
        let sym = self.table.symbol(symbol);
        let (kind, owner, index) = (sym.kind, sym.scope, sym.index);
        match kind {
            SymbolKind::Field => Code::push_field(index as u16),
            SymbolKind::Argument | SymbolKind::Local => {
                let delta = self.table.delta(self.current_scope(), owner);
                Code::push_local(delta as u16, index as u16)
            }
            SymbolKind::Class => {
                let idx = self.lit(name);
                Code::push_global(idx)
            }
        }
    }

    fn gen_store(&mut self, target: ExprId) -> Code {
        let arena = self.arena;
        let ExprKind::Ident { name, symbol } = &arena.get(target).kind else {
            panic!("assignment target is not an identifier");
        };
        let Some(symbol) = *symbol else {
            panic!("store to unresolved identifier {:?}", name);
        };
        let sym = self.table.symbol(symbol);
        let (kind, owner, index) = (sym.kind, sym.scope, sym.index);
        match kind {
            SymbolKind::Field => Code::store_field(index as u16),
            SymbolKind::Argument | SymbolKind::Local => {
                let delta = self.table.delta(self.current_scope(), owner);
                Code::store_local(delta as u16, index as u16)
            }
            SymbolKind::Class => {
                panic!("cannot assign to class name {:?}", name)
            }
        }
    }

    // ── frames ─────────────────────────────────────────────────────

    fn push_frame(&mut self, scope: ScopeId) {
        let slots = self.table.callable(scope).blocks.len();
        self.frames.push(Frame {
            scope,
            blocks: vec![None; slots],
        });
    }

    /// Freeze the finished bytecode of the top frame into a compiled
    /// block and attach it to the frame's scope.
    fn pop_frame(&mut self, code: &Code) -> Rc<CompiledBlock> {
        let frame = self
            .frames
            .pop()
            .unwrap_or_else(|| panic!("frame stack underflow"));
        let scope = frame.scope;
        let class = self
            .current_class
            .unwrap_or_else(|| panic!("callable scope outside a class"));

        let name = self.table.scope(scope).name.clone();
        let callable = self.table.callable(scope);
        let num_args = callable.args.len();
        let num_locals = callable.locals.len();

        let blocks = frame
            .blocks
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    panic!("block {} of {} was never compiled", index, name)
                })
            })
            .collect();

        let compiled = Rc::new(CompiledBlock {
            class,
            scope,
            name,
            num_args,
            num_locals,
            bytecode: code.as_bytes().to_vec(),
            blocks,
        });
        debug!(
            "compiled {} ({} bytes, {} nested blocks)",
            compiled.name,
            compiled.bytecode.len(),
            compiled.blocks.len()
        );
        self.table.attach_compiled(scope, Rc::clone(&compiled));
        compiled
    }

    // ── context ────────────────────────────────────────────────────

    fn current_scope(&self) -> ScopeId {
        *self
            .scopes
            .last()
            .unwrap_or_else(|| panic!("scope stack underflow"))
    }

    /// Intern `text` into the current class's literal pool.
    fn lit(&mut self, text: &str) -> u16 {
        let class = self
            .current_class
            .unwrap_or_else(|| panic!("literal outside a class scope"));
        self.table.pool_mut(class).get_or_add(text)
    }

    fn register_file_name(&mut self, class: ScopeId) {
        if let Some(name) = self.file_name.clone() {
            self.table.pool_mut(class).get_or_add(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::KeywordPair;
    use bytecode::{BytecodeDecoder, Instruction};

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn decode(bytes: &[u8]) -> Vec<Instruction> {
        BytecodeDecoder::new(bytes).collect()
    }

    fn pool_index(table: &SymbolTable, class: ScopeId, text: &str) -> u16 {
        table
            .pool(class)
            .expect("class has a literal pool")
            .entries()
            .iter()
            .position(|entry| entry == text)
            .expect("literal is pooled") as u16
    }

    /// One class, one method, the given body.
    struct MethodFixture {
        arena: AstArena,
        table: SymbolTable,
        class: ScopeId,
        method: ScopeId,
    }

    impl MethodFixture {
        fn new() -> Self {
            init_logs();
            let mut table = SymbolTable::new();
            let class = table.define_class("T", None);
            let method = table.define_method(class, "run");
            Self {
                arena: AstArena::new(),
                table,
                class,
                method,
            }
        }

        fn compile(mut self, body: Vec<ExprId>) -> (SymbolTable, Code) {
            let file = File {
                classes: vec![ClassDef {
                    scope: self.class,
                    methods: vec![MethodDef {
                        scope: self.method,
                        body,
                    }],
                }],
                main: None,
            };
            let mut generator = CodeGenerator::new(&self.arena, &mut self.table);
            let code = generator.generate(&file);
            (self.table, code)
        }

        fn compile_method(self, body: Vec<ExprId>) -> (SymbolTable, Vec<Instruction>) {
            let method = self.method;
            let (table, _) = self.compile(body);
            let instructions =
                decode(&table.compiled(method).expect("method compiled").bytecode);
            (table, instructions)
        }

        fn int(&mut self, text: &str) -> ExprId {
            self.arena.alloc(ExprKind::Number(text.to_string()))
        }

        fn ident(&mut self, name: &str, symbol: Option<SymbolId>) -> ExprId {
            self.arena.alloc(ExprKind::Ident {
                name: name.to_string(),
                symbol,
            })
        }
    }

    #[test]
    fn empty_method_compiles_to_the_failsafe_pair() {
        let fx = MethodFixture::new();
        let (_, instructions) = fx.compile_method(vec![]);
        assert_eq!(instructions, vec![Instruction::PushSelf, Instruction::Return]);
    }

    #[test]
    fn discards_appear_only_between_statements_plus_failsafe() {
        let mut fx = MethodFixture::new();
        let body = vec![fx.int("1"), fx.int("2"), fx.int("3")];
        let (_, instructions) = fx.compile_method(body);
        assert_eq!(instructions, vec![
            Instruction::PushInt { value: 1 },
            Instruction::Pop,
            Instruction::PushInt { value: 2 },
            Instruction::Pop,
            Instruction::PushInt { value: 3 },
            Instruction::Pop,
            Instruction::PushSelf,
            Instruction::Return,
        ]);
    }

    #[test]
    fn class_code_ends_with_the_initializer_failsafe() {
        let mut fx = MethodFixture::new();
        let body = vec![fx.int("1")];
        let (_, code) = fx.compile(body);
        let instructions = decode(code.as_bytes());
        assert_eq!(&instructions[instructions.len() - 3..], &[
            Instruction::Pop,
            Instruction::PushSelf,
            Instruction::Return,
        ]);
    }

    #[test]
    fn empty_closure_pushes_nil_before_returning() {
        let mut fx = MethodFixture::new();
        let block_scope = fx.table.define_block(fx.method);
        let block = fx.arena.alloc(ExprKind::Block {
            scope: block_scope,
            body: vec![],
        });
        let method = fx.method;
        let (table, instructions) = fx.compile_method(vec![block]);

        assert_eq!(instructions, vec![
            Instruction::Block { idx: 0 },
            Instruction::Pop,
            Instruction::PushSelf,
            Instruction::Return,
        ]);
        let compiled = table.compiled(method).expect("method compiled");
        assert_eq!(compiled.blocks.len(), 1);
        assert_eq!(decode(&compiled.blocks[0].bytecode), vec![
            Instruction::Nil,
            Instruction::BlockReturn,
        ]);
    }

    #[test]
    fn sibling_blocks_get_consecutive_indices() {
        let mut fx = MethodFixture::new();
        let first = fx.table.define_block(fx.method);
        let second = fx.table.define_block(fx.method);
        let first = fx.arena.alloc(ExprKind::Block {
            scope: first,
            body: vec![],
        });
        let second = fx.arena.alloc(ExprKind::Block {
            scope: second,
            body: vec![],
        });
        let (_, instructions) = fx.compile_method(vec![first, second]);
        assert_eq!(instructions, vec![
            Instruction::Block { idx: 0 },
            Instruction::Pop,
            Instruction::Block { idx: 1 },
            Instruction::Pop,
            Instruction::PushSelf,
            Instruction::Return,
        ]);
    }

    #[test]
    fn nested_closures_wire_into_a_block_tree() {
        let mut fx = MethodFixture::new();
        let outer_scope = fx.table.define_block(fx.method);
        let inner_scope = fx.table.define_block(outer_scope);
        let inner = fx.arena.alloc(ExprKind::Block {
            scope: inner_scope,
            body: vec![],
        });
        let outer = fx.arena.alloc(ExprKind::Block {
            scope: outer_scope,
            body: vec![inner],
        });
        let method = fx.method;
        let (table, _) = fx.compile(vec![outer]);

        let compiled = table.compiled(method).expect("method compiled");
        assert_eq!(compiled.blocks.len(), 1);
        let outer = &compiled.blocks[0];
        assert_eq!(outer.blocks.len(), 1);
        assert_eq!(decode(&outer.bytecode), vec![
            Instruction::Block { idx: 0 },
            Instruction::BlockReturn,
        ]);
        let inner = &outer.blocks[0];
        assert!(inner.blocks.is_empty());
        assert_eq!(decode(&inner.bytecode).last(), Some(&Instruction::BlockReturn));
    }

    #[test]
    fn closure_reads_enclosing_slots_by_delta() {
        let mut fx = MethodFixture::new();
        let x = fx.table.define_local(fx.method, "x");
        let outer_scope = fx.table.define_block(fx.method);
        let y = fx.table.define_argument(outer_scope, "y");
        let inner_scope = fx.table.define_block(outer_scope);

        let use_x = fx.ident("x", Some(x));
        let use_y = fx.ident("y", Some(y));
        let inner = fx.arena.alloc(ExprKind::Block {
            scope: inner_scope,
            body: vec![use_x, use_y],
        });
        let outer = fx.arena.alloc(ExprKind::Block {
            scope: outer_scope,
            body: vec![inner],
        });
        let method = fx.method;
        let (table, _) = fx.compile(vec![outer]);

        let inner = &table.compiled(method).expect("compiled").blocks[0].blocks[0];
        assert_eq!(decode(&inner.bytecode), vec![
            Instruction::PushLocal { delta: 2, idx: 0 },
            Instruction::Pop,
            Instruction::PushLocal { delta: 1, idx: 0 },
            Instruction::BlockReturn,
        ]);
    }

    #[test]
    fn explicit_return_in_a_closure_exits_the_method() {
        let mut fx = MethodFixture::new();
        let block_scope = fx.table.define_block(fx.method);
        let receiver = fx.arena.alloc(ExprKind::SelfRef);
        let ret = fx.arena.alloc(ExprKind::Return(receiver));
        let block = fx.arena.alloc(ExprKind::Block {
            scope: block_scope,
            body: vec![ret],
        });
        let method = fx.method;
        let (table, _) = fx.compile(vec![block]);

        let compiled = &table.compiled(method).expect("compiled").blocks[0];
        assert_eq!(decode(&compiled.bytecode), vec![
            Instruction::PushSelf,
            Instruction::Return,
            Instruction::BlockReturn,
        ]);
    }

    #[test]
    fn assignment_stores_without_consuming_the_value() {
        let mut fx = MethodFixture::new();
        let x = fx.table.define_local(fx.method, "x");
        let target = fx.ident("x", Some(x));
        let value = fx.int("5");
        let assign = fx.arena.alloc(ExprKind::Assign { target, value });
        let (_, instructions) = fx.compile_method(vec![assign]);
        assert_eq!(instructions, vec![
            Instruction::PushInt { value: 5 },
            Instruction::StoreLocal { delta: 0, idx: 0 },
            Instruction::Pop,
            Instruction::PushSelf,
            Instruction::Return,
        ]);
    }

    #[test]
    fn fields_compile_to_field_slots() {
        let mut fx = MethodFixture::new();
        let field = fx.table.define_field(fx.class, "count");
        let target = fx.ident("count", Some(field));
        let value = fx.int("1");
        let assign = fx.arena.alloc(ExprKind::Assign { target, value });
        let read = fx.ident("count", Some(field));
        let (_, instructions) = fx.compile_method(vec![assign, read]);
        assert_eq!(instructions, vec![
            Instruction::PushInt { value: 1 },
            Instruction::StoreField { idx: 0 },
            Instruction::Pop,
            Instruction::PushField { idx: 0 },
            Instruction::Pop,
            Instruction::PushSelf,
            Instruction::Return,
        ]);
    }

    #[test]
    fn inherited_fields_keep_their_chain_indices() {
        init_logs();
        let mut arena = AstArena::new();
        let mut table = SymbolTable::new();
        let base = table.define_class("Base", None);
        let inherited = table.define_field(base, "a");
        let sub = table.define_class("Sub", Some(base));
        let own = table.define_field(sub, "b");
        let method = table.define_method(sub, "both");

        let push_a = arena.alloc(ExprKind::Ident {
            name: "a".to_string(),
            symbol: Some(inherited),
        });
        let push_b = arena.alloc(ExprKind::Ident {
            name: "b".to_string(),
            symbol: Some(own),
        });
        let file = File {
            classes: vec![ClassDef {
                scope: sub,
                methods: vec![MethodDef {
                    scope: method,
                    body: vec![push_a, push_b],
                }],
            }],
            main: None,
        };
        CodeGenerator::new(&arena, &mut table).generate(&file);

        let compiled = table.compiled(method).expect("compiled");
        assert_eq!(decode(&compiled.bytecode)[..3], [
            Instruction::PushField { idx: 0 },
            Instruction::Pop,
            Instruction::PushField { idx: 1 },
        ]);
    }

    #[test]
    fn unary_send_evaluates_receiver_then_dispatches() {
        let mut fx = MethodFixture::new();
        let receiver = fx.arena.alloc(ExprKind::SelfRef);
        let send = fx.arena.alloc(ExprKind::UnaryMessage {
            receiver,
            selector: "size".to_string(),
        });
        let class = fx.class;
        let (table, instructions) = fx.compile_method(vec![send]);
        let selector = pool_index(&table, class, "size");
        assert_eq!(instructions[..2], [
            Instruction::PushSelf,
            Instruction::Send { argc: 0, selector_idx: selector },
        ]);
    }

    #[test]
    fn binary_send_pushes_both_operands() {
        let mut fx = MethodFixture::new();
        let receiver = fx.int("3");
        let argument = fx.int("4");
        let send = fx.arena.alloc(ExprKind::BinaryMessage {
            receiver,
            operator: "+".to_string(),
            argument,
        });
        let class = fx.class;
        let (table, instructions) = fx.compile_method(vec![send]);
        let selector = pool_index(&table, class, "+");
        assert_eq!(instructions[..3], [
            Instruction::PushInt { value: 3 },
            Instruction::PushInt { value: 4 },
            Instruction::Send { argc: 1, selector_idx: selector },
        ]);
    }

    #[test]
    fn keyword_send_concatenates_the_selector() {
        let mut fx = MethodFixture::new();
        let receiver = fx.arena.alloc(ExprKind::SelfRef);
        let first = fx.int("1");
        let second = fx.int("2");
        let send = fx.arena.alloc(ExprKind::KeywordMessage {
            receiver,
            pairs: vec![
                KeywordPair {
                    keyword: "at:".to_string(),
                    argument: first,
                },
                KeywordPair {
                    keyword: "put:".to_string(),
                    argument: second,
                },
            ],
        });
        let class = fx.class;
        let (table, instructions) = fx.compile_method(vec![send]);
        let selector = pool_index(&table, class, "at:put:");
        assert_eq!(instructions[..4], [
            Instruction::PushSelf,
            Instruction::PushInt { value: 1 },
            Instruction::PushInt { value: 2 },
            Instruction::Send { argc: 2, selector_idx: selector },
        ]);
    }

    #[test]
    fn super_sends_push_self_and_dispatch_above() {
        let mut fx = MethodFixture::new();
        let receiver = fx.arena.alloc(ExprKind::SuperRef);
        let send = fx.arena.alloc(ExprKind::UnaryMessage {
            receiver,
            selector: "init".to_string(),
        });
        let class = fx.class;
        let (table, instructions) = fx.compile_method(vec![send]);
        let selector = pool_index(&table, class, "init");
        assert_eq!(instructions[..2], [
            Instruction::PushSelf,
            Instruction::SendSuper { argc: 0, selector_idx: selector },
        ]);
    }

    #[test]
    fn bare_super_pushes_the_receiver() {
        let mut fx = MethodFixture::new();
        let sup = fx.arena.alloc(ExprKind::SuperRef);
        let (_, instructions) = fx.compile_method(vec![sup]);
        assert_eq!(instructions[0], Instruction::PushSelf);
    }

    #[test]
    fn unresolved_identifiers_fall_back_to_globals() {
        let mut fx = MethodFixture::new();
        let unknown = fx.ident("Transcript", None);
        let class = fx.class;
        let (table, instructions) = fx.compile_method(vec![unknown]);
        let idx = pool_index(&table, class, "Transcript");
        assert_eq!(instructions[0], Instruction::PushGlobal { idx });
    }

    #[test]
    fn class_names_push_as_globals() {
        let mut fx = MethodFixture::new();
        let symbol = fx.table.resolve(fx.method, "T").expect("class resolves");
        let use_class = fx.ident("T", Some(symbol));
        let class = fx.class;
        let (table, instructions) = fx.compile_method(vec![use_class]);
        let idx = pool_index(&table, class, "T");
        assert_eq!(instructions[0], Instruction::PushGlobal { idx });
    }

    #[test]
    fn string_literals_share_one_pool_entry() {
        let mut fx = MethodFixture::new();
        let first = fx.arena.alloc(ExprKind::Str("'hi'".to_string()));
        let second = fx.arena.alloc(ExprKind::Str("hi".to_string()));
        let class = fx.class;
        let (table, instructions) = fx.compile_method(vec![first, second]);
        let idx = pool_index(&table, class, "hi");
        assert_eq!(instructions[0], Instruction::PushLiteral { idx });
        assert_eq!(instructions[2], Instruction::PushLiteral { idx });
        assert_eq!(table.pool(class).expect("pool").len(), 1);
    }

    #[test]
    fn literals_pool_in_evaluation_order() {
        let mut fx = MethodFixture::new();
        let receiver = fx.arena.alloc(ExprKind::Str("'a'".to_string()));
        let send = fx.arena.alloc(ExprKind::UnaryMessage {
            receiver,
            selector: "reversed".to_string(),
        });
        let class = fx.class;
        let (table, _) = fx.compile_method(vec![send]);
        assert_eq!(pool_index(&table, class, "a"), 0);
        assert_eq!(pool_index(&table, class, "reversed"), 1);
    }

    #[test]
    fn array_literal_pushes_elements_then_collects() {
        let mut fx = MethodFixture::new();
        let first = fx.int("1");
        let second = fx.int("2");
        let array = fx.arena.alloc(ExprKind::Array(vec![first, second]));
        let (_, instructions) = fx.compile_method(vec![array]);
        assert_eq!(instructions[..3], [
            Instruction::PushInt { value: 1 },
            Instruction::PushInt { value: 2 },
            Instruction::PushArray { count: 2 },
        ]);
    }

    #[test]
    fn numeric_literals_split_on_the_decimal_point() {
        let mut fx = MethodFixture::new();
        let float = fx.arena.alloc(ExprKind::Number("3.25".to_string()));
        let negative = fx.int("-17");
        let (_, instructions) = fx.compile_method(vec![float, negative]);
        assert_eq!(instructions[0], Instruction::PushFloat { value: 3.25 });
        assert_eq!(instructions[2], Instruction::PushInt { value: -17 });
    }

    #[test]
    fn constants_compile_to_single_opcodes() {
        let mut fx = MethodFixture::new();
        let body = vec![
            fx.arena.alloc(ExprKind::Nil),
            fx.arena.alloc(ExprKind::True),
            fx.arena.alloc(ExprKind::False),
        ];
        let (_, instructions) = fx.compile_method(body);
        assert_eq!(instructions[..5], [
            Instruction::Nil,
            Instruction::Pop,
            Instruction::True,
            Instruction::Pop,
            Instruction::False,
        ]);
    }

    #[test]
    fn main_compiles_like_a_method_of_its_synthetic_class() {
        init_logs();
        let mut arena = AstArena::new();
        let mut table = SymbolTable::new();
        let class = table.define_class("MainClass", None);
        let scope = table.define_method(class, "main");
        let stmt = arena.alloc(ExprKind::Number("42".to_string()));
        let file = File {
            classes: vec![],
            main: Some(MainDef {
                class_scope: class,
                scope,
                body: vec![stmt],
            }),
        };
        let code = CodeGenerator::new(&arena, &mut table).generate(&file);

        assert_eq!(decode(code.as_bytes()), vec![
            Instruction::PushInt { value: 42 },
            Instruction::Pop,
            Instruction::PushSelf,
            Instruction::Return,
        ]);
        let compiled = table.compiled(scope).expect("main compiled");
        assert_eq!(compiled.bytecode, code.as_bytes());
        assert_eq!(compiled.num_args, 0);
    }

    #[test]
    fn file_name_is_pooled_per_class() {
        let mut fx = MethodFixture::new();
        let class = fx.class;
        let file = File {
            classes: vec![ClassDef {
                scope: fx.class,
                methods: vec![],
            }],
            main: None,
        };
        let mut generator = CodeGenerator::new(&fx.arena, &mut fx.table);
        generator.set_file_name("counter.st");
        generator.generate(&file);
        assert_eq!(pool_index(&fx.table, class, "counter.st"), 0);
    }

    #[test]
    #[should_panic(expected = "cannot assign to class name")]
    fn storing_to_a_class_name_is_rejected() {
        let mut fx = MethodFixture::new();
        let symbol = fx.table.resolve(fx.method, "T").expect("class resolves");
        let target = fx.ident("T", Some(symbol));
        let value = fx.int("1");
        let assign = fx.arena.alloc(ExprKind::Assign { target, value });
        fx.compile(vec![assign]);
    }
}
