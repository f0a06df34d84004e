//! Back end of a Smalltalk compiler: turns an annotated syntax tree into
//! stack-machine bytecode.
//!
//! The pipeline has three parts. [`symbols`] holds the scope/symbol arena
//! the upstream definition and resolution passes fill in, plus the
//! per-class literal pools and the [`CompiledBlock`] output type.
//! [`ast`] is the annotated expression tree. [`codegen`] walks the tree
//! once and emits [`bytecode::Code`], attaching one compiled block to
//! every method and block scope.
//!
//! [`Compiler`] ties the parts together for a driver: it owns the symbol
//! table, offers the definition helpers the upstream passes call (with
//! redefinition diagnostics collected rather than thrown), and runs code
//! generation.

use std::fmt;

use bytecode::Code;

pub mod ast;
pub mod codegen;
pub mod symbols;

pub use codegen::CodeGenerator;
pub use symbols::{
    CompiledBlock, LiteralPool, ScopeId, Symbol, SymbolId, SymbolKind,
    SymbolTable,
};

use ast::{AstArena, File};

/// A compile-time problem worth reporting but not worth aborting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Compilation context for one source file.
#[derive(Debug, Default)]
pub struct Compiler {
    pub symtab: SymbolTable,
    errors: Vec<Diagnostic>,
    file_name: Option<String>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the source file name; it is pooled into every class compiled
    /// by [`generate`](Compiler::generate).
    pub fn set_file_name(&mut self, name: &str) {
        self.file_name = Some(name.to_string());
    }

    /// Declare the instance fields of a class in source order. A repeated
    /// name is reported and skipped.
    pub fn define_fields(&mut self, class: ScopeId, names: &[&str]) {
        for &name in names {
            if self.symtab.member(class, name).is_some() {
                self.redefinition(name, class);
                continue;
            }
            self.symtab.define_field(class, name);
        }
    }

    /// Declare the arguments of a method or block, before any locals.
    pub fn define_arguments(&mut self, callable: ScopeId, names: &[&str]) {
        for &name in names {
            if self.symtab.member(callable, name).is_some() {
                self.redefinition(name, callable);
                continue;
            }
            self.symtab.define_argument(callable, name);
        }
    }

    /// Declare the local variables of a method or block. Shadowing an
    /// enclosing scope is fine; clashing with a sibling slot is not.
    pub fn define_locals(&mut self, callable: ScopeId, names: &[&str]) {
        for &name in names {
            if self.symtab.member(callable, name).is_some() {
                self.redefinition(name, callable);
                continue;
            }
            self.symtab.define_local(callable, name);
        }
    }

    fn redefinition(&mut self, name: &str, scope: ScopeId) {
        self.errors.push(Diagnostic {
            message: format!(
                "redefinition of {} in {}",
                name,
                self.symtab.qualified_name(scope)
            ),
        });
    }

    /// Generate bytecode for a whole compilation unit.
    pub fn generate(&mut self, arena: &AstArena, file: &File) -> Code {
        let mut generator = CodeGenerator::new(arena, &mut self.symtab);
        if let Some(name) = &self.file_name {
            generator.set_file_name(name);
        }
        generator.generate(file)
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{ClassDef, ExprKind, MethodDef};
    use bytecode::{BytecodeDecoder, Instruction};

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn redefined_names_are_reported_not_fatal() {
        init_logs();
        let mut compiler = Compiler::new();
        let class = compiler.symtab.define_class("Point", None);
        compiler.define_fields(class, &["x", "y", "x"]);
        let method = compiler.symtab.define_method(class, "moveBy:and:");
        compiler.define_arguments(method, &["dx", "dy"]);
        compiler.define_locals(method, &["t", "dx"]);

        let messages: Vec<String> =
            compiler.errors().iter().map(Diagnostic::to_string).collect();
        assert_eq!(messages, vec![
            "redefinition of x in Point".to_string(),
            "redefinition of dx in Point>>moveBy:and:".to_string(),
        ]);

        // The survivors keep a dense slot numbering.
        assert_eq!(compiler.symtab.class(class).fields.len(), 2);
        let t = compiler.symtab.resolve(method, "t").expect("local resolves");
        assert_eq!(compiler.symtab.symbol(t).index, 2);
    }

    #[test]
    fn shadowing_an_enclosing_scope_is_not_a_redefinition() {
        init_logs();
        let mut compiler = Compiler::new();
        let class = compiler.symtab.define_class("T", None);
        compiler.define_fields(class, &["x"]);
        let method = compiler.symtab.define_method(class, "run");
        compiler.define_locals(method, &["x"]);
        assert!(!compiler.has_errors());
    }

    #[test]
    fn facade_compiles_a_class_end_to_end() {
        init_logs();
        let mut compiler = Compiler::new();
        compiler.set_file_name("counter.st");
        let class = compiler.symtab.define_class("Counter", None);
        compiler.define_fields(class, &["count"]);
        let method = compiler.symtab.define_method(class, "bump");

        let mut arena = AstArena::new();
        let field = compiler.symtab.resolve(method, "count").expect("field");
        let read = arena.alloc(ExprKind::Ident {
            name: "count".to_string(),
            symbol: Some(field),
        });
        let one = arena.alloc(ExprKind::Number("1".to_string()));
        let sum = arena.alloc(ExprKind::BinaryMessage {
            receiver: read,
            operator: "+".to_string(),
            argument: one,
        });
        let target = arena.alloc(ExprKind::Ident {
            name: "count".to_string(),
            symbol: Some(field),
        });
        let assign = arena.alloc(ExprKind::Assign { target, value: sum });
        let file = File {
            classes: vec![ClassDef {
                scope: class,
                methods: vec![MethodDef {
                    scope: method,
                    body: vec![assign],
                }],
            }],
            main: None,
        };
        compiler.generate(&arena, &file);
        assert!(!compiler.has_errors());

        let compiled = compiler.symtab.compiled(method).expect("compiled");
        let instructions: Vec<Instruction> =
            BytecodeDecoder::new(&compiled.bytecode).collect();
        let pool = compiler.symtab.pool(class).expect("pool");
        assert_eq!(pool.get(0), Some("counter.st"));
        let plus = pool
            .entries()
            .iter()
            .position(|entry| entry == "+")
            .expect("selector pooled") as u16;
        assert_eq!(instructions, vec![
            Instruction::PushField { idx: 0 },
            Instruction::PushInt { value: 1 },
            Instruction::Send { argc: 1, selector_idx: plus },
            Instruction::StoreField { idx: 0 },
            Instruction::Pop,
            Instruction::PushSelf,
            Instruction::Return,
        ]);
    }
}
