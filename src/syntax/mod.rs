//! Java syntax model: lexer, tree, parser and printer.
//!
//! Source text goes in through `parse_compilation_unit`, comes back out
//! through `print_compilation_unit`. Everything in between is plain data.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;

pub use ast::{Block, CompilationUnit, Expr, Member, MethodDecl, NodeId, Stmt, StmtKind, TypeDecl};
pub use parser::{parse_compilation_unit, parse_members};
pub use printer::{print_compilation_unit, print_expr, print_stmt};
