//! Core library for the Sable scripting language: a line-oriented lexer, a parser that
//! defers checks on forward-referenced user types to the end of analysis, and a
//! tree-walking evaluator with value-copy scopes and operator-overload dispatch.

pub mod ast;
pub mod checker;
pub mod diagnostics;
pub mod environment;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod value;

pub use diagnostics::{
    Diagnostic, DiagnosticKind, ErrorCollector, Result, SableError, SourceSpan,
};
pub use parser::{Analysis, Program, analyze};
pub use repl::Repl;
pub use runtime::{Interpreter, Runtime, RuntimeOptions, run_source};
