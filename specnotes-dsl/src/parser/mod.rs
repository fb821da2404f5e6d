//! Parser module for the condition language

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::*;
