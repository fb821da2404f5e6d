//! Lexer module for the condition language

pub mod token;
pub mod scanner;

pub use token::*;
pub use scanner::*;
