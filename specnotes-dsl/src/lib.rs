//! specnotes condition language and template renderer
//!
//! Conditions are a closed boolean grammar over row fields; no input can
//! perform I/O or unbounded computation.
//!
//! Architecture:
//! ```text
//! Condition source
//!     ↓
//! Lexer (tokens)
//!     ↓
//! Parser (Expr AST, depth and length bounded)
//!     ↓
//! Condition (compiled once, cached by source text)
//!     ↓
//! evaluate against Fields → bool
//!
//! Template source + Fields → render → text
//! ```
//!
//! The pretty printer turns an AST back into canonical source for
//! round-trip testing.

pub mod eval;
pub mod lexer;
pub mod parser;
pub mod pretty_printer;
pub mod template;
pub mod validate;

pub use eval::*;
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::*;
pub use pretty_printer::{escape_string, is_plain_identifier, pretty_print};
pub use template::*;
pub use validate::*;
