//! Parser implementation

use super::ast::*;
use crate::lexer::*;

/// Default nesting bound for `!` and parentheses.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Longest condition source accepted, in bytes.
pub const MAX_CONDITION_LEN: usize = 4096;

// ============================================================================
// PARSER
// ============================================================================

/// Recursive-descent parser for conditions.
///
/// Precedence, loosest first: `||`, `&&`, prefix `!`, comparisons, primary.
/// Comparisons do not chain.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Create a new parser from a vector of tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_max_depth(tokens, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(tokens: Vec<Token>, max_depth: usize) -> Self {
        let mut tokens = tokens;
        if tokens.last().map(|t| t.kind != TokenKind::Eof).unwrap_or(true) {
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: tokens.last().map(|t| t.span).unwrap_or_default(),
            });
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Parse the tokens into an expression, requiring all input be consumed.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        if let Some(token) = self
            .tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Error(_)))
        {
            let message = match &token.kind {
                TokenKind::Error(msg) => format!("Lexer error: {}", msg),
                _ => "Lexer error".to_string(),
            };
            return Err(ParseError::at(token, message));
        }

        let expr = self.parse_or_expr()?;

        if !self.is_at_end() {
            return Err(self.error(&format!(
                "Unexpected {} after end of condition",
                self.current().kind
            )));
        }

        Ok(expr)
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;

        while self.check(&TokenKind::OrOr) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        while self.check(&TokenKind::AndAnd) {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(BinaryOp::And, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Not) {
            self.advance();
            self.enter()?;
            let operand = self.parse_unary()?;
            self.leave();
            return Ok(Expr::not(operand));
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_primary()?;

        let Some(op) = BinaryOp::from_comparison_token(&self.current().kind) else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_primary()?;

        if BinaryOp::from_comparison_token(&self.current().kind).is_some() {
            return Err(self.error("Comparisons cannot be chained; add parentheses"));
        }

        Ok(Expr::binary(op, left, right))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let expr = match self.current().kind.clone() {
            TokenKind::True => Expr::Literal(Literal::Bool(true)),
            TokenKind::False => Expr::Literal(Literal::Bool(false)),
            TokenKind::Number(n) => Expr::Literal(Literal::Number(n)),
            TokenKind::String(s) => Expr::Literal(Literal::String(s)),
            TokenKind::Identifier(name) => Expr::FieldRef(name),
            TokenKind::Not => {
                self.advance();
                self.enter()?;
                let operand = self.parse_primary()?;
                self.leave();
                return Ok(Expr::not(operand));
            }
            TokenKind::LParen => {
                self.advance();
                self.enter()?;
                let inner = self.parse_or_expr()?;
                self.expect(TokenKind::RParen)?;
                self.leave();
                return Ok(inner);
            }
            TokenKind::Eof => {
                return Err(self.error("Expected a field, literal, or '(' but the condition ended"))
            }
            other => {
                return Err(self.error(&format!("Expected a field, literal, or '(' but found {}", other)))
            }
        };
        self.advance();
        Ok(expr)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error(&format!(
                "Condition is nested deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("Expected {} but found {}", kind, self.current().kind)))
        }
    }

    pub(crate) fn error(&self, msg: &str) -> ParseError {
        ParseError::at(self.current(), msg)
    }
}

// ============================================================================
// CONVENIENCE FUNCTIONS
// ============================================================================

/// Parse condition source into an expression.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    parse_with_max_depth(source, DEFAULT_MAX_DEPTH)
}

/// Parse with an explicit nesting bound.
pub fn parse_with_max_depth(source: &str, max_depth: usize) -> Result<Expr, ParseError> {
    if source.len() > MAX_CONDITION_LEN {
        return Err(ParseError {
            message: format!(
                "Condition is {} bytes long; the limit is {}",
                source.len(),
                MAX_CONDITION_LEN
            ),
            line: 1,
            column: 1,
        });
    }
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    let mut parser = Parser::with_max_depth(tokens, max_depth);
    parser.parse()
}

/// Parse and pretty-print a condition (for round-trip testing).
pub fn round_trip(source: &str) -> Result<String, ParseError> {
    let expr = parse(source)?;
    Ok(crate::pretty_print(&expr))
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
