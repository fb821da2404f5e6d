//! Lexer implementation

use super::token::*;
use std::iter::Peekable;
use std::str::CharIndices;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Lexer for condition source text.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Get the next token from the source.
    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }

                '=' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        // `===` reads the same as `==`.
                        if self.peek_char() == Some('=') {
                            self.advance();
                        }
                        TokenKind::Eq
                    } else {
                        TokenKind::Error("Unexpected '=': use '==' to compare".to_string())
                    }
                }

                '!' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        if self.peek_char() == Some('=') {
                            self.advance();
                        }
                        TokenKind::Ne
                    } else {
                        TokenKind::Not
                    }
                }

                '>' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }

                '<' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    }
                }

                '&' => {
                    self.advance();
                    if self.peek_char() == Some('&') {
                        self.advance();
                        TokenKind::AndAnd
                    } else {
                        TokenKind::Error("Unexpected '&': use '&&'".to_string())
                    }
                }

                '|' => {
                    self.advance();
                    if self.peek_char() == Some('|') {
                        self.advance();
                        TokenKind::OrOr
                    } else {
                        TokenKind::Error("Unexpected '|': use '||'".to_string())
                    }
                }

                '-' => {
                    self.advance();
                    if self.peek_char().map(|c| c.is_ascii_digit() || c == '.').unwrap_or(false) {
                        self.scan_number_from_pos(start_pos)
                    } else {
                        TokenKind::Error("Unexpected character: -".to_string())
                    }
                }

                '"' | '\'' => self.scan_string(c),

                '`' => self.scan_quoted_identifier(),

                c if c.is_ascii_digit() || c == '.' => self.scan_number_from_pos(start_pos),

                c if c.is_ascii_alphabetic() || c == '_' || c == '$' => self.scan_identifier(),

                c => {
                    self.advance();
                    TokenKind::Error(format!("Unexpected character: {}", c))
                }
            },
        };

        Token {
            kind,
            span: Span {
                start: start_pos,
                end: self.pos,
                line: start_line,
                column: start_col,
            },
        }
    }

    /// Scan an identifier or boolean literal.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                self.advance();
            } else {
                break;
            }
        }

        match &self.source[start..self.pos] {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            ident => TokenKind::Identifier(ident.to_string()),
        }
    }

    /// Scan a backtick-quoted identifier such as `` `Column 7` ``.
    fn scan_quoted_identifier(&mut self) -> TokenKind {
        self.advance(); // consume opening backtick
        let mut name = String::new();

        loop {
            match self.peek_char() {
                None => return TokenKind::Error("Unterminated quoted field name".to_string()),
                Some('`') => {
                    self.advance();
                    break;
                }
                Some('\n') => {
                    return TokenKind::Error("Quoted field name spans lines".to_string());
                }
                Some(c) => {
                    self.advance();
                    name.push(c);
                }
            }
        }

        if name.trim().is_empty() {
            return TokenKind::Error("Empty quoted field name".to_string());
        }
        TokenKind::Identifier(name)
    }

    /// Scan a string literal with escape sequences, delimited by `quote`.
    fn scan_string(&mut self, quote: char) -> TokenKind {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None => return TokenKind::Error("Unterminated string".to_string()),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some('n') => {
                            self.advance();
                            value.push('\n');
                        }
                        Some('t') => {
                            self.advance();
                            value.push('\t');
                        }
                        Some('r') => {
                            self.advance();
                            value.push('\r');
                        }
                        Some(c) if c == '\\' || c == '"' || c == '\'' => {
                            self.advance();
                            value.push(c);
                        }
                        _ => value.push('\\'),
                    }
                }
                Some(c) => {
                    if c == '\n' {
                        self.line += 1;
                        self.column = 0;
                    }
                    self.advance();
                    value.push(c);
                }
            }
        }

        TokenKind::String(value)
    }

    /// Scan a number starting from a given position (sign already consumed).
    fn scan_number_from_pos(&mut self, start: usize) -> TokenKind {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '.' {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.pos];
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => TokenKind::Number(n),
            _ => TokenKind::Error(format!("Invalid number: {}", text)),
        }
    }

    /// Skip whitespace, tracking line numbers.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            match c {
                '\n' => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                c if c.is_whitespace() => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            self.column += 1;
            Some(c)
        } else {
            None
        }
    }
}
