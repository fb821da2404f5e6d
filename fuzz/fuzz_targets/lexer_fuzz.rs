//! Fuzz test for the condition lexer
//!
//! Run with: cargo +nightly fuzz run lexer_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use specnotes_dsl::{Lexer, TokenKind};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize();

        // Exactly one Eof, always last.
        assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
        assert_eq!(
            tokens.iter().filter(|t| t.kind == TokenKind::Eof).count(),
            1,
            "Eof must appear once"
        );

        let mut previous_end = 0;
        for token in &tokens {
            assert!(token.span.start <= token.span.end, "Span start should be <= end");
            assert!(token.span.end <= input.len(), "Span must stay inside the input");
            assert!(token.span.start >= previous_end, "Spans must not overlap");
            assert!(token.span.line >= 1, "Line numbers should be >= 1");
            assert!(token.span.column >= 1, "Column numbers should be >= 1");
            if let TokenKind::Number(n) = token.kind {
                assert!(n.is_finite(), "Number tokens are finite");
            }
            previous_end = token.span.end;
        }
    }
});
