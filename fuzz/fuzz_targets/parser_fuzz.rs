//! Fuzz test for the condition parser and evaluator
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use specnotes_core::Fields;
use specnotes_dsl::{evaluate, parse, pretty_print, validate};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match parse(input) {
            Ok(expr) => {
                // Canonical source re-parses to the same tree.
                let printed = pretty_print(&expr);
                match parse(&printed) {
                    Ok(reparsed) => assert_eq!(reparsed, expr, "round trip changed {printed:?}"),
                    Err(err) => panic!("pretty-printed {printed:?} failed to parse: {err}"),
                }
            }
            Err(err) => {
                assert!(err.line >= 1, "Line should be >= 1");
                assert!(err.column >= 1, "Column should be >= 1");
                assert!(!err.message.is_empty(), "Error message should not be empty");
                assert!(!validate(input).valid);
            }
        }

        let fields = Fields::from_raw([("a", "1"), ("b", "true"), ("c", input)]);
        let _ = evaluate(input, &fields);
    }
});
