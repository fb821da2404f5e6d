//! Fuzz test for the template renderer
//!
//! Run with: cargo +nightly fuzz run template_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use specnotes_core::Fields;
use specnotes_dsl::{placeholders, render, render_checked};

fuzz_target!(|data: &[u8]| {
    if let Ok(template) = std::str::from_utf8(data) {
        let empty = Fields::new();

        // With no fields every placeholder stays verbatim.
        assert_eq!(render(template, &empty), template);

        if let Ok(checked) = render_checked(template, &empty) {
            assert_eq!(checked, template);
        }

        let fields = Fields::from_raw(placeholders(template).into_iter().map(|name| (name, "x")));
        let _ = render_checked(template, &fields);
    }
});
