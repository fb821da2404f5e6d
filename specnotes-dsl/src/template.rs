//! `{$field}` placeholder substitution
//!
//! Pure text substitution: no other template syntax is interpreted.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use specnotes_core::{Fields, RenderError};
use std::collections::HashSet;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\$([A-Za-z0-9_]+)\}").expect("Invalid placeholder regex"));

/// Replace every `{$name}` with the field's display value.
///
/// Placeholders naming a missing field are kept verbatim.
pub fn render(template: &str, fields: &Fields) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match fields.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Like [`render`], but reject `{$` sequences that are not well-formed
/// placeholders.
pub fn render_checked(template: &str, fields: &Fields) -> Result<String, RenderError> {
    let starts: HashSet<usize> = PLACEHOLDER.find_iter(template).map(|m| m.start()).collect();

    for (offset, _) in template.match_indices("{$") {
        if starts.contains(&offset) {
            continue;
        }
        return Err(match template[offset..].find('}') {
            Some(close) => RenderError::InvalidPlaceholder {
                offset,
                text: template[offset..=offset + close].to_string(),
            },
            None => RenderError::UnterminatedPlaceholder { offset },
        });
    }

    Ok(render(template, fields))
}

/// Field names referenced by placeholders, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Placeholder names with no matching column, deduplicated.
pub fn unresolved_placeholders<'a>(template: &'a str, columns: &[String]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    placeholders(template)
        .into_iter()
        .filter(|name| !columns.iter().any(|c| c == name))
        .filter(|name| seen.insert(*name))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use specnotes_core::FieldValue;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        Fields::from_raw(pairs.iter().copied())
    }

    #[test]
    fn test_render_bool() {
        let f: Fields = [("x", FieldValue::Bool(true))].into_iter().collect();
        assert_eq!(render("{$x}", &f), "true");
    }

    #[test]
    fn test_render_missing_kept() {
        assert_eq!(render("{$missing}", &Fields::new()), "{$missing}");
    }

    #[test]
    fn test_render_mixed() {
        let f = fields(&[("TagNumber", "P-101"), ("rating", "600.0"), ("sour", "TRUE")]);
        assert_eq!(
            render("Tag {$TagNumber}: class {$rating}, sour={$sour}, {$other}", &f),
            "Tag P-101: class 600, sour=true, {$other}"
        );
    }

    #[test]
    fn test_render_ignores_other_syntax() {
        let f = fields(&[("a", "1")]);
        assert_eq!(render("${a} {{$a}} {$ a} {$a-b}", &f), "${a} {1} {$ a} {$a-b}");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let f = fields(&[("a", "{$b}"), ("b", "x")]);
        assert_eq!(render("{$a}", &f), "{$b}");
    }

    #[test]
    fn test_render_checked_ok() -> Result<(), RenderError> {
        let f = fields(&[("a", "1")]);
        assert_eq!(render_checked("a={$a} {$zz}", &f)?, "a=1 {$zz}");
        Ok(())
    }

    #[test]
    fn test_render_checked_unterminated() {
        let err = render_checked("Line {$TagNumber", &Fields::new()).unwrap_err();
        assert_eq!(err, RenderError::UnterminatedPlaceholder { offset: 5 });
    }

    #[test]
    fn test_render_checked_invalid() {
        let err = render_checked("ok {$a} bad {$a-b}", &fields(&[("a", "1")])).unwrap_err();
        assert_eq!(
            err,
            RenderError::InvalidPlaceholder {
                offset: 12,
                text: "{$a-b}".to_string()
            }
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders("{$a} and {$b} and {$a}"), vec!["a", "b", "a"]);
        let columns = vec!["a".to_string()];
        assert_eq!(unresolved_placeholders("{$a} {$b} {$c} {$b}", &columns), vec!["b", "c"]);
    }
}
