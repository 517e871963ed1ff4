//! Flexbox bug workarounds.
//!
//! Rewrites `flex` shorthands that start with a number into explicit
//! longhands:
//!
//! - a missing shrink factor becomes `1`
//! - a missing basis becomes `0%`, and a unitless `0` basis becomes `0%`
//!   (IE10-11 drop declarations with a unitless basis)
//! - a `calc()` basis is kept in its own `flex-basis` declaration
//!   (IE10-11 ignore `calc()` inside the shorthand)
//!
//! Longhands are emitted rather than a normalized shorthand so later
//! printing passes cannot shorten the value again.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use super::{Stage, StageError, FLEXBOX_FIXES};

fn flex_declaration() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?P<lead>[{;\s])flex\s*:(?P<value>[^;{}]*)").expect("valid regex"))
}

/// Stage applying the flexbox rewrites.
#[derive(Debug, Default)]
pub struct FlexbugsStage;

impl FlexbugsStage {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for FlexbugsStage {
    fn name(&self) -> &'static str {
        FLEXBOX_FIXES
    }

    fn run(&self, css: &str) -> Result<String, StageError> {
        Ok(rewrite_flex(css))
    }
}

/// Apply the rewrites to every `flex` declaration in `css`.
pub fn rewrite_flex(css: &str) -> String {
    flex_declaration()
        .replace_all(css, |caps: &Captures| {
            let lead = &caps["lead"];
            match expand_flex(&caps["value"]) {
                Some(longhands) => format!("{}{}", lead, longhands),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Expand a shorthand value into longhand declarations, or `None` when the
/// value is left alone (keywords, variables, anything not starting with a
/// number).
fn expand_flex(value: &str) -> Option<String> {
    let (value, important) = split_important(value.trim());
    let parts = split_space(value);

    let grow = parts.first().copied().filter(|p| is_number(p))?;
    if parts.len() > 3 {
        return None;
    }

    let (shrink, basis) = match (parts.get(1), parts.get(2)) {
        (Some(s), Some(b)) if is_number(s) => (*s, Some(*b)),
        (Some(s), None) if is_number(s) => (*s, None),
        (Some(b), None) => ("1", Some(*b)),
        (None, None) => ("1", None),
        _ => return None,
    };
    let basis = match basis {
        None | Some("0") => "0%",
        Some(b) => b,
    };

    let imp = if important { " !important" } else { "" };
    Some(format!(
        "flex-grow: {grow}{imp}; flex-shrink: {shrink}{imp}; flex-basis: {basis}{imp}"
    ))
}

fn split_important(value: &str) -> (&str, bool) {
    let lower = value.to_ascii_lowercase();
    if let Some(idx) = lower.rfind('!') {
        if lower[idx + 1..].trim() == "important" {
            return (value[..idx].trim_end(), true);
        }
    }
    (value, false)
}

/// Split on whitespace outside parentheses, so `calc(1px + 2%)` stays whole.
fn split_space(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = None;

    for (i, c) in value.char_indices() {
        match c {
            '(' => {
                depth += 1;
                start.get_or_insert(i);
            }
            ')' => {
                depth = depth.saturating_sub(1);
            }
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    parts.push(&value[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = start {
        parts.push(&value[s..]);
    }
    parts
}

fn is_number(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit() || c == '.') && token.parse::<f64>().is_ok()
}
