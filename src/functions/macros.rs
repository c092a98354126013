//! Text-macro functions declared in `functions.json`.
//!
//! ```json
//! {
//!   "badge": "<span class=\"badge\">$1</span>",
//!   "card":  { "body": "<div class=\"card\"><h3>$1</h3>$2</div>", "min_args": 1, "max_args": 2 }
//! }
//! ```
//!
//! `$1`..`$N` insert positional arguments (missing ones are empty), `$*`
//! inserts every argument joined by `", "` and `$$` is a literal `$`.
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use itertools::Itertools;
use serde::Deserialize;
use tracing::warn;

use super::{is_identifier, Function, Registry};
use crate::context::RequestContext;
use crate::errors::{JstError, Result};
use crate::Variables;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MacroSpec {
    Body(String),
    Full {
        body: String,
        #[serde(default)]
        min_args: usize,
        #[serde(default)]
        max_args: Option<usize>,
    },
}

#[derive(Debug, Clone)]
pub struct MacroFunction {
    name: String,
    body: String,
    arity: RangeInclusive<usize>,
}

impl MacroFunction {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self { name: name.into(), body: body.into(), arity: 0..=usize::MAX }
    }

    pub fn with_arity(mut self, arity: RangeInclusive<usize>) -> Self {
        self.arity = arity;
        self
    }

    /// Substitute `$N`, `$*` and `$$` in the body.
    pub fn expand(&self, args: &[String]) -> String {
        let mut out = String::with_capacity(self.body.len());
        let mut rest = self.body.as_str();
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits > 0 {
                let n: usize = rest[..digits].parse().unwrap_or(0);
                if let Some(a) = n.checked_sub(1).and_then(|i| args.get(i)) {
                    out.push_str(a);
                }
                rest = &rest[digits..];
            } else if let Some(r) = rest.strip_prefix('*') {
                out.push_str(&args.iter().join(", "));
                rest = r;
            } else if let Some(r) = rest.strip_prefix('$') {
                out.push('$');
                rest = r;
            } else {
                out.push('$');
            }
        }
        out.push_str(rest);
        out
    }
}

impl Function for MacroFunction {
    fn name(&self) -> &str { &self.name }
    fn arity(&self) -> RangeInclusive<usize> { self.arity.clone() }
    fn call(&self, args: &[String], _: &RequestContext, _: &Variables) -> Result<Option<String>> {
        Ok(Some(self.expand(args)))
    }
}

/// Parse a `functions.json` document into a registry. Entries with names that
/// are not identifiers are skipped with a warning.
pub fn parse_macros(json: &str) -> Result<Registry> {
    let specs: BTreeMap<String, MacroSpec> = serde_json::from_str(json)?;
    let mut reg = Registry::new();
    for (name, spec) in specs {
        if !is_identifier(&name) {
            warn!(name = %name, "skipping function with invalid name");
            continue;
        }
        let f = match spec {
            MacroSpec::Body(body) => MacroFunction::new(name, body),
            MacroSpec::Full { body, min_args, max_args } => {
                let max = max_args.unwrap_or(usize::MAX);
                if max < min_args {
                    return Err(JstError::Config(format!(
                        "function {name}: max_args {max} is below min_args {min_args}"
                    )));
                }
                MacroFunction::new(name, body).with_arity(min_args..=max)
            }
        };
        reg.insert(Arc::new(f))?;
    }
    Ok(reg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn positional_expansion() {
        let m = MacroFunction::new("card", "<h3>$1</h3><p>$2</p><i>$3</i>");
        assert_eq!(m.expand(&strings(&["Title", "Body"])), "<h3>Title</h3><p>Body</p><i></i>");
    }

    #[test]
    fn star_dollar_and_stray_dollar() {
        let m = MacroFunction::new("m", "[$*] costs $$5 or $x, $0");
        assert_eq!(m.expand(&strings(&["a", "b"])), "[a, b] costs $5 or $x, ");
        let m = MacroFunction::new("m", "end$");
        assert_eq!(m.expand(&[]), "end$");
    }

    #[test]
    fn multi_digit_index() {
        let args: Vec<String> = (1..=12).map(|i| i.to_string()).collect();
        let m = MacroFunction::new("m", "$12-$1");
        assert_eq!(m.expand(&args), "12-1");
    }

    #[test]
    fn parse_both_forms() {
        let reg = parse_macros(
            r#"{
                "badge": "<b>$1</b>",
                "pair": { "body": "$1=$2", "min_args": 2, "max_args": 2 },
                "bad-name": "ignored"
            }"#,
        )
        .unwrap();
        assert_eq!(reg.len(), 2);
        assert!(!reg.contains("bad-name"));
        assert_eq!(reg.get("pair").unwrap().arity(), 2..=2);
        assert_eq!(reg.get("badge").unwrap().arity(), 0..=usize::MAX);
    }

    #[test]
    fn parse_rejects_bad_documents() {
        assert!(matches!(parse_macros("[1, 2]"), Err(JstError::Json(_))));
        assert!(matches!(parse_macros(r#"{"f": 3}"#), Err(JstError::Json(_))));
        assert!(matches!(
            parse_macros(r#"{"f": {"body": "", "min_args": 3, "max_args": 1}}"#),
            Err(JstError::Config(_))
        ));
    }
}
