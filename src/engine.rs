use std::any::Any;
use std::borrow::Cow;
use std::fs;
use std::io::ErrorKind;
use std::ops::RangeInclusive;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::constants::constants;
use crate::context::RequestContext;
use crate::functions::{is_identifier, Function, Registry};
use crate::parser::parse_args;
use crate::Variables;

/// Upper bound on variable substitution passes.
pub const MAX_PASSES: usize = 10;

static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{include:\s*(.+?)\}\}").expect("include pattern"));

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}()]+)\}\}").expect("variable pattern"));

// Placeholders inside a function's argument string
static INLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("inline pattern"));

/// Template preprocessor bound to a function registry.
#[derive(Clone, Default)]
pub struct Preprocessor {
    registry: Registry,
}

impl Preprocessor {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run includes, function calls and variable substitution over `text`.
    ///
    /// `variables` are layered over the reserved constants derived from `ctx`.
    /// Includes resolve against `base_dir`. Failures render as HTML comment
    /// markers in the output; this never fails.
    pub fn process(
        &self,
        text: &str,
        variables: &Variables,
        base_dir: &Path,
        ctx: Option<&RequestContext>,
    ) -> String {
        let default_ctx = RequestContext::default();
        let ctx = ctx.unwrap_or(&default_ctx);

        let mut all = constants(ctx);
        all.extend(variables.iter().map(|(k, v)| (k.clone(), v.clone())));

        let text = expand_includes(text, base_dir);
        let text = expand_functions(&text, &all, ctx, &self.registry);
        substitute_variables(text, &all)
    }
}

/// One-shot form of [`Preprocessor::process`]. Without `functions` every call
/// renders as an unknown-function marker.
pub fn process(
    text: &str,
    variables: &Variables,
    base_dir: impl AsRef<Path>,
    ctx: Option<&RequestContext>,
    functions: Option<&Registry>,
) -> String {
    let registry = functions.cloned().unwrap_or_default();
    Preprocessor::new(registry).process(text, variables, base_dir.as_ref(), ctx)
}

/// Replace each `{{include: path}}` with the file's contents. Single pass:
/// directives inside included text are left alone.
pub fn expand_includes(text: &str, base_dir: &Path) -> String {
    INCLUDE_RE
        .replace_all(text, |caps: &Captures| {
            let name = caps[1].trim();
            let path = base_dir.join(name.trim_start_matches('/'));
            match fs::read(&path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(include = %path.display(), "include not found");
                    format!("<!-- [JST] include not found: {name} -->")
                }
                Err(e) => {
                    warn!(include = %path.display(), error = %e, "include unreadable");
                    format!("<!-- [JST] include unreadable: {name} -->")
                }
            }
        })
        .into_owned()
}

struct CallMatch<'a> {
    name: &'a str,
    args: &'a str,
    len: usize,
}

/// Match `{{name(args)}}` at the start of `s`. `args` may hold `{{key}}`
/// placeholders; any other `}` ends the call and must be the first of `)}}`.
///
/// On failure returns how many bytes of `s` can be copied through without
/// another call starting inside them.
fn match_call(s: &str) -> Result<CallMatch<'_>, usize> {
    let body = s.strip_prefix("{{").ok_or(1usize)?;
    let name_len = body
        .find(|c: char| c != '_' && !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    let name = &body[..name_len];
    if !is_identifier(name) {
        return Err(1);
    }
    let after = body[name_len..].strip_prefix('(').ok_or(1usize)?;
    let start = 2 + name_len + 1;

    // Any call opening inside the scanned region meets the same first bare
    // `}` and fails the same way, so the whole region is skipped.
    let mut i = 0;
    loop {
        let Some(p) = after[i..].find(['{', '}']).map(|p| i + p) else {
            return Err(s.len());
        };
        if after[p..].starts_with('}') {
            if !after[..p].ends_with(')') || !after[p..].starts_with("}}") {
                return Err(start + p);
            }
            return Ok(CallMatch {
                name,
                args: &after[..p - 1],
                len: start + p + 2,
            });
        }
        i = p + placeholder_len(&after[p..]).unwrap_or(1);
    }
}

/// Length of a `{{key}}` placeholder at the start of `s`.
fn placeholder_len(s: &str) -> Option<usize> {
    let inner = s.strip_prefix("{{")?;
    let j = inner.find(['{', '}', '(', ')'])?;
    (j > 0 && inner[j..].starts_with("}}")).then_some(2 + j + 2)
}

/// Replace each `{{name(args)}}` with the function's output. Output is not
/// rescanned for further calls.
pub fn expand_functions(
    text: &str,
    vars: &Variables,
    ctx: &RequestContext,
    functions: &Registry,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("{{") {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match match_call(candidate) {
            Ok(call) => {
                out.push_str(&render_call(&call, vars, ctx, functions));
                rest = &candidate[call.len..];
            }
            Err(skip) => {
                out.push_str(&candidate[..skip]);
                rest = &candidate[skip..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_call(
    call: &CallMatch<'_>,
    vars: &Variables,
    ctx: &RequestContext,
    functions: &Registry,
) -> String {
    let Some(f) = functions.get(call.name) else {
        debug!(function = call.name, "unknown function");
        return format!("<!-- [JST] unknown function: {} -->", call.name);
    };
    let raw = INLINE_RE.replace_all(call.args, |caps: &Captures| {
        vars.get(caps[1].trim())
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    });
    let args = parse_args(&raw);
    match invoke(f.as_ref(), &args, ctx, vars) {
        Ok(out) => out,
        Err(msg) => {
            warn!(function = call.name, error = %msg, "template function failed");
            format!("<!-- [JST] error in {}(): {msg} -->", call.name)
        }
    }
}

fn invoke(
    f: &dyn Function,
    args: &[String],
    ctx: &RequestContext,
    vars: &Variables,
) -> Result<String, String> {
    let arity = f.arity();
    if !arity.contains(&args.len()) {
        return Err(arity_message(&arity, args.len()));
    }
    match panic::catch_unwind(AssertUnwindSafe(|| f.call(args, ctx, vars))) {
        Ok(Ok(out)) => Ok(out.unwrap_or_default()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn arity_message(arity: &RangeInclusive<usize>, got: usize) -> String {
    let (lo, hi) = (*arity.start(), *arity.end());
    let expected = if lo == hi {
        format!("{lo}")
    } else if hi == usize::MAX {
        format!("at least {lo}")
    } else {
        format!("{lo} to {hi}")
    };
    format!("expected {expected} argument(s), got {got}")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Replace `{{name}}` placeholders, repeating until the text stops changing
/// or [`MAX_PASSES`] passes have run. Unknown names stay literal.
pub fn substitute_variables(text: String, vars: &Variables) -> String {
    let mut current = text;
    for pass in 0..MAX_PASSES {
        let next = match VARIABLE_RE.replace_all(&current, |caps: &Captures| {
            vars.get(caps[1].trim())
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        }) {
            Cow::Borrowed(_) => break,
            Cow::Owned(next) => next,
        };
        if next == current {
            break;
        }
        debug!(pass, "variable pass rewrote text");
        current = next;
    }
    current
}
