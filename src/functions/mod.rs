use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::errors::{JstError, Result};
use crate::Variables;

pub mod builtins;
pub mod macros;

/// A template function callable as `{{name(args)}}`.
///
/// `call` receives the parsed arguments, the request context and the merged
/// variable mapping. Returning `Ok(None)` renders as the empty string.
pub trait Function: Send + Sync {
    fn name(&self) -> &str;
    fn arity(&self) -> RangeInclusive<usize>;
    fn call(
        &self,
        args: &[String],
        ctx: &RequestContext,
        vars: &Variables,
    ) -> Result<Option<String>>;
}

/// Adapter turning a closure into a [`Function`] accepting any argument count.
pub struct FnFunction<F> {
    name: String,
    f: F,
}

impl<F> Function for FnFunction<F>
where
    F: Fn(&[String], &RequestContext, &Variables) -> Result<Option<String>> + Send + Sync,
{
    fn name(&self) -> &str { &self.name }
    fn arity(&self) -> RangeInclusive<usize> { 0..=usize::MAX }
    fn call(
        &self,
        args: &[String],
        ctx: &RequestContext,
        vars: &Variables,
    ) -> Result<Option<String>> {
        (self.f)(args, ctx, vars)
    }
}

/// Another name for an existing function.
pub struct Alias {
    name: &'static str,
    target: Arc<dyn Function>,
}

impl Alias {
    pub fn new(name: &'static str, target: Arc<dyn Function>) -> Self {
        Self { name, target }
    }
}

impl Function for Alias {
    fn name(&self) -> &str { self.name }
    fn arity(&self) -> RangeInclusive<usize> { self.target.arity() }
    fn call(
        &self,
        args: &[String],
        ctx: &RequestContext,
        vars: &Variables,
    ) -> Result<Option<String>> {
        self.target.call(args, ctx, vars)
    }
}

/// French names kept for templates written against them.
const ALIASES: [(&str, &str); 4] = [
    ("lien", "link"),
    ("repeter", "repeat"),
    ("tronquer", "truncate"),
    ("dateFormatee", "date_long"),
];

/// Thread-safe function registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<String, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Registry preloaded with the HTML helpers in [`builtins`] and their
    /// French aliases.
    pub fn with_builtins() -> Self {
        let mut map: HashMap<String, Arc<dyn Function>> = HashMap::new();
        let all: [Arc<dyn Function>; 12] = [
            Arc::new(builtins::Link),
            Arc::new(builtins::Image),
            Arc::new(builtins::Header),
            Arc::new(builtins::Footer),
            Arc::new(builtins::Repeat),
            Arc::new(builtins::DateLong),
            Arc::new(builtins::Upper),
            Arc::new(builtins::Lower),
            Arc::new(builtins::Truncate),
            Arc::new(builtins::Meta),
            Arc::new(builtins::Script),
            Arc::new(builtins::Style),
        ];
        for f in all {
            map.insert(f.name().to_string(), f);
        }
        for (alias, target) in ALIASES {
            if let Some(f) = map.get(target).cloned() {
                map.insert(alias.to_string(), Arc::new(Alias::new(alias, f)));
            }
        }
        Self { inner: Arc::new(map) }
    }

    /// Add `f`, replacing any function with the same name.
    pub fn register<F: Function + 'static>(&mut self, f: F) -> Result<()> {
        self.insert(Arc::new(f))
    }

    /// Register a closure under `name`.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(&[String], &RequestContext, &Variables) -> Result<Option<String>>
            + Send
            + Sync
            + 'static,
    {
        self.register(FnFunction { name: name.into(), f })
    }

    pub fn insert(&mut self, f: Arc<dyn Function>) -> Result<()> {
        if !is_identifier(f.name()) {
            return Err(JstError::InvalidName(f.name().to_string()));
        }
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name().to_string(), f);
        Ok(())
    }

    /// Copy every entry of `other` over this registry.
    pub fn layer(&mut self, other: &Registry) {
        if other.is_empty() {
            return;
        }
        let mut_map = Arc::make_mut(&mut self.inner);
        for (name, f) in other.inner.iter() {
            mut_map.insert(name.clone(), Arc::clone(f));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.inner.len() }

    pub fn is_empty(&self) -> bool { self.inner.is_empty() }
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
