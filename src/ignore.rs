use regex::Regex;
use tracing::warn;

/// One `.jstignore` rule.
#[derive(Debug, Clone)]
enum Pattern {
    /// Contains `*`: matches the whole path, `*` spanning any characters.
    Glob(Regex),
    /// Exact path or directory prefix.
    Prefix(String),
}

impl Pattern {
    fn compile(raw: &str) -> Option<Self> {
        if !raw.contains('*') {
            return Some(Pattern::Prefix(raw.to_string()));
        }
        let body = raw.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
        match Regex::new(&format!("^{body}$")) {
            Ok(re) => Some(Pattern::Glob(re)),
            Err(e) => {
                warn!(pattern = raw, error = %e, "skipping ignore pattern");
                None
            }
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Pattern::Glob(re) => re.is_match(path),
            Pattern::Prefix(p) => {
                if path == p {
                    return true;
                }
                let dir = p.strip_suffix('/').unwrap_or(p);
                path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

/// Paths served as raw bytes instead of being preprocessed.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    raw: Vec<String>,
    patterns: Vec<Pattern>,
}

impl IgnoreList {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let patterns = raw.iter().filter_map(|p| Pattern::compile(p)).collect();
        Self { raw, patterns }
    }

    /// Parse `.jstignore` text: one pattern per line, blank lines and `#`
    /// comments skipped.
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        )
    }

    pub fn is_ignored(&self, url_path: &str) -> bool {
        let path = url_path.strip_prefix('/').unwrap_or(url_path);
        self.patterns.iter().any(|p| p.matches(path))
    }

    /// The patterns as written.
    pub fn patterns(&self) -> &[String] {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Check `url_path` against `patterns` without keeping the compiled list.
pub fn is_ignored<S: AsRef<str>>(url_path: &str, patterns: &[S]) -> bool {
    IgnoreList::new(patterns.iter().map(|p| p.as_ref().to_string())).is_ignored(url_path)
}
