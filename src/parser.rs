// src/parser.rs

/// Split the text between a function's parentheses into arguments.
///
/// Commas separate arguments only outside quotes and at parenthesis depth 0.
/// Each argument is trimmed and loses one matching pair of surrounding quotes.
/// Malformed input (unbalanced quotes or parens) still yields a best-effort
/// split; this never fails.
pub fn parse_args(input: &str) -> Vec<String> {
    ArgParser::new(input).parse()
}

struct ArgParser<'a> {
    s: &'a str,
    i: usize,
    quote: Option<char>,
    depth: i32,
}

impl<'a> ArgParser<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, i: 0, quote: None, depth: 0 }
    }

    fn parse(&mut self) -> Vec<String> {
        let mut args = Vec::new();
        let mut start = 0;
        while let Some(c) = self.peek_char() {
            match (self.quote, c) {
                (Some(q), c) if c == q => self.quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => self.quote = Some(c),
                (None, '(') => self.depth += 1,
                (None, ')') => self.depth -= 1,
                (None, ',') if self.depth == 0 => {
                    args.push(clean(&self.s[start..self.i]));
                    start = self.i + 1;
                }
                _ => {}
            }
            self.i += c.len_utf8();
        }
        let rest = self.s[start..].trim();
        if !rest.is_empty() {
            args.push(clean(rest));
        }
        args
    }

    fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }
}

fn clean(raw: &str) -> String {
    strip_quotes(raw.trim()).to_string()
}

fn strip_quotes(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quoted_commas_do_not_split() {
        assert_eq!(parse_args(r#"a, "b, c", d"#), vec!["a", "b, c", "d"]);
        assert_eq!(parse_args("'x, y',z"), vec!["x, y", "z"]);
    }

    #[test]
    fn parens_protect_inner_commas() {
        assert_eq!(parse_args("f(x), y"), vec!["f(x)", "y"]);
        assert_eq!(parse_args("f(x,y), z"), vec!["f(x,y)", "z"]);
        assert_eq!(parse_args("g(h(1, 2), 3), 4"), vec!["g(h(1, 2), 3)", "4"]);
    }

    #[test]
    fn trims_and_strips_one_matching_pair() {
        assert_eq!(parse_args(r#"  " padded "  "#), vec![" padded "]);
        assert_eq!(parse_args(r#""'inner'""#), vec!["'inner'"]);
        // mismatched quotes are kept as-is
        assert_eq!(parse_args(r#""half'"#), vec![r#""half'"#]);
    }

    #[test]
    fn empty_inputs() {
        assert!(parse_args("").is_empty());
        assert!(parse_args("   ").is_empty());
        assert_eq!(parse_args("a,"), vec!["a"]);
        assert_eq!(parse_args("a, ,b"), vec!["a", "", "b"]);
        assert_eq!(parse_args(",a"), vec!["", "a"]);
    }

    #[test]
    fn malformed_input_still_splits() {
        // an unterminated quote swallows the rest
        assert_eq!(parse_args(r#"a, "b, c"#), vec!["a", r#""b, c"#]);
        // a stray close paren makes depth negative; commas stop splitting
        assert_eq!(parse_args("a), b, c"), vec!["a), b, c"]);
        assert_eq!(parse_args("(a, b"), vec!["(a, b"]);
    }

    #[test]
    fn non_ascii_arguments() {
        assert_eq!(parse_args("⭐, 5"), vec!["⭐", "5"]);
        assert_eq!(parse_args("« été », ok"), vec!["« été »", "ok"]);
    }
}
