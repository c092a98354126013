use jst::functions::macros::parse_macros;
use jst::{Preprocessor, Registry, RequestContext, Variables};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn render(reg: Registry, text: &str, vars: &[(&str, &str)]) -> String {
    let dir = tempdir().unwrap();
    let vars: Variables = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let ctx = RequestContext::new().with_host("example.org").with_protocol("https");
    Preprocessor::new(reg).process(text, &vars, dir.path(), Some(&ctx))
}

#[test]
fn test_builtin_link_and_image() {
    let out = render(
        Registry::with_builtins(),
        "{{link(/contact.html, Contact us)}} {{image(/img/logo.png, Site logo, 200)}}",
        &[],
    );
    assert_eq!(
        out,
        r#"<a href="/contact.html">Contact us</a> <img src="/img/logo.png" alt="Site logo" width="200">"#
    );
}

#[test]
fn test_builtin_header_uses_request_constants() {
    let out = render(Registry::with_builtins(), "{{header()}}", &[("SiteName", "Demo")]);
    assert!(out.contains(r#"<a href="https://example.org/"><span>Demo</span></a>"#), "{out}");
}

#[test]
fn test_builtin_footer_defaults_to_current_year() {
    let out = render(Registry::with_builtins(), "{{footer(, Ada)}}|{{_year_}}", &[]);
    let (footer, year) = out.split_once('|').unwrap();
    assert_eq!(footer, format!("<footer>\n  <p>&copy; {year} Ada</p>\n</footer>"));
}

#[test]
fn test_builtin_text_helpers() {
    let out = render(
        Registry::with_builtins(),
        "{{upper(hello)}} {{lower(WORLD)}} {{repeat(*, 3)}} {{truncate(abcdefgh, 3)}}",
        &[],
    );
    assert_eq!(out, "HELLO world *** abc…");
}

#[test]
fn test_builtin_quoted_argument_keeps_commas() {
    let out = render(Registry::with_builtins(), r#"{{meta(description, "fast, small, fun")}}"#, &[]);
    assert_eq!(out, r#"<meta name="description" content="fast, small, fun">"#);
}

#[test]
fn test_macro_functions_from_json() {
    let mut reg = Registry::with_builtins();
    reg.layer(
        &parse_macros(r#"{ "badge": "<span class=\"badge\">$1</span>", "upper": "shadowed $1" }"#)
            .unwrap(),
    );
    let out = render(reg, "{{badge({{status}})}} {{upper(x)}}", &[("status", "new")]);
    assert_eq!(out, r#"<span class="badge">new</span> shadowed x"#);
}

#[test]
fn test_macro_body_placeholders_resolve_after_expansion() {
    let reg = parse_macros(r#"{ "sig": "-- $1 ({{SiteName}})" }"#).unwrap();
    let out = render(reg, "{{sig(Ada)}}", &[("SiteName", "Demo")]);
    assert_eq!(out, "-- Ada (Demo)");
}

#[test]
fn test_macro_arity_is_enforced() {
    let reg = parse_macros(r#"{ "pair": { "body": "$1=$2", "min_args": 2, "max_args": 2 } }"#).unwrap();
    let out = render(reg, "{{pair(a)}} {{pair(a, b)}}", &[]);
    assert_eq!(out, "<!-- [JST] error in pair(): expected 2 argument(s), got 1 --> a=b");
}

#[test]
fn test_french_function_names() {
    let out = render(
        Registry::with_builtins(),
        "{{lien(/a.html, Accueil)}} {{repeter(ab, 2)}} {{tronquer(abcdef, 2)}} {{dateFormatee()}} {{footer(2024)}}",
        &[("_date_", "2025-10-14"), ("SiteAuteur", "Zoé")],
    );
    assert_eq!(
        out,
        "<a href=\"/a.html\">Accueil</a> abab ab… mardi 14 octobre 2025 <footer>\n  <p>&copy; 2024 Zoé</p>\n</footer>"
    );
}

#[test]
fn test_surplus_arguments_are_ignored() {
    let out = render(Registry::with_builtins(), "{{link(/x, Hello, world)}} {{upper(a, b)}}", &[]);
    assert_eq!(out, r#"<a href="/x">Hello</a> A"#);
}

#[test]
fn test_huge_repeat_count_is_an_error() {
    let out = render(Registry::with_builtins(), "{{repeat(abcdefghij, 100000000000)}}", &[]);
    assert!(out.starts_with("<!-- [JST] error in repeat(): count too large"), "{out}");
}
