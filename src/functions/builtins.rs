//! HTML helpers available to every site.
use std::ops::RangeInclusive;

use chrono::{Datelike, Local, NaiveDate};

use super::Function;
use crate::context::RequestContext;
use crate::errors::{JstError, Result};
use crate::Variables;

/// Argument `i`, or `""` when absent.
fn arg(args: &[String], i: usize) -> &str {
    args.get(i).map(String::as_str).unwrap_or("")
}

/// Argument `i` when present and non-empty.
fn non_empty(args: &[String], i: usize) -> Option<&str> {
    args.get(i).map(String::as_str).filter(|s| !s.is_empty())
}

fn var<'v>(vars: &'v Variables, key: &str) -> &'v str {
    vars.get(key).map(String::as_str).unwrap_or("")
}

/// Leading integer of `s`, ignoring trailing garbage (`"20px"` is 20).
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let digits_from = usize::from(s.starts_with(['-', '+']));
    let end = s[digits_from..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |i| i + digits_from);
    s[..end].parse().ok()
}

/// `link(href, text?)` -> `<a href="href">text</a>`
pub struct Link;
impl Function for Link {
    fn name(&self) -> &str { "link" }
    fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, _: &Variables) -> Result<Option<String>> {
        let href = arg(args, 0);
        let text = non_empty(args, 1).unwrap_or(href);
        Ok(Some(format!(r#"<a href="{href}">{text}</a>"#)))
    }
}

/// `image(src, alt?, width?)`
pub struct Image;
impl Function for Image {
    fn name(&self) -> &str { "image" }
    fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, _: &Variables) -> Result<Option<String>> {
        let width = non_empty(args, 2)
            .map(|w| format!(r#" width="{w}""#))
            .unwrap_or_default();
        Ok(Some(format!(
            r#"<img src="{}" alt="{}"{width}>"#,
            arg(args, 0),
            arg(args, 1)
        )))
    }
}

/// `header(title?, logo?)`; the title falls back to the `SiteName` variable.
pub struct Header;
impl Function for Header {
    fn name(&self) -> &str { "header" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, vars: &Variables) -> Result<Option<String>> {
        let title = non_empty(args, 0).unwrap_or_else(|| var(vars, "SiteName"));
        let logo = non_empty(args, 1)
            .map(|src| format!(r#"<img src="{src}" alt="{title}" height="40">"#))
            .unwrap_or_default();
        Ok(Some(format!(
            "<header>\n  <div class=\"header-inner\">\n    <a href=\"{}://{}/\">{logo}<span>{title}</span></a>\n  </div>\n</header>",
            var(vars, "_protocol_"),
            var(vars, "_host_"),
        )))
    }
}

/// `footer(year?, author?)`; defaults to `_year_` and the `SiteAuteur`
/// variable, then `SiteAuthor`.
pub struct Footer;
impl Function for Footer {
    fn name(&self) -> &str { "footer" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, vars: &Variables) -> Result<Option<String>> {
        let year = non_empty(args, 0).unwrap_or_else(|| var(vars, "_year_"));
        let author = non_empty(args, 1)
            .or_else(|| vars.get("SiteAuteur").map(String::as_str).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| var(vars, "SiteAuthor"));
        Ok(Some(format!("<footer>\n  <p>&copy; {year} {author}</p>\n</footer>")))
    }
}

/// Largest output `repeat` will build.
pub const MAX_REPEAT_BYTES: usize = 1 << 20;

/// `repeat(text, times?)`
pub struct Repeat;
impl Function for Repeat {
    fn name(&self) -> &str { "repeat" }
    fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, _: &Variables) -> Result<Option<String>> {
        let times = match leading_int(arg(args, 1)) {
            Some(n) if n < 0 => return Err(JstError::function(format!("invalid count: {n}"))),
            Some(n) if n > 0 => n as usize,
            _ => 1,
        };
        let text = arg(args, 0);
        match text.len().checked_mul(times) {
            Some(len) if len <= MAX_REPEAT_BYTES => Ok(Some(text.repeat(times))),
            _ => Err(JstError::function(format!(
                "count too large: {times} (output limited to {MAX_REPEAT_BYTES} bytes)"
            ))),
        }
    }
}

const FR_DAYS: [&str; 7] = ["dimanche", "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi"];
const FR_MONTHS: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin",
    "juillet", "août", "septembre", "octobre", "novembre", "décembre",
];
const EN_DAYS: [&str; 7] = ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"];
const EN_MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// `date_long(locale?)`: the request date spelled out. `en*` locales use
/// English, anything else French.
pub struct DateLong;
impl Function for DateLong {
    fn name(&self) -> &str { "date_long" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, vars: &Variables) -> Result<Option<String>> {
        // `_date_` pins the date to the one the constants were built with
        let date = vars
            .get("_date_")
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or_else(|| Local::now().date_naive());
        let wd = date.weekday().num_days_from_sunday() as usize;
        let m = date.month0() as usize;
        let locale = non_empty(args, 0).unwrap_or("fr-FR");
        let out = if locale.to_ascii_lowercase().starts_with("en") {
            format!("{}, {} {}, {}", EN_DAYS[wd], EN_MONTHS[m], date.day(), date.year())
        } else {
            format!("{} {} {} {}", FR_DAYS[wd], date.day(), FR_MONTHS[m], date.year())
        };
        Ok(Some(out))
    }
}

/// `upper(text?)`
pub struct Upper;
impl Function for Upper {
    fn name(&self) -> &str { "upper" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, _: &Variables) -> Result<Option<String>> {
        Ok(Some(arg(args, 0).to_uppercase()))
    }
}

/// `lower(text?)`
pub struct Lower;
impl Function for Lower {
    fn name(&self) -> &str { "lower" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, _: &Variables) -> Result<Option<String>> {
        Ok(Some(arg(args, 0).to_lowercase()))
    }
}

/// `truncate(text, max?)`: at most `max` characters (default 100) plus `…`.
pub struct Truncate;
impl Function for Truncate {
    fn name(&self) -> &str { "truncate" }
    fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, _: &Variables) -> Result<Option<String>> {
        let text = arg(args, 0);
        let max = match leading_int(arg(args, 1)) {
            Some(n) if n > 0 => n as usize,
            _ => 100,
        };
        if text.chars().count() <= max {
            return Ok(Some(text.to_string()));
        }
        let mut out: String = text.chars().take(max).collect();
        out.push('…');
        Ok(Some(out))
    }
}

/// `meta(name, content)`
pub struct Meta;
impl Function for Meta {
    fn name(&self) -> &str { "meta" }
    fn arity(&self) -> RangeInclusive<usize> { 2..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, _: &Variables) -> Result<Option<String>> {
        Ok(Some(format!(
            r#"<meta name="{}" content="{}">"#,
            arg(args, 0),
            arg(args, 1)
        )))
    }
}

/// `script(src, defer?)`; deferred unless the second argument is `false`.
pub struct Script;
impl Function for Script {
    fn name(&self) -> &str { "script" }
    fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, _: &Variables) -> Result<Option<String>> {
        let defer = if arg(args, 1) == "false" { "" } else { " defer" };
        Ok(Some(format!(r#"<script src="{}"{defer}></script>"#, arg(args, 0))))
    }
}

/// `style(href)`
pub struct Style;
impl Function for Style {
    fn name(&self) -> &str { "style" }
    fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
    fn call(&self, args: &[String], _: &RequestContext, _: &Variables) -> Result<Option<String>> {
        Ok(Some(format!(r#"<link rel="stylesheet" href="{}">"#, arg(args, 0))))
    }
}
