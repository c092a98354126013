use std::fmt::Display;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

use crate::context::RequestContext;
use crate::Variables;

/// Weekday names indexed from Sunday.
const WEEKDAYS: [&str; 7] = [
    "Dimanche", "Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi",
];

/// Environment variable read into `_env_`.
pub const ENV_VAR: &str = "JST_ENV";

/// Every name produced by [`constants`].
pub const RESERVED: [&str; 23] = [
    "_thisURL_", "_thisFile_", "_thisDir_", "_thisExt_", "_thisBase_", "_host_", "_protocol_",
    "_method_", "_query_", "_ip_", "_date_", "_time_", "_datetime_", "_timestamp_", "_year_",
    "_month_", "_day_", "_hours_", "_minutes_", "_seconds_", "_weekday_", "_jstVersion_", "_env_",
];

/// Build the reserved constants for a request using the local clock.
pub fn constants(ctx: &RequestContext) -> Variables {
    constants_at(ctx, &Local::now())
}

/// Build the reserved constants for a request at a given instant.
pub fn constants_at<Tz>(ctx: &RequestContext, now: &DateTime<Tz>) -> Variables
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let file = ctx.file.as_deref().unwrap_or("");
    let (base, ext) = split_extension(file);
    let env = std::env::var(ENV_VAR).unwrap_or_else(|_| "development".to_string());

    let pairs: [(&str, String); 23] = [
        ("_thisURL_", or_empty(&ctx.url)),
        ("_thisFile_", file.to_string()),
        ("_thisDir_", or_empty(&ctx.dir)),
        ("_thisExt_", ext.to_string()),
        ("_thisBase_", base.to_string()),
        ("_host_", or_empty(&ctx.host)),
        ("_protocol_", ctx.protocol.clone().unwrap_or_else(|| "http".into())),
        ("_method_", ctx.method.clone().unwrap_or_else(|| "GET".into())),
        ("_query_", or_empty(&ctx.query)),
        ("_ip_", or_empty(&ctx.ip)),
        ("_date_", now.format("%Y-%m-%d").to_string()),
        ("_time_", now.format("%H:%M:%S").to_string()),
        (
            "_datetime_",
            now.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        ),
        ("_timestamp_", now.timestamp_millis().to_string()),
        ("_year_", now.year().to_string()),
        ("_month_", format!("{:02}", now.month())),
        ("_day_", format!("{:02}", now.day())),
        ("_hours_", format!("{:02}", now.hour())),
        ("_minutes_", format!("{:02}", now.minute())),
        ("_seconds_", format!("{:02}", now.second())),
        (
            "_weekday_",
            WEEKDAYS[now.weekday().num_days_from_sunday() as usize].to_string(),
        ),
        ("_jstVersion_", env!("CARGO_PKG_VERSION").to_string()),
        ("_env_", env),
    ];

    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn or_empty(field: &Option<String>) -> String {
    field.clone().unwrap_or_default()
}

/// Split `name` into (stem, extension-with-dot). A name whose only dot is the
/// leading one (`.htaccess`) has no extension.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(i) => (&name[..i], &name[i..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use pretty_assertions::assert_eq;

    fn sample_ctx() -> RequestContext {
        RequestContext::new()
            .with_url("/blog/post.html")
            .with_file("post.html")
            .with_dir("/srv/site/blog")
            .with_host("example.org")
            .with_protocol("https")
            .with_method("POST")
            .with_query("a=1&b=2")
            .with_ip("10.0.0.7")
    }

    #[test]
    fn request_fields() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 3).unwrap();
        let c = constants_at(&sample_ctx(), &now);
        assert_eq!(c["_thisURL_"], "/blog/post.html");
        assert_eq!(c["_thisFile_"], "post.html");
        assert_eq!(c["_thisDir_"], "/srv/site/blog");
        assert_eq!(c["_thisExt_"], ".html");
        assert_eq!(c["_thisBase_"], "post");
        assert_eq!(c["_host_"], "example.org");
        assert_eq!(c["_protocol_"], "https");
        assert_eq!(c["_method_"], "POST");
        assert_eq!(c["_query_"], "a=1&b=2");
        assert_eq!(c["_ip_"], "10.0.0.7");
    }

    #[test]
    fn time_fields() {
        // 2025-03-09 was a Sunday
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 3).unwrap();
        let c = constants_at(&RequestContext::default(), &now);
        assert_eq!(c["_date_"], "2025-03-09");
        assert_eq!(c["_time_"], "07:05:03");
        assert_eq!(c["_datetime_"], "2025-03-09T07:05:03.000Z");
        assert_eq!(c["_timestamp_"], now.timestamp_millis().to_string());
        assert_eq!(c["_year_"], "2025");
        assert_eq!(c["_month_"], "03");
        assert_eq!(c["_day_"], "09");
        assert_eq!(c["_hours_"], "07");
        assert_eq!(c["_minutes_"], "05");
        assert_eq!(c["_seconds_"], "03");
        assert_eq!(c["_weekday_"], "Dimanche");
    }

    #[test]
    fn local_fields_follow_offset_but_datetime_is_utc() {
        let paris = FixedOffset::east_opt(3600).unwrap();
        let now = paris.with_ymd_and_hms(2025, 1, 1, 0, 30, 0).unwrap();
        let c = constants_at(&RequestContext::default(), &now);
        assert_eq!(c["_date_"], "2025-01-01");
        assert_eq!(c["_hours_"], "00");
        assert_eq!(c["_weekday_"], "Mercredi");
        assert_eq!(c["_datetime_"], "2024-12-31T23:30:00.000Z");
    }

    #[test]
    fn defaults_for_empty_context() {
        let c = constants(&RequestContext::default());
        assert_eq!(c["_thisURL_"], "");
        assert_eq!(c["_thisExt_"], "");
        assert_eq!(c["_protocol_"], "http");
        assert_eq!(c["_method_"], "GET");
        assert_eq!(c["_jstVersion_"], env!("CARGO_PKG_VERSION"));
        assert_eq!(c.len(), RESERVED.len());
        for key in RESERVED {
            assert!(c.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn extension_split() {
        assert_eq!(split_extension("index.html"), ("index", ".html"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension(".htaccess"), (".htaccess", ""));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(""), ("", ""));
    }
}
