//! actix-web front end: maps URL paths onto the public directory and runs
//! text files through the preprocessor.
use std::fs;
use std::path::{Path, PathBuf};

use actix_web::http::header::CONTENT_TYPE;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{debug, error};

use crate::config::{ConfigLoader, SiteConfig};
use crate::constants::split_extension;
use crate::context::RequestContext;
use crate::engine::Preprocessor;
use crate::functions::Registry;

/// Extension to content type.
const MIME: [(&str, &str); 17] = [
    (".html", "text/html; charset=utf-8"),
    (".css", "text/css; charset=utf-8"),
    (".js", "text/javascript; charset=utf-8"),
    (".json", "application/json; charset=utf-8"),
    (".txt", "text/plain; charset=utf-8"),
    (".xml", "text/xml; charset=utf-8"),
    (".svg", "image/svg+xml"),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".ico", "image/x-icon"),
    (".webp", "image/webp"),
    (".woff", "font/woff"),
    (".woff2", "font/woff2"),
    (".ttf", "font/ttf"),
    (".pdf", "application/pdf"),
];

/// Extensions that go through the preprocessor.
const TEXT_TYPES: [&str; 7] = [".html", ".css", ".js", ".json", ".txt", ".xml", ".svg"];

const HTML: &str = "text/html; charset=utf-8";
const PLAIN: &str = "text/plain; charset=utf-8";

pub fn content_type(ext: &str) -> &'static str {
    MIME.iter()
        .find(|(e, _)| e.eq_ignore_ascii_case(ext))
        .map(|(_, ct)| *ct)
        .unwrap_or("application/octet-stream")
}

pub fn is_text_type(ext: &str) -> bool {
    TEXT_TYPES.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

#[derive(Debug, Clone)]
pub struct SiteOptions {
    /// Directory holding `variables.json`, `.jstignore` and `functions.json`.
    pub root: PathBuf,
    /// Directory served to clients; the root when unset.
    pub public: Option<PathBuf>,
    /// Page rendered for missing files, relative to `public`.
    pub page_404: String,
}

impl SiteOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), public: None, page_404: "404.html".to_string() }
    }
}

/// The request facts the site needs, detached from actix types.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub path: String,
    pub method: String,
    pub host: String,
    pub protocol: String,
    pub query: String,
    pub ip: Option<String>,
}

impl RequestInfo {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: "GET".to_string(),
            protocol: "http".to_string(),
            ..Self::default()
        }
    }

    fn from_request(req: &HttpRequest) -> Self {
        let conn = req.connection_info();
        Self {
            path: format!("/{}", req.match_info().query("tail")),
            method: req.method().as_str().to_string(),
            host: strip_port(conn.host()).to_string(),
            protocol: conn.scheme().to_string(),
            query: req.query_string().to_string(),
            ip: req.peer_addr().map(|a| a.ip().to_string()),
        }
    }

    fn context(&self, file: &str, dir: &Path) -> RequestContext {
        RequestContext {
            url: Some(self.path.clone()),
            file: Some(file.to_string()),
            dir: Some(dir.display().to_string()),
            host: Some(self.host.clone()),
            protocol: Some(self.protocol.clone()),
            method: Some(self.method.clone()),
            query: Some(self.query.clone()),
            ip: self.ip.clone(),
        }
    }
}

/// `example.org:8080` -> `example.org`, `[::1]:3000` -> `[::1]`
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |i| &host[..=i]);
    }
    host.split(':').next().unwrap_or(host)
}

/// A finished response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn new(status: StatusCode, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self { status, content_type, body: body.into() }
    }

    fn into_response(self) -> HttpResponse {
        HttpResponse::build(self.status)
            .insert_header((CONTENT_TYPE, self.content_type))
            .body(self.body)
    }
}

#[derive(Clone)]
pub struct Site {
    root: PathBuf,
    public: PathBuf,
    page_404: String,
    functions: Registry,
}

impl Site {
    pub fn new(options: SiteOptions) -> Self {
        let public = options.public.unwrap_or_else(|| options.root.clone());
        Self {
            root: options.root,
            public,
            page_404: options.page_404,
            functions: Registry::with_builtins(),
        }
    }

    /// Layer extra functions over the built-ins. `functions.json` entries
    /// still take precedence over these.
    pub fn with_functions(mut self, functions: &Registry) -> Self {
        self.functions.layer(functions);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public(&self) -> &Path {
        &self.public
    }

    pub fn loader(&self) -> ConfigLoader {
        ConfigLoader::new(&self.root)
    }

    /// Resolve and render one request. Blocks on disk I/O.
    pub fn render(&self, info: &RequestInfo) -> Reply {
        let mut url_path = info.path.clone();
        if url_path.ends_with('/') {
            url_path.push_str("index.html");
        }
        let Some(file) = resolve(&self.public, &url_path) else {
            debug!(path = %info.path, "rejected path outside public dir");
            return Reply::new(StatusCode::FORBIDDEN, PLAIN, "Forbidden");
        };
        if !file.is_file() {
            return self.not_found(info);
        }

        let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let (_, ext) = split_extension(&name);
        let content_type = content_type(ext);

        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) => return server_error(&file, &e),
        };
        if !is_text_type(ext) {
            return Reply::new(StatusCode::OK, content_type, bytes);
        }
        let config = self.loader().load();
        if config.ignore.is_ignored(&url_path) {
            debug!(path = %url_path, "serving raw");
            return Reply::new(StatusCode::OK, content_type, bytes);
        }

        let dir = file.parent().unwrap_or(&self.public);
        let body = self.preprocess(&config, &bytes, dir, &info.context(&name, dir));
        Reply::new(StatusCode::OK, content_type, body)
    }

    fn not_found(&self, info: &RequestInfo) -> Reply {
        let page = self.public.join(&self.page_404);
        if !page.is_file() {
            return Reply::new(StatusCode::NOT_FOUND, PLAIN, "Not Found");
        }
        match fs::read(&page) {
            Ok(bytes) => {
                let ctx = info.context(&self.page_404, &self.public);
                let body = self.preprocess(&self.loader().load(), &bytes, &self.public, &ctx);
                Reply::new(StatusCode::NOT_FOUND, HTML, body)
            }
            Err(e) => server_error(&page, &e),
        }
    }

    /// `config.functions` layer over the site's own table.
    fn preprocess(&self, config: &SiteConfig, bytes: &[u8], dir: &Path, ctx: &RequestContext) -> String {
        let mut functions = self.functions.clone();
        functions.layer(&config.functions);
        let text = String::from_utf8_lossy(bytes);
        Preprocessor::new(functions).process(&text, &config.variables, dir, Some(ctx))
    }
}

fn server_error(path: &Path, e: &std::io::Error) -> Reply {
    error!(path = %path.display(), error = %e, "failed to serve file");
    Reply::new(StatusCode::INTERNAL_SERVER_ERROR, PLAIN, format!("[JST] Error: {e}"))
}

/// Join a URL path onto `public`, refusing any `..` segment.
fn resolve(public: &Path, url_path: &str) -> Option<PathBuf> {
    let mut out = public.to_path_buf();
    for segment in url_path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\0') => return None,
            s => out.push(s),
        }
    }
    Some(out)
}

async fn serve(req: HttpRequest, site: web::Data<Site>) -> HttpResponse {
    let info = RequestInfo::from_request(&req);
    let site = site.into_inner();
    match web::block(move || site.render(&info)).await {
        Ok(reply) => reply.into_response(),
        Err(e) => {
            error!(error = %e, "render task failed");
            HttpResponse::InternalServerError()
                .content_type(PLAIN)
                .body(format!("[JST] Error: {e}"))
        }
    }
}

/// Mount the site on an actix `App`: `App::new().configure(configure(site))`.
pub fn configure(site: Site) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(site))
            .route("/{tail:.*}", web::to(serve));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mime_lookup() {
        assert_eq!(content_type(".html"), "text/html; charset=utf-8");
        assert_eq!(content_type(".PNG"), "image/png");
        assert_eq!(content_type(".tar"), "application/octet-stream");
        assert_eq!(content_type(""), "application/octet-stream");
        assert!(is_text_type(".svg"));
        assert!(!is_text_type(".png"));
    }

    #[test]
    fn resolve_rejects_parent_segments() {
        let public = Path::new("/srv/site");
        assert_eq!(resolve(public, "/a/b.html"), Some(PathBuf::from("/srv/site/a/b.html")));
        assert_eq!(resolve(public, "//a/./b.html"), Some(PathBuf::from("/srv/site/a/b.html")));
        assert_eq!(resolve(public, "/../etc/passwd"), None);
        assert_eq!(resolve(public, "/a/..\\..\\x"), None);
    }

    #[test]
    fn host_port_is_stripped() {
        assert_eq!(strip_port("example.org:8080"), "example.org");
        assert_eq!(strip_port("example.org"), "example.org");
        assert_eq!(strip_port("[::1]:3000"), "[::1]");
    }
}
