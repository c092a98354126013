use std::io::ErrorKind;
use std::path::PathBuf;

use actix_web::{App, HttpServer};
use clap::Parser;
use itertools::Itertools;
use jst::server::{self, Site, SiteOptions};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Serve a directory, expanding `{{...}}` templates in text files.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to listen on
    #[arg(default_value_t = 3000)]
    port: u16,
    /// Config root holding variables.json, functions.json and .jstignore (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Directory served to clients (defaults to the root)
    #[arg(long)]
    public: Option<PathBuf>,
    /// Page rendered for missing files, relative to the public directory
    #[arg(long, default_value = "404.html")]
    page_404: String,
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse CLI arguments.
    let args = Args::parse();
    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    let site = Site::new(SiteOptions {
        root,
        public: args.public,
        page_404: args.page_404,
    });

    let factory_site = site.clone();
    let bound = HttpServer::new(move || App::new().configure(server::configure(factory_site.clone())))
        .bind((args.bind.as_str(), args.port));
    let server = match bound {
        Ok(server) => server,
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            error!("port {} already in use, try: jst {}", args.port, args.port.saturating_add(1));
            std::process::exit(1);
        }
        Err(e) => return Err(e),
    };

    // Startup banner.
    let config = site.loader().load();
    info!("JST server on http://{}:{}", args.bind, args.port);
    info!("root: {}", site.root().display());
    if site.public() != site.root() {
        info!("public: {}", site.public().display());
    }
    if config.variables.is_empty() {
        info!("variables: (none)");
    } else {
        info!("variables: {}", config.variables.keys().sorted().join(", "));
    }
    if !config.functions.is_empty() {
        info!("functions.json: {}", config.functions.names().sorted().join(", "));
    }
    if !config.ignore.is_empty() {
        info!("ignored: {}", config.ignore.patterns().join(", "));
    }
    info!("Ctrl+C to stop");

    server.run().await
}
