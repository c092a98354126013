pub mod config;
pub mod constants;
pub mod context;
pub mod engine;
pub mod errors;
pub mod functions;   // template function table
pub mod ignore;
pub mod parser;
pub mod server;

use std::collections::HashMap;

/// Variable name to value. Keys are case-sensitive.
pub type Variables = HashMap<String, String>;

pub use config::{ConfigLoader, SiteConfig};
pub use context::RequestContext;
pub use engine::{process, Preprocessor, MAX_PASSES};
pub use errors::{JstError, Result};
pub use functions::{Function, Registry};
pub use ignore::{is_ignored, IgnoreList};
pub use parser::parse_args;
