pub mod diagnostics;
pub mod document;
pub mod error;
pub mod http;
pub mod resolver;
pub mod router;
pub mod validate;
pub mod validator;

use serde::Serialize;
use std::fmt;

pub use diagnostics::{Diagnostic, Report};
pub use document::Document;
pub use error::{LoadError, ResolveError, RouteError};
pub use http::{Request, Response};
pub use router::CaptureMode;
pub use validator::{Validator, ValidatorBuilder};

/// Level of a single validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Ignored,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Ignored => "IGNORED",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(name)
    }
}
