//! # Content Module
//!
//! Content-type symbols, the body codecs, and the [`ContentNegotiator`] that
//! decides which symbol a response is serialized as.
//!
//! Resolution order at serialization time, highest first:
//!
//! 1. `ctx.content_type(..)` called inside the handler
//! 2. the content type declared on the route
//! 3. the app-level default
//! 4. [`ContentType::Html`]

mod codec;
mod negotiator;

pub use codec::{decode, encode};
pub use negotiator::ContentNegotiator;

use std::fmt;
use std::str::FromStr;

pub const HTML_TYPE: &str = "text/html";
pub const JSON_TYPE: &str = "application/json";
pub const JS_TYPE: &str = "application/javascript";
pub const TEXT_TYPE: &str = "text/plain";
pub const FORM_TYPE: &str = "application/x-www-form-urlencoded";

/// Response content type symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    #[default]
    Html,
    Json,
    Js,
    Text,
}

impl ContentType {
    /// Bare MIME type.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            ContentType::Html => HTML_TYPE,
            ContentType::Json => JSON_TYPE,
            ContentType::Js => JS_TYPE,
            ContentType::Text => TEXT_TYPE,
        }
    }

    /// Value written to the response `Content-Type` header.
    #[must_use]
    pub fn header_value(self) -> &'static str {
        match self {
            ContentType::Html => "text/html; charset=utf-8",
            ContentType::Json => JSON_TYPE,
            ContentType::Js => JS_TYPE,
            ContentType::Text => "text/plain; charset=utf-8",
        }
    }

    /// Short symbol name (`html`, `json`, `js`, `text`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Html => "html",
            ContentType::Json => "json",
            ContentType::Js => "js",
            ContentType::Text => "text",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown content type symbols.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content type {0:?}")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    /// Accepts symbols (`json`) as well as MIME types (`application/json`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "html" | HTML_TYPE => Ok(ContentType::Html),
            "json" | JSON_TYPE => Ok(ContentType::Json),
            "js" | "javascript" | JS_TYPE => Ok(ContentType::Js),
            "text" | "txt" | TEXT_TYPE => Ok(ContentType::Text),
            _ => Err(UnknownContentType(s.to_string())),
        }
    }
}

/// Request body formats the param resolver knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Form,
}

impl BodyFormat {
    /// Pick the decoder for a request `Content-Type` header value.
    ///
    /// MIME parameters (`; charset=utf-8`) are ignored. Empty or unknown
    /// types yield `None`: the body is not decoded.
    #[must_use]
    pub fn from_content_type(header: &str) -> Option<Self> {
        let mime = header.split(';').next().unwrap_or_default().trim();
        if mime.eq_ignore_ascii_case(JSON_TYPE) {
            Some(BodyFormat::Json)
        } else if mime.eq_ignore_ascii_case(FORM_TYPE) {
            Some(BodyFormat::Form)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BodyFormat::Json => "json",
            BodyFormat::Form => "form",
        }
    }
}
