//! Path pattern compilation.
//!
//! The route table treats matchers as opaque: anything implementing
//! [`Matcher`] can be registered. [`PatternMatcher`] is the built-in grammar:
//!
//! - `/:name` and `/{name}` capture one non-empty path segment
//! - a final `/*` captures the rest of the path as `splat`
//! - every other segment matches literally

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::errors::SetupError;

use super::ParamVec;

/// Compiled form of a path pattern.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// The pattern text this matcher was compiled from. Used as the route
    /// identity together with the method.
    fn source(&self) -> &str;

    /// Test `path`, returning the extracted named segments on success.
    fn matches(&self, path: &str) -> Option<ParamVec>;
}

/// Regex-backed matcher for `/:foo/things/:bar` style patterns.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    source: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl PatternMatcher {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// [`SetupError::InvalidPattern`] if the pattern does not start with `/`,
    /// has an empty or non-identifier parameter name, places `*` anywhere but
    /// the last segment, or repeats a parameter name.
    pub fn compile(pattern: &str) -> Result<Self, SetupError> {
        let invalid = |reason: &str| SetupError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("pattern must start with '/'"));
        }

        if pattern == "/" {
            let regex = Regex::new(r"^/$").map_err(|e| invalid(&e.to_string()))?;
            return Ok(Self {
                source: pattern.to_string(),
                regex,
                param_names: Vec::new(),
            });
        }

        let mut regex_src = String::with_capacity(pattern.len() + 8);
        regex_src.push('^');
        let mut param_names: Vec<Arc<str>> = Vec::new();
        let segments: Vec<&str> = pattern[1..].split('/').collect();
        let last = segments.len() - 1;

        for (idx, segment) in segments.iter().enumerate() {
            let name = if let Some(name) = segment.strip_prefix(':') {
                Some(name)
            } else if segment.starts_with('{') && segment.ends_with('}') && segment.len() >= 2 {
                Some(&segment[1..segment.len() - 1])
            } else {
                None
            };

            if let Some(name) = name {
                if !is_identifier(name) {
                    return Err(invalid(&format!("bad parameter name {name:?}")));
                }
                if param_names.iter().any(|n| n.as_ref() == name) {
                    return Err(invalid(&format!("duplicate parameter {name:?}")));
                }
                regex_src.push_str("/([^/]+)");
                param_names.push(Arc::from(name));
            } else if *segment == "*" {
                if idx != last {
                    return Err(invalid("'*' is only allowed as the last segment"));
                }
                regex_src.push_str("/(.*)");
                param_names.push(Arc::from("splat"));
            } else {
                regex_src.push('/');
                regex_src.push_str(&regex::escape(segment));
            }
        }
        regex_src.push('$');

        let regex = Regex::new(&regex_src).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            param_names,
        })
    }

    /// Ordered parameter names captured by this pattern.
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }
}

impl Matcher for PatternMatcher {
    fn source(&self) -> &str {
        &self.source
    }

    fn matches(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (idx, name) in self.param_names.iter().enumerate() {
            let value = caps.get(idx + 1).map(|m| m.as_str()).unwrap_or_default();
            params.push((Arc::clone(name), percent_decode(value)));
        }
        Some(params)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Percent-decode a captured segment; falls back to the raw text when the
/// escapes do not form valid UTF-8.
fn percent_decode(segment: &str) -> String {
    if !segment.contains('%') {
        return segment.to_string();
    }
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
