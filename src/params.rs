//! Request parameter resolution.
//!
//! Merges three layers into one ordered map. Precedence for colliding keys,
//! highest first:
//!
//! 1. path parameters extracted by the route matcher
//! 2. decoded body parameters (`application/json` or form-encoded)
//! 3. query string parameters
//!
//! Keys keep the position of their first appearance; a higher layer only
//! replaces the value.

use serde_json::{Map, Value};
use tracing::debug;

use crate::content::{self, BodyFormat};
use crate::errors::DispatchError;
use crate::router::ParamVec;

/// Ordered request parameters.
pub type Params = Map<String, Value>;

/// Stateless merger of query, body and path parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamResolver;

impl ParamResolver {
    /// Resolve all parameter layers for one request.
    ///
    /// The body is decoded only when `request_content_type` names a decodable
    /// format; a missing, empty, or unknown content type contributes nothing.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Decode`] when the body does not decode as its declared
    /// format.
    pub fn resolve(
        &self,
        query: &str,
        path_params: &ParamVec,
        raw_body: &[u8],
        request_content_type: Option<&str>,
    ) -> Result<Params, DispatchError> {
        let query_params = parse_query(query);
        let body_params = match request_content_type.and_then(BodyFormat::from_content_type) {
            Some(format) => {
                debug!(
                    format = format.as_str(),
                    body_len = raw_body.len(),
                    "Decoding request body"
                );
                content::decode(format, raw_body)?
            }
            None => Params::new(),
        };
        Ok(self.merge(query_params, body_params, path_params))
    }

    /// Merge already-decoded layers with path > body > query precedence.
    #[must_use]
    pub fn merge(&self, query: Params, body: Params, path_params: &ParamVec) -> Params {
        let mut merged = query;
        for (key, value) in body {
            merged.insert(key, value);
        }
        for (key, value) in path_params {
            merged.insert(key.to_string(), Value::String(value.clone()));
        }
        merged
    }
}

/// Parse a raw query string (without the leading `?`) into string params.
///
/// Repeated keys keep the last value.
#[must_use]
pub fn parse_query(query: &str) -> Params {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect()
}
