use serde::Serialize;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::sync::Arc;

/// Maximum inline headers before heap allocation.
/// Most responses carry at most 16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated response header storage.
///
/// Names are `Arc<str>` so fixed names (`content-type`, `x-request-id`) are
/// shared instead of copied per response.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Set `name` to `value`, replacing any existing entry case-insensitively.
///
/// The replaced entry keeps its position, so the last value set wins without
/// reordering the headers.
pub fn set_header(headers: &mut HeaderVec, name: &str, value: String) {
    match headers
        .iter_mut()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
    {
        Some(slot) => slot.1 = value,
        None => headers.push((Arc::from(name.to_ascii_lowercase()), value)),
    }
}

/// Outbound response produced exactly once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl Response {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Header value by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text; invalid UTF-8 is replaced.
    #[must_use]
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the body is not valid JSON.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
    }
}
