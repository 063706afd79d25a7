use serde_json::Value;
use tracing::debug;

use super::{codec, ContentType};
use crate::errors::DispatchError;

/// Resolves the content type a response is written as and serializes it.
///
/// The app-level default is declared during setup; per-route and per-call
/// overrides are passed in at resolution time, so the negotiator itself is
/// read-only while requests are being served.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentNegotiator {
    default: Option<ContentType>,
}

impl ContentNegotiator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the app-wide default content type.
    pub fn declare_default(&mut self, content_type: ContentType) {
        self.default = Some(content_type);
    }

    /// The declared app default, if any.
    #[must_use]
    pub fn app_default(&self) -> Option<ContentType> {
        self.default
    }

    /// Effective content type: runtime override, then route override, then
    /// app default, then HTML.
    #[must_use]
    pub fn resolve_for_route(
        &self,
        route_override: Option<ContentType>,
        runtime_override: Option<ContentType>,
    ) -> ContentType {
        let resolved = runtime_override
            .or(route_override)
            .or(self.default)
            .unwrap_or_default();
        debug!(
            runtime_override = ?runtime_override,
            route_override = ?route_override,
            app_default = ?self.default,
            resolved = %resolved,
            "Content type resolved"
        );
        resolved
    }

    /// See [`codec::encode`].
    ///
    /// # Errors
    ///
    /// [`DispatchError::Serialization`] when `value` cannot be written as
    /// `content_type`.
    pub fn encode(
        &self,
        content_type: ContentType,
        value: &Value,
    ) -> Result<Vec<u8>, DispatchError> {
        codec::encode(content_type, value)
    }
}
