//! Template rendering for handlers.
//!
//! Handlers call [`crate::RequestContext::render`], which goes through the
//! app's [`Render`] implementation. [`Templates`] is the bundled one, backed by
//! minijinja; embedders with their own engine implement [`Render`] instead.

use anyhow::Context;
use minijinja::Environment;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// `render(template, locals) -> string`
pub trait Render: Send + Sync {
    /// # Errors
    ///
    /// Unknown templates and rendering failures.
    fn render(&self, name: &str, locals: &Value) -> anyhow::Result<String>;
}

/// Named minijinja template sources.
///
/// Every template is registered in the environment used for a render, so
/// `{% include %}` and `{% extends %}` resolve against the whole set.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    sources: BTreeMap<String, String>,
}

impl Templates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any template of the same name.
    ///
    /// # Errors
    ///
    /// The minijinja syntax error when `source` does not compile.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), minijinja::Error> {
        let name = name.into();
        let source = source.into();
        Environment::new().add_template(&name, &source)?;
        debug!(template = %name, "Template registered");
        self.sources.insert(name, source);
        Ok(())
    }

    /// Load every regular file in `dir` as a template named by its file name.
    ///
    /// # Errors
    ///
    /// I/O errors reading the directory, or a template that fails to compile.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let mut templates = Self::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let source = fs::read_to_string(&path)?;
            templates
                .add_template(name, source)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }
        info!(
            dir = %dir.as_ref().display(),
            count = templates.len(),
            "Templates loaded"
        );
        Ok(templates)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Render for Templates {
    fn render(&self, name: &str, locals: &Value) -> anyhow::Result<String> {
        let mut env = Environment::new();
        for (template, source) in &self.sources {
            env.add_template(template, source)?;
        }
        let tmpl = env
            .get_template(name)
            .with_context(|| format!("unknown template {name:?}"))?;
        let rendered = tmpl
            .render(locals)
            .with_context(|| format!("failed to render template {name:?}"))?;
        Ok(rendered)
    }
}
