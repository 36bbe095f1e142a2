//! Template interpolation for export definitions
//!
//! Handles `{{ variable }}` interpolation in connection settings.
//! Supports `{{ env.PG_PASSWORD }}` (process environment) and
//! `{{ vars.host }}` (values passed on the command line).

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ root.name }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Caller-supplied variables
    vars: HashMap<String, String>,
    /// Overrides for environment lookups (tests, embedding)
    env: Option<HashMap<String, String>>,
}

impl TemplateContext {
    /// Create a new empty context that reads `env.*` from the process
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with variables
    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        Self { vars, env: None }
    }

    /// Set a variable
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Replace process environment lookups with a fixed map
    pub fn set_env(&mut self, env: HashMap<String, String>) -> &mut Self {
        self.env = Some(env);
        self
    }

    /// Get a value by path (e.g., "env.HOME" or "vars.host")
    ///
    /// A bare name is looked up in `vars`.
    pub fn get(&self, path: &str) -> Option<String> {
        match path.split_once('.') {
            Some(("env", name)) => match &self.env {
                Some(env) => env.get(name).cloned(),
                None => std::env::var(name).ok(),
            },
            Some(("vars", name)) => self.vars.get(name).cloned(),
            Some(_) => None,
            None => self.vars.get(path).cloned(),
        }
    }
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    if !has_templates(template) {
        return Ok(template.to_string());
    }

    let mut errors = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let var_path = &cap[1];
        ctx.get(var_path).unwrap_or_else(|| {
            errors.push(var_path.to_string());
            String::new()
        })
    });

    if errors.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}
