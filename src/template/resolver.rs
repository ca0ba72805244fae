// ABOUTME: Token resolver implementing the layered variable lookup
// ABOUTME: Resolves {{name}} tokens through built-ins, caller vars, environment and defaults

use indexmap::IndexSet;
use regex::Regex;
use std::sync::LazyLock;

use super::context::{is_env_name, Builtin, ResolveContext};
use super::error::{Result, TemplateError};

/// `{{` followed by anything except `}` followed by `}}`
pub(crate) static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]*)\}\}").unwrap());

pub struct TokenResolver<'a> {
    context: ResolveContext<'a>,
}

impl<'a> TokenResolver<'a> {
    pub fn new(context: ResolveContext<'a>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ResolveContext<'a> {
        &self.context
    }

    /// Resolve a single token name to its value
    pub fn resolve(&self, name: &str) -> Result<String> {
        let mut chain = Vec::new();
        let mut missing = IndexSet::new();
        match self.resolve_in_chain(name, &mut chain, &mut missing)? {
            Some(value) => Ok(value),
            None => Err(self.missing_error(missing)),
        }
    }

    /// Substitute every token in `text`, failing if any stays unresolved
    pub fn render(&self, text: &str) -> Result<String> {
        let mut missing = IndexSet::new();
        let rendered = self.render_collecting(text, &mut missing)?;
        if missing.is_empty() {
            Ok(rendered)
        } else {
            Err(self.missing_error(missing))
        }
    }

    /// Substitute every token in `text`, recording unresolved names in `missing`
    /// instead of failing. Only a circular default aborts.
    pub fn render_collecting(&self, text: &str, missing: &mut IndexSet<String>) -> Result<String> {
        let mut chain = Vec::new();
        self.render_in_chain(text, &mut chain, missing)
    }

    pub(crate) fn missing_error(&self, missing: IndexSet<String>) -> TemplateError {
        TemplateError::MissingVariables {
            template: self.context.template_name.to_string(),
            names: missing.into_iter().collect(),
        }
    }

    fn render_in_chain(
        &self,
        text: &str,
        chain: &mut Vec<String>,
        missing: &mut IndexSet<String>,
    ) -> Result<String> {
        if !text.contains("{{") {
            return Ok(text.to_string());
        }

        let mut rendered = String::with_capacity(text.len());
        let mut last = 0;
        for captures in TOKEN_RE.captures_iter(text) {
            let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            rendered.push_str(&text[last..whole.start()]);
            if let Some(value) = self.resolve_in_chain(inner.as_str(), chain, missing)? {
                rendered.push_str(&value);
            }
            last = whole.end();
        }
        rendered.push_str(&text[last..]);

        Ok(rendered)
    }

    /// `Ok(None)` means unresolved, with the offending names added to `missing`
    fn resolve_in_chain(
        &self,
        raw_name: &str,
        chain: &mut Vec<String>,
        missing: &mut IndexSet<String>,
    ) -> Result<Option<String>> {
        let name = raw_name.trim();
        if name.is_empty() {
            missing.insert(raw_name.to_string());
            return Ok(None);
        }

        if let Some(builtin) = Builtin::from_name(name) {
            return Ok(Some(builtin.evaluate()));
        }

        if let Some(value) = self.context.variables.get(name) {
            return Ok(Some(value.clone()));
        }

        if is_env_name(name) {
            if let Some(value) = self.context.env.get(name) {
                return Ok(Some(value.clone()));
            }
        }

        if let Some(default) = self.context.default_for(name) {
            if chain.iter().any(|entry| entry == name) {
                let mut cycle = chain.clone();
                cycle.push(name.to_string());
                return Err(TemplateError::CircularDefault {
                    template: self.context.template_name.to_string(),
                    chain: cycle,
                });
            }

            chain.push(name.to_string());
            let before = missing.len();
            let value = self.render_in_chain(default, chain, missing);
            chain.pop();
            let value = value?;

            return Ok((missing.len() == before).then_some(value));
        }

        missing.insert(name.to_string());
        Ok(None)
    }
}
