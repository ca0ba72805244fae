// ABOUTME: Interpolation engine walking destination and message trees
// ABOUTME: Resolves tokens in every string value and object key, and collects token names

use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::context::ResolveContext;
use super::error::Result;
use super::resolved::ResolvedTemplate;
use super::resolver::{TokenResolver, TOKEN_RE};
use crate::parser::MessageTemplate;

/// Resolve every token in the template's destination and message.
///
/// Unresolved tokens from both trees are gathered and reported together, in
/// the order they were first seen. A circular default aborts immediately.
pub fn interpolate(
    template: &MessageTemplate,
    variables: &HashMap<String, String>,
    env: &HashMap<String, String>,
) -> Result<ResolvedTemplate> {
    let context = ResolveContext::new(&template.name, variables, env, &template.variables);
    let resolver = TokenResolver::new(context);
    let mut missing = IndexSet::new();

    let destination = resolve_tree(&resolver, &template.destination, &mut missing)?;
    let message = resolve_tree(&resolver, &template.message, &mut missing)?;

    if !missing.is_empty() {
        return Err(resolver.missing_error(missing));
    }

    Ok(ResolvedTemplate::new(
        template.name.clone(),
        template.description.clone(),
        destination,
        message,
    ))
}

/// Recursively resolve tokens in a JSON tree
pub fn resolve_tree(
    resolver: &TokenResolver<'_>,
    value: &Value,
    missing: &mut IndexSet<String>,
) -> Result<Value> {
    match value {
        Value::String(text) => Ok(Value::String(resolver.render_collecting(text, missing)?)),
        Value::Array(items) => {
            let resolved: Result<Vec<Value>> = items
                .iter()
                .map(|item| resolve_tree(resolver, item, missing))
                .collect();
            Ok(Value::Array(resolved?))
        }
        Value::Object(object) => {
            let mut resolved = Map::with_capacity(object.len());
            for (key, val) in object {
                let resolved_key = resolver.render_collecting(key, missing)?;
                let resolved_val = resolve_tree(resolver, val, missing)?;
                resolved.insert(resolved_key, resolved_val);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

/// Every token name used anywhere in a tree, keys included, without resolving
pub fn collect_tokens(value: &Value) -> IndexSet<String> {
    let mut tokens = IndexSet::new();
    collect_into(value, &mut tokens);
    tokens
}

fn collect_into(value: &Value, tokens: &mut IndexSet<String>) {
    match value {
        Value::String(text) => scan_text(text, tokens),
        Value::Array(items) => items.iter().for_each(|item| collect_into(item, tokens)),
        Value::Object(object) => {
            for (key, val) in object {
                scan_text(key, tokens);
                collect_into(val, tokens);
            }
        }
        _ => {}
    }
}

fn scan_text(text: &str, tokens: &mut IndexSet<String>) {
    for captures in TOKEN_RE.captures_iter(text) {
        if let Some(inner) = captures.get(1) {
            let name = inner.as_str().trim();
            if !name.is_empty() {
                tokens.insert(name.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateError;
    use serde_json::json;

    fn template(value: Value) -> MessageTemplate {
        MessageTemplate::from_value(value).unwrap()
    }

    fn vars(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_basic_interpolation() {
        let template = template(json!({
            "version": "1",
            "name": "greeting",
            "destination": {"service": "slack", "channel": "#c"},
            "message": {"text": "Hello, {{name}}!"}
        }));

        let resolved = interpolate(&template, &vars(&[("name", "World")]), &HashMap::new()).unwrap();
        assert_eq!(resolved.message()["text"], "Hello, World!");
        assert_eq!(resolved.service(), "slack");
        assert_eq!(resolved.name(), "greeting");
    }

    #[test]
    fn test_keys_are_interpolated() {
        let template = template(json!({
            "version": "1",
            "name": "keys",
            "destination": {"service": "slack"},
            "message": {"{{key}}": "v"}
        }));

        let resolved = interpolate(&template, &vars(&[("key", "env")]), &HashMap::new()).unwrap();
        assert_eq!(resolved.message(), &json!({"env": "v"}));
    }

    #[test]
    fn test_scalars_pass_through() {
        let template = template(json!({
            "version": "1",
            "name": "scalars",
            "destination": {"service": "slack", "unfurl": false},
            "message": {"count": 3, "ratio": 0.5, "flag": true, "none": null, "list": ["{{a}}", 1]}
        }));

        let resolved = interpolate(&template, &vars(&[("a", "x")]), &HashMap::new()).unwrap();
        assert_eq!(
            resolved.message(),
            &json!({"count": 3, "ratio": 0.5, "flag": true, "none": null, "list": ["x", 1]})
        );
        assert_eq!(resolved.destination()["unfurl"], false);
    }

    #[test]
    fn test_missing_tokens_collected_across_tree() {
        let template = template(json!({
            "version": "1",
            "name": "missing",
            "destination": {"service": "slack", "channel": "{{channel}}"},
            "message": {"text": "{{first}} and {{second}}", "blocks": [{"section": "{{first}}"}]}
        }));

        let err = interpolate(&template, &HashMap::new(), &HashMap::new()).unwrap_err();
        match err {
            TemplateError::MissingVariables { template, names } => {
                assert_eq!(template, "missing");
                assert_eq!(names, vec!["channel", "first", "second"]);
            }
            other => panic!("expected missing variables, got {:?}", other),
        }
    }

    #[test]
    fn test_required_with_default_resolves() {
        let template = template(json!({
            "version": "1",
            "name": "defaults",
            "destination": {"service": "slack"},
            "variables": {"env": {"required": true, "default": "staging"}},
            "message": {"text": "Deploying to {{env}}"}
        }));

        let resolved = interpolate(&template, &HashMap::new(), &HashMap::new()).unwrap();
        assert_eq!(resolved.message()["text"], "Deploying to staging");
    }

    #[test]
    fn test_circular_defaults_abort() {
        let template = template(json!({
            "version": "1",
            "name": "cycle",
            "destination": {"service": "slack"},
            "variables": {"a": {"default": "{{b}}"}, "b": {"default": "{{a}}"}},
            "message": {"text": "{{a}}"}
        }));

        let err = interpolate(&template, &HashMap::new(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, TemplateError::CircularDefault { .. }));
    }

    #[test]
    fn test_collect_tokens() {
        let tree = json!({
            "text": "{{ greeting }}, {{name}}",
            "{{key}}": ["{{name}}", 5, {"deep": "{{now}}"}],
            "empty": "{{}}"
        });

        let tokens: Vec<String> = collect_tokens(&tree).into_iter().collect();
        assert_eq!(tokens, vec!["greeting", "name", "key", "now"]);
    }
}
