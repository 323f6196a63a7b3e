//! Template rendering with variable substitution

use crate::templates::types::{RenderedTemplate, Template};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Values supplied by the caller for `{{name}}` placeholders
pub type TemplateData = HashMap<String, Value>;

/// `{{` + one or more non-brace characters + `}}`
fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder pattern is valid"))
}

/// Renders email templates by substituting variables
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Extract all variable names from a template string
    ///
    /// Names are trimmed and de-duplicated, in order of first appearance.
    /// Placeholders that are only whitespace are ignored.
    pub fn extract_variables(content: &str) -> Vec<String> {
        let mut variables: Vec<String> = Vec::new();

        for captures in placeholder_regex().captures_iter(content) {
            let name = captures[1].trim();
            if !name.is_empty() && !variables.iter().any(|v| v == name) {
                variables.push(name.to_string());
            }
        }

        variables
    }

    /// Substitute every placeholder whose name is present in `data`.
    ///
    /// Unknown placeholders stay in the output exactly as written.
    pub fn render(content: &str, data: &TemplateData) -> String {
        placeholder_regex()
            .replace_all(content, |captures: &Captures| {
                match data.get(captures[1].trim()) {
                    Some(value) => stringify(value),
                    None => captures[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Render subject, HTML and optional text body of a stored template
    pub fn render_template(template: &Template, data: &TemplateData) -> RenderedTemplate {
        RenderedTemplate {
            subject: Self::render(&template.subject, data),
            html: Self::render(&template.html, data),
            text: template
                .text
                .as_deref()
                .map(|text| Self::render(text, data)),
        }
    }

    /// Names used in the template that `data` does not provide
    pub fn missing_variables(template: &Template, data: &TemplateData) -> Vec<String> {
        template
            .variables
            .iter()
            .filter(|name| !data.contains_key(name.as_str()))
            .cloned()
            .collect()
    }
}

/// Plain textual form of a data value
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn data(pairs: &[(&str, Value)]) -> TemplateData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_render_basic_variables() {
        let vars = data(&[("name", json!("John Doe")), ("company", json!("Acme Inc"))]);

        let rendered = TemplateRenderer::render("Hello {{name}} from {{company}}!", &vars);

        assert_eq!(rendered, "Hello John Doe from Acme Inc!");
    }

    #[test]
    fn test_render_repeated_and_missing() {
        let vars = data(&[("a", json!("x"))]);

        assert_eq!(TemplateRenderer::render("{{a}}{{a}}{{b}}", &vars), "xx{{b}}");
    }

    #[test]
    fn test_render_trims_names_but_keeps_unknown_verbatim() {
        let vars = data(&[("name", json!("Ada"))]);

        assert_eq!(
            TemplateRenderer::render("Hi {{ name }}, {{  other }}", &vars),
            "Hi Ada, {{  other }}"
        );
    }

    #[test]
    fn test_render_non_string_values() {
        let vars = data(&[
            ("count", json!(3)),
            ("price", json!(9.5)),
            ("vip", json!(true)),
            ("nothing", Value::Null),
            ("items", json!(["a", "b", 1])),
        ]);

        let rendered = TemplateRenderer::render(
            "{{count}}|{{price}}|{{vip}}|{{nothing}}|{{items}}",
            &vars,
        );
        assert_eq!(rendered, "3|9.5|true|null|a,b,1");
    }

    #[test]
    fn test_render_edge_cases() {
        let vars = data(&[("a", json!("x"))]);

        assert_eq!(TemplateRenderer::render("", &vars), "");
        assert_eq!(TemplateRenderer::render("{{a", &vars), "{{a");
        assert_eq!(TemplateRenderer::render("{{}}", &vars), "{{}}");
        assert_eq!(TemplateRenderer::render("{{{a}}}", &vars), "{x}");
        assert_eq!(TemplateRenderer::render("no placeholders", &vars), "no placeholders");
    }

    #[test]
    fn test_render_does_not_recurse_into_values() {
        let vars = data(&[("a", json!("{{b}}")), ("b", json!("nope"))]);

        assert_eq!(TemplateRenderer::render("{{a}}", &vars), "{{b}}");
    }

    #[test]
    fn test_extract_variables() {
        let vars = TemplateRenderer::extract_variables("Hi {{name}}, your code is {{code}}");

        assert_eq!(vars.len(), 2);
        assert!(vars.contains(&"name".to_string()));
        assert!(vars.contains(&"code".to_string()));
    }

    #[test]
    fn test_extract_variables_dedup_and_spaces() {
        let vars = TemplateRenderer::extract_variables("{{ name }} {{name}} {{   }} {{x}} {{y");

        assert_eq!(vars, vec!["name", "x"]);
    }

    #[test]
    fn test_extract_variables_empty() {
        assert!(TemplateRenderer::extract_variables("").is_empty());
    }

    #[test]
    fn test_render_full_template() {
        let now = Utc::now();
        let template = Template {
            id: "t1".to_string(),
            user_id: "u1".to_string(),
            name: "Welcome".to_string(),
            description: None,
            subject: "Welcome, {{name}}".to_string(),
            text: Some("Hi {{name}}, code {{code}}".to_string()),
            html: "<p>Hi {{name}}</p>".to_string(),
            variables: vec!["name".to_string(), "code".to_string()],
            is_public: false,
            created_at: now,
            updated_at: now,
        };

        let vars = data(&[("name", json!("Ada"))]);
        let rendered = TemplateRenderer::render_template(&template, &vars);

        assert_eq!(rendered.subject, "Welcome, Ada");
        assert_eq!(rendered.html, "<p>Hi Ada</p>");
        assert_eq!(rendered.text.as_deref(), Some("Hi Ada, code {{code}}"));
        assert_eq!(
            TemplateRenderer::missing_variables(&template, &vars),
            vec!["code"]
        );
    }
}
