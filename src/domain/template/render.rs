//! Placeholder substitution for template titles and bodies

use serde::Serialize;
use serde_json::{Map, Value};

use super::types::NotificationTemplate;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Rendered title and body of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedContent {
    pub title: String,
    pub body: String,
}

/// Render a template's own title and body
pub fn render(template: &NotificationTemplate, variables: &Map<String, Value>) -> RenderedContent {
    render_content(&template.title, &template.body, variables)
}

/// Render an arbitrary title/body pair
pub fn render_content(title: &str, body: &str, variables: &Map<String, Value>) -> RenderedContent {
    RenderedContent {
        title: render_template_string(title, variables),
        body: render_template_string(body, variables),
    }
}

/// Replace every `{{ key }}` placeholder whose key has a non-null value.
///
/// Unknown keys, null values and empty keys leave the placeholder text as it
/// was. Substituted values are not rendered again.
pub fn render_template_string(raw: &str, variables: &Map<String, Value>) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find(OPEN) {
        result.push_str(&rest[..start]);
        let candidate = &rest[start..];

        match placeholder_len(candidate) {
            Some(len) => {
                let placeholder = &candidate[..len];
                let key = placeholder[OPEN.len()..len - CLOSE.len()].trim();
                match lookup(key, variables) {
                    Some(value) => result.push_str(&value),
                    None => result.push_str(placeholder),
                }
                rest = &candidate[len..];
            }
            None => {
                // Not a placeholder here; emit one brace and rescan
                result.push('{');
                rest = &candidate[1..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// Length of the placeholder at the start of `s`: `{{`, one or more non-`}`
/// characters, then `}}`.
fn placeholder_len(s: &str) -> Option<usize> {
    let inner = &s[OPEN.len()..];
    let close = inner.find('}')?;
    if close == 0 || !inner[close..].starts_with(CLOSE) {
        return None;
    }
    Some(OPEN.len() + close + CLOSE.len())
}

fn lookup(key: &str, variables: &Map<String, Value>) -> Option<String> {
    if key.is_empty() {
        return None;
    }

    match variables.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // For arrays and objects, use JSON representation
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_render_template() {
        let template =
            NotificationTemplate::new("order_new", "Order {{order_id}}", "Total {{ total }}");
        let variables = vars(json!({"order_id": "123"}));

        let first = render(&template, &variables);
        let second = render(&template, &variables);

        assert_eq!(first.title, "Order 123");
        assert_eq!(first.body, "Total {{ total }}");
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_simple() {
        let variables = vars(json!({ "order_id": "123" }));
        assert_eq!(
            render_template_string("Order {{order_id}}", &variables),
            "Order 123"
        );
    }

    #[test]
    fn test_render_whitespace_inside_braces() {
        let variables = vars(json!({ "name": "Dana" }));
        assert_eq!(
            render_template_string("Hi {{  name }}!", &variables),
            "Hi Dana!"
        );
    }

    #[test]
    fn test_unknown_key_left_verbatim() {
        let variables = vars(json!({ "order_id": "123" }));
        assert_eq!(
            render_template_string("Order {{order_id}} for {{ customer }}", &variables),
            "Order 123 for {{ customer }}"
        );
    }

    #[test]
    fn test_null_value_left_verbatim() {
        let variables = vars(json!({ "amount": null }));
        assert_eq!(
            render_template_string("Amount: {{amount}}", &variables),
            "Amount: {{amount}}"
        );
    }

    #[test]
    fn test_empty_key_left_verbatim() {
        let variables = vars(json!({ "": "x" }));
        assert_eq!(render_template_string("a {{ }} b", &variables), "a {{ }} b");
    }

    #[test]
    fn test_numbers_and_bools() {
        let variables = vars(json!({ "count": 42, "paid": true, "price": 9.5 }));
        assert_eq!(
            render_template_string("{{count}} items, paid={{paid}}, {{price}}", &variables),
            "42 items, paid=true, 9.5"
        );
    }

    #[test]
    fn test_every_occurrence_replaced() {
        let variables = vars(json!({ "id": "A1" }));
        assert_eq!(
            render_template_string("{{id}}-{{ id }}-{{id}}", &variables),
            "A1-A1-A1"
        );
    }

    #[test]
    fn test_substituted_value_not_rendered_again() {
        let variables = vars(json!({ "a": "{{b}}", "b": "nope" }));
        assert_eq!(render_template_string("{{a}}", &variables), "{{b}}");
    }

    #[test]
    fn test_unterminated_and_malformed_placeholders() {
        let variables = vars(json!({ "a": "1" }));
        assert_eq!(render_template_string("{{a", &variables), "{{a");
        assert_eq!(render_template_string("{{a}b}}", &variables), "{{a}b}}");
        assert_eq!(render_template_string("{{{a}}}", &variables), "{{{a}}}");
        assert_eq!(render_template_string("{{}}", &variables), "{{}}");
    }

    #[test]
    fn test_render_is_idempotent() {
        let variables = vars(json!({ "order_id": "123", "customer_name": "Noa" }));
        let raw = "Order {{order_id}} by {{customer_name}} ({{missing}})";
        let first = render_template_string(raw, &variables);
        let second = render_template_string(raw, &variables);
        assert_eq!(first, second);
        assert_eq!(first, "Order 123 by Noa ({{missing}})");
    }

    #[test]
    fn test_multibyte_text_preserved() {
        let variables = vars(json!({ "amount": "50" }));
        assert_eq!(
            render_template_string("סכום: {{amount}} ₪", &variables),
            "סכום: 50 ₪"
        );
    }
}
