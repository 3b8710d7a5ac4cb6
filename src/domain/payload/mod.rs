//! Delivery payload construction.
//!
//! `PayloadOverrides` is the typed set of per-call or per-schedule overrides.
//! `build_payload` merges it with a template into the `DeliveryPayload` that
//! every channel receives.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::template::{render_content, NotificationTemplate};

/// Title used when neither the overrides nor the template provide one
pub const DEFAULT_TITLE: &str = "VIPO";

/// Keys in `data` owned by the dispatcher
pub const DATA_TEMPLATE_TYPE: &str = "templateType";
pub const DATA_VARIABLES: &str = "variables";

/// Optional per-dispatch overrides.
///
/// Only the fields listed here are ever copied into the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renotify: Option<bool>,
    #[serde(alias = "requireInteraction", skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,

    /// Extra data merged into `DeliveryPayload::data`
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,

    /// Extra audience roles
    #[serde(deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub audience: Vec<String>,
    #[serde(deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(
        alias = "userIds",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub user_ids: Vec<String>,

    /// Render variables used by scheduled dispatches
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
}

/// Payload handed to the delivery channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPayload {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renotify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    /// Always contains `templateType` and `variables`
    pub data: Map<String, Value>,
}

impl DeliveryPayload {
    pub fn template_type(&self) -> Option<&str> {
        self.data.get(DATA_TEMPLATE_TYPE).and_then(Value::as_str)
    }
}

/// Build the delivery payload for one dispatch.
///
/// Title and body come from the overrides when non-empty, otherwise from the
/// template; the chosen string is then rendered.
pub fn build_payload(
    template: &NotificationTemplate,
    variables: &Map<String, Value>,
    overrides: &PayloadOverrides,
) -> DeliveryPayload {
    let title = first_non_empty([overrides.title.as_deref(), Some(template.title.as_str())])
        .unwrap_or(DEFAULT_TITLE);
    let body =
        first_non_empty([overrides.body.as_deref(), Some(template.body.as_str())]).unwrap_or("");

    let mut data = overrides.data.clone();
    data.insert(
        DATA_TEMPLATE_TYPE.to_string(),
        Value::String(template.template_type.clone()),
    );
    data.insert(DATA_VARIABLES.to_string(), Value::Object(variables.clone()));

    let rendered = render_content(title, body, variables);

    DeliveryPayload {
        title: rendered.title,
        body: rendered.body,
        icon: overrides.icon.clone().or_else(|| template.icon.clone()),
        badge: overrides.badge.clone().or_else(|| template.badge.clone()),
        image: overrides.image.clone().or_else(|| template.image.clone()),
        url: overrides.url.clone().or_else(|| template.url.clone()),
        tag: overrides.tag.clone(),
        renotify: overrides.renotify,
        require_interaction: overrides.require_interaction,
        data,
    }
}

fn first_non_empty<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates.into_iter().flatten().find(|s| !s.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Single(String),
    Multiple(Vec<String>),
    Null(()),
}

/// Accept either a single string or a list of strings
pub(crate) fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Single(value) => vec![value],
        OneOrMany::Multiple(values) => values,
        OneOrMany::Null(()) => Vec::new(),
    })
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
    fn test_build_uses_template_and_renders() {
        let template = NotificationTemplate::new("order_new", "Order {{order_id}}", "By {{who}}");
        let variables = vars(json!({ "order_id": "123" }));

        let payload = build_payload(&template, &variables, &PayloadOverrides::default());

        assert_eq!(payload.title, "Order 123");
        assert_eq!(payload.body, "By {{who}}");
        assert_eq!(payload.template_type(), Some("order_new"));
        assert_eq!(payload.data["variables"], json!({ "order_id": "123" }));
    }

    #[test]
    fn test_title_fallbacks() {
        let template = NotificationTemplate::new("blank", "", "");
        let payload = build_payload(&template, &Map::new(), &PayloadOverrides::default());
        assert_eq!(payload.title, DEFAULT_TITLE);
        assert_eq!(payload.body, "");

        let overrides = PayloadOverrides {
            title: Some("Custom {{x}}".into()),
            body: Some(String::new()),
            ..Default::default()
        };
        let template = NotificationTemplate::new("t", "Template title", "Template body");
        let payload = build_payload(&template, &vars(json!({ "x": 1 })), &overrides);
        assert_eq!(payload.title, "Custom 1");
        assert_eq!(payload.body, "Template body");
    }

    #[test]
    fn test_overrides_win_over_template_defaults() {
        let mut template = NotificationTemplate::new("t", "T", "B");
        template.icon = Some("/icon.png".into());
        template.url = Some("/orders".into());

        let overrides = PayloadOverrides {
            url: Some("/orders/123".into()),
            tag: Some("order-123".into()),
            require_interaction: Some(true),
            ..Default::default()
        };

        let payload = build_payload(&template, &Map::new(), &overrides);
        assert_eq!(payload.icon.as_deref(), Some("/icon.png"));
        assert_eq!(payload.url.as_deref(), Some("/orders/123"));
        assert_eq!(payload.tag.as_deref(), Some("order-123"));
        assert_eq!(payload.require_interaction, Some(true));
        assert_eq!(payload.renotify, None);
    }

    #[test]
    fn test_data_merge_never_clobbers_reserved_keys() {
        let template = NotificationTemplate::new("order_new", "T", "B");
        let overrides = PayloadOverrides {
            data: vars(json!({ "orderId": "9", "templateType": "spoofed", "variables": 1 })),
            ..Default::default()
        };

        let payload = build_payload(&template, &vars(json!({ "a": "b" })), &overrides);
        assert_eq!(payload.data["orderId"], "9");
        assert_eq!(payload.data["templateType"], "order_new");
        assert_eq!(payload.data["variables"], json!({ "a": "b" }));
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let template = NotificationTemplate::new("t", "T", "B");
        let overrides = PayloadOverrides {
            require_interaction: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(build_payload(&template, &Map::new(), &overrides)).unwrap();

        assert_eq!(json["requireInteraction"], true);
        assert!(json.get("icon").is_none());
    }

    #[test]
    fn test_overrides_accept_single_or_list() {
        let overrides: PayloadOverrides = serde_json::from_value(json!({
            "tags": "vip",
            "userIds": ["u1", "u2"],
            "audience": null,
            "requireInteraction": false
        }))
        .unwrap();

        assert_eq!(overrides.tags, vec!["vip"]);
        assert_eq!(overrides.user_ids, vec!["u1", "u2"]);
        assert!(overrides.audience.is_empty());
        assert_eq!(overrides.require_interaction, Some(false));
    }
}
