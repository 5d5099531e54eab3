use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDateTime;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stages of the collection form, in funnel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    FormView,
    FormStart,
    FormSubmit,
    FormComplete,
}

impl FunnelStage {
    pub const ORDER: [FunnelStage; 4] = [
        FunnelStage::FormView,
        FunnelStage::FormStart,
        FunnelStage::FormSubmit,
        FunnelStage::FormComplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FunnelStage::FormView => "form_view",
            FunnelStage::FormStart => "form_start",
            FunnelStage::FormSubmit => "form_submit",
            FunnelStage::FormComplete => "form_complete",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|stage| stage.as_str() == s)
    }
}

impl fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetEventType {
    WidgetLoad,
    WidgetView,
    TestimonialClick,
}

impl WidgetEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetEventType::WidgetLoad => "widget_load",
            WidgetEventType::WidgetView => "widget_view",
            WidgetEventType::TestimonialClick => "testimonial_click",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "widget_load" => Some(WidgetEventType::WidgetLoad),
            "widget_view" => Some(WidgetEventType::WidgetView),
            "testimonial_click" => Some(WidgetEventType::TestimonialClick),
            _ => None,
        }
    }
}

impl fmt::Display for WidgetEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TestimonialClickProps {
    pub testimonial_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FormSubmissionProps {
    pub rating: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_length: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactSubjectProps {
    pub subject: String,
}

/// Event payload. Known shapes are matched exactly; anything else is kept
/// verbatim as an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventProperties {
    TestimonialClick(TestimonialClickProps),
    FormSubmission(FormSubmissionProps),
    ContactSubject(ContactSubjectProps),
    Other(Map<String, Value>),
}

impl Default for EventProperties {
    fn default() -> Self {
        EventProperties::Other(Map::new())
    }
}

impl EventProperties {
    pub fn to_json_string(&self) -> String {
        // Every variant serializes to a plain JSON object.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Lenient read of a stored payload; corrupt text becomes an empty map.
    pub fn from_stored(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Who is being tracked and in which browsing session. Passed explicitly to
/// every tracking call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingContext {
    pub user_id: String,
    pub session_id: String,
}

impl TrackingContext {
    /// Uses the client's session id when it sent one, otherwise mints a new
    /// one.
    pub fn new(user_id: impl Into<String>, session_id: Option<String>) -> Self {
        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(Self::generate_session_id);

        Self {
            user_id: user_id.into(),
            session_id,
        }
    }

    /// `session_<unix millis>_<9 lowercase alphanumerics>`
    pub fn generate_session_id() -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let suffix: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(9)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();

        format!("session_{}_{}", millis, suffix)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageEvent {
    pub event_type: String,
    pub event_name: String,
    pub properties: EventProperties,
    pub url: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FunnelEvent {
    pub stage: FunnelStage,
    pub testimonial_id: Option<String>,
    pub form_data: EventProperties,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WidgetEvent {
    pub event_type: WidgetEventType,
    pub widget_id: Option<String>,
    pub website_domain: Option<String>,
    pub referrer: Option<String>,
    pub properties: EventProperties,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct StoredEvent {
    pub event_type: String,
    pub event_name: String,
    pub properties: String,
    pub created_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct StoredFunnelEvent {
    pub event_type: String,
    pub form_data: String,
    pub created_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct StoredWidgetEvent {
    pub event_type: String,
    pub website_domain: Option<String>,
    pub properties: String,
    pub created_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecentEvent {
    pub event_type: String,
    pub properties: String,
    pub created_at: NaiveDateTime,
    pub user_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_property_shapes_are_recognised() {
        let click: EventProperties =
            serde_json::from_value(json!({ "testimonialId": "t-1" })).unwrap();
        assert_eq!(
            click,
            EventProperties::TestimonialClick(TestimonialClickProps {
                testimonial_id: "t-1".to_string()
            })
        );

        let submission: EventProperties = serde_json::from_value(json!({ "rating": 5 })).unwrap();
        assert!(matches!(
            submission,
            EventProperties::FormSubmission(FormSubmissionProps { rating: 5, message_length: None })
        ));
    }

    #[test]
    fn test_unknown_shapes_fall_back_to_map() {
        let props: EventProperties =
            serde_json::from_value(json!({ "testimonialId": "t-1", "position": 2 })).unwrap();

        match props {
            EventProperties::Other(map) => {
                assert_eq!(map.get("position"), Some(&json!(2)));
            }
            other => panic!("Expected open map, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_stored_payload_is_empty_map() {
        assert_eq!(EventProperties::from_stored("not json"), EventProperties::default());
        assert_eq!(EventProperties::default().to_json_string(), "{}");
    }

    #[test]
    fn test_tracking_context_session_ids() {
        let ctx = TrackingContext::new("owner-1", Some("session_abc".to_string()));
        assert_eq!(ctx.session_id, "session_abc");

        let ctx = TrackingContext::new("owner-1", Some("   ".to_string()));
        assert!(ctx.session_id.starts_with("session_"));

        let parts: Vec<&str> = ctx.session_id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_funnel_stage_parsing() {
        assert_eq!(FunnelStage::from_db("form_start"), Some(FunnelStage::FormStart));
        assert_eq!(FunnelStage::from_db("form_abandon"), None);
        assert_eq!(WidgetEventType::from_db("testimonial_click"), Some(WidgetEventType::TestimonialClick));
    }
}
