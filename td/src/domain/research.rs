//! Research briefing types
//!
//! A Research record is built once by the response parser and never mutated
//! afterwards. Field names serialize in camelCase, matching the JSON shape the
//! model is asked to produce and the shape served to the UI.

use serde::{Deserialize, Serialize};
use taskstore::now_ms;

/// Confidence attached to a briefing or a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    /// Parse a model-supplied label; None for anything unrecognised
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// What an action button does when pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    #[default]
    Link,
    Phone,
    Email,
    Copy,
}

impl ActionType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "link" => Some(Self::Link),
            "phone" => Some(Self::Phone),
            "email" => Some(Self::Email),
            "copy" => Some(Self::Copy),
            _ => None,
        }
    }
}

/// Where a source came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Web,
    Email,
    Document,
}

impl SourceType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "web" => Some(Self::Web),
            "email" => Some(Self::Email),
            "document" => Some(Self::Document),
            _ => None,
        }
    }
}

/// Layout hint the model may pick for rendering a briefing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiType {
    OptionsList,
    ContactCard,
    InfoCard,
    ComparisonTable,
    StepsList,
}

impl UiType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "options_list" => Some(Self::OptionsList),
            "contact_card" => Some(Self::ContactCard),
            "info_card" => Some(Self::InfoCard),
            "comparison_table" => Some(Self::ComparisonTable),
            "steps_list" => Some(Self::StepsList),
            _ => None,
        }
    }
}

/// One actionable button in a briefing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ActionType,
    pub value: String,
    pub is_primary: bool,
}

/// A cited source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    pub title: String,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: SourceType,
    pub confidence: Confidence,
    pub snippet: Option<String>,
}

/// Compact contact and pricing details; every field independently optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl QuickInfo {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One comparable alternative (a flight, a hotel, a product)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCard {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_value: Option<f64>,
    #[serde(default)]
    pub details: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    pub action_label: String,
    pub action_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// A structured briefing for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Research {
    /// Never empty
    pub summary: String,

    pub task_type: String,

    pub confidence: Confidence,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_info: Option<QuickInfo>,

    #[serde(default)]
    pub key_actions: Vec<Action>,

    #[serde(default)]
    pub sources: Vec<SourceReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionCard>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_question: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_type: Option<UiType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<serde_json::Value>,

    /// Full briefing text; the summary when the model gave none
    pub raw_markdown: String,

    /// Generation time (Unix milliseconds), stamped locally
    pub researched_at: i64,
}

impl Research {
    /// Minimal briefing with every optional part left empty
    pub fn fallback(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            task_type: "general".to_string(),
            confidence: Confidence::default(),
            quick_info: None,
            key_actions: Vec::new(),
            sources: Vec::new(),
            options: None,
            follow_up_question: None,
            ui_type: None,
            structured_data: None,
            raw_markdown: summary.to_string(),
            researched_at: now_ms(),
        }
    }

    /// The action a UI should highlight: first primary, else the first action
    pub fn primary_action(&self) -> Option<&Action> {
        self.key_actions
            .iter()
            .find(|a| a.is_primary)
            .or_else(|| self.key_actions.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(label: &str, is_primary: bool) -> Action {
        Action {
            label: label.to_string(),
            kind: ActionType::Link,
            value: "#".to_string(),
            is_primary,
        }
    }

    #[test]
    fn test_primary_action_prefers_first_primary() {
        let mut research = Research::fallback("x");
        research.key_actions = vec![action("a", false), action("b", true), action("c", true)];
        assert_eq!(research.primary_action().unwrap().label, "b");
    }

    #[test]
    fn test_primary_action_falls_back_to_first() {
        let mut research = Research::fallback("x");
        assert!(research.primary_action().is_none());
        research.key_actions = vec![action("a", false), action("b", false)];
        assert_eq!(research.primary_action().unwrap().label, "a");
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!(Confidence::from_label(" HIGH "), Some(Confidence::High));
        assert_eq!(Confidence::from_label("certain"), None);
        assert_eq!(ActionType::from_label("phone"), Some(ActionType::Phone));
        assert_eq!(SourceType::from_label("blog"), None);
        assert_eq!(UiType::from_label("contact_card"), Some(UiType::ContactCard));
    }

    #[test]
    fn test_serialized_shape() {
        let mut research = Research::fallback("Open 9-5");
        research.quick_info = Some(QuickInfo {
            phone_formatted: Some("(555) 123-4567".to_string()),
            ..Default::default()
        });
        research.key_actions = vec![action("Call", true)];
        let json = serde_json::to_value(&research).unwrap();

        assert_eq!(json["quickInfo"]["phoneFormatted"], "(555) 123-4567");
        assert!(json["quickInfo"].get("hours").is_none());
        assert_eq!(json["keyActions"][0]["type"], "link");
        assert_eq!(json["keyActions"][0]["isPrimary"], true);
        assert_eq!(json["confidence"], "medium");
        assert_eq!(json["rawMarkdown"], "Open 9-5");
        assert!(json.get("options").is_none());
    }
}
