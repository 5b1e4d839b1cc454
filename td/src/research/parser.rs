//! Research response parser
//!
//! Model output is untrusted free text that usually wraps one JSON object.
//! Every field is normalized on its own: missing, empty, or mistyped values
//! fall back to fixed defaults so nothing half-formed reaches the UI.

use serde_json::{Map, Value};
use taskstore::now_ms;
use tracing::debug;

use super::error::ParseError;
use crate::domain::{
    Action, ActionType, Confidence, OptionCard, QuickInfo, Research, SourceReference, SourceType, UiType,
};

/// Summary used when the model gives none
pub const DEFAULT_SUMMARY: &str = "Unable to generate summary";
const DEFAULT_TASK_TYPE: &str = "general";
const DEFAULT_ACTION_LABEL: &str = "Action";
const DEFAULT_ACTION_VALUE: &str = "#";
const DEFAULT_SOURCE_TITLE: &str = "Source";
const DEFAULT_OPTION_TITLE: &str = "Option";
const DEFAULT_OPTION_ACTION_LABEL: &str = "Select";
const DEFAULT_OPTION_ACTION_URL: &str = "#";

/// Outcome of parsing one model response
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResearch {
    /// The model judged the task personal; no briefing
    Personal,
    Research(Research),
}

/// Locate the embedded JSON object: first `{` through last `}`
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start { Some(&text[start..=end]) } else { None }
}

/// Parse raw model output into a personal verdict or a normalized briefing
pub fn parse(raw: &str) -> Result<ParsedResearch, ParseError> {
    debug!(raw_len = raw.len(), "parse: called");
    let snippet = extract_json(raw).ok_or(ParseError::NoJsonFound)?;
    let parsed: Value = serde_json::from_str(snippet)?;

    if parsed.get("isPersonal").is_some_and(is_truthy) {
        debug!("parse: model marked task personal");
        return Ok(ParsedResearch::Personal);
    }

    let empty = Map::new();
    let body = match parsed.get("research") {
        Some(Value::Object(research)) => research,
        _ => parsed.as_object().unwrap_or(&empty),
    };

    Ok(ParsedResearch::Research(normalize_research(body)))
}

/// Build a Research record from the model's research object
pub fn normalize_research(obj: &Map<String, Value>) -> Research {
    let summary = text(obj, "summary").unwrap_or_else(|| DEFAULT_SUMMARY.to_string());
    let raw_markdown = text(obj, "rawMarkdown").unwrap_or_else(|| summary.clone());

    let research = Research {
        task_type: text(obj, "taskType").unwrap_or_else(|| DEFAULT_TASK_TYPE.to_string()),
        confidence: confidence(obj),
        quick_info: obj.get("quickInfo").and_then(Value::as_object).and_then(normalize_quick_info),
        key_actions: array(obj, "keyActions").iter().map(normalize_action).collect(),
        sources: array(obj, "sources").iter().map(normalize_source).collect(),
        options: obj.get("options").and_then(Value::as_array).map(|options| {
            options
                .iter()
                .enumerate()
                .map(|(index, option)| normalize_option(index, option))
                .collect()
        }),
        follow_up_question: text(obj, "followUpQuestion"),
        ui_type: text(obj, "uiType").and_then(|t| UiType::from_label(&t)),
        structured_data: obj.get("structuredData").filter(|v| v.is_object()).cloned(),
        summary,
        raw_markdown,
        researched_at: now_ms(),
    };

    debug!(
        task_type = %research.task_type,
        actions = research.key_actions.len(),
        sources = research.sources.len(),
        options = research.options.as_ref().map(Vec::len),
        "normalize_research: done"
    );
    research
}

fn normalize_quick_info(obj: &Map<String, Value>) -> Option<QuickInfo> {
    let info = QuickInfo {
        phone: text(obj, "phone"),
        phone_formatted: text(obj, "phoneFormatted"),
        hours: text(obj, "hours"),
        address: text(obj, "address"),
        website: text(obj, "website"),
        price: text(obj, "price"),
        details: text(obj, "details"),
    };
    if info.is_empty() { None } else { Some(info) }
}

fn normalize_action(value: &Value) -> Action {
    let obj = as_object(value);
    Action {
        label: text(obj, "label").unwrap_or_else(|| DEFAULT_ACTION_LABEL.to_string()),
        kind: text(obj, "type")
            .and_then(|t| ActionType::from_label(&t))
            .unwrap_or_default(),
        value: text(obj, "value").unwrap_or_else(|| DEFAULT_ACTION_VALUE.to_string()),
        is_primary: obj.get("isPrimary").is_some_and(is_truthy),
    }
}

fn normalize_source(value: &Value) -> SourceReference {
    let obj = as_object(value);
    SourceReference {
        title: text(obj, "title").unwrap_or_else(|| DEFAULT_SOURCE_TITLE.to_string()),
        url: text(obj, "url"),
        kind: text(obj, "type")
            .and_then(|t| SourceType::from_label(&t))
            .unwrap_or_default(),
        confidence: confidence(obj),
        snippet: text(obj, "snippet"),
    }
}

fn normalize_option(index: usize, value: &Value) -> OptionCard {
    let obj = as_object(value);
    OptionCard {
        id: text(obj, "id").unwrap_or_else(|| format!("option-{}", index)),
        title: text(obj, "title").unwrap_or_else(|| DEFAULT_OPTION_TITLE.to_string()),
        subtitle: text(obj, "subtitle"),
        price: text(obj, "price"),
        price_value: obj.get("priceValue").and_then(number),
        details: array(obj, "details").iter().filter_map(scalar_text).collect(),
        badge: text(obj, "badge"),
        action_label: text(obj, "actionLabel").unwrap_or_else(|| DEFAULT_OPTION_ACTION_LABEL.to_string()),
        action_url: text(obj, "actionUrl").unwrap_or_else(|| DEFAULT_OPTION_ACTION_URL.to_string()),
        provider: text(obj, "provider"),
    }
}

fn confidence(obj: &Map<String, Value>) -> Confidence {
    text(obj, "confidence")
        .and_then(|c| Confidence::from_label(&c))
        .unwrap_or_default()
}

/// Non-empty text under `key`; numbers and booleans are stringified
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }
}

fn array<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    obj.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn as_object(value: &Value) -> &Map<String, Value> {
    static EMPTY: std::sync::LazyLock<Map<String, Value>> = std::sync::LazyLock::new(Map::new);
    value.as_object().unwrap_or(&EMPTY)
}

/// JavaScript-style truthiness, the way the model's JSON is meant to be read
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn research(raw: &str) -> Research {
        match parse(raw).unwrap() {
            ParsedResearch::Research(research) => research,
            ParsedResearch::Personal => panic!("expected research, got personal"),
        }
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("Sure: {\"a\":1} bye"), Some("{\"a\":1}"));
        assert_eq!(extract_json("{\"a\":{\"b\":2}}"), Some("{\"a\":{\"b\":2}}"));
        assert_eq!(extract_json("no braces"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_no_json_found() {
        let err = parse("I could not find anything useful.").unwrap_err();
        assert!(matches!(err, ParseError::NoJsonFound));
        assert_eq!(err.to_string(), "no JSON found");
    }

    #[test]
    fn test_malformed_json() {
        let err = parse("here {\"isPersonal\": fals} done").unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn test_personal_sentinel() {
        assert_eq!(parse("{\"isPersonal\": true}").unwrap(), ParsedResearch::Personal);
        assert_eq!(parse("{\"isPersonal\": 1, \"research\": {}}").unwrap(), ParsedResearch::Personal);
        assert_eq!(parse("{\"isPersonal\": \"yes\"}").unwrap(), ParsedResearch::Personal);
        assert!(matches!(parse("{\"isPersonal\": 0}").unwrap(), ParsedResearch::Research(_)));
        assert!(matches!(parse("{\"isPersonal\": \"\"}").unwrap(), ParsedResearch::Research(_)));
    }

    #[test]
    fn test_prose_wrapped_json() {
        let raw = "Sure, here it is: {\"isPersonal\": false, \"research\": {\"summary\": \"Open today\"}} Hope that helps!";
        let research = research(raw);
        assert_eq!(research.summary, "Open today");
        assert_eq!(research.raw_markdown, "Open today");
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"isPersonal\": false, \"research\": {\"summary\": \"Fenced\"}}\n```";
        assert_eq!(research(raw).summary, "Fenced");
    }

    #[test]
    fn test_defaults_for_empty_research() {
        let research = research("{\"isPersonal\": false}");
        assert_eq!(research.summary, DEFAULT_SUMMARY);
        assert_eq!(research.raw_markdown, DEFAULT_SUMMARY);
        assert_eq!(research.task_type, "general");
        assert_eq!(research.confidence, Confidence::Medium);
        assert!(research.quick_info.is_none());
        assert!(research.key_actions.is_empty());
        assert!(research.sources.is_empty());
        assert!(research.options.is_none());
        assert!(research.follow_up_question.is_none());
        assert!(research.ui_type.is_none());
        assert!(research.researched_at > 0);
    }

    #[test]
    fn test_action_defaults() {
        let raw = json!({
            "research": {
                "keyActions": [
                    {},
                    {"label": "Call", "type": "phone", "value": "tel:+15551234567", "isPrimary": true},
                    {"type": "fax", "label": ""},
                    "not an object"
                ]
            }
        })
        .to_string();
        let actions = research(&raw).key_actions;

        assert_eq!(actions.len(), 4);
        assert_eq!(actions[0].label, "Action");
        assert_eq!(actions[0].kind, ActionType::Link);
        assert_eq!(actions[0].value, "#");
        assert!(!actions[0].is_primary);

        assert_eq!(actions[1].label, "Call");
        assert_eq!(actions[1].kind, ActionType::Phone);
        assert!(actions[1].is_primary);

        assert_eq!(actions[2].label, "Action");
        assert_eq!(actions[2].kind, ActionType::Link);
        assert_eq!(actions[3].value, "#");
    }

    #[test]
    fn test_source_defaults() {
        let raw = json!({
            "research": {
                "sources": [
                    {},
                    {"title": "ADA", "url": "https://ada.org", "type": "document", "confidence": "high", "snippet": "Find a dentist"}
                ]
            }
        })
        .to_string();
        let sources = research(&raw).sources;

        assert_eq!(sources[0].title, "Source");
        assert_eq!(sources[0].url, None);
        assert_eq!(sources[0].kind, SourceType::Web);
        assert_eq!(sources[0].confidence, Confidence::Medium);
        assert_eq!(sources[0].snippet, None);

        assert_eq!(sources[1].url.as_deref(), Some("https://ada.org"));
        assert_eq!(sources[1].kind, SourceType::Document);
        assert_eq!(sources[1].confidence, Confidence::High);
    }

    #[test]
    fn test_option_defaults() {
        let raw = json!({
            "research": {
                "uiType": "options_list",
                "options": [
                    {"title": "United", "price": "$382", "priceValue": 382, "details": ["Nonstop", 4]},
                    {"id": "cheap", "title": "Delta", "priceValue": "$1,204.50", "actionLabel": "Book", "actionUrl": "https://delta.com"}
                ]
            }
        })
        .to_string();
        let research = research(&raw);
        let options = research.options.unwrap();

        assert_eq!(research.ui_type, Some(UiType::OptionsList));
        assert_eq!(options[0].id, "option-0");
        assert_eq!(options[0].action_label, "Select");
        assert_eq!(options[0].action_url, "#");
        assert_eq!(options[0].price_value, Some(382.0));
        assert_eq!(options[0].details, vec!["Nonstop", "4"]);
        assert_eq!(options[1].id, "cheap");
        assert_eq!(options[1].price_value, Some(1204.5));
        assert_eq!(options[1].action_label, "Book");
    }

    #[test]
    fn test_unknown_enums_fall_back() {
        let raw = json!({
            "research": {"confidence": "certain", "uiType": "carousel"}
        })
        .to_string();
        let research = research(&raw);
        assert_eq!(research.confidence, Confidence::Medium);
        assert!(research.ui_type.is_none());
    }

    #[test]
    fn test_top_level_fields_without_research_wrapper() {
        let research = research("{\"summary\": \"Flat shape\", \"taskType\": \"travel\"}");
        assert_eq!(research.summary, "Flat shape");
        assert_eq!(research.task_type, "travel");
    }

    #[test]
    fn test_researched_at_is_local() {
        let research = research("{\"research\": {\"researchedAt\": 5}}");
        assert!(research.researched_at > 5);
    }

    #[test]
    fn test_explicit_fields_survive_reserialization() {
        let input = json!({
            "summary": "Dr. Smith Dental accepts new patients.",
            "taskType": "healthcare",
            "confidence": "high",
            "uiType": "contact_card",
            "quickInfo": {
                "phone": "tel:+15551234567",
                "phoneFormatted": "(555) 123-4567",
                "hours": "Mon-Fri 8am-5pm",
                "address": "1 Main St",
                "website": "https://smithdental.example",
                "price": "$120",
                "details": "Accepts Delta Dental"
            },
            "keyActions": [
                {"label": "Call Office", "type": "phone", "value": "tel:+15551234567", "isPrimary": true},
                {"label": "Email", "type": "email", "value": "mailto:front@smithdental.example", "isPrimary": false}
            ],
            "sources": [
                {"title": "Yelp", "url": "https://yelp.example", "type": "web", "confidence": "low", "snippet": "Great staff"}
            ],
            "options": [
                {"id": "a", "title": "Smith", "subtitle": "Downtown", "price": "$120", "priceValue": 120.0,
                 "details": ["Open Sat"], "badge": "Closest", "actionLabel": "Book", "actionUrl": "https://book.example",
                 "provider": "Zocdoc"}
            ],
            "followUpQuestion": "Do you need a weekend slot?",
            "structuredData": {"insurance": ["Delta"]},
            "rawMarkdown": "# Smith Dental\nCall ahead."
        });
        let raw = json!({"isPersonal": false, "research": input}).to_string();
        let output = serde_json::to_value(research(&raw)).unwrap();

        for (key, value) in input.as_object().unwrap() {
            assert_eq!(&output[key], value, "field {key} changed");
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_panics_on_arbitrary_text(raw in ".{0,200}") {
                let _ = parse(&raw);
            }

            #[test]
            fn summary_never_empty(summary in "[ a-z]{0,20}") {
                let raw = json!({"research": {"summary": summary}}).to_string();
                if let Ok(ParsedResearch::Research(research)) = parse(&raw) {
                    prop_assert!(!research.summary.trim().is_empty());
                    prop_assert!(!research.raw_markdown.is_empty());
                }
            }

            #[test]
            fn embedded_object_found_in_prose(prefix in "[a-zA-Z ,.!]{0,30}", suffix in "[a-zA-Z ,.!]{0,30}") {
                let raw = format!("{}{{\"isPersonal\": true}}{}", prefix, suffix);
                prop_assert_eq!(parse(&raw).unwrap(), ParsedResearch::Personal);
            }
        }
    }
}
