//! Model response parsing
//!
//! 모델 출력에서 JSON 객체를 꺼내고, 빠진 필드는 종류별 기본값으로 채운다.
//! 파싱에 실패하면 `parsing_error` 표시가 붙은 최소 결과를 돌려준다.

use brainlift_foundation::AgentKind;
use serde_json::{json, Map, Value};

pub const PARSING_ERROR_MESSAGE: &str = "Failed to parse JSON response";

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Per-kind defaults
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDefaults {
    /// Filled into a parsed object when the key is missing
    pub fill: Map<String, Value>,
    /// Result body when nothing parses
    pub fallback: Map<String, Value>,
}

impl ResponseDefaults {
    pub fn for_kind(kind: AgentKind) -> Self {
        let (fill, fallback) = match kind {
            AgentKind::Security => (
                json!({
                    "severity": "unknown",
                    "vulnerabilities": [],
                    "security_score": 50,
                }),
                json!({ "severity": "unknown", "security_score": 50 }),
            ),
            AgentKind::Quality => (
                json!({
                    "quality_score": 70,
                    "issues": [],
                    "metrics": {
                        "complexity": "medium",
                        "readability": "fair",
                        "maintainability": "medium",
                    },
                    "positive_aspects": [],
                }),
                json!({ "quality_score": 50 }),
            ),
            AgentKind::Documentation => (
                json!({
                    "documentation_score": 50,
                    "missing_docs": [],
                    "suggested_readme_updates": [],
                    "changelog_entry": "Code changes made",
                    "inline_comments_needed": [],
                    "existing_docs_quality": "fair",
                }),
                json!({ "documentation_score": 0 }),
            ),
        };

        Self {
            fill: into_map(fill),
            fallback: into_map(fallback),
        }
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Extract the analysis object from raw model text
pub fn parse_analysis(raw: &str, defaults: &ResponseDefaults) -> Value {
    match extract_object(raw) {
        Some(mut object) => {
            for (key, value) in &defaults.fill {
                object.entry(key.clone()).or_insert_with(|| value.clone());
            }
            Value::Object(object)
        }
        None => {
            let mut object = defaults.fallback.clone();
            object.insert("raw_response".into(), Value::String(raw.to_string()));
            object.insert(
                "parsing_error".into(),
                Value::String(PARSING_ERROR_MESSAGE.to_string()),
            );
            Value::Object(object)
        }
    }
}

/// Whether `parse_analysis` fell back
pub fn has_parsing_error(analysis: &Value) -> bool {
    analysis.get("parsing_error").is_some()
}

fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let candidate = match raw.find(JSON_FENCE) {
        Some(start) => {
            let body = &raw[start + JSON_FENCE.len()..];
            let end = body.find(FENCE).unwrap_or(body.len());
            &body[..end]
        }
        None => {
            let start = raw.find('{')?;
            let end = raw.rfind('}')?;
            if end < start {
                return None;
            }
            &raw[start..=end]
        }
    };

    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json() {
        let raw = "Here you go:\n```json\n{\"severity\": \"high\", \"security_score\": 20}\n```\nDone.";
        let parsed = parse_analysis(raw, &ResponseDefaults::for_kind(AgentKind::Security));

        assert_eq!(parsed["severity"], "high");
        assert_eq!(parsed["security_score"], 20);
        assert_eq!(parsed["vulnerabilities"], json!([]));
        assert!(!has_parsing_error(&parsed));
    }

    #[test]
    fn test_bare_object_with_prose() {
        let raw = "Analysis: {\"quality_score\": 85} thanks";
        let parsed = parse_analysis(raw, &ResponseDefaults::for_kind(AgentKind::Quality));

        assert_eq!(parsed["quality_score"], 85);
        assert_eq!(parsed["metrics"]["readability"], "fair");
    }

    #[test]
    fn test_fallback_marks_parsing_error() {
        let parsed = parse_analysis(
            "not json at all",
            &ResponseDefaults::for_kind(AgentKind::Documentation),
        );

        assert!(has_parsing_error(&parsed));
        assert_eq!(parsed["documentation_score"], 0);
        assert_eq!(parsed["raw_response"], "not json at all");
        assert_eq!(parsed["parsing_error"], PARSING_ERROR_MESSAGE);
    }

    #[test]
    fn test_non_object_json_falls_back() {
        let parsed = parse_analysis(
            "```json\n[1, 2]\n```",
            &ResponseDefaults::for_kind(AgentKind::Security),
        );
        assert!(has_parsing_error(&parsed));
        assert_eq!(parsed["severity"], "unknown");
    }

    #[test]
    fn test_reversed_braces() {
        let parsed = parse_analysis("} oops {", &ResponseDefaults::for_kind(AgentKind::Quality));
        assert!(has_parsing_error(&parsed));
    }
}
