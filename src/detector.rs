use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::config::ModelConfig;
use crate::element::{validate_elements, DetectedElement};
use crate::error::Result;
use crate::llm::{ChatClient, ChatMessage, ContentPart};

/// Produces candidate elements from a screenshot and a goal.
///
/// Implementations must not fail on malformed model output; they log it and
/// return whatever subset validated. An `Err` is reserved for transport
/// failures, which the loop absorbs as an empty candidate set.
#[async_trait]
pub trait ElementDetector: Send + Sync {
    async fn detect(
        &self,
        image: &[u8],
        goal: &str,
        context: Option<&str>,
    ) -> Result<Vec<DetectedElement>>;
}

/// Detector backed by a multimodal chat model.
pub struct VisionDetector {
    client: ChatClient,
}

impl VisionDetector {
    pub fn new(config: ModelConfig) -> Result<Self> {
        Ok(Self {
            client: ChatClient::new(config)?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ModelConfig::vision_from_env()?)
    }
}

#[async_trait]
impl ElementDetector for VisionDetector {
    async fn detect(
        &self,
        image: &[u8],
        goal: &str,
        context: Option<&str>,
    ) -> Result<Vec<DetectedElement>> {
        let prompt = build_analysis_prompt(goal, context);
        let message = ChatMessage::user_parts(vec![
            ContentPart::text(prompt),
            ContentPart::png(image, &self.client.config().image_detail),
        ]);

        let content = self.client.complete(&[message]).await?;
        let items = extract_json_elements(&content);
        if items.is_empty() {
            tracing::warn!(content_len = content.len(), "no element array found in vision response");
        }
        Ok(validate_elements(items))
    }
}

/// Deterministic analysis prompt for the vision model.
pub fn build_analysis_prompt(goal: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        "You are a web navigation assistant analyzing a screenshot of a webpage.

Goal: {goal}

Task: Identify the interactive elements (buttons, links, inputs, dropdowns) that could help achieve this goal.

For each element, provide:
1. Element type (button, link, input, dropdown, other)
2. Brief description (visible text or purpose)
3. Confidence score (0.0-1.0)
4. Bounding box (x, y, width, height) in pixels, relative to the screenshot
5. Reasoning for why this element is relevant
6. Recommended action (click, type, scroll)
"
    );

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("\nCurrent context: {context}\n"));
    }

    prompt.push_str(
        r#"
Respond in JSON format with an array of elements:
[
  {
    "element_type": "button",
    "description": "Login button",
    "confidence": 0.95,
    "bounding_box": [100, 200, 80, 40],
    "reasoning": "This button likely leads to authentication",
    "action": "click"
  }
]

Order elements from most to least relevant. Include pop-ups, cookie banners or other obstacles if present.
"#,
    );
    prompt
}

static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[\s\S]*\]").expect("static regex"));

/// Pull the element records out of free-form model text.
///
/// Tries, in order: the outermost `[...]` span, the whole text as an array,
/// and an object with an `elements` array. Returns an empty list otherwise.
pub fn extract_json_elements(content: &str) -> Vec<Value> {
    if let Some(m) = JSON_ARRAY.find(content) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(m.as_str()) {
            return items;
        }
    }

    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(mut map)) => match map.remove("elements") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_mentions_goal_and_context() {
        let prompt = build_analysis_prompt("Find login button", Some("Homepage"));
        assert!(prompt.contains("Find login button"));
        assert!(prompt.contains("Current context: Homepage"));
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn prompt_without_context() {
        let prompt = build_analysis_prompt("Find pricing", None);
        assert!(!prompt.contains("Current context"));
    }

    #[test]
    fn extracts_array_from_surrounding_text() {
        let content = r#"Sure! Here you go:
```json
[{"element_type": "link", "description": "Contact"}]
```
Let me know if you need more."#;
        let items = extract_json_elements(content);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["description"], "Contact");
    }

    #[test]
    fn extracts_elements_object() {
        let content = r#"{"elements": [{"element_type": "button"}, {"element_type": "input"}]}"#;
        assert_eq!(extract_json_elements(content).len(), 2);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(extract_json_elements("I cannot see any elements.").is_empty());
        assert!(extract_json_elements("[not json at all]").is_empty());
    }
}
