use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Confidence assumed when the detector omits one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Kind of interactive element reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Button,
    Link,
    Input,
    Dropdown,
    Other,
}

impl ElementKind {
    /// Lenient parse of a detector label. Unknown labels map to `Other`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "button" | "btn" | "submit" => Self::Button,
            "link" | "a" | "anchor" | "hyperlink" => Self::Link,
            "input" | "textbox" | "text field" | "textarea" | "search" | "search box" => Self::Input,
            "dropdown" | "select" | "combobox" | "menu" => Self::Dropdown,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Link => "link",
            Self::Input => "input",
            Self::Dropdown => "dropdown",
            Self::Other => "other",
        }
    }
}

/// Action the detector suggests for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionVerb {
    Click,
    Type,
    Scroll,
}

impl ActionVerb {
    /// Parse a detector verb; anything absent or unrecognized becomes `Click`.
    pub fn parse(verb: Option<&str>) -> Self {
        match verb.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("type") | Some("fill") | Some("input") | Some("enter text") => Self::Type,
            Some("scroll") | Some("scroll down") => Self::Scroll,
            _ => Self::Click,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Type => "type",
            Self::Scroll => "scroll",
        }
    }
}

/// Page-relative pixel rectangle. Serialized as `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "[u32; 4]", from = "[u32; 4]")]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

impl From<[u32; 4]> for BoundingBox {
    fn from([x, y, width, height]: [u32; 4]) -> Self {
        Self { x, y, width, height }
    }
}

impl BoundingBox {
    /// Placeholder for a missing or unusable box.
    pub const ZERO: BoundingBox = BoundingBox { x: 0, y: 0, width: 0, height: 0 };

    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Integer center point, used as the click target.
    pub fn center(&self) -> (u32, u32) {
        (
            self.x.saturating_add(self.width / 2),
            self.y.saturating_add(self.height / 2),
        )
    }

    /// Parse an untrusted box: `[x, y, w, h]` or `{x, y, width, height}`.
    /// Negative origins clamp to zero; anything else malformed yields `ZERO`.
    pub fn from_value(value: &Value) -> Self {
        let parts = match value {
            Value::Array(items) if items.len() == 4 => {
                items.iter().map(Value::as_f64).collect::<Option<Vec<f64>>>()
            }
            Value::Object(map) => {
                let field = |names: &[&str]| names.iter().find_map(|n| map.get(*n).and_then(Value::as_f64));
                match (
                    field(&["x", "left"]),
                    field(&["y", "top"]),
                    field(&["width", "w"]),
                    field(&["height", "h"]),
                ) {
                    (Some(x), Some(y), Some(w), Some(h)) => Some(vec![x, y, w, h]),
                    _ => None,
                }
            }
            _ => None,
        };

        let Some(parts) = parts else {
            return Self::ZERO;
        };
        if parts.iter().any(|p| !p.is_finite()) || parts[2] <= 0.0 || parts[3] <= 0.0 {
            return Self::ZERO;
        }

        // float-to-int casts saturate, so oversized values clamp to u32::MAX
        let bbox = Self {
            x: parts[0].max(0.0).round() as u32,
            y: parts[1].max(0.0).round() as u32,
            width: parts[2].round() as u32,
            height: parts[3].round() as u32,
        };
        if bbox.is_valid() {
            bbox
        } else {
            Self::ZERO
        }
    }
}

/// A validated candidate element from one detection pass.
///
/// Elements carry no identity across steps; each detection replaces the
/// previous set wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedElement {
    #[serde(rename = "element_type")]
    pub kind: ElementKind,
    pub description: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    pub reasoning: String,
    pub action: ActionVerb,
}

impl DetectedElement {
    /// Whether the element has a usable box and may be offered to the reasoner.
    pub fn is_actionable(&self) -> bool {
        self.bounding_box.is_valid()
    }

    pub fn center(&self) -> (u32, u32) {
        self.bounding_box.center()
    }
}

/// Wire form of a detector record: the raw JSON object, read field by field
/// in [`RawElement::validate`]. Each field may appear under several names;
/// the first non-null one wins, so a record carrying both `description` and
/// `text` is still accepted.
#[derive(Debug, Clone, Default)]
pub struct RawElement(Map<String, Value>);

const KIND_KEYS: &[&str] = &["element_type", "type", "kind"];
const DESCRIPTION_KEYS: &[&str] = &["description", "text", "label"];
const CONFIDENCE_KEYS: &[&str] = &["confidence"];
const BOX_KEYS: &[&str] = &["bounding_box", "bbox", "box"];
const REASONING_KEYS: &[&str] = &["reasoning", "rationale", "reason"];
const ACTION_KEYS: &[&str] = &["action", "suggested_action"];

impl RawElement {
    /// `None` unless `value` is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    fn field(&self, names: &[&str]) -> Option<&Value> {
        names
            .iter()
            .find_map(|n| self.0.get(*n).filter(|v| !v.is_null()))
    }

    fn text(&self, names: &[&str]) -> Option<String> {
        match self.field(names)? {
            Value::String(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn validate(&self) -> DetectedElement {
        let kind = self
            .text(KIND_KEYS)
            .map(|t| ElementKind::parse(&t))
            .unwrap_or(ElementKind::Other);
        let action = ActionVerb::parse(self.text(ACTION_KEYS).as_deref());
        let bounding_box = self
            .field(BOX_KEYS)
            .map(BoundingBox::from_value)
            .unwrap_or(BoundingBox::ZERO);

        DetectedElement {
            kind,
            description: self.text(DESCRIPTION_KEYS).unwrap_or_default(),
            confidence: coerce_confidence(self.field(CONFIDENCE_KEYS)),
            bounding_box,
            reasoning: self.text(REASONING_KEYS).unwrap_or_default(),
            action,
        }
    }
}

/// Numbers and numeric strings are accepted; the result always lies in [0, 1].
pub fn coerce_confidence(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

/// Validate each record independently. Records that are not JSON objects are
/// logged and dropped; the rest are always kept, even with unusable boxes.
pub fn validate_elements(items: Vec<Value>) -> Vec<DetectedElement> {
    let total = items.len();
    let elements: Vec<DetectedElement> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match RawElement::from_value(item) {
            Some(raw) => Some(raw.validate()),
            None => {
                tracing::warn!(index = i, "skipping detector record that is not a JSON object");
                None
            }
        })
        .collect();
    if elements.len() < total {
        tracing::debug!(kept = elements.len(), total, "detector records validated");
    }
    elements
}

/// How candidates are ordered before the cap is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidateOrder {
    /// Keep the order the detector returned.
    #[default]
    DetectorOrder,
    /// Highest confidence first; ties keep detector order.
    ConfidenceRanked,
}

/// Build the candidate set shown to the reasoner: actionable elements only,
/// ordered by `order`, at most `cap` of them.
pub fn select_candidates(
    elements: &[DetectedElement],
    order: CandidateOrder,
    cap: usize,
) -> Vec<DetectedElement> {
    let mut candidates: Vec<DetectedElement> = elements
        .iter()
        .filter(|e| e.is_actionable())
        .cloned()
        .collect();
    if order == CandidateOrder::ConfidenceRanked {
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    }
    candidates.truncate(cap);
    candidates
}
