use std::fmt::Write as _;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::element::DetectedElement;
use crate::error::Result;
use crate::llm::{ChatClient, ChatMessage};
use crate::run::ActionRecord;

const SYSTEM_PROMPT: &str = "You are an expert web navigation assistant.";

/// Everything the reasoner sees for one step.
#[derive(Debug, Clone, Copy)]
pub struct ReasoningContext<'a> {
    pub goal: &'a str,
    pub current_url: &'a str,
    /// 1-based index of the step being decided.
    pub step: u32,
    pub step_budget: u32,
    /// Most recent action records, oldest first.
    pub history: &'a [ActionRecord],
    pub candidates: &'a [DetectedElement],
}

/// Picks at most one candidate and says whether the run should go on.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn decide(&self, ctx: ReasoningContext<'_>) -> Result<Verdict>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    #[default]
    Continue,
    Succeeded,
    Failed,
}

impl VerdictStatus {
    /// Case-insensitive keyword match; unknown keywords mean `Continue`.
    pub fn parse(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "achieved" | "succeeded" | "success" | "successful" | "done" | "complete"
            | "completed" => Self::Succeeded,
            "failed" | "fail" | "failure" | "unachievable" | "impossible" => Self::Failed,
            _ => Self::Continue,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Per-step decision of the reasoner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Verdict {
    /// Index into the candidate list that was shown to the reasoner.
    pub chosen: Option<usize>,
    pub status: VerdictStatus,
    pub rationale: String,
    /// Text to enter after focusing a `type` target.
    pub text: Option<String>,
    /// Unparsed model output.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerdictParseError {
    #[error("no STATUS field in reasoner output")]
    MissingStatus,
    #[error("element index {index} out of range for {count} candidates")]
    IndexOutOfRange { index: usize, count: usize },
}

static INDEX_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*_#>-]*(?:element[_ ]?)?index[\s*_]*[:=][\s*_]*(-?\d+|none|null|n/a)")
        .expect("static regex")
});
static STATUS_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*_#>-]*status[\s*_]*[:=][\s*_]*([a-z_-]+)").expect("static regex")
});
static REASONING_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ims)^[\s*_#>-]*(?:reasoning|rationale)[\s*_]*[:=][\s*_]*(.*?)\s*(?:^[\s*_#>-]*text[\s*_]*[:=]|\z)",
    )
    .expect("static regex")
});
static TEXT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*_#>-]*text[\s*_]*[:=][ \t*_]*(.*)$").expect("static regex")
});

impl Verdict {
    /// "Continue, act on nothing", used whenever a decision is unusable.
    pub fn skip(rationale: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            chosen: None,
            status: VerdictStatus::Continue,
            rationale: rationale.into(),
            text: None,
            raw: raw.into(),
        }
    }

    /// Parse labeled fields out of free text. Field labels are matched at the
    /// start of a line, case-insensitively, ignoring markdown decoration.
    pub fn parse(raw: &str, candidate_count: usize) -> std::result::Result<Self, VerdictParseError> {
        let status = STATUS_FIELD
            .captures(raw)
            .map(|c| VerdictStatus::parse(&c[1]))
            .ok_or(VerdictParseError::MissingStatus)?;

        let chosen = match INDEX_FIELD.captures(raw) {
            Some(c) => match c[1].parse::<i64>() {
                Ok(i) if i >= 0 => {
                    let index = i as usize;
                    if index >= candidate_count {
                        return Err(VerdictParseError::IndexOutOfRange {
                            index,
                            count: candidate_count,
                        });
                    }
                    Some(index)
                }
                _ => None,
            },
            None => None,
        };

        let rationale = REASONING_FIELD
            .captures(raw)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default();

        let text = TEXT_FIELD
            .captures(raw)
            .map(|c| c[1].trim().trim_matches('"').trim().to_string())
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("none"))
            // echoed template placeholder
            .filter(|t| !(t.starts_with('<') && t.ends_with('>')));

        Ok(Self {
            chosen,
            status,
            rationale,
            text,
            raw: raw.to_string(),
        })
    }

    /// [`Verdict::parse`], degrading any parse failure to [`Verdict::skip`].
    pub fn parse_or_skip(raw: &str, candidate_count: usize) -> Self {
        Self::parse(raw, candidate_count).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "unusable reasoner output, skipping step");
            Self::skip(format!("unparsed reasoner output: {e}"), raw)
        })
    }
}

/// Build the reasoning prompt. Output depends only on `ctx`.
pub fn build_reasoning_prompt(ctx: &ReasoningContext<'_>) -> String {
    let mut history = String::new();
    for record in ctx.history {
        let _ = writeln!(
            history,
            "Step {}: {} on {}",
            record.step,
            record.action.as_str(),
            record.description
        );
    }
    if history.is_empty() {
        history.push_str("None yet\n");
    }

    let mut elements = String::new();
    for (i, e) in ctx.candidates.iter().enumerate() {
        let _ = writeln!(
            elements,
            "{i}. {}: {} (confidence: {:.2}, action: {})",
            e.kind.as_str(),
            e.description,
            e.confidence,
            e.action.as_str()
        );
    }
    if elements.is_empty() {
        elements.push_str("No elements detected\n");
    }

    let index_hint = match ctx.candidates.len() {
        0 => "-1, no elements are available".to_string(),
        n => format!("0-{}, or -1 if none is suitable", n - 1),
    };

    format!(
        "You are a web navigation assistant working towards a goal.

Goal: {goal}
Current URL: {url}
Step: {step}/{budget}

Recent Actions:
{history}
Detected Elements:
{elements}
Based on the goal and current state, decide:
1. Which element should we interact with next? (index {index_hint})
2. Is the goal achieved or unachievable?
3. Reasoning for your decision
4. If the chosen element needs typed input, the exact text to enter

Respond in this format:
ELEMENT_INDEX: <number or -1 if none suitable>
STATUS: continue/achieved/failed
REASONING: <your reasoning>
TEXT: <text to type, or leave empty>
",
        goal = ctx.goal,
        url = ctx.current_url,
        step = ctx.step,
        budget = ctx.step_budget,
    )
}

/// Reasoner backed by a text chat model.
pub struct LlmReasoner {
    client: ChatClient,
}

impl LlmReasoner {
    pub fn new(config: ModelConfig) -> Result<Self> {
        Ok(Self {
            client: ChatClient::new(config)?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ModelConfig::reasoner_from_env()?)
    }
}

#[async_trait]
impl Reasoner for LlmReasoner {
    async fn decide(&self, ctx: ReasoningContext<'_>) -> Result<Verdict> {
        let prompt = build_reasoning_prompt(&ctx);
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let content = self.client.complete(&messages).await?;
        Ok(Verdict::parse_or_skip(&content, ctx.candidates.len()))
    }
}
