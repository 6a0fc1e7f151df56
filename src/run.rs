use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::element::{ActionVerb, ElementKind};
use crate::error::Result;

/// One dispatched action. Appended once, never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub step: u32,
    pub action: ActionVerb,
    pub description: String,
    #[serde(rename = "element_type")]
    pub kind: ElementKind,
    /// Click target, the center of the element's bounding box.
    pub coordinates: (u32, u32),
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalReason {
    /// The reasoner declared the goal achieved.
    Succeeded,
    /// The reasoner declared the goal unachievable.
    Failed,
    /// The step budget ran out first.
    MaxSteps,
    /// The session broke; see [`NavigationRun::error`].
    Error,
}

/// Loop phase a non-fatal error was absorbed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Detect,
    Reason,
    Execute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepError {
    pub step: u32,
    pub phase: Phase,
    pub message: String,
}

/// State of one `navigate(url, goal)` call. Owned by the loop while it runs;
/// treat it as read-only once [`NavigationRun::is_terminal`] is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationRun {
    pub run_id: Uuid,
    pub goal: String,
    pub start_url: String,
    pub current_url: String,
    /// Completed iterations.
    pub steps: u32,
    pub step_budget: u32,
    pub history: Vec<ActionRecord>,
    pub terminal_reason: Option<TerminalReason>,
    /// Fatal error text, set only with [`TerminalReason::Error`].
    pub error: Option<String>,
    /// Raw reasoner output of the latest step.
    pub last_reasoning: String,
    pub step_errors: Vec<StepError>,
    pub screenshots: Vec<PathBuf>,
    /// Screenshots with the detected boxes drawn in.
    #[serde(default)]
    pub annotated_screenshots: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl NavigationRun {
    pub fn new(goal: impl Into<String>, start_url: impl Into<String>, step_budget: u32) -> Self {
        let start_url = start_url.into();
        Self {
            run_id: Uuid::new_v4(),
            goal: goal.into(),
            current_url: start_url.clone(),
            start_url,
            steps: 0,
            step_budget,
            history: Vec::new(),
            terminal_reason: None,
            error: None,
            last_reasoning: String::new(),
            step_errors: Vec::new(),
            screenshots: Vec::new(),
            annotated_screenshots: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_reason.is_some()
    }

    /// True only for an explicit "succeeded" verdict.
    pub fn succeeded(&self) -> bool {
        self.terminal_reason == Some(TerminalReason::Succeeded)
    }

    pub(crate) fn finish(&mut self, reason: TerminalReason) {
        if self.is_terminal() {
            return;
        }
        self.terminal_reason = Some(reason);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn abort(&mut self, error: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.error = Some(error.into());
        self.finish(TerminalReason::Error);
    }

    pub(crate) fn note(&mut self, phase: Phase, message: impl Into<String>) {
        self.step_errors.push(StepError {
            step: self.steps + 1,
            phase,
            message: message.into(),
        });
    }

    pub fn duration_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Stable JSON view consumed by benchmarking and dashboards.
    pub fn record(&self) -> RunRecord<'_> {
        RunRecord {
            run_id: self.run_id,
            goal: &self.goal,
            url: &self.start_url,
            final_url: &self.current_url,
            steps: self.steps,
            success: self.succeeded(),
            reason: self.terminal_reason,
            history: &self.history,
            error: self.error.as_deref(),
            step_errors: &self.step_errors,
            started_at: self.started_at,
            finished_at: self.finished_at,
            duration_seconds: self.duration_seconds(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.record())?)
    }

    /// Write the run record to `path`, creating parent directories.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json()?).await?;
        tracing::debug!(path = %path.display(), run_id = %self.run_id, "run record saved");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RunRecord<'a> {
    pub run_id: Uuid,
    pub goal: &'a str,
    pub url: &'a str,
    pub final_url: &'a str,
    pub steps: u32,
    pub success: bool,
    pub reason: Option<TerminalReason>,
    pub history: &'a [ActionRecord],
    pub error: Option<&'a str>,
    pub step_errors: &'a [StepError],
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_terminal_reason_wins() {
        let mut run = NavigationRun::new("g", "https://example.com", 3);
        assert!(!run.is_terminal());
        run.abort("screenshot failed");
        run.finish(TerminalReason::Succeeded);
        assert_eq!(run.terminal_reason, Some(TerminalReason::Error));
        assert_eq!(run.error.as_deref(), Some("screenshot failed"));
        assert!(!run.succeeded());
    }

    #[test]
    fn record_uses_kebab_case_reasons() {
        let mut run = NavigationRun::new("g", "https://example.com", 1);
        run.steps = 1;
        run.finish(TerminalReason::MaxSteps);
        let json: serde_json::Value = serde_json::from_str(&run.to_json().unwrap()).unwrap();
        assert_eq!(json["reason"], "max-steps");
        assert_eq!(json["success"], false);
        assert_eq!(json["steps"], 1);
        assert_eq!(json["url"], "https://example.com");
    }
}
