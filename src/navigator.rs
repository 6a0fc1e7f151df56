use std::path::PathBuf;

use crate::annotate::annotate_elements;
use crate::browser::AgenticBrowser;
use crate::config::{BrowserConfig, NavigatorConfig};
use crate::detector::{ElementDetector, VisionDetector};
use crate::element::{select_candidates, ActionVerb, DetectedElement};
use crate::error::Result;
use crate::executor::ActionExecutor;
use crate::reasoner::{LlmReasoner, Reasoner, ReasoningContext, Verdict, VerdictStatus};
use crate::run::{ActionRecord, NavigationRun, Phase, TerminalReason};
use crate::session::Session;

/// Goal-directed navigation loop.
///
/// Each step runs capture → detect → reason → execute → decide strictly in
/// sequence against one borrowed [`Session`]. Only a failed capture (or a
/// failed initial load) ends a run early with an error; detector, reasoner
/// and dispatch failures are recorded on the run and the loop moves on.
pub struct Navigator {
    detector: Box<dyn ElementDetector>,
    reasoner: Box<dyn Reasoner>,
    executor: ActionExecutor,
    config: NavigatorConfig,
    browser: BrowserConfig,
}

impl Navigator {
    pub fn new(
        detector: impl ElementDetector + 'static,
        reasoner: impl Reasoner + 'static,
        config: NavigatorConfig,
    ) -> Self {
        Self {
            detector: Box::new(detector),
            reasoner: Box::new(reasoner),
            executor: ActionExecutor::new(&config),
            config,
            browser: BrowserConfig::default(),
        }
    }

    /// Vision detector, LLM reasoner and loop settings from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            VisionDetector::from_env()?,
            LlmReasoner::from_env()?,
            NavigatorConfig::from_env()?,
        ))
    }

    /// Browser settings used by [`Navigator::navigate`].
    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Launch a browser, open `url`, run toward `goal`, and close the page
    /// and browser whatever the outcome.
    pub async fn navigate(&self, url: &str, goal: &str, step_budget: u32, headless: bool) -> NavigationRun {
        let mut browser_config = self.browser.clone();
        browser_config.headless = headless;

        let browser = match AgenticBrowser::launch(browser_config).await {
            Ok(browser) => browser,
            Err(e) => {
                tracing::error!(error = %e, "browser launch failed");
                let mut run = NavigationRun::new(goal, url, step_budget);
                run.abort(e.to_string());
                return run;
            }
        };

        let run = match browser.new_page("about:blank").await {
            Ok(mut page) => {
                let run = self.run_from(&mut page, url, goal, step_budget).await;
                if let Err(e) = Session::close(&mut page).await {
                    tracing::warn!(error = %e, "failed to close page");
                }
                run
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to open a page");
                let mut run = NavigationRun::new(goal, url, step_budget);
                run.abort(e.to_string());
                run
            }
        };

        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "failed to close browser");
        }
        run
    }

    /// Load `url` in the session, then [`Navigator::run`]. A failed load is fatal.
    pub async fn run_from<S>(&self, session: &mut S, url: &str, goal: &str, step_budget: u32) -> NavigationRun
    where
        S: Session + ?Sized,
    {
        let mut run = NavigationRun::new(goal, url, step_budget);
        if let Err(e) = session.open(url).await {
            tracing::error!(url, error = %e, "could not open starting url");
            run.abort(format!("failed to open {url}: {e}"));
            return run;
        }
        self.drive(session, &mut run).await;
        run
    }

    /// Run toward `goal` on an already-open session.
    pub async fn run<S>(&self, session: &mut S, goal: &str, step_budget: u32) -> NavigationRun
    where
        S: Session + ?Sized,
    {
        let start_url = session.current_url().await.unwrap_or_default();
        let mut run = NavigationRun::new(goal, start_url, step_budget);
        self.drive(session, &mut run).await;
        run
    }

    async fn drive<S>(&self, session: &mut S, run: &mut NavigationRun)
    where
        S: Session + ?Sized,
    {
        tracing::info!(
            run_id = %run.run_id,
            goal = %run.goal,
            url = %run.start_url,
            budget = run.step_budget,
            "navigation started"
        );

        while !run.is_terminal() {
            if run.steps >= run.step_budget {
                run.finish(TerminalReason::MaxSteps);
                break;
            }
            let step = run.steps + 1;

            // capture
            let screenshot = match session.screenshot().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(step, error = %e, "screenshot capture failed");
                    run.abort(format!("screenshot capture failed at step {step}: {e}"));
                    break;
                }
            };
            match session.current_url().await {
                Ok(url) => run.current_url = url,
                Err(e) => tracing::warn!(step, error = %e, "could not read current url"),
            }
            if let Some(path) = self.persist(run, step, "", &screenshot).await {
                run.screenshots.push(path);
            }

            // detect
            let context = detection_context(run, step);
            let detected = self.detector.detect(&screenshot, &run.goal, Some(&context)).await;
            let elements = match detected {
                Ok(elements) => elements,
                Err(e) => {
                    tracing::warn!(step, error = %e, "element detection failed, continuing with no candidates");
                    run.note(Phase::Detect, e.to_string());
                    Vec::new()
                }
            };
            let candidates = select_candidates(&elements, self.config.candidate_order, self.config.candidate_cap);
            tracing::debug!(step, detected = elements.len(), candidates = candidates.len(), "elements detected");
            self.persist_annotated(run, step, &screenshot, &elements).await;

            // reason
            let window_start = run.history.len().saturating_sub(self.config.history_window);
            let ctx = ReasoningContext {
                goal: &run.goal,
                current_url: &run.current_url,
                step,
                step_budget: run.step_budget,
                history: &run.history[window_start..],
                candidates: &candidates,
            };
            let decided = self.reasoner.decide(ctx).await;
            let verdict = match decided {
                Ok(verdict) => verdict,
                Err(e) => {
                    tracing::warn!(step, error = %e, "reasoner failed, skipping step");
                    run.note(Phase::Reason, e.to_string());
                    Verdict::skip(format!("reasoner unavailable: {e}"), "")
                }
            };
            run.last_reasoning = verdict.raw.clone();
            tracing::info!(
                step,
                chosen = ?verdict.chosen,
                status = ?verdict.status,
                rationale = %verdict.rationale,
                "verdict"
            );

            // execute
            if !verdict.status.is_terminal() {
                match verdict.chosen.and_then(|i| candidates.get(i)) {
                    Some(element) => {
                        let text = verdict.text.as_deref().filter(|_| element.action == ActionVerb::Type);
                        if let Err(e) = self.executor.execute(session, element, text).await {
                            tracing::warn!(step, error = %e, "action dispatch failed");
                            run.note(Phase::Execute, e.to_string());
                        }
                        let reasoning = if verdict.rationale.is_empty() {
                            element.reasoning.clone()
                        } else {
                            verdict.rationale.clone()
                        };
                        run.history.push(ActionRecord {
                            step,
                            action: element.action,
                            description: element.description.clone(),
                            kind: element.kind,
                            coordinates: element.center(),
                            reasoning,
                            text: text.map(str::to_string),
                        });
                    }
                    None => tracing::debug!(step, "no actionable choice, step is a no-op"),
                }
            }

            // decide
            run.steps = step;
            match verdict.status {
                VerdictStatus::Succeeded => run.finish(TerminalReason::Succeeded),
                VerdictStatus::Failed => run.finish(TerminalReason::Failed),
                VerdictStatus::Continue if run.steps >= run.step_budget => {
                    run.finish(TerminalReason::MaxSteps)
                }
                VerdictStatus::Continue => {}
            }
        }

        tracing::info!(
            run_id = %run.run_id,
            steps = run.steps,
            actions = run.history.len(),
            reason = ?run.terminal_reason,
            success = run.succeeded(),
            "navigation finished"
        );
    }

    /// Write `<run id>_step_<n><suffix>.png` into the screenshot directory.
    /// Failures are logged and yield `None`.
    async fn persist(&self, run: &NavigationRun, step: u32, suffix: &str, png: &[u8]) -> Option<PathBuf> {
        let dir = self.config.screenshot_dir.as_ref()?;
        let path = dir.join(format!("{}_step_{step}{suffix}.png", run.run_id));
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, png).await
        }
        .await;
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not save screenshot");
                None
            }
        }
    }

    async fn persist_annotated(
        &self,
        run: &mut NavigationRun,
        step: u32,
        screenshot: &[u8],
        elements: &[DetectedElement],
    ) {
        if !self.config.annotate_screenshots || self.config.screenshot_dir.is_none() {
            return;
        }
        let annotated = match annotate_elements(screenshot, elements) {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!(step, error = %e, "could not annotate screenshot");
                return;
            }
        };
        if let Some(path) = self.persist(run, step, "_annotated", &annotated).await {
            run.annotated_screenshots.push(path);
        }
    }
}

/// Short context line for the detector: step position and the previous verb.
fn detection_context(run: &NavigationRun, step: u32) -> String {
    let mut context = format!("Step {step}/{}", run.step_budget);
    if let Some(last) = run.history.last() {
        context.push_str(&format!(" | Last action: {}", last.action.as_str()));
    }
    context
}
