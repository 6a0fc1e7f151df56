use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vision_navigator::run::Phase;
use vision_navigator::{
    ActionVerb, AgenticBrowser, BoundingBox, DetectedElement, ElementDetector, ElementKind, Error, NavigationRun,
    Navigator, NavigatorConfig, Reasoner, ReasoningContext, Result, Session, TerminalReason,
    Verdict,
};

// ── Test doubles ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Open(String),
    Screenshot,
    Click(f64, f64),
    Scroll(i64, i64),
    Text(String),
    Close,
}

/// Session that records every call. Capture number `fail_capture_from`
/// (1-based) and every later capture fail.
#[derive(Default)]
struct FakeSession {
    events: Vec<Event>,
    captures: u32,
    fail_capture_from: Option<u32>,
    fail_open: bool,
    fail_input: bool,
    /// Bytes returned by every capture; a PNG signature stub when unset.
    frame: Option<Vec<u8>>,
}

impl FakeSession {
    fn failing_capture_at(n: u32) -> Self {
        Self {
            fail_capture_from: Some(n),
            ..Self::default()
        }
    }

    fn clicks(&self) -> Vec<(f64, f64)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Click(x, y) => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn open(&mut self, url: &str) -> Result<()> {
        if self.fail_open {
            return Err(Error::NavigationError("net::ERR_NAME_NOT_RESOLVED".into()));
        }
        self.events.push(Event::Open(url.to_string()));
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.captures += 1;
        if matches!(self.fail_capture_from, Some(n) if self.captures >= n) {
            return Err(Error::ScreenshotError("target closed".into()));
        }
        self.events.push(Event::Screenshot);
        Ok(self
            .frame
            .clone()
            .unwrap_or_else(|| vec![0x89, 0x50, 0x4E, 0x47]))
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok("https://shop.example/".to_string())
    }

    async fn dispatch_click(&mut self, x: f64, y: f64) -> Result<()> {
        if self.fail_input {
            return Err(Error::InputError("node detached".into()));
        }
        self.events.push(Event::Click(x, y));
        Ok(())
    }

    async fn dispatch_scroll(&mut self, dx: i64, dy: i64) -> Result<()> {
        self.events.push(Event::Scroll(dx, dy));
        Ok(())
    }

    async fn insert_text(&mut self, text: &str) -> Result<()> {
        self.events.push(Event::Text(text.to_string()));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.events.push(Event::Close);
        Ok(())
    }
}

/// Returns the same elements every step, or an error when `fail` is set.
struct FixedDetector {
    elements: Vec<DetectedElement>,
    fail: bool,
    contexts: Arc<Mutex<Vec<String>>>,
}

impl FixedDetector {
    fn new(elements: Vec<DetectedElement>) -> Self {
        Self {
            elements,
            fail: false,
            contexts: Arc::default(),
        }
    }
}

#[async_trait]
impl ElementDetector for FixedDetector {
    async fn detect(&self, _image: &[u8], _goal: &str, context: Option<&str>) -> Result<Vec<DetectedElement>> {
        self.contexts
            .lock()
            .unwrap()
            .push(context.unwrap_or_default().to_string());
        if self.fail {
            return Err(Error::ModelError("503 Service Unavailable".into()));
        }
        Ok(self.elements.clone())
    }
}

#[derive(Debug, Clone)]
struct Seen {
    history: usize,
    candidates: Vec<String>,
}

/// Replays scripted raw responses; the last one repeats once the script runs out.
struct ScriptedReasoner {
    script: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    fail: bool,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl ScriptedReasoner {
    fn new(script: &[&str]) -> Self {
        Self {
            script: Mutex::new(script.iter().map(|s| s.to_string()).collect()),
            last: Mutex::new(String::new()),
            fail: false,
            seen: Arc::default(),
        }
    }

    fn always(raw: &str) -> Self {
        Self::new(&[raw])
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn decide(&self, ctx: ReasoningContext<'_>) -> Result<Verdict> {
        self.seen.lock().unwrap().push(Seen {
            history: ctx.history.len(),
            candidates: ctx.candidates.iter().map(|c| c.description.clone()).collect(),
        });
        if self.fail {
            return Err(Error::ModelError("connection reset".into()));
        }
        let raw = {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.script.lock().unwrap().pop_front() {
                *last = next;
            }
            last.clone()
        };
        Ok(Verdict::parse_or_skip(&raw, ctx.candidates.len()))
    }
}

fn element(description: &str, bbox: [u32; 4], action: ActionVerb) -> DetectedElement {
    DetectedElement {
        kind: ElementKind::Button,
        description: description.to_string(),
        confidence: 0.9,
        bounding_box: BoundingBox::from(bbox),
        reasoning: format!("{description} looks relevant"),
        action,
    }
}

fn login_button() -> DetectedElement {
    element("Login button", [100, 200, 80, 40], ActionVerb::Click)
}

fn config() -> NavigatorConfig {
    NavigatorConfig::default().settle(Duration::ZERO, Duration::ZERO, Duration::ZERO)
}

const CONTINUE_FIRST: &str = "ELEMENT_INDEX: 0\nSTATUS: continue\nREASONING: try the first element";
const ACHIEVED: &str = "ELEMENT_INDEX: -1\nSTATUS: achieved\nREASONING: the goal is visible";

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_button_is_clicked_at_center() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::new(&[CONTINUE_FIRST, ACHIEVED]),
        config(),
    );
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "find the login button", 5).await;

    assert_eq!(session.clicks(), vec![(140.0, 220.0)]);
    assert_eq!(run.history.len(), 1);
    assert_eq!(run.history[0].coordinates, (140, 220));
    assert_eq!(run.history[0].description, "Login button");
    assert_eq!(run.history[0].step, 1);
    assert!(run.succeeded());
    assert_eq!(run.steps, 2);
}

#[tokio::test]
async fn test_budget_of_three_ends_with_max_steps() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always(CONTINUE_FIRST),
        config(),
    );
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "keep clicking", 3).await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::MaxSteps));
    assert!(!run.succeeded());
    assert_eq!(run.error, None);
    assert_eq!(run.steps, 3);
    assert_eq!(run.history.len(), 3);
    assert_eq!(session.captures, 3);
    let steps: Vec<u32> = run.history.iter().map(|r| r.step).collect();
    assert_eq!(steps, [1, 2, 3]);
}

#[tokio::test]
async fn test_capture_failure_on_first_step_is_fatal() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always(CONTINUE_FIRST),
        config(),
    );
    let mut session = FakeSession::failing_capture_at(1);

    let run = navigator.run(&mut session, "anything", 50).await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::Error));
    assert!(run.error.as_deref().unwrap().contains("screenshot"));
    assert!(run.history.is_empty());
    assert_eq!(run.steps, 0);
    assert_eq!(session.captures, 1);
    assert!(session.clicks().is_empty());
}

#[tokio::test]
async fn test_success_on_second_step_keeps_first_record_only() {
    let reasoner = ScriptedReasoner::new(&[
        CONTINUE_FIRST,
        "ELEMENT_INDEX: 0\nSTATUS: succeeded\nREASONING: logged in",
    ]);
    let navigator = Navigator::new(FixedDetector::new(vec![login_button()]), reasoner, config());
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "log in", 10).await;

    assert!(run.succeeded());
    assert_eq!(run.terminal_reason, Some(TerminalReason::Succeeded));
    assert_eq!(run.history.len(), 1);
    assert_eq!(run.history[0].step, 1);
    // execution is skipped on a terminal verdict
    assert_eq!(session.clicks().len(), 1);
    assert!(run.last_reasoning.contains("logged in"));
}

#[tokio::test]
async fn test_failed_verdict_is_not_max_steps() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always("ELEMENT_INDEX: -1\nSTATUS: failed\nREASONING: no such page"),
        config(),
    );
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "find unicorns", 10).await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::Failed));
    assert!(!run.succeeded());
    assert_eq!(run.steps, 1);
    assert!(run.history.is_empty());
    assert!(session.clicks().is_empty());
}

#[tokio::test]
async fn test_out_of_range_index_is_a_noop_step() {
    let elements = vec![
        element("a", [0, 0, 10, 10], ActionVerb::Click),
        element("b", [10, 0, 10, 10], ActionVerb::Click),
        element("c", [20, 0, 10, 10], ActionVerb::Click),
    ];
    let navigator = Navigator::new(
        FixedDetector::new(elements),
        ScriptedReasoner::always("ELEMENT_INDEX: 7\nSTATUS: continue\nREASONING: the eighth one"),
        config(),
    );
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "click the eighth", 2).await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::MaxSteps));
    assert_eq!(run.steps, 2);
    assert!(run.history.is_empty());
    assert!(run.step_errors.is_empty());
    assert!(session.clicks().is_empty());
}

#[tokio::test]
async fn test_missing_status_skips_the_step() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always("ELEMENT_INDEX: 0\nREASONING: I would click it"),
        config(),
    );
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "log in", 2).await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::MaxSteps));
    assert!(run.history.is_empty());
    assert!(session.clicks().is_empty());
}

#[tokio::test]
async fn test_detector_failure_degrades_to_empty_candidates() {
    let mut detector = FixedDetector::new(vec![login_button()]);
    detector.fail = true;
    let reasoner = ScriptedReasoner::always(CONTINUE_FIRST);
    let seen = Arc::clone(&reasoner.seen);
    let navigator = Navigator::new(detector, reasoner, config());
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "log in", 2).await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::MaxSteps));
    assert_eq!(run.steps, 2);
    assert!(run.history.is_empty());
    assert_eq!(run.step_errors.len(), 2);
    assert_eq!(run.step_errors[0].phase, Phase::Detect);
    assert_eq!(run.step_errors[1].step, 2);
    assert!(seen.lock().unwrap().iter().all(|s| s.candidates.is_empty()));
}

#[tokio::test]
async fn test_reasoner_failure_continues_without_action() {
    let mut reasoner = ScriptedReasoner::always(CONTINUE_FIRST);
    reasoner.fail = true;
    let navigator = Navigator::new(FixedDetector::new(vec![login_button()]), reasoner, config());
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "log in", 3).await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::MaxSteps));
    assert_eq!(run.steps, 3);
    assert!(run.history.is_empty());
    assert!(run.step_errors.iter().all(|e| e.phase == Phase::Reason));
    assert_eq!(run.step_errors.len(), 3);
}

#[tokio::test]
async fn test_dispatch_failure_is_recorded_but_not_fatal() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always(CONTINUE_FIRST),
        config(),
    );
    let mut session = FakeSession {
        fail_input: true,
        ..FakeSession::default()
    };

    let run = navigator.run(&mut session, "log in", 2).await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::MaxSteps));
    assert_eq!(run.error, None);
    assert_eq!(run.history.len(), 2);
    assert_eq!(run.step_errors.len(), 2);
    assert!(run.step_errors.iter().all(|e| e.phase == Phase::Execute));
    assert_eq!(session.captures, 2);
}

#[tokio::test]
async fn test_elements_without_boxes_are_not_candidates() {
    let elements = vec![
        element("ghost", [0, 0, 0, 0], ActionVerb::Click),
        element("real", [10, 10, 20, 20], ActionVerb::Click),
    ];
    let reasoner = ScriptedReasoner::new(&[CONTINUE_FIRST, ACHIEVED]);
    let seen = Arc::clone(&reasoner.seen);
    let navigator = Navigator::new(FixedDetector::new(elements), reasoner, config());
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "click the real one", 5).await;

    assert_eq!(seen.lock().unwrap()[0].candidates, ["real"]);
    assert_eq!(session.clicks(), vec![(20.0, 20.0)]);
    assert_eq!(run.history[0].description, "real");
}

#[tokio::test]
async fn test_candidates_are_capped() {
    let elements: Vec<DetectedElement> = (0..8)
        .map(|i| element(&format!("e{i}"), [i * 10, 0, 10, 10], ActionVerb::Click))
        .collect();

    let reasoner = ScriptedReasoner::always(ACHIEVED);
    let seen = Arc::clone(&reasoner.seen);
    let navigator = Navigator::new(FixedDetector::new(elements.clone()), reasoner, config());
    navigator.run(&mut FakeSession::default(), "g", 1).await;
    assert_eq!(seen.lock().unwrap()[0].candidates, ["e0", "e1", "e2", "e3", "e4"]);

    let reasoner = ScriptedReasoner::always(ACHIEVED);
    let seen = Arc::clone(&reasoner.seen);
    let navigator = Navigator::new(FixedDetector::new(elements), reasoner, config().candidate_cap(2));
    navigator.run(&mut FakeSession::default(), "g", 1).await;
    assert_eq!(seen.lock().unwrap()[0].candidates, ["e0", "e1"]);
}

#[tokio::test]
async fn test_reasoner_sees_at_most_three_records() {
    let reasoner = ScriptedReasoner::always(CONTINUE_FIRST);
    let seen = Arc::clone(&reasoner.seen);
    let navigator = Navigator::new(FixedDetector::new(vec![login_button()]), reasoner, config());

    let run = navigator.run(&mut FakeSession::default(), "g", 5).await;

    assert_eq!(run.history.len(), 5);
    let windows: Vec<usize> = seen.lock().unwrap().iter().map(|s| s.history).collect();
    assert_eq!(windows, [0, 1, 2, 3, 3]);
}

#[tokio::test]
async fn test_detector_context_mentions_prior_action() {
    let detector = FixedDetector::new(vec![login_button()]);
    let contexts = Arc::clone(&detector.contexts);
    let navigator = Navigator::new(detector, ScriptedReasoner::always(CONTINUE_FIRST), config());

    navigator.run(&mut FakeSession::default(), "g", 2).await;

    let contexts = contexts.lock().unwrap();
    assert_eq!(contexts[0], "Step 1/2");
    assert_eq!(contexts[1], "Step 2/2 | Last action: click");
}

#[tokio::test]
async fn test_step_budget_bounds_every_run() {
    for budget in 1..=6u32 {
        let navigator = Navigator::new(
            FixedDetector::new(vec![login_button()]),
            ScriptedReasoner::new(&[CONTINUE_FIRST, "STATUS: continue"]),
            config(),
        );
        let mut session = FakeSession::default();

        let run = navigator.run(&mut session, "never done", budget).await;

        assert!(session.captures <= budget);
        assert_eq!(run.steps, budget);
        assert_eq!(run.terminal_reason, Some(TerminalReason::MaxSteps));
        assert!(run.history.len() as u32 <= run.steps);
        assert_eq!(run.history.len(), 1);
    }
}

#[tokio::test]
async fn test_session_closed_mid_run() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always(CONTINUE_FIRST),
        config(),
    );
    let mut session = FakeSession::failing_capture_at(3);

    let run = navigator.run(&mut session, "g", 10).await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::Error));
    assert_eq!(run.steps, 2);
    assert_eq!(run.history.len(), 2);
    assert_eq!(session.captures, 3);
}

#[tokio::test]
async fn test_open_failure_is_fatal() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always(CONTINUE_FIRST),
        config(),
    );
    let mut session = FakeSession {
        fail_open: true,
        ..FakeSession::default()
    };

    let run = navigator
        .run_from(&mut session, "https://nowhere.invalid", "g", 5)
        .await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::Error));
    assert!(run.error.as_deref().unwrap().contains("nowhere.invalid"));
    assert_eq!(session.captures, 0);
    assert_eq!(run.start_url, "https://nowhere.invalid");
}

#[tokio::test]
async fn test_run_from_opens_then_captures() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always(ACHIEVED),
        config(),
    );
    let mut session = FakeSession::default();

    let run = navigator.run_from(&mut session, "https://shop.example/", "g", 5).await;

    assert!(run.succeeded());
    assert_eq!(
        session.events[..2],
        [Event::Open("https://shop.example/".into()), Event::Screenshot]
    );
    assert_eq!(run.current_url, "https://shop.example/");
}

#[tokio::test]
async fn test_zero_budget_never_captures() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always(CONTINUE_FIRST),
        config(),
    );
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "g", 0).await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::MaxSteps));
    assert_eq!(session.captures, 0);
}

#[tokio::test]
async fn test_type_action_focuses_then_enters_text() {
    let search = DetectedElement {
        kind: ElementKind::Input,
        ..element("Search box", [0, 0, 200, 40], ActionVerb::Type)
    };
    let navigator = Navigator::new(
        FixedDetector::new(vec![search]),
        ScriptedReasoner::new(&[
            "ELEMENT_INDEX: 0\nSTATUS: continue\nREASONING: search for it\nTEXT: rust books",
            ACHIEVED,
        ]),
        config(),
    );
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "search rust books", 5).await;

    assert_eq!(
        session.events[1..3],
        [Event::Click(100.0, 20.0), Event::Text("rust books".into())]
    );
    assert_eq!(run.history[0].text.as_deref(), Some("rust books"));
    assert_eq!(run.history[0].kind, ElementKind::Input);
}

#[tokio::test]
async fn test_scroll_action_scrolls_down() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![element("More results", [0, 600, 100, 20], ActionVerb::Scroll)]),
        ScriptedReasoner::new(&[CONTINUE_FIRST, ACHIEVED]),
        config(),
    );
    let mut session = FakeSession::default();

    let run = navigator.run(&mut session, "see more", 5).await;

    assert!(session.events.contains(&Event::Scroll(0, 500)));
    assert!(session.clicks().is_empty());
    assert_eq!(run.history[0].action, ActionVerb::Scroll);
}

#[tokio::test]
async fn test_independent_runs_share_a_navigator() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always(CONTINUE_FIRST),
        config(),
    );
    let mut first = FakeSession::default();
    let mut second = FakeSession::default();

    let (a, b): (NavigationRun, NavigationRun) = tokio::join!(
        navigator.run(&mut first, "a", 2),
        navigator.run(&mut second, "b", 3),
    );

    assert_eq!(a.history.len(), 2);
    assert_eq!(b.history.len(), 3);
    assert_ne!(a.run_id, b.run_id);
    assert_eq!(first.captures, 2);
    assert_eq!(second.captures, 3);
}

#[tokio::test]
async fn test_screenshots_and_record_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::new(&[CONTINUE_FIRST, ACHIEVED]),
        config().screenshot_dir(dir.path().join("shots")),
    );

    let run = navigator.run(&mut FakeSession::default(), "log in", 5).await;
    assert_eq!(run.screenshots.len(), 2);
    assert!(run.screenshots.iter().all(|p| p.exists()));

    let record_path = dir.path().join("runs").join("run.json");
    run.save_json(&record_path).await.unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&record_path).unwrap()).unwrap();
    assert_eq!(json["goal"], "log in");
    assert_eq!(json["success"], true);
    assert_eq!(json["reason"], "succeeded");
    assert_eq!(json["steps"], 2);
    assert_eq!(json["history"][0]["coordinates"], serde_json::json!([140, 220]));
    assert_eq!(json["history"][0]["element_type"], "button");
    assert!(json["error"].is_null());
}

fn blank_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([255, 255, 255, 255]),
    ))
    .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
    .unwrap();
    out
}

#[tokio::test]
async fn test_annotated_screenshots_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::new(&[CONTINUE_FIRST, ACHIEVED]),
        config()
            .screenshot_dir(dir.path())
            .annotate_screenshots(true),
    );
    let mut session = FakeSession {
        frame: Some(blank_png(400, 300)),
        ..FakeSession::default()
    };

    let run = navigator.run(&mut session, "log in", 5).await;

    assert_eq!(run.screenshots.len(), 2);
    assert_eq!(run.annotated_screenshots.len(), 2);
    let first = &run.annotated_screenshots[0];
    assert!(first
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_step_1_annotated.png"));

    let annotated = image::open(first).unwrap().to_rgba8();
    assert_eq!(*annotated.get_pixel(100, 220), image::Rgba([255, 0, 0, 255]));
    assert_eq!(*annotated.get_pixel(140, 220), image::Rgba([255, 255, 255, 255]));
}

#[tokio::test]
async fn test_unreadable_frame_skips_annotation_only() {
    let dir = tempfile::tempdir().unwrap();
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::new(&[CONTINUE_FIRST, ACHIEVED]),
        config()
            .screenshot_dir(dir.path())
            .annotate_screenshots(true),
    );

    let run = navigator.run(&mut FakeSession::default(), "log in", 5).await;

    assert!(run.succeeded());
    assert_eq!(run.screenshots.len(), 2);
    assert!(run.annotated_screenshots.is_empty());
    assert!(run.step_errors.is_empty());
}

#[tokio::test]
async fn test_navigate_reports_launch_failure() {
    let navigator = Navigator::new(
        FixedDetector::new(vec![login_button()]),
        ScriptedReasoner::always(CONTINUE_FIRST),
        config(),
    )
    .with_browser(
        AgenticBrowser::builder()
            .chrome_path("/nonexistent/chrome-for-navigation-tests")
            .build_config(),
    );

    let run = navigator
        .navigate("https://shop.example/", "log in", 3, true)
        .await;

    assert_eq!(run.terminal_reason, Some(TerminalReason::Error));
    assert!(run.error.is_some());
    assert_eq!(run.steps, 0);
    assert_eq!(run.start_url, "https://shop.example/");
    assert!(run.history.is_empty());
}
