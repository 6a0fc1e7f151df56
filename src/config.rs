use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::browser::AgenticBrowser;
use crate::element::CandidateOrder;
use crate::error::{Error, Result};

/// Default user agent for navigation sessions (desktop Chrome on Windows).
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_path: Option<String>,
    pub user_agent: Option<String>,
    /// Timeout for the initial page load of a session (default: 30s).
    pub default_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chrome_path: None,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            default_timeout: Duration::from_secs(30),
        }
    }
}

pub struct BrowserBuilder {
    config: BrowserConfig,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Override the user agent. Pass `None` to keep Chrome's own.
    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn build_config(self) -> BrowserConfig {
        self.config
    }

    pub async fn build(self) -> Result<AgenticBrowser> {
        AgenticBrowser::launch(self.build_config()).await
    }
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ── Model endpoints ─────────────────────────────────────────────────

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";
pub const DEFAULT_REASONER_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GOOGLE_VISION_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_GOOGLE_REASONER_MODEL: &str = "gemini-1.5-flash";

/// Which wire protocol a model endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// OpenAI `chat/completions`, or any server compatible with it.
    #[default]
    OpenAi,
    /// Google Gemini `generateContent`.
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Google => "google",
        }
    }

    fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Google => "GOOGLE_API_KEY",
        }
    }

    fn api_base_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_BASE",
            Self::Google => "GOOGLE_API_BASE",
        }
    }

    pub fn default_api_base(&self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_API_BASE,
            Self::Google => DEFAULT_GOOGLE_API_BASE,
        }
    }

    pub fn default_vision_model(&self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_VISION_MODEL,
            Self::Google => DEFAULT_GOOGLE_VISION_MODEL,
        }
    }

    pub fn default_reasoner_model(&self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_REASONER_MODEL,
            Self::Google => DEFAULT_GOOGLE_REASONER_MODEL,
        }
    }

    /// Provider named by `var`, or OpenAI when unset.
    fn from_env_var(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(name) if !name.trim().is_empty() => name.parse(),
            _ => Ok(Self::OpenAi),
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" | "open-ai" => Ok(Self::OpenAi),
            "google" | "gemini" => Ok(Self::Google),
            other => Err(Error::ConfigError(format!(
                "unsupported model provider '{other}' (expected openai or google)"
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for one model endpoint.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: Provider,
    /// Base URL without the trailing `/chat/completions` or `/models/...`.
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// `detail` hint sent with OpenAI image parts ("low", "high" or "auto").
    pub image_detail: String,
}

impl ModelConfig {
    /// OpenAI-compatible endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::for_provider(Provider::OpenAi, api_key, model)
    }

    /// Google Gemini endpoint.
    pub fn google(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::for_provider(Provider::Google, api_key, model)
    }

    pub fn for_provider(provider: Provider, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            api_base: provider.default_api_base().to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: 2000,
            timeout: Duration::from_secs(30),
            image_detail: "high".to_string(),
        }
    }

    /// Vision model settings from the environment (`VLM_PROVIDER`, `VLM_MODEL`).
    pub fn vision_from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let provider = Provider::from_env_var("VLM_PROVIDER")?;
        Self::from_env(provider, "VLM_MODEL", provider.default_vision_model())
    }

    /// Reasoning model settings from the environment (`REASONER_PROVIDER`,
    /// `REASONER_MODEL`).
    pub fn reasoner_from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let provider = Provider::from_env_var("REASONER_PROVIDER")?;
        Self::from_env(provider, "REASONER_MODEL", provider.default_reasoner_model())
    }

    /// Load a `.env` file if present, then read the provider's API key
    /// (`OPENAI_API_KEY` or `GOOGLE_API_KEY`), its base URL override
    /// (`OPENAI_API_BASE` or `GOOGLE_API_BASE`), `TIMEOUT_SECONDS` and the
    /// model from `model_var`.
    pub fn from_env(provider: Provider, model_var: &str, default_model: &str) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let key_var = provider.api_key_var();
        let api_key = std::env::var(key_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::ConfigError(format!("{key_var} not set in environment")))?;
        let model = std::env::var(model_var)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model.to_string());

        let mut config = Self::for_provider(provider, api_key, model);
        if let Ok(base) = std::env::var(provider.api_base_var()) {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Ok(secs) = std::env::var("TIMEOUT_SECONDS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| Error::ConfigError(format!("TIMEOUT_SECONDS is not a number: {secs}")))?;
            config.timeout = Duration::from_secs(secs);
        }
        tracing::debug!(
            provider = %config.provider,
            model = %config.model,
            api_base = %config.api_base,
            "model config loaded"
        );
        Ok(config)
    }

    /// Full request URL for this provider and model.
    pub fn endpoint_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        match self.provider {
            Provider::OpenAi => format!("{base}/chat/completions"),
            Provider::Google => format!("{base}/models/{}:generateContent", self.model),
        }
    }
}

// ── Navigation loop ─────────────────────────────────────────────────

pub const DEFAULT_STEP_BUDGET: u32 = 20;

/// Tunables of the navigation loop and the action executor.
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    pub step_budget: u32,
    /// Maximum number of candidates shown to the reasoner per step.
    pub candidate_cap: usize,
    pub candidate_order: CandidateOrder,
    /// Number of most recent action records shown to the reasoner.
    pub history_window: usize,
    pub click_settle: Duration,
    pub type_settle: Duration,
    pub scroll_settle: Duration,
    /// Vertical scroll distance in pixels.
    pub scroll_delta: i64,
    /// When set, every captured screenshot is written here as `<run id>_step_<n>.png`.
    pub screenshot_dir: Option<PathBuf>,
    /// Also write `<run id>_step_<n>_annotated.png` with the detected boxes
    /// drawn in. Needs `screenshot_dir`.
    pub annotate_screenshots: bool,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            step_budget: DEFAULT_STEP_BUDGET,
            candidate_cap: 5,
            candidate_order: CandidateOrder::DetectorOrder,
            history_window: 3,
            click_settle: Duration::from_millis(2000),
            type_settle: Duration::from_millis(500),
            scroll_settle: Duration::from_millis(1000),
            scroll_delta: 500,
            screenshot_dir: None,
            annotate_screenshots: false,
        }
    }
}

impl NavigatorConfig {
    /// Defaults, with the step budget taken from `MAX_NAVIGATION_STEPS` when set.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        if let Ok(steps) = std::env::var("MAX_NAVIGATION_STEPS") {
            config.step_budget = steps.parse().map_err(|_| {
                Error::ConfigError(format!("MAX_NAVIGATION_STEPS is not a number: {steps}"))
            })?;
        }
        Ok(config)
    }

    pub fn step_budget(mut self, budget: u32) -> Self {
        self.step_budget = budget;
        self
    }

    pub fn candidate_cap(mut self, cap: usize) -> Self {
        self.candidate_cap = cap;
        self
    }

    pub fn candidate_order(mut self, order: CandidateOrder) -> Self {
        self.candidate_order = order;
        self
    }

    pub fn history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Set all three settle intervals at once.
    pub fn settle(mut self, click: Duration, typing: Duration, scroll: Duration) -> Self {
        self.click_settle = click;
        self.type_settle = typing;
        self.scroll_settle = scroll;
        self
    }

    pub fn scroll_delta(mut self, pixels: i64) -> Self {
        self.scroll_delta = pixels;
        self
    }

    pub fn screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    pub fn annotate_screenshots(mut self, annotate: bool) -> Self {
        self.annotate_screenshots = annotate;
        self
    }
}
