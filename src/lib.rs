pub mod annotate;
pub mod browser;
pub mod config;
pub mod detector;
pub mod element;
pub mod error;
pub mod executor;
pub mod llm;
pub mod navigator;
pub mod page;
pub mod reasoner;
pub mod run;
pub mod session;

pub use browser::AgenticBrowser;
pub use config::{BrowserConfig, ModelConfig, NavigatorConfig, Provider};
pub use detector::{ElementDetector, VisionDetector};
pub use element::{ActionVerb, BoundingBox, CandidateOrder, DetectedElement, ElementKind};
pub use error::{Error, Result};
pub use navigator::Navigator;
pub use page::Page;
pub use reasoner::{LlmReasoner, Reasoner, ReasoningContext, Verdict, VerdictStatus};
pub use run::{ActionRecord, NavigationRun, TerminalReason};
pub use session::Session;
