use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vision_navigator::config::{ModelConfig, Provider};
use vision_navigator::{AgenticBrowser, LlmReasoner, Navigator, NavigatorConfig, VisionDetector};

/// Drive a browser toward a goal using a vision model.
#[derive(Debug, Parser)]
#[command(name = "navigate", version)]
struct Args {
    /// Starting URL
    #[arg(long)]
    url: String,

    /// Natural-language navigation goal
    #[arg(long)]
    goal: String,

    /// Step budget (defaults to MAX_NAVIGATION_STEPS or 20)
    #[arg(long)]
    max_steps: Option<u32>,

    /// Run Chrome without a window
    #[arg(long)]
    headless: bool,

    /// Vision model provider: openai or google
    #[arg(long, env = "VLM_PROVIDER", default_value = "openai", value_parser = parse_provider)]
    provider: Provider,

    /// Reasoning model provider: openai or google
    #[arg(long, env = "REASONER_PROVIDER", default_value = "openai", value_parser = parse_provider)]
    reasoner_provider: Provider,

    /// Vision model used for element detection (provider default when unset)
    #[arg(long, env = "VLM_MODEL")]
    vision_model: Option<String>,

    /// Text model used for reasoning (provider default when unset)
    #[arg(long, env = "REASONER_MODEL")]
    reasoner_model: Option<String>,

    /// Chrome or Chromium executable to launch
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<String>,

    /// Write the run record as JSON to this path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Save a screenshot of every step into this directory
    #[arg(long)]
    screenshots: Option<PathBuf>,

    /// Also save screenshots with the detected boxes drawn in (needs --screenshots)
    #[arg(long, requires = "screenshots")]
    annotate: bool,
}

fn parse_provider(name: &str) -> Result<Provider, String> {
    name.parse().map_err(|e: vision_navigator::Error| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "navigation could not start");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> vision_navigator::Result<bool> {
    let mut vision = ModelConfig::from_env(args.provider, "VLM_MODEL", args.provider.default_vision_model())?;
    if let Some(model) = args.vision_model {
        vision.model = model;
    }
    let mut reasoning = ModelConfig::from_env(
        args.reasoner_provider,
        "REASONER_MODEL",
        args.reasoner_provider.default_reasoner_model(),
    )?;
    if let Some(model) = args.reasoner_model {
        reasoning.model = model;
    }

    let mut config = NavigatorConfig::from_env()?;
    if let Some(steps) = args.max_steps {
        config = config.step_budget(steps);
    }
    if let Some(dir) = args.screenshots {
        config = config.screenshot_dir(dir);
    }
    config = config.annotate_screenshots(args.annotate);
    let budget = config.step_budget;

    let mut browser = AgenticBrowser::builder();
    if let Some(path) = args.chrome_path {
        browser = browser.chrome_path(path);
    }

    tracing::info!(
        vision_provider = %vision.provider,
        vision_model = %vision.model,
        reasoner_provider = %reasoning.provider,
        reasoner_model = %reasoning.model,
        "models selected"
    );
    let navigator = Navigator::new(VisionDetector::new(vision)?, LlmReasoner::new(reasoning)?, config)
        .with_browser(browser.build_config());
    let run = navigator.navigate(&args.url, &args.goal, budget, args.headless).await;

    println!("Goal:    {}", run.goal);
    println!("URL:     {} -> {}", run.start_url, run.current_url);
    println!("Steps:   {}/{}", run.steps, run.step_budget);
    println!("Actions: {}", run.history.len());
    println!("Outcome: {:?}", run.terminal_reason);
    for record in &run.history {
        println!(
            "  step {:>2}: {} {} at {:?}",
            record.step,
            record.action.as_str(),
            record.description,
            record.coordinates
        );
    }
    if let Some(error) = &run.error {
        println!("Error:   {error}");
    }
    if !run.annotated_screenshots.is_empty() {
        println!("Annotated screenshots: {}", run.annotated_screenshots.len());
    }

    if let Some(path) = args.output {
        run.save_json(&path).await?;
        println!("Run record written to {}", path.display());
    }

    Ok(run.succeeded())
}
