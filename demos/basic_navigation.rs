use vision_navigator::{AgenticBrowser, Navigator};

#[tokio::main]
async fn main() -> vision_navigator::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Providers, models and the step budget come from the environment / .env
    let navigator = Navigator::from_env()?
        .with_browser(AgenticBrowser::builder().headless(false).build_config());

    let url = "https://books.toscrape.com/";
    let goal = "Find and identify science fiction books with their prices";
    let budget = navigator.config().step_budget.min(10);

    let run = navigator.navigate(url, goal, budget, false).await;

    println!("Success: {}", run.succeeded());
    println!("Steps: {}/{}", run.steps, run.step_budget);
    for record in &run.history {
        println!(
            "  {}. {} {} at {:?}",
            record.step,
            record.action.as_str(),
            record.description,
            record.coordinates
        );
    }
    if let Some(error) = &run.error {
        println!("Error: {error}");
    }

    run.save_json("results/basic_navigation.json").await?;
    println!("Run record saved to results/basic_navigation.json");

    Ok(())
}
