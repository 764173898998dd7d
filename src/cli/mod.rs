use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Arg, Command};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::config::PlannerConfig;
use crate::core::{ConversationResponse, Orchestrator};
use crate::services::{
    GoogleMapsClient, InMemoryPlanStore, JsonFilePlanStore, OpenAIClient, PlanStore,
};

fn command() -> Command {
    Command::new("trip-planner")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Plan business trips in a conversation, then schedule them around traffic")
        .arg(
            Arg::new("prompt")
                .help("First message; read from stdin when omitted")
                .index(1),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help("Chat model (or set PLANNER_MODEL)"),
        )
        .arg(
            Arg::new("base-url")
                .short('u')
                .long("base-url")
                .value_name("URL")
                .help("OpenAI-compatible base URL (or set OPENAI_BASE_URL / OPENROUTER_BASE_URL)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .help("Request timeout in seconds (or set PLANNER_TIMEOUT_SECS)"),
        )
        .arg(
            Arg::new("plan-dir")
                .short('d')
                .long("plan-dir")
                .value_name("DIR")
                .help("Directory where executed plans are saved as JSON (or set PLANNER_PLAN_DIR)"),
        )
        .arg(
            Arg::new("max-iterations")
                .short('i')
                .long("max-iterations")
                .value_name("COUNT")
                .help("Maximum tool-calling rounds per message")
                .default_value("8"),
        )
}

fn print_response(response: &ConversationResponse) {
    println!("\n[{}] {}", response.stage, response.message);
    if !response.suggested_actions.is_empty() {
        println!("  Next: {}", response.suggested_actions.join(" | "));
    }
    if response.requires_confirmation {
        println!("  Type /execute to build the final itinerary.");
    }
}

/// CLI entry point for the trip planner
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let matches = command().get_matches();
    let mut config = PlannerConfig::from_env()?;
    if let Some(model) = matches.get_one::<String>("model") {
        config.model = model.clone();
    }
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config.openai_base_url = base_url.clone();
    }
    if let Some(timeout) = matches.get_one::<String>("timeout") {
        let secs: u64 = timeout.parse().context("--timeout must be a number of seconds")?;
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(dir) = matches.get_one::<String>("plan-dir") {
        config.plan_dir = Some(PathBuf::from(dir));
    }
    let max_iterations: usize = matches
        .get_one::<String>("max-iterations")
        .map(|raw| raw.parse())
        .transpose()
        .context("--max-iterations must be a number")?
        .unwrap_or(crate::core::orchestrator::DEFAULT_MAX_ITERATIONS);

    info!("Using model: {}", config.model);
    info!("Base URL: {}", config.openai_base_url);

    let llm = OpenAIClient::new(config.openai_api_key.clone())
        .with_base_url(config.openai_base_url.clone())
        .with_model(config.model.clone())
        .with_timeout(config.timeout);
    let mut maps = GoogleMapsClient::new(config.google_maps_api_key.clone());
    if let Some(base_url) = &config.google_maps_base_url {
        maps = maps.with_base_url(base_url.clone());
    }
    let maps = maps.with_timeout(config.timeout)?;

    let plans: Arc<dyn PlanStore> = match &config.plan_dir {
        Some(dir) => Arc::new(
            JsonFilePlanStore::open(dir.clone())
                .await
                .with_context(|| format!("cannot open plan directory {}", dir.display()))?,
        ),
        None => Arc::new(InMemoryPlanStore::new()),
    };

    let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(maps))?
        .with_plan_store(plans)
        .with_timeout(config.timeout)
        .with_max_iterations(max_iterations);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let first = match matches.get_one::<String>("prompt") {
        Some(prompt) => prompt.clone(),
        None => {
            println!("Describe your business trip:");
            lines
                .next_line()
                .await?
                .ok_or_else(|| anyhow!("no input given"))?
        }
    };

    let response = orchestrator.start_conversation(None, &first).await?;
    let conversation_id = response.conversation_id.clone();
    print_response(&response);

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "/quit" | "/exit" => break,
            "/plan" => {
                let plan = orchestrator
                    .get_conversation(&conversation_id)
                    .await?
                    .and_then(|c| c.current_plan);
                match plan {
                    Some(plan) => println!("{}", serde_json::to_string_pretty(&plan)?),
                    None => println!("No plan yet."),
                }
            }
            "/execute" => match orchestrator.execute_plan(&conversation_id).await {
                Ok(report) => println!("\n{}", report.markdown),
                Err(e) if e.is_user_facing() => println!("{}", e),
                Err(e) => {
                    error!("Execution failed: {}", e);
                    return Err(e.into());
                }
            },
            message => match orchestrator
                .continue_conversation(&conversation_id, message)
                .await
            {
                Ok(response) => print_response(&response),
                Err(e) if e.is_retryable() => println!("Temporary problem, please retry: {}", e),
                Err(e) => return Err(e.into()),
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parses_flags() {
        let matches = command()
            .try_get_matches_from(["trip-planner", "-m", "gpt", "--plan-dir", "/tmp/p", "Go to Jakarta"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("model").map(String::as_str), Some("gpt"));
        assert_eq!(matches.get_one::<String>("prompt").map(String::as_str), Some("Go to Jakarta"));
        assert_eq!(
            matches.get_one::<String>("max-iterations").map(String::as_str),
            Some("8")
        );
    }
}
