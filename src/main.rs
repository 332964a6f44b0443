use std::sync::Arc;
use std::time::Duration;
use clap::{Parser, Subcommand};
use colored::*;
use anyhow::Result;
use tracing::info;

mod api;
mod app;
mod config;
mod handler;
mod logging;
mod pipeline;
mod poller;
mod render;
mod sink;
mod state;
mod tui;
mod ui;

#[cfg(test)]
mod testing;

use api::{Backend, PilotClient};
use app::App;
use config::Config;
use handler::Controller;
use state::Readiness;

const TICK_RATE: Duration = Duration::from_millis(300);

#[derive(Parser)]
#[command(name = "logpilot")]
#[command(about = "Chat with the LogPilot log query service")]
struct Cli {
    /// Base URL of the Pilot API
    #[arg(long, global = true, env = "LOGPILOT_API_URL")]
    api_url: Option<String>,

    /// Seconds between readiness checks while the model is loading
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Check whether the backend model is ready
    Health,
    /// Show the configuration, or save the given --api-url/--poll-interval
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = Config::load().unwrap_or_else(|_| Config::new());
    let config = file_config.clone().with_overrides(cli.api_url.clone(), cli.poll_interval);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let _guard = logging::init_file()?;
            run_chat(&config).await?
        }
        Commands::Ask { question } => {
            logging::init_stderr()?;
            ask(&config, &question).await
        }
        Commands::Health => {
            logging::init_stderr()?;
            health(&config).await
        }
        Commands::Config => {
            logging::init_stderr()?;
            show_or_save_config(file_config, cli.api_url, cli.poll_interval)?
        }
    }

    Ok(())
}

async fn run_chat(config: &Config) -> Result<()> {
    info!(api_url = config.api_url(), "starting chat");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(TICK_RATE);

    let backend = Arc::new(PilotClient::new(config.api_url()));
    let mut app = App::new(backend.base_url());
    let mut controller = Controller::new(backend, events.sender(), config.poll_interval());
    controller.poller.start();

    let result = event_loop(&mut terminal, &mut events, &mut app, &mut controller).await;

    controller.shutdown();
    tui::restore()?;
    info!("chat closed");
    result
}

async fn event_loop<B: Backend>(
    terminal: &mut tui::Tui,
    events: &mut tui::EventHandler,
    app: &mut App,
    controller: &mut Controller<B>,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, controller, event),
            None => break,
        }
    }
    Ok(())
}

async fn ask(config: &Config, question: &str) {
    let client = PilotClient::new(config.api_url());

    if question.trim().is_empty() {
        println!("{}", "Nothing to ask".yellow());
        return;
    }

    println!("🤖 Asking Pilot at {}...\n", config.api_url().bold().magenta());

    match client.query(question.trim()).await {
        Ok(response) => {
            println!("{}", "Answer:".bold().green());
            println!("{}", render::format_reply(&response));
        }
        Err(e) => {
            tracing::warn!(error = %e, "query failed");
            println!("{}", render::ERROR_NOTICE.red());
        }
    }
}

async fn health(config: &Config) {
    let client = PilotClient::new(config.api_url());

    match poller::probe(&client).await {
        Readiness::Ready => println!("{} {}", "●".green(), "ready".bold()),
        Readiness::Downloading { model } => {
            println!("{} {}", "●".yellow(), poller::banner_text(&model).bold())
        }
        Readiness::Unreachable => {
            println!("{} {}", "●".red(), "unreachable".bold());
            println!("Make sure the Pilot API is running at {}", config.api_url().bold());
        }
    }
}

fn show_or_save_config(
    mut file_config: Config,
    api_url: Option<String>,
    poll_interval: Option<u64>,
) -> Result<()> {
    let path = Config::get_config_path()?;

    if api_url.is_some() || poll_interval.is_some() {
        file_config = file_config.with_overrides(api_url, poll_interval);
        file_config.save_to(&path)?;
        println!("{} {}", "Saved".green(), path.display());
    }

    println!("\n{}", "⚙️  LogPilot configuration".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    println!("  api_url:       {}", file_config.api_url());
    println!("  poll_interval: {}s", file_config.poll_interval().as_secs());
    println!("  config file:   {}", path.display().to_string().dimmed());
    println!("  log dir:       {}", logging::logs_dir().display().to_string().dimmed());

    Ok(())
}
