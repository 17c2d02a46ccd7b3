use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{error, info};

use agent_chat::config::Settings;
use agent_chat::launcher;

#[derive(Parser, Debug)]
#[command(name = "agent-chat", version, about = "Chat with a tool-using agent over Groq and Tavily")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Backend API only
    Serve,
    /// Chat front-end only (expects a running backend)
    Ui,
    /// Backend and front-end together
    Run,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let settings = Arc::new(Settings::from_env());

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Serve => launcher::run_backend(settings).await,
        Command::Ui => launcher::run_frontend(settings).await,
        Command::Run => launcher::run_all(settings).await,
    };

    if let Err(e) = result {
        error!("Startup failure: {:#}", e);
        std::process::exit(1);
    }

    info!("Shut down cleanly");
    Ok(())
}
