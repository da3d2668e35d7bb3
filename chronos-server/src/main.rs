use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use chronos_server::audit::AuditLog;
use chronos_server::config::{self, load_config};
use chronos_server::gemini::GeminiClient;
use chronos_server::google_calendar::{self, GoogleCalendar};
use chronos_server::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "chronos", version, about = "Chronos scheduling backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (parse / optimize / schedule)
    Serve,

    /// Google Calendar commands
    Calendar {
        #[command(subcommand)]
        command: CalendarCommand,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CalendarCommand {
    /// One-time OAuth bootstrap: save client credentials and seed the token cache
    Connect,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default ~/.chronos/config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            let cfg = load_config()?;
            let api_key = config::genai_api_key()?;

            let model = GeminiClient::new(&cfg.llm, api_key);
            let calendar = GoogleCalendar::from_config(&cfg).await?;
            let audit = AuditLog::new(cfg.state_path(&cfg.audit.log_file)?);

            let state = Arc::new(AppState {
                model: Arc::new(model),
                calendar: Arc::new(calendar),
                audit,
                config: cfg,
            });
            server::serve(state).await?;
        }

        Command::Calendar { command } => match command {
            CalendarCommand::Connect => {
                let cfg = load_config()?;
                google_calendar::connect_interactive(&cfg).await?;
            }
        },

        Command::Config { command } => match command {
            ConfigCommand::Init => {
                config::init_config()?;
            }
        },
    }

    Ok(())
}

fn init_tracing() {
    if tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .finish(),
    )
    .is_err()
    {
        // Subscriber already set by tests or external runtime.
    }
}
