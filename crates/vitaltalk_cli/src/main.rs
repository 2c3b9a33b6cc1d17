use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use vitaltalk_core::{ScenarioCatalog, VitalConfig};
use vitaltalk_gateway::{AppState, GatewayServer};
use vitaltalk_memory::ConversationStore;
use vitaltalk_reasoning::providers::build_clients;
use vitaltalk_reasoning::{LlmClient, Orchestrator};
use vitaltalk_voice::{OpenAiVoice, SpeechToText, TextToSpeech};

mod chat;

#[derive(Parser, Debug)]
#[command(name = "vitaltalk", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file (defaults are used if it is missing)
    #[arg(short, long, env = "VITALTALK_CONFIG", default_value = "vitaltalk.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP + WebSocket gateway
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Practice a conversation in the terminal
    Chat {
        /// Scenario to start from
        #[arg(short, long, default_value_t = 1)]
        scenario: u32,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn build_orchestrator(config: &VitalConfig) -> anyhow::Result<Arc<Orchestrator>> {
    let (llm, coach_llm) = build_clients(&config.llm)?;
    info!(
        "LLM provider {} (model {}, coach {})",
        config.llm.provider,
        llm.model(),
        coach_llm.model()
    );
    let store = ConversationStore::from_config(&config.store).await?;
    Ok(Arc::new(Orchestrator::new(
        config,
        llm,
        coach_llm,
        store,
        Arc::new(ScenarioCatalog::builtin()),
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json);

    let mut config = VitalConfig::load_or_default(&args.config);
    let orchestrator = build_orchestrator(&config).await?;

    match args.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }

            let mut state = AppState::new(orchestrator);
            match OpenAiVoice::from_env() {
                Ok(voice) => {
                    let voice = Arc::new(voice);
                    let stt: Arc<dyn SpeechToText> = voice.clone();
                    let tts: Arc<dyn TextToSpeech> = voice;
                    state = state.with_voice(Some(stt), Some(tts));
                }
                Err(e) => warn!("Audio endpoints disabled: {}", e),
            }

            GatewayServer::new(state, &config.gateway.host, config.gateway.port)
                .run()
                .await
        }
        Command::Chat { scenario } => chat::run(orchestrator, scenario).await,
    }
}
