use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use chat_session::MessagingSession;
use chat_session::protocol::{PUSH_SOCKET_PATH, SEND_MESSAGE_PATH};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::{net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::MakeSpan;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use uuid::Uuid;

mod bridge;
mod cli;
mod config;
mod handlers;
mod metrics;
mod push;
mod qr;
#[cfg(test)]
mod test_helpers;
mod views;

use crate::bridge::Relay;
use crate::config::{Backend, CodechatConfig, DEFAULT_HOST, DEFAULT_PORT, ServerConfig, SessionConfig};
use crate::metrics::ServerMetrics;
use crate::push::PushHub;

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Parser)]
#[command(name = "codechat")]
#[command(about = "Read and answer your chats from something that looks like a code editor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Custom data directory (defaults to ~/.codechat)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the messaging bridge in the foreground (default)
    Server(ServerArgs),

    /// Open the conversation viewer in this terminal
    View(ViewArgs),
}

#[derive(Parser, Default)]
struct ServerArgs {
    /// Port for the web server [default: 4000]
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to [default: 127.0.0.1]
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Messaging backend (overrides config)
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Shorthand for --backend loopback
    #[arg(long, conflicts_with = "backend")]
    demo: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Parser)]
struct ViewArgs {
    /// Bridge to connect to
    #[arg(long, default_value = "http://127.0.0.1:4000")]
    url: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Clone)]
pub(crate) struct AppState {
    /// The one messaging account this bridge drives
    pub session: Arc<dyn MessagingSession>,
    /// Fan-out to connected viewers
    pub push: Arc<PushHub>,
    /// Server metrics for observability
    pub metrics: Arc<ServerMetrics>,
    /// Server runtime configuration
    pub server_config: Arc<ServerConfig>,
}

fn init_logging(default_directive: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run_server(ServerArgs::default(), cli.data_dir).await,
        Some(Commands::Server(args)) => run_server(args, cli.data_dir).await,
        Some(Commands::View(args)) => {
            init_logging(if args.debug {
                "codechat=debug,chat_viewer=debug,warn"
            } else {
                "warn"
            });
            cli::view_command(&args.url).await
        }
    }
}

/// All bridge routes with their layers.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(views::index_page))
        .route(PUSH_SOCKET_PATH, get(handlers::push_socket_handler))
        .route(SEND_MESSAGE_PATH, post(handlers::send_message))
        .route("/api/messages/{chat_id}", get(handlers::get_messages))
        // Health endpoints
        .route("/health", get(handlers::health_handler))
        .route("/health/live", get(handlers::health_live_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn run_server(args: ServerArgs, data_dir: Option<PathBuf>) -> Result<()> {
    // Setup logging
    let default_directive = if args.debug {
        "codechat=debug,chat_session=debug,tower_http=debug,info"
    } else {
        "codechat=info,chat_session=info,tower_http=info,warn"
    };
    init_logging(default_directive);

    info!("Starting codechat messaging bridge");

    let config = CodechatConfig::new(data_dir)?;
    let mut file_config = config.file_config()?;

    // CLI flags win over config.toml and env
    if args.demo {
        file_config.session.backend = Backend::Loopback;
    } else if let Some(backend) = args.backend {
        file_config.session.backend = backend;
    }
    let host = args
        .host
        .or_else(|| file_config.server.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = args.port.or(file_config.server.port).unwrap_or(DEFAULT_PORT);

    let server_config = Arc::new(ServerConfig::from_file(&file_config));
    let session_config = SessionConfig::from_file(&file_config.session);
    info!(
        "Server config: push_capacity={}, fetch_limit={}",
        server_config.push_capacity, server_config.fetch_limit
    );

    let session = bridge::connect_session(&session_config)?;
    let push = Arc::new(PushHub::new(server_config.push_capacity));
    let metrics = Arc::new(ServerMetrics::new());

    // Relay must be subscribed before the session emits its first challenge
    let relay_cancel = CancellationToken::new();
    let relay_handle = Relay::new(session.clone(), push.clone(), metrics.clone())
        .start(relay_cancel.clone())
        .await?;

    let app_state = AppState {
        session,
        push,
        metrics,
        server_config,
    };
    let app = router(app_state);

    let addr = format!("{}:{}", host, port)
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let actual_addr = listener.local_addr()?;

    info!("codechat listening on http://{}", actual_addr);
    info!("");
    info!("Editor: http://{}/", actual_addr);
    info!("API endpoints:");
    info!("  GET    /api/messages/:chatId         - Recent messages of a chat");
    info!("  POST   /api/messages/send-message    - Send a message");
    info!("  GET    /socket                       - Push channel (WebSocket)");

    // Create shutdown signal handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    // Run server with graceful shutdown
    let server_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error");

    relay_cancel.cancel();
    if let Err(e) = relay_handle.await {
        warn!("Relay task ended abnormally: {}", e);
    }

    info!("Shutdown complete");
    server_result
}
