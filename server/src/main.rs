use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::{Server, ServerMessage};
use shared::{Arena, CANVAS_HEIGHT, CANVAS_WIDTH, TICK_RATE, WIN_SCORE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value_t = TICK_RATE)]
    tick_rate: u32,

    /// Points needed to win a match
    #[arg(short, long, default_value_t = WIN_SCORE)]
    win_score: u32,

    /// Logical field width
    #[arg(long, default_value_t = CANVAS_WIDTH)]
    width: f32,

    /// Logical field height
    #[arg(long, default_value_t = CANVAS_HEIGHT)]
    height: f32,

    /// Maximum simultaneous connections, seated or not
    #[arg(long, default_value = "16")]
    max_connections: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            tick_rate: args.tick_rate,
            win_score: args.win_score,
            arena: Arena::new(args.width, args.height),
            max_connections: args.max_connections,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());
    info!(
        "Starting server: {} Hz, first to {}, {}x{} field",
        config.tick_rate, config.win_score, config.arena.width, config.arena.height
    );

    let mut server = Server::new(config).await?;
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            if shutdown.send(ServerMessage::Shutdown).is_err() {
                error!("Server loop already stopped");
            }
        }
    });

    server.run().await
}
