//! Headless client that joins a match and chases the ball with its paddle.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::{ClientId, Packet, Phase, Snapshot, PADDLE_HEIGHT};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:3000")]
    server: String,

    /// Fraction of the distance to the ball covered per snapshot (0-1)
    #[arg(short = 'r', long, default_value = "0.15")]
    reaction: f32,
}

/// Next paddle position: a step of `reaction` toward centering on the ball.
fn chase(snapshot: &Snapshot, client_id: ClientId, reaction: f32) -> Option<f32> {
    let me = snapshot.players.get(&client_id)?;
    let ball = snapshot.ball.as_ref()?;
    let target = ball.y - PADDLE_HEIGHT / 2.0;
    Some(me.y + (target - me.y) * reaction.clamp(0.0, 1.0))
}

fn describe_result(snapshot: &Snapshot, client_id: ClientId) -> String {
    let mine = snapshot.players.get(&client_id).map(|p| p.score);
    let theirs = snapshot
        .players
        .values()
        .find(|p| p.id != client_id)
        .map(|p| p.score);

    match (mine, theirs) {
        (Some(mine), Some(theirs)) if mine > theirs => format!("won {}-{}", mine, theirs),
        (Some(mine), Some(theirs)) => format!("lost {}-{}", mine, theirs),
        (Some(mine), None) => format!("finished alone with {}", mine),
        _ => "finished without a paddle".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let (ws_stream, _) = connect_async(args.server.as_str()).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    ws_sender
        .send(Message::Binary(Packet::Join.to_bytes()?))
        .await?;

    let mut client_id: Option<ClientId> = None;

    while let Some(message) = ws_receiver.next().await {
        let data = match message? {
            Message::Binary(data) => data,
            Message::Close(_) => break,
            _ => continue,
        };

        let packet = match Packet::from_bytes(&data) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Failed to decode server packet: {}", e);
                continue;
            }
        };

        match packet {
            Packet::Assigned { client_id: id, side } => {
                info!("Seated as client {} on the {:?} side", id, side);
                client_id = Some(id);
            }
            Packet::Rejected { reason } => {
                warn!("Join rejected: {}", reason);
                break;
            }
            Packet::State(snapshot) => {
                let Some(id) = client_id else {
                    continue;
                };

                match snapshot.phase {
                    Phase::Sync => debug!("Waiting for an opponent"),
                    Phase::Play | Phase::Pause => {
                        if let Some(y) = chase(&snapshot, id, args.reaction) {
                            ws_sender
                                .send(Message::Binary(Packet::Move { y }.to_bytes()?))
                                .await?;
                        }
                    }
                    Phase::End => {
                        info!("Game over: {}", describe_result(&snapshot, id));
                        break;
                    }
                }
            }
            other => debug!("Ignoring {:?}", other),
        }
    }

    let _ = ws_sender.send(Message::Binary(Packet::Leave.to_bytes()?)).await;
    let _ = ws_sender.close().await;
    info!("Bot client finished");

    Ok(())
}
