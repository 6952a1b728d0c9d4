//! Server network layer handling WebSocket connections and game loop coordination

use crate::client_manager::{frame_channel, ClientManager, FrameSender};
use crate::config::ServerConfig;
use crate::game::MatchState;
use crate::simulation::{SimulationLoop, SnapshotSink, TickOutcome};
use crate::slots::{self, SlotResult};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientId, Packet};
use std::error::Error;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub type ServerResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        addr: SocketAddr,
        sender: FrameSender,
    },
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    Disconnected {
        addr: SocketAddr,
    },
    Shutdown,
}

/// Main server owning the match and every connection
///
/// All match mutations happen inside [`Server::run`], one event at a time.
pub struct Server {
    listener: Option<TcpListener>,
    accept_task: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
    clients: ClientManager,
    state: MatchState,
    simulation: SimulationLoop,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_addr()).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            accept_task: None,
            local_addr,
            clients: ClientManager::new(config.max_connections),
            state: MatchState::new(config.rules()),
            simulation: SimulationLoop::with_duration(config.tick_duration()),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A handle that can stop [`Server::run`] from another task.
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns the task accepting TCP connections
    fn spawn_listener(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let server_tx = self.server_tx.clone();

        self.accept_task = Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let server_tx = server_tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, server_tx).await {
                                warn!("Connection {} failed: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }
        }));
    }

    /// Stops accepting and releases the listening socket.
    async fn stop_listener(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
            let _ = task.await;
            debug!("Stopped accepting connections on {}", self.local_addr);
        }
    }

    fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Connected { addr, sender } => {
                if self.clients.add_client(addr, sender).is_none() {
                    warn!("Connection limit reached, closing {}", addr);
                }
            }
            ServerMessage::PacketReceived { packet, addr } => {
                match self.clients.find_client_by_addr(addr) {
                    Some(client_id) => self.handle_packet(client_id, packet),
                    None => debug!("Packet from unregistered peer {}", addr),
                }
            }
            ServerMessage::Disconnected { addr } => {
                if let Some(client_id) = self.clients.find_client_by_addr(addr) {
                    self.drop_client(client_id);
                }
            }
            ServerMessage::Shutdown => {}
        }
    }

    /// Processes one inbound packet from a registered connection
    fn handle_packet(&mut self, client_id: ClientId, packet: Packet) {
        match packet {
            Packet::Join => self.handle_join(client_id),
            Packet::Move { y } => {
                self.state.set_paddle_y(client_id, y);
            }
            Packet::Leave => self.drop_client(client_id),
            _ => {
                warn!("Unexpected packet type from client {}", client_id);
            }
        }
    }

    fn handle_join(&mut self, client_id: ClientId) {
        match slots::assign(&mut self.state, client_id) {
            SlotResult::Assigned { side, match_ready } => {
                self.clients
                    .send_packet(client_id, &Packet::Assigned { client_id, side });

                if match_ready && self.state.begin() {
                    self.simulation.start();
                }
                self.broadcast_state();
            }
            SlotResult::AlreadySeated { side } => {
                self.clients
                    .send_packet(client_id, &Packet::Assigned { client_id, side });
            }
            SlotResult::Rejected => {
                self.clients.send_packet(
                    client_id,
                    &Packet::Rejected {
                        reason: "Server full".to_string(),
                    },
                );
                self.clients.remove_client(&client_id);
            }
        }
    }

    /// Forgets a connection and its paddle, if it had one
    fn drop_client(&mut self, client_id: ClientId) {
        self.clients.remove_client(&client_id);
        if slots::release(&mut self.state, client_id).is_some() {
            self.broadcast_state();
        }
    }

    fn broadcast_state(&mut self) {
        self.clients.broadcast(self.state.snapshot());
    }

    /// Frees the paddles of connections evicted for falling behind
    fn release_evicted(&mut self) {
        loop {
            let evicted = self.clients.take_evicted();
            if evicted.is_empty() {
                return;
            }

            let mut released = false;
            for client_id in evicted {
                released |= slots::release(&mut self.state, client_id).is_some();
            }
            if released {
                self.broadcast_state();
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> ServerResult<()> {
        self.spawn_listener();
        info!("Server started, waiting for players");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                        Some(message) => self.handle_message(message),
                    }
                    self.release_evicted();
                },

                _ = self.simulation.wait_tick() => {
                    match self.simulation.tick(&mut self.state, &mut self.clients) {
                        TickOutcome::Finished => {
                            info!("Match finished after {} ticks", self.simulation.ticks());
                        }
                        TickOutcome::Advanced if self.simulation.ticks() % 500 == 0 => {
                            debug!(
                                "Tick {}: {} connections, {} players",
                                self.simulation.ticks(),
                                self.clients.len(),
                                self.state.players.len()
                            );
                        }
                        _ => {}
                    }
                    self.release_evicted();
                },
            }
        }

        self.simulation.stop();
        self.stop_listener().await;
        Ok(())
    }
}

/// Drives one WebSocket connection until either side closes it.
///
/// Decoded packets go to the server loop; frames queued for this connection
/// are written by a separate task that closes the socket once the server
/// drops the queue.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) -> ServerResult<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (frame_tx, mut frame_rx) = frame_channel();

    if server_tx
        .send(ServerMessage::Connected {
            addr,
            sender: frame_tx,
        })
        .is_err()
    {
        return Err("server loop is gone".into());
    }

    tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Binary(frame)).await {
                debug!("Failed to write to {}: {}", addr, e);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Binary(data)) => match Packet::from_bytes(&data) {
                Ok(packet) => {
                    if server_tx
                        .send(ServerMessage::PacketReceived { packet, addr })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(_) => warn!("Failed to deserialize packet from {}", addr),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read error from {}: {}", addr, e);
                break;
            }
        }
    }

    let _ = server_tx.send(ServerMessage::Disconnected { addr });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Phase, Side, CANVAS_HEIGHT, PADDLE_HEIGHT};
    use crate::client_manager::OUTBOUND_QUEUE_CAPACITY;
    use tokio::sync::mpsc::Receiver;

    async fn test_server() -> Server {
        Server::new(ServerConfig {
            port: 0,
            ..ServerConfig::default()
        })
        .await
        .unwrap()
    }

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn connect(server: &mut Server, port: u16) -> Receiver<Vec<u8>> {
        let (sender, rx) = frame_channel();
        server.handle_message(ServerMessage::Connected {
            addr: peer(port),
            sender,
        });
        rx
    }

    fn send(server: &mut Server, port: u16, packet: Packet) {
        server.handle_message(ServerMessage::PacketReceived {
            packet,
            addr: peer(port),
        });
    }

    fn drain(rx: &mut Receiver<Vec<u8>>) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            packets.push(Packet::from_bytes(&frame).unwrap());
        }
        packets
    }

    #[tokio::test]
    async fn test_join_assigns_sides_in_order() {
        let mut server = test_server().await;
        let mut rx_a = connect(&mut server, 5001);
        let mut rx_b = connect(&mut server, 5002);

        send(&mut server, 5001, Packet::Join);
        let packets = drain(&mut rx_a);
        assert_eq!(
            packets[0],
            Packet::Assigned {
                client_id: 1,
                side: Side::Left
            }
        );
        assert!(matches!(&packets[1], Packet::State(s) if s.phase == Phase::Sync));
        assert!(!server.simulation.is_running());

        send(&mut server, 5002, Packet::Join);
        let packets = drain(&mut rx_b);
        assert_eq!(
            packets[0],
            Packet::Assigned {
                client_id: 2,
                side: Side::Right
            }
        );
        assert_eq!(server.state.phase, Phase::Play);
        assert!(server.state.ball.is_some());
        assert!(server.simulation.is_running());
    }

    #[tokio::test]
    async fn test_third_join_rejected_and_closed() {
        let mut server = test_server().await;
        let _rx_a = connect(&mut server, 5001);
        let _rx_b = connect(&mut server, 5002);
        let mut rx_c = connect(&mut server, 5003);

        send(&mut server, 5001, Packet::Join);
        send(&mut server, 5002, Packet::Join);
        drain(&mut rx_c);
        send(&mut server, 5003, Packet::Join);

        let packets = drain(&mut rx_c);
        assert!(matches!(&packets[..], [Packet::Rejected { .. }]));
        assert!(matches!(
            rx_c.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert_eq!(server.state.players.len(), 2);
        assert_eq!(server.clients.len(), 2);
    }

    #[tokio::test]
    async fn test_move_is_clamped() {
        let mut server = test_server().await;
        let _rx = connect(&mut server, 5001);
        send(&mut server, 5001, Packet::Join);

        send(&mut server, 5001, Packet::Move { y: 5000.0 });
        assert_eq!(server.state.players[&1].y, CANVAS_HEIGHT - PADDLE_HEIGHT);

        send(&mut server, 5001, Packet::Move { y: 42.0 });
        assert_eq!(server.state.players[&1].y, 42.0);
    }

    #[tokio::test]
    async fn test_move_before_join_is_dropped() {
        let mut server = test_server().await;
        let _rx = connect(&mut server, 5001);

        send(&mut server, 5001, Packet::Move { y: 10.0 });
        assert!(server.state.players.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_mid_match_keeps_playing() {
        let mut server = test_server().await;
        let _rx_a = connect(&mut server, 5001);
        let mut rx_b = connect(&mut server, 5002);
        send(&mut server, 5001, Packet::Join);
        send(&mut server, 5002, Packet::Join);
        drain(&mut rx_b);

        server.handle_message(ServerMessage::Disconnected { addr: peer(5001) });

        assert_eq!(server.state.phase, Phase::Play);
        assert!(server.simulation.is_running());
        assert_eq!(server.state.players.len(), 1);

        let packets = drain(&mut rx_b);
        match packets.last() {
            Some(Packet::State(snapshot)) => {
                assert_eq!(snapshot.players.len(), 1);
                assert!(snapshot.player_on(Side::Right).is_some());
            }
            other => panic!("Expected a state snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stalled_player_loses_paddle() {
        let mut server = test_server().await;
        let mut rx_a = connect(&mut server, 5001);
        let _stalled = connect(&mut server, 5002);
        send(&mut server, 5001, Packet::Join);
        send(&mut server, 5002, Packet::Join);
        assert_eq!(server.state.players.len(), 2);

        for _ in 0..OUTBOUND_QUEUE_CAPACITY {
            drain(&mut rx_a);
            server.broadcast_state();
            server.release_evicted();
        }
        assert_eq!(server.clients.len(), 1);
        assert_eq!(server.state.players.len(), 1);
        assert_eq!(server.state.phase, Phase::Play);

        let packets = drain(&mut rx_a);
        match packets.last() {
            Some(Packet::State(snapshot)) => {
                assert_eq!(snapshot.players.len(), 1);
                assert!(snapshot.player_on(Side::Left).is_some());
            }
            other => panic!("Expected a state snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_leave_packet_removes_player() {
        let mut server = test_server().await;
        let _rx = connect(&mut server, 5001);
        send(&mut server, 5001, Packet::Join);
        send(&mut server, 5001, Packet::Leave);

        assert!(server.state.players.is_empty());
        assert!(server.clients.is_empty());
    }

    #[tokio::test]
    async fn test_server_packets_from_client_ignored() {
        let mut server = test_server().await;
        let _rx = connect(&mut server, 5001);
        send(
            &mut server,
            5001,
            Packet::Assigned {
                client_id: 9,
                side: Side::Left,
            },
        );
        assert!(server.state.players.is_empty());
        assert_eq!(server.clients.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_refused() {
        let result = Server::new(ServerConfig {
            port: 0,
            tick_rate: 0,
            ..ServerConfig::default()
        })
        .await;
        assert!(result.is_err());
    }
}
