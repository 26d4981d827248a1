//! Server network layer: TCP accept loop and per-connection tasks

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::registry::SessionRegistry;
use log::{debug, error, info, warn};
use shared::{read_packet, write_packet, Packet, PlayerId, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// How long a finished connection waits for its queued packets to flush.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Stops the sweeper once the accept loop is dropped.
struct SweeperGuard(JoinHandle<()>);

impl Drop for SweeperGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Session server: accepts connections and hands each one to the registry.
pub struct Server {
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    outbound_buffer: usize,
    next_player_id: AtomicU32,
}

impl Server {
    pub async fn new(addr: &str, config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            registry: SessionRegistry::new(&config),
            outbound_buffer: config.outbound_buffer.max(1),
            next_player_id: AtomicU32::new(1),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accepts connections until the future is dropped. Accept errors are
    /// logged and do not stop the loop.
    pub async fn run(&self) {
        let _sweeper = SweeperGuard(self.registry.spawn_sweeper());
        info!("Server started successfully");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let player_id = self.next_player_id.fetch_add(1, Ordering::Relaxed);
                    let registry = Arc::clone(&self.registry);
                    let buffer = self.outbound_buffer;

                    tokio::spawn(async move {
                        handle_client(stream, addr, player_id, registry, buffer).await;
                    });
                }
                Err(e) => error!("Failed to accept connection: {}", e),
            }
        }
    }
}

/// Drives one client from handshake to departure.
async fn handle_client(
    stream: TcpStream,
    addr: SocketAddr,
    player_id: PlayerId,
    registry: Arc<SessionRegistry>,
    buffer: usize,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle for {}: {}", addr, e);
    }
    let (mut reader, mut writer) = stream.into_split();

    if !handshake(&mut reader, &mut writer, addr).await {
        return;
    }
    info!("Client connected from {} as player {}", addr, player_id);

    let (tx, rx) = mpsc::channel(buffer);
    let mut writer_task = tokio::spawn(write_loop(writer, rx, player_id));

    let connection = match Connection::open(registry, player_id, tx.clone()).await {
        Ok(connection) => connection,
        Err(e) => {
            warn!("Could not place player {}: {}", player_id, e);
            let _ = tx.try_send(Packet::Disconnected {
                reason: e.to_string(),
            });
            drop(tx);
            let _ = timeout(FLUSH_TIMEOUT, writer_task).await;
            return;
        }
    };
    drop(tx);

    let mut writer_done = false;
    loop {
        tokio::select! {
            result = read_packet(&mut reader) => match result {
                Ok(Some(packet)) => {
                    if !connection.handle_packet(packet).await {
                        debug!("Player {} sent Disconnect", player_id);
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Player {} closed the connection", player_id);
                    break;
                }
                Err(e) => {
                    warn!("Dropping player {} after a bad frame: {}", player_id, e);
                    break;
                }
            },
            _ = &mut writer_task => {
                writer_done = true;
                break;
            }
        }
    }

    connection.disconnect().await;

    if !writer_done && timeout(FLUSH_TIMEOUT, &mut writer_task).await.is_err() {
        writer_task.abort();
    }
}

/// Reads the `Connect` packet and checks the protocol version.
async fn handshake(reader: &mut OwnedReadHalf, writer: &mut OwnedWriteHalf, addr: SocketAddr) -> bool {
    let reason = match read_packet(reader).await {
        Ok(Some(Packet::Connect { client_version })) if client_version == PROTOCOL_VERSION => {
            return true;
        }
        Ok(Some(Packet::Connect { client_version })) => {
            warn!(
                "Client {} speaks protocol {}, expected {}",
                addr, client_version, PROTOCOL_VERSION
            );
            format!(
                "Protocol version mismatch: expected {}, got {}",
                PROTOCOL_VERSION, client_version
            )
        }
        Ok(Some(other)) => {
            warn!("Client {} opened with {:?} instead of Connect", addr, other);
            "Expected Connect".to_string()
        }
        Ok(None) => return false,
        Err(e) => {
            warn!("Failed to read handshake from {}: {}", addr, e);
            return false;
        }
    };

    if let Err(e) = write_packet(writer, &Packet::Disconnected { reason }).await {
        debug!("Could not tell {} why it was refused: {}", addr, e);
    }
    let _ = writer.shutdown().await;
    false
}

/// Drains the outbound queue into the socket. Stops after a `Disconnected`
/// packet, on a write error or once every sender is gone.
async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<Packet>, player_id: PlayerId) {
    while let Some(packet) = rx.recv().await {
        let closing = matches!(packet, Packet::Disconnected { .. });

        if let Err(e) = write_packet(&mut writer, &packet).await {
            debug!("Failed to write to player {}: {}", player_id, e);
            break;
        }
        if closing {
            break;
        }
    }

    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::PhaseKind;
    use tokio::io::AsyncRead;

    async fn start(config: ServerConfig) -> (SocketAddr, Arc<SessionRegistry>) {
        let server = Server::new("127.0.0.1:0", config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let registry = server.registry();
        tokio::spawn(async move { server.run().await });
        (addr, registry)
    }

    async fn connect(addr: SocketAddr) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        write_packet(&mut stream, &Packet::Connect {
            client_version: PROTOCOL_VERSION,
        })
        .await
        .unwrap();
        stream
    }

    async fn next<S: AsyncRead + Unpin>(stream: &mut S) -> Packet {
        timeout(Duration::from_secs(2), read_packet(stream))
            .await
            .expect("server should answer")
            .unwrap()
            .expect("stream closed early")
    }

    #[tokio::test]
    async fn test_handshake_places_player() {
        let (addr, registry) = start(ServerConfig::default()).await;
        let mut stream = connect(addr).await;

        match next(&mut stream).await {
            Packet::PlayerJoined { slot, .. } => assert_eq!(slot, shared::Slot::One),
            other => panic!("expected PlayerJoined, got {:?}", other),
        }
        assert_eq!(next(&mut stream).await, Packet::WaitingForPlayer);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_version_mismatch_is_refused() {
        let (addr, registry) = start(ServerConfig::default()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        write_packet(&mut stream, &Packet::Connect { client_version: 99 })
            .await
            .unwrap();

        match next(&mut stream).await {
            Packet::Disconnected { reason } => assert!(reason.contains("version")),
            other => panic!("expected Disconnected, got {:?}", other),
        }
        assert_eq!(read_packet(&mut stream).await.unwrap(), None);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_is_reported_to_client() {
        let (addr, _registry) = start(ServerConfig {
            max_rooms: 1,
            ..ServerConfig::default()
        })
        .await;
        let mut first = connect(addr).await;
        next(&mut first).await;
        let mut second = connect(addr).await;
        next(&mut second).await;

        let mut third = connect(addr).await;
        match next(&mut third).await {
            Packet::Disconnected { reason } => assert!(reason.contains("limit")),
            other => panic!("expected Disconnected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_socket_releases_room() {
        let (addr, registry) = start(ServerConfig::default()).await;
        let mut stream = connect(addr).await;
        next(&mut stream).await;
        assert_eq!(registry.len().await, 1);

        drop(stream);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_ready_packets_start_the_match() {
        let (addr, registry) = start(ServerConfig::default()).await;
        let mut first = connect(addr).await;
        let mut second = connect(addr).await;

        for stream in [&mut first, &mut second] {
            loop {
                if let Packet::RoomReady(_) = next(stream).await {
                    break;
                }
            }
            write_packet(stream, &Packet::Ready).await.unwrap();
        }

        loop {
            if next(&mut first).await == Packet::GameStarted {
                break;
            }
        }
        let room = registry.get(1).await.unwrap();
        assert_eq!(room.phase().await, PhaseKind::Active);
    }
}
