//! UDP star-topology transport: one Host endpoint accepting joins, each
//! Guest holding exactly one link back to it.
//!
//! Rendezvous is address-light: the room code hashes into a port inside an
//! application-reserved range, so sharing the code is enough to find the
//! room on a reachable host. Delivery is best-effort at-most-once; the only
//! ordering promise is per-connection, enforced by dropping any datagram
//! that is not newer than the last one seen from that peer.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use super::protocol::{
    MAX_PACKET_SIZE, Message, Packet, PacketError, PacketHeader, Payload, sequence_newer,
};
use crate::rng::hash_seed;

/// Port window reserved for this application on the rendezvous host. The
/// offset keeps room ports clear of other services sharing the machine.
pub const PORT_RANGE_BASE: u16 = 47_300;
pub const PORT_RANGE_SPAN: u16 = 512;

pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);
pub const PEER_TIMEOUT: Duration = Duration::from_secs(10);
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(2);

const JOIN_RESEND_INTERVAL: Duration = Duration::from_millis(500);
const JOIN_POLL_SLEEP: Duration = Duration::from_millis(10);

/// The Host occupies one seat, so at most this many guests connect.
pub const MAX_GUESTS: usize = (crate::config::MAX_PLAYERS - 1) as usize;

/// Network-addressable identifier of a room: a deterministic port within
/// the application's namespaced range.
pub fn room_port(code: &str) -> u16 {
    PORT_RANGE_BASE + (hash_seed(code.trim()) % u32::from(PORT_RANGE_SPAN)) as u16
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("room identifier is already taken")]
    RoomTaken,
    #[error("no room is listening on that code")]
    NoSuchRoom,
    #[error("timed out waiting for the host")]
    Timeout,
    #[error("join refused: {0}")]
    Denied(String),
    #[error("transport is closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Packet(#[from] PacketError),
}

/// Host-side view of one guest connection.
#[derive(Debug)]
struct PeerLink {
    addr: SocketAddr,
    peer_id: u32,
    send_sequence: u32,
    last_received: u32,
    last_receive_time: Instant,
}

impl PeerLink {
    fn new(addr: SocketAddr, peer_id: u32, first_sequence: u32) -> Self {
        Self {
            addr,
            peer_id,
            send_sequence: 0,
            last_received: first_sequence,
            last_receive_time: Instant::now(),
        }
    }

    /// Per-connection in-order discipline: accept only strictly newer
    /// sequences, which also filters duplicates.
    fn accept_inbound(&mut self, sequence: u32) -> bool {
        if sequence_newer(sequence, self.last_received) {
            self.last_received = sequence;
            self.last_receive_time = Instant::now();
            true
        } else {
            false
        }
    }

    fn touch(&mut self) {
        self.last_receive_time = Instant::now();
    }

    fn next_sequence(&mut self) -> u32 {
        let sequence = self.send_sequence;
        self.send_sequence = self.send_sequence.wrapping_add(1);
        sequence
    }

    fn is_timed_out(&self) -> bool {
        self.last_receive_time.elapsed() > PEER_TIMEOUT
    }
}

fn send_payload(
    socket: &UdpSocket,
    addr: SocketAddr,
    sequence: u32,
    payload: Payload,
) -> Result<(), TransportError> {
    let packet = Packet::new(PacketHeader::new(sequence), payload);
    let data = packet.serialize()?;
    if data.len() > MAX_PACKET_SIZE {
        return Err(TransportError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "packet exceeds size limit",
        )));
    }
    socket.send_to(&data, addr)?;
    Ok(())
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Accepting side of the star. Owns the room's port for its lifetime.
pub struct HostTransport {
    socket: Option<UdpSocket>,
    peers: HashMap<SocketAddr, PeerLink>,
    next_peer_id: u32,
    recv_buffer: [u8; MAX_PACKET_SIZE],
    last_keepalive: Instant,
    max_guests: usize,
}

impl HostTransport {
    /// Bind the room's namespaced port and start accepting joins.
    pub fn open(code: &str) -> Result<Self, TransportError> {
        let port = room_port(code);
        let socket = match UdpSocket::bind(("0.0.0.0", port)) {
            Ok(socket) => socket,
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                return Err(TransportError::RoomTaken);
            }
            Err(e) => return Err(e.into()),
        };
        socket.set_nonblocking(true)?;
        log::info!("hosting room on port {port}");

        Ok(Self {
            socket: Some(socket),
            peers: HashMap::new(),
            next_peer_id: 1,
            recv_buffer: [0u8; MAX_PACKET_SIZE],
            last_keepalive: Instant::now(),
            max_guests: MAX_GUESTS,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Drain inbound traffic, answering joins and keepalives internally.
    /// Returns game messages tagged with the sending peer's id.
    pub fn receive(&mut self) -> Result<Vec<(u32, Message)>, TransportError> {
        self.maintain()?;
        let Some(socket) = self.socket.as_ref() else {
            return Err(TransportError::Closed);
        };

        let mut inbound = Vec::new();
        loop {
            let (size, addr) = match socket.recv_from(&mut self.recv_buffer) {
                Ok(received) => received,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                // A previous send bounced (guest vanished); the timeout
                // sweep will reap the link.
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let Ok(packet) = Packet::deserialize(&self.recv_buffer[..size]) else {
                continue;
            };
            if !packet.header.is_valid() {
                continue;
            }
            let sequence = packet.header.sequence;

            match packet.payload {
                Payload::JoinRequest => {
                    if let Some(link) = self.peers.get_mut(&addr) {
                        // Duplicate or resent join: accept idempotently.
                        link.touch();
                        let (peer_id, seq) = (link.peer_id, link.next_sequence());
                        send_payload(socket, addr, seq, Payload::JoinAccept { peer_id })?;
                    } else if self.peers.len() >= self.max_guests {
                        send_payload(
                            socket,
                            addr,
                            0,
                            Payload::JoinDeny {
                                reason: "room is full".to_string(),
                            },
                        )?;
                    } else {
                        let peer_id = self.next_peer_id;
                        self.next_peer_id += 1;
                        let mut link = PeerLink::new(addr, peer_id, sequence);
                        let seq = link.next_sequence();
                        send_payload(socket, addr, seq, Payload::JoinAccept { peer_id })?;
                        self.peers.insert(addr, link);
                        log::info!("guest {peer_id} joined from {addr}");
                    }
                }
                Payload::Leave => {
                    if let Some(link) = self.peers.remove(&addr) {
                        log::info!("guest {} left", link.peer_id);
                    }
                }
                Payload::Ping { timestamp_ms } => {
                    if let Some(link) = self.peers.get_mut(&addr) {
                        link.touch();
                        let seq = link.next_sequence();
                        send_payload(socket, addr, seq, Payload::Pong { timestamp_ms })?;
                    }
                }
                Payload::Pong { .. } => {
                    if let Some(link) = self.peers.get_mut(&addr) {
                        link.touch();
                    }
                }
                Payload::Game(message) => {
                    let Some(link) = self.peers.get_mut(&addr) else {
                        log::debug!("dropping message from unknown sender {addr}");
                        continue;
                    };
                    if link.accept_inbound(sequence) {
                        inbound.push((link.peer_id, message));
                    }
                }
                Payload::JoinAccept { .. } | Payload::JoinDeny { .. } => {}
            }
        }

        Ok(inbound)
    }

    /// Best-effort fan-out to every connected guest.
    pub fn broadcast(&mut self, message: &Message) -> Result<(), TransportError> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(TransportError::Closed);
        };
        for link in self.peers.values_mut() {
            let seq = link.next_sequence();
            if let Err(e) = send_payload(socket, link.addr, seq, Payload::Game(message.clone())) {
                log::warn!("broadcast to guest {} failed: {e}", link.peer_id);
            }
        }
        Ok(())
    }

    /// Keepalive pings plus a silent sweep of timed-out peers.
    fn maintain(&mut self) -> Result<(), TransportError> {
        let Some(socket) = self.socket.as_ref() else {
            return Ok(());
        };

        self.peers.retain(|addr, link| {
            let keep = !link.is_timed_out();
            if !keep {
                log::info!("guest {} at {addr} timed out", link.peer_id);
            }
            keep
        });

        if self.last_keepalive.elapsed() >= KEEPALIVE_INTERVAL {
            self.last_keepalive = Instant::now();
            let timestamp_ms = now_ms();
            for link in self.peers.values_mut() {
                let seq = link.next_sequence();
                let _ = send_payload(socket, link.addr, seq, Payload::Ping { timestamp_ms });
            }
        }
        Ok(())
    }

    /// Close all connections and release the room's identifier. Idempotent.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            for link in self.peers.values_mut() {
                let seq = link.next_sequence();
                let _ = send_payload(&socket, link.addr, seq, Payload::Leave);
            }
            log::info!("room closed");
        }
        self.peers.clear();
    }
}

impl Drop for HostTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Connecting side of the star: exactly one link, to the Host.
pub struct GuestTransport {
    socket: Option<UdpSocket>,
    host_addr: SocketAddr,
    peer_id: u32,
    send_sequence: u32,
    last_received: u32,
    last_receive_time: Instant,
    last_keepalive: Instant,
    connected: bool,
    recv_buffer: [u8; MAX_PACKET_SIZE],
}

impl GuestTransport {
    /// Open a connection to the room `code` hosted at `host`. Bounded by
    /// [`JOIN_TIMEOUT`]; a refused or absent room surfaces before that.
    pub fn join(host: IpAddr, code: &str) -> Result<Self, TransportError> {
        let host_addr = SocketAddr::new(host, room_port(code));
        let bind_addr: SocketAddr = if host.is_ipv4() {
            "0.0.0.0:0".parse().expect("literal addr")
        } else {
            "[::]:0".parse().expect("literal addr")
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;

        let mut send_sequence: u32 = 0;
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let deadline = Instant::now() + JOIN_TIMEOUT;
        let mut last_send = Instant::now();
        send_payload(&socket, host_addr, send_sequence, Payload::JoinRequest)?;
        send_sequence = send_sequence.wrapping_add(1);

        while Instant::now() < deadline {
            match socket.recv_from(&mut buffer) {
                Ok((size, addr)) if addr == host_addr => {
                    if let Ok(packet) = Packet::deserialize(&buffer[..size]) {
                        if !packet.header.is_valid() {
                            continue;
                        }
                        match packet.payload {
                            Payload::JoinAccept { peer_id } => {
                                log::info!("joined room as peer {peer_id}");
                                return Ok(Self {
                                    socket: Some(socket),
                                    host_addr,
                                    peer_id,
                                    send_sequence,
                                    last_received: packet.header.sequence,
                                    last_receive_time: Instant::now(),
                                    last_keepalive: Instant::now(),
                                    connected: true,
                                    recv_buffer: [0u8; MAX_PACKET_SIZE],
                                });
                            }
                            Payload::JoinDeny { reason } => {
                                return Err(TransportError::Denied(reason));
                            }
                            _ => {}
                        }
                    }
                }
                Ok(_) => {}
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if last_send.elapsed() >= JOIN_RESEND_INTERVAL {
                        last_send = Instant::now();
                        send_payload(&socket, host_addr, send_sequence, Payload::JoinRequest)?;
                        send_sequence = send_sequence.wrapping_add(1);
                    }
                    std::thread::sleep(JOIN_POLL_SLEEP);
                }
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset
                    ) =>
                {
                    return Err(TransportError::NoSuchRoom);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(TransportError::Timeout)
    }

    pub fn peer_id(&self) -> u32 {
        self.peer_id
    }

    /// The Host link is alive as far as this side knows. There is no
    /// automatic reconnection; a dropped guest re-runs the join flow.
    pub fn is_connected(&self) -> bool {
        self.connected
            && self.socket.is_some()
            && self.last_receive_time.elapsed() <= PEER_TIMEOUT
    }

    /// Unicast an intent to the Host.
    pub fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(TransportError::Closed);
        };
        let sequence = self.send_sequence;
        self.send_sequence = self.send_sequence.wrapping_add(1);
        send_payload(socket, self.host_addr, sequence, Payload::Game(message.clone()))
    }

    /// Drain inbound traffic from the Host, answering keepalives.
    pub fn receive(&mut self) -> Result<Vec<Message>, TransportError> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(TransportError::Closed);
        };

        if self.last_keepalive.elapsed() >= KEEPALIVE_INTERVAL {
            self.last_keepalive = Instant::now();
            let sequence = self.send_sequence;
            self.send_sequence = self.send_sequence.wrapping_add(1);
            let _ = send_payload(
                socket,
                self.host_addr,
                sequence,
                Payload::Ping {
                    timestamp_ms: now_ms(),
                },
            );
        }

        let mut inbound = Vec::new();
        loop {
            let (size, addr) = match socket.recv_from(&mut self.recv_buffer) {
                Ok(received) => received,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset
                    ) =>
                {
                    self.connected = false;
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            if addr != self.host_addr {
                continue;
            }

            let Ok(packet) = Packet::deserialize(&self.recv_buffer[..size]) else {
                continue;
            };
            if !packet.header.is_valid() {
                continue;
            }
            if !sequence_newer(packet.header.sequence, self.last_received) {
                continue;
            }
            self.last_received = packet.header.sequence;
            self.last_receive_time = Instant::now();

            match packet.payload {
                Payload::Game(message) => inbound.push(message),
                Payload::Ping { timestamp_ms } => {
                    let sequence = self.send_sequence;
                    self.send_sequence = self.send_sequence.wrapping_add(1);
                    let _ = send_payload(
                        socket,
                        self.host_addr,
                        sequence,
                        Payload::Pong { timestamp_ms },
                    );
                }
                Payload::Leave => {
                    log::info!("host closed the room");
                    self.connected = false;
                }
                Payload::Pong { .. }
                | Payload::JoinRequest
                | Payload::JoinAccept { .. }
                | Payload::JoinDeny { .. } => {}
            }
        }
        Ok(inbound)
    }

    /// Tell the Host we are going and release the socket. Idempotent.
    pub fn leave(&mut self) {
        if let Some(socket) = self.socket.take() {
            let _ = send_payload(&socket, self.host_addr, self.send_sequence, Payload::Leave);
        }
        self.connected = false;
    }
}

impl Drop for GuestTransport {
    fn drop(&mut self) {
        self.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_port_deterministic_and_in_range() {
        for code in ["24683", "31337", "eyJ0b3BpYyI6IlgifQ", ""] {
            let port = room_port(code);
            assert_eq!(port, room_port(code));
            assert!((PORT_RANGE_BASE..PORT_RANGE_BASE + PORT_RANGE_SPAN).contains(&port));
        }
    }

    #[test]
    fn test_room_port_ignores_surrounding_whitespace() {
        assert_eq!(room_port(" 24683 "), room_port("24683"));
    }

    #[test]
    fn test_peer_link_stale_drop() {
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let mut link = PeerLink::new(addr, 1, 5);
        assert!(link.accept_inbound(6));
        assert!(!link.accept_inbound(6)); // duplicate
        assert!(!link.accept_inbound(4)); // stale
        assert!(link.accept_inbound(7));
    }

    #[test]
    fn test_host_close_idempotent() {
        let mut host = HostTransport::open("close-idempotent-room").unwrap();
        host.close();
        host.close();
        assert!(!host.is_open());
        assert!(matches!(host.receive(), Err(TransportError::Closed)));
    }

    #[test]
    fn test_room_taken() {
        let _first = HostTransport::open("duplicate-room-code").unwrap();
        let second = HostTransport::open("duplicate-room-code");
        assert!(matches!(second, Err(TransportError::RoomTaken)));
    }
}
