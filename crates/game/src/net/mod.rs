//! Star-topology networking: packet protocol and the UDP transports.

mod protocol;
mod transport;

pub use protocol::{
    MAX_PACKET_SIZE, Message, Packet, PacketError, PacketHeader, Payload, sequence_newer,
};
pub use transport::{
    GuestTransport, HostTransport, JOIN_TIMEOUT, KEEPALIVE_INTERVAL, MAX_GUESTS, PEER_TIMEOUT,
    PORT_RANGE_BASE, PORT_RANGE_SPAN, TransportError, room_port,
};
