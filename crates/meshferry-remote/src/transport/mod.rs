//! Concrete UDP multicast / TCP transport.

pub mod link;
pub mod multicast;

pub use link::TcpCommandLink;
pub use multicast::MulticastTransport;
