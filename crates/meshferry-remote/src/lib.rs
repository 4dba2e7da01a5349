//! # meshferry-remote
//!
//! Thin client for the editor's remote-execution protocol:
//!
//! - JSON message types and a TCP frame codec
//! - Node discovery over UDP multicast ping/pong with liveness expiry
//! - Exclusive command sessions over a TCP connection the editor opens back
//!   to us, with a bounded wait for each result
//!
//! The seams ([`AnnouncementSource`], [`Connector`], [`CommandLink`]) let the
//! pipeline and tests run without a live editor.

pub mod channel;
pub mod discovery;
pub mod error;
pub mod message;
pub mod transport;

pub use channel::{CommandChannel, CommandLink, CommandRequest, CommandResponse, CommandSession, Connector, ExecMode};
pub use discovery::{AnnouncementSource, DiscoveredNode, NodeDiscovery, NodeTracker};
pub use error::RemoteError;
pub use transport::MulticastTransport;
