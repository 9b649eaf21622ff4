pub mod config;
pub mod room;
pub mod signaling;
pub mod transport;

pub use config::{Schema, ServerConfig};
pub use room::{RoomRegistry, RoomSnapshot};
pub use signaling::{ws_handler, SignalSink, WsSignalChannel};
pub use transport::{PeerSession, TransportConfig};
