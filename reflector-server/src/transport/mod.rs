mod peer_session;
mod transport_config;

pub use peer_session::*;
pub use transport_config::*;
