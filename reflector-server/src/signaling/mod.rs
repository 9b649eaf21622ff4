mod channel;
mod ws_handler;

pub use channel::*;
pub use ws_handler::*;
