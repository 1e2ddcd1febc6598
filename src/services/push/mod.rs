pub mod listener;
pub mod reconnect;
pub mod transport;

pub use listener::{ListenerExit, PushListener};
pub use reconnect::ReconnectPolicy;
pub use transport::{PushConnection, PushConnector, WsConnector};
