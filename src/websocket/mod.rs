//! WebSocket module for real-time push notifications
//!
//! Clients hold one duplex connection for the whole import dialogue:
//! they send actions (getUrl, cancelImport) and receive slot and
//! status pushes until the server closes the socket on a terminal
//! outcome.

pub mod handler;
pub mod messages;
pub mod registry;

pub use handler::ws_handler;
pub use messages::{ClientAction, ConnectedPush, ErrorPush, StatusPush, UploadSlotPush};
pub use registry::{ConnectionGateway, ConnectionId, ConnectionRegistry, Outbound, OutboundSender};
