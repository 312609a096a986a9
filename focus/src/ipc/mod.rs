//! Control socket used by focusctl

pub mod server;

use focus_ipc::{Command, Response};
use tokio::sync::oneshot;

/// A command forwarded to the session timer, answered through `reply`.
#[derive(Debug)]
pub struct ControlRequest {
    pub command: Command,
    pub reply: oneshot::Sender<Response>,
}
