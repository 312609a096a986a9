use async_trait::async_trait;
use std::io::{self, BufRead};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Source of the "press ENTER" acknowledgement between sessions.
#[async_trait]
pub trait InputReader: Send {
    /// Wait for the next line typed by the user.
    async fn read_line(&mut self) -> io::Result<String>;
}

/// Reads stdin on a dedicated thread so a pending read never holds up
/// runtime shutdown.
pub struct StdinReader {
    lines: mpsc::UnboundedReceiver<io::Result<String>>,
}

impl StdinReader {
    pub fn spawn() -> Self {
        let (tx, lines) = mpsc::unbounded_channel();
        let spawned = thread::Builder::new()
            .name("focus-stdin".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                debug!("stdin closed");
            });
        if let Err(e) = spawned {
            warn!("Failed to start stdin reader: {}", e);
        }
        Self { lines }
    }
}

#[async_trait]
impl InputReader for StdinReader {
    async fn read_line(&mut self) -> io::Result<String> {
        // Lines typed while a countdown was running don't count.
        while self.lines.try_recv().is_ok() {}

        match self.lines.recv().await {
            Some(line) => line,
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed")),
        }
    }
}
