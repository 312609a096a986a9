//! Inter-process communication between focus and focusctl
//!
//! Also home of the vocabulary both sides share: session types, session
//! statuses and the event records the timer keeps for the current run.
//!
//! The protocol is one JSON document per line over a Unix domain socket:
//! the client writes a [`Command`], the server answers with a [`Response`]
//! and closes the connection.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Duration, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub const SOCKET_PATH: &str = "/tmp/focus.sock";

/// The three kinds of session the timer cycles through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub const ALL: [SessionType; 3] = [
        SessionType::Pomodoro,
        SessionType::ShortBreak,
        SessionType::LongBreak,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Pomodoro => "Pomodoro",
            SessionType::ShortBreak => "Short break",
            SessionType::LongBreak => "Long break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, SessionType::Pomodoro)
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Disposition of a session instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Started,
    Stopped,
    Completed,
    Skipped,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Started => "STARTED",
            SessionStatus::Stopped => "STOPPED",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Skipped => "SKIPPED",
        };
        f.write_str(s)
    }
}

/// Lifecycle record of one session.
///
/// Created with status `Started` when the session begins and closed exactly
/// once, when the countdown expires or the session is interrupted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub session: SessionType,
    pub status: SessionStatus,
    /// Planned length in minutes
    pub duration: u32,
    pub start_time: DateTime<Local>,
    pub expected_end_time: DateTime<Local>,
    pub actual_end_time: Option<DateTime<Local>>,
}

impl Event {
    pub fn start(session: SessionType, duration: u32, start_time: DateTime<Local>) -> Self {
        Self {
            session,
            status: SessionStatus::Started,
            duration,
            start_time,
            expected_end_time: start_time + Duration::minutes(i64::from(duration)),
            actual_end_time: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.actual_end_time.is_none()
    }

    /// Close the event. Returns false if it was already closed, in which case
    /// nothing changes.
    pub fn close(&mut self, status: SessionStatus, at: DateTime<Local>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.status = status;
        self.actual_end_time = Some(at);
        true
    }
}

/// Commands that focusctl can send to focus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Status,
    Events,
    Skip,
    Stop,
}

/// Responses from focus back to focusctl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Ok,
    Status(TimerStatus),
    Events(Vec<Event>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub session: SessionType,
    pub iteration: u32,
    pub long_break_interval: u32,
    pub end_time: Option<DateTime<Local>>,
    pub remaining_seconds: i64,
    /// The timer is waiting for ENTER before starting `session`
    pub awaiting_input: bool,
}

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection refused - is focus running?")]
    ConnectionRefused,

    #[error("Connection closed before a message was received")]
    Closed,
}

/// Write one message as a single JSON line.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut buf = serde_json::to_vec(message)?;
    buf.push(b'\n');
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one JSON line and decode it.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T, IpcError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(IpcError::Closed);
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Send a command to the running timer and wait for its answer.
pub async fn send_command(command: &Command) -> Result<Response, IpcError> {
    send_command_to(Path::new(SOCKET_PATH), command).await
}

pub async fn send_command_to(path: &Path, command: &Command) -> Result<Response, IpcError> {
    let stream = UnixStream::connect(path).await.map_err(|e| match e.kind() {
        ErrorKind::ConnectionRefused | ErrorKind::NotFound => IpcError::ConnectionRefused,
        _ => IpcError::Io(e),
    })?;
    let (reader, mut writer) = stream.into_split();

    write_message(&mut writer, command).await?;

    let mut reader = BufReader::new(reader);
    read_message(&mut reader).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn event_expected_end_is_start_plus_duration() {
        let event = Event::start(SessionType::Pomodoro, 25, at(9, 0, 0));
        assert_eq!(event.expected_end_time, at(9, 25, 0));
        assert_eq!(event.status, SessionStatus::Started);
        assert!(event.is_open());
    }

    #[test]
    fn event_closes_only_once() {
        let mut event = Event::start(SessionType::ShortBreak, 5, at(9, 0, 0));
        assert!(event.close(SessionStatus::Completed, at(9, 5, 1)));
        assert!(!event.close(SessionStatus::Stopped, at(9, 6, 0)));
        assert_eq!(event.status, SessionStatus::Completed);
        assert_eq!(event.actual_end_time, Some(at(9, 5, 1)));
    }

    #[test]
    fn session_names_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&SessionType::ShortBreak).unwrap(),
            "\"short-break\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
    }

    #[test]
    fn only_pomodoro_is_not_a_break() {
        assert!(!SessionType::Pomodoro.is_break());
        assert!(SessionType::ShortBreak.is_break());
        assert!(SessionType::LongBreak.is_break());
    }

    #[tokio::test]
    async fn messages_are_newline_delimited() {
        let (client, server) = tokio::io::duplex(1024);
        let (server_read, _server_write) = tokio::io::split(server);
        let (_client_read, mut client_write) = tokio::io::split(client);

        write_message(&mut client_write, &Command::Skip).await.unwrap();
        write_message(&mut client_write, &Command::Status).await.unwrap();

        let mut reader = BufReader::new(server_read);
        let first: Command = read_message(&mut reader).await.unwrap();
        let second: Command = read_message(&mut reader).await.unwrap();
        assert_eq!(first, Command::Skip);
        assert_eq!(second, Command::Status);
    }

    #[tokio::test]
    async fn reading_from_closed_stream_is_an_error() {
        let mut reader = BufReader::new(&b""[..]);
        let result: Result<Command, _> = read_message(&mut reader).await;
        assert!(matches!(result, Err(IpcError::Closed)));
    }

    #[tokio::test]
    async fn missing_socket_reports_connection_refused() {
        let path = std::env::temp_dir().join("focus-ipc-test-missing.sock");
        let _ = std::fs::remove_file(&path);
        let result = send_command_to(&path, &Command::Status).await;
        assert!(matches!(result, Err(IpcError::ConnectionRefused)));
    }
}
