//! Append-only record of the sessions run by this process

use chrono::{DateTime, Local};
use focus_ipc::{Event, SessionStatus, SessionType};
use tracing::warn;

#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a session. Any event still open is closed as
    /// stopped first so sessions never overlap.
    pub fn open(&mut self, session: SessionType, duration: u32, at: DateTime<Local>) -> &Event {
        if self.close_current(SessionStatus::Stopped, at).is_some() {
            warn!("previous session was still open, marked as stopped");
        }
        self.events.push(Event::start(session, duration, at));
        &self.events[self.events.len() - 1]
    }

    /// Close the open event, if there is one.
    pub fn close_current(&mut self, status: SessionStatus, at: DateTime<Local>) -> Option<&Event> {
        let event = self.events.last_mut().filter(|e| e.is_open())?;
        event.close(status, at);
        Some(&*event)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for event in &self.events {
            match (event.status, event.session) {
                (SessionStatus::Completed, SessionType::Pomodoro) => {
                    summary.pomodoros += 1;
                    summary.focus_minutes += event.duration;
                }
                (SessionStatus::Completed, _) => summary.breaks += 1,
                (SessionStatus::Skipped, _) => summary.skipped += 1,
                (SessionStatus::Stopped, _) => summary.stopped += 1,
                (SessionStatus::Started, _) => {}
            }
        }
        summary
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub pomodoros: u32,
    pub breaks: u32,
    pub skipped: u32,
    pub stopped: u32,
    pub focus_minutes: u32,
}

impl Summary {
    pub fn line(&self) -> String {
        format!(
            "{} pomodoros ({} min focused) | {} breaks | {} skipped | {} stopped",
            self.pomodoros, self.focus_minutes, self.breaks, self.skipped, self.stopped
        )
    }
}
