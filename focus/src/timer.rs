//! The session state machine and countdown engine.
//!
//! A [`SessionTimer`] owns everything that changes while focus runs: the
//! current session, the Pomodoro iteration, and the log of sessions. It
//! cycles Pomodoro → break → Pomodoro until cancelled, asking its
//! collaborators to draw the countdown, notify the desktop, and wait for
//! ENTER when the next session doesn't start on its own.

use chrono::{DateTime, Duration, Local};
use focus_ipc::{Command, Response, SessionStatus, SessionType, TimerStatus};
use std::time::Duration as StdDuration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::Settings;
use crate::countdown::time_remaining;
use crate::events::EventLog;
use crate::input::InputReader;
use crate::ipc::ControlRequest;
use crate::notify::Notifier;
use crate::ui::{Banner, Renderer};

pub const DEFAULT_LONG_BREAK_INTERVAL: u32 = 4;

/// Minutes per session type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationMap {
    pomodoro: u32,
    short_break: u32,
    long_break: u32,
}

impl DurationMap {
    pub fn new(pomodoro: u32, short_break: u32, long_break: u32) -> Self {
        Self {
            pomodoro,
            short_break,
            long_break,
        }
    }

    pub fn get(&self, session: SessionType) -> u32 {
        match session {
            SessionType::Pomodoro => self.pomodoro,
            SessionType::ShortBreak => self.short_break,
            SessionType::LongBreak => self.long_break,
        }
    }

    pub fn set(&mut self, session: SessionType, minutes: u32) {
        match session {
            SessionType::Pomodoro => self.pomodoro = minutes,
            SessionType::ShortBreak => self.short_break = minutes,
            SessionType::LongBreak => self.long_break = minutes,
        }
    }
}

/// Text shown during each session type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMap {
    pomodoro: String,
    short_break: String,
    long_break: String,
}

impl MessageMap {
    pub fn new(pomodoro: String, short_break: String, long_break: String) -> Self {
        Self {
            pomodoro,
            short_break,
            long_break,
        }
    }

    pub fn get(&self, session: SessionType) -> &str {
        match session {
            SessionType::Pomodoro => &self.pomodoro,
            SessionType::ShortBreak => &self.short_break,
            SessionType::LongBreak => &self.long_break,
        }
    }
}

/// Values given on the command line. Durations and the interval only apply
/// when greater than zero; the flags only ever switch a feature on (or, for
/// notifications, off).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub pomodoro: Option<u32>,
    pub short_break: Option<u32>,
    pub long_break: Option<u32>,
    pub long_break_interval: Option<u32>,
    pub auto_start_pomodoro: bool,
    pub auto_start_break: bool,
    pub disable_notifications: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    pub durations: DurationMap,
    pub messages: MessageMap,
    pub long_break_interval: u32,
    pub auto_start_pomodoro: bool,
    pub auto_start_break: bool,
    pub notify: bool,
}

impl TimerConfig {
    pub fn new(settings: &Settings, overrides: &Overrides) -> Self {
        let mut config = Self {
            durations: settings.durations(),
            messages: settings.messages(),
            long_break_interval: settings.long_break_interval,
            auto_start_pomodoro: settings.auto_start_pomodoro,
            auto_start_break: settings.auto_start_break,
            notify: settings.notify,
        };

        let minutes = [
            (SessionType::Pomodoro, overrides.pomodoro),
            (SessionType::ShortBreak, overrides.short_break),
            (SessionType::LongBreak, overrides.long_break),
        ];
        for (session, value) in minutes {
            if let Some(m) = value.filter(|m| *m > 0) {
                config.durations.set(session, m);
            }
        }
        if let Some(n) = overrides.long_break_interval.filter(|n| *n > 0) {
            config.long_break_interval = n;
        }
        if overrides.auto_start_pomodoro {
            config.auto_start_pomodoro = true;
        }
        if overrides.auto_start_break {
            config.auto_start_break = true;
        }
        if overrides.disable_notifications {
            config.notify = false;
        }
        if config.long_break_interval == 0 {
            config.long_break_interval = DEFAULT_LONG_BREAK_INTERVAL;
        }

        config
    }

    /// Whether `next` begins without waiting for ENTER.
    pub fn auto_starts(&self, next: SessionType) -> bool {
        if next.is_break() {
            self.auto_start_break
        } else {
            self.auto_start_pomodoro
        }
    }
}

/// Session that follows `current`.
pub fn next_session(current: SessionType, iteration: u32, long_break_interval: u32) -> SessionType {
    match current {
        SessionType::Pomodoro if iteration == long_break_interval => SessionType::LongBreak,
        SessionType::Pomodoro => SessionType::ShortBreak,
        SessionType::ShortBreak | SessionType::LongBreak => SessionType::Pomodoro,
    }
}

/// Iteration to use when entering a Pomodoro.
pub fn next_iteration(iteration: u32, long_break_interval: u32) -> u32 {
    if iteration == long_break_interval {
        1
    } else {
        iteration + 1
    }
}

pub struct Collaborators {
    pub clock: Box<dyn Clock>,
    pub renderer: Box<dyn Renderer>,
    pub notifier: Box<dyn Notifier>,
    pub input: Box<dyn InputReader>,
}

enum SessionEnd {
    Completed,
    Skipped,
    Stopped,
}

enum Interrupt {
    Skip,
    Stop,
}

pub struct SessionTimer {
    config: TimerConfig,
    current: SessionType,
    iteration: u32,
    end_time: Option<DateTime<Local>>,
    awaiting: Option<SessionType>,
    log: EventLog,
    clock: Box<dyn Clock>,
    renderer: Box<dyn Renderer>,
    notifier: Box<dyn Notifier>,
    input: Box<dyn InputReader>,
    control: Option<mpsc::Receiver<ControlRequest>>,
}

impl SessionTimer {
    pub fn new(config: TimerConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            current: SessionType::Pomodoro,
            iteration: 0,
            end_time: None,
            awaiting: None,
            log: EventLog::new(),
            clock: collaborators.clock,
            renderer: collaborators.renderer,
            notifier: collaborators.notifier,
            input: collaborators.input,
            control: None,
        }
    }

    /// Serve status queries and skip/stop requests while running.
    pub fn with_control(mut self, control: mpsc::Receiver<ControlRequest>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub fn next_session(&self) -> SessionType {
        next_session(self.current, self.iteration, self.config.long_break_interval)
    }

    pub fn status(&self) -> TimerStatus {
        let remaining_seconds = match (self.awaiting, self.end_time) {
            (None, Some(end_time)) => time_remaining(self.clock.now(), end_time).total.max(0),
            _ => 0,
        };
        // A waiting Pomodoro has not advanced the iteration yet
        let iteration = match self.awaiting {
            Some(SessionType::Pomodoro) => {
                next_iteration(self.iteration, self.config.long_break_interval)
            }
            _ => self.iteration,
        };
        TimerStatus {
            session: self.awaiting.unwrap_or(self.current),
            iteration,
            long_break_interval: self.config.long_break_interval,
            end_time: self.end_time.filter(|_| self.awaiting.is_none()),
            remaining_seconds,
            awaiting_input: self.awaiting.is_some(),
        }
    }

    /// Cycle through sessions, beginning with `first`, until `cancel` fires
    /// or a stop request arrives.
    pub async fn run(&mut self, first: SessionType, cancel: CancellationToken) {
        let mut session = first;
        loop {
            let end_time = self.start(session);
            let end = self.countdown(end_time, &cancel).await;
            let now = self.clock.now();

            match end {
                SessionEnd::Completed => {
                    self.log.close_current(SessionStatus::Completed, now);
                    self.announce_completion();
                }
                SessionEnd::Skipped => {
                    self.log.close_current(SessionStatus::Skipped, now);
                    info!(session = %self.current, "session skipped");
                    session = self.next_session();
                    continue;
                }
                SessionEnd::Stopped => {
                    self.log.close_current(SessionStatus::Stopped, now);
                    self.end_time = None;
                    info!(session = %self.current, "session stopped");
                    return;
                }
            }

            let next = self.next_session();
            if !self.config.auto_starts(next) && !self.wait_for_start(next, &cancel).await {
                return;
            }
            session = next;
        }
    }

    fn start(&mut self, session: SessionType) -> DateTime<Local> {
        self.current = session;
        if session == SessionType::Pomodoro {
            self.iteration = next_iteration(self.iteration, self.config.long_break_interval);
        }

        let minutes = self.config.durations.get(session);
        let now = self.clock.now();
        let end_time = now + Duration::minutes(i64::from(minutes));
        self.end_time = Some(end_time);

        let banner = Banner {
            session,
            progress: (session == SessionType::Pomodoro)
                .then_some((self.iteration, self.config.long_break_interval)),
            message: self.config.messages.get(session).to_string(),
            end_time,
        };
        if let Err(e) = self.renderer.session_started(&banner) {
            warn!("Failed to draw session banner: {}", e);
        }

        self.log.open(session, minutes, now);
        info!(session = %session, iteration = self.iteration, minutes, "session started");
        end_time
    }

    async fn countdown(&mut self, end_time: DateTime<Local>, cancel: &CancellationToken) -> SessionEnd {
        let mut ticker = tokio::time::interval(StdDuration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            let remaining = time_remaining(self.clock.now(), end_time);
            if remaining.is_expired() {
                return SessionEnd::Completed;
            }
            if let Err(e) = self.renderer.countdown(&remaining) {
                warn!("Failed to draw countdown: {}", e);
            }

            tokio::select! {
                _ = cancel.cancelled() => return SessionEnd::Stopped,
                _ = ticker.tick() => {}
                request = recv_control(&mut self.control) => match request {
                    Some(request) => match self.handle(request) {
                        Some(Interrupt::Skip) => return SessionEnd::Skipped,
                        Some(Interrupt::Stop) => return SessionEnd::Stopped,
                        None => {}
                    },
                    None => self.control = None,
                },
            }
        }
    }

    /// Block until the user presses ENTER. Returns false if the timer should
    /// stop instead.
    async fn wait_for_start(&mut self, next: SessionType, cancel: &CancellationToken) -> bool {
        self.awaiting = Some(next);
        if let Err(e) = self.renderer.awaiting_input(next) {
            warn!("Failed to draw prompt: {}", e);
        }

        let proceed = loop {
            tokio::select! {
                _ = cancel.cancelled() => break false,
                line = self.input.read_line() => {
                    if let Err(e) = line {
                        warn!("Failed to read input, starting next session: {}", e);
                    }
                    break true;
                }
                request = recv_control(&mut self.control) => match request {
                    Some(request) => match self.handle(request) {
                        Some(Interrupt::Skip) => break true,
                        Some(Interrupt::Stop) => break false,
                        None => {}
                    },
                    None => self.control = None,
                },
            }
        };

        self.awaiting = None;
        proceed
    }

    fn announce_completion(&mut self) {
        let finished = self.current;
        if let Err(e) = self.renderer.session_completed(finished) {
            warn!("Failed to draw completion: {}", e);
        }
        if !self.config.notify {
            return;
        }

        let next = self.next_session();
        let title = format!("{} is finished", finished.label());
        if let Err(e) = self.notifier.notify(&title, self.config.messages.get(next)) {
            warn!("Failed to send notification: {:#}", e);
        }
    }

    fn handle(&self, request: ControlRequest) -> Option<Interrupt> {
        let (response, interrupt) = match request.command {
            Command::Status => (Response::Status(self.status()), None),
            Command::Events => (Response::Events(self.log.events().to_vec()), None),
            Command::Skip => (Response::Ok, Some(Interrupt::Skip)),
            Command::Stop => (Response::Ok, Some(Interrupt::Stop)),
        };
        if request.reply.send(response).is_err() {
            debug!("control client left before the reply");
        }
        interrupt
    }
}

async fn recv_control(control: &mut Option<mpsc::Receiver<ControlRequest>>) -> Option<ControlRequest> {
    match control {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
