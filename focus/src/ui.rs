use chrono::{DateTime, Local};
use crossterm::{
    cursor::{RestorePosition, SavePosition},
    queue,
    style::{Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use focus_ipc::SessionType;
use std::io::{self, Stdout, Write};

use crate::config::Theme;
use crate::countdown::Countdown;

/// Header printed once when a session starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub session: SessionType,
    /// Iteration and long break interval, Pomodoros only
    pub progress: Option<(u32, u32)>,
    pub message: String,
    pub end_time: DateTime<Local>,
}

impl Banner {
    pub fn label(&self) -> String {
        match self.progress {
            Some((iteration, interval)) => {
                format!("[{} {}/{}]", self.session.label(), iteration, interval)
            }
            None => format!("[{}]", self.session.label()),
        }
    }
}

pub trait Renderer: Send {
    fn session_started(&mut self, banner: &Banner) -> io::Result<()>;
    /// Redraw the remaining time in place.
    fn countdown(&mut self, remaining: &Countdown) -> io::Result<()>;
    fn session_completed(&mut self, session: SessionType) -> io::Result<()>;
    fn awaiting_input(&mut self, next: SessionType) -> io::Result<()>;
}

pub fn format_countdown(remaining: &Countdown) -> String {
    if remaining.hours > 0 {
        format!(
            "Hours: {:02} Minutes: {:02} Seconds: {:02}",
            remaining.hours, remaining.minutes, remaining.seconds
        )
    } else {
        format!(
            "Minutes: {:02} Seconds: {:02}",
            remaining.minutes, remaining.seconds
        )
    }
}

pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    theme: Theme,
    /// A countdown is on screen without a trailing newline
    mid_line: bool,
}

impl TerminalRenderer<Stdout> {
    pub fn stdout(theme: Theme) -> Self {
        Self::new(io::stdout(), theme)
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W, theme: Theme) -> Self {
        Self {
            out,
            theme,
            mid_line: false,
        }
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn session_started(&mut self, banner: &Banner) -> io::Result<()> {
        if self.mid_line {
            queue!(self.out, Print("\n"))?;
            self.mid_line = false;
        }
        queue!(
            self.out,
            SetForegroundColor(self.theme.session_color(banner.session)),
            Print(banner.label()),
            ResetColor,
            Print(format!(
                ": {} (until {})\n",
                banner.message,
                banner.end_time.format("%I:%M:%S %p")
            )),
            SavePosition
        )?;
        self.out.flush()
    }

    fn countdown(&mut self, remaining: &Countdown) -> io::Result<()> {
        queue!(
            self.out,
            RestorePosition,
            Clear(ClearType::UntilNewLine),
            SetForegroundColor(self.theme.countdown),
            Print(format_countdown(remaining)),
            ResetColor
        )?;
        self.mid_line = true;
        self.out.flush()
    }

    fn session_completed(&mut self, _session: SessionType) -> io::Result<()> {
        queue!(
            self.out,
            RestorePosition,
            Clear(ClearType::UntilNewLine),
            Print("Session completed!\n\n")
        )?;
        self.mid_line = false;
        self.out.flush()
    }

    fn awaiting_input(&mut self, _next: SessionType) -> io::Result<()> {
        queue!(self.out, Print("Press ENTER to start the next session\n"))?;
        self.out.flush()
    }
}
