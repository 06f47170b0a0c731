use anyhow::Context;
use crossterm::{
    cursor, queue,
    style::Print,
    terminal::{self, ClearType},
    ExecutableCommand,
};
use std::io::{stdout, Stdout, Write};

/// Raw-mode terminal for the duration of the shell; restored on drop.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // Constructed before the remaining setup so Drop still runs on failure.
        let guard = Self { _private: () };

        let mut out = stdout();
        out.execute(cursor::Hide).context("hide cursor")?;
        Ok(guard)
    }

    pub fn stdout() -> Stdout {
        stdout()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = stdout();
        let _ = out.write_all(b"\r\n");
        let _ = out.execute(cursor::Show);
        let _ = out.flush();
    }
}

/// Redraws the two shell lines (status, last message) in place, truncated to
/// the terminal width.
pub fn draw_status(out: &mut impl Write, status: &str, message: &str) -> anyhow::Result<()> {
    let cols = terminal::size().map(|(c, _)| c as usize).unwrap_or(80).max(1);
    queue!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(truncate_for_width(status, cols)),
        cursor::MoveToNextLine(1),
        terminal::Clear(ClearType::CurrentLine),
        Print(truncate_for_width(message, cols)),
        cursor::MoveToPreviousLine(1),
    )
    .context("queue status line")?;
    out.flush().context("flush status line")
}

pub fn truncate_for_width(s: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let count = s.chars().count();
    if count <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}
