use std::io::{self, Write};

use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

/// Raw mode plus alternate screen for as long as it lives. Restoring happens
/// on drop, so every exit path gets the terminal back.
pub struct TerminalGuard<W: Write> {
    out: W,
}

impl<W: Write> TerminalGuard<W> {
    pub fn enter(out: W) -> io::Result<Self> {
        enable_raw_mode()?;
        // Built before anything else can fail, so a failure still runs Drop.
        let mut guard = Self { out };
        execute!(guard.out, EnterAlternateScreen)?;
        Ok(guard)
    }

    fn restore(&mut self) {
        if let Err(err) = disable_raw_mode() {
            tracing::warn!(error = %err, "could not leave raw mode");
        }
        if let Err(err) = execute!(self.out, LeaveAlternateScreen, cursor::Show) {
            tracing::warn!(error = %err, "could not leave alternate screen");
        }
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        self.restore();
    }
}
