use anyhow::Context;
use crossterm::{
    cursor,
    terminal::{self, ClearType},
    ExecutableCommand,
};
use std::io::{stdout, Write};

/// Raw mode plus alternate screen for the lifetime of the value.
///
/// Dropping it restores the terminal even when setup failed half-way.
pub struct TerminalSession {
    _private: (),
}

impl TerminalSession {
    pub fn enter() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        let session = Self { _private: () };

        let mut out = stdout();
        out.execute(terminal::EnterAlternateScreen)
            .context("enter alternate screen")?;
        out.execute(terminal::Clear(ClearType::All))
            .context("clear screen")?;
        out.execute(cursor::Hide).context("hide cursor")?;
        Ok(session)
    }

    /// Current size in cells `(cols, rows)`.
    pub fn size(&self) -> anyhow::Result<(u16, u16)> {
        terminal::size().context("query terminal size")
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        stdout()
            .execute(terminal::Clear(ClearType::All))
            .context("clear screen")?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = stdout();
        // Undo sync output, autowrap and colour state the renderer may have left.
        let _ = out.write_all(b"\x1b[?2026l\x1b[?7h\x1b[0m");
        let _ = out.flush();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
    }
}
