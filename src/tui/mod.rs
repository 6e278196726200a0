#![forbid(unsafe_code)]

pub mod app;
pub mod palette;

use std::io;
use std::io::IsTerminal as _;

use crate::error::TodoError;

pub type Terminal = ratatui::Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>;

#[must_use]
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

pub fn init_terminal() -> Result<Terminal, TodoError> {
    use crossterm::terminal::enable_raw_mode;
    use ratatui::backend::CrosstermBackend;

    enable_raw_mode().map_err(|e| TodoError::Other(format!("failed to enable raw mode: {e}")))?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)
        .map_err(|e| TodoError::Other(format!("failed to enter alt screen: {e}")))?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = ratatui::Terminal::new(backend)
        .map_err(|e| TodoError::Other(format!("failed to create terminal: {e}")))?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal) -> Result<(), TodoError> {
    use crossterm::terminal::disable_raw_mode;

    disable_raw_mode()
        .map_err(|e| TodoError::Other(format!("failed to disable raw mode: {e}")))?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )
    .map_err(|e| TodoError::Other(format!("failed to leave alt screen: {e}")))?;
    terminal
        .show_cursor()
        .map_err(|e| TodoError::Other(format!("failed to show cursor: {e}")))?;
    Ok(())
}

/// Restores the terminal on every exit path, panics included.
pub struct TerminalGuard {
    terminal: Option<Terminal>,
}

impl TerminalGuard {
    pub fn new() -> Result<Self, TodoError> {
        Ok(Self {
            terminal: Some(init_terminal()?),
        })
    }

    pub fn terminal(&mut self) -> Result<&mut Terminal, TodoError> {
        self.terminal
            .as_mut()
            .ok_or_else(|| TodoError::Other("terminal unavailable".to_owned()))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Some(terminal) = self.terminal.take() {
            let _ = restore_terminal(terminal);
        }
    }
}
