//! Progress marks
//!
//! Prints `.` for each passed shard and `E` for each failed one as they
//! finish.

use std::io::{self, Write};

use crate::executor::ProgressSink;
use crate::models::WorkerOutcome;

/// Writes one mark per finished shard
pub struct ProgressPrinter<W: Write> {
    out: W,
    enabled: bool,
    colorize: bool,
    printed: usize,
}

impl ProgressPrinter<io::Stdout> {
    pub fn stdout(enabled: bool, colorize: bool) -> Self {
        Self::new(io::stdout(), enabled, colorize)
    }
}

impl<W: Write> ProgressPrinter<W> {
    pub fn new(out: W, enabled: bool, colorize: bool) -> Self {
        Self {
            out,
            enabled,
            colorize,
            printed: 0,
        }
    }

    /// Terminate the line of marks, if any were printed
    pub fn finish(&mut self) -> io::Result<()> {
        if self.printed > 0 {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn mark(&mut self, outcome: &WorkerOutcome) -> io::Result<()> {
        let symbol = outcome.status.symbol();
        if self.colorize {
            let color = if outcome.is_success() {
                "\x1b[92m"
            } else {
                "\x1b[91m"
            };
            write!(self.out, "{color}{symbol}\x1b[0m")?;
        } else {
            write!(self.out, "{symbol}")?;
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSink for ProgressPrinter<W> {
    fn shard_finished(&mut self, outcome: &WorkerOutcome) {
        if !self.enabled {
            return;
        }
        // A closed stdout must not take the run down with it
        if let Err(e) = self.mark(outcome) {
            tracing::debug!("Failed to write progress mark: {}", e);
            self.enabled = false;
            return;
        }
        self.printed += 1;
    }
}
