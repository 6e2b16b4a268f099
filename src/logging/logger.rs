//! Thin logger used by command handlers.
use super::subscriber::STAGE_TARGET;

/// Console logger for one command.
///
/// Every method forwards to [`tracing`] with the command name attached as a
/// `command` field; formatting and filtering happen in the subscriber
/// installed by [`init_subscriber`](super::init_subscriber).
#[derive(Debug, Clone, Copy)]
pub struct Logger {
    command: &'static str,
}

impl Logger {
    /// Create a logger for `command`.
    #[must_use]
    pub const fn new(command: &'static str) -> Self {
        Self { command }
    }

    /// Name of the command this logger reports for.
    #[must_use]
    pub const fn command(&self) -> &'static str {
        self.command
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!(command = self.command, "{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!(command = self.command, "{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, command = self.command, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!(command = self.command, "{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!(command = self.command, "{msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_command() {
        assert_eq!(Logger::new("zip").command(), "zip");
    }
}
