use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Bounded timeout applied to every companion read.
///
/// This bound exists specifically to avoid inter-process deadlock when the
/// companion is wedged; it is part of the protocol contract on both
/// platforms.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// How to launch the companion process.
#[derive(Debug, Clone)]
pub struct CompanionConfig {
    /// Program to launch (name resolved via `PATH`, or an explicit path).
    pub program: PathBuf,
    /// Arguments passed to the companion. Defaults to `-pipe`, which tells
    /// the companion to serve the framed protocol on its stdio.
    pub args: Vec<OsString>,
    /// Per-read timeout. Defaults to [`DEFAULT_READ_TIMEOUT`]; tests lower
    /// it to exercise timeout behavior quickly.
    pub read_timeout: Duration,
}

impl CompanionConfig {
    /// Configuration for a companion launched as `<program> -pipe`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![OsString::from("-pipe")],
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Replace the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Override the per-read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CompanionConfig::new("companion");
        assert_eq!(config.program, PathBuf::from("companion"));
        assert_eq!(config.args, vec![OsString::from("-pipe")]);
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn builder_overrides() {
        let config = CompanionConfig::new("companion")
            .with_args(["--serve"])
            .with_read_timeout(Duration::from_millis(50));
        assert_eq!(config.args, vec![OsString::from("--serve")]);
        assert_eq!(config.read_timeout, Duration::from_millis(50));
    }
}
