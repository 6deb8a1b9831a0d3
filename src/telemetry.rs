/// Tracing setup and stage timers.
///
/// Logs always go to stderr so formatted SQL on stdout stays clean.
use std::io::IsTerminal;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `SQLFMTCLI_LOG=debug`.
pub const LOG_ENV: &str = "SQLFMTCLI_LOG";
/// `text` (default) or `json`.
pub const LOG_FORMAT_ENV: &str = "SQLFMTCLI_LOG_FORMAT";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match log_format_from_env() {
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .json()
                .with_writer(std::io::stderr)
                .finish(),
        ),
        LogFormat::Text => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr)
                .finish(),
        ),
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn log_format_from_env() -> LogFormat {
    match std::env::var(LOG_FORMAT_ENV)
        .ok()
        .as_deref()
        .map(str::trim)
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

/// Logs the elapsed time of a pipeline stage at debug level when dropped.
pub struct StageTimer {
    label: &'static str,
    start: Instant,
}

impl StageTimer {
    #[must_use]
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        let ms = self.start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(stage = self.label, elapsed_ms = format!("{ms:.2}"), "stage done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            // SAFETY: Test-only environment override.
            unsafe {
                std::env::set_var(key, value);
            }
            Self { key, prev }
        }

        fn remove(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            // SAFETY: Test-only environment override.
            unsafe {
                std::env::remove_var(key);
            }
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(prev) = self.prev.take() {
                // SAFETY: Test-only environment restoration.
                unsafe {
                    std::env::set_var(self.key, prev);
                }
            } else {
                // SAFETY: Test-only environment cleanup.
                unsafe {
                    std::env::remove_var(self.key);
                }
            }
        }
    }

    // One test so parallel runs never race on the same variable.
    #[test]
    fn test_log_format_parsing() {
        {
            let _guard = EnvGuard::remove(LOG_FORMAT_ENV);
            assert_eq!(log_format_from_env(), LogFormat::Text);
        }
        {
            let _guard = EnvGuard::set(LOG_FORMAT_ENV, " JSON ");
            assert_eq!(log_format_from_env(), LogFormat::Json);
        }
        {
            let _guard = EnvGuard::set(LOG_FORMAT_ENV, "yaml");
            assert_eq!(log_format_from_env(), LogFormat::Text);
        }
    }

    #[test]
    fn test_stage_timer_drops_quietly() {
        let timer = StageTimer::start("noop");
        drop(timer);
    }
}
