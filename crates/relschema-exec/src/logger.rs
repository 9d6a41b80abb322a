//! Progress events emitted by the executor. `TracingLogger` renders them
//! through `tracing`, the way `zqlz-core`'s connection layer logs
//! structured fields rather than formatted strings; a caller that wants
//! a TTY progress bar implements `MigrationLogger` itself, and one that
//! wants JSON serializes `LogEvent` directly (it derives `Serialize`).

use serde::Serialize;

#[derive(Serialize)]
#[serde(tag = "event")]
pub enum LogEvent<'a> {
    Execution {
        from: Option<&'a str>,
        to: &'a str,
        files: usize,
    },
    File {
        version: &'a str,
        description: &'a str,
    },
    Stmt {
        sql: &'a str,
    },
    Done,
    Error {
        error: &'a str,
    },
}

pub trait MigrationLogger: Send + Sync {
    fn log(&self, event: LogEvent<'_>);
}

pub struct TracingLogger;

impl MigrationLogger for TracingLogger {
    fn log(&self, event: LogEvent<'_>) {
        match event {
            LogEvent::Execution { from, to, files } => {
                tracing::info!(from = from.unwrap_or("<base>"), to, files, "migration run starting");
            }
            LogEvent::File { version, description } => {
                tracing::info!(version, description, "applying file");
            }
            LogEvent::Stmt { sql } => {
                tracing::debug!(sql, "executing statement");
            }
            LogEvent::Done => {
                tracing::info!("migration run complete");
            }
            LogEvent::Error { error } => {
                tracing::error!(error, "migration run failed");
            }
        }
    }
}

pub struct NullLogger;

impl MigrationLogger for NullLogger {
    fn log(&self, _event: LogEvent<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_event_serializes_to_tagged_json() {
        let event = LogEvent::File { version: "20260101000000", description: "init" };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"File","version":"20260101000000","description":"init"}"#);
    }

    #[test]
    fn done_event_serializes_without_fields() {
        let json = serde_json::to_string(&LogEvent::Done).unwrap();
        assert_eq!(json, r#"{"event":"Done"}"#);
    }
}
