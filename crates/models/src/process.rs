use crate::GantryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verbosity accepted by the ASGI server's `--log-level` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Critical => "critical",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LogLevel {
    type Err = GantryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(LogLevel::Critical),
            "error" => Ok(LogLevel::Error),
            "warning" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(GantryError::ConfigError {
                reason: format!("invalid log level: {s}"),
            }),
        }
    }
}

/// How the container's single process is started.
///
/// `Script` runs the entrypoint under the interpreter directly. `Server`
/// and `ServerVerbose` host the application object under an ASGI server
/// bound to all interfaces on the service port; the verbose variant adds
/// HTTP access logging and unbuffered stdio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    Script,
    Server,
    ServerVerbose,
}

impl Variant {
    pub fn is_server(&self) -> bool {
        !matches!(self, Variant::Script)
    }

    pub fn access_log(&self) -> bool {
        matches!(self, Variant::ServerVerbose)
    }

    /// PYTHONUNBUFFERED=1 so log lines reach the collector as they are
    /// emitted instead of on flush.
    pub fn unbuffered_io(&self) -> bool {
        matches!(self, Variant::ServerVerbose)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Variant::Script => "script",
            Variant::Server => "server",
            Variant::ServerVerbose => "server-verbose",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Variant {
    type Err = GantryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "script" => Ok(Variant::Script),
            "server" => Ok(Variant::Server),
            "server-verbose" => Ok(Variant::ServerVerbose),
            _ => Err(GantryError::ConfigError {
                reason: format!("invalid variant: {s}"),
            }),
        }
    }
}

/// The single command executed at container start. Constructed once at
/// image build time as the image CMD and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessSpec {
    /// Interpreter + script pair, e.g. `python app.py`.
    Script {
        interpreter: String,
        entrypoint: String,
    },
    /// ASGI server hosting an application object.
    AsgiServer {
        app_ref: String,
        host: String,
        port: u16,
        log_level: Option<LogLevel>,
        access_log: bool,
    },
}

impl ProcessSpec {
    /// Exec-form argv baked into the image CMD.
    pub fn argv(&self) -> Vec<String> {
        match self {
            ProcessSpec::Script {
                interpreter,
                entrypoint,
            } => vec![interpreter.clone(), entrypoint.clone()],
            ProcessSpec::AsgiServer {
                app_ref,
                host,
                port,
                log_level,
                access_log,
            } => {
                let mut argv = vec![
                    "uvicorn".to_string(),
                    app_ref.clone(),
                    "--host".to_string(),
                    host.clone(),
                    "--port".to_string(),
                    port.to_string(),
                ];
                if let Some(level) = log_level {
                    argv.push("--log-level".to_string());
                    argv.push(level.to_string());
                }
                // The server logs requests by default, so the quiet
                // variant needs the negative flag spelled out.
                if *access_log {
                    argv.push("--access-log".to_string());
                } else {
                    argv.push("--no-access-log".to_string());
                }
                argv
            }
        }
    }

    /// Port the process listens on, if it serves HTTP at all.
    pub fn listen_port(&self) -> Option<u16> {
        match self {
            ProcessSpec::Script { .. } => None,
            ProcessSpec::AsgiServer { port, .. } => Some(*port),
        }
    }
}
