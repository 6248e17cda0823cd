//! Connection targets and client options.
//!
//! There is no configuration file. Callers either build a [`Target`]
//! directly or resolve one from the environment variables every MPD client
//! honours:
//!
//! - `MPD_HOST`: host name, or a socket path when it starts with `/` or `~`
//!   (`@name` is a Linux abstract socket)
//! - `MPD_PORT`: TCP port (default 6600)

use std::fmt;
use std::path::PathBuf;

use tracing::warn;

/// Port the daemon listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 6600;

pub const DEFAULT_HOST: &str = "localhost";

/// Events buffered per subscriber before slow receivers start lagging.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Bytes requested from the transport per read.
const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Where to connect: a TCP address or a Unix socket path, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Target {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Target::Tcp {
            host: host.into(),
            port,
        }
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Target::Unix(path.into())
    }

    /// The daemon's socket in the user runtime directory.
    pub fn local() -> Self {
        Target::Unix(default_socket_path())
    }

    /// Resolve the target from `MPD_HOST` and `MPD_PORT`.
    ///
    /// Falls back to `localhost:6600`.
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("MPD_HOST").ok().as_deref(),
            std::env::var("MPD_PORT").ok().as_deref(),
            dirs::home_dir(),
        )
    }

    fn from_values(host: Option<&str>, port: Option<&str>, home: Option<PathBuf>) -> Self {
        let port = match port.map(str::parse::<u16>) {
            Some(Ok(port)) => port,
            Some(Err(e)) => {
                warn!("Ignoring invalid MPD_PORT: {}", e);
                DEFAULT_PORT
            }
            None => DEFAULT_PORT,
        };

        let Some(mut host) = host.filter(|h| !h.is_empty()) else {
            return Target::tcp(DEFAULT_HOST, port);
        };

        // `password@host`: authentication is not supported, keep the host.
        // A leading `@` names an abstract socket and is not a password.
        let password = host
            .split_once('@')
            .filter(|(password, _)| !password.is_empty());
        if let Some((_, rest)) = password {
            warn!("MPD_HOST contains a password, which is not supported; ignoring it");
            host = rest;
        }

        if host.starts_with('/') || host.starts_with('@') {
            Target::unix(host)
        } else if let Some(relative) = host.strip_prefix('~') {
            match home {
                Some(home) => Target::Unix(home.join(relative.trim_start_matches('/'))),
                None => {
                    warn!("Cannot expand {} without a home directory", host);
                    Target::tcp(DEFAULT_HOST, port)
                }
            }
        } else {
            Target::tcp(host, port)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Target::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Resolve the default Unix socket path of the daemon.
///
/// Resolution order:
/// 1. `$XDG_RUNTIME_DIR/mpd/socket` (per-user daemon)
/// 2. `/run/mpd/socket` (system daemon)
pub fn default_socket_path() -> PathBuf {
    match dirs::runtime_dir() {
        Some(runtime_dir) => runtime_dir.join("mpd").join("socket"),
        None => PathBuf::from("/run/mpd/socket"),
    }
}

/// Tunables for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Size of each transport read.
    pub read_chunk_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}
