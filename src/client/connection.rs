//! Connection manager for the MPD protocol.
//!
//! `Client` owns at most one live session. A session is the transport plus
//! everything that only makes sense while it is open: the write half, the
//! pending-request queue, the idle flag and the reader task that feeds
//! inbound bytes through framing, parsing and correlation.
//!
//! # Ordering
//!
//! Writes go through a FIFO-fair async mutex, so concurrent callers are
//! written in the order they asked. A command's continuation is queued
//! while that lock is held, right before its bytes are handed to the
//! transport, and withdrawn again if the write fails. The reader task
//! therefore never sees a reply whose continuation is missing, and queue
//! order always equals write order.

use std::io;
#[cfg(unix)]
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::correlator::{Continuation, Correlator, Reply};
use super::error::ClientError;
use super::events::Event;
use super::idle::{IdleState, Plan};
use crate::config::{ClientOptions, Target};
use crate::protocol::command::{self, IDLE, NOIDLE};
use crate::protocol::{parse_banner, FrameAssembler, FrameReader, ResponseFrame};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Async client for an MPD daemon.
///
/// The client is cheap to share behind an `Arc`; every operation takes
/// `&self` and concurrent commands are serialized in submission order.
///
/// # Connection Lifecycle
///
/// - `connect()` - Open the transport and wait for the daemon banner
/// - `command()` / `command_list()` / `idle()` - Talk to the daemon
/// - `disconnect()` - Close the transport (safe to repeat)
///
/// # Example
///
/// ```ignore
/// use mpdwire::{Client, Event, Target};
///
/// let client = Client::new();
/// client.connect(&Target::from_env()).await?;
///
/// let status = client.command("status").await?;
/// println!("volume: {:?}", status.first("volume"));
///
/// let mut events = client.subscribe();
/// client.idle().await?;
/// while let Ok(event) = events.recv().await {
///     if let Event::Changed(subsystems) = event {
///         println!("changed: {}", subsystems.join(", "));
///         client.idle().await?;
///     }
/// }
/// ```
pub struct Client {
    live: Mutex<Option<Live>>,
    events: broadcast::Sender<Event>,
    options: ClientOptions,
}

/// The current session and the task reading from it.
struct Live {
    session: Arc<Session>,
    reader: JoinHandle<()>,
}

impl Live {
    /// Stop reading and fail whatever was still waiting.
    fn tear_down(&self) {
        self.reader.abort();
        self.session.close();
    }
}

struct Session {
    target: Option<Target>,
    version: String,
    /// Outbound path; holding this lock is what serializes writers.
    writer: tokio::sync::Mutex<BoxedWriter>,
    correlator: Mutex<Correlator>,
    idle: IdleState,
    open: AtomicBool,
}

impl Session {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Mark the session dead and settle all pending requests.
    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.correlator().fail_all();
    }

    fn correlator(&self) -> MutexGuard<'_, Correlator> {
        self.correlator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write `line` through the idle state machine.
    async fn send(&self, line: &str) -> Result<Reply, ClientError> {
        let mut writer = self.writer.lock().await;
        if !self.is_open() {
            return Err(ClientError::NotConnected);
        }

        let (plan, reply) = self.prepare(line);
        match plan {
            Plan::Skip => {
                debug!("Nothing to write for {:?}", line.trim_end());
            }
            Plan::EnterIdle => {
                if let Err(e) = write_line(&mut writer, line).await {
                    self.idle.leave();
                    return Err(e);
                }
                debug!("Entered idle mode");
            }
            Plan::CancelIdle => {
                if let Err(e) = write_line(&mut writer, NOIDLE).await {
                    self.correlator().retract();
                    return Err(e);
                }
                debug!("Left idle mode");
            }
            Plan::Send { cancel_idle } => {
                if cancel_idle {
                    if let Err(e) = write_line(&mut writer, NOIDLE).await {
                        let mut correlator = self.correlator();
                        correlator.retract();
                        correlator.retract();
                        return Err(e);
                    }
                    debug!("Left idle mode before {:?}", line.trim_end());
                }

                if let Err(e) = write_line(&mut writer, line).await {
                    self.correlator().retract();
                    return Err(e);
                }
            }
        }
        Ok(reply)
    }

    /// Decide what to write and queue the continuations for it.
    ///
    /// Runs under the correlator lock, the same lock the reader holds while
    /// it settles an idle notification. A notification is therefore either
    /// published before this looks at the idle flag, or consumed by the
    /// discarding `noidle` continuation queued here.
    fn prepare(&self, line: &str) -> (Plan, Reply) {
        let mut correlator = self.correlator();
        let plan = self.idle.plan(line);

        let reply = match plan {
            Plan::Skip => Reply::immediate(),
            Plan::EnterIdle => {
                self.idle.enter();
                Reply::immediate()
            }
            Plan::CancelIdle => {
                correlator.enqueue(Continuation::Discard);
                self.idle.leave();
                Reply::immediate()
            }
            Plan::Send { cancel_idle } => {
                if cancel_idle {
                    correlator.enqueue(Continuation::Discard);
                    self.idle.leave();
                }
                let (continuation, reply) = Continuation::reply();
                correlator.enqueue(continuation);
                reply
            }
        };
        (plan, reply)
    }
}

/// Connect to a socket path, or to a Linux abstract socket for `@name`.
#[cfg(unix)]
async fn connect_unix(path: &Path) -> io::Result<UnixStream> {
    #[cfg(target_os = "linux")]
    {
        use std::os::linux::net::SocketAddrExt;
        use std::os::unix::ffi::OsStrExt;
        use std::os::unix::net::{SocketAddr, UnixStream as StdUnixStream};

        if let Some(name) = path.as_os_str().as_bytes().strip_prefix(b"@") {
            let addr = SocketAddr::from_abstract_name(name)?;
            let stream = StdUnixStream::connect_addr(&addr)?;
            stream.set_nonblocking(true)?;
            return UnixStream::from_std(stream);
        }
    }

    UnixStream::connect(path).await
}

/// Hand one newline-terminated command to the transport.
async fn write_line(writer: &mut BoxedWriter, line: &str) -> Result<(), ClientError> {
    let line = command::normalize(line);
    debug!("-> {:?}", line.trim_end());

    writer
        .write_all(line.as_bytes())
        .await
        .map_err(ClientError::Io)?;
    writer.flush().await.map_err(ClientError::Io)?;
    Ok(())
}

/// Read until the first complete line and require it to be the banner.
async fn await_banner<R>(
    reader: &mut R,
    frames: &mut FrameReader,
    chunk_size: usize,
) -> Result<String, ClientError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; chunk_size];

    loop {
        let n = reader.read(&mut buf).await.map_err(ClientError::Io)?;
        if n == 0 {
            return Err(ClientError::Handshake(
                "connection closed before the daemon greeted".to_string(),
            ));
        }

        if let Some(line) = frames.feed(&buf[..n]).next() {
            return parse_banner(&line).ok_or_else(|| {
                ClientError::Handshake(format!("unexpected greeting: {}", line.trim_end()))
            });
        }
    }
}

/// Inbound pipeline: bytes → lines → frames → correlator.
async fn read_loop<R>(
    session: Arc<Session>,
    mut reader: R,
    mut frames: FrameReader,
    events: broadcast::Sender<Event>,
    chunk_size: usize,
) where
    R: AsyncRead + Unpin,
{
    let mut assembler = FrameAssembler::new();
    let mut buf = vec![0u8; chunk_size];
    // Lines that arrived together with the banner.
    let mut n = 0;

    loop {
        for line in frames.feed(&buf[..n]) {
            if let Some(frame) = assembler.push_line(&line) {
                debug!("<- {}", frame.status());
                let mut correlator = session.correlator();
                // Nothing pending: this is the idle notification.
                if correlator.is_empty() {
                    session.idle.leave();
                }
                correlator.dispatch(frame);
            }
        }

        n = match reader.read(&mut buf).await {
            Ok(0) => {
                info!("Daemon closed the connection");
                session.close();
                let _ = events.send(Event::Closed);
                return;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Connection error: {}", e);
                session.close();
                let _ = events.send(Event::Error(e.to_string()));
                let _ = events.send(Event::Closed);
                return;
            }
        };
    }
}

impl Client {
    pub fn new() -> Self {
        Self::with_options(ClientOptions::default())
    }

    pub fn with_options(options: ClientOptions) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity);
        Self {
            live: Mutex::new(None),
            events,
            options,
        }
    }

    /// Connect to `target`, replacing any existing connection.
    ///
    /// Resolves once the daemon banner has been received.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ConnectionFailed` if the transport cannot be
    /// opened, or `ClientError::Handshake` if the peer does not greet like
    /// the daemon.
    pub async fn connect(&self, target: &Target) -> Result<(), ClientError> {
        self.disconnect().await;
        info!("Connecting to {}", target);

        match target {
            Target::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(ClientError::ConnectionFailed)?;
                // Commands are tiny; do not let Nagle hold them back.
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Could not disable Nagle's algorithm: {}", e);
                }
                self.attach(stream, Some(target.clone())).await
            }
            #[cfg(unix)]
            Target::Unix(path) => {
                let stream = connect_unix(path)
                    .await
                    .map_err(ClientError::ConnectionFailed)?;
                self.attach(stream, Some(target.clone())).await
            }
            #[cfg(not(unix))]
            Target::Unix(_) => Err(ClientError::ConnectionFailed(io::Error::new(
                io::ErrorKind::Unsupported,
                "Unix sockets are not available on this platform",
            ))),
        }
    }

    /// Run the protocol over an already-open stream.
    ///
    /// Behaves like [`connect`](Self::connect) after the transport has been
    /// opened: waits for the banner, then starts the reader.
    pub async fn connect_stream<S>(&self, stream: S) -> Result<(), ClientError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.disconnect().await;
        self.attach(stream, None).await
    }

    async fn attach<S>(&self, stream: S, target: Option<Target>) -> Result<(), ClientError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut read_half, write_half) = tokio::io::split(stream);
        let mut frames = FrameReader::new();
        let version =
            await_banner(&mut read_half, &mut frames, self.options.read_chunk_size).await?;

        let session = Arc::new(Session {
            target,
            version: version.clone(),
            writer: tokio::sync::Mutex::new(Box::new(write_half)),
            correlator: Mutex::new(Correlator::new(self.events.clone())),
            idle: IdleState::new(),
            open: AtomicBool::new(true),
        });

        let reader = tokio::spawn(read_loop(
            Arc::clone(&session),
            read_half,
            frames,
            self.events.clone(),
            self.options.read_chunk_size,
        ));

        // A concurrent connect may have won the race; the last one stays.
        if let Some(previous) = self.live().replace(Live { session, reader }) {
            previous.tear_down();
        }

        info!("Connected (protocol {})", version);
        let _ = self.events.send(Event::Ready { version });
        Ok(())
    }

    /// Close the connection. Does nothing when already disconnected.
    ///
    /// Requests still waiting for a response fail with
    /// `ClientError::ConnectionClosed`.
    pub async fn disconnect(&self) {
        let live = self.live().take();
        let Some(live) = live else {
            return;
        };

        live.tear_down();
        let mut writer = live.session.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!("Error shutting down transport: {}", e);
        }
        info!("Disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.session().is_some()
    }

    /// Issue one command and wait for its response.
    ///
    /// A trailing newline is appended when missing. Idle mode is handled
    /// transparently: a command issued while idling is preceded by `noidle`.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotConnected` when there is no connection (nothing is
    ///   written)
    /// - `ClientError::Ack` when the daemon rejects the command
    /// - `ClientError::ConnectionClosed` if the connection drops first
    ///
    /// # Example
    ///
    /// ```ignore
    /// let frame = client.command("status").await?;
    /// assert_eq!(frame.status(), "OK");
    /// ```
    pub async fn command(&self, command: &str) -> Result<ResponseFrame, ClientError> {
        self.submit(command).await?.await
    }

    /// Write a command and return the future of its response without
    /// awaiting it, so several commands can be pipelined.
    pub async fn submit(&self, command: &str) -> Result<Reply, ClientError> {
        let session = self.session().ok_or(ClientError::NotConnected)?;
        session.send(&command::normalize(command)).await
    }

    /// Issue `commands` as one atomic command list.
    ///
    /// With `ok_variant` the daemon acknowledges each sub-command with a
    /// `list_OK` line; those stay in the frame body and the single final
    /// status line settles the call.
    pub async fn command_list<I, S>(
        &self,
        commands: I,
        ok_variant: bool,
    ) -> Result<ResponseFrame, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.command(&command::command_list(commands, ok_variant))
            .await
    }

    /// Enter idle mode.
    ///
    /// Resolves as soon as the command is written; changes arrive later as
    /// [`Event::Frame`] and [`Event::Changed`]. Calling it while already
    /// idling writes nothing.
    pub async fn idle(&self) -> Result<(), ClientError> {
        self.submit(IDLE).await.map(drop)
    }

    /// Enter idle mode, only waking for the given subsystems.
    pub async fn idle_for<I, S>(&self, subsystems: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = IDLE.to_string();
        for subsystem in subsystems {
            line.push(' ');
            line.push_str(subsystem.as_ref());
        }
        self.submit(&line).await.map(drop)
    }

    /// Leave idle mode without issuing another command. A no-op when not
    /// idling.
    pub async fn noidle(&self) -> Result<(), ClientError> {
        self.submit(NOIDLE).await.map(drop)
    }

    pub fn is_idle(&self) -> bool {
        self.session().is_some_and(|session| session.idle.is_idle())
    }

    /// Protocol version from the banner of the current connection.
    pub fn server_version(&self) -> Option<String> {
        self.session().map(|session| session.version.clone())
    }

    /// Target of the current connection; `None` for streams attached with
    /// [`connect_stream`](Self::connect_stream).
    pub fn target(&self) -> Option<Target> {
        self.session().and_then(|session| session.target.clone())
    }

    /// Receive connection events. Subscriptions survive reconnects.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    fn live(&self) -> MutexGuard<'_, Option<Live>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current session, if it is still open.
    fn session(&self) -> Option<Arc<Session>> {
        self.live()
            .as_ref()
            .filter(|live| live.session.is_open())
            .map(|live| Arc::clone(&live.session))
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(live) = self.live().take() {
            live.tear_down();
        }
    }
}
