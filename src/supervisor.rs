//! Connection supervisor.
//!
//! A single tokio task owns the serial link, the [`EventFilter`] and the
//! [`ConnectionState`]. Host requests, open completions, incoming lines,
//! reconnect timers and the stats reset interval all arrive in one
//! `select!` loop, so nothing here needs a lock.
//!
//! ```text
//! host ──Command──┐
//!                 ├──> supervisor task ──BridgeEvent──> host
//! open / reader ──┘        │
//! timer tasks (Internal)   └── EventFilter
//! ```
//!
//! Every open attempt, scheduled retry and teardown bumps an epoch counter.
//! Internal messages carry the epoch they were created under; anything from
//! an older epoch is dropped, and a link that finished opening after it was
//! abandoned is closed straight away.

use crate::config::Config;
use crate::discovery::DeviceEnumerator;
use crate::error::{BridgeError, BridgeResult};
use crate::event::BridgeEvent;
use crate::filter::{EventFilter, FilterOutcome, StatsSnapshot};
use crate::port::{PortConfiguration, PortError, SerialLink, SerialTransport};
use crate::state::ConnectionState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Maximum number of host requests queued before callers wait.
const COMMAND_BUFFER_SIZE: usize = 32;

/// Floor for the stats reset period; `interval` rejects zero.
const MIN_STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Host requests.
#[derive(Debug)]
enum Command {
    Connect {
        path: String,
        reply: oneshot::Sender<bool>,
    },
    AutoConnect {
        path: Option<String>,
        reply: oneshot::Sender<bool>,
    },
    Reconnect {
        reply: oneshot::Sender<bool>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
    Stats {
        reply: oneshot::Sender<StatsSnapshot>,
    },
    ResetStats {
        reply: oneshot::Sender<StatsSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Messages the supervisor's own helper tasks send back to it.
#[derive(Debug)]
enum Internal {
    OpenFinished {
        epoch: u64,
        result: BridgeResult<OpenedLink>,
    },
    Line {
        epoch: u64,
        text: String,
        at: Instant,
    },
    LinkEnded {
        epoch: u64,
        error: Option<PortError>,
    },
    ReconnectDue {
        epoch: u64,
    },
}

#[derive(Debug)]
struct OpenedLink {
    path: String,
    link: Box<dyn SerialLink>,
}

/// What an open attempt should connect to.
#[derive(Debug, Clone)]
enum Target {
    Path(String),
    /// Ask the enumerator for its best pick.
    Discover,
}

/// Who started an open; decides where a failure leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// `connect(path)`: failure returns to idle.
    Manual,
    /// Timer, `reconnect()` or `auto_connect()`: failure continues the
    /// reconnect cycle.
    Automatic,
}

#[derive(Debug)]
struct PendingOpen {
    origin: Origin,
    reply: Option<oneshot::Sender<bool>>,
}

impl PendingOpen {
    fn finish(self, connected: bool) {
        if let Some(reply) = self.reply {
            let _ = reply.send(connected);
        }
    }
}

/// The task reading lines off an open link.
#[derive(Debug)]
struct ReaderHandle {
    path: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ReaderHandle {
    fn spawn(
        path: String,
        mut link: Box<dyn SerialLink>,
        epoch: u64,
        tx: mpsc::UnboundedSender<Internal>,
    ) -> Self {
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = &mut shutdown_rx => {
                        if let Err(e) = link.close().await {
                            warn!("Error closing {}: {}", link.name(), e);
                        }
                        return;
                    }
                    line = link.read_line() => {
                        match line {
                            Ok(Some(text)) => {
                                let at = Instant::now();
                                if tx.send(Internal::Line { epoch, text, at }).is_err() {
                                    let _ = link.close().await;
                                    return;
                                }
                            }
                            Ok(None) => {
                                let _ = link.close().await;
                                let _ = tx.send(Internal::LinkEnded { epoch, error: None });
                                return;
                            }
                            Err(e) => {
                                let _ = link.close().await;
                                let _ = tx.send(Internal::LinkEnded { epoch, error: Some(e) });
                                return;
                            }
                        }
                    }
                }
            }
        });

        Self {
            path,
            shutdown,
            task,
        }
    }

    /// Signal the reader to close its link and wait until it has.
    async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!("Reader task for {} ended abnormally: {}", self.path, e);
        }
    }
}

/// Handle to a running supervisor task.
///
/// Cloning is cheap; all clones talk to the same task. None of the device
/// operations fail: once the task is gone they report `false` / do nothing.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl SupervisorHandle {
    /// Open `path`. Resolves once the open succeeded or failed.
    ///
    /// Returns false if an open or close is already in flight.
    pub async fn connect(&self, path: impl Into<String>) -> bool {
        if self.refuse_while_busy() {
            return false;
        }
        let path = path.into();
        self.request(|reply| Command::Connect { path, reply })
            .await
            .unwrap_or(false)
    }

    /// Open `path`, or the enumerator's pick when `None`, as an automatic
    /// attempt: failure continues the reconnect cycle instead of going idle.
    pub async fn auto_connect(&self, path: Option<String>) -> bool {
        if self.refuse_while_busy() {
            return false;
        }
        self.request(|reply| Command::AutoConnect { path, reply })
            .await
            .unwrap_or(false)
    }

    /// Reset the attempt counter and retry the last path right away.
    pub async fn reconnect(&self) -> bool {
        if self.refuse_while_busy() {
            return false;
        }
        self.request(|reply| Command::Reconnect { reply })
            .await
            .unwrap_or(false)
    }

    /// Tear down the link, cancel pending retries and go idle.
    ///
    /// Resolves after the link has been released. Safe to call repeatedly.
    pub async fn close(&self) {
        let _ = self.request(|reply| Command::Close { reply }).await;
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Watch state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub async fn stats(&self) -> BridgeResult<StatsSnapshot> {
        self.request(|reply| Command::Stats { reply }).await
    }

    /// Start a new stats window; returns the closing one.
    pub async fn reset_stats(&self) -> BridgeResult<StatsSnapshot> {
        self.request(|reply| Command::ResetStats { reply }).await
    }

    /// Close and stop the supervisor task.
    pub async fn shutdown(&self) {
        let _ = self.request(|reply| Command::Shutdown { reply }).await;
    }

    /// An open or close in flight holds the actor; answer without queueing.
    fn refuse_while_busy(&self) -> bool {
        let state = self.state();
        if state.is_busy() {
            debug!("Refusing connect request while {}", state);
        }
        state.is_busy()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> BridgeResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| BridgeError::SupervisorGone)?;
        rx.await.map_err(|_| BridgeError::SupervisorGone)
    }
}

/// Start a supervisor task.
///
/// Events go to `events`; a dropped receiver is ignored. An invalid config
/// is logged and run with safe floors instead of failing. Must be called from
/// within a tokio runtime.
pub fn spawn(
    config: &Config,
    transport: Arc<dyn SerialTransport>,
    enumerator: DeviceEnumerator,
    events: mpsc::UnboundedSender<BridgeEvent>,
) -> SupervisorHandle {
    if let Err(e) = config.validate() {
        warn!("Starting supervisor with invalid configuration: {}", e);
    }

    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
    let (internal_tx, internal_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);

    let supervisor = Supervisor {
        transport,
        enumerator,
        port_config: config.device.port_configuration(),
        open_timeout: config.device.connection_timeout(),
        reconnect_delay: config.device.reconnect_delay(),
        max_attempts: config.device.max_reconnect_attempts,
        filter: EventFilter::new(&config.filter, Instant::now()),
        events,
        state_tx,
        internal_tx,
        epoch: 0,
        attempts: 0,
        last_path: None,
        pending: None,
        reader: None,
        timer: None,
    };

    let stats_every = config.filter.stats_reset_interval().max(MIN_STATS_INTERVAL);
    tokio::spawn(supervisor.run(commands_rx, internal_rx, stats_every));

    SupervisorHandle {
        commands: commands_tx,
        state: state_rx,
    }
}

struct Supervisor {
    transport: Arc<dyn SerialTransport>,
    enumerator: DeviceEnumerator,
    port_config: PortConfiguration,
    open_timeout: Duration,
    reconnect_delay: Duration,
    max_attempts: u32,
    filter: EventFilter,
    events: mpsc::UnboundedSender<BridgeEvent>,
    state_tx: watch::Sender<ConnectionState>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    epoch: u64,
    /// Consecutive failed automatic attempts.
    attempts: u32,
    last_path: Option<String>,
    pending: Option<PendingOpen>,
    reader: Option<ReaderHandle>,
    timer: Option<JoinHandle<()>>,
}

impl Supervisor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
        stats_every: Duration,
    ) {
        let mut stats_tick = time::interval_at(Instant::now() + stats_every, stats_every);
        stats_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Connection supervisor started");

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("All supervisor handles dropped");
                        self.close().await;
                        break;
                    };
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
                Some(msg) = internal.recv() => self.handle_internal(msg),
                _ = stats_tick.tick() => {
                    self.filter.reset_stats(Instant::now());
                }
            }
        }

        info!("Connection supervisor stopped");
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Connection state: {} -> {}", previous, state);
        }
    }

    fn emit(&self, event: BridgeEvent) {
        let _ = self.events.send(event);
    }

    fn emit_status(&self, text: impl Into<String>) {
        self.emit(BridgeEvent::status(text));
    }

    /// Returns false when the loop should stop.
    async fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Connect { path, reply } => {
                if self.is_busy() {
                    let _ = reply.send(false);
                    return true;
                }
                self.cancel_timer();
                self.teardown_link().await;
                self.begin_open(Target::Path(path), Origin::Manual, Some(reply));
            }
            Command::AutoConnect { path, reply } => {
                if self.is_busy() {
                    let _ = reply.send(false);
                    return true;
                }
                self.cancel_timer();
                self.teardown_link().await;
                self.attempts = 0;
                let target = path.map(Target::Path).unwrap_or(Target::Discover);
                self.begin_open(target, Origin::Automatic, Some(reply));
            }
            Command::Reconnect { reply } => {
                if self.is_busy() {
                    let _ = reply.send(false);
                    return true;
                }
                self.cancel_timer();
                self.teardown_link().await;
                self.attempts = 0;
                info!("Manual reconnect requested");
                self.begin_open(self.retry_target(), Origin::Automatic, Some(reply));
            }
            Command::Close { reply } => {
                self.close().await;
                let _ = reply.send(());
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.filter.snapshot(Instant::now()));
            }
            Command::ResetStats { reply } => {
                let _ = reply.send(self.filter.reset_stats(Instant::now()));
            }
            Command::Shutdown { reply } => {
                self.close().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn is_busy(&self) -> bool {
        let state = self.state();
        if state.is_busy() {
            debug!("Ignoring connect request while {}", state);
            true
        } else {
            false
        }
    }

    fn handle_internal(&mut self, msg: Internal) {
        match msg {
            Internal::OpenFinished { epoch, result } => {
                if epoch != self.epoch {
                    debug!("Discarding stale open result (epoch {})", epoch);
                    if let Ok(mut opened) = result {
                        tokio::spawn(async move {
                            let _ = opened.link.close().await;
                        });
                    }
                    return;
                }
                let Some(pending) = self.pending.take() else {
                    return;
                };
                match result {
                    Ok(opened) => self.on_open(opened, pending),
                    Err(e) => self.on_open_failed(e, pending),
                }
            }
            Internal::Line { epoch, text, at } => {
                if epoch != self.epoch || !self.state().is_open() {
                    debug!("Dropping line from closed link: {:?}", text);
                    return;
                }
                self.on_line(&text, at);
            }
            Internal::LinkEnded { epoch, error } => {
                if epoch != self.epoch {
                    return;
                }
                let path = self.reader.take().map(|r| r.path).unwrap_or_default();
                match error {
                    Some(e) => {
                        self.emit_status(format!("error: {}", e));
                        warn!("{}: {}", path, BridgeError::Transport(e));
                    }
                    None => warn!("Connection to {} closed by device", path),
                }
                self.emit(BridgeEvent::Disconnected);
                self.schedule_reconnect();
            }
            Internal::ReconnectDue { epoch } => {
                if epoch != self.epoch || !matches!(self.state(), ConnectionState::Reconnecting(_))
                {
                    return;
                }
                self.timer = None;
                info!(
                    "Reconnect attempt {}/{}",
                    self.attempts, self.max_attempts
                );
                self.begin_open(self.retry_target(), Origin::Automatic, None);
            }
        }
    }

    fn retry_target(&self) -> Target {
        self.last_path
            .clone()
            .map(Target::Path)
            .unwrap_or(Target::Discover)
    }

    fn begin_open(&mut self, target: Target, origin: Origin, reply: Option<oneshot::Sender<bool>>) {
        self.epoch += 1;
        let epoch = self.epoch;
        if let Some(previous) = self.pending.replace(PendingOpen { origin, reply }) {
            previous.finish(false);
        }
        self.set_state(ConnectionState::Connecting);

        let transport = Arc::clone(&self.transport);
        let enumerator = self.enumerator.clone();
        let config = self.port_config.clone();
        let open_timeout = self.open_timeout;
        let tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let result = open_target(transport, enumerator, target, config, open_timeout).await;
            let _ = tx.send(Internal::OpenFinished { epoch, result });
        });
    }

    fn on_open(&mut self, opened: OpenedLink, pending: PendingOpen) {
        let OpenedLink { path, link } = opened;
        info!("Connected to {}", path);

        self.attempts = 0;
        self.last_path = Some(path.clone());
        self.reader = Some(ReaderHandle::spawn(
            path.clone(),
            link,
            self.epoch,
            self.internal_tx.clone(),
        ));
        self.set_state(ConnectionState::Open);
        self.emit_status(format!("connected: {}", path));
        self.emit(BridgeEvent::Connected(path));
        pending.finish(true);
    }

    fn on_open_failed(&mut self, e: BridgeError, pending: PendingOpen) {
        error!("Connection failed: {}", e);
        match &e {
            BridgeError::NoDevice => self.emit_status("not found"),
            other => self.emit_status(format!("error: {}", other)),
        }

        match pending.origin {
            Origin::Manual => self.set_state(ConnectionState::Idle),
            Origin::Automatic => self.schedule_reconnect(),
        }
        pending.finish(false);
    }

    fn on_line(&mut self, text: &str, at: Instant) {
        match self.filter.process(text, at) {
            FilterOutcome::Accepted(event) => self.emit(BridgeEvent::ButtonPressed(event)),
            rejected => {
                if let Some(status) = rejected.status_message() {
                    self.emit_status(status);
                }
            }
        }
    }

    /// Either schedule the next automatic attempt or give up.
    fn schedule_reconnect(&mut self) {
        if self.attempts >= self.max_attempts {
            let exhausted = BridgeError::Exhausted {
                attempts: self.attempts,
            };
            warn!("Connection supervisor {}", exhausted);
            self.set_state(ConnectionState::Exhausted);
            self.emit_status("disconnected: max attempts reached");
            self.emit(BridgeEvent::MaxReconnectReached);
            return;
        }

        self.attempts += 1;
        self.set_state(ConnectionState::Reconnecting(self.attempts));
        self.emit_status(format!(
            "reconnecting ({}/{})",
            self.attempts, self.max_attempts
        ));

        self.epoch += 1;
        let epoch = self.epoch;
        let delay = self.reconnect_delay;
        let tx = self.internal_tx.clone();
        self.cancel_timer();
        self.timer = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(Internal::ReconnectDue { epoch });
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Close the current link, if any, without touching the retry state.
    async fn teardown_link(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.epoch += 1;
            self.set_state(ConnectionState::Closing);
            let path = reader.path.clone();
            reader.stop().await;
            info!("Closed {}", path);
        }
    }

    async fn close(&mut self) {
        let was = self.state();
        self.set_state(ConnectionState::Closing);
        self.epoch += 1;
        self.cancel_timer();
        if let Some(pending) = self.pending.take() {
            debug!("Abandoning in-flight open");
            pending.finish(false);
        }
        self.teardown_link().await;
        self.attempts = 0;
        if was != ConnectionState::Idle {
            info!("Connection closed");
        }
        self.set_state(ConnectionState::Idle);
    }
}

async fn open_target(
    transport: Arc<dyn SerialTransport>,
    enumerator: DeviceEnumerator,
    target: Target,
    config: PortConfiguration,
    open_timeout: Duration,
) -> BridgeResult<OpenedLink> {
    let path = match target {
        Target::Path(path) => path,
        Target::Discover => {
            let best = tokio::task::spawn_blocking(move || enumerator.find_best())
                .await
                .map_err(|e| BridgeError::Enumeration(e.to_string()))?;
            best.map(|device| device.path).ok_or(BridgeError::NoDevice)?
        }
    };

    debug!("Opening {} at {} baud", path, config.baud_rate);
    match time::timeout(open_timeout, transport.open(&path, &config)).await {
        Ok(Ok(link)) => Ok(OpenedLink { path, link }),
        Ok(Err(e)) => Err(BridgeError::open(path, e)),
        Err(_) => Err(BridgeError::open(path, PortError::timeout(open_timeout))),
    }
}
