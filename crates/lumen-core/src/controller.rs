// ── Controller abstraction ──
//
// Full lifecycle management for a light authority connection.
// Handles the initial full query, the update stream bridge, optional
// periodic resync, and serialized command execution.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use lumen_api::{LightsClient, StreamEvent, StreamHandle};
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::model::{Light, LightKey};
use crate::reconcile::{Inbound, Reconciler};
use crate::store::LightRegistry;
use crate::stream::{LightSnapshot, LightStream};

const COMMAND_CHANNEL_SIZE: usize = 64;
const STREAM_EVENT_CHANNEL_SIZE: usize = 256;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The update stream dropped abnormally and is being re-opened.
    /// Commands and queries still work.
    Reconnecting { attempt: u32 },
    Failed,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the light
/// registry; everything outside gets snapshots or subscriptions.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    registry: Arc<LightRegistry>,
    connection_state: watch::Sender<ConnectionState>,
    stream_event_tx: broadcast::Sender<StreamEvent>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    client: Mutex<Option<Arc<LightsClient>>>,
    stream: Mutex<Option<StreamHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a new Controller from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to query the authority and start
    /// background tasks.
    pub fn new(config: ControllerConfig) -> Self {
        let registry = Arc::new(LightRegistry::new());
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (stream_event_tx, _) = broadcast::channel(STREAM_EVENT_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                registry,
                connection_state,
                stream_event_tx,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel,
                client: Mutex::new(None),
                stream: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> &Arc<LightRegistry> {
        &self.inner.registry
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect to the authority.
    ///
    /// Builds the HTTP client, performs the initial full query, then
    /// spawns background tasks (command processor, update stream bridge,
    /// periodic refresh).
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.set_state(ConnectionState::Connecting);

        let config = &self.inner.config;
        let client = match LightsClient::new(config.url.clone(), &config.transport()) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                self.set_state(ConnectionState::Failed);
                return Err(e.into());
            }
        };
        *self.inner.client.lock().await = Some(Arc::clone(&client));

        // Initial data load
        if let Err(e) = self.refresh().await {
            *self.inner.client.lock().await = None;
            self.set_state(ConnectionState::Failed);
            return Err(e);
        }
        // Before the stream starts, so its own transitions are never overwritten.
        self.set_state(ConnectionState::Connected);

        // Spawn background tasks
        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let ctrl = self.clone();
            handles.push(tokio::spawn(command_processor_task(ctrl, rx)));
        }

        if config.stream_enabled {
            self.spawn_stream(&client, &mut handles).await;
        }

        let interval_secs = config.refresh_interval_secs;
        if interval_secs > 0 {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(refresh_task(ctrl, interval_secs, cancel)));
        }
        drop(handles);

        info!(url = %config.url, lights = self.inner.registry.len(), "connected to authority");
        Ok(())
    }

    /// Disconnect from the authority.
    ///
    /// Closes the update stream normally (no reconnect), cancels and
    /// joins background tasks, and resets the connection state to
    /// [`Disconnected`](ConnectionState::Disconnected).
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        let stream = self.inner.stream.lock().await.take();
        if let Some(handle) = stream {
            handle.join().await;
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        *self.inner.client.lock().await = None;
        self.set_state(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Query every light and replace the registry with the response.
    ///
    /// On any failure the registry is left untouched.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let client = self.client().await?;
        let response = client.list_lights().await?;
        Reconciler::apply(&self.inner.registry, Inbound::Full(response));
        Ok(())
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command against the authority.
    ///
    /// Sends the command through the internal channel to the command
    /// processor task and awaits the result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let accepting = matches!(
            *self.inner.connection_state.borrow(),
            ConnectionState::Connected | ConnectionState::Reconnecting { .. }
        );
        if !accepting {
            return Err(CoreError::ControllerDisconnected);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();

        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerDisconnected)?;

        rx.await.map_err(|_| CoreError::ControllerDisconnected)?
    }

    /// Request a power change. The registry follows when the authority
    /// pushes the resulting update.
    pub async fn set_power(&self, key: LightKey, on: bool) -> Result<(), CoreError> {
        self.execute(Command::SetPower { key, on }).await?;
        Ok(())
    }

    /// Request a brightness change. The registry follows when the
    /// authority pushes the resulting update.
    pub async fn set_brightness(&self, key: LightKey, brightness: i32) -> Result<(), CoreError> {
        self.execute(Command::SetBrightness { key, brightness })
            .await?;
        Ok(())
    }

    /// Create a light and refresh. Returns its key when it can be determined.
    pub async fn create_light(&self, name: impl Into<String>) -> Result<Option<LightKey>, CoreError> {
        match self
            .execute(Command::CreateLight { name: name.into() })
            .await?
        {
            CommandResult::Created(key) => Ok(key),
            CommandResult::Ok => Ok(None),
        }
    }

    /// Delete a light and refresh.
    pub async fn delete_light(&self, key: LightKey) -> Result<(), CoreError> {
        self.execute(Command::DeleteLight { key }).await?;
        Ok(())
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: connect, run closure, disconnect.
    ///
    /// Optimized for CLI: disables the update stream and periodic
    /// refresh since we only need a single request-response cycle.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.stream_enabled = false;
        cfg.refresh_interval_secs = 0;

        let controller = Controller::new(cfg);
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to update stream lifecycle and message notifications.
    ///
    /// Messages are broadcast after they have been applied to the registry.
    pub fn stream_events(&self) -> broadcast::Receiver<StreamEvent> {
        self.inner.stream_event_tx.subscribe()
    }

    /// Stream frames dropped because they were not valid updates.
    pub async fn malformed_stream_payloads(&self) -> u64 {
        self.inner
            .stream
            .lock()
            .await
            .as_ref()
            .map_or(0, StreamHandle::malformed_count)
    }

    // ── Registry accessors ───────────────────────────────────────

    pub fn lights_snapshot(&self) -> LightSnapshot {
        self.inner.registry.snapshot()
    }

    pub fn lights(&self) -> LightStream {
        self.inner.registry.subscribe()
    }

    /// Find a light by the textual form of its identifiers.
    pub fn find_light(&self, group: &str, light: &str) -> Option<Arc<Light>> {
        self.inner
            .registry
            .snapshot()
            .iter()
            .find(|l| l.key().matches_display(group, light))
            .map(Arc::clone)
    }

    // ── Private helpers ──────────────────────────────────────────

    async fn client(&self) -> Result<Arc<LightsClient>, CoreError> {
        self.inner
            .client
            .lock()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or(CoreError::ControllerDisconnected)
    }

    fn set_state(&self, state: ConnectionState) {
        self.inner.connection_state.send_replace(state);
    }

    /// Open the update stream and bridge its events into the registry.
    async fn spawn_stream(&self, client: &LightsClient, handles: &mut Vec<JoinHandle<()>>) {
        let url = match client.stream_url() {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "cannot derive update stream URL (stream disabled)");
                return;
            }
        };

        let (handle, rx) = StreamHandle::connect(
            url,
            self.inner.config.stream_options(),
            self.inner.cancel.child_token(),
        );
        *self.inner.stream.lock().await = Some(handle);

        let ctrl = self.clone();
        handles.push(tokio::spawn(stream_bridge_task(ctrl, rx)));
    }

    /// Apply one stream event to the registry and connection state.
    fn handle_stream_event(&self, event: &StreamEvent, attempt: &mut u32) {
        match event {
            StreamEvent::Opened { url } => {
                *attempt = 0;
                info!(url = %url, "update stream open");
                self.set_state(ConnectionState::Connected);
            }
            StreamEvent::Message(update) => {
                Reconciler::apply(&self.inner.registry, Inbound::Update(update.clone()));
            }
            StreamEvent::Closed {
                code,
                reason,
                normal,
            } => {
                if *normal {
                    info!(code, reason = %reason, "update stream closed normally");
                } else if self.inner.config.reconnect_on_abnormal_close {
                    *attempt = attempt.saturating_add(1);
                    warn!(code, reason = %reason, attempt = *attempt, "update stream lost, reconnecting");
                    self.set_state(ConnectionState::Reconnecting { attempt: *attempt });
                } else {
                    warn!(code, reason = %reason, "update stream lost (reconnect disabled)");
                }
            }
            StreamEvent::Error { message } => {
                debug!(error = %message, "update stream error");
            }
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically resync the registry with a full query.
async fn refresh_task(controller: Controller, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

/// Apply stream events to the registry in the order they arrive.
async fn stream_bridge_task(controller: Controller, mut rx: mpsc::UnboundedReceiver<StreamEvent>) {
    let cancel = controller.inner.cancel.clone();
    let mut attempt: u32 = 0;
    let mut lost = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else {
                    // The stream only ends on its own after giving up on a lost session.
                    if lost && !cancel.is_cancelled() {
                        warn!(attempts = attempt, "update stream lost for good");
                        controller.set_state(ConnectionState::Failed);
                    }
                    break;
                };
                match &event {
                    StreamEvent::Opened { .. } => lost = false,
                    StreamEvent::Closed { normal, .. } => lost = !normal,
                    StreamEvent::Message(_) | StreamEvent::Error { .. } => {}
                }
                controller.handle_stream_event(&event, &mut attempt);
                let _ = controller.inner.stream_event_tx.send(event);
            }
        }
    }
    debug!("update stream bridge exiting");
}

/// Process commands from the mpsc channel one at a time.
async fn command_processor_task(controller: Controller, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = controller.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    let client = controller.client().await?;
    let registry = &controller.inner.registry;

    match cmd {
        Command::SetPower { key, on } => {
            client.set_power(&key.group_id, &key.light_id, on).await?;
            debug!(%key, on, "power change requested");
            Ok(CommandResult::Ok)
        }

        Command::SetBrightness { key, brightness } => {
            client
                .set_brightness(&key.group_id, &key.light_id, brightness)
                .await?;
            debug!(%key, brightness, "brightness change requested");
            Ok(CommandResult::Ok)
        }

        Command::CreateLight { name } => {
            let before: HashSet<LightKey> = registry.snapshot().iter().map(|l| l.key()).collect();
            let echoed = client.create_light(&name).await?;
            refresh_after_command(controller, "create").await;

            let key = echoed
                .map(|l| Light::from(l).key())
                .or_else(|| infer_created_key(&registry.snapshot(), &before, &name));
            info!(name = %name, key = ?key, "light created");
            Ok(CommandResult::Created(key))
        }

        Command::DeleteLight { key } => {
            client.delete_light(&key.group_id, &key.light_id).await?;
            refresh_after_command(controller, "delete").await;
            info!(%key, "light deleted");
            Ok(CommandResult::Ok)
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// The command already succeeded at the authority; a failed resync is
/// logged and left for the next refresh.
async fn refresh_after_command(controller: &Controller, op: &str) {
    if let Err(e) = controller.refresh().await {
        warn!(error = %e, op, "refresh after command failed");
    }
}

/// The single light named `name` that was not present before the create.
fn infer_created_key(
    snapshot: &[Arc<Light>],
    before: &HashSet<LightKey>,
    name: &str,
) -> Option<LightKey> {
    let mut candidates = snapshot
        .iter()
        .filter(|l| l.name == name)
        .map(|l| l.key())
        .filter(|k| !before.contains(k));
    let first = candidates.next()?;
    candidates.next().is_none().then_some(first)
}
