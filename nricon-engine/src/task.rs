//! Display task: the async event adapter
//!
//! External collaborators push typed signals through a [`DisplayHandle`];
//! the [`DisplayTask`] serializes them into one queue and feeds them to the
//! [`DisplayEngine`](crate::machine::DisplayEngine) one at a time. Timer
//! expirations are scheduled as delayed self-messages on the same queue, so
//! they never race with event processing; a superseded expiry is dropped by
//! its generation token when it finally arrives. The resulting override
//! network type is published on a watch channel for the rendering
//! collaborator.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use nricon_common::config::CarrierDisplayConfig;
use nricon_common::error::{Error, Result};
use nricon_common::types::{
    LinkStatus, OverrideType, PhysicalChannelConfig, ServiceSnapshot,
};

use crate::machine::{DisplayEngine, EngineEvent};

/// Capacity of the display task's event queue.
const EVENT_QUEUE_CAPACITY: usize = 64;

/// Task message envelope wrapping typed messages with control signals.
#[derive(Debug)]
pub enum TaskMessage<T> {
    /// Regular message payload
    Message(T),
    /// Shutdown signal - task should terminate gracefully
    Shutdown,
}

impl<T> TaskMessage<T> {
    /// Creates a new message envelope containing the given payload.
    pub fn message(msg: T) -> Self {
        TaskMessage::Message(msg)
    }

    /// Creates a shutdown signal.
    pub fn shutdown() -> Self {
        TaskMessage::Shutdown
    }

    /// Returns true if this is a shutdown signal.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, TaskMessage::Shutdown)
    }

    /// Returns the message payload if present, or None for shutdown.
    pub fn into_message(self) -> Option<T> {
        match self {
            TaskMessage::Message(msg) => Some(msg),
            TaskMessage::Shutdown => None,
        }
    }
}

/// Base trait for async actor tasks processing messages from a channel.
#[async_trait::async_trait]
pub trait Task: Send + 'static {
    /// The message type this task processes.
    type Message: Send;

    /// Runs the task's main loop, processing messages until shutdown.
    async fn run(&mut self, rx: mpsc::Receiver<TaskMessage<Self::Message>>);
}

/// The display engine's actor task.
pub struct DisplayTask {
    engine: DisplayEngine,
    /// Sender side of the task's own queue, used for delayed timer
    /// self-messages
    self_tx: mpsc::Sender<TaskMessage<EngineEvent>>,
    override_tx: watch::Sender<OverrideType>,
    timers_tx: watch::Sender<bool>,
}

impl DisplayTask {
    /// Creates the task, its inbound handle, and the receiver to pass to
    /// [`Task::run`].
    pub fn new(
        config: CarrierDisplayConfig,
    ) -> (Self, DisplayHandle, mpsc::Receiver<TaskMessage<EngineEvent>>) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (override_tx, override_rx) = watch::channel(OverrideType::None);
        let (timers_tx, timers_rx) = watch::channel(false);
        let task = Self {
            engine: DisplayEngine::new(config),
            self_tx: tx.clone(),
            override_tx,
            timers_tx,
        };
        let handle = DisplayHandle {
            tx,
            override_rx,
            timers_rx,
        };
        (task, handle, rx)
    }

    fn process(&mut self, event: EngineEvent) {
        self.engine.handle_event(event);

        // Schedule expiries as delayed self-messages on the same queue
        for request in self.engine.take_timer_requests() {
            let tx = self.self_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(request.duration()).await;
                // The task may be gone by the time the delay elapses
                let _ = tx
                    .send(TaskMessage::Message(EngineEvent::TimerExpired {
                        kind: request.kind,
                        generation: request.generation,
                    }))
                    .await;
            });
        }

        self.override_tx.send_if_modified(|current| {
            let latest = self.engine.override_type();
            if *current != latest {
                *current = latest;
                true
            } else {
                false
            }
        });
        self.timers_tx.send_if_modified(|current| {
            let latest = self.engine.any_timer_active();
            if *current != latest {
                *current = latest;
                true
            } else {
                false
            }
        });
    }
}

#[async_trait::async_trait]
impl Task for DisplayTask {
    type Message = EngineEvent;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<EngineEvent>>) {
        debug!("Display task started");
        while let Some(msg) = rx.recv().await {
            match msg {
                TaskMessage::Shutdown => {
                    debug!("Display task shutting down");
                    break;
                }
                TaskMessage::Message(event) => self.process(event),
            }
        }
        debug!("Display task stopped");
    }
}

/// Cloneable inbound API of the display task.
///
/// All notification methods enqueue an event and return once it is queued;
/// processing is asynchronous and strictly ordered.
#[derive(Clone)]
pub struct DisplayHandle {
    tx: mpsc::Sender<TaskMessage<EngineEvent>>,
    override_rx: watch::Receiver<OverrideType>,
    timers_rx: watch::Receiver<bool>,
}

impl DisplayHandle {
    async fn send(&self, event: EngineEvent) -> Result<()> {
        self.tx
            .send(TaskMessage::Message(event))
            .await
            .map_err(|_| Error::Task("display task is not running".to_string()))
    }

    /// Notifies the task of a new service-state snapshot.
    pub async fn service_state_changed(&self, snapshot: ServiceSnapshot) -> Result<()> {
        self.send(EngineEvent::ServiceStateChanged(snapshot)).await
    }

    /// Notifies the task of a physical link status change.
    pub async fn physical_link_status_changed(&self, status: LinkStatus) -> Result<()> {
        self.send(EngineEvent::PhysicalLinkStatusChanged(status)).await
    }

    /// Notifies the task of a new physical channel configuration list.
    pub async fn channel_configs_changed(
        &self,
        configs: Vec<PhysicalChannelConfig>,
    ) -> Result<()> {
        self.send(EngineEvent::PhysicalChannelConfigsChanged(configs))
            .await
    }

    /// Notifies the task that channel-config notifications were enabled or
    /// disabled.
    pub async fn channel_config_notifications_changed(&self, on: bool) -> Result<()> {
        self.send(EngineEvent::PhysicalChannelConfigNotifChanged(on))
            .await
    }

    /// Delivers a new carrier configuration.
    pub async fn carrier_config_changed(&self, config: CarrierDisplayConfig) -> Result<()> {
        self.send(EngineEvent::CarrierConfigChanged(config)).await
    }

    /// Notifies the task of a preferred-network-mode change.
    pub async fn preferred_network_mode_changed(&self, bitmask: u64) -> Result<()> {
        self.send(EngineEvent::PreferredNetworkModeChanged(bitmask))
            .await
    }

    /// Notifies the task of a PCO-signalled NR-advanced allowance change.
    pub async fn nr_advanced_by_pco_changed(&self, allowed: bool) -> Result<()> {
        self.send(EngineEvent::NrAdvancedByPcoChanged(allowed)).await
    }

    /// Notifies the task that the radio turned off or became unavailable.
    pub async fn radio_off_or_unavailable(&self) -> Result<()> {
        self.send(EngineEvent::RadioOffOrUnavailable).await
    }

    /// Notifies the task that the device entered or left idle mode.
    pub async fn device_idle_mode_changed(&self, idle: bool) -> Result<()> {
        self.send(EngineEvent::DeviceIdleModeChanged(idle)).await
    }

    /// Requests a re-evaluation against the cached facts.
    pub async fn update(&self) -> Result<()> {
        self.send(EngineEvent::Update).await
    }

    /// Requests a graceful shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(TaskMessage::Shutdown)
            .await
            .map_err(|_| Error::Task("display task is not running".to_string()))
    }

    /// A watch receiver that yields the override network type whenever it
    /// changes.
    pub fn override_watch(&self) -> watch::Receiver<OverrideType> {
        self.override_rx.clone()
    }

    /// The most recently published override network type.
    pub fn current_override(&self) -> OverrideType {
        *self.override_rx.borrow()
    }

    /// True while either grace-period timer is outstanding.
    pub fn any_timer_active(&self) -> bool {
        *self.timers_rx.borrow()
    }
}

/// Spawns the display task onto the current tokio runtime.
pub fn spawn_display_task(config: CarrierDisplayConfig) -> (DisplayHandle, JoinHandle<()>) {
    let (mut task, handle, rx) = DisplayTask::new(config);
    let join = tokio::spawn(async move { task.run(rx).await });
    (handle, join)
}
