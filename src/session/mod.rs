//! Composition root
//!
//! A [`Session`] owns the snapshot store, endpoint, mailbox, sampling driver
//! and send worker of one plugin instance, and is the single place control
//! events are applied. Share it behind an `Arc`: the audio thread calls
//! [`Session::on_block`], the control thread everything else.

pub mod events;
pub mod parameter;
pub mod state;

pub use events::{ControlEvent, StateListener};
pub use parameter::PortParameter;
pub use state::{PluginState, UiState};

use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::driver::{wake_channel, DriverState, Mailbox, SamplingDriver, SendWorker, WorkerParts};
use crate::endpoint::{Endpoint, EndpointConfig, SharedEndpointConfig};
use crate::error::{ConfigError, Error, Result};
use crate::network::{DatagramSink, SenderStats, SenderStatsSnapshot, TransportSender};
use crate::protocol::WireOptions;
use crate::transport::{PlayHead, SharedSnapshotStore, SnapshotStore, TransportSnapshot};

enum Worker {
    Stopped(WorkerParts),
    Running(SendWorker),
    // Only reachable if the worker thread panicked
    Lost,
}

/// One plugin instance
pub struct Session {
    store: SharedSnapshotStore,
    endpoint: SharedEndpointConfig,
    mailbox: Arc<Mailbox>,
    driver: SamplingDriver,
    worker: Mutex<Worker>,
    sender_stats: Arc<SenderStats>,
    port_param: Mutex<PortParameter>,
    ui: Mutex<UiState>,
    listeners: Mutex<Vec<Box<dyn StateListener>>>,
}

impl Session {
    /// Session sending over UDP, built from the application config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let endpoint = config.endpoint.to_endpoint();
        let sender = TransportSender::udp(Arc::new(EndpointConfig::new(endpoint)), config.wire)?;
        Ok(Self::from_sender(sender))
    }

    /// Session sending through a custom sink
    pub fn with_sink(sink: Box<dyn DatagramSink>, endpoint: Endpoint, options: WireOptions) -> Self {
        let sender = TransportSender::with_sink(sink, Arc::new(EndpointConfig::new(endpoint)), options);
        Self::from_sender(sender)
    }

    fn from_sender(sender: TransportSender) -> Self {
        let endpoint = sender.endpoint();
        let sender_stats = sender.stats();
        let store = Arc::new(SnapshotStore::new());
        let mailbox = Arc::new(Mailbox::new());
        let (wake_tx, wake_rx) = wake_channel();
        let driver = SamplingDriver::new(store.clone(), mailbox.clone(), wake_tx);

        let mut port_param = PortParameter::new();
        port_param.set_value(endpoint.port() as i64);

        Self {
            store,
            endpoint,
            mailbox,
            driver,
            worker: Mutex::new(Worker::Stopped(WorkerParts { wake: wake_rx, sender })),
            sender_stats,
            port_param: Mutex::new(port_param),
            ui: Mutex::new(UiState::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    // ------------------------------------------------------------------
    // Worker lifecycle
    // ------------------------------------------------------------------

    /// Start the background send worker. No-op if already running.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        match std::mem::replace(&mut *worker, Worker::Lost) {
            Worker::Stopped(parts) => {
                *worker = Worker::Running(SendWorker::spawn(self.mailbox.clone(), parts.wake, parts.sender)?);
                tracing::info!("Session started, sending to {}", describe_endpoint(&self.endpoint.snapshot()));
                Ok(())
            }
            running @ Worker::Running(_) => {
                *worker = running;
                Ok(())
            }
            Worker::Lost => Err(Error::State("send worker was lost".to_string())),
        }
    }

    /// Stop the worker; snapshots keep accumulating in the store
    pub fn stop(&self) {
        let mut worker = self.worker.lock();
        if let Worker::Running(running) = &mut *worker {
            let parts = running.stop();
            *worker = match parts {
                Some(parts) => Worker::Stopped(parts),
                None => Worker::Lost,
            };
            tracing::info!("Session stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.worker.lock(), Worker::Running(w) if w.is_running())
    }

    // ------------------------------------------------------------------
    // Audio thread
    // ------------------------------------------------------------------

    /// Per-block entry point for the host's audio callback
    pub fn on_block(&self, play_head: Option<&dyn PlayHead>) -> TransportSnapshot {
        self.driver.on_block(play_head)
    }

    // ------------------------------------------------------------------
    // Control thread
    // ------------------------------------------------------------------

    /// Apply a control event
    pub fn handle_event(&self, event: ControlEvent) -> Result<()> {
        match event {
            ControlEvent::SetHost(host) => {
                let result = self.endpoint.set_host(&host);
                self.report(result)
            }
            ControlEvent::SetRoutingId(id) => {
                self.endpoint.set_routing_id(&id);
                Ok(())
            }
            ControlEvent::PortChanged(value) => {
                let changed = self.port_param.lock().set_value(value);
                self.apply_port(changed)
            }
            ControlEvent::PortChangedNormalized(normalized) => {
                let changed = self.port_param.lock().set_normalized(normalized);
                self.apply_port(changed)
            }
            ControlEvent::UiResized { width, height } => {
                *self.ui.lock() = UiState { width, height }.clamped();
                Ok(())
            }
            ControlEvent::RestoreState(blob) => self.restore_state(&blob),
        }
    }

    pub fn set_host(&self, host: &str) -> Result<()> {
        self.handle_event(ControlEvent::SetHost(host.to_string()))
    }

    /// Set the port directly, bypassing the parameter's clamping
    ///
    /// Out-of-range ports are rejected and the current one kept.
    pub fn set_port(&self, port: i64) -> Result<()> {
        let result = self.endpoint.set_port(port).map(|accepted| {
            self.port_param.lock().set_value(accepted as i64);
        });
        self.report(result)
    }

    pub fn set_routing_id(&self, routing_id: &str) -> Result<()> {
        self.handle_event(ControlEvent::SetRoutingId(routing_id.to_string()))
    }

    fn apply_port(&self, changed: Option<u16>) -> Result<()> {
        match changed {
            Some(port) => {
                let result = self.endpoint.set_port(port as i64).map(|_| ());
                self.report(result)
            }
            None => Ok(()),
        }
    }

    fn report(&self, result: std::result::Result<(), ConfigError>) -> Result<()> {
        if let Err(e) = &result {
            tracing::warn!("Rejected endpoint change: {}", e);
            for listener in self.listeners.lock().iter() {
                listener.change_rejected(e);
            }
        }
        result.map_err(Error::from)
    }

    /// Register a UI observer
    pub fn add_listener(&self, listener: Box<dyn StateListener>) {
        self.listeners.lock().push(listener);
    }

    /// Serialize the current endpoint and editor size
    pub fn save_state(&self) -> Result<Vec<u8>> {
        PluginState::capture(&self.endpoint.snapshot(), *self.ui.lock()).to_bytes()
    }

    /// Restore a saved blob; the port is re-validated on the way in
    pub fn restore_state(&self, blob: &[u8]) -> Result<()> {
        let state = PluginState::from_bytes(blob)?;
        let endpoint = state.endpoint();
        let ui = state.ui.clamped();

        self.endpoint.replace(endpoint.clone());
        self.port_param.lock().set_value(endpoint.port as i64);
        *self.ui.lock() = ui;

        tracing::info!("Restored state, sending to {}", describe_endpoint(&endpoint));
        for listener in self.listeners.lock().iter() {
            listener.state_restored(&endpoint, &ui);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Latest sampled transport state
    pub fn latest_snapshot(&self) -> TransportSnapshot {
        self.store.read()
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.snapshot()
    }

    pub fn port_parameter(&self) -> PortParameter {
        self.port_param.lock().clone()
    }

    pub fn ui_state(&self) -> UiState {
        *self.ui.lock()
    }

    pub fn driver_state(&self) -> DriverState {
        self.driver.state()
    }

    pub fn driver(&self) -> &SamplingDriver {
        &self.driver
    }

    pub fn sender_stats(&self) -> SenderStatsSnapshot {
        self.sender_stats.snapshot()
    }

    /// Most recent snapshot the worker sent, if it is running
    pub fn last_sent(&self) -> Option<TransportSnapshot> {
        match &*self.worker.lock() {
            Worker::Running(w) => w.last_sent(),
            _ => None,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

fn describe_endpoint(endpoint: &Endpoint) -> String {
    if endpoint.routing_id.is_empty() {
        format!("{}:{}", endpoint.host, endpoint.port)
    } else {
        format!("{}:{} as /{}", endpoint.host, endpoint.port, endpoint.routing_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_PORT, MAX_PORT, MIN_PORT};
    use std::io;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullSink;

    impl DatagramSink for NullSink {
        fn send_to(&self, buf: &[u8], _addr: SocketAddr) -> io::Result<usize> {
            Ok(buf.len())
        }
    }

    #[derive(Default)]
    struct CountingListener {
        restored: Arc<AtomicUsize>,
        rejected: Arc<AtomicUsize>,
    }

    impl StateListener for CountingListener {
        fn state_restored(&self, _endpoint: &Endpoint, _ui: &UiState) {
            self.restored.fetch_add(1, Ordering::SeqCst);
        }

        fn change_rejected(&self, _error: &ConfigError) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn session() -> Session {
        Session::with_sink(Box::new(NullSink), Endpoint::default(), WireOptions::default())
    }

    #[test]
    fn test_port_parameter_sets_port_once_per_change() {
        let session = session();
        let before = session.endpoint.revision();

        session.handle_event(ControlEvent::PortChanged(9500)).unwrap();
        assert_eq!(session.endpoint.revision(), before + 1);
        session.handle_event(ControlEvent::PortChanged(9500)).unwrap();
        assert_eq!(session.endpoint.revision(), before + 1);

        // The parameter clamps before the endpoint sees it
        session.handle_event(ControlEvent::PortChanged(70000)).unwrap();
        assert_eq!(session.endpoint().port, MAX_PORT);
        assert_eq!(session.port_parameter().value(), MAX_PORT);
    }

    #[test]
    fn test_out_of_range_initial_port_keeps_parameter_in_sync() {
        let low = Endpoint { port: 80, ..Endpoint::default() };
        let session = Session::with_sink(Box::new(NullSink), low, WireOptions::default());
        assert_eq!(session.endpoint().port, MIN_PORT);
        assert_eq!(session.port_parameter().value(), MIN_PORT);

        session.handle_event(ControlEvent::PortChanged(MIN_PORT as i64 + 1)).unwrap();
        assert_eq!(session.endpoint().port, MIN_PORT + 1);
        session.handle_event(ControlEvent::PortChanged(MIN_PORT as i64)).unwrap();
        assert_eq!(session.endpoint().port, MIN_PORT);
    }

    #[test]
    fn test_direct_out_of_range_port_rejected() {
        let session = session();
        let listener = CountingListener::default();
        let rejected = listener.rejected.clone();
        session.add_listener(Box::new(listener));

        assert!(matches!(session.set_port(70000), Err(Error::Config(ConfigError::PortOutOfRange { .. }))));
        assert_eq!(session.endpoint().port, DEFAULT_PORT);
        assert_eq!(rejected.load(Ordering::SeqCst), 1);

        session.set_port(9300).unwrap();
        assert_eq!(session.port_parameter().value(), 9300);
    }

    #[test]
    fn test_save_and_restore_notifies_listeners() {
        let session = session();
        session.set_host("192.168.0.7").unwrap();
        session.set_routing_id("keys").unwrap();
        session.handle_event(ControlEvent::UiResized { width: 600, height: 120 }).unwrap();
        let blob = session.save_state().unwrap();

        let other = Session::with_sink(Box::new(NullSink), Endpoint::default(), WireOptions::default());
        let listener = CountingListener::default();
        let restored = listener.restored.clone();
        other.add_listener(Box::new(listener));

        other.handle_event(ControlEvent::RestoreState(blob)).unwrap();
        assert_eq!(other.endpoint(), session.endpoint());
        assert_eq!(other.ui_state(), UiState { width: 600, height: 120 });
        assert_eq!(restored.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_stop_restart() {
        let session = session();
        assert!(!session.is_running());
        session.start().unwrap();
        session.start().unwrap();
        assert!(session.is_running());
        session.stop();
        assert!(!session.is_running());
        session.start().unwrap();
        assert!(session.is_running());
    }
}
