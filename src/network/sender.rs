//! Transport sender
//!
//! Owns the outbound socket. Each call to [`TransportSender::send`] reads the
//! endpoint once, so a whole batch goes to one destination even if the
//! endpoint changes halfway through. Failures stop at this boundary: they are
//! counted in [`SenderStats`] and logged, never returned or retried.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::udp::{DatagramSink, UdpSink};
use crate::endpoint::{Endpoint, SharedEndpointConfig};
use crate::error::TransmitError;
use crate::protocol::{encode_batch, OutboundMessage, WireOptions};

/// Passive transmission counters, readable from any thread
#[derive(Debug, Default)]
pub struct SenderStats {
    batches_sent: AtomicU64,
    batches_failed: AtomicU64,
    datagrams_sent: AtomicU64,
    datagrams_failed: AtomicU64,
    bytes_sent: AtomicU64,
    lookups: AtomicU64,
}

impl SenderStats {
    pub fn snapshot(&self) -> SenderStatsSnapshot {
        SenderStatsSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            datagrams_failed: self.datagrams_failed.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SenderStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStatsSnapshot {
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub datagrams_sent: u64,
    pub datagrams_failed: u64,
    pub bytes_sent: u64,
    /// Host name lookups performed (cache misses)
    pub lookups: u64,
}

/// Result of one `send` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    pub destination: Option<SocketAddr>,
    pub datagrams_sent: usize,
    pub datagrams_failed: usize,
}

impl SendReport {
    pub fn is_complete(&self) -> bool {
        self.destination.is_some() && self.datagrams_failed == 0
    }
}

/// How long a failed lookup is reused before trying again
const RESOLVE_RETRY_INTERVAL: Duration = Duration::from_secs(1);

enum Resolution {
    Resolved(SocketAddr),
    Failed { reason: String, at: Instant },
}

// Valid while the endpoint revision matches
struct CachedResolution {
    revision: u64,
    resolution: Resolution,
}

/// Sends message batches to the configured endpoint
pub struct TransportSender {
    sink: Box<dyn DatagramSink>,
    endpoint: SharedEndpointConfig,
    options: WireOptions,
    resolved: Option<CachedResolution>,
    retry_interval: Duration,
    stats: Arc<SenderStats>,
    failing: bool,
}

impl TransportSender {
    /// Sender over a fresh UDP socket bound to an ephemeral port
    pub fn udp(endpoint: SharedEndpointConfig, options: WireOptions) -> std::io::Result<Self> {
        Ok(Self::with_sink(Box::new(UdpSink::bind_any()?), endpoint, options))
    }

    pub fn with_sink(sink: Box<dyn DatagramSink>, endpoint: SharedEndpointConfig, options: WireOptions) -> Self {
        Self {
            sink,
            endpoint,
            options,
            resolved: None,
            retry_interval: RESOLVE_RETRY_INTERVAL,
            stats: Arc::new(SenderStats::default()),
            failing: false,
        }
    }

    /// Endpoint this sender reads before every batch
    pub fn endpoint(&self) -> SharedEndpointConfig {
        self.endpoint.clone()
    }

    /// Shared handle to the counters
    pub fn stats(&self) -> Arc<SenderStats> {
        self.stats.clone()
    }

    /// Transmit a batch. Never fails from the caller's point of view.
    pub fn send(&mut self, messages: &[OutboundMessage]) -> SendReport {
        let (revision, endpoint) = self.endpoint.snapshot_with_revision();

        let mut report = SendReport::default();
        let result = self
            .resolve(revision, &endpoint)
            .and_then(|addr| {
                report.destination = Some(addr);
                encode_batch(messages, &endpoint.routing_id, &self.options).map(|d| (addr, d))
            })
            .map(|(addr, datagrams)| self.transmit(addr, &datagrams, &mut report));

        match result {
            Ok(None) => {
                self.stats.batches_sent.fetch_add(1, Ordering::Relaxed);
                if std::mem::replace(&mut self.failing, false) {
                    tracing::info!("Sending to {}:{} recovered", endpoint.host, endpoint.port);
                }
            }
            Ok(Some(err)) | Err(err) => {
                self.stats.batches_failed.fetch_add(1, Ordering::Relaxed);
                self.record_failure(&endpoint, &err);
            }
        }
        report
    }

    // Sends every datagram even after a failure; returns the last error seen
    fn transmit(&self, addr: SocketAddr, datagrams: &[Vec<u8>], report: &mut SendReport) -> Option<TransmitError> {
        let mut last_error = None;
        for datagram in datagrams {
            match self.sink.send_to(datagram, addr) {
                Ok(n) => {
                    report.datagrams_sent += 1;
                    self.stats.datagrams_sent.fetch_add(1, Ordering::Relaxed);
                    self.stats.bytes_sent.fetch_add(n as u64, Ordering::Relaxed);
                }
                Err(e) => {
                    report.datagrams_failed += 1;
                    self.stats.datagrams_failed.fetch_add(1, Ordering::Relaxed);
                    last_error = Some(TransmitError::SendFailed(e));
                }
            }
        }
        last_error
    }

    fn resolve(&mut self, revision: u64, endpoint: &Endpoint) -> Result<SocketAddr, TransmitError> {
        let resolve_err = |reason: String| TransmitError::Resolve {
            host: endpoint.host.clone(),
            port: endpoint.port,
            reason,
        };

        if let Some(cached) = self.resolved.as_ref().filter(|c| c.revision == revision) {
            match &cached.resolution {
                Resolution::Resolved(addr) => return Ok(*addr),
                Resolution::Failed { reason, at } if at.elapsed() < self.retry_interval => {
                    return Err(resolve_err(reason.clone()));
                }
                Resolution::Failed { .. } => {}
            }
        }

        self.stats.lookups.fetch_add(1, Ordering::Relaxed);
        let resolution = match self.lookup(endpoint) {
            Ok(addr) => {
                tracing::debug!("Resolved {}:{} to {}", endpoint.host, endpoint.port, addr);
                Resolution::Resolved(addr)
            }
            Err(reason) => Resolution::Failed { reason, at: Instant::now() },
        };
        let result = match &resolution {
            Resolution::Resolved(addr) => Ok(*addr),
            Resolution::Failed { reason, .. } => Err(resolve_err(reason.clone())),
        };
        self.resolved = Some(CachedResolution { revision, resolution });
        result
    }

    // Blocking name lookup; prefers an address of the same family as our socket
    fn lookup(&self, endpoint: &Endpoint) -> Result<SocketAddr, String> {
        let candidates: Vec<SocketAddr> = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| e.to_string())?
            .collect();

        let want_v4 = self.sink.local_addr().map_or(true, |a| a.is_ipv4());
        candidates
            .iter()
            .find(|a| a.is_ipv4() == want_v4)
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| "no addresses".to_string())
    }

    fn record_failure(&mut self, endpoint: &Endpoint, err: &TransmitError) {
        if !std::mem::replace(&mut self.failing, true) {
            tracing::warn!("Sending to {}:{} failed: {}", endpoint.host, endpoint.port, err);
        } else {
            tracing::debug!("Sending to {}:{} failed: {}", endpoint.host, endpoint.port, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointConfig;
    use crate::protocol::encode;
    use crate::transport::TransportSnapshot;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::atomic::AtomicBool;

    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<(SocketAddr, Vec<u8>)>>>,
        fail: Arc<AtomicBool>,
    }

    impl DatagramSink for RecordingSink {
        fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
            if self.fail.load(Ordering::Relaxed) {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "simulated"));
            }
            self.sent.lock().push((addr, buf.to_vec()));
            Ok(buf.len())
        }
    }

    fn setup() -> (RecordingSink, SharedEndpointConfig, TransportSender) {
        let sink = RecordingSink::default();
        let endpoint = Arc::new(EndpointConfig::default());
        endpoint.set_port(9100).unwrap();
        let sender = TransportSender::with_sink(Box::new(sink.clone()), endpoint.clone(), WireOptions::default());
        (sink, endpoint, sender)
    }

    #[test]
    fn test_batch_goes_to_configured_endpoint() {
        let (sink, _endpoint, mut sender) = setup();
        let report = sender.send(&encode(&TransportSnapshot::default()));

        assert!(report.is_complete());
        assert_eq!(report.datagrams_sent, 7);
        let sent = sink.sent.lock();
        assert_eq!(sent.len(), 7);
        assert!(sent.iter().all(|(addr, _)| *addr == "127.0.0.1:9100".parse().unwrap()));
    }

    #[test]
    fn test_endpoint_change_picked_up_next_batch() {
        let (sink, endpoint, mut sender) = setup();
        sender.send(&encode(&TransportSnapshot::default()));
        endpoint.set_port(9200).unwrap();
        sender.send(&encode(&TransportSnapshot::default()));

        let sent = sink.sent.lock();
        assert_eq!(sent[6].0.port(), 9100);
        assert_eq!(sent[7].0.port(), 9200);
    }

    #[test]
    fn test_send_failure_is_contained() {
        let (sink, _endpoint, mut sender) = setup();
        sink.fail.store(true, Ordering::Relaxed);

        let report = sender.send(&encode(&TransportSnapshot::default()));
        assert!(!report.is_complete());
        assert_eq!(report.datagrams_failed, 7);

        let stats = sender.stats().snapshot();
        assert_eq!(stats.batches_failed, 1);
        assert_eq!(stats.datagrams_failed, 7);

        sink.fail.store(false, Ordering::Relaxed);
        assert!(sender.send(&encode(&TransportSnapshot::default())).is_complete());
        assert_eq!(sender.stats().snapshot().batches_sent, 1);
    }

    #[test]
    fn test_unresolvable_host_is_contained() {
        let (sink, endpoint, mut sender) = setup();
        endpoint.set_host("no-such-host.invalid").unwrap();

        let report = sender.send(&encode(&TransportSnapshot::default()));
        assert_eq!(report.destination, None);
        assert_eq!(report.datagrams_sent, 0);
        assert!(sink.sent.lock().is_empty());
        assert_eq!(sender.stats().snapshot().batches_failed, 1);
    }

    #[test]
    fn test_failed_lookup_reused_until_retry_or_change() {
        let (_sink, endpoint, mut sender) = setup();
        sender.retry_interval = Duration::from_secs(60);
        endpoint.set_host("no-such-host.invalid").unwrap();

        for _ in 0..5 {
            sender.send(&encode(&TransportSnapshot::default()));
        }
        let stats = sender.stats().snapshot();
        assert_eq!(stats.batches_failed, 5);
        assert_eq!(stats.lookups, 1);

        // A new endpoint revision invalidates the cached failure
        endpoint.set_host("127.0.0.1").unwrap();
        assert!(sender.send(&encode(&TransportSnapshot::default())).is_complete());
        assert_eq!(sender.stats().snapshot().lookups, 2);
    }

    #[test]
    fn test_failed_lookup_retried_after_interval() {
        let (_sink, endpoint, mut sender) = setup();
        sender.retry_interval = Duration::ZERO;
        endpoint.set_host("no-such-host.invalid").unwrap();

        sender.send(&encode(&TransportSnapshot::default()));
        sender.send(&encode(&TransportSnapshot::default()));
        assert_eq!(sender.stats().snapshot().lookups, 2);
    }
}
