//! Message status poller
//!
//! [`PollerRegistry`] runs at most one polling task per source transaction
//! hash. Each task watches the destination bridge and broadcasts
//! [`PollingEvent`]s until the message settles or the poller is stopped.
//!
//! Tick order:
//!
//! 1. Processability, emitted as `Processable`
//! 2. Destination status, emitted as `Status`; a read failure emits `Error` and stops
//! 3. On `FAILED`, the source status; `RECALLED` there is emitted and stops
//! 4. Remaining preferred-claimer delay once proven, emitted as `Delay`
//! 5. Back-fill of the send block number from the source receipt
//! 6. Stop once `DONE`

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, B256};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::delays::InvocationDelayReader;
use crate::error::{BridgeError, Result};
use crate::evm::ChainReader;
use crate::processable::is_transaction_processable;
use crate::routing::RoutingMap;
use crate::types::{BridgeTransaction, MessageStatus};

const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Configuration & Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PollerConfig {
    pub interval: Duration,
    /// Abandon a tick that takes longer than this; the poller keeps running
    pub tick_timeout: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            tick_timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PollingEvent {
    Stop,
    Status(MessageStatus),
    Processable(bool),
    /// Seconds left in the preferred claimer's window
    Delay(i64),
    Error(Arc<BridgeError>),
}

// ============================================================================
// Registry
// ============================================================================

struct PollerEntry {
    id: u64,
    events: broadcast::Sender<PollingEvent>,
    shutdown: oneshot::Sender<()>,
}

struct RegistryInner {
    reader: Arc<dyn ChainReader>,
    routing: Arc<RoutingMap>,
    delays: Arc<InvocationDelayReader>,
    config: PollerConfig,
    pollers: Mutex<HashMap<TxHash, PollerEntry>>,
    next_id: AtomicU64,
}

impl RegistryInner {
    /// Remove and signal the poller for `tx_hash`; no-op when absent
    async fn stop(&self, tx_hash: TxHash) -> bool {
        let Some(entry) = self.pollers.lock().await.remove(&tx_hash) else {
            return false;
        };
        let _ = entry.shutdown.send(());
        let _ = entry.events.send(PollingEvent::Stop);
        info!(tx_hash = %tx_hash, "Stopped polling");
        true
    }

    /// Called by a task that stopped on its own
    async fn finish(&self, tx_hash: TxHash, id: u64, events: &broadcast::Sender<PollingEvent>) {
        let mut pollers = self.pollers.lock().await;
        if pollers.get(&tx_hash).is_some_and(|entry| entry.id == id) {
            pollers.remove(&tx_hash);
            drop(pollers);
            let _ = events.send(PollingEvent::Stop);
            info!(tx_hash = %tx_hash, "Polling finished");
        }
    }
}

/// Process-wide set of status pollers keyed by source transaction hash
#[derive(Clone)]
pub struct PollerRegistry {
    inner: Arc<RegistryInner>,
}

impl PollerRegistry {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        routing: Arc<RoutingMap>,
        delays: Arc<InvocationDelayReader>,
        config: PollerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                reader,
                routing,
                delays,
                config,
                pollers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Start polling `bridge_tx`, or attach to its existing poller
    ///
    /// Returns `None` for messages already `DONE`. Fails with `Polling` when
    /// the configured interval is zero.
    pub async fn start_polling(
        &self,
        bridge_tx: BridgeTransaction,
        run_immediately: bool,
    ) -> Result<Option<PollerHandle>> {
        let msg_hash = bridge_tx.msg_hash.ok_or_else(|| {
            BridgeError::Polling(format!("msgHash is not defined for {}", bridge_tx.hash))
        })?;

        if self.inner.config.interval.is_zero() {
            return Err(BridgeError::Polling(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        if bridge_tx.msg_status == Some(MessageStatus::Done) {
            debug!(tx_hash = %bridge_tx.hash, "Message already processed, not polling");
            return Ok(None);
        }

        let tx_hash = bridge_tx.hash;
        let mut pollers = self.inner.pollers.lock().await;

        if let Some(entry) = pollers.get(&tx_hash) {
            debug!(tx_hash = %tx_hash, "Already polling");
            return Ok(Some(self.handle(tx_hash, entry.events.subscribe())));
        }

        let src = bridge_tx.src_chain_id;
        let dest = bridge_tx.dest_chain_id;
        let dest_bridge = self.inner.routing.get(dest, src)?.bridge_address;
        let src_bridge = self.inner.routing.get(src, dest)?.bridge_address;

        let (events, receiver) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        pollers.insert(
            tx_hash,
            PollerEntry {
                id,
                events: events.clone(),
                shutdown,
            },
        );
        drop(pollers);

        let task = PollerTask {
            id,
            registry: self.inner.clone(),
            events,
            bridge_tx,
            msg_hash,
            src_bridge,
            dest_bridge,
            delays_enabled: true,
        };

        info!(
            tx_hash = %tx_hash,
            msg_hash = %msg_hash,
            src_chain_id = src,
            dest_chain_id = dest,
            interval_ms = self.inner.config.interval.as_millis() as u64,
            "Started polling"
        );

        tokio::spawn(task.run(shutdown_rx, run_immediately));
        Ok(Some(self.handle(tx_hash, receiver)))
    }

    /// Stop the poller for `tx_hash`; returns whether one was running
    pub async fn stop_polling(&self, tx_hash: TxHash) -> bool {
        self.inner.stop(tx_hash).await
    }

    /// Stop every poller
    pub async fn destroy_all(&self) {
        let hashes: Vec<TxHash> = self.inner.pollers.lock().await.keys().copied().collect();
        for tx_hash in hashes {
            self.inner.stop(tx_hash).await;
        }
    }

    pub async fn is_polling(&self, tx_hash: TxHash) -> bool {
        self.inner.pollers.lock().await.contains_key(&tx_hash)
    }

    pub async fn len(&self) -> usize {
        self.inner.pollers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn handle(&self, tx_hash: TxHash, events: broadcast::Receiver<PollingEvent>) -> PollerHandle {
        PollerHandle {
            tx_hash,
            events,
            registry: self.inner.clone(),
        }
    }
}

/// Subscription to one transaction's poller
pub struct PollerHandle {
    tx_hash: TxHash,
    events: broadcast::Receiver<PollingEvent>,
    registry: Arc<RegistryInner>,
}

impl PollerHandle {
    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Next event, or `None` once the poller is gone
    pub async fn recv(&mut self) -> Option<PollingEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(tx_hash = %self.tx_hash, skipped = skipped, "Poller subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Another subscription to the same poller
    pub fn subscribe(&self) -> broadcast::Receiver<PollingEvent> {
        self.events.resubscribe()
    }

    /// Stop the poller; idempotent
    pub async fn stop(&self) {
        self.registry.stop(self.tx_hash).await;
    }

    /// Stop the poller and drop this subscription
    pub async fn destroy(self) {
        self.stop().await;
    }
}

// ============================================================================
// Polling Task
// ============================================================================

enum TickOutcome {
    Continue,
    Stop,
}

struct PollerTask {
    id: u64,
    registry: Arc<RegistryInner>,
    events: broadcast::Sender<PollingEvent>,
    bridge_tx: BridgeTransaction,
    msg_hash: B256,
    src_bridge: Address,
    dest_bridge: Address,
    delays_enabled: bool,
}

impl PollerTask {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>, run_immediately: bool) {
        let config = self.registry.config;
        let start = if run_immediately {
            Instant::now()
        } else {
            Instant::now() + config.interval
        };
        let mut interval = interval_at(start, config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown => return,
                _ = interval.tick() => {}
            }

            let outcome = tokio::select! {
                _ = &mut shutdown => return,
                outcome = self.timed_tick(config.tick_timeout) => outcome,
            };

            if let TickOutcome::Stop = outcome {
                break;
            }
        }

        let tx_hash = self.bridge_tx.hash;
        self.registry.finish(tx_hash, self.id, &self.events).await;
    }

    async fn timed_tick(&mut self, timeout: Option<Duration>) -> TickOutcome {
        let Some(timeout) = timeout else {
            return self.tick().await;
        };
        match tokio::time::timeout(timeout, self.tick()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    tx_hash = %self.bridge_tx.hash,
                    timeout_ms = timeout.as_millis() as u64,
                    "Polling tick timed out"
                );
                TickOutcome::Continue
            }
        }
    }

    fn emit(&self, event: PollingEvent) {
        let _ = self.events.send(event);
    }

    async fn tick(&mut self) -> TickOutcome {
        let reader = self.registry.reader.clone();
        let src = self.bridge_tx.src_chain_id;
        let dest = self.bridge_tx.dest_chain_id;

        let processable =
            is_transaction_processable(reader.as_ref(), &self.registry.routing, &self.bridge_tx)
                .await;
        self.emit(PollingEvent::Processable(processable));

        let status = match reader.message_status(dest, self.dest_bridge, self.msg_hash).await {
            Ok(status) => status,
            Err(e) => {
                warn!(tx_hash = %self.bridge_tx.hash, error = %e, "Failed to read message status");
                self.emit(PollingEvent::Error(Arc::new(BridgeError::Polling(format!(
                    "failed to read status of {}: {}",
                    self.msg_hash, e
                )))));
                return TickOutcome::Stop;
            }
        };
        self.bridge_tx.msg_status = Some(status);
        self.emit(PollingEvent::Status(status));

        if status == MessageStatus::Failed {
            match reader.message_status(src, self.src_bridge, self.msg_hash).await {
                Ok(MessageStatus::Recalled) => {
                    self.bridge_tx.msg_status = Some(MessageStatus::Recalled);
                    self.emit(PollingEvent::Status(MessageStatus::Recalled));
                    return TickOutcome::Stop;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(tx_hash = %self.bridge_tx.hash, error = %e, "Failed to read source status");
                    self.emit(PollingEvent::Error(Arc::new(BridgeError::Polling(format!(
                        "failed to read source status of {}: {}",
                        self.msg_hash, e
                    )))));
                    return TickOutcome::Stop;
                }
            }
        }

        if self.delays_enabled && status == MessageStatus::New {
            self.poll_delay(src, dest).await;
        }

        if self.bridge_tx.block_number.is_none() {
            self.backfill_block_number(src).await;
        }

        if status == MessageStatus::Done {
            return TickOutcome::Stop;
        }
        TickOutcome::Continue
    }

    async fn poll_delay(&mut self, src: u64, dest: u64) {
        let delays = self.registry.delays.clone();
        let receipt = match delays
            .get_proof_receipt_for_msg_hash(self.msg_hash, src, dest)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                debug!(msg_hash = %self.msg_hash, error = %e, "Failed to read proof receipt");
                return;
            }
        };
        if !receipt.is_proven() {
            return;
        }

        match delays.get_invocation_delay_for_tx(&self.bridge_tx).await {
            Ok(delay) if delay.preferred_delay > 0 => {
                self.emit(PollingEvent::Delay(delay.preferred_delay));
            }
            Ok(_) => {
                debug!(msg_hash = %self.msg_hash, "Preferred claimer window elapsed");
                self.emit(PollingEvent::Delay(0));
                self.delays_enabled = false;
            }
            Err(BridgeError::NoDelaysForBridge { .. }) => {
                debug!(msg_hash = %self.msg_hash, "No invocation delays, disabling delay polling");
                self.delays_enabled = false;
            }
            Err(e) => {
                debug!(msg_hash = %self.msg_hash, error = %e, "Failed to read invocation delay");
            }
        }
    }

    async fn backfill_block_number(&mut self, src: u64) {
        match self
            .registry
            .reader
            .transaction_receipt(src, self.bridge_tx.hash)
            .await
        {
            Ok(Some(receipt)) => {
                debug!(
                    tx_hash = %self.bridge_tx.hash,
                    block_number = receipt.block_number,
                    "Back-filled block number"
                );
                self.bridge_tx.block_number = Some(receipt.block_number);
                self.bridge_tx.receipt = Some(receipt);
            }
            Ok(None) => {}
            Err(e) => {
                debug!(tx_hash = %self.bridge_tx.hash, error = %e, "Failed to fetch receipt");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;
    use crate::testing::{bridge_on, sample_bridge_tx, sample_routing, MockChain, SEND_BLOCK};
    use crate::types::{InvocationDelays, ProofReceipt, TxReceipt};

    fn registry(chain: &Arc<MockChain>) -> PollerRegistry {
        registry_with(chain, PollerConfig::default())
    }

    fn registry_with(chain: &Arc<MockChain>, config: PollerConfig) -> PollerRegistry {
        let routing = Arc::new(sample_routing());
        let delays = Arc::new(InvocationDelayReader::new(chain.clone(), routing.clone()));
        PollerRegistry::new(chain.clone(), routing, delays, config)
    }

    async fn events_until_stop(handle: &mut PollerHandle) -> Vec<PollingEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.recv().await {
            let stop = matches!(event, PollingEvent::Stop);
            events.push(event);
            if stop {
                break;
            }
        }
        events
    }

    fn statuses(events: &[PollingEvent]) -> Vec<MessageStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                PollingEvent::Status(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_transaction_is_not_polled() {
        let chain = Arc::new(MockChain::new());
        let registry = registry(&chain);
        let mut tx = sample_bridge_tx(1, 2);
        tx.msg_status = Some(MessageStatus::Done);

        assert!(registry.start_polling(tx, true).await.unwrap().is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_msg_hash_fails() {
        let chain = Arc::new(MockChain::new());
        let registry = registry(&chain);
        let mut tx = sample_bridge_tx(1, 2);
        tx.msg_hash = None;

        let err = registry.start_polling(tx, true).await.err().unwrap();
        assert!(matches!(err, BridgeError::Polling(_)));
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_poller_per_transaction() {
        let chain = Arc::new(MockChain::new());
        let registry = registry(&chain);
        let tx = sample_bridge_tx(1, 2);

        let mut first = registry.start_polling(tx.clone(), false).await.unwrap().unwrap();
        let mut second = registry.start_polling(tx.clone(), false).await.unwrap().unwrap();
        assert_eq!(registry.len().await, 1);

        chain.set_status(2, tx.msg_hash.unwrap(), MessageStatus::Done);
        let a = events_until_stop(&mut first).await;
        let b = events_until_stop(&mut second).await;
        assert_eq!(statuses(&a), vec![MessageStatus::Done]);
        assert_eq!(statuses(&b), vec![MessageStatus::Done]);
        assert_eq!(chain.calls("message_status"), 1);
        assert!(!registry.is_polling(tx.hash).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_done() {
        let chain = Arc::new(MockChain::new());
        chain.set_synced_block(2, 1, SEND_BLOCK);
        let registry = registry(&chain);
        let tx = sample_bridge_tx(1, 2);

        let mut handle = registry.start_polling(tx.clone(), true).await.unwrap().unwrap();
        assert!(matches!(handle.recv().await, Some(PollingEvent::Processable(true))));
        assert!(matches!(
            handle.recv().await,
            Some(PollingEvent::Status(MessageStatus::New))
        ));

        chain.set_status(2, tx.msg_hash.unwrap(), MessageStatus::Done);
        let events = events_until_stop(&mut handle).await;
        assert_eq!(statuses(&events), vec![MessageStatus::Done]);
        assert!(matches!(events.last(), Some(PollingEvent::Stop)));
        assert!(handle.recv().await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_then_recalled_on_source() {
        let chain = Arc::new(MockChain::new());
        let tx = sample_bridge_tx(1, 2);
        let msg_hash = tx.msg_hash.unwrap();
        chain.set_status(2, msg_hash, MessageStatus::Failed);
        chain.set_status(1, msg_hash, MessageStatus::Recalled);
        let registry = registry(&chain);

        let mut handle = registry.start_polling(tx, true).await.unwrap().unwrap();
        let events = events_until_stop(&mut handle).await;
        assert_eq!(
            statuses(&events),
            vec![MessageStatus::Failed, MessageStatus::Recalled]
        );
        assert_eq!(
            chain.reads("message_status"),
            vec![(2, bridge_on(2)), (1, bridge_on(1))]
        );
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recall_on_destination_bridge_is_ignored() {
        let chain = Arc::new(MockChain::new());
        let tx = sample_bridge_tx(1, 2);
        let msg_hash = tx.msg_hash.unwrap();
        chain.set_status(2, msg_hash, MessageStatus::Failed);
        chain.set_status_at(1, bridge_on(2), msg_hash, MessageStatus::Recalled);
        let registry = registry(&chain);

        let mut handle = registry.start_polling(tx, true).await.unwrap().unwrap();
        let mut seen = Vec::new();
        while seen.len() < 3 {
            match handle.recv().await {
                Some(PollingEvent::Status(status)) => seen.push(status),
                Some(PollingEvent::Stop) | None => break,
                Some(_) => {}
            }
        }
        assert_eq!(seen, vec![MessageStatus::Failed; 3]);
        assert!(registry.is_polling(handle.tx_hash()).await);
        handle.destroy().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_rejected() {
        let chain = Arc::new(MockChain::new());
        let registry = registry_with(
            &chain,
            PollerConfig {
                interval: Duration::ZERO,
                tick_timeout: None,
            },
        );

        let err = registry
            .start_polling(sample_bridge_tx(1, 2), true)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::Polling(_)));
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_read_error_stops() {
        let chain = Arc::new(MockChain::new());
        chain.fail("message_status", ChainError::Transport("timeout".into()));
        let registry = registry(&chain);

        let mut handle = registry
            .start_polling(sample_bridge_tx(1, 2), true)
            .await
            .unwrap()
            .unwrap();
        let events = events_until_stop(&mut handle).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, PollingEvent::Error(err) if matches!(**err, BridgeError::Polling(_)))));
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let chain = Arc::new(MockChain::new());
        let registry = registry(&chain);
        let tx = sample_bridge_tx(1, 2);

        let mut handle = registry.start_polling(tx.clone(), false).await.unwrap().unwrap();
        handle.stop().await;
        handle.stop().await;
        assert!(!registry.stop_polling(tx.hash).await);

        assert!(matches!(handle.recv().await, Some(PollingEvent::Stop)));
        assert!(handle.recv().await.is_none());
        assert_eq!(chain.calls("message_status"), 0);

        let restarted = registry.start_polling(tx, false).await.unwrap();
        assert!(restarted.is_some());
        assert_eq!(registry.len().await, 1);
        registry.destroy_all().await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_remaining_delay_once_proven() {
        let chain = Arc::new(MockChain::new());
        let tx = sample_bridge_tx(1, 2);
        chain.set_proof_receipt(
            2,
            tx.msg_hash.unwrap(),
            ProofReceipt {
                proven_at: 1_000,
                preferred_claimer: Address::repeat_byte(0xcc),
            },
        );
        chain.set_delays(
            2,
            InvocationDelays {
                preferred: 300,
                fallback: 600,
            },
        );
        chain.set_timestamp(2, 1_100);
        let registry = registry(&chain);

        let mut handle = registry.start_polling(tx, true).await.unwrap().unwrap();
        let mut delay = None;
        while let Some(event) = handle.recv().await {
            if let PollingEvent::Delay(d) = event {
                delay = Some(d);
                break;
            }
        }
        assert_eq!(delay, Some(200));
        handle.destroy().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_delay_is_emitted_once_then_not_read() {
        let chain = Arc::new(MockChain::new());
        let tx = sample_bridge_tx(1, 2);
        chain.set_proof_receipt(
            2,
            tx.msg_hash.unwrap(),
            ProofReceipt {
                proven_at: 1_000,
                preferred_claimer: Address::repeat_byte(0xcc),
            },
        );
        chain.set_delays(
            2,
            InvocationDelays {
                preferred: 300,
                fallback: 600,
            },
        );
        chain.set_timestamp(2, 5_000);
        let registry = registry(&chain);

        let mut handle = registry.start_polling(tx, true).await.unwrap().unwrap();
        let mut ticks = 0;
        let mut delays = Vec::new();
        while ticks < 5 {
            match handle.recv().await {
                Some(PollingEvent::Status(_)) => ticks += 1,
                Some(PollingEvent::Delay(d)) => delays.push(d),
                Some(_) => {}
                None => panic!("poller closed"),
            }
        }
        handle.destroy().await;

        assert_eq!(delays, vec![0]);
        assert_eq!(chain.calls("invocation_delays"), 1);
        assert_eq!(chain.calls("latest_block_timestamp"), 1);
        assert_eq!(chain.reads("invocation_delays"), vec![(2, bridge_on(2))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_delays_disable_delay_polling() {
        let chain = Arc::new(MockChain::new());
        let tx = sample_bridge_tx(1, 2);
        chain.set_proof_receipt(
            2,
            tx.msg_hash.unwrap(),
            ProofReceipt {
                proven_at: 1_000,
                preferred_claimer: Address::repeat_byte(0xcc),
            },
        );
        chain.fail("invocation_delays", ChainError::Reverted("no delays".into()));
        let registry = registry(&chain);

        let mut handle = registry.start_polling(tx, true).await.unwrap().unwrap();
        for _ in 0..3 {
            loop {
                match handle.recv().await {
                    Some(PollingEvent::Status(_)) => break,
                    Some(PollingEvent::Delay(_)) => panic!("unexpected delay event"),
                    Some(_) => {}
                    None => panic!("poller closed"),
                }
            }
        }
        assert_eq!(chain.calls("invocation_delays"), 1);
        handle.destroy().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_backfills_block_number_once() {
        let chain = Arc::new(MockChain::new());
        let mut tx = sample_bridge_tx(1, 2);
        tx.block_number = None;
        tx.receipt = None;
        chain.set_receipt(
            1,
            TxReceipt {
                transaction_hash: tx.hash,
                block_number: SEND_BLOCK,
                status: true,
            },
        );
        chain.set_synced_block(2, 1, SEND_BLOCK);
        let registry = registry(&chain);

        let mut handle = registry.start_polling(tx, true).await.unwrap().unwrap();
        assert!(matches!(handle.recv().await, Some(PollingEvent::Processable(false))));
        loop {
            if let Some(PollingEvent::Processable(processable)) = handle.recv().await {
                assert!(processable);
                break;
            }
        }
        assert_eq!(chain.calls("transaction_receipt"), 1);
        handle.destroy().await;
    }
}
