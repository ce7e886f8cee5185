//! Claimer wiring
//!
//! Builds the shared reader, routing table, delay reader and poller registry
//! from [`Config`], and runs the status and claim flows on top of them.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{TxHash, B256};
use bridge_sdk::{
    is_transaction_processable, BridgeContext, BridgeKind, BridgeProver, BridgeTransaction,
    ChainReader, ClaimArgs, EvmChainReader, EvmWallet, InvocationDelayReader, MessageStatus,
    PollerRegistry, RoutingMap, TxInvocationDelay, VaultTokenResolver, Wallet,
};
use eyre::{Result, WrapErr};
use tracing::{debug, info};

use crate::config::Config;
use crate::prover::HttpProver;

/// Point-in-time view of one bridge transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub tx_hash: TxHash,
    pub msg_hash: B256,
    pub src_chain_id: u64,
    pub dest_chain_id: u64,
    pub status: MessageStatus,
    pub processable: bool,
    /// Only reported for proven NEW messages
    pub delay: Option<TxInvocationDelay>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} status={} processable={}",
            self.tx_hash, self.src_chain_id, self.dest_chain_id, self.status, self.processable
        )?;
        if let Some(delay) = &self.delay {
            write!(
                f,
                " preferred_delay={}s not_preferred_delay={}s",
                delay.preferred_delay, delay.not_preferred_delay
            )?;
        }
        Ok(())
    }
}

pub struct App {
    config: Config,
    reader: Arc<dyn ChainReader>,
    routing: Arc<RoutingMap>,
    delays: Arc<InvocationDelayReader>,
    registry: PollerRegistry,
}

impl App {
    /// Connect to every configured chain and load the routing table
    pub fn new(config: Config) -> Result<Self> {
        let reader = EvmChainReader::new(
            config
                .rpc_urls
                .iter()
                .map(|(chain_id, url)| (*chain_id, url.as_str())),
        )
        .wrap_err("Failed to create chain reader")?;
        let routing = RoutingMap::from_file(&config.routing_config)
            .wrap_err("Failed to load routing config")?;

        Ok(Self::with_reader(config, Arc::new(reader), Arc::new(routing)))
    }

    pub fn with_reader(config: Config, reader: Arc<dyn ChainReader>, routing: Arc<RoutingMap>) -> Self {
        let delays = Arc::new(
            InvocationDelayReader::new(reader.clone(), routing.clone())
                .with_delay_cache(config.invocation_delay_cache_ttl()),
        );
        let registry = PollerRegistry::new(
            reader.clone(),
            routing.clone(),
            delays.clone(),
            config.poller(),
        );

        Self {
            config,
            reader,
            routing,
            delays,
            registry,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &PollerRegistry {
        &self.registry
    }

    /// Current status of `bridge_tx` on its destination bridge
    pub async fn destination_status(&self, bridge_tx: &BridgeTransaction) -> Result<MessageStatus> {
        let (message, msg_hash) = bridge_tx.message_and_hash()?;
        let dest_bridge = self
            .routing
            .get(message.dest_chain_id, message.src_chain_id)?
            .bridge_address;
        Ok(self
            .reader
            .message_status(message.dest_chain_id, dest_bridge, msg_hash)
            .await?)
    }

    /// Refresh the status of `bridge_tx` and report what can be done with it
    pub async fn status(&self, bridge_tx: &BridgeTransaction) -> Result<StatusReport> {
        let (message, msg_hash) = bridge_tx.message_and_hash()?;
        let (src_chain_id, dest_chain_id) = (message.src_chain_id, message.dest_chain_id);

        let status = self.destination_status(bridge_tx).await?;
        let mut refreshed = bridge_tx.clone();
        refreshed.msg_status = Some(status);

        let processable =
            is_transaction_processable(self.reader.as_ref(), &self.routing, &refreshed).await;

        let delay = if status == MessageStatus::New {
            let receipt = self
                .delays
                .get_proof_receipt_for_msg_hash(msg_hash, src_chain_id, dest_chain_id)
                .await?;
            if receipt.is_proven() {
                match self.delays.get_invocation_delay_for_tx(&refreshed).await {
                    Ok(delay) => Some(delay),
                    Err(e) => {
                        debug!(tx_hash = %bridge_tx.hash, error = %e, "No invocation delay");
                        None
                    }
                }
            } else {
                None
            }
        } else {
            None
        };

        Ok(StatusReport {
            tx_hash: bridge_tx.hash,
            msg_hash,
            src_chain_id,
            dest_chain_id,
            status,
            processable,
            delay,
        })
    }

    /// Chain the claiming wallet must be connected to: the source chain to
    /// release a failed message, the destination chain otherwise
    pub async fn claim_chain(&self, bridge_tx: &BridgeTransaction) -> Result<u64> {
        let (message, _) = bridge_tx.message_and_hash()?;
        Ok(match self.destination_status(bridge_tx).await? {
            MessageStatus::Failed => message.src_chain_id,
            _ => message.dest_chain_id,
        })
    }

    pub fn bridge_context(&self, prover: Arc<dyn BridgeProver>) -> Arc<BridgeContext> {
        Arc::new(BridgeContext {
            reader: self.reader.clone(),
            prover,
            routing: self.routing.clone(),
            tokens: Arc::new(VaultTokenResolver::new(
                self.reader.clone(),
                self.routing.clone(),
            )),
            gas: self.config.gas,
        })
    }

    /// Wallet signing with the configured key on `chain_id`
    pub fn wallet(&self, chain_id: u64) -> Result<EvmWallet> {
        Ok(EvmWallet::new(
            self.config.rpc_url(chain_id)?,
            self.config.private_key()?,
        )?)
    }

    pub fn http_prover(&self) -> Result<Arc<dyn BridgeProver>> {
        Ok(Arc::new(HttpProver::new(self.config.proof_service_url()?)?))
    }

    /// Claim, retry or release `bridge_tx` depending on its destination status
    pub async fn claim(
        &self,
        bridge_tx: &BridgeTransaction,
        wallet: &dyn Wallet,
        prover: Arc<dyn BridgeProver>,
        last_attempt: bool,
        force: bool,
    ) -> Result<TxHash> {
        let bridge = BridgeKind::for_transaction(bridge_tx, self.bridge_context(prover));
        let args = ClaimArgs {
            bridge_tx,
            wallet,
            last_attempt,
            force,
        };
        let tx_hash = bridge.process_message(&args).await?;
        info!(
            bridge_tx = %bridge_tx.hash,
            tx_hash = %tx_hash,
            last_attempt = last_attempt,
            "Submitted message transaction"
        );
        Ok(tx_hash)
    }

    /// Stop every poller and drop cached readouts
    pub async fn shutdown(&self) {
        self.registry.destroy_all().await;
        self.delays.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use alloy::primitives::Address;
    use bridge_sdk::testing::{
        bridge_on, sample_bridge_tx, sample_routing, MockChain, MockProver, MockWallet, OWNER,
        SEND_BLOCK,
    };
    use bridge_sdk::{GasLimitConfig, InvocationDelays, ProofReceipt};

    fn test_config() -> Config {
        Config {
            routing_config: PathBuf::from("bridges.json"),
            rpc_urls: vec![
                (1, "http://localhost:8545".to_string()),
                (2, "http://localhost:8546".to_string()),
            ],
            private_key: None,
            proof_service_url: None,
            poll_interval_ms: 10_000,
            poll_tick_timeout_ms: None,
            invocation_delay_cache_ttl_secs: 0,
            gas: GasLimitConfig::default(),
        }
    }

    fn app(chain: &Arc<MockChain>) -> App {
        App::with_reader(test_config(), chain.clone(), Arc::new(sample_routing()))
    }

    #[tokio::test]
    async fn test_status_of_unsynced_message() {
        let chain = Arc::new(MockChain::new());
        let tx = sample_bridge_tx(1, 2);
        let report = app(&chain).status(&tx).await.unwrap();

        assert_eq!(report.status, MessageStatus::New);
        assert!(!report.processable);
        assert_eq!(report.delay, None);
    }

    #[tokio::test]
    async fn test_status_reports_delay_for_proven_message() {
        let chain = Arc::new(MockChain::new());
        let tx = sample_bridge_tx(1, 2);
        let msg_hash = tx.msg_hash.unwrap();
        chain.set_synced_block(2, 1, SEND_BLOCK);
        chain.set_proof_receipt(
            2,
            msg_hash,
            ProofReceipt {
                proven_at: 1_000,
                preferred_claimer: OWNER,
            },
        );
        chain.set_delays(
            2,
            InvocationDelays {
                preferred: 300,
                fallback: 600,
            },
        );
        chain.set_timestamp(2, 1_060);

        let report = app(&chain).status(&tx).await.unwrap();
        assert!(report.processable);
        let delay = report.delay.unwrap();
        assert_eq!(delay.preferred_delay, 240);
        assert_eq!(delay.not_preferred_delay, 540);
        assert!(report.to_string().contains("preferred_delay=240s"));
    }

    #[tokio::test]
    async fn test_status_uses_fresh_destination_status() {
        let chain = Arc::new(MockChain::new());
        let mut tx = sample_bridge_tx(1, 2);
        tx.msg_status = Some(MessageStatus::New);
        chain.set_status(2, tx.msg_hash.unwrap(), MessageStatus::Retriable);

        let report = app(&chain).status(&tx).await.unwrap();
        assert_eq!(report.status, MessageStatus::Retriable);
        assert!(report.processable);
        assert_eq!(chain.calls("proof_receipt"), 0);
    }

    #[tokio::test]
    async fn test_claim_chain_follows_status() {
        let chain = Arc::new(MockChain::new());
        let tx = sample_bridge_tx(1, 2);
        let app = app(&chain);

        assert_eq!(app.claim_chain(&tx).await.unwrap(), 2);
        chain.set_status(2, tx.msg_hash.unwrap(), MessageStatus::Failed);
        assert_eq!(app.claim_chain(&tx).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_claim_new_message() {
        let chain = Arc::new(MockChain::new());
        let tx = sample_bridge_tx(1, 2);
        let wallet = MockWallet::new(OWNER, 2);
        let prover = Arc::new(MockProver::default());

        app(&chain)
            .claim(&tx, &wallet, prover.clone(), false, false)
            .await
            .unwrap();

        let sent = wallet.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, bridge_on(2));
        assert_eq!(prover.signal_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_claim_requires_key_and_proof_service() {
        let chain = Arc::new(MockChain::new());
        let app = app(&chain);
        assert!(app.wallet(2).is_err());
        assert!(app.http_prover().is_err());

        let mut config = test_config();
        config.private_key = Some(format!("0x{}", "01".repeat(32)));
        let app = App::with_reader(config, chain.clone(), Arc::new(sample_routing()));
        assert_ne!(app.wallet(2).unwrap().address(), Address::ZERO);
        assert!(app.wallet(7).is_err());
    }

    #[tokio::test]
    async fn test_missing_message_is_error() {
        let chain = Arc::new(MockChain::new());
        let mut tx = sample_bridge_tx(1, 2);
        tx.message = None;
        assert!(app(&chain).status(&tx).await.is_err());
    }
}
