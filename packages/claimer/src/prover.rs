//! HTTP proof service client
//!
//! Proofs are built off-chain by a proof service. The claimer only forwards
//! the message coordinates and hands the returned bytes to the bridge.

use std::time::Duration;

use alloy::primitives::{Bytes, B256};
use async_trait::async_trait;
use bridge_sdk::{BridgeProver, ProofError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    /// Message was sent on the source chain
    Signal,
    /// Message failed on the destination chain
    Recall,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofRequest {
    msg_hash: B256,
    src_chain_id: u64,
    dest_chain_id: u64,
    kind: ProofKind,
}

#[derive(Debug, Deserialize)]
struct ProofResponse {
    proof: String,
}

/// [`BridgeProver`] backed by a proof service over HTTP
pub struct HttpProver {
    client: Client,
    url: String,
}

impl HttpProver {
    pub fn new(url: &str) -> eyre::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| eyre::eyre!("Failed to create HTTP client: {}", e))?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    async fn request(
        &self,
        kind: ProofKind,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<Bytes, ProofError> {
        let request = ProofRequest {
            msg_hash,
            src_chain_id,
            dest_chain_id,
            kind,
        };
        debug!(url = %self.url, msg_hash = %msg_hash, kind = ?kind, "Requesting proof");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProofError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProofError::Request(format!("HTTP {}: {}", status, body)));
        }

        let body: ProofResponse = response
            .json()
            .await
            .map_err(|e| ProofError::InvalidResponse(e.to_string()))?;
        decode_proof(&body.proof)
    }
}

fn decode_proof(proof: &str) -> Result<Bytes, ProofError> {
    let proof = proof.strip_prefix("0x").unwrap_or(proof);
    if proof.is_empty() {
        return Err(ProofError::InvalidResponse("empty proof".to_string()));
    }
    hex::decode(proof)
        .map(Bytes::from)
        .map_err(|e| ProofError::InvalidResponse(format!("proof is not hex: {}", e)))
}

#[async_trait]
impl BridgeProver for HttpProver {
    async fn encoded_signal_proof(
        &self,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<Bytes, ProofError> {
        self.request(ProofKind::Signal, msg_hash, src_chain_id, dest_chain_id)
            .await
    }

    async fn generate_proof_to_release(
        &self,
        msg_hash: B256,
        src_chain_id: u64,
        dest_chain_id: u64,
    ) -> Result<Bytes, ProofError> {
        self.request(ProofKind::Recall, msg_hash, src_chain_id, dest_chain_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn proof_handler(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let proof = match body["kind"].as_str() {
            Some("signal") => "0xaa01",
            Some("recall") => "0xbb02",
            _ => return (StatusCode::BAD_REQUEST, Json(json!({"error": "kind"}))),
        };
        if body["srcChainId"] != json!(1) || body["destChainId"] != json!(2) {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "chains"})));
        }
        (StatusCode::OK, Json(json!({ "proof": proof })))
    }

    async fn spawn_service(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/proof", addr)
    }

    #[test]
    fn test_decode_proof() {
        assert_eq!(decode_proof("0x0102").unwrap(), Bytes::from(vec![1u8, 2]));
        assert_eq!(decode_proof("0102").unwrap(), Bytes::from(vec![1u8, 2]));
        assert!(matches!(
            decode_proof("0x"),
            Err(ProofError::InvalidResponse(_))
        ));
        assert!(matches!(
            decode_proof("0xzz"),
            Err(ProofError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let request = ProofRequest {
            msg_hash: B256::repeat_byte(0x11),
            src_chain_id: 1,
            dest_chain_id: 167000,
            kind: ProofKind::Recall,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["kind"], "recall");
        assert_eq!(value["srcChainId"], 1);
        assert_eq!(value["destChainId"], 167000);
        assert_eq!(value["msgHash"], format!("0x{}", "11".repeat(32)));
    }

    #[tokio::test]
    async fn test_fetches_signal_and_recall_proofs() {
        let url = spawn_service(Router::new().route("/proof", post(proof_handler))).await;
        let prover = HttpProver::new(&url).unwrap();
        let hash = B256::repeat_byte(0x42);

        let signal = prover.encoded_signal_proof(hash, 1, 2).await.unwrap();
        assert_eq!(signal, Bytes::from(vec![0xaau8, 0x01]));

        let recall = prover.generate_proof_to_release(hash, 1, 2).await.unwrap();
        assert_eq!(recall, Bytes::from(vec![0xbbu8, 0x02]));
    }

    #[tokio::test]
    async fn test_http_error_is_request_error() {
        let url = spawn_service(Router::new().route("/proof", post(proof_handler))).await;
        let prover = HttpProver::new(&url).unwrap();

        let err = prover
            .encoded_signal_proof(B256::ZERO, 5, 6)
            .await
            .unwrap_err();
        assert!(matches!(err, ProofError::Request(msg) if msg.contains("400")));
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let app = Router::new().route(
            "/proof",
            post(|| async { Json(json!({ "unexpected": true })) }),
        );
        let url = spawn_service(app).await;
        let prover = HttpProver::new(&url).unwrap();

        let err = prover
            .encoded_signal_proof(B256::ZERO, 1, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ProofError::InvalidResponse(_)));
    }
}
