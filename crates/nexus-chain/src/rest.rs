//! REST-backed collaborator clients
//!
//! Thin clients binding the provider and signer seams to external
//! services: a chain indexer exposing UTXO lookup and broadcast, and a
//! signing service holding the owner's key material. Both speak JSON over
//! HTTP and carry no domain logic of their own.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use nexus_types::{CashAddress, TxId};

use crate::gateway::TxPlan;
use crate::provider::{
    NetworkProvider, ProviderError, SignedTransaction, Signer, SignerError, Utxo,
};

/// Whole-request cap applied at the HTTP client level; the gateway adds
/// its own per-leg budgets on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Client for an indexer with `GET {base}/address/{addr}/utxos` and
/// `POST {base}/tx/broadcast`.
pub struct RestProvider {
    base_url: String,
    client: reqwest::Client,
}

impl RestProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: http_client(),
        }
    }
}

#[derive(Serialize)]
struct BroadcastRequest<'a> {
    tx_hex: &'a str,
}

#[derive(Deserialize)]
struct BroadcastResponse {
    txid: String,
}

#[async_trait]
impl NetworkProvider for RestProvider {
    async fn get_utxos(&self, address: &CashAddress) -> Result<Vec<Utxo>, ProviderError> {
        let url = format!("{}/address/{}/utxos", self.base_url, address);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Network {
                message: format!("HTTP {}", response.status()),
            });
        }

        response.json().await.map_err(|e| ProviderError::Malformed {
            message: e.to_string(),
        })
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<TxId, ProviderError> {
        let url = format!("{}/tx/broadcast", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&BroadcastRequest { tx_hex: &tx.hex })
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            // 4xx means the node looked at the transaction and said no.
            return if status.is_client_error() {
                Err(ProviderError::Rejected {
                    message: format!("HTTP {}: {}", status, body),
                })
            } else {
                Err(ProviderError::Network {
                    message: format!("HTTP {}: {}", status, body),
                })
            };
        }

        let parsed: BroadcastResponse =
            response.json().await.map_err(|e| ProviderError::Malformed {
                message: e.to_string(),
            })?;
        Ok(TxId::new(parsed.txid))
    }
}

/// Client for a signing service with `POST {base}/sign` taking the plan
/// and returning `{"tx_hex": "..."}`.
pub struct RestSigner {
    base_url: String,
    client: reqwest::Client,
}

impl RestSigner {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: http_client(),
        }
    }
}

#[derive(Deserialize)]
struct SignResponse {
    tx_hex: String,
}

#[async_trait]
impl Signer for RestSigner {
    async fn sign(&self, plan: &TxPlan) -> Result<SignedTransaction, SignerError> {
        let url = format!("{}/sign", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(plan)
            .send()
            .await
            .map_err(|e| SignerError::Failed {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SignerError::Failed {
                message: format!("HTTP {}", response.status()),
            });
        }

        let parsed: SignResponse = response.json().await.map_err(|e| SignerError::Failed {
            message: e.to_string(),
        })?;
        Ok(SignedTransaction { hex: parsed.tx_hex })
    }
}
