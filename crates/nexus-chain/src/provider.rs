//! Collaborator contracts: network provider and signer

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nexus_types::{CashAddress, StateCommitment, TxId};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider network error: {message}")]
    Network { message: String },

    #[error("provider rejected transaction: {message}")]
    Rejected { message: String },

    #[error("provider returned malformed data: {message}")]
    Malformed { message: String },
}

/// Token payload riding on a UTXO. The category identifies which token
/// this is; the commitment is the NFT state field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub category: String,
    pub commitment: StateCommitment,
}

/// One unspent output at an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: TxId,
    pub vout: u32,
    pub sats: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenData>,
}

impl Utxo {
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

/// A fully signed transaction, opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub hex: String,
}

/// Read and broadcast capability against the chain.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    async fn get_utxos(&self, address: &CashAddress) -> Result<Vec<Utxo>, ProviderError>;

    /// Exactly one broadcast attempt per call; broadcast is not idempotent
    /// and callers must not retry blindly.
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<TxId, ProviderError>;
}

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("signing failed: {message}")]
    Failed { message: String },

    #[error("key material unavailable: {message}")]
    KeyUnavailable { message: String },
}

/// Signing capability. Key derivation and script templates live behind
/// this seam; the core only hands over a plan and gets back a payload.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, plan: &crate::gateway::TxPlan) -> Result<SignedTransaction, SignerError>;
}
