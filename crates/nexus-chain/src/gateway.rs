//! Execution gateway
//!
//! Turns an approved action into one broadcast transaction. The plan it
//! builds always spends the identity UTXO and recreates the token at the
//! same contract address with the refreshed commitment; action-specific
//! payment outputs and change ride alongside.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nexus_types::{
    AgentAction, AgentIdentity, CashAddress, ChainState, StateCommitment, TxId,
};

use crate::provider::{
    NetworkProvider, ProviderError, SignedTransaction, Signer, SignerError, TokenData, Utxo,
};

/// Flat miner fee reserved per transaction.
pub const DEFAULT_FEE_SATS: u64 = 1_000;
/// Outputs below this are uneconomical; change under dust is left to fees.
pub const DUST_SATS: u64 = 546;
/// Upper bound on a single broadcast round-trip.
pub const DEFAULT_BROADCAST_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on UTXO reads and signing round-trips. Broadcast gets its
/// own budget because a timed-out broadcast may still have landed.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("identity token missing: no token UTXO at {address}")]
    IdentityTokenMissing { address: CashAddress },

    #[error("insufficient funds: need {required} sats, have {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("action '{action}' does not mutate the chain and has nothing to execute")]
    NotExecutable { action: String },

    #[error("broadcast rejected: {message}")]
    BroadcastRejected { message: String },

    #[error("broadcast timed out after {seconds}s")]
    BroadcastTimeout { seconds: u64 },

    #[error("utxo read timed out after {seconds}s")]
    ReadTimeout { seconds: u64 },

    #[error("signing timed out after {seconds}s")]
    SigningTimeout { seconds: u64 },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Signing(#[from] SignerError),
}

impl ExecutionError {
    /// Short classifier used by cycle outcomes and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IdentityTokenMissing { .. } => "identity_token_missing",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::NotExecutable { .. } => "not_executable",
            Self::BroadcastRejected { .. } => "broadcast_rejected",
            Self::BroadcastTimeout { .. } => "broadcast_timeout",
            Self::ReadTimeout { .. } => "read_timeout",
            Self::SigningTimeout { .. } => "signing_timeout",
            Self::Provider(_) => "provider",
            Self::Signing(_) => "signing",
        }
    }
}

/// One output of a planned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: CashAddress,
    pub sats: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenData>,
}

/// An unsigned transaction plan handed to the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPlan {
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<TxOutput>,
    pub fee_sats: u64,
}

impl TxPlan {
    pub fn input_sats(&self) -> u64 {
        self.inputs.iter().map(|u| u.sats).sum()
    }

    pub fn output_sats(&self) -> u64 {
        self.outputs.iter().map(|o| o.sats).sum()
    }
}

/// An approved action plus the commitment the recreated token must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub action: AgentAction,
    pub next_commitment: StateCommitment,
}

/// Builds, signs, and broadcasts transactions for approved actions, and
/// serves the chain-state read path.
pub struct ExecutionGateway {
    provider: Arc<dyn NetworkProvider>,
    signer: Arc<dyn Signer>,
    fee_sats: u64,
    broadcast_timeout: Duration,
    io_timeout: Duration,
}

impl ExecutionGateway {
    pub fn new(provider: Arc<dyn NetworkProvider>, signer: Arc<dyn Signer>) -> Self {
        Self {
            provider,
            signer,
            fee_sats: DEFAULT_FEE_SATS,
            broadcast_timeout: DEFAULT_BROADCAST_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_fee(mut self, fee_sats: u64) -> Self {
        self.fee_sats = fee_sats;
        self
    }

    pub fn with_broadcast_timeout(mut self, timeout: Duration) -> Self {
        self.broadcast_timeout = timeout;
        self
    }

    /// Budget for UTXO reads and signing round-trips.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    async fn fetch_utxos(&self, address: &CashAddress) -> Result<Vec<Utxo>, ExecutionError> {
        match tokio::time::timeout(self.io_timeout, self.provider.get_utxos(address)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ExecutionError::ReadTimeout {
                seconds: self.io_timeout.as_secs(),
            }),
        }
    }

    /// Fetch a fresh chain-state snapshot for the agent. The commitment is
    /// read off the identity token UTXO; a fresh agent with no token yet
    /// reads as an empty commitment.
    pub async fn sync_state(&self, identity: &AgentIdentity) -> Result<ChainState, ExecutionError> {
        let utxos = self.fetch_utxos(&identity.contract_address).await?;
        let balance_sats = utxos.iter().map(|u| u.sats).sum();
        let commitment = utxos
            .iter()
            .find_map(|u| u.token.as_ref())
            .map(|t| t.commitment.clone())
            .unwrap_or_else(StateCommitment::empty);
        Ok(ChainState {
            balance_sats,
            commitment,
        })
    }

    /// Execute one approved mutating action: plan, sign, broadcast once.
    pub async fn execute(
        &self,
        identity: &AgentIdentity,
        request: &ExecutionRequest,
    ) -> Result<TxId, ExecutionError> {
        if !request.action.mutates_chain() {
            return Err(ExecutionError::NotExecutable {
                action: request.action.name().to_string(),
            });
        }

        let utxos = self.fetch_utxos(&identity.contract_address).await?;
        let plan = self.build_plan(identity, request, utxos)?;

        tracing::debug!(
            agent = %identity.name,
            action = request.action.name(),
            inputs = plan.inputs.len(),
            outputs = plan.outputs.len(),
            "transaction planned"
        );

        let signed = match tokio::time::timeout(self.io_timeout, self.signer.sign(&plan)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ExecutionError::SigningTimeout {
                    seconds: self.io_timeout.as_secs(),
                })
            }
        };

        let txid = match tokio::time::timeout(self.broadcast_timeout, self.provider.broadcast(&signed))
            .await
        {
            Ok(Ok(txid)) => txid,
            Ok(Err(ProviderError::Rejected { message })) => {
                return Err(ExecutionError::BroadcastRejected { message })
            }
            Ok(Err(other)) => return Err(ExecutionError::Provider(other)),
            Err(_) => {
                return Err(ExecutionError::BroadcastTimeout {
                    seconds: self.broadcast_timeout.as_secs(),
                })
            }
        };

        tracing::info!(
            agent = %identity.name,
            action = request.action.name(),
            txid = %txid,
            "transaction broadcast"
        );
        Ok(txid)
    }

    fn build_plan(
        &self,
        identity: &AgentIdentity,
        request: &ExecutionRequest,
        utxos: Vec<Utxo>,
    ) -> Result<TxPlan, ExecutionError> {
        // The identity token is the one input nothing can substitute for.
        let (identity_utxo, plain): (Vec<Utxo>, Vec<Utxo>) =
            utxos.into_iter().partition(Utxo::has_token);
        let identity_utxo = identity_utxo
            .into_iter()
            .next()
            .ok_or_else(|| ExecutionError::IdentityTokenMissing {
                address: identity.contract_address.clone(),
            })?;

        let token = TokenData {
            category: identity_utxo
                .token
                .as_ref()
                .map(|t| t.category.clone())
                .unwrap_or_default(),
            commitment: request.next_commitment.clone(),
        };

        // Recreated identity token keeps its satoshis and address.
        let mut outputs = vec![TxOutput {
            address: identity.contract_address.clone(),
            sats: identity_utxo.sats,
            token: Some(token),
        }];

        if let (Some(destination), Some(sats)) =
            (request.action.destination(), request.action.spend_sats())
        {
            let address = CashAddress::parse_for_network(destination, identity.network).map_err(
                // Guard-approved decisions always carry parseable addresses;
                // a mismatch here means the caller skipped the guard.
                |e| ExecutionError::BroadcastRejected {
                    message: format!("unparseable destination: {}", e),
                },
            )?;
            outputs.push(TxOutput {
                address,
                sats,
                token: None,
            });
        }

        let needed: u64 = outputs.iter().map(|o| o.sats).sum::<u64>() + self.fee_sats;
        let mut inputs = vec![identity_utxo];
        let mut gathered: u64 = inputs[0].sats;

        // Largest-first funding selection over plain UTXOs.
        let mut plain = plain;
        plain.sort_by(|a, b| b.sats.cmp(&a.sats));
        for utxo in plain {
            if gathered >= needed {
                break;
            }
            gathered += utxo.sats;
            inputs.push(utxo);
        }

        if gathered < needed {
            return Err(ExecutionError::InsufficientFunds {
                required: needed,
                available: gathered,
            });
        }

        let change = gathered - needed;
        if change >= DUST_SATS {
            outputs.push(TxOutput {
                address: identity.contract_address.clone(),
                sats: change,
                token: None,
            });
        }

        Ok(TxPlan {
            inputs,
            outputs,
            fee_sats: self.fee_sats,
        })
    }
}
