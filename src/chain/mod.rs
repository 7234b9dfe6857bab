// On-chain action runtime for the Stories mobile app
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2025 by the Stories app developers
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

#[cfg(feature = "rpc")]
mod rpc;

use alloy_primitives::{Address, B256, U256};
#[cfg(feature = "rpc")]
pub use rpc::{NodeSigner, RpcChain};

use crate::{Action, TransactionRequest};

pub type TxHash = B256;

/// Unit price of a paid action together with the flag telling whether the action may be performed
/// now. For subscriptions the unit is a single period.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
pub struct PriceQuote {
    /// Amount in wei.
    pub price: U256,
    pub active: bool,
}

impl PriceQuote {
    pub fn free() -> Self {
        PriceQuote {
            price: U256::ZERO,
            active: true,
        }
    }
}

/// Subscription plan as stored by the Stories contract.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
pub struct PlanInfo {
    pub name: String,
    pub price: U256,
    pub period_secs: u32,
    pub active: bool,
}

impl From<&PlanInfo> for PriceQuote {
    fn from(plan: &PlanInfo) -> Self {
        PriceQuote {
            price: plan.price,
            active: plan.active,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
pub struct TodoItem {
    pub id: U256,
    pub description: String,
    pub completed: bool,
    pub staked_amount: U256,
    pub owner: Address,
    /// Unix timestamp, seconds.
    pub created_at: u64,
}

/// Inclusion record of a transaction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub success: bool,
}

#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum ReadError {
    /// cannot connect to the chain RPC endpoint.
    Connectivity,

    /// the chain RPC endpoint did not answer in time.
    Timeout,

    /// the chain RPC endpoint returned malformed data: {0}
    Malformed(String),

    /// the contract call reverted: {0}
    Reverted(String),

    /// there is no contract deployed at {0}.
    NoContract(Address),

    /// the chain RPC endpoint returned error {0}: {1}
    ServerSide(i64, String),
}

#[derive(Clone, PartialEq, Eq, Debug, Display, Error, From)]
pub enum SimulationError {
    /// The call would revert; the payload is the decoded revert reason.
    #[display("{0}")]
    Reverted(String),

    #[from]
    #[display(inner)]
    Read(ReadError),
}

/// Read-only access to contract state; never requires a signature.
pub trait ChainReader {
    /// Current price and availability of a paid action.
    async fn price_quote(&self, action: &Action) -> Result<PriceQuote, ReadError>;

    /// Native currency balance. An error means "unknown", never zero.
    async fn balance(&self, address: Address) -> Result<U256, ReadError>;
}

/// Chain access needed to push a transaction through: dry-runs and inclusion tracking.
pub trait Chain: ChainReader {
    async fn chain_id(&self) -> Result<u64, ReadError>;

    /// Executes the request against the current state without broadcasting it.
    async fn simulate(&self, request: &TransactionRequest) -> Result<(), SimulationError>;

    /// Returns `None` while the transaction is not yet included into a block.
    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, ReadError>;
}

impl<T: ChainReader + ?Sized> ChainReader for &T {
    async fn price_quote(&self, action: &Action) -> Result<PriceQuote, ReadError> {
        (**self).price_quote(action).await
    }

    async fn balance(&self, address: Address) -> Result<U256, ReadError> {
        (**self).balance(address).await
    }
}

impl<T: Chain + ?Sized> Chain for &T {
    async fn chain_id(&self) -> Result<u64, ReadError> { (**self).chain_id().await }

    async fn simulate(&self, request: &TransactionRequest) -> Result<(), SimulationError> {
        (**self).simulate(request).await
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, ReadError> {
        (**self).receipt(tx_hash).await
    }
}
