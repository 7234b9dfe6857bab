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

use alloy_primitives::Address;

use crate::{TransactionRequest, TxHash};

#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum SignError {
    /// the request was declined in the wallet.
    Rejected,

    /// the wallet session was closed before the request was answered.
    Disconnected,

    /// the wallet failed to sign or broadcast the transaction: {0}
    Failed(String),
}

/// Wallet-side capability: presents a request to the user, signs it and broadcasts it.
pub trait Signer {
    async fn sign_and_send(&self, request: &TransactionRequest) -> Result<TxHash, SignError>;
}

impl<T: Signer + ?Sized> Signer for &T {
    async fn sign_and_send(&self, request: &TransactionRequest) -> Result<TxHash, SignError> {
        (**self).sign_and_send(request).await
    }
}

/// Snapshot of the external wallet connection, taken by the caller at the moment an action is
/// started. Each part may be missing independently while a wallet is (re)connecting.
#[derive(Clone, Debug)]
pub struct WalletSession<S> {
    address: Option<Address>,
    chain_id: Option<u64>,
    signer: Option<S>,
}

impl<S> Default for WalletSession<S> {
    fn default() -> Self { Self::disconnected() }
}

impl<S> WalletSession<S> {
    pub fn new(address: Option<Address>, chain_id: Option<u64>, signer: Option<S>) -> Self {
        Self {
            address,
            chain_id,
            signer,
        }
    }

    pub fn connected(address: Address, chain_id: u64, signer: S) -> Self {
        Self::new(Some(address), Some(chain_id), Some(signer))
    }

    pub fn disconnected() -> Self { Self::new(None, None, None) }

    pub fn address(&self) -> Option<Address> { self.address }

    pub fn chain_id(&self) -> Option<u64> { self.chain_id }

    pub fn signer(&self) -> Option<&S> { self.signer.as_ref() }

    /// A session may issue transactions only with an address, a network and a signer present.
    pub fn is_ready(&self) -> bool {
        self.address.is_some() && self.chain_id.is_some() && self.signer.is_some()
    }
}
