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

use std::fmt::{self, Display, Formatter};

use alloy_primitives::U256;

use crate::TxHash;

/// Closed set of reasons an on-chain action may fail. The display text of each kind is the
/// message shown to the user; every kind has its own wording.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
#[display(doc_comments)]
pub enum FailureKind {
    /// Connect a wallet to continue.
    NotConnected,

    /// Your wallet is on a different network. Switch to Monad testnet and try again.
    WrongNetwork,

    /// We couldn't get the current price. Check your connection and try again.
    QuoteUnavailable,

    /// This option isn't available right now.
    ActionInactive,

    /// This transaction would fail, so it wasn't sent. Nothing was charged.
    WouldRevert,

    /// You cancelled the request. Nothing was charged.
    UserRejected,

    /// The transaction couldn't be sent. Please try again.
    SubmissionError,

    /// We couldn't confirm the transaction. Check the explorer before trying again.
    ConfirmationFailed,

    /// We couldn't load the latest data from the network.
    ReadError,

    /// Your data couldn't be saved on this device.
    StorageUnavailable,

    /// This action is already in progress.
    Busy,
}

impl FailureKind {
    /// Whether a plain retry of the same action is a reasonable suggestion to the user.
    pub fn can_retry(self) -> bool {
        matches!(self, FailureKind::SubmissionError | FailureKind::ConfirmationFailed)
    }

    /// Failures caused by the user's own choice, which the UI should not present as errors.
    pub fn is_benign(self) -> bool { self == FailureKind::UserRejected }
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
pub struct TransactionFailure {
    pub kind: FailureKind,
    /// User-facing explanation, including the reason if there is one.
    pub message: String,
    /// Bare reason reported by the chain or the signer, such as a decoded revert string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TransactionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            reason: None,
        }
    }

    /// Failure of the given kind with the reason appended to the kind's message.
    pub fn with_reason(kind: FailureKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            kind,
            message: format!("{kind} Reason: {reason}."),
            reason: Some(reason),
        }
    }

    pub fn from_kind(kind: FailureKind) -> Self { Self::new(kind, kind.to_string()) }
}

impl Display for TransactionFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(&self.message) }
}

impl From<FailureKind> for TransactionFailure {
    fn from(kind: FailureKind) -> Self { Self::from_kind(kind) }
}

/// Final result of a single action attempt.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
pub enum TransactionOutcome {
    #[serde(rename_all = "camelCase")]
    Success { tx_hash: TxHash, amount_paid: U256 },
    Failure(TransactionFailure),
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool { matches!(self, TransactionOutcome::Success { .. }) }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            TransactionOutcome::Success { tx_hash, .. } => Some(*tx_hash),
            TransactionOutcome::Failure(_) => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TransactionOutcome::Success { .. } => None,
            TransactionOutcome::Failure(failure) => Some(failure.kind),
        }
    }
}

impl From<TransactionFailure> for TransactionOutcome {
    fn from(failure: TransactionFailure) -> Self { TransactionOutcome::Failure(failure) }
}

impl From<FailureKind> for TransactionOutcome {
    fn from(kind: FailureKind) -> Self { TransactionOutcome::Failure(kind.into()) }
}

impl Display for TransactionOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransactionOutcome::Success {
                tx_hash,
                amount_paid,
            } => write!(f, "confirmed {tx_hash}, paid {amount_paid} wei"),
            TransactionOutcome::Failure(failure) => Display::fmt(failure, f),
        }
    }
}
