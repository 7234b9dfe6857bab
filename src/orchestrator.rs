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

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::{
    Action, ActionId, Chain, Config, FailureKind, Receipt, SignError, Signer, SimulationError,
    TransactionFailure, TransactionOutcome, TxHash, WalletSession,
};

const DEFAULT_QUOTE_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Progress of the latest attempt of an action.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Stage {
    #[default]
    Idle,
    Quoting,
    Simulating,
    AwaitingSignature,
    Confirming,
    Succeeded,
    Failed(FailureKind),
}

impl Stage {
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            Stage::Quoting | Stage::Simulating | Stage::AwaitingSignature | Stage::Confirming
        )
    }
}

/// Exclusive right to run an attempt of a single action. Releases the action if the attempt is
/// abandoned before reaching a terminal stage.
struct BusyGuard<'a> {
    stages: &'a RefCell<HashMap<ActionId, Stage>>,
    id: ActionId,
}

impl<'a> BusyGuard<'a> {
    fn acquire(stages: &'a RefCell<HashMap<ActionId, Stage>>, id: &ActionId) -> Option<Self> {
        let mut map = stages.borrow_mut();
        let stage = map.entry(id.clone()).or_default();
        if stage.is_in_flight() {
            return None;
        }
        *stage = Stage::Quoting;
        Some(Self {
            stages,
            id: id.clone(),
        })
    }

    fn advance(&self, stage: Stage) {
        trace!("Action {} enters stage {stage:?}", self.id);
        self.stages.borrow_mut().insert(self.id.clone(), stage);
    }

    fn finish(self, outcome: &TransactionOutcome) {
        match outcome.failure_kind() {
            None => self.advance(Stage::Succeeded),
            Some(kind) => self.advance(Stage::Failed(kind)),
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut map = self.stages.borrow_mut();
        if let Some(stage) = map.get_mut(&self.id) {
            if stage.is_in_flight() {
                debug!("Attempt of action {} was abandoned at stage {stage:?}", self.id);
                *stage = Stage::Idle;
            }
        }
    }
}

/// Drives actions through quote, simulation, signing and confirmation against a single chain.
///
/// The orchestrator is meant for a single-threaded runtime: it is neither `Send` nor `Sync`, and
/// attempts of different actions interleave at their await points.
#[derive(Debug)]
pub struct TransactionOrchestrator<C: Chain> {
    chain: C,
    quote_timeout: Duration,
    confirmation_timeout: Duration,
    poll_interval: Duration,
    stages: RefCell<HashMap<ActionId, Stage>>,
}

impl<C: Chain> TransactionOrchestrator<C> {
    pub fn new(chain: C) -> Self {
        Self::with_timeouts(
            chain,
            DEFAULT_QUOTE_TIMEOUT,
            DEFAULT_CONFIRMATION_TIMEOUT,
            DEFAULT_POLL_INTERVAL,
        )
    }

    pub fn with_config(chain: C, config: &Config) -> Self {
        Self::with_timeouts(
            chain,
            config.quote_timeout(),
            config.confirmation_timeout(),
            config.poll_interval(),
        )
    }

    pub fn with_timeouts(
        chain: C,
        quote_timeout: Duration,
        confirmation_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain,
            quote_timeout,
            confirmation_timeout,
            poll_interval,
            stages: empty!(),
        }
    }

    pub fn chain(&self) -> &C { &self.chain }

    pub fn stage(&self, id: &ActionId) -> Stage {
        self.stages.borrow().get(id).copied().unwrap_or_default()
    }

    pub fn is_busy(&self, id: &ActionId) -> bool { self.stage(id).is_in_flight() }

    /// Runs a single attempt of the action on behalf of the wallet session.
    ///
    /// Never fails: every problem is reported as a [`TransactionOutcome::Failure`]. A concurrent
    /// attempt of the same action is rejected with [`FailureKind::Busy`] before doing anything.
    pub async fn execute<S: Signer>(
        &self,
        action: &Action,
        session: &WalletSession<S>,
    ) -> TransactionOutcome {
        let Some(guard) = BusyGuard::acquire(&self.stages, action.id()) else {
            warn!("Action {} is already in progress, rejecting a concurrent attempt", action.id());
            return FailureKind::Busy.into();
        };

        let outcome = self
            .attempt(action, session, &guard)
            .await
            .unwrap_or_else(TransactionOutcome::Failure);
        match &outcome {
            TransactionOutcome::Success {
                tx_hash,
                amount_paid,
            } => info!("Action {} confirmed in {tx_hash}, paid {amount_paid} wei", action.id()),
            TransactionOutcome::Failure(failure) if failure.kind.is_benign() => {
                info!("Action {} cancelled by the user", action.id())
            }
            TransactionOutcome::Failure(failure) => {
                warn!("Action {} failed ({:?}): {failure}", action.id(), failure.kind)
            }
        }
        guard.finish(&outcome);
        outcome
    }

    /// Runs [`Self::execute`] as a task of the current [`tokio::task::LocalSet`], so the outcome
    /// is kept even if the caller stops waiting for it.
    pub fn spawn<S: Signer + 'static>(
        self: Rc<Self>,
        action: Action,
        session: WalletSession<S>,
    ) -> JoinHandle<TransactionOutcome>
    where
        C: 'static,
    {
        tokio::task::spawn_local(async move { self.execute(&action, &session).await })
    }

    async fn attempt<S: Signer>(
        &self,
        action: &Action,
        session: &WalletSession<S>,
        guard: &BusyGuard<'_>,
    ) -> Result<TransactionOutcome, TransactionFailure> {
        let (Some(from), Some(chain_id), Some(signer)) =
            (session.address(), session.chain_id(), session.signer())
        else {
            return Err(FailureKind::NotConnected.into());
        };
        if chain_id != action.chain_id() {
            debug!(
                "Wallet is on network {chain_id} while action {} requires {}",
                action.id(),
                action.chain_id()
            );
            return Err(FailureKind::WrongNetwork.into());
        }

        let quote = match timeout(self.quote_timeout, self.chain.price_quote(action)).await {
            Ok(Ok(quote)) => quote,
            Ok(Err(err)) => {
                debug!("Price quote for action {} is unavailable: {err}", action.id());
                return Err(FailureKind::QuoteUnavailable.into());
            }
            Err(_) => {
                debug!("Price quote for action {} has timed out", action.id());
                return Err(FailureKind::QuoteUnavailable.into());
            }
        };
        if !quote.active {
            return Err(FailureKind::ActionInactive.into());
        }

        let Some(value) = action.pricing().payment(quote.price) else {
            debug!("Payment for action {} overflows at unit price {}", action.id(), quote.price);
            return Err(FailureKind::QuoteUnavailable.into());
        };
        let request = action.request(from, value);
        guard.advance(Stage::Simulating);
        if let Err(err) = self.chain.simulate(&request).await {
            let kind = FailureKind::WouldRevert;
            return Err(match err {
                SimulationError::Reverted(reason) => TransactionFailure::with_reason(kind, reason),
                SimulationError::Read(err) => {
                    debug!("Dry-run of action {} failed: {err}", action.id());
                    kind.into()
                }
            });
        }

        guard.advance(Stage::AwaitingSignature);
        let tx_hash = signer
            .sign_and_send(&request)
            .await
            .map_err(|err| match err {
                SignError::Rejected => FailureKind::UserRejected.into(),
                SignError::Disconnected => FailureKind::NotConnected.into(),
                SignError::Failed(msg) => {
                    TransactionFailure::with_reason(FailureKind::SubmissionError, msg)
                }
            })?;

        guard.advance(Stage::Confirming);
        debug!("Action {} submitted as {tx_hash}, waiting for confirmation", action.id());
        let kind = FailureKind::ConfirmationFailed;
        let receipt = timeout(self.confirmation_timeout, self.wait_receipt(tx_hash))
            .await
            .map_err(|_| TransactionFailure::from_kind(kind))?;
        if !receipt.success {
            return Err(TransactionFailure::new(
                kind,
                format!(
                    "The transaction was included in block {} but failed.",
                    receipt.block_number
                ),
            ));
        }

        Ok(TransactionOutcome::Success {
            tx_hash,
            amount_paid: request.value(),
        })
    }

    async fn wait_receipt(&self, tx_hash: TxHash) -> Receipt {
        loop {
            match self.chain.receipt(tx_hash).await {
                Ok(Some(receipt)) => return receipt,
                Ok(None) => trace!("Transaction {tx_hash} is still pending"),
                Err(err) => debug!("Unable to check the status of {tx_hash}, retrying: {err}"),
            }
            sleep(self.poll_interval).await;
        }
    }
}
