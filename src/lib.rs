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

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![allow(async_fn_in_trait)]

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_crate as serde;

pub mod contracts;
mod action;
mod chain;
mod config;
mod collection;
mod orchestrator;
mod outcome;
mod profile;
mod session;
mod store;
mod units;

pub use action::{Action, ActionId, ContractCall, Pricing, TransactionRequest};
#[cfg(feature = "rpc")]
pub use chain::{NodeSigner, RpcChain};
pub use chain::{
    Chain, ChainReader, PlanInfo, PriceQuote, ReadError, Receipt, SimulationError, TodoItem,
    TxHash,
};
pub use collection::{
    Collection, CollectionEntry, CollectionManager, HistoryItem, ListOrder, ListSpec,
    RecentSearch, WatchStatus, HISTORY, RECENTS,
};
pub use config::{Config, ConfigError};
pub use orchestrator::{Stage, TransactionOrchestrator};
pub use outcome::{FailureKind, TransactionFailure, TransactionOutcome};
pub use profile::{Plan, Profile, PLAN_KEY, USERNAME_KEY};
pub use session::{SignError, Signer, WalletSession};
pub use store::{FsStore, KeyValueStore, MemStore, StoreError};
pub use units::format_native;
