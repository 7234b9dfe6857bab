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

use core::str::FromStr;

use crate::{KeyValueStore, TransactionOutcome};

pub const USERNAME_KEY: &str = "profile:username";
pub const PLAN_KEY: &str = "profile:plan";

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display, Default)]
pub enum Plan {
    #[default]
    #[display("Free")]
    Free,

    #[display("Premium")]
    Premium,

    #[display("VIP")]
    Vip,
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "premium" => Ok(Plan::Premium),
            "vip" => Ok(Plan::Vip),
            s => Err(s.to_string()),
        }
    }
}

/// User profile fields kept in the local store.
#[derive(Debug)]
pub struct Profile<'store, S: KeyValueStore> {
    store: &'store S,
}

impl<'store, S: KeyValueStore> Profile<'store, S> {
    pub fn new(store: &'store S) -> Self { Self { store } }

    pub fn username(&self) -> Option<String> {
        self.read(USERNAME_KEY).filter(|name| !name.is_empty())
    }

    pub fn set_username(&self, username: &str) { self.write(USERNAME_KEY, username.trim()) }

    /// Unknown stored values read as absent.
    pub fn plan(&self) -> Option<Plan> {
        let value = self.read(PLAN_KEY)?;
        value
            .parse()
            .inspect_err(|_| warn!("Ignoring unknown subscription plan `{value}`"))
            .ok()
    }

    pub fn set_plan(&self, plan: Plan) { self.write(PLAN_KEY, &plan.to_string()) }

    /// Stores the plan only for a confirmed subscription; returns whether it was stored.
    pub fn record_subscription(&self, outcome: &TransactionOutcome, plan: Plan) -> bool {
        if !outcome.is_success() {
            return false;
        }
        self.set_plan(plan);
        true
    }

    fn read(&self, key: &str) -> Option<String> {
        self.store
            .get(key)
            .inspect_err(|err| warn!("Unable to read `{key}`: {err}"))
            .ok()
            .flatten()
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            warn!("Unable to save `{key}`: {err}");
        }
    }
}
