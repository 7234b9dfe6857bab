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

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_sol_types::SolCall;

use crate::contracts::{StakingTodoList, Stories};
use crate::Config;

/// Identifier of the Stories plan sold as "Premium".
pub const PREMIUM_PLAN_ID: u64 = 1;

/// Name of a logical on-chain operation. At most one transaction attempt per identifier may be in
/// flight at any moment.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[display("{0}")]
pub struct ActionId(String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for ActionId {
    fn from(id: &str) -> Self { Self::new(id) }
}

/// Rule by which the payment attached to an action is determined.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Pricing {
    /// The action carries no payment and is always active.
    Free,

    /// Price and availability are read from `plans(planId)` of the target contract. The quoted
    /// price covers a single period.
    Plan { plan_id: U256, periods: U256 },

    /// The payment is the `minimumStake()` of the target contract; the action is always active.
    MinimumStake,
}

impl Pricing {
    /// Payment for the whole action given the quoted unit price; `None` on overflow.
    pub fn payment(&self, unit_price: U256) -> Option<U256> {
        match self {
            Pricing::Plan { periods, .. } => unit_price.checked_mul(*periods),
            Pricing::Free | Pricing::MinimumStake => Some(unit_price),
        }
    }
}

/// Contract function invoked by an action together with its arguments.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ContractCall {
    Subscribe { plan_id: U256, periods: U256 },
    CreateTodo { description: String },
    CompleteTodo { todo_id: U256 },
}

impl ContractCall {
    pub fn signature(&self) -> &'static str {
        match self {
            ContractCall::Subscribe { .. } => Stories::subscribeCall::SIGNATURE,
            ContractCall::CreateTodo { .. } => StakingTodoList::createTodoCall::SIGNATURE,
            ContractCall::CompleteTodo { .. } => StakingTodoList::completeTodoCall::SIGNATURE,
        }
    }

    pub fn selector(&self) -> FixedBytes<4> {
        let selector = match self {
            ContractCall::Subscribe { .. } => Stories::subscribeCall::SELECTOR,
            ContractCall::CreateTodo { .. } => StakingTodoList::createTodoCall::SELECTOR,
            ContractCall::CompleteTodo { .. } => StakingTodoList::completeTodoCall::SELECTOR,
        };
        FixedBytes::from(selector)
    }

    /// ABI-encoded calldata, selector included.
    pub fn abi_encode(&self) -> Bytes {
        let data = match self {
            ContractCall::Subscribe { plan_id, periods } => Stories::subscribeCall {
                planId: *plan_id,
                periods: *periods,
            }
            .abi_encode(),
            ContractCall::CreateTodo { description } => StakingTodoList::createTodoCall {
                description: description.clone(),
            }
            .abi_encode(),
            ContractCall::CompleteTodo { todo_id } => {
                StakingTodoList::completeTodoCall { todoId: *todo_id }.abi_encode()
            }
        };
        Bytes::from(data)
    }
}

/// Fixed shape of a state-changing contract call: what is called, where, on which network and how
/// the payment is priced. The payment amount itself is only known after a price quote.
#[derive(Getters, Clone, PartialEq, Eq, Debug)]
pub struct Action {
    id: ActionId,
    #[getter(as_copy)]
    chain_id: u64,
    #[getter(as_copy)]
    target: Address,
    call: ContractCall,
    #[getter(as_copy)]
    pricing: Pricing,
}

impl Action {
    pub fn new(
        id: impl Into<ActionId>,
        chain_id: u64,
        target: Address,
        call: ContractCall,
        pricing: Pricing,
    ) -> Self {
        Self {
            id: id.into(),
            chain_id,
            target,
            call,
            pricing,
        }
    }

    /// `subscribe(planId, periods)` on the Stories contract, paid with the plan price for each
    /// period.
    pub fn subscribe(config: &Config, plan_id: u64, periods: u64) -> Self {
        let plan_id = U256::from(plan_id);
        let periods = U256::from(periods);
        Self::new(
            ActionId::new(format!("subscribe:{plan_id}")),
            config.chain_id,
            config.stories,
            ContractCall::Subscribe { plan_id, periods },
            Pricing::Plan { plan_id, periods },
        )
    }

    pub fn subscribe_premium(config: &Config) -> Self {
        Self::subscribe(config, PREMIUM_PLAN_ID, 1)
    }

    /// `createTodo(description)` on the staking todo list, staking the contract minimum.
    pub fn create_todo(config: &Config, description: impl Into<String>) -> Self {
        Self::new(
            "todo:create",
            config.chain_id,
            config.staking_todo,
            ContractCall::CreateTodo {
                description: description.into().trim().to_owned(),
            },
            Pricing::MinimumStake,
        )
    }

    /// `completeTodo(id)` on the staking todo list; unpaid, the contract releases the stake.
    pub fn complete_todo(config: &Config, todo_id: u64) -> Self {
        Self::new(
            ActionId::new(format!("todo:complete:{todo_id}")),
            config.chain_id,
            config.staking_todo,
            ContractCall::CompleteTodo {
                todo_id: U256::from(todo_id),
            },
            Pricing::Free,
        )
    }

    pub(crate) fn request(&self, from: Address, value: U256) -> TransactionRequest {
        TransactionRequest {
            action: self.id.clone(),
            chain_id: self.chain_id,
            from,
            to: self.target,
            selector: self.call.selector(),
            function: self.call.signature(),
            data: self.call.abi_encode(),
            value,
        }
    }
}

/// Ready-to-sign description of a contract call. Only the orchestrator builds these, and only
/// after a successful price quote within the same attempt.
#[derive(Getters, Clone, PartialEq, Eq, Debug)]
pub struct TransactionRequest {
    action: ActionId,
    #[getter(as_copy)]
    chain_id: u64,
    #[getter(as_copy)]
    from: Address,
    #[getter(as_copy)]
    to: Address,
    #[getter(as_copy)]
    selector: FixedBytes<4>,
    #[getter(as_copy)]
    function: &'static str,
    data: Bytes,
    #[getter(as_copy)]
    value: U256,
}
