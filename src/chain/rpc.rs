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

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256, U64};
use alloy_sol_types::{decode_revert_reason, Revert, SolCall, SolError};
use reqwest::Client;
use serde_json::{json, Value};

use super::{Chain, ChainReader, PlanInfo, PriceQuote, ReadError, Receipt, SimulationError};
use crate::contracts::{StakingTodoList, Stories};
use crate::{Action, Config, Pricing, SignError, Signer, TodoItem, TransactionRequest, TxHash};

/// EIP-1193 code reported by wallets and nodes when the user declines a request.
const USER_REJECTED_CODE: i64 = 4001;
/// Code used by EVM nodes for `eth_call`/`eth_estimateGas` reverts.
const EXECUTION_REVERTED_CODE: i64 = 3;

#[derive(Serialize)]
#[serde(crate = "serde_crate")]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
#[serde(crate = "serde_crate")]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
#[serde(crate = "serde_crate")]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    status: Option<U64>,
}

/// Failure of a single JSON-RPC round trip.
#[derive(Debug)]
enum RpcFault {
    Transport(ReadError),
    Server {
        code: i64,
        message: String,
        data: Option<Value>,
    },
}

impl RpcFault {
    fn is_revert(&self) -> bool {
        match self {
            RpcFault::Server { code, message, .. } => {
                *code == EXECUTION_REVERTED_CODE || message.contains("revert")
            }
            RpcFault::Transport(_) => false,
        }
    }

    fn revert_reason(&self) -> String {
        let RpcFault::Server { message, data, .. } = self else {
            return s!("unknown reason");
        };
        data.as_ref()
            .and_then(Value::as_str)
            .and_then(|hex| hex.parse::<Bytes>().ok())
            .and_then(|data| {
                Revert::abi_decode(&data, true)
                    .map(|revert| revert.reason)
                    .ok()
                    .or_else(|| decode_revert_reason(&data))
            })
            .or_else(|| {
                message
                    .strip_prefix("execution reverted: ")
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| message.clone())
    }
}

impl From<RpcFault> for ReadError {
    fn from(fault: RpcFault) -> Self {
        if fault.is_revert() {
            return ReadError::Reverted(fault.revert_reason());
        }
        match fault {
            RpcFault::Transport(err) => err,
            RpcFault::Server { code, message, .. } => ReadError::ServerSide(code, message),
        }
    }
}

impl From<reqwest::Error> for ReadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReadError::Timeout
        } else if err.is_connect() || err.is_request() {
            ReadError::Connectivity
        } else {
            ReadError::Malformed(err.to_string())
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ReadError> {
    serde_json::from_value(value).map_err(|err| ReadError::Malformed(err.to_string()))
}

fn tx_object(request: &TransactionRequest) -> Value {
    json!({
        "from": request.from(),
        "to": request.to(),
        "value": request.value(),
        "data": request.data(),
    })
}

/// Ethereum JSON-RPC client over HTTP(S).
#[derive(Clone, Debug)]
pub struct RpcChain {
    client: Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl RpcChain {
    pub fn new(url: impl ToString, timeout: Duration) -> Result<Self, ReadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ReadError::Malformed(err.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Client for the configured endpoint; single requests are bounded by the quote timeout.
    pub fn with_config(config: &Config) -> Result<Self, ReadError> {
        Self::new(&config.rpc_url, config.quote_timeout())
    }

    pub fn url(&self) -> &str { &self.url }

    /// Signer delegating to an account managed by the node (`eth_sendTransaction`).
    pub fn signer(&self, from: Address) -> NodeSigner {
        NodeSigner {
            chain: self.clone(),
            from,
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcFault> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!("JSON-RPC #{id} {method} {params}");
        let payload = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| RpcFault::Transport(err.into()))?;
        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|err| RpcFault::Transport(err.into()))?;

        if let Some(JsonRpcError {
            code,
            message,
            data,
        }) = response.error
        {
            debug!("JSON-RPC #{id} {method} failed with code {code}: {message}");
            return Err(RpcFault::Server {
                code,
                message,
                data,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn call<C: SolCall>(&self, to: Address, call: &C) -> Result<C::Return, ReadError> {
        let data = Bytes::from(call.abi_encode());
        let result = self
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        let output: Bytes = decode(result)?;
        C::abi_decode_returns(&output, true).map_err(|err| ReadError::Malformed(err.to_string()))
    }

    pub async fn code_at(&self, address: Address) -> Result<Bytes, ReadError> {
        let result = self
            .request("eth_getCode", json!([address, "latest"]))
            .await?;
        decode(result)
    }

    pub async fn plan(&self, stories: Address, plan_id: U256) -> Result<PlanInfo, ReadError> {
        let plan = self
            .call(stories, &Stories::plansCall { planId: plan_id })
            .await?;
        Ok(PlanInfo {
            name: plan.name,
            price: plan.priceWei,
            period_secs: plan.periodSecs,
            active: plan.active,
        })
    }

    pub async fn minimum_stake(&self, todo_list: Address) -> Result<U256, ReadError> {
        let stake = self
            .call(todo_list, &StakingTodoList::minimumStakeCall {})
            .await?;
        Ok(stake.amount)
    }

    /// Todos staked by `owner`, newest first.
    ///
    /// The contract presence is verified first, so a revert coming back from the listing call is
    /// reported as an error rather than being mistaken for an empty list.
    pub async fn todos_of(
        &self,
        todo_list: Address,
        owner: Address,
    ) -> Result<Vec<TodoItem>, ReadError> {
        if self.code_at(todo_list).await?.is_empty() {
            return Err(ReadError::NoContract(todo_list));
        }
        let details = self
            .call(todo_list, &StakingTodoList::getUserTodoDetailsCall { user: owner })
            .await?;
        let mut todos = details
            .todos
            .into_iter()
            .map(|todo| TodoItem {
                id: todo.id,
                description: todo.description,
                completed: todo.completed,
                staked_amount: todo.stakedAmount,
                owner: todo.owner,
                created_at: u64::try_from(todo.createdAt).unwrap_or(u64::MAX),
            })
            .collect::<Vec<_>>();
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(todos)
    }

    /// Total number of todos and the amount currently staked in the contract.
    pub async fn todo_stats(&self, todo_list: Address) -> Result<(U256, U256), ReadError> {
        let count = self
            .call(todo_list, &StakingTodoList::getTotalTodoCountCall {})
            .await?;
        let balance = self
            .call(todo_list, &StakingTodoList::getContractBalanceCall {})
            .await?;
        Ok((count.count, balance.balance))
    }
}

impl ChainReader for RpcChain {
    async fn price_quote(&self, action: &Action) -> Result<PriceQuote, ReadError> {
        match action.pricing() {
            Pricing::Free => Ok(PriceQuote::free()),
            Pricing::Plan { plan_id, .. } => {
                let plan = self.plan(action.target(), plan_id).await?;
                Ok(PriceQuote::from(&plan))
            }
            Pricing::MinimumStake => Ok(PriceQuote {
                price: self.minimum_stake(action.target()).await?,
                active: true,
            }),
        }
    }

    async fn balance(&self, address: Address) -> Result<U256, ReadError> {
        let result = self
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        decode(result)
    }
}

impl Chain for RpcChain {
    async fn chain_id(&self) -> Result<u64, ReadError> {
        let result = self.request("eth_chainId", json!([])).await?;
        let id: U64 = decode(result)?;
        Ok(id.to::<u64>())
    }

    async fn simulate(&self, request: &TransactionRequest) -> Result<(), SimulationError> {
        match self
            .request("eth_call", json!([tx_object(request), "latest"]))
            .await
        {
            Ok(_) => Ok(()),
            Err(fault) if fault.is_revert() => {
                Err(SimulationError::Reverted(fault.revert_reason()))
            }
            Err(fault) => Err(SimulationError::Read(fault.into())),
        }
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, ReadError> {
        let result = self
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let receipt: RpcReceipt = decode(result)?;
        let Some(block_number) = receipt.block_number else {
            return Ok(None);
        };
        Ok(Some(Receipt {
            tx_hash: receipt.transaction_hash,
            block_number: block_number.to::<u64>(),
            success: receipt.status == Some(U64::from(1u64)),
        }))
    }
}

/// Signs through an account unlocked on the RPC node itself, e.g. a development node.
#[derive(Clone, Debug)]
pub struct NodeSigner {
    chain: RpcChain,
    from: Address,
}

impl NodeSigner {
    pub fn address(&self) -> Address { self.from }
}

impl Signer for NodeSigner {
    async fn sign_and_send(&self, request: &TransactionRequest) -> Result<TxHash, SignError> {
        if request.from() != self.from {
            return Err(SignError::Failed(format!(
                "request is issued for {} while the node account is {}",
                request.from(),
                self.from
            )));
        }
        let result = self
            .chain
            .request("eth_sendTransaction", json!([tx_object(request)]))
            .await
            .map_err(|fault| match fault {
                RpcFault::Server { code, .. } if code == USER_REJECTED_CODE => SignError::Rejected,
                RpcFault::Server { message, .. } => SignError::Failed(message),
                RpcFault::Transport(err) => SignError::Failed(err.to_string()),
            })?;
        serde_json::from_value(result).map_err(|err| SignError::Failed(err.to_string()))
    }
}
