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
use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use stories::{
    format_native, Action, Chain, ChainReader, CollectionManager, Config, FsStore, HistoryItem,
    ListSpec, Plan, Profile, RecentSearch, RpcChain, TransactionOrchestrator, TransactionOutcome,
    WalletSession, WatchStatus, HISTORY, RECENTS,
};

use crate::Opts;

#[derive(Subcommand, Clone, PartialEq, Eq, Debug, Display)]
pub enum Command {
    /// Prints out the effective configuration.
    #[display("config")]
    Config {
        /// Save the configuration into the data directory.
        #[clap(long)]
        save: bool,
    },

    /// Prints out native currency balance of an account.
    #[display("balance")]
    Balance {
        /// Account to check; defaults to the signing account.
        address: Option<Address>,
    },

    /// Reports a subscription plan of the Stories contract.
    #[display("plan")]
    Plan {
        /// Plan identifier.
        #[clap(default_value = "1")]
        id: u64,
    },

    /// Subscribes to a plan, paying its current price.
    #[display("subscribe")]
    Subscribe {
        /// Plan identifier.
        #[clap(default_value = "1")]
        plan: u64,

        /// Number of subscription periods.
        #[clap(short, long, default_value = "1")]
        periods: u64,
    },

    /// Lists todos staked by an account, newest first.
    #[display("todos")]
    Todos {
        /// Todo owner; defaults to the signing account.
        owner: Option<Address>,
    },

    /// Reports number of todos and the total stake held by the todo list contract.
    #[display("todo-stats")]
    TodoStats,

    /// Creates a todo, staking the minimum amount required by the contract.
    #[display("create-todo")]
    CreateTodo {
        /// Todo description.
        description: String,
    },

    /// Completes a todo, releasing its stake.
    #[display("complete-todo")]
    CompleteTodo {
        /// Todo identifier.
        id: u64,
    },

    /// Remembers a search query.
    #[display("search")]
    Search {
        /// Query text.
        query: String,
    },

    /// Prints out recent search queries, most recent first.
    #[display("recents")]
    Recents {
        /// Forget all the queries.
        #[clap(long)]
        clear: bool,
    },

    /// Prints out the watch history.
    #[display("history")]
    History {
        /// Show only items with this status (`watching` or `completed`).
        #[clap(short, long)]
        status: Option<WatchStatus>,

        /// Switch the item between watching and completed.
        #[clap(long, value_name = "ID", conflicts_with = "remove")]
        toggle: Option<String>,

        /// Remove the item from the history.
        #[clap(long, value_name = "ID")]
        remove: Option<String>,

        /// Show only items with the title containing the text.
        query: Option<String>,
    },

    /// Prints out or updates the user profile.
    #[display("profile")]
    Profile {
        /// New user name.
        #[clap(long)]
        username: Option<String>,

        /// New subscription plan (`free`, `premium` or `vip`).
        #[clap(long)]
        plan: Option<Plan>,
    },
}

/// History shown to the user before they watch anything.
fn demo_history() -> Vec<HistoryItem> {
    let now = Utc::now();
    vec![
        HistoryItem::new("1", "DanDaDan", 62, WatchStatus::Watching, now),
        HistoryItem::new(
            "2",
            "History of Mangas",
            100,
            WatchStatus::Completed,
            now - Duration::days(1),
        ),
        HistoryItem::new(
            "3",
            "Top Manga Picks",
            35,
            WatchStatus::Watching,
            now - Duration::hours(1),
        ),
        HistoryItem::new(
            "4",
            "Coming Hero 1",
            100,
            WatchStatus::Completed,
            now - Duration::days(2),
        ),
    ]
}

impl Command {
    pub async fn exec(&self, opts: &Opts) -> anyhow::Result<()> {
        let config = opts.load_config()?;
        let store = FsStore::new(&opts.data_dir).with_context(|| {
            format!("Unable to open data directory `{}`", opts.data_dir.display())
        })?;
        let chain = RpcChain::with_config(&config)?;

        match self {
            Command::Config { save } => {
                print!("{}", serde_yaml::to_string(&config)?);
                if *save {
                    config.store(opts.config_path())?;
                    eprintln!("Configuration saved to `{}`", opts.config_path().display());
                }
            }

            Command::Balance { address } => {
                let address = match address {
                    Some(address) => *address,
                    None => opts.account()?,
                };
                let balance = chain.balance(address).await?;
                println!(
                    "{}",
                    format_native(balance, config.native_decimals, &config.native_symbol)
                );
            }

            Command::Plan { id } => {
                let plan = chain.plan(config.stories, (*id).into()).await?;
                println!("name:    {}", plan.name);
                println!(
                    "price:   {}",
                    format_native(plan.price, config.native_decimals, &config.native_symbol)
                );
                println!("period:  {} s", plan.period_secs);
                println!("active:  {}", plan.active);
            }

            Command::Subscribe { plan, periods } => {
                let action = Action::subscribe(&config, *plan, *periods);
                let info = chain.plan(config.stories, (*plan).into()).await?;
                let outcome = submit(opts, &config, &chain, &action).await?;
                match info.name.parse::<Plan>() {
                    Ok(plan) => {
                        let profile = Profile::new(&store);
                        if profile.record_subscription(&outcome, plan) {
                            eprintln!("Profile plan is set to {plan}");
                        }
                    }
                    Err(name) => warn!("Plan `{name}` has no profile counterpart"),
                }
            }

            Command::Todos { owner } => {
                let owner = match owner {
                    Some(owner) => *owner,
                    None => opts.account()?,
                };
                let todos = chain.todos_of(todo_list(&config)?, owner).await?;
                if todos.is_empty() {
                    eprintln!("No todos found");
                }
                for todo in todos {
                    println!(
                        "{:>4}  [{}]  {:<40}  {}",
                        todo.id,
                        if todo.completed { 'x' } else { ' ' },
                        todo.description,
                        format_native(
                            todo.staked_amount,
                            config.native_decimals,
                            &config.native_symbol
                        )
                    );
                }
            }

            Command::TodoStats => {
                let (count, balance) = chain.todo_stats(todo_list(&config)?).await?;
                println!("todos:   {count}");
                println!(
                    "staked:  {}",
                    format_native(balance, config.native_decimals, &config.native_symbol)
                );
            }

            Command::CreateTodo { description } => {
                if description.trim().is_empty() {
                    bail!("todo description must not be empty");
                }
                todo_list(&config)?;
                let action = Action::create_todo(&config, description.as_str());
                submit(opts, &config, &chain, &action).await?;
            }

            Command::CompleteTodo { id } => {
                todo_list(&config)?;
                let action = Action::complete_todo(&config, *id);
                submit(opts, &config, &chain, &action).await?;
            }

            Command::Search { query } => {
                let manager = CollectionManager::new(&store);
                let mut recents = manager.open::<RecentSearch>(recents_spec(&config));
                if !recents.push_query(query) {
                    bail!("search query must not be blank");
                }
                print_recents(recents.to_vec());
            }

            Command::Recents { clear } => {
                let manager = CollectionManager::new(&store);
                let mut recents = manager.open::<RecentSearch>(recents_spec(&config));
                if *clear {
                    recents.clear();
                }
                print_recents(recents.to_vec());
            }

            Command::History {
                status,
                toggle,
                remove,
                query,
            } => {
                let manager = CollectionManager::new(&store);
                let mut history = manager.open_seeded(HISTORY, demo_history());
                if let Some(id) = toggle {
                    if !history.toggle_status(id) {
                        bail!("no history item with id `{id}`");
                    }
                }
                if let Some(id) = remove {
                    if !history.remove(id.as_str()) {
                        bail!("no history item with id `{id}`");
                    }
                }
                let items = history.search(*status, query.as_deref().unwrap_or_default());
                if items.is_empty() {
                    eprintln!("Nothing to show");
                }
                for item in items {
                    println!(
                        "{:>4}  {:<32}  {:>3}%  {:<9}  {}",
                        item.id,
                        item.title,
                        item.progress,
                        item.status,
                        item.updated_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }

            Command::Profile { username, plan } => {
                let profile = Profile::new(&store);
                if let Some(username) = username {
                    profile.set_username(username);
                }
                if let Some(plan) = plan {
                    profile.set_plan(*plan);
                }
                println!("username: {}", profile.username().unwrap_or_default());
                println!("plan:     {}", profile.plan().unwrap_or_default());
            }
        }

        Ok(())
    }
}

fn recents_spec(config: &Config) -> ListSpec { RECENTS.with_cap(config.recents_cap) }

fn todo_list(config: &Config) -> anyhow::Result<Address> {
    if config.staking_todo == Address::ZERO {
        bail!("address of the staking todo list contract is not configured (`stakingTodo`)");
    }
    Ok(config.staking_todo)
}

fn print_recents(recents: Vec<RecentSearch>) {
    for search in recents {
        println!("{search}");
    }
}

/// Pushes the action through the node-managed signing account and reports the outcome.
async fn submit(
    opts: &Opts,
    config: &Config,
    chain: &RpcChain,
    action: &Action,
) -> anyhow::Result<TransactionOutcome> {
    let account = opts.account()?;
    let chain_id = chain.chain_id().await?;
    let session = WalletSession::connected(account, chain_id, chain.signer(account));
    let orchestrator = TransactionOrchestrator::with_config(chain, config);

    eprintln!("Submitting {} from {account} ...", action.id());
    let outcome = orchestrator.execute(action, &session).await;
    match &outcome {
        TransactionOutcome::Success {
            tx_hash,
            amount_paid,
        } => {
            println!(
                "Confirmed, paid {}",
                format_native(*amount_paid, config.native_decimals, &config.native_symbol)
            );
            println!("{}", config.explorer_url(*tx_hash));
        }
        TransactionOutcome::Failure(failure) if failure.kind.is_benign() => {
            eprintln!("{failure}");
        }
        TransactionOutcome::Failure(failure) => {
            if failure.kind.can_retry() {
                bail!("{failure} You may retry the command.");
            }
            bail!("{failure}");
        }
    }
    Ok(outcome)
}
