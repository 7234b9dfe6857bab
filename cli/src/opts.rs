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

use std::path::PathBuf;

use alloy_primitives::Address;
use anyhow::Context;
use clap::ValueHint;
use stories::Config;

use crate::{Command, STORIES_DATA_DIR};

pub const CONFIG_FILE: &str = "config.yaml";

/// Command-line arguments
#[derive(Parser)]
#[derive(Clone, Eq, PartialEq, Debug)]
#[command(author, version, about)]
pub struct Opts {
    /// Set verbosity level.
    ///
    /// Can be used multiple times to increase verbosity.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Data directory path.
    ///
    /// Path to the directory keeping the configuration and the local lists.
    #[arg(
        short,
        long,
        global = true,
        default_value = STORIES_DATA_DIR,
        env = "STORIES_DATA_DIR",
        value_hint = ValueHint::DirPath
    )]
    pub data_dir: PathBuf,

    /// Configuration file; defaults to `config.yaml` inside the data directory.
    #[arg(short, long, global = true, env = "STORIES_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint overriding the configured one.
    #[arg(short, long, global = true, env = "STORIES_RPC", value_hint = ValueHint::Url)]
    pub rpc: Option<String>,

    /// Account managed by the RPC node which signs the transactions.
    #[arg(short, long, global = true, env = "STORIES_ACCOUNT")]
    pub account: Option<Address>,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

impl Opts {
    pub fn process(&mut self) {
        self.data_dir =
            PathBuf::from(shellexpand::tilde(&self.data_dir.display().to_string()).to_string());
        if let Some(config) = &mut self.config {
            *config = PathBuf::from(shellexpand::tilde(&config.display().to_string()).to_string());
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.data_dir.join(CONFIG_FILE))
    }

    /// Configuration from the file, if there is one, with command-line overrides applied.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let path = self.config_path();
        let mut config = if path.exists() {
            Config::load(&path)
                .with_context(|| format!("Unable to load configuration `{}`", path.display()))?
        } else {
            debug!("No configuration at `{}`, using defaults", path.display());
            Config::default()
        };
        if let Some(rpc) = &self.rpc {
            config.rpc_url = rpc.clone();
        }
        Ok(config)
    }

    pub fn account(&self) -> anyhow::Result<Address> {
        self.account
            .context("a signing account must be given with `--account` or `STORIES_ACCOUNT`")
    }
}
