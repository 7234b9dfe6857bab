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

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use alloy_primitives::{address, Address};
use amplify::IoError;

use crate::TxHash;

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ConfigError {
    /// unable to read configuration file: {0}
    #[from]
    #[from(io::Error)]
    Io(IoError),

    /// invalid configuration: {0}
    #[from]
    Yaml(serde_yaml::Error),
}

/// Network and contract settings, with defaults for the Monad testnet deployment.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase", default)]
pub struct Config {
    pub chain_id: u64,
    pub rpc_url: String,
    pub stories: Address,
    /// Staking todo list contract; has no public deployment and must be configured.
    pub staking_todo: Address,
    /// Prefix to which a transaction hash is appended to get its explorer page.
    pub explorer_tx_url: String,
    pub native_symbol: String,
    pub native_decimals: usize,
    pub quote_timeout_secs: u64,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub recents_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chain_id: 10143,
            rpc_url: s!("https://testnet-rpc.monad.xyz"),
            stories: address!("6c1ae56758aa8031f0e3db6107be79bea07e9f3f"),
            staking_todo: Address::ZERO,
            explorer_tx_url: s!("https://testnet.monadexplorer.com/tx/"),
            native_symbol: s!("MON"),
            native_decimals: 4,
            quote_timeout_secs: 15,
            confirmation_timeout_secs: 120,
            poll_interval_ms: 2000,
            recents_cap: 8,
        }
    }
}

impl Config {
    /// Reads YAML configuration; missing fields take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&data)?;
        debug!("Configuration loaded from `{}`", path.display());
        Ok(config)
    }

    pub fn store(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let data = serde_yaml::to_string(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn quote_timeout(&self) -> Duration { Duration::from_secs(self.quote_timeout_secs) }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }

    pub fn explorer_url(&self, tx_hash: TxHash) -> String {
        format!("{}{tx_hash}", self.explorer_tx_url)
    }
}
