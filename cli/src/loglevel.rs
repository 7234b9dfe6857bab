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

use std::env;

use log::LevelFilter;

/// Logging verbosity selected with the number of `-v` flags.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[display(lowercase)]
pub enum LogLevel {
    /// Only errors. No verbosity flags.
    Error = 0,

    /// Warnings and errors; `-v`.
    Warn,

    /// Progress of the transactions; `-vv`.
    Info,

    /// RPC failures and retries; `-vvv`.
    Debug,

    /// Every JSON-RPC request; `-vvvv`.
    Trace,
}

impl From<u8> for LogLevel {
    fn from(val: u8) -> Self { Self::from_verbosity_flag_count(val) }
}

impl LogLevel {
    pub fn from_verbosity_flag_count(level: u8) -> Self {
        match level {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Initializes the logger unless `RUST_LOG` already sets the filter.
    pub fn apply(&self) {
        log::set_max_level(LevelFilter::Trace);
        let mut builder = env_logger::Builder::new();
        match env::var("RUST_LOG") {
            Ok(filter) => builder.parse_filters(&filter),
            Err(_) => builder.parse_filters(&self.to_string()),
        };
        builder.init();
    }
}
