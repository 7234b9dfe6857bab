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

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate log;
#[macro_use]
extern crate clap;

mod loglevel;
mod opts;
mod command;

use std::process::ExitCode;

use clap::Parser;

pub use crate::command::Command;
pub use crate::loglevel::LogLevel;
pub use crate::opts::Opts;

#[cfg(any(target_os = "linux", target_os = "freebsd", target_os = "openbsd", target_os = "netbsd"))]
pub const STORIES_DATA_DIR: &str = "~/.stories";
#[cfg(target_os = "macos")]
pub const STORIES_DATA_DIR: &str = "~/Library/Application Support/Stories";
#[cfg(target_os = "windows")]
pub const STORIES_DATA_DIR: &str = "~\\AppData\\Local\\Stories";
#[cfg(target_os = "ios")]
pub const STORIES_DATA_DIR: &str = "~/Documents";
#[cfg(target_os = "android")]
pub const STORIES_DATA_DIR: &str = ".";

fn main() -> ExitCode {
    let mut opts = Opts::parse();
    opts.process();
    LogLevel::from_verbosity_flag_count(opts.verbose).apply();
    trace!("Command-line arguments: {:#?}", &opts);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: unable to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    debug!("Executing command: {}", opts.command);
    if let Err(err) = runtime.block_on(opts.command.exec(&opts)) {
        eprintln!("Error: {err:#}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
