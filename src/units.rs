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

use alloy_primitives::utils::format_units;
use alloy_primitives::U256;

/// Decimals of the native currency.
const NATIVE_DECIMALS: u8 = 18;

/// Renders a wei amount as a native currency amount with a fixed number of decimals, truncating
/// the rest, e.g. `0.0010 MON`.
pub fn format_native(amount: U256, decimals: usize, symbol: &str) -> String {
    let units = match format_units(amount, NATIVE_DECIMALS) {
        Ok(units) => units,
        Err(err) => {
            warn!("Unable to format {amount} wei: {err}");
            return format!("{amount} wei");
        }
    };
    let (whole, fraction) = units.split_once('.').unwrap_or((units.as_str(), ""));
    let decimals = decimals.min(NATIVE_DECIMALS as usize);
    let mut s = whole.to_owned();
    if decimals > 0 {
        let fraction = fraction.get(..decimals).unwrap_or(fraction);
        s.push_str(&format!(".{fraction:0<decimals$}"));
    }
    if !symbol.is_empty() {
        s.push(' ');
        s.push_str(symbol);
    }
    s
}
