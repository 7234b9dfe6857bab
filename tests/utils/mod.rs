pub mod chain;
pub mod store;

use alloy_primitives::{address, Address, U256};
use stories::{Action, Config, TxHash};

pub const CHAIN_ID: u64 = 10143;
pub const USER: Address = address!("00000000000000000000000000000000000000aa");
pub const TODO_LIST: Address = address!("00000000000000000000000000000000000000f1");

pub fn config() -> Config {
    Config {
        staking_todo: TODO_LIST,
        ..Config::default()
    }
}

pub fn premium() -> Action { Action::subscribe_premium(&config()) }

pub fn tx_hash() -> TxHash { TxHash::repeat_byte(0x5e) }

/// 0.001 of the native currency.
pub fn milli() -> U256 { U256::from(1_000_000_000_000_000u64) }
