use std::cell::{Cell, RefCell};
use std::future::pending;
use std::rc::Rc;

use alloy_primitives::{Address, U256};
use stories::{
    Action, Chain, ChainReader, PriceQuote, ReadError, Receipt, SignError, Signer,
    SimulationError, TransactionRequest, TxHash,
};
use tokio::sync::Notify;

use super::CHAIN_ID;

#[derive(Clone, Debug)]
pub enum QuoteScript {
    Reply(Result<PriceQuote, ReadError>),
    /// Waits for the gate to be opened before replying.
    Gated(Rc<Notify>, PriceQuote),
    Hang,
}

#[derive(Copy, Clone, Debug)]
pub enum ReceiptScript {
    /// Included after the given number of "pending" answers.
    IncludedAfter(u32, bool),
    NeverIncluded,
}

/// Chain double replying from a script and counting the calls it receives.
#[derive(Debug)]
pub struct MockChain {
    pub quote: QuoteScript,
    pub simulation: Result<(), SimulationError>,
    pub receipt: ReceiptScript,
    pub balance: U256,
    pub quotes: Cell<u32>,
    pub simulations: Cell<u32>,
    pub receipts: Cell<u32>,
    pub simulated: RefCell<Vec<TransactionRequest>>,
}

impl MockChain {
    pub fn new(price: U256) -> Self {
        MockChain {
            quote: QuoteScript::Reply(Ok(PriceQuote {
                price,
                active: true,
            })),
            simulation: Ok(()),
            receipt: ReceiptScript::IncludedAfter(0, true),
            balance: U256::ZERO,
            quotes: Cell::new(0),
            simulations: Cell::new(0),
            receipts: Cell::new(0),
            simulated: RefCell::new(vec![]),
        }
    }

    pub fn with_quote(mut self, quote: QuoteScript) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_simulation(mut self, simulation: Result<(), SimulationError>) -> Self {
        self.simulation = simulation;
        self
    }

    pub fn with_receipt(mut self, receipt: ReceiptScript) -> Self {
        self.receipt = receipt;
        self
    }

    pub fn network_calls(&self) -> u32 {
        self.quotes.get() + self.simulations.get() + self.receipts.get()
    }
}

impl ChainReader for MockChain {
    async fn price_quote(&self, _action: &Action) -> Result<PriceQuote, ReadError> {
        self.quotes.set(self.quotes.get() + 1);
        match &self.quote {
            QuoteScript::Reply(reply) => reply.clone(),
            QuoteScript::Gated(gate, quote) => {
                gate.notified().await;
                Ok(*quote)
            }
            QuoteScript::Hang => pending().await,
        }
    }

    async fn balance(&self, _address: Address) -> Result<U256, ReadError> { Ok(self.balance) }
}

impl Chain for MockChain {
    async fn chain_id(&self) -> Result<u64, ReadError> { Ok(CHAIN_ID) }

    async fn simulate(&self, request: &TransactionRequest) -> Result<(), SimulationError> {
        self.simulations.set(self.simulations.get() + 1);
        self.simulated.borrow_mut().push(request.clone());
        self.simulation.clone()
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, ReadError> {
        let polls = self.receipts.get();
        self.receipts.set(polls + 1);
        match self.receipt {
            ReceiptScript::IncludedAfter(pending, success) if polls >= pending => Ok(Some(Receipt {
                tx_hash,
                block_number: 1_000,
                success,
            })),
            _ => Ok(None),
        }
    }
}

#[derive(Debug)]
pub struct MockSigner {
    pub reply: Result<TxHash, SignError>,
    pub calls: Cell<u32>,
    pub signed: RefCell<Vec<TransactionRequest>>,
}

impl MockSigner {
    pub fn new(reply: Result<TxHash, SignError>) -> Self {
        MockSigner {
            reply,
            calls: Cell::new(0),
            signed: RefCell::new(vec![]),
        }
    }
}

impl Signer for MockSigner {
    async fn sign_and_send(&self, request: &TransactionRequest) -> Result<TxHash, SignError> {
        self.calls.set(self.calls.get() + 1);
        self.signed.borrow_mut().push(request.clone());
        self.reply.clone()
    }
}
