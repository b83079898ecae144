//! Scripted chain gateway for unit tests.
//!
//! Responses are queued per function selector, so tests don't depend on the
//! exact order a flow issues its reads. Submitted transactions are recorded
//! with their calldata for decoding and assertion.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use chrono::Utc;

use crate::error::MarketError;
use crate::gateway::ChainGateway;
use crate::types::{PendingTx, Settlement};

#[derive(Debug, Clone)]
pub(crate) struct SubmittedTx {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

pub(crate) struct FakeGateway {
    signer: Option<Address>,
    reads: Mutex<HashMap<[u8; 4], VecDeque<Vec<u8>>>>,
    read_log: Mutex<Vec<[u8; 4]>>,
    submitted: Mutex<Vec<SubmittedTx>>,
    settlements: Mutex<VecDeque<Result<(), MarketError>>>,
}

impl FakeGateway {
    pub fn new(signer: Option<Address>) -> Self {
        Self {
            signer,
            reads: Mutex::new(HashMap::new()),
            read_log: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            settlements: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue one encoded response for calls matching `C`'s selector
    pub fn script_read<C: SolCall>(&self, ret: &C::Return) {
        self.reads
            .lock()
            .unwrap()
            .entry(C::SELECTOR)
            .or_default()
            .push_back(C::abi_encode_returns(ret));
    }

    /// Queue the outcome of the next settlement wait (default: success)
    pub fn script_settlement(&self, outcome: Result<(), MarketError>) {
        self.settlements.lock().unwrap().push_back(outcome);
    }

    /// Total read calls issued so far
    pub fn read_count(&self) -> usize {
        self.read_log.lock().unwrap().len()
    }

    /// Snapshot of every submitted transaction, in order
    pub fn submitted(&self) -> Vec<SubmittedTx> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainGateway for FakeGateway {
    async fn call(&self, _to: Address, data: Bytes) -> Result<Bytes, MarketError> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .unwrap_or_default();
        self.read_log.lock().unwrap().push(selector);

        match self
            .reads
            .lock()
            .unwrap()
            .get_mut(&selector)
            .and_then(|queue| queue.pop_front())
        {
            Some(bytes) => Ok(Bytes::from(bytes)),
            None => Err(MarketError::ContractRead(format!(
                "no scripted response for selector 0x{}",
                alloy::primitives::hex::encode(selector)
            ))),
        }
    }

    async fn submit(&self, to: Address, data: Bytes, value: U256) -> Result<PendingTx, MarketError> {
        if self.signer.is_none() {
            return Err(MarketError::WalletUnavailable);
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(SubmittedTx { to, data, value });
        Ok(PendingTx {
            hash: B256::with_last_byte(submitted.len() as u8),
            submitted_at: Utc::now(),
        })
    }

    async fn await_settlement(&self, pending: PendingTx) -> Result<Settlement, MarketError> {
        match self.settlements.lock().unwrap().pop_front() {
            Some(Err(e)) => Err(e),
            _ => Ok(Settlement {
                tx_hash: pending.hash,
                block_number: Some(1),
            }),
        }
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}
