//! Single writer for every state-mutating call of the operator account.
//!
//! The queue task owns the operator [`Nonce`] and submits requests strictly in
//! arrival order, waiting for each confirmation before taking the next request.
//! Call sites only ever see a [`SubmissionHandle`] and cannot touch the nonce.

use sp_core::H160;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::chain::{ContractCall, Nonce, TxReceipt, TxSettings};
use crate::repositories::traits::{ChainReader, ChainWriter};
use crate::utils::errors::{ChainError, ReconcilerError, Result};

const QUEUE_CAPACITY: usize = 32;

struct SubmissionRequest {
    call: ContractCall,
    respond_to: oneshot::Sender<std::result::Result<TxReceipt, ChainError>>,
}

#[derive(Clone)]
pub struct SubmissionHandle {
    requests: mpsc::Sender<SubmissionRequest>,
}

impl SubmissionHandle {
    /// Enqueue a call and wait for its confirmation (or failure).
    pub async fn submit(&self, call: ContractCall) -> Result<TxReceipt> {
        let (respond_to, response) = oneshot::channel();
        self.requests
            .send(SubmissionRequest { call, respond_to })
            .await
            .map_err(|_| ReconcilerError::QueueClosed)?;

        let outcome = response.await.map_err(|_| ReconcilerError::QueueClosed)?;
        Ok(outcome?)
    }
}

pub struct SubmissionQueue {
    writer: Arc<dyn ChainWriter>,
    reader: Arc<dyn ChainReader>,
    operator: H160,
    settings: TxSettings,
}

impl SubmissionQueue {
    pub fn new(
        writer: Arc<dyn ChainWriter>,
        reader: Arc<dyn ChainReader>,
        operator: H160,
        settings: TxSettings,
    ) -> Self {
        Self {
            writer,
            reader,
            operator,
            settings,
        }
    }

    /// Seed the nonce from the operator's transaction count and start the queue.
    pub async fn start(self) -> Result<(SubmissionHandle, JoinHandle<Nonce>)> {
        let count = self
            .reader
            .transaction_count(self.operator)
            .await
            .map_err(ReconcilerError::chain_read)?;
        Ok(self.spawn(Nonce::from_transaction_count(count)))
    }

    /// The join handle resolves to the next unused nonce once every handle is dropped.
    pub fn spawn(self, nonce: Nonce) -> (SubmissionHandle, JoinHandle<Nonce>) {
        let (requests, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let worker = tokio::spawn(self.drain(receiver, nonce));

        (SubmissionHandle { requests }, worker)
    }

    async fn drain(self, mut receiver: mpsc::Receiver<SubmissionRequest>, mut nonce: Nonce) -> Nonce {
        info!(operator = ?self.operator, nonce = nonce.value(), "submission queue started");

        while let Some(request) = receiver.recv().await {
            let (next, outcome) = self.submit_one(&request.call, nonce).await;
            nonce = match &outcome {
                Err(e) if !e.consumes_nonce() => self.resync(next).await,
                _ => next,
            };

            // The caller may have given up waiting; the nonce bookkeeping above still holds.
            let _ = request.respond_to.send(outcome);
        }

        info!(nonce = nonce.value(), "submission queue drained");
        nonce
    }

    /// Spends `nonce` on one call and hands back the nonce for the next one.
    async fn submit_one(
        &self,
        call: &ContractCall,
        nonce: Nonce,
    ) -> (Nonce, std::result::Result<TxReceipt, ChainError>) {
        debug!(call = call.name(), target = ?call.target(), nonce = nonce.value(), "submitting");

        let outcome = self.writer.submit(call, nonce.value(), &self.settings).await;
        let next = match &outcome {
            Ok(receipt) => {
                info!(
                    call = call.name(),
                    target = ?call.target(),
                    tx_hash = ?receipt.tx_hash,
                    block = receipt.block_number,
                    "confirmed"
                );
                nonce.advance()
            }
            Err(e) if e.consumes_nonce() => {
                warn!(call = call.name(), target = ?call.target(), error = %e, "reverted");
                nonce.advance()
            }
            Err(e) => {
                warn!(call = call.name(), target = ?call.target(), error = %e, "not confirmed");
                nonce
            }
        };

        (next, outcome)
    }

    /// After a transport failure the transaction may or may not have landed, and a
    /// rejection may mean the account was used elsewhere; trust the chain's count if
    /// it is ahead of ours.
    async fn resync(&self, nonce: Nonce) -> Nonce {
        match self.reader.transaction_count(self.operator).await {
            Ok(count) if count > nonce.value() => {
                warn!(local = nonce.value(), chain = count, "nonce resynchronised from chain");
                Nonce::from_transaction_count(count)
            }
            Ok(_) => nonce,
            Err(e) => {
                warn!(error = %e, "could not read transaction count, keeping local nonce");
                nonce
            }
        }
    }
}
