//! Saga coordinator for a single transfer request.

use std::time::Instant;

use common::AccountId;
use domain::{Money, PixKey, SettlementCode, Transfer, TransferDetails, TransferEvent};
use ledger::{KeyDirectory, Ledger, LedgerError, TransferStore};

use crate::error::TransferError;
use crate::publisher::TransferEventPublisher;
use crate::services::settlement::{SettlementDecision, SettlementValidator};

/// Bounded retries of the compare-and-set ledger write before giving up.
const DEFAULT_CAS_ATTEMPTS: u32 = 3;

/// Orchestrates the execution of transfer sagas.
///
/// Each invocation runs one transfer synchronously from the caller's
/// perspective: fail-fast validation, the debit/credit pair against the
/// versioned ledger, exactly-once terminal persistence, then a
/// non-blocking hand-off to the event publisher. The orchestrator holds no
/// global lock; per-account correctness comes from the ledger's
/// compare-and-set protocol.
pub struct TransferOrchestrator<L, D, V, T>
where
    L: Ledger + Clone + Send + Sync + 'static,
    D: KeyDirectory,
    V: SettlementValidator,
    T: TransferStore + Clone + Send + Sync + 'static,
{
    ledger: L,
    directory: D,
    validator: V,
    transfers: T,
    publisher: TransferEventPublisher,
    cas_attempts: u32,
}

impl<L, D, V, T> TransferOrchestrator<L, D, V, T>
where
    L: Ledger + Clone + Send + Sync + 'static,
    D: KeyDirectory,
    V: SettlementValidator,
    T: TransferStore + Clone + Send + Sync + 'static,
{
    /// Creates a new orchestrator over the given services.
    pub fn new(
        ledger: L,
        directory: D,
        validator: V,
        transfers: T,
        publisher: TransferEventPublisher,
    ) -> Self {
        Self {
            ledger,
            directory,
            validator,
            transfers,
            publisher,
            cas_attempts: DEFAULT_CAS_ATTEMPTS,
        }
    }

    /// Overrides the bounded compare-and-set retry count.
    pub fn with_cas_attempts(mut self, attempts: u32) -> Self {
        self.cas_attempts = attempts.max(1);
        self
    }

    /// Executes a transfer saga.
    ///
    /// On success exactly one debit and one credit were applied and the
    /// `Completed` record persisted. On any failure before the debit, zero
    /// balance mutations happened. Publish failures never surface here.
    #[tracing::instrument(skip(self, destination_key), fields(%origin_account, amount = %amount))]
    pub async fn execute_transfer(
        &self,
        origin_account: AccountId,
        destination_key: PixKey,
        amount: Money,
    ) -> Result<Transfer, TransferError> {
        metrics::counter!("transfer_executions_total").increment(1);
        let saga_start = Instant::now();

        if !amount.is_positive() {
            return Err(TransferError::InvalidAmount(amount));
        }

        // 1. Origin account
        let origin = self
            .ledger
            .get_account(origin_account)
            .await?
            .ok_or(TransferError::OriginNotFound(origin_account))?;

        // 2. Destination key -> registered user -> account
        let entry = self
            .directory
            .resolve(&destination_key)
            .await?
            .ok_or_else(|| TransferError::DestinationNotFound(destination_key.clone()))?;
        let destination = self
            .ledger
            .get_account_for_user(entry.user_id)
            .await?
            .ok_or_else(|| TransferError::DestinationNotFound(destination_key.clone()))?;

        let mut transfer = Transfer::initiate(origin_account, destination_key.clone(), amount);
        transfer.resolve_destination(destination.id);
        transfer.begin_validation();
        tracing::info!(
            transaction_id = %transfer.id,
            destination_key = %destination_key.masked(),
            "transfer accepted, validating with settlement authority"
        );

        // 3. Settlement validation. A transport failure maps to a
        // non-approved decision so it reaches the same terminal path.
        let decision = match self
            .validator
            .validate(&destination_key, amount, &origin.document)
            .await
        {
            Ok(decision) => decision,
            Err(error) => {
                SettlementDecision::rejected(SettlementCode::Unavailable, error.to_string())
            }
        };

        if !decision.approved {
            transfer.reject_external();
            persist_terminal(&self.transfers, &transfer, false).await?;
            metrics::counter!("transfers_rejected_external", "code" => decision.code.as_str())
                .increment(1);
            tracing::warn!(
                transaction_id = %transfer.id,
                code = %decision.code,
                "settlement authority rejected transfer"
            );
            return Err(TransferError::ExternalRejected {
                code: decision.code,
                message: decision.message,
            });
        }

        // 4-7. The financial section runs on its own task: once funds can
        // move, the saga completes even if the caller stops polling.
        let details = TransferDetails {
            sender_name: origin.owner_name.clone(),
            sender_document: origin.masked_document(),
            receiver_name: entry.name.clone(),
            receiver_bank: destination.bank.clone(),
            masked_key: destination_key.masked(),
        };
        let section = FinancialSection {
            ledger: self.ledger.clone(),
            transfers: self.transfers.clone(),
            publisher: self.publisher.clone(),
            cas_attempts: self.cas_attempts,
        };
        let destination_id = destination.id;
        let result =
            tokio::spawn(async move { section.settle(transfer, destination_id, details).await })
                .await
                .map_err(|join| {
                    TransferError::Internal(format!("financial section aborted: {join}"))
                })?;

        match &result {
            Ok(transfer) => {
                metrics::counter!("transfers_completed").increment(1);
                metrics::histogram!("transfer_duration_seconds")
                    .record(saga_start.elapsed().as_secs_f64());
                tracing::info!(transaction_id = %transfer.id, "transfer completed");
            }
            Err(error) => {
                metrics::counter!("transfers_failed", "code" => error.code()).increment(1);
            }
        }
        result
    }

    /// Loads a persisted transfer.
    pub async fn get_transfer(
        &self,
        id: common::TransactionId,
    ) -> Result<Option<Transfer>, TransferError> {
        Ok(self.transfers.get(id).await?)
    }
}

/// The part of the saga with financial effect. Runs to completion on its
/// own task regardless of caller cancellation.
struct FinancialSection<L, T> {
    ledger: L,
    transfers: T,
    publisher: TransferEventPublisher,
    cas_attempts: u32,
}

impl<L: Ledger, T: TransferStore> FinancialSection<L, T> {
    async fn settle(
        self,
        mut transfer: Transfer,
        destination: AccountId,
        details: TransferDetails,
    ) -> Result<Transfer, TransferError> {
        let amount = transfer.amount;
        let origin = transfer.origin_account;

        // 4+5. Balance check and debit share one compare-and-set loop: a
        // conflicting writer forces a fresh read, so the check can never
        // pass against a stale balance.
        let mut attempt = 0;
        loop {
            let current = self
                .ledger
                .get_account(origin)
                .await?
                .ok_or(TransferError::OriginNotFound(origin))?;

            if current.balance < amount {
                transfer.insufficient_funds();
                persist_terminal(&self.transfers, &transfer, false).await?;
                tracing::warn!(
                    transaction_id = %transfer.id,
                    available = %current.balance,
                    requested = %amount,
                    "insufficient funds"
                );
                return Err(TransferError::InsufficientFunds {
                    available: current.balance,
                    requested: amount,
                });
            }

            match self
                .ledger
                .apply_delta(origin, -amount, current.version)
                .await
            {
                Ok(_) => break,
                Err(LedgerError::VersionConflict { .. }) if attempt + 1 < self.cas_attempts => {
                    attempt += 1;
                    metrics::counter!("ledger_cas_conflicts_total").increment(1);
                }
                Err(LedgerError::InsufficientBalance { balance, .. }) => {
                    // Lost the race to a concurrent debit after the check.
                    transfer.insufficient_funds();
                    persist_terminal(&self.transfers, &transfer, false).await?;
                    return Err(TransferError::InsufficientFunds {
                        available: balance,
                        requested: amount,
                    });
                }
                Err(error) => return Err(error.into()),
            }
        }

        // 5b. Credit the destination. The pair must act as one logical
        // unit: a failed credit triggers a compensating reversal of the
        // debit, and only an unreversed failure leaves the record flagged
        // for operator compensation.
        if let Err(reason) = self.credit(destination, amount).await {
            let compensated = self.credit(origin, amount).await.is_ok();
            transfer.fail(!compensated);
            let persisted = persist_terminal(&self.transfers, &transfer, !compensated).await;
            self.publisher
                .publish(&TransferEvent::from_transfer(&transfer))
                .await;
            if compensated {
                tracing::warn!(
                    transaction_id = %transfer.id,
                    "credit failed, debit reversed"
                );
            } else {
                tracing::error!(
                    transaction_id = %transfer.id,
                    "credit failed and debit could not be reversed; compensation required"
                );
            }
            persisted?;
            return Err(TransferError::CreditFailed {
                transfer_id: transfer.id,
                compensated,
                reason,
            });
        }

        // 6. Persist the terminal record. A failure here happens after the
        // financial effect and is reported as such.
        transfer.complete(details);
        persist_terminal(&self.transfers, &transfer, true).await?;

        // 7. Non-blocking hand-off to the delivery channels.
        self.publisher
            .publish(&TransferEvent::from_transfer(&transfer))
            .await;

        Ok(transfer)
    }

    /// Credits `amount` into `account`, retrying version conflicts.
    async fn credit(&self, account: AccountId, amount: Money) -> Result<(), String> {
        let mut attempt = 0;
        loop {
            let current = match self.ledger.get_account(account).await {
                Ok(Some(account)) => account,
                Ok(None) => return Err(format!("account {account} no longer exists")),
                Err(error) => return Err(error.to_string()),
            };
            match self
                .ledger
                .apply_delta(account, amount, current.version)
                .await
            {
                Ok(_) => return Ok(()),
                Err(LedgerError::VersionConflict { .. }) if attempt + 1 < self.cas_attempts => {
                    attempt += 1;
                }
                Err(error) => return Err(error.to_string()),
            }
        }
    }
}

async fn persist_terminal<T: TransferStore>(
    transfers: &T,
    transfer: &Transfer,
    after_effect: bool,
) -> Result<(), TransferError> {
    transfers
        .insert(transfer)
        .await
        .map_err(|error| TransferError::Persistence {
            transfer_id: transfer.id,
            after_effect,
            reason: error.to_string(),
        })
}
