//! End-to-end saga scenarios against the simulated settlement authority.

use std::sync::Arc;
use std::time::Duration;

use common::UserId;
use domain::{Money, PixKey, SettlementCode, TransferStatus};
use ledger::{Account, InMemoryDirectory, InMemoryLedger, InMemoryTransferStore};
use messaging::{FanOutBus, InMemoryFanOutBus, InMemoryOrderedLog, PartitionConsumer};
use saga::{
    SimulatedAuthority, TimedValidator, TransferError, TransferEventPublisher,
    TransferOrchestrator,
};

struct World {
    ledger: InMemoryLedger,
    directory: InMemoryDirectory,
    transfers: InMemoryTransferStore,
    log: InMemoryOrderedLog,
    consumers: Vec<PartitionConsumer>,
    bus: InMemoryFanOutBus,
    orchestrator: TransferOrchestrator<
        InMemoryLedger,
        InMemoryDirectory,
        TimedValidator<SimulatedAuthority>,
        InMemoryTransferStore,
    >,
}

impl World {
    fn new(timeout: Duration) -> Self {
        let ledger = InMemoryLedger::new();
        let directory = InMemoryDirectory::new();
        let transfers = InMemoryTransferStore::new();
        let (log, consumers) = InMemoryOrderedLog::new(2);
        let bus = InMemoryFanOutBus::new(32);

        let publisher =
            TransferEventPublisher::new(Arc::new(log.clone()), Arc::new(bus.clone()));
        let validator = TimedValidator::new(SimulatedAuthority::new(), timeout);
        let orchestrator = TransferOrchestrator::new(
            ledger.clone(),
            directory.clone(),
            validator,
            transfers.clone(),
            publisher,
        );

        Self {
            ledger,
            directory,
            transfers,
            log,
            consumers,
            bus,
            orchestrator,
        }
    }

    async fn open_account(&self, name: &str, document: &str, key: &str, balance: Money) -> Account {
        let account = Account::open(UserId::new(), name, document, "NovaBank", balance);
        self.directory
            .register(PixKey::new(key), account.user_id, name, document)
            .await;
        self.ledger.open_account(account.clone()).await;
        account
    }
}

#[tokio::test]
async fn completed_transfers_conserve_total_balance() {
    let world = World::new(Duration::from_secs(1));
    let ana = world
        .open_account("Ana Souza", "52998224725", "ana@example.com", Money::from_reais(2_000))
        .await;
    let rui = world
        .open_account("Rui Costa", "16899535009", "rui@example.com", Money::from_reais(2_000))
        .await;
    let total_before = world.ledger.total_balance().await;

    for (from, to_key, amount) in [
        (ana.id, "rui@example.com", Money::from_reais(300)),
        (rui.id, "ana@example.com", Money::from_reais(120)),
        (ana.id, "rui@example.com", Money::from_cents(4_999)),
    ] {
        world
            .orchestrator
            .execute_transfer(from, PixKey::new(to_key), amount)
            .await
            .unwrap();
    }

    assert_eq!(world.ledger.total_balance().await, total_before);
    assert!(world.ledger.balance(ana.id).await.unwrap().cents() >= 0);
    assert!(world.ledger.balance(rui.id).await.unwrap().cents() >= 0);
}

#[tokio::test]
async fn amount_at_the_authority_limit_is_rejected_with_balances_unchanged() {
    let world = World::new(Duration::from_secs(1));
    let ana = world
        .open_account(
            "Ana Souza",
            "52998224725",
            "ana@example.com",
            Money::from_reais(500_000),
        )
        .await;
    let rui = world
        .open_account("Rui Costa", "16899535009", "rui@example.com", Money::zero())
        .await;

    let result = world
        .orchestrator
        .execute_transfer(
            ana.id,
            PixKey::new("rui@example.com"),
            Money::from_reais(100_000),
        )
        .await;

    let Err(TransferError::ExternalRejected { code, .. }) = result else {
        panic!("expected ExternalRejected, got {result:?}");
    };
    assert_eq!(code, SettlementCode::LimitExceeded);

    assert_eq!(
        world.ledger.balance(ana.id).await.unwrap(),
        Money::from_reais(500_000)
    );
    assert_eq!(world.ledger.balance(rui.id).await.unwrap(), Money::zero());

    // The rejection is on the audit trail in terminal state
    let persisted = world.transfers.all().await;
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].status, TransferStatus::RejectedExternal);
    assert!(persisted[0].completed_at.is_some());
}

#[tokio::test]
async fn authority_stall_surfaces_as_timeout_code() {
    let world = World::new(Duration::from_millis(50));
    let ana = world
        .open_account("Ana Souza", "52998224725", "ana@example.com", Money::from_reais(5_000))
        .await;
    world
        .open_account("Rui Costa", "16899535009", "rui@example.com", Money::zero())
        .await;

    // R$ 100.00 makes the simulated authority stall past the deadline
    let result = world
        .orchestrator
        .execute_transfer(ana.id, PixKey::new("rui@example.com"), Money::from_reais(100))
        .await;

    let Err(TransferError::ExternalRejected { code, .. }) = result else {
        panic!("expected ExternalRejected, got {result:?}");
    };
    assert_eq!(code, SettlementCode::Timeout);
    assert!(code.is_retryable());

    assert_eq!(
        world.ledger.balance(ana.id).await.unwrap(),
        Money::from_reais(5_000)
    );
}

#[tokio::test]
async fn insufficient_funds_writes_no_ledger_row_and_no_event() {
    let world = World::new(Duration::from_secs(1));
    let ana = world
        .open_account("Ana Souza", "52998224725", "ana@example.com", Money::from_cents(50_000))
        .await;
    let rui = world
        .open_account("Rui Costa", "16899535009", "rui@example.com", Money::zero())
        .await;
    let mut audit = world.bus.subscribe();

    let result = world
        .orchestrator
        .execute_transfer(
            ana.id,
            PixKey::new("rui@example.com"),
            Money::from_cents(100_000),
        )
        .await;

    assert!(matches!(
        result,
        Err(TransferError::InsufficientFunds { .. })
    ));
    assert_eq!(
        world.ledger.balance(ana.id).await.unwrap(),
        Money::from_cents(50_000)
    );
    assert_eq!(world.ledger.balance(rui.id).await.unwrap(), Money::zero());
    assert_eq!(world.log.depth(), 0);
    assert!(matches!(
        audit.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn unresolved_destination_fails_before_any_origin_write() {
    let world = World::new(Duration::from_secs(1));
    let ana = world
        .open_account("Ana Souza", "52998224725", "ana@example.com", Money::from_reais(100))
        .await;

    let result = world
        .orchestrator
        .execute_transfer(
            ana.id,
            PixKey::new("stranger@example.com"),
            Money::from_reais(10),
        )
        .await;

    assert!(matches!(
        result,
        Err(TransferError::DestinationNotFound(_))
    ));
    assert_eq!(
        world.ledger.balance(ana.id).await.unwrap(),
        Money::from_reais(100)
    );
    assert!(world.transfers.is_empty().await);
}

#[tokio::test]
async fn completed_event_reaches_both_channels_with_one_correlation_id() {
    let world = World::new(Duration::from_secs(1));
    let ana = world
        .open_account("Ana Souza", "52998224725", "ana@example.com", Money::from_reais(1_000))
        .await;
    world
        .open_account("Rui Costa", "16899535009", "rui@example.com", Money::zero())
        .await;
    let mut fanout = world.bus.subscribe();

    let transfer = world
        .orchestrator
        .execute_transfer(ana.id, PixKey::new("rui@example.com"), Money::from_reais(75))
        .await
        .unwrap();

    // Only one partition holds the single event; probe both briefly
    let mut from_log = None;
    for consumer in &world.consumers {
        if let Ok(delivery) =
            tokio::time::timeout(Duration::from_millis(100), consumer.recv()).await
        {
            from_log = delivery.map(|d| d.event);
            consumer.ack();
            break;
        }
    }
    let from_log = from_log.expect("event missing from the ordered log");
    let from_bus = fanout.recv().await.unwrap();

    assert_eq!(from_log.transaction_id, transfer.id);
    assert_eq!(from_bus.transaction_id, transfer.id);
    assert_eq!(from_log.correlation_id, from_bus.correlation_id);
    assert_eq!(from_log.status, TransferStatus::Completed);
    assert_eq!(from_log.sender_document.as_deref(), Some("***.***.***-25"));
}
