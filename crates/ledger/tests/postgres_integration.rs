//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p ledger --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{AccountId, UserId};
use domain::{Money, PixKey, Transfer};
use ledger::{
    Account, KeyDirectory, Ledger, LedgerError, PostgresDirectory, PostgresLedger,
    PostgresTransferStore, TransferStore, Version, insert_account, insert_payment_key,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_ledger_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh pool with cleared tables
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE accounts, payment_keys, transfers")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

fn test_account(balance: Money) -> Account {
    Account::open(
        UserId::new(),
        "Ana Souza",
        "52998224725",
        "NovaBank",
        balance,
    )
}

#[tokio::test]
#[serial]
async fn account_roundtrip() {
    let pool = get_test_pool().await;
    let store = PostgresLedger::new(pool.clone());

    let account = test_account(Money::from_reais(100));
    insert_account(&pool, &account).await.unwrap();

    let loaded = store.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(loaded, account);

    let by_user = store
        .get_account_for_user(account.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_user.id, account.id);
}

#[tokio::test]
#[serial]
async fn apply_delta_compare_and_set() {
    let pool = get_test_pool().await;
    let store = PostgresLedger::new(pool.clone());

    let account = test_account(Money::from_reais(100));
    insert_account(&pool, &account).await.unwrap();

    let updated = store
        .apply_delta(account.id, Money::from_reais(-30), account.version)
        .await
        .unwrap();
    assert_eq!(updated.balance, Money::from_reais(70));
    assert_eq!(updated.version, Version::new(2));

    // Same expected version again: conflict, balance untouched
    let conflict = store
        .apply_delta(account.id, Money::from_reais(-30), account.version)
        .await;
    assert!(matches!(conflict, Err(LedgerError::VersionConflict { .. })));

    let current = store.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(current.balance, Money::from_reais(70));
}

#[tokio::test]
#[serial]
async fn apply_delta_rejects_overdraft() {
    let pool = get_test_pool().await;
    let store = PostgresLedger::new(pool.clone());

    let account = test_account(Money::from_reais(50));
    insert_account(&pool, &account).await.unwrap();

    let result = store
        .apply_delta(account.id, Money::from_reais(-80), account.version)
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::InsufficientBalance { .. })
    ));
}

#[tokio::test]
#[serial]
async fn apply_delta_unknown_account() {
    let pool = get_test_pool().await;
    let store = PostgresLedger::new(pool);

    let result = store
        .apply_delta(AccountId::new(), Money::from_reais(-1), Version::first())
        .await;
    assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
}

#[tokio::test]
#[serial]
async fn directory_resolution() {
    let pool = get_test_pool().await;
    let directory = PostgresDirectory::new(pool.clone());

    let user_id = UserId::new();
    insert_payment_key(&pool, "rui@example.com", user_id, "Rui Costa", "16899535009")
        .await
        .unwrap();

    let entry = directory
        .resolve(&PixKey::new("rui@example.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.user_id, user_id);
    assert_eq!(entry.name, "Rui Costa");

    let missing = directory
        .resolve(&PixKey::new("missing@example.com"))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[serial]
async fn transfer_store_is_append_only() {
    let pool = get_test_pool().await;
    let store = PostgresTransferStore::new(pool);

    let mut transfer = Transfer::initiate(
        AccountId::new(),
        PixKey::new("rui@example.com"),
        Money::from_reais(42),
    );
    transfer.reject_external();

    store.insert(&transfer).await.unwrap();

    let loaded = store.get(transfer.id).await.unwrap().unwrap();
    assert_eq!(loaded, transfer);

    let duplicate = store.insert(&transfer).await;
    assert!(matches!(
        duplicate,
        Err(LedgerError::DuplicateTransfer(_))
    ));
}
