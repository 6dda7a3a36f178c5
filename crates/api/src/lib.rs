//! HTTP API server with observability for the instant-payment system.
//!
//! Provides the transfer endpoints with structured logging (tracing) and
//! Prometheus metrics, plus the default in-memory wiring of the saga,
//! fraud consumer and retry worker.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fraud::{
    FraudAnalyzer, FraudConsumer, FraudConsumerConfig, InMemoryRegulatoryChannel, RandomSignals,
};
use ledger::{InMemoryDirectory, InMemoryLedger, InMemoryTransferStore, Ledger, TransferStore};
use messaging::{
    FanOutBus, InMemoryDeadLetters, InMemoryFanOutBus, InMemoryOrderedLog, PartitionConsumer,
};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{SimulatedAuthority, TimedValidator, TransferEventPublisher, TransferOrchestrator};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use worker::{RetryWorker, RetryWorkerConfig};

pub use config::Config;
use routes::transfers::{AppState, DefaultValidator};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, T>(state: Arc<AppState<L, T>>, metrics_handle: PrometheusHandle) -> Router
where
    L: Ledger + Clone + Send + Sync + 'static,
    T: TransferStore + Clone + Send + Sync + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/transfers", post(routes::transfers::create::<L, T>))
        .route("/transfers/{id}", get(routes::transfers::get::<L, T>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// The default in-memory wiring: shared state for the router plus the
/// channels and background consumers the binary runs.
pub struct DefaultRuntime {
    pub state: Arc<AppState<InMemoryLedger, InMemoryTransferStore>>,
    pub log: InMemoryOrderedLog,
    pub bus: InMemoryFanOutBus,
    pub dead_letters: Arc<InMemoryDeadLetters>,
    pub regulatory: Arc<InMemoryRegulatoryChannel>,
    fraud_consumer: Arc<FraudConsumer<RandomSignals, InMemoryRegulatoryChannel>>,
    retry_worker: Arc<RetryWorker<DefaultValidator>>,
    partition_consumers: Vec<PartitionConsumer>,
}

impl DefaultRuntime {
    /// Spawns the fraud consumer and the retry worker tasks.
    pub fn spawn_background(&mut self) -> BackgroundTasks {
        let workers = Arc::clone(&self.retry_worker)
            .spawn(std::mem::take(&mut self.partition_consumers));
        let fraud = tokio::spawn(Arc::clone(&self.fraud_consumer).run(self.bus.subscribe()));
        BackgroundTasks { workers, fraud }
    }
}

/// Handles of the spawned background consumers.
pub struct BackgroundTasks {
    workers: Vec<JoinHandle<()>>,
    fraud: JoinHandle<()>,
}

impl BackgroundTasks {
    /// Closes the ordered log, waits for the worker partitions to drain,
    /// then stops the fraud task.
    pub async fn shutdown(self, log: &InMemoryOrderedLog) {
        log.close();
        for handle in self.workers {
            let _ = handle.await;
        }
        self.fraud.abort();
        let _ = self.fraud.await;
    }
}

/// Creates the default application state with in-memory stores, the
/// simulated settlement authority behind a bounded timeout, and the
/// background consumers.
pub fn create_default_state(config: &Config) -> DefaultRuntime {
    let ledger = InMemoryLedger::new();
    let directory = InMemoryDirectory::new();
    let transfers = InMemoryTransferStore::new();

    let (log, partition_consumers) = InMemoryOrderedLog::new(config.log_partitions);
    let bus = InMemoryFanOutBus::default();
    let dead_letters = Arc::new(InMemoryDeadLetters::new());
    let regulatory = Arc::new(InMemoryRegulatoryChannel::new());

    let publisher =
        TransferEventPublisher::new(Arc::new(log.clone()), Arc::new(bus.clone()));
    let validator = TimedValidator::new(SimulatedAuthority::new(), config.settlement_timeout);
    let orchestrator = TransferOrchestrator::new(
        ledger.clone(),
        directory.clone(),
        validator.clone(),
        transfers.clone(),
        publisher,
    );

    let fraud_consumer = Arc::new(FraudConsumer::new(
        FraudAnalyzer::new(RandomSignals::new()),
        Arc::clone(&regulatory),
        FraudConsumerConfig {
            concurrency: config.fraud_workers,
            ..FraudConsumerConfig::default()
        },
    ));

    let retry_worker = Arc::new(RetryWorker::new(
        validator,
        Arc::new(log.clone()),
        Arc::clone(&dead_letters) as Arc<dyn messaging::DeadLetterChannel>,
        RetryWorkerConfig {
            max_retries: config.worker_max_retries,
        },
    ));

    let state = Arc::new(AppState {
        orchestrator,
        ledger,
        directory,
        transfers,
    });

    DefaultRuntime {
        state,
        log,
        bus,
        dead_letters,
        regulatory,
        fraud_consumer,
        retry_worker,
        partition_consumers,
    }
}

/// Seeds a pair of demo accounts with registered payment keys. Returns
/// `(origin, destination)` so callers can log or assert on the IDs.
pub async fn seed_demo_accounts(
    ledger: &InMemoryLedger,
    directory: &InMemoryDirectory,
) -> (ledger::Account, ledger::Account) {
    use domain::{Money, PixKey};

    let ana = ledger::Account::open(
        common::UserId::new(),
        "Ana Souza",
        "52998224725",
        "NovaBank",
        Money::from_reais(10_000),
    );
    directory
        .register(
            PixKey::new("ana@example.com"),
            ana.user_id,
            "Ana Souza",
            "52998224725",
        )
        .await;
    ledger.open_account(ana.clone()).await;

    let rui = ledger::Account::open(
        common::UserId::new(),
        "Rui Costa",
        "16899535009",
        "NovaBank",
        Money::from_reais(500),
    );
    directory
        .register(
            PixKey::new("rui@example.com"),
            rui.user_id,
            "Rui Costa",
            "16899535009",
        )
        .await;
    ledger.open_account(rui.clone()).await;

    (ana, rui)
}
