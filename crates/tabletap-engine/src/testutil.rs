//! Shared helpers for engine tests: seeded databases and notifier fakes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use tabletap_core::{Order, OrderItem, Restaurant};
use tabletap_db::{repository, Database, DbConfig};

use crate::notifier::{ClosurePayload, NotifyError, PosNotifier};

/// Honors RUST_LOG when a test run wants engine logs; a no-op after the
/// first call.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory database with migrations applied.
pub async fn memory_db() -> Database {
    init_tracing();
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// File-backed database allowing real connection-level concurrency.
/// Returns the database and the path so tests can clean up.
pub async fn file_db() -> (Database, std::path::PathBuf) {
    init_tracing();
    let path = std::env::temp_dir().join(format!("tabletap-test-{}.db", Uuid::new_v4()));
    let db = Database::new(
        DbConfig::new(&path)
            .max_connections(8)
            .busy_timeout(std::time::Duration::from_secs(10)),
    )
    .await
    .unwrap();
    (db, path)
}

/// Removes a file-backed test database (plus WAL sidecar files).
pub fn cleanup_file_db(path: &std::path::Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let _ = std::fs::remove_file(std::path::PathBuf::from(file));
    }
}

/// Options for a seeded restaurant.
pub struct RestaurantFixture {
    pub regenerate_qr_per_session: bool,
    pub service_charge_bps: i64,
    pub pos_endpoint: Option<String>,
    pub pos_credential: Option<String>,
}

impl Default for RestaurantFixture {
    fn default() -> Self {
        RestaurantFixture {
            regenerate_qr_per_session: false,
            service_charge_bps: 0,
            pos_endpoint: None,
            pos_credential: None,
        }
    }
}

/// Inserts a restaurant row and returns its id.
pub async fn seed_restaurant(db: &Database, fixture: RestaurantFixture) -> String {
    let id = Uuid::new_v4().to_string();
    repository::restaurant::insert(
        db.pool(),
        &Restaurant {
            id: id.clone(),
            name: "Noodle Bar".to_string(),
            regenerate_qr_per_session: fixture.regenerate_qr_per_session,
            service_charge_bps: fixture.service_charge_bps,
            pos_endpoint: fixture.pos_endpoint,
            pos_credential: fixture.pos_credential,
            created_at: Utc::now(),
        },
    )
    .await
    .unwrap();
    id
}

/// Places one non-cancelled order with a single item on a session.
/// Returns the order id.
pub async fn seed_order(
    db: &Database,
    session_id: &str,
    unit_price_cents: i64,
    quantity: i64,
) -> String {
    let order_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    repository::order::insert_order(
        db.pool(),
        &Order {
            id: order_id.clone(),
            session_id: session_id.to_string(),
            cancelled: false,
            created_at: now,
        },
    )
    .await
    .unwrap();
    repository::order::insert_item(
        db.pool(),
        &OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.clone(),
            session_id: session_id.to_string(),
            name_snapshot: "Pad Thai".to_string(),
            unit_price_cents,
            quantity,
            created_at: now,
        },
    )
    .await
    .unwrap();
    order_id
}

/// Notifier fake that records payloads and succeeds or fails on command.
#[derive(Debug, Default)]
pub struct FakeNotifier {
    pub fail_with: Option<String>,
    pub calls: Mutex<Vec<(String, Option<String>, ClosurePayload)>>,
}

impl FakeNotifier {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(FakeNotifier::default())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(FakeNotifier {
            fail_with: Some(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PosNotifier for FakeNotifier {
    async fn notify(
        &self,
        endpoint: &str,
        credential: Option<&str>,
        payload: &ClosurePayload,
    ) -> Result<(), NotifyError> {
        self.calls.lock().unwrap().push((
            endpoint.to_string(),
            credential.map(str::to_string),
            payload.clone(),
        ));
        match &self.fail_with {
            Some(message) => Err(NotifyError(message.clone())),
            None => Ok(()),
        }
    }
}
