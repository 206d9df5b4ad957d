//! # Closure Transaction Coordinator
//!
//! Ends a session with a bill: recompute totals, persist payment and audit
//! state, free the resource - all in one transaction - then fire the POS
//! notification as a decoupled, failure-isolated side effect.
//!
//! ## Closure Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        close_bill(request)                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              BEGIN IMMEDIATE (serialized writer)                │   │
//! │  │                                                                 │   │
//! │  │  1. Session belongs to restaurant + is Active                  │   │
//! │  │  2. Recompute subtotal from current non-cancelled items        │   │
//! │  │     (service charge at the fresh rate, for the audit row)      │   │
//! │  │  3. total = subtotal − flat discount                           │   │
//! │  │  4. Generate unique pos_reference                              │   │
//! │  │  5. UPDATE session: ended_at, payment fields, reference        │   │
//! │  │  6. INSERT bill_closures audit row                             │   │
//! │  │  7. available := true when the table empties                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │ COMMIT ← any failure above rolls back everything;              │
//! │       │          partial closure is never observable                   │
//! │       ▼                                                                 │
//! │  8. send_to_pos? POST payload, record outcome in the result and        │
//! │     (best-effort) on the audit row. Never reverses the closure.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tabletap_core::billing::{build_lines, compute_totals, settlement_total};
use tabletap_core::{validation, BillClosure, Money, PaymentMethod};
use tabletap_db::repository::session::CloseSessionParams;
use tabletap_db::{repository, Database};

use crate::error::{EngineError, EngineResult};
use crate::notifier::{ClosurePayload, PayloadItem, PosNotifier};

// =============================================================================
// Request / Result
// =============================================================================

/// Input for a billed closure.
#[derive(Debug, Clone)]
pub struct CloseBillRequest {
    pub session_id: String,
    /// Tenant check: the session must belong to this restaurant.
    pub restaurant_id: String,
    pub payment_method: PaymentMethod,
    /// What the party actually handed over.
    pub amount_paid_cents: i64,
    /// Flat discount decided by staff; no coupon logic here.
    pub discount_cents: i64,
    pub notes: Option<String>,
    pub closed_by_staff_id: String,
    /// Whether to notify the restaurant's POS system after commit.
    pub send_to_pos: bool,
}

/// Outcome of a committed closure.
///
/// `webhook_sent` / `webhook_error` describe the post-commit notification;
/// the closure itself is durable regardless of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosureResult {
    pub session_id: String,
    pub closure_id: String,
    pub pos_reference: String,
    pub subtotal_cents: i64,
    pub service_charge_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub closed_at: DateTime<Utc>,
    pub webhook_sent: bool,
    pub webhook_error: Option<String>,
}

// =============================================================================
// Coordinator
// =============================================================================

/// Wraps session closure, payment persistence, audit-record creation and
/// resource release in one atomic unit, then triggers the POS notification
/// as a decoupled side effect.
#[derive(Clone)]
pub struct ClosureCoordinator {
    db: Database,
    notifier: Arc<dyn PosNotifier>,
}

impl ClosureCoordinator {
    /// Creates a new ClosureCoordinator.
    pub fn new(db: Database, notifier: Arc<dyn PosNotifier>) -> Self {
        ClosureCoordinator { db, notifier }
    }

    /// Closes a session's bill.
    ///
    /// ## Errors
    /// - `InvalidInput` - negative amounts, oversize notes
    /// - `NotFound` - unknown session, or one owned by another restaurant
    /// - `AlreadyClosed` - the session was already terminated
    /// - `Busy` - write lock contention past the busy timeout; retry is safe
    ///
    /// POS notification failure is NOT an error: it is reported in the
    /// successful result.
    pub async fn close_bill(&self, req: CloseBillRequest) -> EngineResult<ClosureResult> {
        validation::validate_amount_cents("amount_paid", req.amount_paid_cents)?;
        validation::validate_amount_cents("discount", req.discount_cents)?;
        validation::validate_notes(req.notes.as_deref())?;

        let mut tx = self.db.begin_immediate().await?;

        let session = repository::session::get(&mut *tx, &req.session_id)
            .await?
            // Cross-tenant mismatch reads as absence so session ids don't
            // leak across restaurants.
            .filter(|s| s.restaurant_id == req.restaurant_id)
            .ok_or_else(|| EngineError::not_found("TableSession", req.session_id.as_str()))?;
        if !session.is_active() {
            return Err(EngineError::AlreadyClosed {
                session_id: req.session_id.clone(),
            });
        }

        let restaurant =
            repository::restaurant::get_required(&mut *tx, &req.restaurant_id).await?;

        // Recompute from the items as of closure - not from any earlier
        // preview. Settlement is subtotal − discount; the service charge at
        // the fresh rate goes on the audit row.
        let items = repository::order::active_items(&mut *tx, &session.id).await?;
        let totals = compute_totals(&items, restaurant.service_charge_rate());
        let total = settlement_total(&totals, Money::from_cents(req.discount_cents));

        let now = Utc::now();
        let pos_reference = generate_pos_reference(&session.id, now);

        repository::session::close(
            &mut *tx,
            &session.id,
            &CloseSessionParams {
                payment_method: req.payment_method,
                amount_paid_cents: req.amount_paid_cents,
                discount_cents: req.discount_cents,
                notes: req.notes.as_deref(),
                closed_by_staff_id: &req.closed_by_staff_id,
                pos_reference: &pos_reference,
                ended_at: now,
            },
        )
        .await?;

        let closure = BillClosure {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            closed_at: now,
            subtotal_cents: totals.subtotal_cents,
            service_charge_cents: totals.service_charge_cents,
            discount_cents: req.discount_cents,
            total_cents: total.cents(),
            payment_method: req.payment_method,
            webhook_sent: false,
            webhook_error: None,
            created_at: now,
        };
        repository::closure::insert(&mut *tx, &closure).await?;

        let remaining = repository::session::count_active(&mut *tx, &session.table_id).await?;
        if remaining == 0 {
            repository::table::set_available(&mut *tx, &session.table_id, true, now).await?;
        }

        tx.commit().await.map_err(tabletap_db::DbError::from)?;

        info!(
            session_id = %session.id,
            reference = %pos_reference,
            total = total.cents(),
            "Bill closed"
        );

        // ---------------------------------------------------------------
        // Post-commit: the closure above is the source of truth. Nothing
        // below may fail it.
        // ---------------------------------------------------------------
        let mut webhook_sent = false;
        let mut webhook_error = None;

        if req.send_to_pos {
            match restaurant.pos_config() {
                Some(pos) => {
                    let payload = ClosurePayload {
                        pos_reference: pos_reference.clone(),
                        session_id: session.id.clone(),
                        table_id: session.table_id.clone(),
                        unit_id: session.unit_id.clone(),
                        started_at: session.started_at,
                        closed_at: now,
                        items: build_lines(&items)
                            .into_iter()
                            .map(|line| PayloadItem {
                                name: line.name,
                                quantity: line.quantity,
                                unit_price_cents: line.unit_price_cents,
                                line_total_cents: line.line_total_cents,
                            })
                            .collect(),
                        subtotal_cents: totals.subtotal_cents,
                        service_charge_cents: totals.service_charge_cents,
                        discount_cents: req.discount_cents,
                        total_cents: total.cents(),
                        payment_method: req.payment_method,
                    };

                    match self
                        .notifier
                        .notify(&pos.endpoint, pos.credential.as_deref(), &payload)
                        .await
                    {
                        Ok(()) => {
                            webhook_sent = true;
                            info!(reference = %pos_reference, "POS notified");
                        }
                        Err(err) => {
                            webhook_error = Some(err.to_string());
                            warn!(
                                reference = %pos_reference,
                                error = %err,
                                "POS notification failed; closure stands"
                            );
                        }
                    }

                    // Best-effort audit update; a failure here is logged
                    // and swallowed, never surfaced into the success path.
                    if let Err(err) = repository::closure::record_webhook_result(
                        self.db.pool(),
                        &closure.id,
                        webhook_sent,
                        webhook_error.as_deref(),
                    )
                    .await
                    {
                        warn!(closure_id = %closure.id, error = %err, "Failed to record webhook outcome");
                    }
                }
                None => {
                    debug!(
                        restaurant_id = %req.restaurant_id,
                        "POS notification requested but no endpoint configured"
                    );
                }
            }
        }

        Ok(ClosureResult {
            session_id: session.id,
            closure_id: closure.id,
            pos_reference,
            subtotal_cents: totals.subtotal_cents,
            service_charge_cents: totals.service_charge_cents,
            discount_cents: req.discount_cents,
            total_cents: total.cents(),
            closed_at: now,
            webhook_sent,
            webhook_error,
        })
    }
}

/// Generates a POS correlation id unique across all time.
///
/// Timestamp to the millisecond plus the session-id prefix; the UNIQUE
/// column on `table_sessions.pos_reference` is the backstop.
fn generate_pos_reference(session_id: &str, now: DateTime<Utc>) -> String {
    let session_prefix: String = session_id.chars().take(8).collect();
    format!("{}-{}", now.format("%Y%m%d-%H%M%S%3f"), session_prefix)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::UnitAllocator;
    use crate::registry::{NewTable, NewUnit, TableRegistry};
    use crate::testutil::{
        memory_db, seed_order, seed_restaurant, FakeNotifier, RestaurantFixture,
    };

    fn request(session_id: &str, restaurant_id: &str) -> CloseBillRequest {
        CloseBillRequest {
            session_id: session_id.to_string(),
            restaurant_id: restaurant_id.to_string(),
            payment_method: PaymentMethod::Cash,
            amount_paid_cents: 1200,
            discount_cents: 0,
            notes: None,
            closed_by_staff_id: "staff-1".to_string(),
            send_to_pos: false,
        }
    }

    async fn setup(fixture: RestaurantFixture) -> (Database, String, String, String) {
        let db = memory_db().await;
        let restaurant_id = seed_restaurant(&db, fixture).await;
        let registered = TableRegistry::new(db.clone())
            .register_table(NewTable {
                restaurant_id: restaurant_id.clone(),
                category: "main".to_string(),
                name: "T1".to_string(),
                seat_count: 4,
                units: vec![NewUnit {
                    unit_code: "A".to_string(),
                    display_name: "Seat A".to_string(),
                }],
            })
            .await
            .unwrap();
        let allocated = UnitAllocator::new(db.clone())
            .allocate(&registered.table.id, 4)
            .await
            .unwrap();
        (db, restaurant_id, registered.table.id, allocated.session.id)
    }

    #[tokio::test]
    async fn test_close_persists_totals_and_frees_table() {
        let (db, restaurant_id, table_id, session_id) =
            setup(RestaurantFixture::default()).await;
        seed_order(&db, &session_id, 600, 2).await;

        // Capacity is exhausted while the session is active
        let allocator = UnitAllocator::new(db.clone());
        assert!(matches!(
            allocator.allocate(&table_id, 1).await.unwrap_err(),
            EngineError::CapacityExceeded { .. }
        ));

        let coordinator =
            ClosureCoordinator::new(db.clone(), FakeNotifier::succeeding());
        let result = coordinator
            .close_bill(request(&session_id, &restaurant_id))
            .await
            .unwrap();

        assert_eq!(result.subtotal_cents, 1200);
        assert_eq!(result.service_charge_cents, 0);
        assert_eq!(result.total_cents, 1200);
        assert!(!result.webhook_sent);

        // Session row carries the closure fields
        let session = repository::session::get_required(db.pool(), &session_id)
            .await
            .unwrap();
        assert!(!session.is_active());
        assert_eq!(session.payment_method, Some(PaymentMethod::Cash));
        assert_eq!(session.amount_paid_cents, Some(1200));
        assert_eq!(session.pos_reference.as_deref(), Some(result.pos_reference.as_str()));

        // Table is available and the unit re-allocatable
        let table = repository::table::get_table_required(db.pool(), &table_id)
            .await
            .unwrap();
        assert!(table.available);
        allocator.allocate(&table_id, 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_settlement_is_subtotal_minus_discount() {
        let (db, restaurant_id, _, session_id) = setup(RestaurantFixture {
            service_charge_bps: 1000,
            ..Default::default()
        })
        .await;
        seed_order(&db, &session_id, 600, 2).await;

        let coordinator =
            ClosureCoordinator::new(db.clone(), FakeNotifier::succeeding());
        let mut req = request(&session_id, &restaurant_id);
        req.discount_cents = 200;
        let result = coordinator.close_bill(req).await.unwrap();

        assert_eq!(result.subtotal_cents, 1200);
        // Service charge is computed at the fresh rate for the audit row,
        // but settlement is subtotal − discount
        assert_eq!(result.service_charge_cents, 120);
        assert_eq!(result.discount_cents, 200);
        assert_eq!(result.total_cents, 1000);

        let closures = repository::closure::list_for_session(db.pool(), &session_id)
            .await
            .unwrap();
        assert_eq!(closures.len(), 1);
        assert_eq!(closures[0].subtotal_cents, 1200);
        assert_eq!(closures[0].service_charge_cents, 120);
        assert_eq!(closures[0].total_cents, 1000);
        assert_eq!(closures[0].discount_cents, 200);
    }

    #[tokio::test]
    async fn test_double_close_yields_one_closure_row() {
        let (db, restaurant_id, _, session_id) =
            setup(RestaurantFixture::default()).await;
        seed_order(&db, &session_id, 600, 2).await;

        let coordinator =
            ClosureCoordinator::new(db.clone(), FakeNotifier::succeeding());
        coordinator
            .close_bill(request(&session_id, &restaurant_id))
            .await
            .unwrap();

        let err = coordinator
            .close_bill(request(&session_id, &restaurant_id))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyClosed { .. }));

        let closures = repository::closure::list_for_session(db.pool(), &session_id)
            .await
            .unwrap();
        assert_eq!(closures.len(), 1, "never two closure rows for one session");
    }

    #[tokio::test]
    async fn test_cross_restaurant_close_is_not_found() {
        let (db, _, _, session_id) = setup(RestaurantFixture::default()).await;
        let other_restaurant = seed_restaurant(&db, RestaurantFixture::default()).await;

        let coordinator =
            ClosureCoordinator::new(db.clone(), FakeNotifier::succeeding());
        let err = coordinator
            .close_bill(request(&session_id, &other_restaurant))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        // And the session is untouched
        let session = repository::session::get_required(db.pool(), &session_id)
            .await
            .unwrap();
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn test_invalid_amounts_rejected() {
        let (db, restaurant_id, _, session_id) =
            setup(RestaurantFixture::default()).await;
        let coordinator =
            ClosureCoordinator::new(db.clone(), FakeNotifier::succeeding());

        let mut req = request(&session_id, &restaurant_id);
        req.discount_cents = -5;
        assert!(matches!(
            coordinator.close_bill(req).await.unwrap_err(),
            EngineError::InvalidInput(_)
        ));

        let mut req = request(&session_id, &restaurant_id);
        req.amount_paid_cents = -1;
        assert!(matches!(
            coordinator.close_bill(req).await.unwrap_err(),
            EngineError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_pos_success_recorded_on_result_and_audit_row() {
        let (db, restaurant_id, _, session_id) = setup(RestaurantFixture {
            pos_endpoint: Some("https://pos.example/hook".to_string()),
            pos_credential: Some("secret".to_string()),
            ..Default::default()
        })
        .await;
        seed_order(&db, &session_id, 600, 2).await;

        let notifier = FakeNotifier::succeeding();
        let coordinator = ClosureCoordinator::new(db.clone(), notifier.clone());
        let mut req = request(&session_id, &restaurant_id);
        req.send_to_pos = true;
        let result = coordinator.close_bill(req).await.unwrap();

        assert!(result.webhook_sent);
        assert_eq!(result.webhook_error, None);
        assert_eq!(notifier.call_count(), 1);

        let (endpoint, credential, payload) =
            notifier.calls.lock().unwrap().pop().unwrap();
        assert_eq!(endpoint, "https://pos.example/hook");
        assert_eq!(credential.as_deref(), Some("secret"));
        assert_eq!(payload.pos_reference, result.pos_reference);
        assert_eq!(payload.total_cents, 1200);
        assert_eq!(payload.items.len(), 1);

        let closures = repository::closure::list_for_session(db.pool(), &session_id)
            .await
            .unwrap();
        assert!(closures[0].webhook_sent);
    }

    #[tokio::test]
    async fn test_pos_failure_never_reverses_the_closure() {
        let (db, restaurant_id, _, session_id) = setup(RestaurantFixture {
            pos_endpoint: Some("https://pos.example/hook".to_string()),
            ..Default::default()
        })
        .await;
        seed_order(&db, &session_id, 600, 2).await;

        let notifier = FakeNotifier::failing("connection refused");
        let coordinator = ClosureCoordinator::new(db.clone(), notifier);
        let mut req = request(&session_id, &restaurant_id);
        req.send_to_pos = true;
        let result = coordinator.close_bill(req).await.unwrap();

        assert!(!result.webhook_sent);
        assert!(result
            .webhook_error
            .as_deref()
            .unwrap()
            .contains("connection refused"));

        // The closure committed regardless
        let session = repository::session::get_required(db.pool(), &session_id)
            .await
            .unwrap();
        assert!(!session.is_active());
        assert_eq!(session.amount_paid_cents, Some(1200));

        let closures = repository::closure::list_for_session(db.pool(), &session_id)
            .await
            .unwrap();
        assert_eq!(closures.len(), 1);
        assert!(!closures[0].webhook_sent);
        assert!(closures[0]
            .webhook_error
            .as_deref()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn test_send_to_pos_without_config_is_quietly_skipped() {
        let (db, restaurant_id, _, session_id) =
            setup(RestaurantFixture::default()).await;

        let notifier = FakeNotifier::succeeding();
        let coordinator = ClosureCoordinator::new(db.clone(), notifier.clone());
        let mut req = request(&session_id, &restaurant_id);
        req.send_to_pos = true;
        let result = coordinator.close_bill(req).await.unwrap();

        assert!(!result.webhook_sent);
        assert_eq!(result.webhook_error, None);
        assert_eq!(notifier.call_count(), 0);
    }

    #[tokio::test]
    async fn test_pos_references_are_unique_per_closure() {
        let db = memory_db().await;
        let restaurant_id = seed_restaurant(&db, RestaurantFixture::default()).await;
        let registered = TableRegistry::new(db.clone())
            .register_table(NewTable {
                restaurant_id: restaurant_id.clone(),
                category: "main".to_string(),
                name: "T1".to_string(),
                seat_count: 8,
                units: vec![
                    NewUnit {
                        unit_code: "A".to_string(),
                        display_name: "Seat A".to_string(),
                    },
                    NewUnit {
                        unit_code: "B".to_string(),
                        display_name: "Seat B".to_string(),
                    },
                ],
            })
            .await
            .unwrap();
        let allocator = UnitAllocator::new(db.clone());
        let coordinator =
            ClosureCoordinator::new(db.clone(), FakeNotifier::succeeding());

        let first = allocator.allocate(&registered.table.id, 2).await.unwrap();
        let second = allocator.allocate(&registered.table.id, 2).await.unwrap();

        let r1 = coordinator
            .close_bill(request(&first.session.id, &restaurant_id))
            .await
            .unwrap();
        let r2 = coordinator
            .close_bill(request(&second.session.id, &restaurant_id))
            .await
            .unwrap();

        assert_ne!(r1.pos_reference, r2.pos_reference);
    }
}
