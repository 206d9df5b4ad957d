//! # Table Registry
//!
//! Restaurant and table setup: the admin-side operations that provision the
//! rows the allocator works against. A table and all of its units are
//! created in one transaction; under the static QR policy every unit gets
//! its permanent credential here.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use tabletap_core::{
    validation, QrTokenPolicy, Restaurant, Table, TableUnit, ValidationError,
};
use tabletap_db::{repository, Database};

use crate::error::EngineResult;
use crate::token;

// =============================================================================
// Requests
// =============================================================================

/// Input for creating a restaurant.
#[derive(Debug, Clone)]
pub struct NewRestaurant {
    pub name: String,
    /// true = dynamic QR policy (rotate token per session)
    pub regenerate_qr_per_session: bool,
    pub service_charge_bps: i64,
    pub pos_endpoint: Option<String>,
    pub pos_credential: Option<String>,
}

/// One unit to provision on a new table.
#[derive(Debug, Clone)]
pub struct NewUnit {
    pub unit_code: String,
    pub display_name: String,
}

/// Input for registering a table with its units.
#[derive(Debug, Clone)]
pub struct NewTable {
    pub restaurant_id: String,
    pub category: String,
    pub name: String,
    pub seat_count: i64,
    pub units: Vec<NewUnit>,
}

/// A freshly registered table with its provisioned units.
#[derive(Debug, Clone)]
pub struct RegisteredTable {
    pub table: Table,
    pub units: Vec<TableUnit>,
}

// =============================================================================
// Registry
// =============================================================================

/// Admin-side provisioning operations.
#[derive(Debug, Clone)]
pub struct TableRegistry {
    db: Database,
}

impl TableRegistry {
    /// Creates a new TableRegistry.
    pub fn new(db: Database) -> Self {
        TableRegistry { db }
    }

    /// Creates a restaurant.
    pub async fn create_restaurant(&self, req: NewRestaurant) -> EngineResult<Restaurant> {
        validation::validate_display_name("name", &req.name)?;
        validation::validate_amount_cents("service_charge_bps", req.service_charge_bps)?;

        let restaurant = Restaurant {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            regenerate_qr_per_session: req.regenerate_qr_per_session,
            service_charge_bps: req.service_charge_bps,
            pos_endpoint: req.pos_endpoint,
            pos_credential: req.pos_credential,
            created_at: Utc::now(),
        };

        repository::restaurant::insert(self.db.pool(), &restaurant).await?;

        info!(id = %restaurant.id, name = %restaurant.name, "Restaurant created");
        Ok(restaurant)
    }

    /// Registers a table and provisions its units in one transaction.
    ///
    /// ## Token Provisioning
    /// - Static policy: each unit receives its permanent credential now
    /// - Dynamic policy: tokens stay NULL until the first allocation
    pub async fn register_table(&self, req: NewTable) -> EngineResult<RegisteredTable> {
        validation::validate_seat_count(req.seat_count)?;
        validation::validate_display_name("name", &req.name)?;
        if req.units.is_empty() {
            return Err(ValidationError::Required {
                field: "units".to_string(),
            }
            .into());
        }
        for unit in &req.units {
            validation::validate_unit_code(&unit.unit_code)?;
            validation::validate_display_name("display_name", &unit.display_name)?;
        }

        let mut tx = self.db.begin_immediate().await?;

        let restaurant =
            repository::restaurant::get_required(&mut *tx, &req.restaurant_id).await?;
        let policy = restaurant.qr_policy();

        let now = Utc::now();
        let table = Table {
            id: Uuid::new_v4().to_string(),
            restaurant_id: req.restaurant_id.clone(),
            category: req.category,
            name: req.name,
            seat_count: req.seat_count,
            available: true,
            created_at: now,
            updated_at: now,
        };
        repository::table::insert_table(&mut *tx, &table).await?;

        let mut units = Vec::with_capacity(req.units.len());
        for spec in req.units {
            let unit = TableUnit {
                id: Uuid::new_v4().to_string(),
                table_id: table.id.clone(),
                unit_code: spec.unit_code,
                display_name: spec.display_name,
                qr_token: match policy {
                    QrTokenPolicy::Static => Some(token::generate_token()),
                    QrTokenPolicy::Dynamic => None,
                },
                created_at: now,
                updated_at: now,
            };
            repository::table::insert_unit(&mut *tx, &unit).await?;
            units.push(unit);
        }

        tx.commit().await.map_err(tabletap_db::DbError::from)?;

        info!(
            table_id = %table.id,
            units = units.len(),
            seats = table.seat_count,
            "Table registered"
        );

        Ok(RegisteredTable { table, units })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
