use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shoreline_catalog::TransportType;
use shoreline_core::repository::{ReservationRepository, StoreError, StoreResult};
use shoreline_core::reservation::{
    AddonLine, CustomerDetails, Reservation, ReservationHeader, ReservationStatus, TimeSlot,
    TransportDetails,
};
use shoreline_shared::Masked;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct HeaderRow {
    id: Uuid,
    reference_code: String,
    catalog_item_id: Uuid,
    activity_date: NaiveDate,
    time_slot: String,
    adult_count: i32,
    child_count: i32,
    total_amount: Decimal,
    discount_amount: Decimal,
    promo_code_id: Option<Uuid>,
    currency: String,
    status: String,
    authorization_id: Option<String>,
    notice: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    name: String,
    email: String,
    phone: String,
    special_requests: Option<String>,
}

#[derive(sqlx::FromRow)]
struct TransportRow {
    transport_type: String,
    hotel_name: Option<String>,
    room_number: Option<String>,
    non_player_count: i32,
    private_passengers: i32,
    transport_cost: Decimal,
}

#[derive(sqlx::FromRow)]
struct AddonLineRow {
    addon_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

fn count(table: &'static str, column: &str, value: i32) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt {
        table,
        detail: format!("negative {}: {}", column, value),
    })
}

fn to_db_count(value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::WriteFailed("reservations"))
}

impl TryFrom<HeaderRow> for ReservationHeader {
    type Error = StoreError;

    fn try_from(row: HeaderRow) -> Result<Self, Self::Error> {
        let status = ReservationStatus::parse(&row.status).ok_or_else(|| StoreError::Corrupt {
            table: "reservations",
            detail: format!("unknown status {}", row.status),
        })?;
        let time_slot = TimeSlot::parse(&row.time_slot).ok_or_else(|| StoreError::Corrupt {
            table: "reservations",
            detail: format!("unknown time slot {}", row.time_slot),
        })?;

        Ok(ReservationHeader {
            id: row.id,
            reference_code: row.reference_code,
            catalog_item_id: row.catalog_item_id,
            activity_date: row.activity_date,
            time_slot,
            adult_count: count("reservations", "adult_count", row.adult_count)?,
            child_count: count("reservations", "child_count", row.child_count)?,
            total_amount: row.total_amount,
            discount_amount: row.discount_amount,
            promo_code_id: row.promo_code_id,
            currency: row.currency,
            status,
            authorization_id: row.authorization_id,
            notice: row.notice,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const HEADER_COLUMNS: &str = "id, reference_code, catalog_item_id, activity_date, time_slot, adult_count, child_count, total_amount, discount_amount, promo_code_id, currency, status, authorization_id, notice, created_at, updated_at";

impl PgReservationRepository {
    async fn insert_children(
        tx: &mut Transaction<'_, Postgres>,
        reservation: &Reservation,
    ) -> StoreResult<()> {
        let id = reservation.id();
        let customer = &reservation.customer;

        sqlx::query(
            r#"
            INSERT INTO reservation_customers (reservation_id, name, email, phone, special_requests)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&customer.name)
        .bind(customer.email.expose())
        .bind(customer.phone.expose())
        .bind(&customer.special_requests)
        .execute(&mut **tx)
        .await
        .map_err(StoreError::backend)?;

        let transport = &reservation.transport;
        sqlx::query(
            r#"
            INSERT INTO reservation_transports (reservation_id, transport_type, hotel_name, room_number, non_player_count, private_passengers, transport_cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(transport.transport_type.as_str())
        .bind(&transport.hotel_name)
        .bind(&transport.room_number)
        .bind(to_db_count(transport.non_player_count)?)
        .bind(to_db_count(transport.private_passengers)?)
        .bind(transport.transport_cost)
        .execute(&mut **tx)
        .await
        .map_err(StoreError::backend)?;

        for line in &reservation.addons {
            sqlx::query(
                r#"
                INSERT INTO reservation_addons (id, reservation_id, addon_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(line.addon_id)
            .bind(to_db_count(line.quantity)?)
            .bind(line.unit_price)
            .execute(&mut **tx)
            .await
            .map_err(StoreError::backend)?;
        }

        Ok(())
    }

    async fn load_children(&self, header: ReservationHeader) -> StoreResult<Reservation> {
        let customer = sqlx::query_as::<_, CustomerRow>(
            "SELECT name, email, phone, special_requests FROM reservation_customers WHERE reservation_id = $1",
        )
        .bind(header.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?
        .ok_or_else(|| StoreError::Corrupt {
            table: "reservation_customers",
            detail: format!("missing customer for {}", header.id),
        })?;

        let transport = sqlx::query_as::<_, TransportRow>(
            "SELECT transport_type, hotel_name, room_number, non_player_count, private_passengers, transport_cost FROM reservation_transports WHERE reservation_id = $1",
        )
        .bind(header.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?
        .ok_or_else(|| StoreError::Corrupt {
            table: "reservation_transports",
            detail: format!("missing transport for {}", header.id),
        })?;

        let addon_rows = sqlx::query_as::<_, AddonLineRow>(
            "SELECT addon_id, quantity, unit_price FROM reservation_addons WHERE reservation_id = $1",
        )
        .bind(header.id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        let transport_type = TransportType::parse(&transport.transport_type).ok_or_else(|| StoreError::Corrupt {
            table: "reservation_transports",
            detail: format!("unknown transport_type {}", transport.transport_type),
        })?;

        let addons = addon_rows
            .into_iter()
            .map(|row| {
                Ok(AddonLine {
                    addon_id: row.addon_id,
                    quantity: count("reservation_addons", "quantity", row.quantity)?,
                    unit_price: row.unit_price,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Reservation {
            header,
            customer: CustomerDetails {
                name: customer.name,
                email: Masked::new(customer.email),
                phone: Masked::new(customer.phone),
                special_requests: customer.special_requests,
            },
            transport: TransportDetails {
                transport_type,
                hotel_name: transport.hotel_name,
                room_number: transport.room_number,
                non_player_count: count("reservation_transports", "non_player_count", transport.non_player_count)?,
                private_passengers: count("reservation_transports", "private_passengers", transport.private_passengers)?,
                transport_cost: transport.transport_cost,
            },
            addons,
        })
    }
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn create_aggregate(&self, reservation: &Reservation) -> StoreResult<()> {
        let header = &reservation.header;
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        sqlx::query(
            r#"
            INSERT INTO reservations (id, reference_code, catalog_item_id, activity_date, time_slot, adult_count, child_count, total_amount, discount_amount, promo_code_id, currency, status, authorization_id, notice, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(header.id)
        .bind(&header.reference_code)
        .bind(header.catalog_item_id)
        .bind(header.activity_date)
        .bind(header.time_slot.to_string())
        .bind(to_db_count(header.adult_count)?)
        .bind(to_db_count(header.child_count)?)
        .bind(header.total_amount)
        .bind(header.discount_amount)
        .bind(header.promo_code_id)
        .bind(&header.currency)
        .bind(header.status.as_str())
        .bind(&header.authorization_id)
        .bind(&header.notice)
        .bind(header.created_at)
        .bind(header.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        // Dropping the transaction on error rolls the header back
        Self::insert_children(&mut tx, reservation).await?;

        tx.commit().await.map_err(StoreError::backend)?;
        info!(reservation_id = %header.id, reference_code = %header.reference_code, "Reservation aggregate stored");
        Ok(())
    }

    async fn attach_authorization(&self, id: Uuid, authorization_id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET authorization_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending' AND authorization_id IS NULL
            "#,
        )
        .bind(id)
        .bind(authorization_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, HeaderRow>(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            HEADER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        match row {
            Some(row) => Ok(Some(self.load_children(row.try_into()?).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_authorization(&self, authorization_id: &str) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, HeaderRow>(&format!(
            "SELECT {} FROM reservations WHERE authorization_id = $1",
            HEADER_COLUMNS
        ))
        .bind(authorization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        match row {
            Some(row) => Ok(Some(self.load_children(row.try_into()?).await?)),
            None => Ok(None),
        }
    }

    async fn settle(
        &self,
        id: Uuid,
        authorization_id: &str,
        status: ReservationStatus,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND authorization_id = $2 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(authorization_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() == 1)
    }

    async fn annotate(&self, id: Uuid, notice: &str) -> StoreResult<()> {
        sqlx::query("UPDATE reservations SET notice = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(notice)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }
}
