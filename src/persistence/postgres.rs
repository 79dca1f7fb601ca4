//! PostgreSQL implementation of the system of record.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::RideStore;
use super::models::{DriverRow, RideRow};
use crate::domain::{
    DriverAccount, DriverId, DriverStatus, EligibleDriver, NewRide, Ride, RideId, RideStatus,
    RiderId, Tariff, TransitionOutcome, VehicleClass,
};
use crate::error::DispatchError;

const DRIVER_COLUMNS: &str = "id, name, vehicle_class, status, is_online, notification_token";

const RIDE_COLUMNS: &str = "id, rider_id, driver_id, status, fare, distance_m, duration_s, \
     vehicle_class, origin_lat, origin_lng, destination_lat, destination_lng, origin_name, \
     destination_name, polyline, route_token, cancel_reason, created_at, updated_at";

/// PostgreSQL-backed [`RideStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresRideStore {
    pool: PgPool,
}

impl PostgresRideStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ride_exists(&self, ride_id: RideId) -> Result<bool, DispatchError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM rides WHERE id = $1)")
            .bind(ride_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl RideStore for PostgresRideStore {
    async fn eligible_drivers(
        &self,
        candidates: &[DriverId],
        vehicle_class: VehicleClass,
    ) -> Result<Vec<EligibleDriver>, DispatchError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = candidates.iter().map(|id| *id.as_uuid()).collect();

        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, notification_token FROM drivers \
             WHERE id = ANY($1) AND is_online AND status = 'active' AND vehicle_class = $2 \
             AND notification_token IS NOT NULL AND notification_token <> ''",
        )
        .bind(&ids)
        .bind(vehicle_class.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, notification_token)| EligibleDriver {
                driver_id: DriverId::from_uuid(id),
                notification_token,
            })
            .collect())
    }

    async fn driver_account(
        &self,
        driver_id: DriverId,
    ) -> Result<Option<DriverAccount>, DispatchError> {
        let row = sqlx::query_as::<_, DriverRow>(&format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = $1"
        ))
        .bind(driver_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(DriverAccount::try_from).transpose()
    }

    async fn set_driver_online(
        &self,
        driver_id: DriverId,
        online: bool,
    ) -> Result<DriverAccount, DispatchError> {
        let row = sqlx::query_as::<_, DriverRow>(&format!(
            "UPDATE drivers SET is_online = $2, updated_at = now() WHERE id = $1 \
             RETURNING {DRIVER_COLUMNS}"
        ))
        .bind(driver_id.as_uuid())
        .bind(online)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DispatchError::DriverNotFound(driver_id))?;
        DriverAccount::try_from(row)
    }

    async fn set_driver_status(
        &self,
        driver_id: DriverId,
        status: DriverStatus,
    ) -> Result<DriverAccount, DispatchError> {
        let row = sqlx::query_as::<_, DriverRow>(&format!(
            "UPDATE drivers SET status = $2, \
             is_online = CASE WHEN $2 = 'active' THEN is_online ELSE FALSE END, \
             updated_at = now() WHERE id = $1 RETURNING {DRIVER_COLUMNS}"
        ))
        .bind(driver_id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DispatchError::DriverNotFound(driver_id))?;
        DriverAccount::try_from(row)
    }

    async fn set_driver_push_endpoint(
        &self,
        driver_id: DriverId,
        token: &str,
    ) -> Result<(), DispatchError> {
        let result = sqlx::query(
            "UPDATE drivers SET notification_token = $2, updated_at = now() WHERE id = $1",
        )
        .bind(driver_id.as_uuid())
        .bind(token)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DispatchError::DriverNotFound(driver_id));
        }
        Ok(())
    }

    async fn rider_push_endpoint(&self, rider_id: RiderId) -> Result<Option<String>, DispatchError> {
        let token = sqlx::query_scalar::<_, Option<String>>(
            "SELECT notification_token FROM riders WHERE id = $1",
        )
        .bind(rider_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(token.flatten().filter(|t| !t.is_empty()))
    }

    async fn vehicle_tariff(
        &self,
        vehicle_class: VehicleClass,
    ) -> Result<Option<Tariff>, DispatchError> {
        let row = sqlx::query_as::<_, (f64, f64, f64)>(
            "SELECT base_fare, per_km_rate, per_min_rate FROM vehicle_tariffs \
             WHERE vehicle_class = $1",
        )
        .bind(vehicle_class.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(base_fare, per_km_rate, per_min_rate)| Tariff {
            base_fare,
            per_km_rate,
            per_min_rate,
        }))
    }

    async fn create_ride(&self, new_ride: NewRide) -> Result<Ride, DispatchError> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            "INSERT INTO rides (id, rider_id, status, fare, distance_m, duration_s, vehicle_class, \
             origin_lat, origin_lng, destination_lat, destination_lng, origin_name, \
             destination_name, polyline, route_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {RIDE_COLUMNS}"
        ))
        .bind(*RideId::new().as_uuid())
        .bind(new_ride.rider_id.as_uuid())
        .bind(RideStatus::Requested.as_str())
        .bind(new_ride.fare)
        .bind(i32::try_from(new_ride.distance_m).unwrap_or(i32::MAX))
        .bind(i32::try_from(new_ride.duration_s).unwrap_or(i32::MAX))
        .bind(new_ride.vehicle_class.as_str())
        .bind(new_ride.origin.latitude)
        .bind(new_ride.origin.longitude)
        .bind(new_ride.destination.latitude)
        .bind(new_ride.destination.longitude)
        .bind(&new_ride.origin_name)
        .bind(&new_ride.destination_name)
        .bind(&new_ride.polyline)
        .bind(new_ride.route_token.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ride::try_from(row)
    }

    async fn ride(&self, ride_id: RideId) -> Result<Option<Ride>, DispatchError> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1"
        ))
        .bind(ride_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Ride::try_from).transpose()
    }

    async fn transition_ride_status(
        &self,
        ride_id: RideId,
        from: RideStatus,
        to: RideStatus,
        driver_id: DriverId,
    ) -> Result<TransitionOutcome, DispatchError> {
        // Single conditional UPDATE: the row lock serialises racing drivers
        // and only the first one still sees the expected status.
        let row = sqlx::query_as::<_, RideRow>(&format!(
            "UPDATE rides SET status = $3, driver_id = $4, updated_at = now() \
             WHERE id = $1 AND status = $2 \
             AND (($2 = 'Requested' AND driver_id IS NULL) OR driver_id = $4) \
             RETURNING {RIDE_COLUMNS}"
        ))
        .bind(ride_id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(driver_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(TransitionOutcome::Applied(Ride::try_from(row)?)),
            None if self.ride_exists(ride_id).await? => Ok(TransitionOutcome::Conflict),
            None => Err(DispatchError::RideNotFound(ride_id)),
        }
    }

    async fn cancel_ride(
        &self,
        ride_id: RideId,
        rider_id: RiderId,
        reason: Option<&str>,
    ) -> Result<TransitionOutcome, DispatchError> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            "UPDATE rides SET status = 'Cancelled', cancel_reason = $3, updated_at = now() \
             WHERE id = $1 AND rider_id = $2 AND status IN ('Requested', 'Accepted') \
             RETURNING {RIDE_COLUMNS}"
        ))
        .bind(ride_id.as_uuid())
        .bind(rider_id.as_uuid())
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(TransitionOutcome::Applied(Ride::try_from(row)?));
        }
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM rides WHERE id = $1 AND rider_id = $2)",
        )
        .bind(ride_id.as_uuid())
        .bind(rider_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        if owned {
            Ok(TransitionOutcome::Conflict)
        } else {
            Err(DispatchError::RideNotFound(ride_id))
        }
    }

    async fn ping(&self) -> Result<(), DispatchError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
