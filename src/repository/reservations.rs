//! Reservations repository

use async_trait::async_trait;
use chrono::NaiveDate;

use super::PgTx;
use crate::{
    error::AppResult,
    models::reservation::{NewReservation, Reservation, ReservationStatus},
};

const RESERVATION_COLUMNS: &str = "id, copy_id, item_id, member_id, created_on, expires_on, status";

#[async_trait]
pub trait ReservationStore: Send {
    /// Fetch and lock a reservation
    async fn get_reservation(&mut self, reservation_id: i32) -> AppResult<Option<Reservation>>;

    /// Pending or fulfilled reservation of a member on a copy
    async fn active_reservation_for(&mut self, copy_id: i32, member_id: i32) -> AppResult<Option<Reservation>>;

    /// Oldest pending reservation on an item (locked)
    async fn oldest_pending_reservation(&mut self, item_id: i32) -> AppResult<Option<Reservation>>;

    async fn list_pending_reservations(&mut self) -> AppResult<Vec<Reservation>>;

    async fn list_member_reservations(&mut self, member_id: i32, active_only: bool) -> AppResult<Vec<Reservation>>;

    /// Non-terminal reservations whose expiration date is before `today` (locked)
    async fn lapsed_reservations(&mut self, today: NaiveDate) -> AppResult<Vec<Reservation>>;

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> AppResult<Reservation>;

    async fn set_reservation_status(&mut self, reservation_id: i32, status: ReservationStatus) -> AppResult<()>;
}

#[async_trait]
impl ReservationStore for PgTx {
    async fn get_reservation(&mut self, reservation_id: i32) -> AppResult<Option<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservations WHERE id = $1 FOR UPDATE",
            RESERVATION_COLUMNS
        );
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(reservation_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(reservation)
    }

    async fn active_reservation_for(&mut self, copy_id: i32, member_id: i32) -> AppResult<Option<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservations \
             WHERE copy_id = $1 AND member_id = $2 AND status IN ('pending', 'fulfilled') \
             FOR UPDATE",
            RESERVATION_COLUMNS
        );
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(copy_id)
            .bind(member_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(reservation)
    }

    async fn oldest_pending_reservation(&mut self, item_id: i32) -> AppResult<Option<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservations \
             WHERE item_id = $1 AND status = 'pending' \
             ORDER BY created_on, id \
             LIMIT 1 \
             FOR UPDATE",
            RESERVATION_COLUMNS
        );
        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(item_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(reservation)
    }

    async fn list_pending_reservations(&mut self) -> AppResult<Vec<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservations WHERE status = 'pending' ORDER BY created_on, id",
            RESERVATION_COLUMNS
        );
        let reservations = sqlx::query_as::<_, Reservation>(&query)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(reservations)
    }

    async fn list_member_reservations(&mut self, member_id: i32, active_only: bool) -> AppResult<Vec<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservations \
             WHERE member_id = $1 AND ($2 = FALSE OR status IN ('pending', 'fulfilled')) \
             ORDER BY created_on DESC, id DESC",
            RESERVATION_COLUMNS
        );
        let reservations = sqlx::query_as::<_, Reservation>(&query)
            .bind(member_id)
            .bind(active_only)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(reservations)
    }

    async fn lapsed_reservations(&mut self, today: NaiveDate) -> AppResult<Vec<Reservation>> {
        let query = format!(
            "SELECT {} FROM reservations \
             WHERE expires_on < $1 AND status IN ('pending', 'fulfilled') \
             ORDER BY id \
             FOR UPDATE",
            RESERVATION_COLUMNS
        );
        let reservations = sqlx::query_as::<_, Reservation>(&query)
            .bind(today)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(reservations)
    }

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> AppResult<Reservation> {
        let query = format!(
            r#"
            INSERT INTO reservations (copy_id, item_id, member_id, created_on, expires_on, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        );
        let created = sqlx::query_as::<_, Reservation>(&query)
            .bind(reservation.copy_id)
            .bind(reservation.item_id)
            .bind(reservation.member_id)
            .bind(reservation.created_on)
            .bind(reservation.expires_on)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(created)
    }

    async fn set_reservation_status(&mut self, reservation_id: i32, status: ReservationStatus) -> AppResult<()> {
        sqlx::query("UPDATE reservations SET status = $2 WHERE id = $1")
            .bind(reservation_id)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}
