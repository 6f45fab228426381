use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
};
use serde::Deserialize;

use crate::db::soft_delete::{self, Visibility};
use crate::entities::booking;
use crate::entities::payment::{self, PaymentMethod, PaymentStatus};
use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::lifecycle::PaymentTransition;
use crate::policy::{self, Actor};

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub booking_id: i32,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePayment {
    pub amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
}

fn validate_amount(amount: Decimal) -> AppResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidArgument(
            "Amount must be greater than zero".to_string(),
        ));
    }
    let rounded = amount.round_dp(2);
    // decimal(10, 2)
    if rounded >= Decimal::new(100_000_000, 0) {
        return Err(AppError::InvalidArgument("Amount is too large".to_string()));
    }
    Ok(rounded)
}

/// Record a payment for one of the actor's own bookings. Payments start
/// Pending until an admin verifies or rejects them.
pub async fn create(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewPayment,
) -> AppResult<payment::Model> {
    let amount = validate_amount(input.amount)?;

    let txn = db.begin().await?;

    let booking =
        soft_delete::find::<booking::Entity, _>(&txn, input.booking_id, Visibility::ActiveOnly)
            .await?;
    policy::create_payment(actor, &booking)
        .or_forbidden("You can only create payments for your own bookings")?;

    // The unique key covers deleted rows too
    let existing = soft_delete::scoped::<payment::Entity>(Visibility::IncludeDeleted)
        .filter(payment::Column::BookingId.eq(booking.id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "This booking already has a payment".to_string(),
        ));
    }

    let now = Utc::now().fixed_offset();
    let payment = payment::ActiveModel {
        booking_id: Set(booking.id),
        amount: Set(amount),
        payment_method: Set(input.payment_method),
        status: Set(PaymentStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(payment_id = payment.id, booking_id = booking.id, "Payment recorded");
    Ok(payment)
}

/// Admin-only transition out of Pending.
pub async fn transition(
    db: &DatabaseConnection,
    actor: &Actor,
    payment_id: i32,
    transition: PaymentTransition,
) -> AppResult<payment::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let txn = db.begin().await?;

    let payment =
        soft_delete::find_for_update::<payment::Entity, _>(&txn, payment_id, Visibility::ActiveOnly)
            .await?;
    let from = payment.status;
    let to = transition.apply(from)?;

    let mut active: payment::ActiveModel = payment.into();
    active.status = Set(to);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(payment_id, actor_id = actor.id, from = %from, to = %to, "Payment transitioned");
    Ok(updated)
}

pub async fn verify(db: &DatabaseConnection, actor: &Actor, payment_id: i32) -> AppResult<payment::Model> {
    transition(db, actor, payment_id, PaymentTransition::Verify).await
}

pub async fn reject(db: &DatabaseConnection, actor: &Actor, payment_id: i32) -> AppResult<payment::Model> {
    transition(db, actor, payment_id, PaymentTransition::Reject).await
}

/// The single active payment of a booking.
pub async fn find_by_booking(
    db: &DatabaseConnection,
    actor: &Actor,
    booking_id: i32,
) -> AppResult<payment::Model> {
    let booking =
        soft_delete::find::<booking::Entity, _>(db, booking_id, Visibility::ActiveOnly).await?;
    policy::view_payment(actor, &booking).or_forbidden("You are not part of this booking")?;

    soft_delete::scoped::<payment::Entity>(Visibility::ActiveOnly)
        .filter(payment::Column::BookingId.eq(booking_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
}

/// Admins see every payment; passengers and drivers those of their bookings.
pub async fn list(
    db: &DatabaseConnection,
    actor: &Actor,
    visibility: Visibility,
) -> AppResult<Vec<payment::Model>> {
    policy::include_deleted(actor, visibility.shows_deleted())
        .or_forbidden("Only admins can list deleted payments")?;

    let query = soft_delete::scoped::<payment::Entity>(visibility);
    let query = match actor.role {
        UserRole::Admin => query,
        UserRole::Passenger => query
            .join(sea_orm::JoinType::InnerJoin, payment::Relation::Booking.def())
            .filter(booking::Column::PassengerId.eq(actor.id)),
        UserRole::Driver => query
            .join(sea_orm::JoinType::InnerJoin, payment::Relation::Booking.def())
            .filter(booking::Column::DriverId.eq(actor.id)),
    };

    Ok(query.order_by_asc(payment::Column::Id).all(db).await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Actor,
    payment_id: i32,
    visibility: Visibility,
) -> AppResult<payment::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;
    soft_delete::find::<payment::Entity, _>(db, payment_id, visibility).await
}

/// Amount and method stay editable only while the payment is Pending.
pub async fn update(
    db: &DatabaseConnection,
    actor: &Actor,
    payment_id: i32,
    input: UpdatePayment,
) -> AppResult<payment::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let txn = db.begin().await?;
    let payment =
        soft_delete::find_for_update::<payment::Entity, _>(&txn, payment_id, Visibility::ActiveOnly)
            .await?;

    if payment.status != PaymentStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "Cannot edit payment with status {} (requires Pending)",
            payment.status
        )));
    }

    let mut active: payment::ActiveModel = payment.into();
    if let Some(amount) = input.amount {
        active.amount = Set(validate_amount(amount)?);
    }
    if let Some(method) = input.payment_method {
        active.payment_method = Set(method);
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let updated = active.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

pub async fn soft_delete(
    db: &DatabaseConnection,
    actor: &Actor,
    payment_id: i32,
) -> AppResult<payment::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let txn = db.begin().await?;
    let deleted = soft_delete::soft_delete::<payment::Entity, _>(&txn, payment_id).await?;
    txn.commit().await?;
    Ok(deleted)
}

pub async fn restore(
    db: &DatabaseConnection,
    actor: &Actor,
    payment_id: i32,
) -> AppResult<payment::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let txn = db.begin().await?;
    let restored = soft_delete::restore::<payment::Entity, _>(&txn, payment_id).await?;
    txn.commit().await?;
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn amount_must_be_positive() {
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(Decimal::new(-150, 2)).is_err());
        assert_eq!(validate_amount(Decimal::new(12345, 3)).unwrap(), Decimal::new(1234, 2));
    }

    #[test]
    fn amount_fits_column() {
        assert!(validate_amount(Decimal::new(99_999_999, 0)).is_ok());
        assert!(validate_amount(Decimal::new(100_000_000, 0)).is_err());
    }
}
