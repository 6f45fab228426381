use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;

use crate::config::Config;
use crate::db::soft_delete::{self, Visibility};
use crate::entities::booking;
use crate::entities::user::{self, UserRole};
use crate::entities::vehicle;
use crate::error::{AppError, AppResult};
use crate::policy::{self, Actor};
use crate::services::booking as booking_service;
use crate::utils::password::{hash_password, validate_new_password, verify_password};

const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub contact_info: Option<String>,
    pub role: Option<UserRole>,
}

fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(AppError::InvalidArgument("Invalid email address".to_string()));
    }
    Ok(email)
}

fn normalize_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::InvalidArgument("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::InvalidArgument(format!(
            "Name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Empty contact info clears the field.
fn normalize_contact(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

async fn insert_user(
    db: &DatabaseConnection,
    email: String,
    password: &str,
    name: String,
    contact_info: Option<String>,
    role: UserRole,
) -> AppResult<user::Model> {
    // Emails stay reserved by deleted accounts too
    let existing = soft_delete::scoped::<user::Entity>(Visibility::IncludeDeleted)
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let now = Utc::now().fixed_offset();
    let user = user::ActiveModel {
        email: Set(email),
        password_hash: Set(hash_password(password)?),
        name: Set(name),
        contact_info: Set(contact_info),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(user)
}

/// Self-service sign-up always creates a passenger.
pub async fn register(db: &DatabaseConnection, input: Registration) -> AppResult<user::Model> {
    let email = normalize_email(&input.email)?;
    let name = normalize_name(&input.name)?;
    validate_new_password(&input.password)?;

    let user = insert_user(
        db,
        email,
        &input.password,
        name,
        input.contact_info.and_then(normalize_contact),
        UserRole::Passenger,
    )
    .await?;

    tracing::info!(user_id = user.id, "Passenger registered");
    Ok(user)
}

/// Deleted accounts cannot log in; the message never says which part was wrong.
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> AppResult<user::Model> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = soft_delete::scoped::<user::Entity>(Visibility::ActiveOnly)
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "Rejected login");
        return Err(invalid());
    }
    Ok(user)
}

pub async fn find_active(db: &DatabaseConnection, user_id: i32) -> AppResult<user::Model> {
    soft_delete::find::<user::Entity, _>(db, user_id, Visibility::ActiveOnly).await
}

pub async fn update_profile(
    db: &DatabaseConnection,
    actor: &Actor,
    input: ProfileUpdate,
) -> AppResult<user::Model> {
    let user = find_active(db, actor.id).await?;
    let mut active: user::ActiveModel = user.into();

    if let Some(name) = input.name {
        active.name = Set(normalize_name(&name)?);
    }
    if let Some(contact) = input.contact_info {
        active.contact_info = Set(normalize_contact(contact));
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    Ok(active.update(db).await?)
}

pub async fn change_password(
    db: &DatabaseConnection,
    actor: &Actor,
    input: PasswordChange,
) -> AppResult<()> {
    let user = find_active(db, actor.id).await?;

    if !verify_password(&input.old_password, &user.password_hash)? {
        return Err(AppError::InvalidArgument("Current password is incorrect".to_string()));
    }
    if input.new_password != input.confirm_password {
        return Err(AppError::InvalidArgument("Passwords do not match".to_string()));
    }
    validate_new_password(&input.new_password)?;

    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(hash_password(&input.new_password)?);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(db).await?;

    tracing::info!(user_id = actor.id, "Password changed");
    Ok(())
}

pub async fn list(
    db: &DatabaseConnection,
    actor: &Actor,
    visibility: Visibility,
    role: Option<UserRole>,
) -> AppResult<Vec<user::Model>> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let mut query = soft_delete::scoped::<user::Entity>(visibility);
    if let Some(role) = role {
        query = query.filter(user::Column::Role.eq(role));
    }
    Ok(query.order_by_asc(user::Column::Id).all(db).await?)
}

/// Active drivers, visible to any authenticated user.
pub async fn drivers(db: &DatabaseConnection) -> AppResult<Vec<user::Model>> {
    Ok(soft_delete::scoped::<user::Entity>(Visibility::ActiveOnly)
        .filter(user::Column::Role.eq(UserRole::Driver))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i32,
    visibility: Visibility,
) -> AppResult<user::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;
    soft_delete::find::<user::Entity, _>(db, user_id, visibility).await
}

/// A driver moved to another role gives up their vehicle.
pub async fn update(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i32,
    input: AdminUserUpdate,
) -> AppResult<user::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let txn = db.begin().await?;
    let user =
        soft_delete::find_for_update::<user::Entity, _>(&txn, user_id, Visibility::ActiveOnly)
            .await?;
    let old_role = user.role;

    let mut active: user::ActiveModel = user.into();
    if let Some(name) = input.name {
        active.name = Set(normalize_name(&name)?);
    }
    if let Some(contact) = input.contact_info {
        active.contact_info = Set(normalize_contact(contact));
    }
    if let Some(role) = input.role {
        if old_role == UserRole::Driver && role != UserRole::Driver {
            let detached = vehicle::Entity::update_many()
                .col_expr(vehicle::Column::DriverId, Expr::value(Option::<i32>::None))
                .filter(vehicle::Column::DriverId.eq(user_id))
                .exec(&txn)
                .await?;
            tracing::info!(user_id, vehicles = detached.rows_affected, "Driver detached from vehicle");
        }
        active.role = Set(role);
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let updated = active.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Users with a live booking, as passenger or driver, cannot be deleted. A
/// deleted driver gives up their vehicle.
pub async fn soft_delete(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i32,
) -> AppResult<user::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;
    if actor.id == user_id {
        return Err(AppError::InvalidArgument("You cannot delete your own account".to_string()));
    }

    let txn = db.begin().await?;
    let user =
        soft_delete::find_for_update::<user::Entity, _>(&txn, user_id, Visibility::ActiveOnly)
            .await?;

    if let Some(held) = booking_service::live()
        .filter(
            Condition::any()
                .add(booking::Column::PassengerId.eq(user_id))
                .add(booking::Column::DriverId.eq(user_id)),
        )
        .one(&txn)
        .await?
    {
        return Err(AppError::InvalidTransition(format!(
            "User has booking {} in status {} (cancel it first)",
            held.id, held.status
        )));
    }

    if user.role == UserRole::Driver {
        let detached = vehicle::Entity::update_many()
            .col_expr(vehicle::Column::DriverId, Expr::value(Option::<i32>::None))
            .filter(vehicle::Column::DriverId.eq(user_id))
            .exec(&txn)
            .await?;
        tracing::info!(user_id, vehicles = detached.rows_affected, "Driver detached from vehicle");
    }

    let deleted = soft_delete::soft_delete::<user::Entity, _>(&txn, user_id).await?;
    txn.commit().await?;
    Ok(deleted)
}

pub async fn restore(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i32,
) -> AppResult<user::Model> {
    policy::administer(actor).or_forbidden("Admin access required")?;

    let txn = db.begin().await?;
    let restored = soft_delete::restore::<user::Entity, _>(&txn, user_id).await?;
    txn.commit().await?;
    Ok(restored)
}

/// Creates the configured admin account unless that email is already taken.
pub async fn seed_admin(db: &DatabaseConnection, config: &Config) -> AppResult<()> {
    let email = normalize_email(&config.admin_email)?;

    let existing = soft_delete::scoped::<user::Entity>(Visibility::IncludeDeleted)
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?;
    if existing.is_some() {
        tracing::debug!("Admin account already present");
        return Ok(());
    }

    let admin = insert_user(
        db,
        email,
        &config.admin_password,
        "Administrator".to_string(),
        None,
        UserRole::Admin,
    )
    .await?;

    tracing::info!(user_id = admin.id, email = %admin.email, "Seeded admin account");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Rider@Example.COM ").unwrap(), "rider@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("rider@localhost").is_err());
    }

    #[test]
    fn blank_contact_clears_field() {
        assert_eq!(normalize_contact("   ".to_string()), None);
        assert_eq!(normalize_contact(" 0917 ".to_string()), Some("0917".to_string()));
    }

    #[test]
    fn names_must_not_be_blank() {
        assert!(normalize_name(" ").is_err());
        assert_eq!(normalize_name(" Ana ").unwrap(), "Ana");
    }
}
