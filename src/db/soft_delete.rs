//! Soft-delete repository helpers.
//!
//! Every entity carries a nullable `deleted_at` timestamp. Queries built here
//! take an explicit [`Visibility`] so callers have to say whether deleted rows
//! may leak into the result.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Select};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Which rows a query may return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    ActiveOnly,
    IncludeDeleted,
    /// Deleted rows only, for restore screens.
    OnlyDeleted,
}

impl Visibility {
    pub fn from_flag(include_deleted: bool) -> Self {
        if include_deleted {
            Visibility::IncludeDeleted
        } else {
            Visibility::ActiveOnly
        }
    }

    /// `only_deleted` wins over `include_deleted`.
    pub fn from_flags(include_deleted: bool, only_deleted: bool) -> Self {
        if only_deleted {
            Visibility::OnlyDeleted
        } else {
            Visibility::from_flag(include_deleted)
        }
    }

    pub fn shows_deleted(self) -> bool {
        self != Visibility::ActiveOnly
    }
}

/// Entities with an integer primary key and a `deleted_at` column.
pub trait SoftDelete: EntityTrait {
    /// Human-readable entity name used in error messages.
    const NAME: &'static str;

    fn id_column() -> Self::Column;

    fn deleted_at_column() -> Self::Column;

    fn deleted_at(model: &Self::Model) -> Option<DateTimeWithTimeZone>;

    fn is_deleted(model: &Self::Model) -> bool {
        Self::deleted_at(model).is_some()
    }
}

pub fn not_found<E: SoftDelete>() -> AppError {
    AppError::NotFound(format!("{} not found", E::NAME))
}

/// Base query for `E` honouring the visibility mode.
pub fn scoped<E: SoftDelete>(visibility: Visibility) -> Select<E> {
    let query = E::find();
    match visibility {
        Visibility::ActiveOnly => query.filter(E::deleted_at_column().is_null()),
        Visibility::IncludeDeleted => query,
        Visibility::OnlyDeleted => query.filter(E::deleted_at_column().is_not_null()),
    }
}

pub fn by_id<E: SoftDelete>(id: i32, visibility: Visibility) -> Select<E> {
    scoped::<E>(visibility).filter(E::id_column().eq(id))
}

pub async fn find<E, C>(conn: &C, id: i32, visibility: Visibility) -> AppResult<E::Model>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    by_id::<E>(id, visibility)
        .one(conn)
        .await?
        .ok_or_else(not_found::<E>)
}

/// Same as [`find`] but takes a row lock (`FOR UPDATE`) where the backend
/// supports it. Only meaningful inside a transaction.
pub async fn find_for_update<E, C>(conn: &C, id: i32, visibility: Visibility) -> AppResult<E::Model>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    by_id::<E>(id, visibility)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(not_found::<E>)
}

/// Marks an active row as deleted. Unknown or already deleted rows are `NotFound`.
pub async fn soft_delete<E, C>(conn: &C, id: i32) -> AppResult<E::Model>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    find_for_update::<E, _>(conn, id, Visibility::ActiveOnly).await?;

    E::update_many()
        .col_expr(E::deleted_at_column(), Expr::value(Utc::now().fixed_offset()))
        .filter(E::id_column().eq(id))
        .exec(conn)
        .await?;

    tracing::info!(entity = E::NAME, id, "Soft-deleted");
    find::<E, _>(conn, id, Visibility::IncludeDeleted).await
}

/// Clears the deletion timestamp. Restoring a live row is `AlreadyInState`.
pub async fn restore<E, C>(conn: &C, id: i32) -> AppResult<E::Model>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    let model = find_for_update::<E, _>(conn, id, Visibility::IncludeDeleted).await?;
    if !E::is_deleted(&model) {
        return Err(AppError::AlreadyInState(format!("{} is not deleted", E::NAME)));
    }

    E::update_many()
        .col_expr(
            E::deleted_at_column(),
            Expr::value(Option::<DateTimeWithTimeZone>::None),
        )
        .filter(E::id_column().eq(id))
        .exec(conn)
        .await?;

    tracing::info!(entity = E::NAME, id, "Restored");
    find::<E, _>(conn, id, Visibility::ActiveOnly).await
}
