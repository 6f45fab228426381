pub mod auth;
pub mod booking;
pub mod payment;
pub mod user;
pub mod vehicle;

use serde::Deserialize;

use crate::db::Visibility;

/// `?include_deleted=true` or `?only_deleted=true` on list and get endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_deleted: bool,
    #[serde(default)]
    pub only_deleted: bool,
}

impl ListQuery {
    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.include_deleted, self.only_deleted)
    }
}
