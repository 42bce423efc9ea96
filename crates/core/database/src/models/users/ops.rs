use quad_result::Result;

use crate::{PartialUser, User};

#[cfg(feature = "mongodb")]
mod mongodb;
mod reference;

#[async_trait]
pub trait AbstractUsers: Sync + Send {
    /// Insert a new user into the database
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Fetch a user from the database
    async fn fetch_user(&self, id: &str) -> Result<User>;

    /// Fetch multiple users by their ids, skipping any that are missing
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<User>>;

    /// Update a given user with new information
    async fn update_user(&self, id: &str, partial: &PartialUser) -> Result<()>;

    /// Flip membership of `target` in the user's block set,
    /// returning the resulting membership
    async fn toggle_block(&self, user: &str, target: &str) -> Result<bool>;

    /// Add `target` to the user's block set if not already present
    async fn add_block(&self, user: &str, target: &str) -> Result<()>;

    /// Fetch every non-deleted user other than `exclude`
    async fn fetch_discover_candidates(&self, exclude: &str) -> Result<Vec<User>>;
}
