use quad_result::Result;

use crate::ReferenceDb;
use crate::{PartialUser, User};

use super::AbstractUsers;

#[async_trait]
impl AbstractUsers for ReferenceDb {
    /// Insert a new user into the database
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.id) {
            Err(create_database_error!("insert", "users"))
        } else {
            users.insert(user.id.to_string(), user.clone());
            Ok(())
        }
    }

    /// Fetch a user from the database
    async fn fetch_user(&self, id: &str) -> Result<User> {
        let users = self.users.lock().await;
        users
            .get(id)
            .cloned()
            .ok_or_else(|| create_error!(NotFound))
    }

    /// Fetch multiple users by their ids, skipping any that are missing
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<User>> {
        let users = self.users.lock().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    /// Update a given user with new information
    async fn update_user(&self, id: &str, partial: &PartialUser) -> Result<()> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(id) {
            user.apply_options(partial.clone());
            Ok(())
        } else {
            Err(create_error!(NotFound))
        }
    }

    /// Flip membership of `target` in the user's block set,
    /// returning the resulting membership
    async fn toggle_block(&self, user: &str, target: &str) -> Result<bool> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(user) {
            if user.blocked_users.shift_remove(target) {
                Ok(false)
            } else {
                user.blocked_users.insert(target.to_string());
                Ok(true)
            }
        } else {
            Err(create_error!(NotFound))
        }
    }

    /// Add `target` to the user's block set if not already present
    async fn add_block(&self, user: &str, target: &str) -> Result<()> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(user) {
            user.blocked_users.insert(target.to_string());
            Ok(())
        } else {
            Err(create_error!(NotFound))
        }
    }

    /// Fetch every non-deleted user other than `exclude`
    async fn fetch_discover_candidates(&self, exclude: &str) -> Result<Vec<User>> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .filter(|user| user.id != exclude && !user.is_deleted)
            .cloned()
            .collect())
    }
}
