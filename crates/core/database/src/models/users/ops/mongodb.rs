use bson::to_document;
use quad_result::Result;

use crate::MongoDb;
use crate::{PartialUser, User};

use super::AbstractUsers;

static COL: &str = "users";

#[async_trait]
impl AbstractUsers for MongoDb {
    /// Insert a new user into the database
    async fn insert_user(&self, user: &User) -> Result<()> {
        query!(self, insert_one, COL, &user).map(|_| ())
    }

    /// Fetch a user from the database
    async fn fetch_user(&self, id: &str) -> Result<User> {
        query!(self, find_one_by_id, COL, id)?.ok_or_else(|| create_error!(NotFound))
    }

    /// Fetch multiple users by their ids, skipping any that are missing
    async fn fetch_users(&self, ids: &[String]) -> Result<Vec<User>> {
        query!(
            self,
            find,
            COL,
            doc! {
                "_id": {
                    "$in": ids
                }
            }
        )
    }

    /// Update a given user with new information
    async fn update_user(&self, id: &str, partial: &PartialUser) -> Result<()> {
        let partial =
            to_document(partial).map_err(|_| create_database_error!("to_document", COL))?;

        query!(
            self,
            update_one_by_id,
            COL,
            id,
            doc! {
                "$set": partial
            }
        )
        .and_then(|result| {
            if result.matched_count == 0 {
                Err(create_error!(NotFound))
            } else {
                Ok(())
            }
        })
    }

    /// Flip membership of `target` in the user's block set,
    /// returning the resulting membership
    ///
    /// Both updates guard on current membership, so concurrent toggles
    /// serialize into some definite order; if neither matches, the state
    /// changed under us and we try again.
    async fn toggle_block(&self, user: &str, target: &str) -> Result<bool> {
        loop {
            let removed = query!(
                self,
                update_one,
                COL,
                doc! {
                    "_id": user,
                    "blocked_users": target
                },
                doc! {
                    "$pull": {
                        "blocked_users": target
                    }
                }
            )?;

            if removed.modified_count > 0 {
                return Ok(false);
            }

            let added = query!(
                self,
                update_one,
                COL,
                doc! {
                    "_id": user,
                    "blocked_users": {
                        "$ne": target
                    }
                },
                doc! {
                    "$addToSet": {
                        "blocked_users": target
                    }
                }
            )?;

            if added.modified_count > 0 {
                return Ok(true);
            }

            self.fetch_user(user).await?;
        }
    }

    /// Add `target` to the user's block set if not already present
    async fn add_block(&self, user: &str, target: &str) -> Result<()> {
        query!(
            self,
            update_one_by_id,
            COL,
            user,
            doc! {
                "$addToSet": {
                    "blocked_users": target
                }
            }
        )
        .and_then(|result| {
            if result.matched_count == 0 {
                Err(create_error!(NotFound))
            } else {
                Ok(())
            }
        })
    }

    /// Fetch every non-deleted user other than `exclude`
    async fn fetch_discover_candidates(&self, exclude: &str) -> Result<Vec<User>> {
        query!(
            self,
            find,
            COL,
            doc! {
                "_id": {
                    "$ne": exclude
                },
                "is_deleted": {
                    "$ne": true
                }
            }
        )
    }
}
