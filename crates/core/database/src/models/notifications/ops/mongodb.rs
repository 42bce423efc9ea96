use mongodb::options::FindOptions;
use quad_result::Result;

use crate::MongoDb;
use crate::Notification;

use super::AbstractNotifications;

static COL: &str = "notifications";

#[async_trait]
impl AbstractNotifications for MongoDb {
    /// Insert a new notification into the database
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        query!(self, insert_one, COL, &notification).map(|_| ())
    }

    /// Fetch a notification by its id
    async fn fetch_notification(&self, id: &str) -> Result<Notification> {
        query!(self, find_one_by_id, COL, id)?.ok_or_else(|| create_error!(NotFound))
    }

    /// Fetch all of a user's notifications, newest first
    async fn fetch_notifications_by_user(&self, user: &str) -> Result<Vec<Notification>> {
        query!(
            self,
            find_with_options,
            COL,
            doc! {
                "user": user
            },
            FindOptions::builder()
                .sort(doc! {
                    "created_at": -1_i32
                })
                .build()
        )
    }

    /// Mark a notification as read
    async fn mark_notification_read(&self, id: &str) -> Result<()> {
        query!(
            self,
            update_one_by_id,
            COL,
            id,
            doc! {
                "$set": {
                    "read": true
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

    /// Mark all of a user's unread notifications as read,
    /// returning how many were affected
    async fn mark_notifications_read(&self, user: &str) -> Result<usize> {
        query!(
            self,
            update_many,
            COL,
            doc! {
                "user": user,
                "read": {
                    "$ne": true
                }
            },
            doc! {
                "$set": {
                    "read": true
                }
            }
        )
        .map(|result| result.modified_count as usize)
    }
}
