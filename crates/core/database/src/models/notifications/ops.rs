use quad_result::Result;

use crate::Notification;

#[cfg(feature = "mongodb")]
mod mongodb;
mod reference;

#[async_trait]
pub trait AbstractNotifications: Sync + Send {
    /// Insert a new notification into the database
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    /// Fetch a notification by its id
    async fn fetch_notification(&self, id: &str) -> Result<Notification>;

    /// Fetch all of a user's notifications, newest first
    async fn fetch_notifications_by_user(&self, user: &str) -> Result<Vec<Notification>>;

    /// Mark a notification as read
    async fn mark_notification_read(&self, id: &str) -> Result<()>;

    /// Mark all of a user's unread notifications as read,
    /// returning how many were affected
    async fn mark_notifications_read(&self, user: &str) -> Result<usize>;
}
