use quad_result::Result;

use crate::Notification;
use crate::ReferenceDb;

use super::AbstractNotifications;

#[async_trait]
impl AbstractNotifications for ReferenceDb {
    /// Insert a new notification into the database
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let mut notifications = self.notifications.lock().await;
        if notifications.contains_key(&notification.id) {
            Err(create_database_error!("insert", "notifications"))
        } else {
            notifications.insert(notification.id.to_string(), notification.clone());
            Ok(())
        }
    }

    /// Fetch a notification by its id
    async fn fetch_notification(&self, id: &str) -> Result<Notification> {
        let notifications = self.notifications.lock().await;
        notifications
            .get(id)
            .cloned()
            .ok_or_else(|| create_error!(NotFound))
    }

    /// Fetch all of a user's notifications, newest first
    async fn fetch_notifications_by_user(&self, user: &str) -> Result<Vec<Notification>> {
        let notifications = self.notifications.lock().await;
        let mut matched: Vec<Notification> = notifications
            .values()
            .filter(|notification| notification.user == user)
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matched)
    }

    /// Mark a notification as read
    async fn mark_notification_read(&self, id: &str) -> Result<()> {
        let mut notifications = self.notifications.lock().await;
        if let Some(notification) = notifications.get_mut(id) {
            notification.read = true;
            Ok(())
        } else {
            Err(create_error!(NotFound))
        }
    }

    /// Mark all of a user's unread notifications as read,
    /// returning how many were affected
    async fn mark_notifications_read(&self, user: &str) -> Result<usize> {
        let mut notifications = self.notifications.lock().await;
        let mut affected = 0;

        for notification in notifications.values_mut() {
            if notification.user == user && !notification.read {
                notification.read = true;
                affected += 1;
            }
        }

        Ok(affected)
    }
}
