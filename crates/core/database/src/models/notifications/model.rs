use iso8601_timestamp::Timestamp;
use quad_config::config;
use quad_result::Result;
use ulid::Ulid;

use crate::{Database, User};

auto_derived!(
    /// Kind of event a notification describes
    #[serde(rename_all = "snake_case")]
    pub enum NotificationKind {
        Like,
        Comment,
        Reply,
        DirectMessage,
    }

    /// # Notification
    pub struct Notification {
        /// Unique Id
        #[serde(rename = "_id")]
        pub id: String,
        /// Id of the recipient
        pub user: String,
        /// Id of the user who triggered it
        pub from_user: String,
        /// Kind of event
        #[serde(rename = "type")]
        pub kind: NotificationKind,
        /// Related post, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        pub post: Option<String>,
        /// Related comment, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        pub comment_id: Option<String>,
        /// Human-readable text shown in the UI
        pub message: String,
        /// Whether the recipient has read this notification
        #[serde(skip_serializing_if = "crate::if_false", default)]
        pub read: bool,
        /// When this notification was created
        pub created_at: Timestamp,
    }
);

impl Notification {
    /// Record an event against another user's content
    ///
    /// Returns `None` if the notification was suppressed because the
    /// actor is also the recipient; whether that happens is driven by
    /// configuration, not fixed here.
    pub async fn create(
        db: &Database,
        recipient: &str,
        actor: &User,
        kind: NotificationKind,
        post: Option<String>,
        comment_id: Option<String>,
        message: String,
    ) -> Result<Option<Notification>> {
        if recipient == actor.id && config().await.notifications.suppress_self {
            return Ok(None);
        }

        let notification = Notification {
            id: Ulid::new().to_string(),
            user: recipient.to_string(),
            from_user: actor.id.to_string(),
            kind,
            post,
            comment_id,
            message,
            read: false,
            created_at: Timestamp::now_utc(),
        };

        db.insert_notification(&notification).await?;
        Ok(Some(notification))
    }

    /// Mark this notification as read
    ///
    /// Only the recipient may do so; marking twice is a no-op.
    pub async fn mark_read(&mut self, db: &Database, requester: &str) -> Result<()> {
        if self.user != requester {
            return Err(create_error!(Forbidden));
        }

        if !self.read {
            db.mark_notification_read(&self.id).await?;
            self.read = true;
        }

        Ok(())
    }

    /// Mark all of a user's notifications as read,
    /// returning how many were affected
    pub async fn mark_all_read(db: &Database, requester: &str) -> Result<usize> {
        db.mark_notifications_read(requester).await
    }

    /// Fetch all of a user's notifications, newest first
    pub async fn fetch_mine(db: &Database, user: &str) -> Result<Vec<Notification>> {
        db.fetch_notifications_by_user(user).await
    }
}

#[cfg(test)]
mod tests {
    use quad_result::ErrorType;

    use crate::{Notification, NotificationKind, User};

    async fn create_user(db: &crate::Database, name: &str) -> User {
        User::create(
            db,
            name.to_string(),
            format!("{}@campus.edu", name.to_lowercase()),
            None,
        )
        .await
        .unwrap()
    }

    async fn notify(db: &crate::Database, recipient: &str, actor: &User) -> Option<Notification> {
        Notification::create(
            db,
            recipient,
            actor,
            NotificationKind::Like,
            None,
            None,
            format!("{} liked your post", actor.name),
        )
        .await
        .unwrap()
    }

    #[async_std::test]
    async fn self_notifications_are_suppressed_by_config() {
        database_test!(|db| async move {
            let alice = create_user(&db, "Alice").await;

            // Default configuration drops self-notifications
            let id = alice.id.clone();
            assert!(notify(&db, &id, &alice).await.is_none());
            assert!(Notification::fetch_mine(&db, &alice.id)
                .await
                .unwrap()
                .is_empty());
        });
    }

    #[async_std::test]
    async fn mark_read_is_owner_only_and_idempotent() {
        database_test!(|db| async move {
            let alice = create_user(&db, "Alice").await;
            let bob = create_user(&db, "Bob").await;

            let mut notification = notify(&db, &alice.id, &bob).await.unwrap();
            assert!(!notification.read);

            let error = notification.mark_read(&db, &bob.id).await.unwrap_err();
            assert!(matches!(error.error_type, ErrorType::Forbidden));

            notification.mark_read(&db, &alice.id).await.unwrap();
            notification.mark_read(&db, &alice.id).await.unwrap();

            let fetched = db.fetch_notification(&notification.id).await.unwrap();
            assert!(fetched.read);
        });
    }

    #[async_std::test]
    async fn mark_all_read_returns_affected_count() {
        database_test!(|db| async move {
            let alice = create_user(&db, "Alice").await;
            let bob = create_user(&db, "Bob").await;

            let mut first = notify(&db, &alice.id, &bob).await.unwrap();
            notify(&db, &alice.id, &bob).await.unwrap();
            notify(&db, &alice.id, &bob).await.unwrap();
            notify(&db, &bob.id, &alice).await.unwrap();

            // One of the three is already read
            first.mark_read(&db, &alice.id).await.unwrap();

            assert_eq!(Notification::mark_all_read(&db, &alice.id).await.unwrap(), 2);
            assert_eq!(Notification::mark_all_read(&db, &alice.id).await.unwrap(), 0);

            // Bob's inbox is untouched
            let inbox = Notification::fetch_mine(&db, &bob.id).await.unwrap();
            assert!(!inbox[0].read);
        });
    }

    #[async_std::test]
    async fn inbox_is_newest_first() {
        database_test!(|db| async move {
            let alice = create_user(&db, "Alice").await;
            let bob = create_user(&db, "Bob").await;

            let first = notify(&db, &alice.id, &bob).await.unwrap();
            async_std::task::sleep(std::time::Duration::from_millis(5)).await;
            let second = notify(&db, &alice.id, &bob).await.unwrap();

            let inbox = Notification::fetch_mine(&db, &alice.id).await.unwrap();
            assert_eq!(inbox[0].id, second.id);
            assert_eq!(inbox[1].id, first.id);
        });
    }

    #[async_std::test]
    async fn marking_missing_notification_fails() {
        database_test!(|db| async move {
            let error = db.fetch_notification("01MISSING").await.unwrap_err();
            assert!(matches!(error.error_type, ErrorType::NotFound));

            let error = db.mark_notification_read("01MISSING").await.unwrap_err();
            assert!(matches!(error.error_type, ErrorType::NotFound));
        });
    }
}
