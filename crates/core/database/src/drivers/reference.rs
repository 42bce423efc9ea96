use std::{collections::HashMap, sync::Arc};

use futures::lock::Mutex;

use crate::{Notification, Post, Report, User};

database_derived!(
    /// Reference implementation
    ///
    /// Each table is guarded by its own mutex; read-modify-write
    /// operations hold the lock for their whole critical section,
    /// which serializes concurrent mutations per aggregate.
    #[derive(Default)]
    pub struct ReferenceDb {
        pub users: Arc<Mutex<HashMap<String, User>>>,
        pub posts: Arc<Mutex<HashMap<String, Post>>>,
        pub reports: Arc<Mutex<HashMap<String, Report>>>,
        pub notifications: Arc<Mutex<HashMap<String, Notification>>>,
    }
);

impl ReferenceDb {
    /// Wipe all tables
    pub async fn clear(&self) {
        self.users.lock().await.clear();
        self.posts.lock().await.clear();
        self.reports.lock().await.clear();
        self.notifications.lock().await.clear();
    }
}
