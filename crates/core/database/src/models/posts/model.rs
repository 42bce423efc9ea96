use indexmap::IndexSet;
use iso8601_timestamp::{Duration, Timestamp};
use quad_config::config;
use quad_result::Result;
use ulid::Ulid;

use crate::{Database, Notification, NotificationKind, User};

auto_derived!(
    /// # Post
    ///
    /// A post owns its comments and replies; they are only ever
    /// addressed through the post and vanish with it.
    pub struct Post {
        /// Unique Id
        #[serde(rename = "_id")]
        pub id: String,
        /// Author snapshot taken at creation time
        pub author: AuthorInfo,
        /// Title
        pub title: String,
        /// Body text
        pub body: String,

        /// Whether this post has been edited
        #[serde(skip_serializing_if = "crate::if_false", default)]
        pub edited: bool,

        /// Ids of users who like this post
        #[serde(skip_serializing_if = "IndexSet::is_empty", default)]
        pub likes: IndexSet<String>,
        /// Comments in creation order
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        pub comments: Vec<Comment>,

        /// When this post was created
        pub created_at: Timestamp,
    }

    /// Comment on a post
    pub struct Comment {
        /// Unique Id within the parent post's lifetime
        #[serde(rename = "_id")]
        pub id: String,
        /// Author snapshot taken at creation time
        pub author: AuthorInfo,
        /// Comment text
        pub text: String,
        /// Replies in creation order
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        pub replies: Vec<Reply>,
        /// When this comment was created
        pub created_at: Timestamp,
    }

    /// Reply to a comment
    pub struct Reply {
        /// Unique Id within the parent post's lifetime
        #[serde(rename = "_id")]
        pub id: String,
        /// Author snapshot taken at creation time
        pub author: AuthorInfo,
        /// Reply text
        pub text: String,
        /// When this reply was created
        pub created_at: Timestamp,
    }

    /// Author details captured at creation time, never re-resolved
    pub struct AuthorInfo {
        pub id: String,
        pub name: String,
        pub email: String,
    }

    /// Optional fields on a post
    #[derive(Default)]
    pub struct PartialPost {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub body: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub edited: Option<bool>,
    }
);

impl From<&User> for AuthorInfo {
    fn from(user: &User) -> Self {
        AuthorInfo {
            id: user.id.to_string(),
            name: user.name.to_string(),
            email: user.email.to_string(),
        }
    }
}

impl PartialPost {
    /// Trim incoming text fields, dropping those which become empty
    fn normalize(&mut self) {
        if let Some(title) = &self.title {
            let title = title.trim();
            self.title = if title.is_empty() {
                None
            } else {
                Some(title.to_string())
            };
        }

        if let Some(body) = &self.body {
            let body = body.trim();
            self.body = if body.is_empty() {
                None
            } else {
                Some(body.to_string())
            };
        }
    }
}

impl Post {
    /// Create a new post
    pub async fn create(
        db: &Database,
        author: &User,
        title: String,
        body: String,
    ) -> Result<Post> {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(create_error!(InvalidInput {
                error: "title must not be empty".to_string()
            }));
        }

        let body = body.trim().to_string();
        if body.is_empty() {
            return Err(create_error!(InvalidInput {
                error: "body must not be empty".to_string()
            }));
        }

        let post = Post {
            id: Ulid::new().to_string(),
            author: author.into(),
            title,
            body,
            edited: false,
            likes: IndexSet::new(),
            comments: vec![],
            created_at: Timestamp::now_utc(),
        };

        db.insert_post(&post).await?;
        Ok(post)
    }

    /// Apply partial data to this post
    pub fn apply_options(&mut self, partial: PartialPost) {
        if let Some(title) = partial.title {
            self.title = title;
        }

        if let Some(body) = partial.body {
            self.body = body;
        }

        if let Some(edited) = partial.edited {
            self.edited = edited;
        }
    }

    /// Edit this post, marking it as edited
    ///
    /// Only the author may edit their post. Fields which trim down to
    /// nothing are dropped, so the stored value is kept rather than
    /// blanked out.
    pub async fn update(
        &mut self,
        db: &Database,
        requester: &str,
        mut partial: PartialPost,
    ) -> Result<()> {
        if self.author.id != requester {
            return Err(create_error!(Forbidden));
        }

        partial.normalize();
        partial.edited = Some(true);

        self.apply_options(partial.clone());
        db.update_post(&self.id, &partial).await
    }

    /// Delete this post along with all of its comments and replies
    ///
    /// Only the author may delete their post.
    pub async fn delete(&self, db: &Database, requester: &str) -> Result<()> {
        if self.author.id != requester {
            return Err(create_error!(Forbidden));
        }

        db.delete_post(&self.id).await
    }

    /// Flip whether `user` likes this post, returning the resulting state
    pub async fn toggle_like(&mut self, db: &Database, user: &User) -> Result<bool> {
        let liked = db.toggle_like(&self.id, &user.id).await?;
        if liked {
            self.likes.insert(user.id.to_string());

            Notification::create(
                db,
                &self.author.id,
                user,
                NotificationKind::Like,
                Some(self.id.to_string()),
                None,
                format!("{} liked your post \"{}\"", user.name, self.title),
            )
            .await?;
        } else {
            self.likes.shift_remove(&user.id);
        }

        Ok(liked)
    }

    /// Append a comment to this post
    pub async fn add_comment(
        &mut self,
        db: &Database,
        author: &User,
        text: String,
    ) -> Result<Comment> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(create_error!(InvalidInput {
                error: "comment text must not be empty".to_string()
            }));
        }

        let comment = Comment {
            id: Ulid::new().to_string(),
            author: author.into(),
            text,
            replies: vec![],
            created_at: Timestamp::now_utc(),
        };

        db.add_comment(&self.id, &comment).await?;
        self.comments.push(comment.clone());

        Notification::create(
            db,
            &self.author.id,
            author,
            NotificationKind::Comment,
            Some(self.id.to_string()),
            Some(comment.id.to_string()),
            format!("{} commented on your post \"{}\"", author.name, self.title),
        )
        .await?;

        Ok(comment)
    }

    /// Append a reply to one of this post's comments
    pub async fn reply_to_comment(
        &mut self,
        db: &Database,
        comment_id: &str,
        author: &User,
        text: String,
    ) -> Result<Reply> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(create_error!(InvalidInput {
                error: "reply text must not be empty".to_string()
            }));
        }

        let recipient = self
            .comments
            .iter()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| create_error!(NotFound))?
            .author
            .id
            .to_string();

        let reply = Reply {
            id: Ulid::new().to_string(),
            author: author.into(),
            text,
            created_at: Timestamp::now_utc(),
        };

        db.add_reply(&self.id, comment_id, &reply).await?;

        if let Some(comment) = self
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
        {
            comment.replies.push(reply.clone());
        }

        Notification::create(
            db,
            &recipient,
            author,
            NotificationKind::Reply,
            Some(self.id.to_string()),
            Some(comment_id.to_string()),
            format!("{} replied to your comment", author.name),
        )
        .await?;

        Ok(reply)
    }

    /// Remove a comment and all of its replies in one operation
    ///
    /// Allowed for the comment's author and for the post's author.
    pub async fn delete_comment(
        &mut self,
        db: &Database,
        comment_id: &str,
        requester: &str,
    ) -> Result<()> {
        let comment = self
            .comments
            .iter()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| create_error!(NotFound))?;

        if comment.author.id != requester && self.author.id != requester {
            return Err(create_error!(Forbidden));
        }

        db.delete_comment(&self.id, comment_id).await?;
        self.comments.retain(|comment| comment.id != comment_id);
        Ok(())
    }

    /// Fetch the viewer's feed, hiding posts from authors they blocked
    pub async fn fetch_feed(db: &Database, viewer: &User) -> Result<Vec<Post>> {
        let limit = config().await.features.limits.default.feed_posts;

        let blocked: Vec<String> = viewer.blocked_users.iter().cloned().collect();
        let mut posts = db.fetch_feed(&blocked).await?;
        posts.truncate(limit);
        Ok(posts)
    }

    /// Fetch a user's own posts, newest first
    pub async fn fetch_by_author(db: &Database, author: &str) -> Result<Vec<Post>> {
        db.fetch_posts_by_author(author).await
    }

    /// Engagement score with recency decay
    ///
    /// Likes weigh 2, comments weigh 3; the sum halves every
    /// `half_life_hours` since creation.
    pub fn trending_score(&self, now: Timestamp, half_life_hours: u64) -> f64 {
        let engagement = (self.likes.len() * 2 + self.comments.len() * 3) as f64;

        let age = now
            .duration_since(self.created_at)
            .max(Duration::ZERO)
            .whole_seconds() as f64;
        let half_life = (half_life_hours * 3600) as f64;

        engagement * 0.5_f64.powf(age / half_life)
    }

    /// Fetch posts ranked by trending score, ties broken newest first
    pub async fn fetch_trending(db: &Database) -> Result<Vec<Post>> {
        let settings = config().await;
        let limit = settings.features.limits.default.trending_posts;
        let half_life_hours = settings.features.trending.half_life_hours;

        let now = Timestamp::now_utc();
        let mut scored: Vec<(f64, Post)> = db
            .fetch_feed(&[])
            .await?
            .into_iter()
            .map(|post| (post.trending_score(now, half_life_hours), post))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.created_at.cmp(&a.1.created_at))
                .then_with(|| b.1.id.cmp(&a.1.id))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, post)| post)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexSet;
    use iso8601_timestamp::{Duration, Timestamp};
    use quad_result::ErrorType;

    use crate::{AuthorInfo, Comment, Notification, PartialPost, Post, User};

    fn local_post(id: &str, created_at: Timestamp) -> Post {
        Post {
            id: id.to_string(),
            author: AuthorInfo {
                id: "author".to_string(),
                name: "Author".to_string(),
                email: "author@campus.edu".to_string(),
            },
            title: "Title".to_string(),
            body: "Body".to_string(),
            edited: false,
            likes: IndexSet::new(),
            comments: vec![],
            created_at,
        }
    }

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

    #[async_std::test]
    async fn create_rejects_empty_fields() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;

            for (title, body) in [("  ", "body"), ("title", "\n")] {
                let error = Post::create(&db, &author, title.to_string(), body.to_string())
                    .await
                    .unwrap_err();
                assert!(matches!(error.error_type, ErrorType::InvalidInput { .. }));
            }
        });
    }

    #[async_std::test]
    async fn edit_requires_ownership_and_sets_flag() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;
            let other = create_user(&db, "Bob").await;

            let mut post = Post::create(&db, &author, "Title".to_string(), "Body".to_string())
                .await
                .unwrap();
            assert!(!post.edited);

            let error = post
                .update(
                    &db,
                    &other.id,
                    PartialPost {
                        title: Some("Hijacked".to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(error.error_type, ErrorType::Forbidden));

            post.update(
                &db,
                &author.id,
                PartialPost {
                    title: Some("New title".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

            let fetched = db.fetch_post(&post.id).await.unwrap();
            assert_eq!(fetched.title, "New title");
            assert_eq!(fetched.body, "Body");
            assert!(fetched.edited);

            // A whitespace-only field keeps the stored value
            post.update(
                &db,
                &author.id,
                PartialPost {
                    title: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

            let fetched = db.fetch_post(&post.id).await.unwrap();
            assert_eq!(fetched.title, "New title");
        });
    }

    #[async_std::test]
    async fn like_toggle_roundtrip() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;
            let liker = create_user(&db, "Bob").await;

            let mut post = Post::create(&db, &author, "Title".to_string(), "Body".to_string())
                .await
                .unwrap();

            assert!(post.toggle_like(&db, &liker).await.unwrap());
            let fetched = db.fetch_post(&post.id).await.unwrap();
            assert!(fetched.likes.contains(&liker.id));
            assert_eq!(fetched.likes.len(), 1);

            assert!(!post.toggle_like(&db, &liker).await.unwrap());
            let fetched = db.fetch_post(&post.id).await.unwrap();
            assert!(fetched.likes.is_empty());
        });
    }

    #[async_std::test]
    async fn concurrent_likes_from_different_users_both_apply() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;
            let bob = create_user(&db, "Bob").await;
            let carol = create_user(&db, "Carol").await;

            let post = Post::create(&db, &author, "Title".to_string(), "Body".to_string())
                .await
                .unwrap();

            let (a, b) = futures::join!(
                db.toggle_like(&post.id, &bob.id),
                db.toggle_like(&post.id, &carol.id)
            );
            assert!(a.unwrap());
            assert!(b.unwrap());

            let fetched = db.fetch_post(&post.id).await.unwrap();
            assert_eq!(fetched.likes.len(), 2);
        });
    }

    #[async_std::test]
    async fn concurrent_toggles_from_same_user_never_duplicate() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;
            let bob = create_user(&db, "Bob").await;

            let post = Post::create(&db, &author, "Title".to_string(), "Body".to_string())
                .await
                .unwrap();

            let (a, b) = futures::join!(
                db.toggle_like(&post.id, &bob.id),
                db.toggle_like(&post.id, &bob.id)
            );

            // One call likes, the other unlikes, in some definite order
            assert_ne!(a.unwrap(), b.unwrap());

            let fetched = db.fetch_post(&post.id).await.unwrap();
            assert!(fetched.likes.is_empty());
        });
    }

    #[async_std::test]
    async fn comment_emits_notification_and_deletes_cleanly() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;
            let commenter = create_user(&db, "Bob").await;

            let mut post = Post::create(&db, &author, "Title".to_string(), "Body".to_string())
                .await
                .unwrap();

            let comment = post
                .add_comment(&db, &commenter, "hi".to_string())
                .await
                .unwrap();
            assert_eq!(comment.author.id, commenter.id);

            let inbox = Notification::fetch_mine(&db, &author.id).await.unwrap();
            assert_eq!(inbox.len(), 1);
            assert_eq!(inbox[0].from_user, commenter.id);

            post.delete_comment(&db, &comment.id, &author.id)
                .await
                .unwrap();

            let fetched = db.fetch_post(&post.id).await.unwrap();
            assert!(fetched.comments.is_empty());
        });
    }

    #[async_std::test]
    async fn comment_validates_text_and_post_presence() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;

            let mut post = Post::create(&db, &author, "Title".to_string(), "Body".to_string())
                .await
                .unwrap();

            let error = post
                .add_comment(&db, &author, "   ".to_string())
                .await
                .unwrap_err();
            assert!(matches!(error.error_type, ErrorType::InvalidInput { .. }));

            db.delete_post(&post.id).await.unwrap();
            let error = post
                .add_comment(&db, &author, "hello".to_string())
                .await
                .unwrap_err();
            assert!(matches!(error.error_type, ErrorType::NotFound));
        });
    }

    #[async_std::test]
    async fn reply_rejects_empty_text() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;
            let commenter = create_user(&db, "Bob").await;

            let mut post = Post::create(&db, &author, "Title".to_string(), "Body".to_string())
                .await
                .unwrap();
            let comment = post
                .add_comment(&db, &commenter, "hi".to_string())
                .await
                .unwrap();

            let error = post
                .reply_to_comment(&db, &comment.id, &author, " \n ".to_string())
                .await
                .unwrap_err();
            assert!(matches!(error.error_type, ErrorType::InvalidInput { .. }));

            let fetched = db.fetch_post(&post.id).await.unwrap();
            assert!(fetched.comments[0].replies.is_empty());
        });
    }

    #[async_std::test]
    async fn replies_cascade_with_their_comment() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;
            let commenter = create_user(&db, "Bob").await;

            let mut post = Post::create(&db, &author, "Title".to_string(), "Body".to_string())
                .await
                .unwrap();

            let comment = post
                .add_comment(&db, &commenter, "hi".to_string())
                .await
                .unwrap();
            let reply = post
                .reply_to_comment(&db, &comment.id, &author, "hello".to_string())
                .await
                .unwrap();

            let fetched = db.fetch_post(&post.id).await.unwrap();
            assert_eq!(fetched.comments[0].replies[0].id, reply.id);

            // The reply notified the comment's author
            let inbox = Notification::fetch_mine(&db, &commenter.id).await.unwrap();
            assert_eq!(inbox.len(), 1);

            post.delete_comment(&db, &comment.id, &commenter.id)
                .await
                .unwrap();

            let fetched = db.fetch_post(&post.id).await.unwrap();
            assert!(fetched.comments.is_empty());

            let error = post
                .reply_to_comment(&db, &comment.id, &author, "again".to_string())
                .await
                .unwrap_err();
            assert!(matches!(error.error_type, ErrorType::NotFound));
        });
    }

    #[async_std::test]
    async fn delete_comment_requires_comment_or_post_author() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;
            let commenter = create_user(&db, "Bob").await;
            let stranger = create_user(&db, "Carol").await;

            let mut post = Post::create(&db, &author, "Title".to_string(), "Body".to_string())
                .await
                .unwrap();
            let comment = post
                .add_comment(&db, &commenter, "hi".to_string())
                .await
                .unwrap();

            let error = post
                .delete_comment(&db, &comment.id, &stranger.id)
                .await
                .unwrap_err();
            assert!(matches!(error.error_type, ErrorType::Forbidden));

            // The post author may remove anyone's comment
            post.delete_comment(&db, &comment.id, &author.id)
                .await
                .unwrap();

            let error = post
                .delete_comment(&db, &comment.id, &author.id)
                .await
                .unwrap_err();
            assert!(matches!(error.error_type, ErrorType::NotFound));
        });
    }

    #[async_std::test]
    async fn feed_hides_blocked_authors() {
        database_test!(|db| async move {
            let mut viewer = create_user(&db, "Alice").await;
            let friend = create_user(&db, "Bob").await;
            let blocked = create_user(&db, "Carol").await;

            Post::create(&db, &friend, "Visible".to_string(), "Body".to_string())
                .await
                .unwrap();
            Post::create(&db, &blocked, "Hidden".to_string(), "Body".to_string())
                .await
                .unwrap();

            viewer.toggle_block(&db, &blocked.id).await.unwrap();

            let feed = Post::fetch_feed(&db, &viewer).await.unwrap();
            assert_eq!(feed.len(), 1);
            assert_eq!(feed[0].author.id, friend.id);

            // The relation is one-directional: the blocked user still
            // sees the viewer's content
            let other_feed = Post::fetch_feed(&db, &blocked).await.unwrap();
            assert_eq!(other_feed.len(), 2);
        });
    }

    #[async_std::test]
    async fn my_posts_are_newest_first() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;

            let first = Post::create(&db, &author, "First".to_string(), "Body".to_string())
                .await
                .unwrap();
            async_std::task::sleep(std::time::Duration::from_millis(5)).await;
            let second = Post::create(&db, &author, "Second".to_string(), "Body".to_string())
                .await
                .unwrap();

            let posts = Post::fetch_by_author(&db, &author.id).await.unwrap();
            assert_eq!(posts.len(), 2);
            assert_eq!(posts[0].id, second.id);
            assert_eq!(posts[1].id, first.id);
        });
    }

    #[async_std::test]
    async fn delete_post_removes_whole_aggregate() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;
            let other = create_user(&db, "Bob").await;

            let mut post = Post::create(&db, &author, "Title".to_string(), "Body".to_string())
                .await
                .unwrap();
            post.add_comment(&db, &other, "hi".to_string())
                .await
                .unwrap();

            let error = post.delete(&db, &other.id).await.unwrap_err();
            assert!(matches!(error.error_type, ErrorType::Forbidden));

            post.delete(&db, &author.id).await.unwrap();
            assert!(db.fetch_post(&post.id).await.is_err());
        });
    }

    #[test]
    fn trending_weighs_engagement_and_decay() {
        let now = Timestamp::now_utc();

        let fresh = local_post("B", now);
        let stale = local_post("A", now + Duration::hours(-24));

        // 2 likes + 1 comment = 7 points, halved after one day
        let mut engaged = stale.clone();
        engaged.likes.extend(["u1".to_string(), "u2".to_string()]);
        engaged.comments.push(Comment {
            id: "C".to_string(),
            author: engaged.author.clone(),
            text: "hi".to_string(),
            replies: vec![],
            created_at: now,
        });
        let decayed = engaged.trending_score(now, 24);
        assert!((decayed - 3.5).abs() < 0.01);

        // A fresh post with a single like still trails it
        let mut liked = fresh.clone();
        liked.likes.insert("u1".to_string());
        assert!(liked.trending_score(now, 24) < decayed);

        // But two fresh likes overtake the decayed engagement
        liked.likes.insert("u2".to_string());
        assert!(liked.trending_score(now, 24) > decayed);

        // Zero engagement scores zero regardless of age
        assert_eq!(fresh.trending_score(now, 24), 0.0);
    }

    #[async_std::test]
    async fn trending_orders_by_score_then_recency() {
        database_test!(|db| async move {
            let author = create_user(&db, "Alice").await;
            let liker = create_user(&db, "Bob").await;

            let quiet = Post::create(&db, &author, "Quiet".to_string(), "Body".to_string())
                .await
                .unwrap();
            async_std::task::sleep(std::time::Duration::from_millis(5)).await;
            let newer_quiet =
                Post::create(&db, &author, "Newer quiet".to_string(), "Body".to_string())
                    .await
                    .unwrap();
            let mut popular =
                Post::create(&db, &author, "Popular".to_string(), "Body".to_string())
                    .await
                    .unwrap();
            popular.toggle_like(&db, &liker).await.unwrap();

            let trending = Post::fetch_trending(&db).await.unwrap();
            assert_eq!(trending.len(), 3);
            assert_eq!(trending[0].id, popular.id);

            // Equal scores fall back to newest first
            assert_eq!(trending[1].id, newer_quiet.id);
            assert_eq!(trending[2].id, quiet.id);
        });
    }
}
