use quad_result::Result;

use crate::{Comment, PartialPost, Post, Reply};

#[cfg(feature = "mongodb")]
mod mongodb;
mod reference;

#[async_trait]
pub trait AbstractPosts: Sync + Send {
    /// Insert a new post into the database
    async fn insert_post(&self, post: &Post) -> Result<()>;

    /// Fetch a post by its id
    async fn fetch_post(&self, id: &str) -> Result<Post>;

    /// Fetch a user's posts, newest first
    async fn fetch_posts_by_author(&self, author: &str) -> Result<Vec<Post>>;

    /// Fetch all posts except those by the given authors, newest first
    async fn fetch_feed(&self, blocked_authors: &[String]) -> Result<Vec<Post>>;

    /// Update a given post with new information
    async fn update_post(&self, id: &str, partial: &PartialPost) -> Result<()>;

    /// Delete a post and thereby everything nested in it
    async fn delete_post(&self, id: &str) -> Result<()>;

    /// Flip membership of `user` in the post's like set,
    /// returning the resulting membership
    async fn toggle_like(&self, post: &str, user: &str) -> Result<bool>;

    /// Append a comment to a post
    async fn add_comment(&self, post: &str, comment: &Comment) -> Result<()>;

    /// Append a reply to a comment within a post
    async fn add_reply(&self, post: &str, comment: &str, reply: &Reply) -> Result<()>;

    /// Remove a comment and all of its replies from a post
    async fn delete_comment(&self, post: &str, comment: &str) -> Result<()>;
}
