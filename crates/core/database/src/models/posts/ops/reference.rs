use quad_result::Result;

use crate::ReferenceDb;
use crate::{Comment, PartialPost, Post, Reply};

use super::AbstractPosts;

fn newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl AbstractPosts for ReferenceDb {
    /// Insert a new post into the database
    async fn insert_post(&self, post: &Post) -> Result<()> {
        let mut posts = self.posts.lock().await;
        if posts.contains_key(&post.id) {
            Err(create_database_error!("insert", "posts"))
        } else {
            posts.insert(post.id.to_string(), post.clone());
            Ok(())
        }
    }

    /// Fetch a post by its id
    async fn fetch_post(&self, id: &str) -> Result<Post> {
        let posts = self.posts.lock().await;
        posts
            .get(id)
            .cloned()
            .ok_or_else(|| create_error!(NotFound))
    }

    /// Fetch a user's posts, newest first
    async fn fetch_posts_by_author(&self, author: &str) -> Result<Vec<Post>> {
        let posts = self.posts.lock().await;
        let mut matched: Vec<Post> = posts
            .values()
            .filter(|post| post.author.id == author)
            .cloned()
            .collect();

        newest_first(&mut matched);
        Ok(matched)
    }

    /// Fetch all posts except those by the given authors, newest first
    async fn fetch_feed(&self, blocked_authors: &[String]) -> Result<Vec<Post>> {
        let posts = self.posts.lock().await;
        let mut matched: Vec<Post> = posts
            .values()
            .filter(|post| !blocked_authors.contains(&post.author.id))
            .cloned()
            .collect();

        newest_first(&mut matched);
        Ok(matched)
    }

    /// Update a given post with new information
    async fn update_post(&self, id: &str, partial: &PartialPost) -> Result<()> {
        let mut posts = self.posts.lock().await;
        if let Some(post) = posts.get_mut(id) {
            post.apply_options(partial.clone());
            Ok(())
        } else {
            Err(create_error!(NotFound))
        }
    }

    /// Delete a post and thereby everything nested in it
    async fn delete_post(&self, id: &str) -> Result<()> {
        let mut posts = self.posts.lock().await;
        if posts.remove(id).is_some() {
            Ok(())
        } else {
            Err(create_error!(NotFound))
        }
    }

    /// Flip membership of `user` in the post's like set,
    /// returning the resulting membership
    async fn toggle_like(&self, post: &str, user: &str) -> Result<bool> {
        let mut posts = self.posts.lock().await;
        if let Some(post) = posts.get_mut(post) {
            if post.likes.shift_remove(user) {
                Ok(false)
            } else {
                post.likes.insert(user.to_string());
                Ok(true)
            }
        } else {
            Err(create_error!(NotFound))
        }
    }

    /// Append a comment to a post
    async fn add_comment(&self, post: &str, comment: &Comment) -> Result<()> {
        let mut posts = self.posts.lock().await;
        if let Some(post) = posts.get_mut(post) {
            post.comments.push(comment.clone());
            Ok(())
        } else {
            Err(create_error!(NotFound))
        }
    }

    /// Append a reply to a comment within a post
    async fn add_reply(&self, post: &str, comment: &str, reply: &Reply) -> Result<()> {
        let mut posts = self.posts.lock().await;
        let post = posts.get_mut(post).ok_or_else(|| create_error!(NotFound))?;

        if let Some(comment) = post
            .comments
            .iter_mut()
            .find(|entry| entry.id == comment)
        {
            comment.replies.push(reply.clone());
            Ok(())
        } else {
            Err(create_error!(NotFound))
        }
    }

    /// Remove a comment and all of its replies from a post
    async fn delete_comment(&self, post: &str, comment: &str) -> Result<()> {
        let mut posts = self.posts.lock().await;
        let post = posts.get_mut(post).ok_or_else(|| create_error!(NotFound))?;

        if post.comments.iter().any(|entry| entry.id == comment) {
            post.comments.retain(|entry| entry.id != comment);
            Ok(())
        } else {
            Err(create_error!(NotFound))
        }
    }
}
