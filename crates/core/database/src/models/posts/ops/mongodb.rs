use bson::{to_bson, to_document};
use mongodb::options::FindOptions;
use quad_result::Result;

use crate::MongoDb;
use crate::{Comment, PartialPost, Post, Reply};

use super::AbstractPosts;

static COL: &str = "posts";

fn newest_first() -> FindOptions {
    FindOptions::builder()
        .sort(doc! {
            "created_at": -1_i32
        })
        .build()
}

#[async_trait]
impl AbstractPosts for MongoDb {
    /// Insert a new post into the database
    async fn insert_post(&self, post: &Post) -> Result<()> {
        query!(self, insert_one, COL, &post).map(|_| ())
    }

    /// Fetch a post by its id
    async fn fetch_post(&self, id: &str) -> Result<Post> {
        query!(self, find_one_by_id, COL, id)?.ok_or_else(|| create_error!(NotFound))
    }

    /// Fetch a user's posts, newest first
    async fn fetch_posts_by_author(&self, author: &str) -> Result<Vec<Post>> {
        query!(
            self,
            find_with_options,
            COL,
            doc! {
                "author.id": author
            },
            newest_first()
        )
    }

    /// Fetch all posts except those by the given authors, newest first
    async fn fetch_feed(&self, blocked_authors: &[String]) -> Result<Vec<Post>> {
        query!(
            self,
            find_with_options,
            COL,
            doc! {
                "author.id": {
                    "$nin": blocked_authors
                }
            },
            newest_first()
        )
    }

    /// Update a given post with new information
    async fn update_post(&self, id: &str, partial: &PartialPost) -> Result<()> {
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

    /// Delete a post and thereby everything nested in it
    async fn delete_post(&self, id: &str) -> Result<()> {
        query!(self, delete_one_by_id, COL, id).and_then(|result| {
            if result.deleted_count == 0 {
                Err(create_error!(NotFound))
            } else {
                Ok(())
            }
        })
    }

    /// Flip membership of `user` in the post's like set,
    /// returning the resulting membership
    ///
    /// Both updates guard on current membership, so concurrent toggles
    /// serialize into some definite order; if neither matches, the state
    /// changed under us and we try again.
    async fn toggle_like(&self, post: &str, user: &str) -> Result<bool> {
        loop {
            let removed = query!(
                self,
                update_one,
                COL,
                doc! {
                    "_id": post,
                    "likes": user
                },
                doc! {
                    "$pull": {
                        "likes": user
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
                    "_id": post,
                    "likes": {
                        "$ne": user
                    }
                },
                doc! {
                    "$addToSet": {
                        "likes": user
                    }
                }
            )?;

            if added.modified_count > 0 {
                return Ok(true);
            }

            self.fetch_post(post).await?;
        }
    }

    /// Append a comment to a post
    async fn add_comment(&self, post: &str, comment: &Comment) -> Result<()> {
        let comment = to_bson(comment).map_err(|_| create_database_error!("to_bson", COL))?;

        query!(
            self,
            update_one_by_id,
            COL,
            post,
            doc! {
                "$push": {
                    "comments": comment
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

    /// Append a reply to a comment within a post
    async fn add_reply(&self, post: &str, comment: &str, reply: &Reply) -> Result<()> {
        let reply = to_bson(reply).map_err(|_| create_database_error!("to_bson", COL))?;

        query!(
            self,
            update_one,
            COL,
            doc! {
                "_id": post,
                "comments._id": comment
            },
            doc! {
                "$push": {
                    "comments.$.replies": reply
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

    /// Remove a comment and all of its replies from a post
    async fn delete_comment(&self, post: &str, comment: &str) -> Result<()> {
        query!(
            self,
            update_one_by_id,
            COL,
            post,
            doc! {
                "$pull": {
                    "comments": {
                        "_id": comment
                    }
                }
            }
        )
        .and_then(|result| {
            if result.matched_count == 0 || result.modified_count == 0 {
                Err(create_error!(NotFound))
            } else {
                Ok(())
            }
        })
    }
}
