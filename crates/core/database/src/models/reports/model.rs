use iso8601_timestamp::Timestamp;
use quad_result::Result;
use ulid::Ulid;

use crate::{Database, Post, User};

auto_derived!(
    /// Kind of content a report refers to
    #[serde(rename_all = "lowercase")]
    pub enum ReportType {
        Post,
        Comment,
    }

    /// Review status, advanced by moderation tooling elsewhere
    #[serde(rename_all = "lowercase")]
    pub enum ReportStatus {
        Pending,
        Reviewed,
        Dismissed,
    }

    /// User-generated abuse report
    pub struct Report {
        /// Unique Id
        #[serde(rename = "_id")]
        pub id: String,
        /// Kind of reported content
        #[serde(rename = "type")]
        pub report_type: ReportType,
        /// Id of the post the content lives in
        pub post: String,
        /// Id of the reported comment, for comment reports
        #[serde(skip_serializing_if = "Option::is_none")]
        pub comment_id: Option<String>,
        /// Id of the user whose content was reported
        pub reported_user: String,
        /// Id of the user who made the report
        pub reported_by: String,
        /// Free-text reason
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub reason: String,
        /// Review status
        pub status: ReportStatus,
        /// When this report was created
        pub created_at: Timestamp,
    }
);

impl Report {
    /// Report a post
    ///
    /// Reporting a post also adds its author to the reporter's block
    /// set. The two writes are independent: if the block write fails,
    /// the report stands and the omission is only logged.
    pub async fn create_for_post(
        db: &Database,
        post: &Post,
        reporter: &User,
        reason: Option<String>,
    ) -> Result<Report> {
        let report = Report {
            id: Ulid::new().to_string(),
            report_type: ReportType::Post,
            post: post.id.to_string(),
            comment_id: None,
            reported_user: post.author.id.to_string(),
            reported_by: reporter.id.to_string(),
            reason: reason.unwrap_or_default(),
            status: ReportStatus::Pending,
            created_at: Timestamp::now_utc(),
        };

        db.insert_report(&report).await?;

        if let Err(err) = db.add_block(&reporter.id, &post.author.id).await {
            error!(
                "Failed to auto-block {} for reporter {}: {:?}",
                post.author.id, reporter.id, err
            );
        }

        Ok(report)
    }

    /// Report a comment on a post
    ///
    /// Unlike post reports, this does not block the comment's author.
    pub async fn create_for_comment(
        db: &Database,
        post: &Post,
        comment_id: &str,
        reporter: &User,
        reason: Option<String>,
    ) -> Result<Report> {
        let comment = post
            .comments
            .iter()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| create_error!(NotFound))?;

        let report = Report {
            id: Ulid::new().to_string(),
            report_type: ReportType::Comment,
            post: post.id.to_string(),
            comment_id: Some(comment.id.to_string()),
            reported_user: comment.author.id.to_string(),
            reported_by: reporter.id.to_string(),
            reason: reason.unwrap_or_default(),
            status: ReportStatus::Pending,
            created_at: Timestamp::now_utc(),
        };

        db.insert_report(&report).await?;
        Ok(report)
    }

    /// Fetch all reports made by a user, newest first
    pub async fn fetch_mine(db: &Database, reporter: &str) -> Result<Vec<Report>> {
        db.fetch_reports_by_user(reporter).await
    }
}
