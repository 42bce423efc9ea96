use mongodb::options::FindOptions;
use quad_result::Result;

use crate::MongoDb;
use crate::Report;

use super::AbstractReports;

static COL: &str = "reports";

#[async_trait]
impl AbstractReports for MongoDb {
    /// Insert a new report into the database
    async fn insert_report(&self, report: &Report) -> Result<()> {
        query!(self, insert_one, COL, &report).map(|_| ())
    }

    /// Fetch a report by its id
    async fn fetch_report(&self, id: &str) -> Result<Report> {
        query!(self, find_one_by_id, COL, id)?.ok_or_else(|| create_error!(NotFound))
    }

    /// Fetch all reports made by a user, newest first
    async fn fetch_reports_by_user(&self, user: &str) -> Result<Vec<Report>> {
        query!(
            self,
            find_with_options,
            COL,
            doc! {
                "reported_by": user
            },
            FindOptions::builder()
                .sort(doc! {
                    "created_at": -1_i32
                })
                .build()
        )
    }
}
