use std::collections::HashSet;

use indexmap::IndexSet;
use iso8601_timestamp::Timestamp;
use quad_config::config;
use quad_result::Result;
use ulid::Ulid;

use crate::Database;

auto_derived!(
    /// # User
    pub struct User {
        /// Unique Id
        #[serde(rename = "_id")]
        pub id: String,
        /// Display name
        pub name: String,
        /// Email address
        pub email: String,

        /// Declared major
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub major: String,
        /// Department
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub department: String,
        /// Year of study, e.g. "Freshman"
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub year: String,
        /// Free-text biography
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub bio: String,
        /// Free-text interest tags
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        pub interests: Vec<String>,

        /// Ids of users this user has blocked
        ///
        /// The relation is one-directional; being blocked by someone
        /// does not appear in your own list.
        #[serde(skip_serializing_if = "IndexSet::is_empty", default)]
        pub blocked_users: IndexSet<String>,

        /// Whether this account has been soft-deleted
        #[serde(skip_serializing_if = "crate::if_false", default)]
        pub is_deleted: bool,

        /// When this account was created
        pub created_at: Timestamp,
    }

    /// Optional fields on a user profile
    #[derive(Default)]
    pub struct PartialUser {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub major: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub department: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub year: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub bio: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub interests: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub is_deleted: Option<bool>,
    }

    /// Short profile summary, used for block lists
    pub struct UserSummary {
        pub id: String,
        pub name: String,
        pub email: String,
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub major: String,
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub department: String,
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub year: String,
    }

    /// Scored entry returned by user discovery
    pub struct DiscoveredUser {
        pub id: String,
        pub name: String,
        pub email: String,
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub major: String,
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub department: String,
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub year: String,
        #[serde(skip_serializing_if = "String::is_empty", default)]
        pub bio: String,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        pub interests: Vec<String>,
        pub score: u64,
    }
);

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.to_string(),
            name: user.name.to_string(),
            email: user.email.to_string(),
            major: user.major.to_string(),
            department: user.department.to_string(),
            year: user.year.to_string(),
        }
    }
}

impl PartialUser {
    /// Trim incoming text fields, dropping those which become empty
    /// where an empty value would be meaningless
    fn normalize(&mut self) {
        if let Some(name) = &self.name {
            let name = name.trim();
            self.name = if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            };
        }

        if let Some(major) = &self.major {
            self.major = Some(major.trim().to_string());
        }

        if let Some(department) = &self.department {
            self.department = Some(department.trim().to_string());
        }

        if let Some(year) = &self.year {
            self.year = Some(year.trim().to_string());
        }

        if let Some(bio) = &self.bio {
            self.bio = Some(bio.trim().to_string());
        }

        if let Some(interests) = &self.interests {
            self.interests = Some(
                interests
                    .iter()
                    .map(|interest| interest.trim().to_string())
                    .filter(|interest| !interest.is_empty())
                    .collect(),
            );
        }
    }
}

impl User {
    /// Create a new user
    pub async fn create<P>(db: &Database, name: String, email: String, profile: P) -> Result<User>
    where
        P: Into<Option<PartialUser>>,
    {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(create_error!(InvalidInput {
                error: "name must not be empty".to_string()
            }));
        }

        let mut user = User {
            id: Ulid::new().to_string(),
            name,
            email: email.trim().to_lowercase(),
            major: String::new(),
            department: String::new(),
            year: String::new(),
            bio: String::new(),
            interests: vec![],
            blocked_users: IndexSet::new(),
            is_deleted: false,
            created_at: Timestamp::now_utc(),
        };

        if let Some(mut profile) = profile.into() {
            profile.normalize();
            user.apply_options(profile);
        }

        db.insert_user(&user).await?;
        Ok(user)
    }

    /// Apply partial profile data to this user
    pub fn apply_options(&mut self, partial: PartialUser) {
        if let Some(name) = partial.name {
            self.name = name;
        }

        if let Some(major) = partial.major {
            self.major = major;
        }

        if let Some(department) = partial.department {
            self.department = department;
        }

        if let Some(year) = partial.year {
            self.year = year;
        }

        if let Some(bio) = partial.bio {
            self.bio = bio;
        }

        if let Some(interests) = partial.interests {
            self.interests = interests;
        }

        if let Some(is_deleted) = partial.is_deleted {
            self.is_deleted = is_deleted;
        }
    }

    /// Update this user's profile
    pub async fn update(&mut self, db: &Database, mut partial: PartialUser) -> Result<()> {
        partial.normalize();
        self.apply_options(partial.clone());
        db.update_user(&self.id, &partial).await
    }

    /// Soft-delete this account
    pub async fn mark_deleted(&mut self, db: &Database) -> Result<()> {
        self.update(
            db,
            PartialUser {
                is_deleted: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    /// Toggle whether `target` is in this user's block list,
    /// returning the resulting membership
    pub async fn toggle_block(&mut self, db: &Database, target: &str) -> Result<bool> {
        if self.id == target {
            return Err(create_error!(InvalidOperation));
        }

        // Blocking a user which does not exist is an error
        db.fetch_user(target).await?;

        let blocked = db.toggle_block(&self.id, target).await?;
        if blocked {
            self.blocked_users.insert(target.to_string());
        } else {
            self.blocked_users.shift_remove(target);
        }

        Ok(blocked)
    }

    /// Whether this user has blocked `other`
    ///
    /// Evaluated from this user's own list only, never symmetrized.
    pub fn is_blocked(&self, other: &str) -> bool {
        self.blocked_users.contains(other)
    }

    /// Resolve profile summaries for every blocked user
    pub async fn fetch_blocked(&self, db: &Database) -> Result<Vec<UserSummary>> {
        let ids: Vec<String> = self.blocked_users.iter().cloned().collect();
        let users = db.fetch_users(&ids).await?;

        // Dangling entries are skipped, block list order is kept
        Ok(ids
            .iter()
            .filter_map(|id| users.iter().find(|user| &user.id == id))
            .map(UserSummary::from)
            .collect())
    }

    /// Similarity between this user's profile and another
    ///
    /// Same major scores 3, same department 2, plus one per interest of
    /// `other` found in this user's interest set. Comparisons are
    /// case-insensitive and ignore surrounding whitespace; empty fields
    /// never match.
    pub fn similarity_score(&self, other: &User) -> u64 {
        let mut score = 0;

        let major = self.major.trim().to_lowercase();
        if !major.is_empty() && major == other.major.trim().to_lowercase() {
            score += 3;
        }

        let department = self.department.trim().to_lowercase();
        if !department.is_empty() && department == other.department.trim().to_lowercase() {
            score += 2;
        }

        let interests: HashSet<String> = self
            .interests
            .iter()
            .map(|interest| interest.trim().to_lowercase())
            .filter(|interest| !interest.is_empty())
            .collect();

        // Duplicate interests on the candidate's side each count
        for interest in &other.interests {
            let normalized = interest.trim().to_lowercase();
            if !normalized.is_empty() && interests.contains(&normalized) {
                score += 1;
            }
        }

        score
    }

    /// Rank other users by profile similarity
    ///
    /// Candidates this user has blocked and candidates with a zero
    /// score are excluded; the result is capped by configuration.
    pub async fn discover(&self, db: &Database) -> Result<Vec<DiscoveredUser>> {
        let limit = config().await.features.limits.default.discover_results;

        let mut scored: Vec<DiscoveredUser> = db
            .fetch_discover_candidates(&self.id)
            .await?
            .into_iter()
            .filter(|candidate| !self.is_blocked(&candidate.id))
            .filter_map(|candidate| {
                let score = self.similarity_score(&candidate);
                if score == 0 {
                    return None;
                }

                Some(DiscoveredUser {
                    id: candidate.id,
                    name: candidate.name,
                    email: candidate.email,
                    major: candidate.major,
                    department: candidate.department,
                    year: candidate.year,
                    bio: candidate.bio,
                    interests: candidate.interests,
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        scored.truncate(limit);
        Ok(scored)
    }
}
