use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Store-assigned thread id (monotonic per store).
pub type Id = i64;

/// A user record, keyed by the external identity-provider id.
/// Users are never hard-deleted; their id lists are pruned when threads go.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub image: String,
    pub onboarded: bool,
    /// Owned top-level thread ids, in creation order.
    pub threads: Vec<Id>,
    pub communities: Vec<String>,
}

/// Onboarding / profile-edit payload. Applying it twice is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpsertUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub image: String,
}

/// A post or reply. `parent_id = None` marks a top-level post.
/// Invariant: a thread with a parent appears in exactly that parent's
/// `children` list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Thread {
    pub id: Id,
    pub text: String,
    /// External id of the authoring user.
    pub author: String,
    pub parent_id: Option<Id>,
    pub community: Option<String>,
    pub children: Vec<Id>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewThread {
    pub text: String,
    pub author: String,
    /// External community id; an unresolvable id falls back to no community.
    pub community_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub text: String,
    pub author: String,
}

/// A community, keyed by its external id. Registration comes from an
/// external collaborator; this core only tags threads with it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Community {
    pub id: String,
    pub name: String,
    pub image: String,
    pub threads: Vec<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpsertCommunity {
    pub id: String,
    pub name: String,
    pub image: String,
}

/// Minimal author fields attached to expanded threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthorView {
    pub id: String,
    pub username: String,
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommunityView {
    pub id: String,
    pub name: String,
    pub image: String,
}

/// A thread with its references expanded in place. `children` holds as many
/// levels as the producing query resolved (one for the feed, two for a
/// single-thread fetch); deeper levels come back empty.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadView {
    pub id: Id,
    pub text: String,
    pub author: AuthorView,
    pub parent_id: Option<Id>,
    pub community: Option<CommunityView>,
    pub children: Vec<ThreadView>,
    pub created_at: DateTime<Utc>,
}

/// Paging parameters for the top-level feed. Both must be positive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct FeedQuery {
    #[serde(default = "default_page_number")]
    pub page_number: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_number() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self { page_number: 1, page_size: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedPage {
    pub threads: Vec<ThreadView>,
    pub has_next: bool,
}

/// A user's profile fields plus their owned threads, one child level deep.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserThreads {
    pub user: AuthorView,
    pub bio: String,
    pub threads: Vec<ThreadView>,
}

/// One feed entry of "someone replied to your thread".
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityItem {
    /// The reply thread itself.
    pub reply_id: Id,
    /// The user's thread that was replied to.
    pub source_thread_id: Id,
    pub author: AuthorView,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn author_view(&self) -> AuthorView {
        AuthorView {
            id: self.id.clone(),
            username: self.username.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
        }
    }
}

impl Community {
    pub fn view(&self) -> CommunityView {
        CommunityView { id: self.id.clone(), name: self.name.clone(), image: self.image.clone() }
    }
}
