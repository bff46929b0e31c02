use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

#[async_trait]
pub trait ThreadRepo: Send + Sync {
    /// Insert a top-level post and link it into the author's (and, when
    /// resolvable, the community's) thread list.
    async fn create_thread(&self, new: NewThread) -> RepoResult<Id>;
    /// Paginated top-level feed, newest first, one child level expanded.
    async fn top_level_threads(&self, query: FeedQuery) -> RepoResult<FeedPage>;
    /// Single thread with two child levels expanded.
    async fn get_thread(&self, id: Id) -> RepoResult<ThreadView>;
    /// Attach a reply under `parent_id`. Two sequential writes; a crash
    /// between them leaves the reply unlinked (known gap, not repaired).
    async fn add_comment(&self, parent_id: Id, new: NewComment) -> RepoResult<Id>;
    /// Delete the thread and every transitive descendant, pruning all
    /// user/community id lists that referenced the deleted set.
    async fn delete_thread(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn upsert_user(&self, up: UpsertUser) -> RepoResult<()>;
    async fn get_user(&self, id: &str) -> RepoResult<User>;
    async fn user_threads(&self, id: &str) -> RepoResult<UserThreads>;
}

#[async_trait]
pub trait CommunityRepo: Send + Sync {
    async fn upsert_community(&self, up: UpsertCommunity) -> RepoResult<()>;
    async fn get_community(&self, id: &str) -> RepoResult<Community>;
}

#[async_trait]
pub trait ActivityRepo: Send + Sync {
    /// Replies by other users to any thread authored by `user_id`,
    /// newest first.
    async fn activity(&self, user_id: &str) -> RepoResult<Vec<ActivityItem>>;
}

pub trait Repo: ThreadRepo + UserRepo + CommunityRepo + ActivityRepo {}

impl<T> Repo for T where T: ThreadRepo + UserRepo + CommunityRepo + ActivityRepo {}

fn require(field: &str, value: &str) -> RepoResult<()> {
    if value.trim().is_empty() {
        return Err(RepoError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};

    const SNAPSHOT_PATH: &str = "data/state.json";

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        users: HashMap<String, User>,
        threads: HashMap<Id, Thread>,
        communities: HashMap<String, Community>,
        next_id: Id,
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Arc<PathBuf>,
    }

    impl InMemRepo {
        fn data_dir() -> PathBuf {
            std::env::var("TANGLE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data"))
        }

        fn snapshot_path() -> PathBuf {
            if std::env::var("TANGLE_DATA_DIR").is_ok() {
                let mut p = Self::data_dir();
                p.push("state.json");
                p
            } else {
                PathBuf::from(SNAPSHOT_PATH)
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        eprintln!("[store] Loaded snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        eprintln!(
                            "[store] Failed to parse snapshot '{}': {e}. Starting empty.",
                            path.display()
                        );
                        State::default()
                    }
                },
                Err(e) => {
                    eprintln!("[store] No snapshot at '{}': {e}. Starting empty.", path.display());
                    State::default()
                }
            }
        }

        // Best-effort snapshot after each mutation; write failures are
        // reported, never surfaced to callers.
        fn persist(&self) {
            let path = self.snapshot_path.clone();
            if let Ok(s) = serde_json::to_vec_pretty(&*self.state.read().unwrap()) {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(&*path, s) {
                    eprintln!("[store] Failed to write snapshot '{}': {e}", path.display());
                }
            }
        }

        pub fn new() -> Self {
            let snapshot_path = Self::snapshot_path();
            let state = Self::load_state_from(&snapshot_path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Arc::new(snapshot_path),
            }
        }

        fn next_id(state: &mut State) -> Id {
            state.next_id += 1;
            state.next_id
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self {
            Self::new()
        }
    }

    // Users are never hard-deleted, so a dangling author should not occur;
    // if one does, render the bare id rather than failing the read path.
    fn author_view(state: &State, id: &str) -> AuthorView {
        state.users.get(id).map(User::author_view).unwrap_or_else(|| AuthorView {
            id: id.to_string(),
            username: String::new(),
            name: String::new(),
            image: String::new(),
        })
    }

    /// Resolve a thread's references in place, attaching `depth` levels of
    /// children (each with its author). Depth is 1 for the feed and profile
    /// views, 2 for a single-thread fetch.
    fn expand(state: &State, t: &Thread, depth: usize) -> ThreadView {
        let children = if depth == 0 {
            Vec::new()
        } else {
            t.children
                .iter()
                .filter_map(|cid| state.threads.get(cid))
                .map(|c| expand(state, c, depth - 1))
                .collect()
        };
        ThreadView {
            id: t.id,
            text: t.text.clone(),
            author: author_view(state, &t.author),
            parent_id: t.parent_id,
            community: t
                .community
                .as_ref()
                .and_then(|cid| state.communities.get(cid))
                .map(Community::view),
            children,
            created_at: t.created_at,
        }
    }

    #[async_trait]
    impl ThreadRepo for InMemRepo {
        async fn create_thread(&self, new: NewThread) -> RepoResult<Id> {
            require("text", &new.text)?;
            require("author", &new.author)?;
            let mut s = self.state.write().unwrap();
            if !s.users.contains_key(&new.author) {
                return Err(RepoError::NotFound);
            }
            // An unknown community id falls back to "no community" rather
            // than failing the post.
            let community = match new.community_id {
                Some(cid) if s.communities.contains_key(&cid) => Some(cid),
                Some(cid) => {
                    tracing::warn!(community = %cid, "community not found, creating thread without one");
                    None
                }
                None => None,
            };
            let id = Self::next_id(&mut s);
            let thread = Thread {
                id,
                text: new.text,
                author: new.author.clone(),
                parent_id: None,
                community: community.clone(),
                children: Vec::new(),
                created_at: Utc::now(),
            };
            s.threads.insert(id, thread);
            if let Some(u) = s.users.get_mut(&new.author) {
                u.threads.push(id);
            }
            if let Some(cid) = community {
                if let Some(c) = s.communities.get_mut(&cid) {
                    c.threads.push(id);
                }
            }
            drop(s);
            self.persist();
            Ok(id)
        }

        async fn top_level_threads(&self, query: FeedQuery) -> RepoResult<FeedPage> {
            if query.page_number == 0 || query.page_size == 0 {
                return Err(RepoError::Validation(
                    "page_number and page_size must be positive".into(),
                ));
            }
            let s = self.state.read().unwrap();
            let mut tops: Vec<&Thread> =
                s.threads.values().filter(|t| t.parent_id.is_none()).collect();
            // newest first; id breaks created_at ties so pages never overlap
            tops.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            let total = tops.len();
            let skip = (query.page_number as usize - 1) * query.page_size as usize;
            let threads: Vec<ThreadView> = tops
                .into_iter()
                .skip(skip)
                .take(query.page_size as usize)
                .map(|t| expand(&s, t, 1))
                .collect();
            let has_next = total > skip + threads.len();
            Ok(FeedPage { threads, has_next })
        }

        async fn get_thread(&self, id: Id) -> RepoResult<ThreadView> {
            let s = self.state.read().unwrap();
            let t = s.threads.get(&id).ok_or(RepoError::NotFound)?;
            Ok(expand(&s, t, 2))
        }

        async fn add_comment(&self, parent_id: Id, new: NewComment) -> RepoResult<Id> {
            require("text", &new.text)?;
            require("author", &new.author)?;
            let mut s = self.state.write().unwrap();
            if !s.threads.contains_key(&parent_id) {
                return Err(RepoError::NotFound);
            }
            if !s.users.contains_key(&new.author) {
                return Err(RepoError::NotFound);
            }
            let id = Self::next_id(&mut s);
            let child = Thread {
                id,
                text: new.text,
                author: new.author,
                parent_id: Some(parent_id),
                community: None,
                children: Vec::new(),
                created_at: Utc::now(),
            };
            s.threads.insert(id, child);
            // second write of the pair; a real store could fail here and
            // leave the reply unlinked
            if let Some(p) = s.threads.get_mut(&parent_id) {
                p.children.push(id);
            }
            drop(s);
            self.persist();
            Ok(id)
        }

        async fn delete_thread(&self, id: Id) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            if !s.threads.contains_key(&id) {
                return Err(RepoError::NotFound);
            }
            let parent_of_root = s.threads.get(&id).and_then(|t| t.parent_id);

            // Explicit worklist walk of parent -> children; the visited set
            // guards against a cycle that would violate the link invariant.
            let mut doomed: Vec<Id> = Vec::new();
            let mut seen: HashSet<Id> = HashSet::new();
            let mut stack = vec![id];
            while let Some(cur) = stack.pop() {
                if !seen.insert(cur) {
                    continue;
                }
                doomed.push(cur);
                if let Some(t) = s.threads.get(&cur) {
                    stack.extend(t.children.iter().copied());
                }
            }

            // Gather affected authors/communities before anything is deleted;
            // pruning must not depend on the documents still existing.
            let mut authors: HashSet<String> = HashSet::new();
            let mut communities: HashSet<String> = HashSet::new();
            for tid in &doomed {
                if let Some(t) = s.threads.get(tid) {
                    authors.insert(t.author.clone());
                    if let Some(c) = &t.community {
                        communities.insert(c.clone());
                    }
                }
            }

            for tid in &doomed {
                s.threads.remove(tid);
            }

            let gone: HashSet<Id> = doomed.into_iter().collect();
            for a in &authors {
                if let Some(u) = s.users.get_mut(a) {
                    u.threads.retain(|t| !gone.contains(t));
                }
            }
            for c in &communities {
                if let Some(cm) = s.communities.get_mut(c) {
                    cm.threads.retain(|t| !gone.contains(t));
                }
            }
            // keep the parent's child list in sync when a reply subtree goes
            if let Some(pid) = parent_of_root {
                if let Some(p) = s.threads.get_mut(&pid) {
                    p.children.retain(|c| *c != id);
                }
            }
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn upsert_user(&self, up: UpsertUser) -> RepoResult<()> {
            require("id", &up.id)?;
            require("username", &up.username)?;
            let username = up.username.to_lowercase();
            let mut s = self.state.write().unwrap();
            match s.users.get_mut(&up.id) {
                Some(u) => {
                    u.username = username;
                    u.name = up.name;
                    u.bio = up.bio;
                    u.image = up.image;
                    u.onboarded = true;
                }
                None => {
                    let user = User {
                        id: up.id.clone(),
                        username,
                        name: up.name,
                        bio: up.bio,
                        image: up.image,
                        onboarded: true,
                        threads: Vec::new(),
                        communities: Vec::new(),
                    };
                    s.users.insert(up.id, user);
                }
            }
            drop(s);
            self.persist();
            Ok(())
        }

        async fn get_user(&self, id: &str) -> RepoResult<User> {
            let s = self.state.read().unwrap();
            s.users.get(id).cloned().ok_or(RepoError::NotFound)
        }

        async fn user_threads(&self, id: &str) -> RepoResult<UserThreads> {
            let s = self.state.read().unwrap();
            let u = s.users.get(id).ok_or(RepoError::NotFound)?;
            let threads = u
                .threads
                .iter()
                .filter_map(|tid| s.threads.get(tid))
                .map(|t| expand(&s, t, 1))
                .collect();
            Ok(UserThreads { user: u.author_view(), bio: u.bio.clone(), threads })
        }
    }

    #[async_trait]
    impl CommunityRepo for InMemRepo {
        async fn upsert_community(&self, up: UpsertCommunity) -> RepoResult<()> {
            require("id", &up.id)?;
            require("name", &up.name)?;
            let mut s = self.state.write().unwrap();
            match s.communities.get_mut(&up.id) {
                Some(c) => {
                    c.name = up.name;
                    c.image = up.image;
                }
                None => {
                    let community = Community {
                        id: up.id.clone(),
                        name: up.name,
                        image: up.image,
                        threads: Vec::new(),
                    };
                    s.communities.insert(up.id, community);
                }
            }
            drop(s);
            self.persist();
            Ok(())
        }

        async fn get_community(&self, id: &str) -> RepoResult<Community> {
            let s = self.state.read().unwrap();
            s.communities.get(id).cloned().ok_or(RepoError::NotFound)
        }
    }

    #[async_trait]
    impl ActivityRepo for InMemRepo {
        async fn activity(&self, user_id: &str) -> RepoResult<Vec<ActivityItem>> {
            let s = self.state.read().unwrap();
            let owned: HashSet<Id> =
                s.threads.values().filter(|t| t.author == user_id).map(|t| t.id).collect();
            let mut items: Vec<ActivityItem> = s
                .threads
                .values()
                .filter_map(|t| {
                    let source = t.parent_id.filter(|p| owned.contains(p))?;
                    // replying to yourself is not activity
                    if t.author == user_id {
                        return None;
                    }
                    Some(ActivityItem {
                        reply_id: t.id,
                        source_thread_id: source,
                        author: author_view(&s, &t.author),
                        created_at: t.created_at,
                    })
                })
                .collect();
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.reply_id.cmp(&a.reply_id)));
            Ok(items)
        }
    }
}
