#![cfg(feature = "inmem-store")]

use serial_test::serial;
use tangle::{
    models::{FeedQuery, NewComment, NewThread, UpsertCommunity, UpsertUser},
    repo::{inmem::InMemRepo, RepoError},
};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use tangle::repo::{ActivityRepo, CommunityRepo, ThreadRepo, UserRepo};

/// Helper that returns a fresh, empty repository for every test run.
fn repo() -> InMemRepo {
    // isolate state: do **not** persist to the default file path
    std::env::set_var("TANGLE_DATA_DIR", tempfile::tempdir().unwrap().path());
    InMemRepo::new()
}

fn upsert(id: &str, username: &str) -> UpsertUser {
    UpsertUser {
        id: id.into(),
        username: username.into(),
        name: username.into(),
        bio: String::new(),
        image: String::new(),
    }
}

async fn onboard(r: &InMemRepo, id: &str, username: &str) {
    r.upsert_user(upsert(id, username)).await.unwrap();
}

async fn post(r: &InMemRepo, author: &str, text: &str) -> i64 {
    r.create_thread(NewThread {
        text: text.into(),
        author: author.into(),
        community_id: None,
    })
    .await
    .unwrap()
}

#[tokio::test]
#[serial]
async fn upsert_user_is_idempotent() {
    let r = repo();

    r.upsert_user(upsert("u1", "Alice")).await.unwrap();
    let first = r.get_user("u1").await.unwrap();
    assert!(first.onboarded);
    assert_eq!(first.username, "alice"); // case-normalized

    // same payload again: record identical after the second call
    r.upsert_user(upsert("u1", "Alice")).await.unwrap();
    let second = r.get_user("u1").await.unwrap();
    assert_eq!(second.username, first.username);
    assert_eq!(second.name, first.name);
    assert_eq!(second.bio, first.bio);
    assert_eq!(second.image, first.image);
    assert_eq!(second.threads, first.threads);
    assert!(second.onboarded);
}

#[tokio::test]
#[serial]
async fn upsert_user_preserves_thread_list() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    let tid = post(&r, "u1", "hello").await;

    // profile edit must not wipe the owned-thread list
    r.upsert_user(upsert("u1", "Alice2")).await.unwrap();
    let u = r.get_user("u1").await.unwrap();
    assert_eq!(u.threads, vec![tid]);
    assert_eq!(u.username, "alice2");
}

#[tokio::test]
#[serial]
async fn create_thread_links_author_and_community() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    r.upsert_community(UpsertCommunity {
        id: "c1".into(),
        name: "rustaceans".into(),
        image: String::new(),
    })
    .await
    .unwrap();

    let tid = r
        .create_thread(NewThread {
            text: "first".into(),
            author: "u1".into(),
            community_id: Some("c1".into()),
        })
        .await
        .unwrap();

    assert_eq!(r.get_user("u1").await.unwrap().threads, vec![tid]);
    assert_eq!(r.get_community("c1").await.unwrap().threads, vec![tid]);

    let view = r.get_thread(tid).await.unwrap();
    assert_eq!(view.author.username, "alice");
    assert_eq!(view.community.unwrap().id, "c1");
}

#[tokio::test]
#[serial]
async fn unknown_community_falls_back_to_none() {
    let r = repo();
    onboard(&r, "u1", "alice").await;

    let tid = r
        .create_thread(NewThread {
            text: "orphan community".into(),
            author: "u1".into(),
            community_id: Some("nope".into()),
        })
        .await
        .unwrap();

    let view = r.get_thread(tid).await.unwrap();
    assert!(view.community.is_none());
}

#[tokio::test]
#[serial]
async fn create_thread_rejects_bad_input() {
    let r = repo();
    onboard(&r, "u1", "alice").await;

    let err = r
        .create_thread(NewThread { text: "  ".into(), author: "u1".into(), community_id: None })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    let err = r
        .create_thread(NewThread { text: "hi".into(), author: "ghost".into(), community_id: None })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}

#[tokio::test]
#[serial]
async fn add_comment_grows_children_by_one() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    onboard(&r, "u2", "bob").await;
    let tid = post(&r, "u1", "op").await;

    let before = r.get_thread(tid).await.unwrap().children.len();
    r.add_comment(tid, NewComment { text: "nice".into(), author: "u2".into() }).await.unwrap();

    let view = r.get_thread(tid).await.unwrap();
    assert_eq!(view.children.len(), before + 1);
    let child = view.children.last().unwrap();
    assert_eq!(child.text, "nice");
    assert_eq!(child.author.id, "u2");
    assert_eq!(child.parent_id, Some(tid));
}

#[tokio::test]
#[serial]
async fn add_comment_requires_existing_parent() {
    let r = repo();
    onboard(&r, "u1", "alice").await;

    let err = r
        .add_comment(999, NewComment { text: "hi".into(), author: "u1".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}

#[tokio::test]
#[serial]
async fn get_thread_expands_two_child_levels() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    onboard(&r, "u2", "bob").await;
    let a = post(&r, "u1", "root").await;
    let b = r.add_comment(a, NewComment { text: "child".into(), author: "u2".into() }).await.unwrap();
    r.add_comment(b, NewComment { text: "grandchild".into(), author: "u1".into() }).await.unwrap();

    let view = r.get_thread(a).await.unwrap();
    assert_eq!(view.children.len(), 1);
    let child = &view.children[0];
    assert_eq!(child.author.username, "bob");
    assert_eq!(child.children.len(), 1);
    assert_eq!(child.children[0].text, "grandchild");
    assert_eq!(child.children[0].author.username, "alice");
}

#[tokio::test]
#[serial]
async fn delete_cascades_to_descendants_and_prunes_lists() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    onboard(&r, "u2", "bob").await;
    r.upsert_community(UpsertCommunity {
        id: "c1".into(),
        name: "rustaceans".into(),
        image: String::new(),
    })
    .await
    .unwrap();

    // A (alice, in c1) -> B (bob) -> C (alice)
    let a = r
        .create_thread(NewThread {
            text: "A".into(),
            author: "u1".into(),
            community_id: Some("c1".into()),
        })
        .await
        .unwrap();
    let b = r.add_comment(a, NewComment { text: "B".into(), author: "u2".into() }).await.unwrap();
    let c = r.add_comment(b, NewComment { text: "C".into(), author: "u1".into() }).await.unwrap();

    r.delete_thread(a).await.unwrap();

    for id in [a, b, c] {
        assert!(matches!(r.get_thread(id).await.unwrap_err(), RepoError::NotFound));
    }
    assert!(r.get_user("u1").await.unwrap().threads.is_empty());
    assert!(r.get_user("u2").await.unwrap().threads.is_empty());
    assert!(r.get_community("c1").await.unwrap().threads.is_empty());
}

#[tokio::test]
#[serial]
async fn deleting_a_reply_prunes_parent_children() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    onboard(&r, "u2", "bob").await;
    let tid = post(&r, "u1", "op").await;
    let reply =
        r.add_comment(tid, NewComment { text: "bye".into(), author: "u2".into() }).await.unwrap();

    r.delete_thread(reply).await.unwrap();

    let view = r.get_thread(tid).await.unwrap();
    assert!(view.children.is_empty());
}

#[tokio::test]
#[serial]
async fn delete_unknown_thread_is_not_found() {
    let r = repo();
    assert!(matches!(r.delete_thread(42).await.unwrap_err(), RepoError::NotFound));
}

#[tokio::test]
#[serial]
async fn feed_pagination_boundary() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    for i in 0..20 {
        post(&r, "u1", &format!("post {i}")).await;
    }

    let page = r.top_level_threads(FeedQuery { page_number: 1, page_size: 20 }).await.unwrap();
    assert_eq!(page.threads.len(), 20);
    assert!(!page.has_next);

    post(&r, "u1", "one more").await;
    let page = r.top_level_threads(FeedQuery { page_number: 1, page_size: 20 }).await.unwrap();
    assert_eq!(page.threads.len(), 20);
    assert!(page.has_next);
    // newest first
    assert_eq!(page.threads[0].text, "one more");
}

#[tokio::test]
#[serial]
async fn feed_pages_never_overlap() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    for i in 0..21 {
        post(&r, "u1", &format!("post {i}")).await;
    }

    let mut seen = std::collections::HashSet::new();
    for page_number in 1..=3 {
        let page =
            r.top_level_threads(FeedQuery { page_number, page_size: 10 }).await.unwrap();
        for t in &page.threads {
            assert!(seen.insert(t.id), "thread {} appeared on two pages", t.id);
        }
        assert_eq!(page.has_next, page_number < 3);
    }
    assert_eq!(seen.len(), 21);
}

#[tokio::test]
#[serial]
async fn feed_excludes_replies() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    onboard(&r, "u2", "bob").await;
    let tid = post(&r, "u1", "op").await;
    r.add_comment(tid, NewComment { text: "reply".into(), author: "u2".into() }).await.unwrap();

    let page = r.top_level_threads(FeedQuery::default()).await.unwrap();
    assert_eq!(page.threads.len(), 1);
    assert_eq!(page.threads[0].id, tid);
    // one child level rides along
    assert_eq!(page.threads[0].children.len(), 1);
    assert_eq!(page.threads[0].children[0].author.username, "bob");
}

#[tokio::test]
#[serial]
async fn feed_rejects_zero_paging() {
    let r = repo();
    let err =
        r.top_level_threads(FeedQuery { page_number: 0, page_size: 20 }).await.unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    let err =
        r.top_level_threads(FeedQuery { page_number: 1, page_size: 0 }).await.unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[tokio::test]
#[serial]
async fn activity_excludes_self_replies() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    onboard(&r, "u2", "bob").await;
    let tid = post(&r, "u1", "op").await;

    r.add_comment(tid, NewComment { text: "self".into(), author: "u1".into() }).await.unwrap();
    let reply =
        r.add_comment(tid, NewComment { text: "hey".into(), author: "u2".into() }).await.unwrap();

    let items = r.activity("u1").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].reply_id, reply);
    assert_eq!(items[0].source_thread_id, tid);
    assert_eq!(items[0].author.username, "bob");
}

#[tokio::test]
#[serial]
async fn activity_covers_replies_to_comments_too() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    onboard(&r, "u2", "bob").await;
    let tid = post(&r, "u2", "bob's op").await;
    // alice comments on bob's post; bob replies to alice's comment
    let alice_comment =
        r.add_comment(tid, NewComment { text: "mine".into(), author: "u1".into() }).await.unwrap();
    let bob_reply = r
        .add_comment(alice_comment, NewComment { text: "back at you".into(), author: "u2".into() })
        .await
        .unwrap();

    let items = r.activity("u1").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].reply_id, bob_reply);
    assert_eq!(items[0].source_thread_id, alice_comment);
}

#[tokio::test]
#[serial]
async fn activity_for_unknown_user_is_empty() {
    let r = repo();
    assert!(r.activity("ghost").await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn user_threads_shows_owned_posts_with_children() {
    let r = repo();
    onboard(&r, "u1", "alice").await;
    onboard(&r, "u2", "bob").await;
    let tid = post(&r, "u1", "op").await;
    r.add_comment(tid, NewComment { text: "reply".into(), author: "u2".into() }).await.unwrap();

    let profile = r.user_threads("u1").await.unwrap();
    assert_eq!(profile.user.id, "u1");
    assert_eq!(profile.threads.len(), 1);
    assert_eq!(profile.threads[0].children.len(), 1);
    assert_eq!(profile.threads[0].children[0].author.id, "u2");

    // comments do not enter the author's owned list
    let bob = r.user_threads("u2").await.unwrap();
    assert!(bob.threads.is_empty());

    assert!(matches!(r.user_threads("ghost").await.unwrap_err(), RepoError::NotFound));
}
