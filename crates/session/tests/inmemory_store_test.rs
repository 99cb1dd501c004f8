//! Integration tests for [`InMemorySessionStore`].
//!
//! BDD style: each test documents scenario and expected outcome.

use session::{InMemorySessionStore, Role, SessionStore, SessionTurn};

/// **Test: First query seeds the session with the system turn.**
///
/// **Expected:** Snapshot is `[system, user]` and the latest turn is the query.
#[tokio::test]
async fn session_query_seeds_new_session() {
    let store = InMemorySessionStore::new("sys", 10);
    let session = store.session_query("你好", "u1").await.unwrap();

    assert_eq!(session.session_id, "u1");
    assert_eq!(
        session.messages,
        vec![SessionTurn::system("sys"), SessionTurn::user("你好")]
    );
    assert_eq!(session.latest().unwrap().content, "你好");
}

/// **Test: Replies and follow-up queries are appended in order.**
#[tokio::test]
async fn session_reply_then_query_keeps_order() {
    let store = InMemorySessionStore::new("sys", 10);
    store.session_query("q1", "u1").await.unwrap();
    store.session_reply("a1", "u1", 1).await.unwrap();
    let session = store.session_query("q2", "u1").await.unwrap();

    let roles: Vec<Role> = session.messages.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(session.history().len(), 2);
}

/// **Test: clear_session removes only the targeted session.**
#[tokio::test]
async fn clear_session_leaves_other_sessions() {
    let store = InMemorySessionStore::default();
    store.session_query("q", "u1").await.unwrap();
    store.session_query("q", "u2").await.unwrap();

    store.clear_session("u1").await.unwrap();

    assert!(store.get("u1").await.unwrap().is_none());
    assert!(store.get("u2").await.unwrap().is_some());
    assert_eq!(store.len().await, 1);
}

/// **Test: clear_all_session empties the store; clearing a missing session is a no-op.**
#[tokio::test]
async fn clear_all_session_empties_store() {
    let store = InMemorySessionStore::default();
    store.clear_session("missing").await.unwrap();
    store.session_query("q", "u1").await.unwrap();
    store.session_query("q", "u2").await.unwrap();

    store.clear_all_session().await.unwrap();

    assert!(store.is_empty().await);
}

/// **Test: History beyond max_turns is trimmed from the oldest side.**
///
/// **Expected:** Seed turn survives; the newest query is always last.
#[tokio::test]
async fn session_query_trims_to_max_turns() {
    let store = InMemorySessionStore::new("sys", 3);
    for i in 0..6 {
        store.session_query(&format!("q{}", i), "u1").await.unwrap();
    }
    let session = store.get("u1").await.unwrap().unwrap();

    assert_eq!(session.messages.len(), 4);
    assert_eq!(session.messages[0].role, Role::System);
    assert_eq!(session.messages[1].content, "q3");
    assert_eq!(session.latest().unwrap().content, "q5");
}

/// **Test: A turn cap of 0 still keeps the current query.**
///
/// **Expected:** Snapshot is `[system, user]` for every query; the query reaches the backend.
#[tokio::test]
async fn session_query_with_zero_max_turns_keeps_query() {
    let store = InMemorySessionStore::new("sys", 0);

    let session = store.session_query("膝盖疼", "u1").await.unwrap();
    assert_eq!(
        session.messages,
        vec![SessionTurn::system("sys"), SessionTurn::user("膝盖疼")]
    );

    store.session_reply("多休息", "u1", 1).await.unwrap();
    let session = store.session_query("还是疼", "u1").await.unwrap();
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.latest().unwrap().role, Role::User);
    assert_eq!(session.latest().unwrap().content, "还是疼");
}
