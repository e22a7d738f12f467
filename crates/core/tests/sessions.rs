//! Device session expiry.

mod support;

use support::Harness;

#[tokio::test]
async fn session_lives_until_its_ttl() {
    let h = Harness::new();
    let session = h.session.start("alice").await.unwrap();
    assert_eq!((session.expires_at - session.created_at).num_hours(), 12);

    h.clock.advance_secs(11 * 3600);
    assert_eq!(h.session.current().await.unwrap(), Some(session));

    h.clock.advance_secs(3600);
    assert!(h.session.current().await.unwrap().is_none());
}

#[tokio::test]
async fn ttl_past_the_calendar_is_a_config_error() {
    let mut config = pocket_domain::Config::default();
    config.session.ttl_secs = 10_000_000_000_000;
    let h = Harness::with_config(config);

    let started = h.session.start("alice").await;
    assert!(matches!(started, Err(pocket_domain::PocketError::Config(_))));
    assert!(h.session.current().await.unwrap().is_none());
}

#[tokio::test]
async fn starting_a_session_replaces_the_previous_one() {
    let h = Harness::new();
    let first = h.session.start("alice").await.unwrap();
    let second = h.session.start("bob").await.unwrap();

    assert_ne!(first.token, second.token);
    assert_eq!(h.session.current().await.unwrap().unwrap().username, "bob");

    h.session.end().await.unwrap();
    assert!(h.session.current().await.unwrap().is_none());
}

#[tokio::test]
async fn audit_retention_purges_old_entries() {
    let h = Harness::new();
    h.register("carol").await;
    h.clock.advance_secs(40 * 24 * 3600);
    h.register("dave").await;

    assert_eq!(h.audit.purge_older_than(30).await.unwrap(), 1);
    let remaining = h.audit.recent(10).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].target_user.as_deref(), Some("dave"));
}
