use super::*;
use crate::test_support::*;

use shared::error::{
    FORBIDDEN_MESSAGE, OFFLINE_MESSAGE, REMOTE_FAILURE_MESSAGE, UNAVAILABLE_MESSAGE,
};

const STARTED: &str = "BugPresenter#LoadingStarted";
const AVAILABLE: &str = "BugPresenter#BugDataAvailable";
const UNAVAILABLE: &str = "BugPresenter#BugDataUnavailable";
const FINISHED: &str = "BugPresenter#LoadingFinished";
const DIRECTORY_UPDATED: &str = "UserDirectoryPresenter#Updated";

async fn presenter_with(
    bug_id: i64,
    siblings: Vec<BugId>,
    store: Arc<dyn BugStore>,
    remote: Arc<dyn RemoteTracker>,
    online: bool,
) -> (Arc<EventBus>, EventLog, Arc<BugPresenter>) {
    let bus = EventBus::new();
    let log = EventLog::attach(&bus, &[STARTED, AVAILABLE, UNAVAILABLE, FINISHED]).await;
    let directory = UserDirectory::new(Arc::clone(&bus));
    let presenter = BugPresenter::new_with_dependencies(
        Arc::clone(&bus),
        ContainerId::new("tab-details-1"),
        BugId(bug_id),
        siblings,
        store,
        remote,
        ConnectivityFlag::new(online),
        RecordingRouter::new(),
        RecordingEditor::new(),
        directory,
    )
    .await;
    (bus, log, presenter)
}

#[tokio::test]
async fn offline_cache_miss_is_unavailable_without_remote_fetch() {
    let remote = ScriptedRemote::failure("must not be called");
    let (_bus, log, presenter) = presenter_with(
        7,
        Vec::new(),
        InMemoryBugStore::empty(),
        Arc::clone(&remote) as Arc<dyn RemoteTracker>,
        false,
    )
    .await;

    presenter.load_bug().await;

    assert_eq!(log.topics(), vec![STARTED, UNAVAILABLE, FINISHED]);
    let payload = log.payload_for(UNAVAILABLE).expect("unavailable payload");
    assert_eq!(payload["code"], 0);
    assert_eq!(payload["message"], OFFLINE_MESSAGE);
    assert_eq!(remote.calls(), 0);
}

#[tokio::test]
async fn local_hit_with_summary_skips_remote_fetch() {
    let remote = ScriptedRemote::failure("must not be called");
    let (_bus, log, presenter) = presenter_with(
        7,
        Vec::new(),
        InMemoryBugStore::with_record(usable_record(7, "Crash on startup")),
        Arc::clone(&remote) as Arc<dyn RemoteTracker>,
        true,
    )
    .await;

    presenter.load_bug().await;

    assert_eq!(log.topics(), vec![STARTED, AVAILABLE, FINISHED]);
    assert_eq!(remote.calls(), 0);
    assert_eq!(
        presenter.bug().await.expect("bound bug").summary.as_deref(),
        Some("Crash on startup")
    );
}

#[tokio::test]
async fn forbidden_error_code_remaps_the_message() {
    let store = InMemoryBugStore::empty();
    let remote = ScriptedRemote::record(errored_record(7, 102, "restricted"));
    let (_bus, log, presenter) = presenter_with(
        7,
        Vec::new(),
        Arc::clone(&store) as Arc<dyn BugStore>,
        remote,
        true,
    )
    .await;

    presenter.load_bug().await;

    assert_eq!(log.topics(), vec![STARTED, UNAVAILABLE, FINISHED]);
    let payload = log.payload_for(UNAVAILABLE).expect("unavailable payload");
    assert_eq!(payload["code"], 102);
    assert_eq!(payload["message"], FORBIDDEN_MESSAGE);
    // The errored record is still committed to the cache.
    assert!(store.saved(7).expect("cached record").error.is_some());
}

#[tokio::test]
async fn fetch_success_persists_record_and_reports_available() {
    let store = InMemoryBugStore::empty();
    let remote = ScriptedRemote::record(usable_record(42, "Crash on startup"));
    let (_bus, log, presenter) = presenter_with(
        42,
        vec![BugId(41), BugId(42), BugId(43)],
        Arc::clone(&store) as Arc<dyn BugStore>,
        Arc::clone(&remote) as Arc<dyn RemoteTracker>,
        true,
    )
    .await;

    presenter.load_bug().await;

    assert_eq!(log.topics(), vec![STARTED, AVAILABLE, FINISHED]);
    assert_eq!(remote.calls(), 1);
    let payload = log.payload_for(AVAILABLE).expect("available payload");
    assert_eq!(payload["bug_id"], 42);
    assert_eq!(payload["siblings"], serde_json::json!([41, 42, 43]));
    assert_eq!(
        store
            .saved(42)
            .and_then(|record| record.data)
            .and_then(|data| data.summary)
            .as_deref(),
        Some("Crash on startup")
    );
}

#[tokio::test]
async fn cached_record_without_summary_falls_through_to_fetch_when_online() {
    let remote = ScriptedRemote::record(usable_record(7, "now complete"));
    let (_bus, log, presenter) = presenter_with(
        7,
        Vec::new(),
        InMemoryBugStore::with_record(record_without_summary(7)),
        Arc::clone(&remote) as Arc<dyn RemoteTracker>,
        true,
    )
    .await;

    presenter.load_bug().await;

    assert_eq!(log.topics(), vec![STARTED, AVAILABLE, FINISHED]);
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn cached_record_without_summary_is_unavailable_when_offline() {
    let remote = ScriptedRemote::failure("must not be called");
    let (_bus, log, presenter) = presenter_with(
        7,
        Vec::new(),
        InMemoryBugStore::with_record(record_without_summary(7)),
        Arc::clone(&remote) as Arc<dyn RemoteTracker>,
        false,
    )
    .await;

    presenter.load_bug().await;

    assert_eq!(log.topics(), vec![STARTED, UNAVAILABLE, FINISHED]);
    let payload = log.payload_for(UNAVAILABLE).expect("unavailable payload");
    assert_eq!(payload["code"], 0);
    assert_eq!(remote.calls(), 0);
}

#[tokio::test]
async fn transport_failure_reports_the_remote_failure_message() {
    let (_bus, log, presenter) = presenter_with(
        7,
        Vec::new(),
        InMemoryBugStore::empty(),
        ScriptedRemote::failure("connection reset"),
        true,
    )
    .await;

    presenter.load_bug().await;

    let payload = log.payload_for(UNAVAILABLE).expect("unavailable payload");
    assert_eq!(payload["code"], 0);
    assert_eq!(payload["message"], REMOTE_FAILURE_MESSAGE);
}

#[tokio::test]
async fn errored_response_without_code_uses_the_default_message() {
    // A fetch that "succeeds" with a summary-less payload and no error
    // descriptor still ends in the generic unavailable outcome.
    let remote = ScriptedRemote::record(record_without_summary(7));
    let (_bus, log, presenter) = presenter_with(
        7,
        Vec::new(),
        InMemoryBugStore::empty(),
        remote,
        true,
    )
    .await;

    presenter.load_bug().await;

    let payload = log.payload_for(UNAVAILABLE).expect("unavailable payload");
    assert_eq!(payload["code"], 0);
    assert_eq!(payload["message"], UNAVAILABLE_MESSAGE);
}

#[tokio::test]
async fn cache_write_failure_does_not_fail_the_load() {
    let (_bus, log, presenter) = presenter_with(
        7,
        Vec::new(),
        InMemoryBugStore::failing_saves(),
        ScriptedRemote::record(usable_record(7, "Crash on startup")),
        true,
    )
    .await;

    presenter.load_bug().await;

    assert_eq!(log.topics(), vec![STARTED, AVAILABLE, FINISHED]);
}

#[tokio::test]
async fn cache_read_failure_falls_back_to_the_remote_fetch() {
    let remote = ScriptedRemote::record(usable_record(7, "Crash on startup"));
    let (_bus, log, presenter) = presenter_with(
        7,
        Vec::new(),
        Arc::new(MissingBugStore),
        Arc::clone(&remote) as Arc<dyn RemoteTracker>,
        true,
    )
    .await;

    presenter.load_bug().await;

    assert_eq!(log.topics(), vec![STARTED, AVAILABLE, FINISHED]);
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn duplicate_load_is_rejected_while_one_is_outstanding() {
    let gated = GatedBugStore::new();
    let (_bus, log, presenter) = presenter_with(
        7,
        Vec::new(),
        Arc::clone(&gated) as Arc<dyn BugStore>,
        ScriptedRemote::failure("offline path only"),
        false,
    )
    .await;

    let running = Arc::clone(&presenter);
    let first = tokio::spawn(async move { running.load_bug().await });
    gated.entered.notified().await;

    // The first load is parked at its cache read; this one must be a no-op.
    presenter.load_bug().await;
    assert_eq!(log.topics(), vec![STARTED]);

    gated.release.notify_one();
    first.await.expect("first load");

    assert_eq!(log.topics(), vec![STARTED, UNAVAILABLE, FINISHED]);
}

#[tokio::test]
async fn directory_announces_only_newly_observed_participants() {
    let mut record = usable_record(7, "Crash on startup");
    if let Some(data) = record.data.as_mut() {
        data.creator = Some("reporter@example.com".to_string());
        data.assigned_to = Some("dev@example.com".to_string());
        data.cc = vec!["dev@example.com".to_string(), "watcher@example.com".to_string()];
    }
    let (bus, _log, presenter) = presenter_with(
        7,
        Vec::new(),
        InMemoryBugStore::with_record(record),
        ScriptedRemote::failure("must not be called"),
        true,
    )
    .await;
    let directory_log = EventLog::attach(&bus, &[DIRECTORY_UPDATED]).await;

    presenter.load_bug().await;
    presenter.load_bug().await;

    assert_eq!(directory_log.count(DIRECTORY_UPDATED), 1);
    let payload = directory_log
        .payload_for(DIRECTORY_UPDATED)
        .expect("directory payload");
    assert_eq!(
        payload["emails"],
        serde_json::json!([
            "reporter@example.com",
            "dev@example.com",
            "watcher@example.com"
        ])
    );
}

#[tokio::test]
async fn prefetch_warms_the_cache_without_loading_events() {
    let store = InMemoryBugStore::empty();
    let remote = ScriptedRemote::record(usable_record(8, "Sibling"));
    let (_bus, log, presenter) = presenter_with(
        7,
        vec![BugId(7), BugId(8)],
        Arc::clone(&store) as Arc<dyn BugStore>,
        Arc::clone(&remote) as Arc<dyn RemoteTracker>,
        true,
    )
    .await;

    presenter.prefetch_sibling(BugId(8)).await;

    assert_eq!(log.len(), 0);
    assert_eq!(remote.calls(), 1);
    assert!(store.saved(8).is_some());
}

#[tokio::test]
async fn prefetch_skips_usable_cache_hits_and_offline_runtimes() {
    let store = InMemoryBugStore::with_record(usable_record(8, "Sibling"));
    let remote = ScriptedRemote::failure("must not be called");
    let (_bus, _log, presenter) = presenter_with(
        7,
        vec![BugId(7), BugId(8)],
        Arc::clone(&store) as Arc<dyn BugStore>,
        Arc::clone(&remote) as Arc<dyn RemoteTracker>,
        true,
    )
    .await;

    presenter.prefetch_sibling(BugId(8)).await;
    assert_eq!(remote.calls(), 0);

    let offline_remote = ScriptedRemote::failure("must not be called");
    let (_bus, _log, offline_presenter) = presenter_with(
        7,
        vec![BugId(7), BugId(9)],
        InMemoryBugStore::empty(),
        Arc::clone(&offline_remote) as Arc<dyn RemoteTracker>,
        false,
    )
    .await;

    offline_presenter.prefetch_sibling(BugId(9)).await;
    assert_eq!(offline_remote.calls(), 0);
}
