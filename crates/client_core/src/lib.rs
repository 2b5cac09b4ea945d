use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use shared::{
    domain::{BugId, ContainerId, PresenterId},
    error::{
        FORBIDDEN_ERROR_CODE, FORBIDDEN_MESSAGE, GENERIC_ERROR_CODE, OFFLINE_MESSAGE,
        REMOTE_FAILURE_MESSAGE, UNAVAILABLE_MESSAGE,
    },
    protocol::{
        AddFieldValue, AddParticipant, AttachFiles, AttachText, BugDataAvailable,
        BugDataUnavailable, BugPayload, BugRecord, CommentSelected, EditAttachment, EditComment,
        EditField, EditFlag, HistoryUpdated, LoadingFinished, LoadingStarted, LocationState,
        MoveDownAttachment, MoveUpAttachment, RemoveAttachment, RemoveFieldValue,
        RemoveParticipant,
    },
};

pub mod bug_store;
pub mod event_bus;
pub mod reactive;
pub mod remote;
pub mod user_directory;

pub use bug_store::{BugStore, DurableBugStore, MissingBugStore};
pub use event_bus::{decode_payload, Dispatch, EventBus, Handler, Presenter, TopicSubscriber};
pub use reactive::ReactiveStore;
pub use remote::{FieldSelection, HttpRemoteTracker, MissingRemoteTracker, RemoteTracker};
pub use user_directory::UserDirectory;

/// Receives navigation requests keyed by path and optional state.
#[async_trait]
pub trait Router: Send + Sync {
    async fn navigate(&self, path: &str, state: Option<Value>, replace: bool) -> Result<()>;
}

pub struct MissingRouter;

#[async_trait]
impl Router for MissingRouter {
    async fn navigate(&self, path: &str, _state: Option<Value>, _replace: bool) -> Result<()> {
        Err(anyhow!("router is unavailable for path {path}"))
    }
}

/// Reports whether the runtime currently has connectivity.
pub trait NetworkStatus: Send + Sync {
    fn is_online(&self) -> bool;
}

pub struct AlwaysOnline;

impl NetworkStatus for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Flag-backed status for shells that track connectivity themselves.
pub struct ConnectivityFlag(AtomicBool);

impl ConnectivityFlag {
    pub fn new(online: bool) -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(online)))
    }

    pub fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

impl NetworkStatus for ConnectivityFlag {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionChange {
    Add,
    Remove,
}

/// Record-mutation collaborator behind the view intents. Every bus intent
/// maps 1:1 to one of these calls.
#[async_trait]
pub trait BugEditor: Send + Sync {
    async fn attach_files(&self, bug_id: BugId, files: &[String]) -> Result<()>;
    async fn attach_text(&self, bug_id: BugId, text: &str) -> Result<()>;
    async fn remove_attachment(&self, bug_id: BugId, hash: &str) -> Result<()>;
    async fn move_up_attachment(&self, bug_id: BugId, hash: &str) -> Result<()>;
    async fn move_down_attachment(&self, bug_id: BugId, hash: &str) -> Result<()>;
    async fn edit_attachment(&self, bug_id: BugId, hash: &str, name: &str, value: &Value)
        -> Result<()>;
    async fn update_subscription(&self, bug_id: BugId, change: SubscriptionChange) -> Result<()>;
    async fn edit_comment(&self, bug_id: BugId, text: &str) -> Result<()>;
    async fn edit_field(&self, bug_id: BugId, name: &str, value: &Value) -> Result<()>;
    async fn edit_flag(&self, bug_id: BugId, flag: &str, added: bool) -> Result<()>;
    async fn add_field_value(&self, bug_id: BugId, field: &str, value: &str) -> Result<()>;
    async fn remove_field_value(&self, bug_id: BugId, field: &str, value: &str) -> Result<()>;
    async fn add_participant(&self, bug_id: BugId, field: &str, email: &str) -> Result<()>;
    async fn remove_participant(&self, bug_id: BugId, field: &str, email: &str) -> Result<()>;
    async fn submit(&self, bug_id: BugId) -> Result<()>;
}

pub struct MissingBugEditor;

#[async_trait]
impl BugEditor for MissingBugEditor {
    async fn attach_files(&self, bug_id: BugId, _files: &[String]) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn attach_text(&self, bug_id: BugId, _text: &str) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn remove_attachment(&self, bug_id: BugId, _hash: &str) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn move_up_attachment(&self, bug_id: BugId, _hash: &str) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn move_down_attachment(&self, bug_id: BugId, _hash: &str) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn edit_attachment(
        &self,
        bug_id: BugId,
        _hash: &str,
        _name: &str,
        _value: &Value,
    ) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn update_subscription(
        &self,
        bug_id: BugId,
        _change: SubscriptionChange,
    ) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn edit_comment(&self, bug_id: BugId, _text: &str) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn edit_field(&self, bug_id: BugId, _name: &str, _value: &Value) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn edit_flag(&self, bug_id: BugId, _flag: &str, _added: bool) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn add_field_value(&self, bug_id: BugId, _field: &str, _value: &str) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn remove_field_value(&self, bug_id: BugId, _field: &str, _value: &str) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn add_participant(&self, bug_id: BugId, _field: &str, _email: &str) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn remove_participant(&self, bug_id: BugId, _field: &str, _email: &str) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }

    async fn submit(&self, bug_id: BugId) -> Result<()> {
        Err(editor_unavailable(bug_id))
    }
}

fn editor_unavailable(bug_id: BugId) -> anyhow::Error {
    anyhow!("bug editor is unavailable for bug {}", bug_id.0)
}

/// Direction for Back/Forward movement through the sibling working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Back,
    Forward,
}

/// Terminal outcome of a failed load. Always reported over the bus, never
/// returned to callers.
#[derive(Debug, Clone, Error)]
#[error("bug unavailable (code {code}): {message}")]
struct BugUnavailable {
    code: i64,
    message: String,
}

/// Mediates one record between the sync layer and its views. Owns the
/// cache-first load algorithm and the session's navigation bookkeeping;
/// communicates exclusively over the event bus.
pub struct BugPresenter {
    presenter: Presenter,
    container_id: ContainerId,
    bug_id: BugId,
    siblings: Vec<BugId>,
    store: Arc<dyn BugStore>,
    remote: Arc<dyn RemoteTracker>,
    network: Arc<dyn NetworkStatus>,
    router: Arc<dyn Router>,
    editor: Arc<dyn BugEditor>,
    directory: Arc<UserDirectory>,
    bug: Mutex<Option<BugPayload>>,
    location: Mutex<Option<LocationState>>,
    loading: AtomicBool,
}

impl BugPresenter {
    pub async fn new(
        bus: Arc<EventBus>,
        container_id: ContainerId,
        bug_id: BugId,
        siblings: Vec<BugId>,
    ) -> Arc<Self> {
        let directory = UserDirectory::new(Arc::clone(&bus));
        Self::new_with_dependencies(
            bus,
            container_id,
            bug_id,
            siblings,
            Arc::new(MissingBugStore),
            Arc::new(MissingRemoteTracker),
            Arc::new(AlwaysOnline),
            Arc::new(MissingRouter),
            Arc::new(MissingBugEditor),
            directory,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn new_with_dependencies(
        bus: Arc<EventBus>,
        container_id: ContainerId,
        bug_id: BugId,
        siblings: Vec<BugId>,
        store: Arc<dyn BugStore>,
        remote: Arc<dyn RemoteTracker>,
        network: Arc<dyn NetworkStatus>,
        router: Arc<dyn Router>,
        editor: Arc<dyn BugEditor>,
        directory: Arc<UserDirectory>,
    ) -> Arc<Self> {
        let this = Arc::new(Self {
            presenter: Presenter::new("Bug", bus),
            container_id,
            bug_id,
            siblings,
            store,
            remote,
            network,
            router,
            editor,
            directory,
            bug: Mutex::new(None),
            location: Mutex::new(None),
            loading: AtomicBool::new(false),
        });
        this.wire_events().await;
        this
    }

    pub fn presenter_id(&self) -> PresenterId {
        self.presenter.id()
    }

    pub fn bug_id(&self) -> BugId {
        self.bug_id
    }

    pub fn siblings(&self) -> &[BugId] {
        &self.siblings
    }

    /// The record bound to this session once a load succeeded.
    pub async fn bug(&self) -> Option<BugPayload> {
        self.bug.lock().await.clone()
    }

    /// Drop every bus subscription owned by this session; the hosting
    /// surface is closing.
    pub async fn detach(&self) {
        self.presenter.bus().detach(self.presenter.id()).await;
    }

    async fn wire_events(self: &Arc<Self>) {
        // Attachments
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#AttachFiles",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: AttachFiles = decode_payload(&payload)?;
                            editor.attach_files(bug_id, &data.files).await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#AttachText",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: AttachText = decode_payload(&payload)?;
                            editor.attach_text(bug_id, &data.text).await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#RemoveAttachment",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: RemoveAttachment = decode_payload(&payload)?;
                            editor.remove_attachment(bug_id, &data.hash).await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#MoveUpAttachment",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: MoveUpAttachment = decode_payload(&payload)?;
                            editor.move_up_attachment(bug_id, &data.hash).await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#MoveDownAttachment",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: MoveDownAttachment = decode_payload(&payload)?;
                            editor.move_down_attachment(bug_id, &data.hash).await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "AttachmentView#EditAttachment",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: EditAttachment = decode_payload(&payload)?;
                            editor
                                .edit_attachment(bug_id, &data.hash, &data.name, &data.value)
                                .await
                        })
                    }),
                )
                .await;
        }

        // Subscription
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#Subscribe",
                    Arc::new(move |_payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            editor
                                .update_subscription(bug_id, SubscriptionChange::Add)
                                .await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#Unsubscribe",
                    Arc::new(move |_payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            editor
                                .update_subscription(bug_id, SubscriptionChange::Remove)
                                .await
                        })
                    }),
                )
                .await;
        }

        // Other changes
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#EditComment",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: EditComment = decode_payload(&payload)?;
                            editor.edit_comment(bug_id, &data.text).await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#EditField",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: EditField = decode_payload(&payload)?;
                            editor.edit_field(bug_id, &data.name, &data.value).await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#EditFlag",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: EditFlag = decode_payload(&payload)?;
                            editor.edit_flag(bug_id, &data.flag, data.added).await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#AddFieldValue",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: AddFieldValue = decode_payload(&payload)?;
                            editor.add_field_value(bug_id, &data.field, &data.value).await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#RemoveFieldValue",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: RemoveFieldValue = decode_payload(&payload)?;
                            editor
                                .remove_field_value(bug_id, &data.field, &data.value)
                                .await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#AddParticipant",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: AddParticipant = decode_payload(&payload)?;
                            editor.add_participant(bug_id, &data.field, &data.email).await
                        })
                    }),
                )
                .await;
        }
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#RemoveParticipant",
                    Arc::new(move |payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move {
                            let data: RemoveParticipant = decode_payload(&payload)?;
                            editor
                                .remove_participant(bug_id, &data.field, &data.email)
                                .await
                        })
                    }),
                )
                .await;
        }

        // Form submission
        {
            let editor = Arc::clone(&self.editor);
            let bug_id = self.bug_id;
            self.presenter
                .on(
                    "V#Submit",
                    Arc::new(move |_payload| {
                        let editor = Arc::clone(&editor);
                        Box::pin(async move { editor.submit(bug_id).await })
                    }),
                )
                .await;
        }

        // Other actions
        {
            let weak = Arc::downgrade(self);
            self.presenter
                .on(
                    "V#Initialized",
                    Arc::new(move |_payload| {
                        let weak = weak.clone();
                        Box::pin(async move {
                            if let Some(presenter) = weak.upgrade() {
                                presenter.load_bug().await;
                            }
                            Ok(())
                        })
                    }),
                )
                .await;
        }

        // Timeline and tab handling resolve through conventional dispatch.
        let subscriber: Arc<dyn TopicSubscriber> = Arc::clone(self) as Arc<dyn TopicSubscriber>;
        self.presenter.subscribe("V#CommentSelected", &subscriber).await;
        self.presenter
            .subscribe("V#OpeningTabRequested", &subscriber)
            .await;
    }

    /// Load the record from the local cache or, on miss/error, the remote
    /// tracker, reporting the outcome over the bus. Total: every path emits
    /// exactly `LoadingStarted`, one of `BugDataAvailable` /
    /// `BugDataUnavailable`, then `LoadingFinished`. A second call while
    /// one is outstanding is rejected and emits nothing.
    pub async fn load_bug(&self) {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(
                container_id = %self.container_id.0,
                bug_id = self.bug_id.0,
                "load already in progress; skipping duplicate trigger"
            );
            return;
        }

        let container_id = self.container_id.clone();
        let bug_id = self.bug_id;

        self.presenter
            .trigger(
                "#LoadingStarted",
                &LoadingStarted {
                    container_id: container_id.clone(),
                    bug_id,
                },
            )
            .await;

        match self.resolve_bug().await {
            Ok(bug) => {
                *self.bug.lock().await = Some(bug.clone());
                self.presenter
                    .trigger(
                        "#BugDataAvailable",
                        &BugDataAvailable {
                            container_id: container_id.clone(),
                            bug_id,
                            siblings: self.siblings.clone(),
                        },
                    )
                    .await;
                self.directory.add_from_bug(&bug).await;
            }
            Err(unavailable) => {
                self.presenter
                    .trigger(
                        "#BugDataUnavailable",
                        &BugDataUnavailable {
                            container_id: container_id.clone(),
                            bug_id,
                            code: unavailable.code,
                            message: unavailable.message,
                        },
                    )
                    .await;
            }
        }

        self.presenter
            .trigger(
                "#LoadingFinished",
                &LoadingFinished {
                    container_id,
                    bug_id,
                },
            )
            .await;

        self.loading.store(false, Ordering::SeqCst);
    }

    /// The cache-first resolution itself. Never escapes an error upward:
    /// every failure becomes a `BugUnavailable` outcome.
    async fn resolve_bug(&self) -> std::result::Result<BugPayload, BugUnavailable> {
        let bug_id = self.bug_id;
        let mut message = UNAVAILABLE_MESSAGE.to_string();

        let mut record = match self.store.get(bug_id).await {
            Ok(record) => record,
            Err(err) => {
                warn!(bug_id = bug_id.0, "bug cache read failed: {err:#}");
                None
            }
        };

        if !record.as_ref().is_some_and(BugRecord::is_usable) {
            if !self.network.is_online() {
                message = OFFLINE_MESSAGE.to_string();
            } else {
                match self
                    .remote
                    .fetch_bug(bug_id, &FieldSelection::default())
                    .await
                {
                    Ok(fetched) => {
                        // Fire-and-commit: a cache write failure never fails
                        // the load.
                        if let Err(err) = self.store.save(&fetched).await {
                            warn!(bug_id = bug_id.0, "failed to cache fetched bug: {err:#}");
                        }
                        record = Some(fetched);
                    }
                    Err(err) => {
                        warn!(bug_id = bug_id.0, "remote fetch failed: {err:#}");
                        record = None;
                        message = REMOTE_FAILURE_MESSAGE.to_string();
                    }
                }
            }
        }

        match record {
            Some(BugRecord {
                data: Some(data), ..
            }) if data.has_summary() => Ok(data),
            other => {
                let code = other
                    .as_ref()
                    .and_then(|record| record.error.as_ref())
                    .map(|error| error.code)
                    .unwrap_or(GENERIC_ERROR_CODE);
                if code == FORBIDDEN_ERROR_CODE {
                    message = FORBIDDEN_MESSAGE.to_string();
                }
                Err(BugUnavailable { code, message })
            }
        }
    }

    /// Warm the cache for a sibling record without announcing a load.
    pub async fn prefetch_sibling(&self, bug_id: BugId) {
        if !self.network.is_online() {
            return;
        }
        if let Ok(Some(record)) = self.store.get(bug_id).await {
            if record.is_usable() {
                return;
            }
        }
        match self
            .remote
            .fetch_bug(bug_id, &FieldSelection::default())
            .await
        {
            Ok(record) => {
                if let Err(err) = self.store.save(&record).await {
                    warn!(bug_id = bug_id.0, "failed to cache prefetched bug: {err:#}");
                }
            }
            Err(err) => {
                info!(bug_id = bug_id.0, "sibling prefetch failed: {err:#}");
            }
        }
    }

    /// The previous or next record in the working set, if any.
    pub fn sibling(&self, direction: NavDirection) -> Option<BugId> {
        let index = self.siblings.iter().position(|id| *id == self.bug_id)?;
        match direction {
            NavDirection::Back => index.checked_sub(1).map(|i| self.siblings[i]),
            NavDirection::Forward => self.siblings.get(index + 1).copied(),
        }
    }

    fn canonical_path(&self) -> String {
        format!("/bug/{}", self.bug_id.0)
    }

    /// Record the navigation state the shell observed and re-announce the
    /// fragment while this session's record is still the visible path.
    pub async fn history_changed(&self, location: LocationState) {
        *self.location.lock().await = Some(location);
        self.check_fragment().await;
    }

    /// If a record is bound and its canonical path matches the visible
    /// path, trigger `#HistoryUpdated` so dependent views can scroll to the
    /// referenced sub-element. Otherwise stay bound but inert.
    pub async fn check_fragment(&self) {
        if self.bug.lock().await.is_none() {
            return;
        }
        let location = self.location.lock().await.clone();
        let Some(location) = location else {
            return;
        };
        if location.pathname == self.canonical_path() {
            self.presenter
                .trigger(
                    "#HistoryUpdated",
                    &HistoryUpdated {
                        hash: location.hash,
                        state: location.state,
                    },
                )
                .await;
        }
    }

    /// A timeline comment was selected; rewrite the visible fragment to
    /// point at it without growing the history.
    async fn on_comment_selected(&self, number: i64) -> Result<()> {
        let location = self.location.lock().await.clone();
        let Some(location) = location else {
            return Ok(());
        };
        if location.pathname == self.canonical_path() {
            self.router
                .navigate(
                    &format!("{}#c{number}", location.pathname),
                    Some(json!({})),
                    true,
                )
                .await?;
        }
        Ok(())
    }

    /// A previewed record was selected for details; open it with the
    /// working set so Back/Forward navigation stays available.
    async fn on_opening_tab_requested(&self) -> Result<()> {
        self.router
            .navigate(
                &self.canonical_path(),
                Some(json!({ "siblings": self.siblings })),
                false,
            )
            .await
    }
}

#[async_trait]
impl TopicSubscriber for BugPresenter {
    fn presenter_id(&self) -> PresenterId {
        self.presenter.id()
    }

    async fn dispatch(&self, topic: &str, payload: Arc<Value>) -> Result<Dispatch> {
        let Some((_, event)) = topic.rsplit_once('#') else {
            return Ok(Dispatch::Unhandled);
        };
        match event {
            "CommentSelected" => {
                let data: CommentSelected = decode_payload(&payload)?;
                self.on_comment_selected(data.number).await?;
                Ok(Dispatch::Handled)
            }
            "OpeningTabRequested" => {
                self.on_opening_tab_requested().await?;
                Ok(Dispatch::Handled)
            }
            _ => Ok(Dispatch::Unhandled),
        }
    }
}

/// Presents the navigator's record list. The preview selection is mirrored
/// into the router through the reactive store so selection writes cannot
/// skip the navigation side effect.
pub struct SidebarListPresenter {
    presenter: Presenter,
    pub data: ReactiveStore,
}

impl SidebarListPresenter {
    pub async fn new(
        bus: Arc<EventBus>,
        router: Arc<dyn Router>,
        path: impl Into<String>,
    ) -> Arc<Self> {
        let data = ReactiveStore::new();
        data.seed("bugs", &json!({})).await;
        data.seed("preview_id", &Value::Null).await;

        let path = path.into();
        data.on_write(
            "preview_id",
            Arc::new(move |value| {
                let router = Arc::clone(&router);
                let path = path.clone();
                Box::pin(async move {
                    router
                        .navigate(&path, Some(json!({ "preview_id": value })), true)
                        .await
                })
            }),
        )
        .await;

        Arc::new(Self {
            presenter: Presenter::new("SidebarList", bus),
            data,
        })
    }

    pub fn presenter_id(&self) -> PresenterId {
        self.presenter.id()
    }

    /// Select a record for preview; `None` clears the selection. Every call
    /// navigates, even when the selection is unchanged.
    pub async fn preview(&self, bug_id: Option<BugId>) {
        self.data.set("preview_id", &bug_id).await;
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/load_tests.rs"]
mod load_tests;
