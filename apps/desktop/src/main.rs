use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use client_core::{
    BugPresenter, ConnectivityFlag, DurableBugStore, EventBus, HttpRemoteTracker,
    MissingBugEditor, Router, SidebarListPresenter, UserDirectory,
};
use serde_json::{json, Value};
use shared::domain::{BugId, ContainerId};
use uuid::Uuid;

mod config;

use config::{load_settings, prepare_database_url};

#[derive(Parser, Debug)]
struct Args {
    /// Bug to load.
    bug_id: i64,
    /// Comma-separated sibling bug ids forming the navigable working set.
    #[arg(long, value_delimiter = ',')]
    siblings: Vec<i64>,
    #[arg(long)]
    origin: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    /// Serve from the cache only; never contact the tracker.
    #[arg(long)]
    offline: bool,
}

/// Navigation requests end up on stdout in this shell.
struct ConsoleRouter;

#[async_trait]
impl Router for ConsoleRouter {
    async fn navigate(&self, path: &str, state: Option<Value>, replace: bool) -> Result<()> {
        let mode = if replace { "replace" } else { "push" };
        println!(
            "navigate[{mode}] {path} state={}",
            state.unwrap_or(Value::Null)
        );
        Ok(())
    }
}

async fn attach_status_printer(bus: &Arc<EventBus>) {
    let printer_id = Uuid::new_v4();
    let topics = [
        "BugPresenter#LoadingStarted",
        "BugPresenter#BugDataAvailable",
        "BugPresenter#BugDataUnavailable",
        "BugPresenter#LoadingFinished",
        "UserDirectoryPresenter#Updated",
    ];
    for topic in topics {
        bus.on(
            printer_id,
            topic,
            Arc::new(move |payload| {
                Box::pin(async move {
                    match topic {
                        "BugPresenter#LoadingStarted" => println!("Loading..."),
                        "BugPresenter#BugDataUnavailable" => {
                            println!(
                                "ERROR: {}",
                                payload["message"].as_str().unwrap_or("unavailable")
                            );
                        }
                        _ => println!("{topic} {payload}"),
                    }
                    Ok(())
                })
            }),
        )
        .await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(origin) = args.origin {
        settings.origin = origin;
    }
    if let Some(database_url) = args.database_url {
        settings.database_url = database_url;
    }

    let database_url = prepare_database_url(&settings.database_url)?;
    let store = DurableBugStore::initialize(&database_url).await?;

    let bus = EventBus::new();
    attach_status_printer(&bus).await;

    let router: Arc<dyn Router> = Arc::new(ConsoleRouter);
    let directory = UserDirectory::new(Arc::clone(&bus));
    let presenter = BugPresenter::new_with_dependencies(
        Arc::clone(&bus),
        ContainerId::new(format!("tab-details-{}", args.bug_id)),
        BugId(args.bug_id),
        args.siblings.into_iter().map(BugId).collect(),
        store,
        Arc::new(HttpRemoteTracker::new(settings.origin.clone())),
        ConnectivityFlag::new(!args.offline),
        Arc::clone(&router),
        Arc::new(MissingBugEditor),
        directory,
    )
    .await;

    // The view surface is ready; the load runs off the bus like any other
    // intent.
    bus.trigger("BugView#Initialized", &json!({})).await;

    if let Some(bug) = presenter.bug().await {
        println!(
            "Bug {}: {}",
            args.bug_id,
            bug.summary.as_deref().unwrap_or("(no summary)")
        );

        let sidebar =
            SidebarListPresenter::new(Arc::clone(&bus), router, settings.launch_path).await;
        sidebar.preview(Some(presenter.bug_id())).await;
    }

    Ok(())
}
