//! Run command - watch, mirror and publish until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::Settings;
use crate::pipeline::FeedPipeline;
use crate::publish::{NotificationBroadcaster, Publisher, store};
use crate::sync::{LftpMirror, RemoteSync, run_periodic};
use crate::watcher::DirectoryWatcher;

/// Arguments for the run command.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub dir: Option<PathBuf>,
    pub no_sync: bool,
    pub no_live: bool,
    pub debounce_ms: Option<u64>,
}

impl RunArgs {
    /// Fold command-line overrides into the loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.dir {
            settings.feed.results_dir = dir.clone();
        }
        if let Some(ms) = self.debounce_ms {
            settings.watch.debounce_ms = ms;
        }
        if self.no_sync {
            settings.sync.server = None;
        }
        if self.no_live {
            settings.live.enabled = false;
        }
    }
}

pub async fn run(args: RunArgs, mut settings: Settings) -> anyhow::Result<()> {
    args.apply(&mut settings);
    let results_dir = settings.feed.results_dir.clone();

    // The mirror creates files, not the directory itself
    tokio::fs::create_dir_all(&results_dir)
        .await
        .with_context(|| format!("cannot create {}", results_dir.display()))?;

    let store = store::from_config(&settings.store)?;
    let broadcaster = Arc::new(NotificationBroadcaster::new(settings.live.capacity));
    let publisher = Publisher::new(store.clone(), broadcaster.clone(), settings.publish.clone());
    let pipeline = FeedPipeline::new(&settings.feed, publisher);

    crate::log_event!(
        "run",
        "starting",
        "{} feed in {} -> {} store",
        settings.feed.kind,
        results_dir.display(),
        store.name()
    );

    let mut background = Vec::new();

    if settings.sync.is_enabled() {
        let mirror = LftpMirror::from_config(&settings.sync, &results_dir)?;
        crate::log_event!("sync", "source", "{}", mirror.redacted_source());
        let mirror: Arc<dyn RemoteSync> = Arc::new(mirror);
        background.push(tokio::spawn(run_periodic(
            mirror,
            Duration::from_secs(settings.sync.interval_secs.max(1)),
        )));
    } else {
        crate::log_event!("sync", "disabled");
    }

    if settings.live.enabled {
        background.push(spawn_live(&settings.live.bind, broadcaster.clone()));
    }

    let watcher = DirectoryWatcher::builder(&results_dir)
        .debounce_ms(settings.watch.debounce_ms)
        .tick_ms(settings.watch.tick_ms)
        .channel_capacity(settings.watch.channel_capacity)
        .build(pipeline)?;

    let outcome = tokio::select! {
        result = watcher.watch() => result.map_err(anyhow::Error::from),
        _ = tokio::signal::ctrl_c() => {
            crate::log_event!("run", "shutting down");
            Ok(())
        }
    };

    for task in background {
        task.abort();
    }
    outcome
}

#[cfg(feature = "http-server")]
fn spawn_live(bind: &str, broadcaster: Arc<NotificationBroadcaster>) -> tokio::task::JoinHandle<()> {
    let bind = bind.to_string();
    tokio::spawn(async move {
        if let Err(e) = crate::live::serve(&bind, broadcaster).await {
            tracing::error!("[live] server stopped: {e}");
        }
    })
}

#[cfg(not(feature = "http-server"))]
fn spawn_live(_bind: &str, _broadcaster: Arc<NotificationBroadcaster>) -> tokio::task::JoinHandle<()> {
    tracing::warn!("[live] built without the http-server feature; live endpoint disabled");
    tokio::spawn(async {})
}
