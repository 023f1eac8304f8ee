// File watcher driving full re-parses

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{run_index, IndexSettings};

/// Re-indexes the whole object graph whenever a `.spin` file changes.
pub struct FileWatcher {
    settings: IndexSettings,
    watch_dirs: Vec<PathBuf>,
}

impl FileWatcher {
    pub fn new(settings: IndexSettings) -> Self {
        let root_dir = match settings.root.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watch_dirs = vec![root_dir];
        if settings.library.is_dir() && !watch_dirs.contains(&settings.library) {
            watch_dirs.push(settings.library.clone());
        }

        Self { settings, watch_dirs }
    }

    pub fn watch_dirs(&self) -> &[PathBuf] {
        &self.watch_dirs
    }

    /// Watch until the event channel closes.
    pub async fn watch(&self) -> Result<()> {
        let (tx, mut rx) = mpsc::channel(100);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(e) = tx.blocking_send(event) {
                        error!("Failed to send file event: {}", e);
                    }
                }
                Err(e) => error!("File watch error: {}", e),
            },
            Config::default(),
        )?;

        for dir in &self.watch_dirs {
            watcher
                .watch(dir, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch {}", dir.display()))?;
            info!("Watching {}", dir.display());
        }

        while let Some(event) = rx.recv().await {
            if !is_relevant(&event) {
                continue;
            }
            debug!("Change detected: {:?}", event.paths);

            // An editor save usually arrives as a burst of events
            while let Ok(extra) = rx.try_recv() {
                debug!("Coalesced event: {:?}", extra.paths);
            }

            self.reindex().await;
        }

        Ok(())
    }

    async fn reindex(&self) {
        let settings = self.settings.clone();
        match tokio::task::spawn_blocking(move || run_index(&settings)).await {
            Ok(Ok(summary)) => info!(
                "Re-indexed {}: {} tags, {} objects",
                self.settings.root.display(),
                summary.tags,
                summary.objects
            ),
            Ok(Err(e)) => error!("Re-index failed: {:#}", e),
            Err(e) => error!("Re-index task failed: {}", e),
        }
    }
}

/// Spin sources by extension, any case.
pub fn is_spin_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("spin"))
        .unwrap_or(false)
}

/// Whether an event touches a Spin source.
pub fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| is_spin_file(p))
}

/// Keep re-indexing `settings.root` on changes.
pub async fn start_watcher(settings: IndexSettings) -> Result<()> {
    let watcher = FileWatcher::new(settings);
    watcher.watch().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ParseMode;
    use notify::event::{AccessKind, CreateKind, ModifyKind};
    use tempfile::tempdir;

    fn settings(root: PathBuf, library: PathBuf) -> IndexSettings {
        IndexSettings {
            store_path: root.with_file_name(".spintags.db"),
            root,
            library,
            mode: ParseMode::Full,
            ctags: false,
        }
    }

    #[test]
    fn test_is_spin_file() {
        assert!(is_spin_file(Path::new("top.spin")));
        assert!(is_spin_file(Path::new("lib/Serial.SPIN")));
        assert!(!is_spin_file(Path::new("tags")));
        assert!(!is_spin_file(Path::new(".spintags.db")));
        assert!(!is_spin_file(Path::new("notes.spin.bak")));
    }

    #[test]
    fn test_is_relevant() {
        let modify = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("a.spin"));
        assert!(is_relevant(&modify));

        let create = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("tags"));
        assert!(!is_relevant(&create));

        let access = Event::new(EventKind::Access(AccessKind::Any)).add_path(PathBuf::from("a.spin"));
        assert!(!is_relevant(&access));
    }

    #[test]
    fn test_watch_dirs() {
        let project = tempdir().unwrap();
        let library = tempdir().unwrap();

        let watcher = FileWatcher::new(settings(project.path().join("top.spin"), library.path().to_path_buf()));
        assert_eq!(watcher.watch_dirs(), [project.path().to_path_buf(), library.path().to_path_buf()]);

        let watcher = FileWatcher::new(settings(project.path().join("top.spin"), PathBuf::new()));
        assert_eq!(watcher.watch_dirs(), [project.path().to_path_buf()]);

        let watcher = FileWatcher::new(settings(PathBuf::from("top.spin"), project.path().join("missing")));
        assert_eq!(watcher.watch_dirs(), [PathBuf::from(".")]);
    }
}
