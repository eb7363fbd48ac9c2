use crate::cli::{Command, SyncArgs};
use crate::error::{ErrorKind, Result};
use crate::generator::CommandGenerator;
use crate::index::DirectoryIndex;
use crate::report::ConsoleObserver;
use exn::ResultExt;
use futures::StreamExt;
use mipmap_cache::{ArtifactCache, LocalLocator, TargetWidth};
use mipmap_config::Config;
use mipmap_library::Gallery;
use mipmap_library::enumerate::{EnumerateEvent, EnumerateOptions, EnumerationState, Enumerator, STATE_KEY};
use mipmap_library::index::Permission;
use mipmap_library::reconcile::{ReconcileState, Reconciler};
use mipmap_progress::{ProgressObserver, ProgressUpdate};
use mipmap_store::{CACHE_NAMESPACE, Database, PersistedState, STATE_NAMESPACE};
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;

pub async fn run(command: Command, config: Config) -> Result<()> {
    let db = open(&config).await?;
    let result = match command {
        Command::Scan { directory } => scan(&db, &config, &directory).await,
        Command::Sync(args) => sync(&db, &config, &args, false).await,
        Command::Recalculate(args) => sync(&db, &config, &args, true).await,
        Command::Clear => clear(&db).await,
        Command::Status => status(&db).await,
    };
    db.close().await;
    result
}

async fn open(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Database)?;
    }
    Database::connect(&config.database).await.or_raise(|| ErrorKind::Database)
}

fn options(config: &Config) -> EnumerateOptions {
    EnumerateOptions { page_size: config.page_size, max_assets: config.max_assets }
}

fn cache(db: &Database) -> ArtifactCache {
    ArtifactCache::new(Arc::new(db.namespace(CACHE_NAMESPACE)), Arc::new(LocalLocator))
}

async fn enumerator(db: &Database, config: &Config, directory: &Path) -> Result<Enumerator> {
    let index = Arc::new(DirectoryIndex::new(directory));
    let store = Arc::new(db.namespace(STATE_NAMESPACE));
    Enumerator::restore(index, store, options(config))
        .await
        .or_raise(|| ErrorKind::Failed("could not restore enumeration state".to_string()))
}

fn summarize(state: &EnumerationState) {
    println!("permission: {}", state.permission);
    println!("loading:    {}", state.loading);
    match state.total_count {
        Some(total) => println!("assets:     {} of {total}", state.items.len()),
        None => println!("assets:     {} (total unknown)", state.items.len()),
    }
}

async fn scan(db: &Database, config: &Config, directory: &Path) -> Result<()> {
    let mut enumerator = enumerator(db, config, directory).await?;
    let observer = ConsoleObserver::stderr();
    let mut loaded = 0;
    {
        let mut events = pin!(enumerator.enumerate());
        while let Some(event) = events.next().await {
            let event = event.or_raise(|| ErrorKind::Failed(format!("could not scan {}", directory.display())))?;
            match event {
                EnumerateEvent::PermissionDenied => {},
                EnumerateEvent::Unchanged { total } => {
                    observer.on_progress(&ProgressUpdate { current: total, total, label: "COMPLETED" });
                },
                EnumerateEvent::Complete { total } => {
                    observer.on_progress(&ProgressUpdate { current: loaded, total, label: "COMPLETED" });
                },
                EnumerateEvent::Started { total } => {
                    observer.on_progress(&ProgressUpdate { current: 0, total, label: "LOADING" });
                },
                EnumerateEvent::Batch { loaded: now, total, .. } => {
                    loaded = now;
                    observer.on_progress(&ProgressUpdate { current: loaded, total, label: "LOADING" });
                },
            }
        }
    }
    summarize(enumerator.state());
    if enumerator.state().permission == Permission::Denied {
        exn::bail!(ErrorKind::Failed(format!("{} is not readable", directory.display())));
    }
    Ok(())
}

async fn sync(db: &Database, config: &Config, args: &SyncArgs, recalculate: bool) -> Result<()> {
    let layout = args.layout(config.gallery);
    layout.validate().or_raise(|| ErrorKind::Config)?;
    let width = TargetWidth::new(layout.target_width()).or_raise(|| ErrorKind::Width)?;
    let generator =
        CommandGenerator::new(&config.generator, &config.artifacts).or_raise(|| ErrorKind::Generator)?;
    let reconciler = Reconciler::new(cache(db), Arc::new(generator), config.batch_size);
    let mut gallery = Gallery::new(enumerator(db, config, &args.directory).await?, reconciler);

    let observer = ConsoleObserver::stderr();
    gallery.start(&observer).await;
    summarize(gallery.enumeration());
    if let Some(e) = gallery.last_error() {
        exn::bail!(ErrorKind::Failed(e.to_string()));
    }
    if gallery.enumeration().permission == Permission::Denied {
        exn::bail!(ErrorKind::Failed(format!("{} is not readable", args.directory.display())));
    }

    tracing::info!(width = %width, columns = layout.columns, gap = layout.gap, "Reconciling artifacts");
    let state = if recalculate {
        gallery.recalculate(width, &observer).await
    } else {
        gallery.reconcile(width, &observer).await
    };
    for (name, millis) in gallery.performance().entries() {
        tracing::debug!(operation = %name, millis, "Timing");
    }
    if state != ReconcileState::Ready {
        let reason = gallery.last_error().unwrap_or("reconciliation did not finish").to_string();
        exn::bail!(ErrorKind::Failed(reason));
    }
    println!("artifacts:  {} at width {width}", gallery.reconciliation().len());
    Ok(())
}

async fn clear(db: &Database) -> Result<()> {
    let cache = cache(db);
    let removed = cache.len().await.or_raise(|| ErrorKind::Database)?;
    cache.clear().await.or_raise(|| ErrorKind::Database)?;
    println!("removed {removed} cache entries");
    Ok(())
}

async fn status(db: &Database) -> Result<()> {
    let state = PersistedState::restore(Arc::new(db.namespace(STATE_NAMESPACE)), STATE_KEY, EnumerationState::default())
        .await
        .or_raise(|| ErrorKind::Database)?;
    summarize(state.get());
    let entries = cache(db).len().await.or_raise(|| ErrorKind::Database)?;
    println!("cached:     {entries}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mipmap_cache::CacheKey;
    use mipmap_library::enumerate::LoadingState;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_records_directory() {
        let photos = TempDir::new().unwrap();
        for name in ["a.jpg", "b.png", "readme.md"] {
            std::fs::write(photos.path().join(name), b"x").unwrap();
        }
        let db = Database::connect_in_memory().await.unwrap();
        scan(&db, &Config::default(), photos.path()).await.unwrap();

        let state = PersistedState::restore(Arc::new(db.namespace(STATE_NAMESPACE)), STATE_KEY, EnumerationState::default())
            .await
            .unwrap();
        assert_eq!(state.get().loading, LoadingState::Completed);
        assert_eq!(state.get().total_count, Some(2));
        assert_eq!(state.get().permission, Permission::Granted);
    }

    #[tokio::test]
    async fn test_scan_missing_directory_is_denied() {
        let db = Database::connect_in_memory().await.unwrap();
        let err = scan(&db, &Config::default(), Path::new("/definitely/not/a/photo/library")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Failed(_)));
    }

    #[tokio::test]
    async fn test_clear_empties_cache() {
        let db = Database::connect_in_memory().await.unwrap();
        let width = TargetWidth::new(77.0).unwrap();
        cache(&db).put(CacheKey::new("file:///a.jpg", width), "/artifacts/a.jpg").await.unwrap();
        clear(&db).await.unwrap();
        assert_eq!(cache(&db).len().await.unwrap(), 0);
    }
}
