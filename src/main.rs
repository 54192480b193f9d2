//! Demo binary: browse one directory live.
//!
//! Loads the given directory (or the current one), watches it for changes,
//! and prints each published snapshot as it arrives.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dirview::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dirview=debug".parse()?),
        )
        .init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .map_or_else(std::env::current_dir, Ok)?;

    let lister = Arc::new(FsDirectoryLister::new());
    let (reconciler, rx) = ReconcilerBuilder::new(lister).build();

    let mut pane = DirectoryPaneBuilder::new()
        .on_render(Box::new(|dir, entries| {
            println!("\n{} ({} entries)", dir.display(), entries.len());
            for entry in entries.iter().take(20) {
                let marker = if entry.is_dir { 'd' } else { '-' };
                println!("  {marker} {:>10}  {}", entry.size, entry.name);
            }
            if entries.len() > 20 {
                println!("  ... and {} more", entries.len() - 20);
            }
        }))
        .on_error(Box::new(|message| {
            println!("cannot access: {message}");
        }))
        .build();
    pane.attach(rx);

    if let Err(err) = reconciler.load(&dir, SortPolicy::default()).await {
        pane.view().show_error(&err.to_string()).await;
        return Ok(());
    }

    let mut watch = match attach_watcher(&reconciler, &dir) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!("live updates unavailable: {err}");
            None
        }
    };

    println!(
        "\nWatching {}. Try creating, renaming, or deleting files; Ctrl-C to exit.",
        dir.display()
    );
    tokio::signal::ctrl_c().await?;

    if let Some(watch) = watch.as_mut() {
        watch.stop();
    }
    pane.stop().await;
    Ok(())
}
