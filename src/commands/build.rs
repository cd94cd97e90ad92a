//! Build the static site

use anyhow::Result;
use notify::{RecursiveMode, Watcher};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::generator::{BuildReport, Generator};
use crate::Site;

/// Build every page and the feed
pub async fn run(site: &Site) -> Result<()> {
    build(site).await?;
    Ok(())
}

async fn build(site: &Site) -> Result<BuildReport> {
    let generator = Generator::new(site)?;
    let report = generator.generate(chrono::Utc::now()).await.map_err(|e| {
        match e.slug() {
            Some(slug) => tracing::error!("Build failed at {}: {}", slug, e),
            None => tracing::error!("Build failed: {}", e),
        }
        e
    })?;

    tracing::info!(
        "Built {} posts into {:?} ({} files)",
        report.posts,
        site.public_dir,
        report.files.len() + 1
    );
    Ok(report)
}

/// Watch content and configuration, rebuilding everything on change
pub async fn watch(site: &Site) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    watcher.watch(&site.content_dir, RecursiveMode::Recursive)?;
    let config_path = site.config_path();
    if config_path.exists() {
        watcher.watch(&config_path, RecursiveMode::NonRecursive)?;
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    while let Some(event) = rx.recv().await {
        if !event.kind.is_modify() && !event.kind.is_create() && !event.kind.is_remove() {
            continue;
        }

        // Let a burst of events settle into one rebuild
        tokio::time::sleep(Duration::from_millis(300)).await;
        while rx.try_recv().is_ok() {}

        tracing::info!("Change detected, rebuilding...");
        // site.yml may have changed too
        match Site::new(&site.base_dir) {
            Ok(site) => {
                if let Err(e) = build(&site).await {
                    tracing::error!("Rebuild failed: {:#}", e);
                }
            }
            Err(e) => tracing::error!("Failed to reload {:?}: {:#}", config_path, e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_site_without_posts_or_embeds() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        fs::write(dir.path().join("content/home.mdx"), "# Home\n").unwrap();
        let site = Site::new(dir.path()).unwrap();

        let report = build(&site).await.unwrap();
        assert_eq!(report.posts, 0);
        assert!(site.public_dir.join("index.html").exists());
        assert!(site.public_dir.join("rss.xml").exists());
    }

    #[tokio::test]
    async fn test_reference_to_unconfigured_embed_fails() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("content/posts")).unwrap();
        fs::write(dir.path().join("content/home.mdx"), "# Home\n").unwrap();
        fs::write(
            dir.path().join("content/posts/tweet.mdx"),
            "---\ntitle: T\ndate: 2024-01-01\n---\n<StaticTweet id=\"1\" />\n",
        )
        .unwrap();
        let site = Site::new(dir.path()).unwrap();

        let err = build(&site).await.unwrap_err();
        assert!(err.to_string().contains("tweet"));
        assert!(!site.public_dir.exists());
    }
}
