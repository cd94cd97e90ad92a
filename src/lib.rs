//! mdxpress: a static site builder for MDX-authored blogs
//!
//! This crate loads MDX posts with YAML front matter, compiles them against a
//! fixed set of components, inlines external embeds fetched at build time and
//! renders every page plus an RSS feed with built-in Tera templates.

pub mod commands;
pub mod config;
pub mod content;
pub mod embed;
pub mod error;
pub mod feed;
pub mod generator;
pub mod helpers;
pub mod render;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use error::{BuildError, BuildResult};

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "site.yml";

/// A site directory and its configuration
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content directory (home.mdx and posts/)
    pub content_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Site {
    /// Open a site directory; a missing site.yml means default configuration
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let content_dir = base_dir.join(&config.content_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            content_dir,
            public_dir,
        })
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.content_dir.join("posts")
    }

    pub fn home_path(&self) -> PathBuf {
        self.content_dir.join("home.mdx")
    }

    pub fn feed_path(&self) -> PathBuf {
        self.public_dir
            .join(self.config.feed_path.trim_start_matches('/'))
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    /// Build the site
    pub async fn build(&self) -> Result<()> {
        commands::build::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }

    /// Create a new post
    pub fn new_post(&self, title: &str, slug: Option<&str>, tags: &[String]) -> Result<PathBuf> {
        commands::new::create_post(self, title, slug, tags)
    }
}
