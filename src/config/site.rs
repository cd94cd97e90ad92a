//! Site configuration (site.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    #[serde(default)]
    pub author: AuthorConfig,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub content_dir: String,
    pub public_dir: String,
    pub feed_path: String,

    // Head and navigation
    #[serde(default)]
    pub seo: SeoConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub nav: Vec<NavRoute>,

    // Build
    #[serde(default)]
    pub embeds: EmbedsConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            description: String::new(),
            language: "en".to_string(),
            author: AuthorConfig::default(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),

            content_dir: "content".to_string(),
            public_dir: "public".to_string(),
            feed_path: "rss.xml".to_string(),

            seo: SeoConfig::default(),
            search: SearchConfig::default(),
            nav: vec![NavRoute {
                route: "/posts".to_string(),
                title: "Posts".to_string(),
            }],

            embeds: EmbedsConfig::default(),
            build: BuildConfig::default(),
            highlight: HighlightConfig::default(),

            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Title used in the page head, falling back to the site title
    pub fn seo_title(&self) -> &str {
        self.seo.title.as_deref().unwrap_or(&self.title)
    }

    /// Description used in the page head, falling back to the site description
    pub fn seo_description(&self) -> &str {
        self.seo.description.as_deref().unwrap_or(&self.description)
    }
}

/// Site author, also used for the feed and the `MyPic` component
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorConfig {
    pub name: String,
    pub email: String,
    pub link: String,
    pub avatar: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: "John Doe".to_string(),
            email: String::new(),
            link: String::new(),
            avatar: "/images/me.jpg".to_string(),
        }
    }
}

/// Open Graph and Twitter card metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoConfig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub twitter_handle: Option<String>,
    pub twitter_site: Option<String>,
    pub card_type: String,
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            site_name: None,
            twitter_handle: None,
            twitter_site: None,
            card_type: "summary_large_image".to_string(),
        }
    }
}

/// DocSearch widget configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub enable: bool,
    pub app_id: String,
    pub index_name: String,
    pub api_key: String,
}

/// One navigation entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavRoute {
    pub route: String,
    pub title: String,
}

/// External embed provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedsConfig {
    /// URL template containing `{id}`
    pub endpoint: Option<String>,
    /// Name of the environment variable holding a bearer token
    pub token_env: Option<String>,
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for EmbedsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token_env: None,
            concurrency: 5,
            timeout_secs: 10,
        }
    }
}

/// Build pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Post pages built at the same time
    pub concurrency: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// syntect theme name
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_number: false,
        }
    }
}
