//! RSS feed generation
//!
//! The feed is rebuilt from the whole catalog on every build: `generate`
//! maps post metadata to a [`FeedDocument`], `serialize` turns it into RSS
//! 2.0 XML and `write` replaces the file on disk.

use chrono::{DateTime, Datelike, Utc};
use rss::extension::atom::{AtomExtension, Link};
use rss::validation::Validate;
use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, ItemBuilder};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::SiteConfig;
use crate::content::PostMeta;
use crate::error::{BuildError, BuildResult};
use crate::helpers::{full_url_for, post_url};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";

/// Channel-level settings of the feed
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub title: String,
    pub description: String,
    /// Site URL including `root`, without a trailing slash
    pub base_url: String,
    pub language: String,
    /// Absolute URL the feed itself is served from
    pub feed_url: String,
    pub author_name: String,
    pub author_email: String,
    pub author_link: String,
}

impl ChannelConfig {
    pub fn from_site(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            base_url: full_url_for(config, "/").trim_end_matches('/').to_string(),
            language: config.language.clone(),
            feed_url: full_url_for(config, &config.feed_path),
            author_name: config.author.name.clone(),
            author_email: config.author.email.clone(),
            author_link: config.author.link.clone(),
        }
    }

    /// RSS author field: `email (Name)`, or just the name without an email
    fn author(&self) -> String {
        if self.author_email.is_empty() {
            self.author_name.clone()
        } else {
            format!("{} ({})", self.author_email, self.author_name)
        }
    }
}

/// One feed entry
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    /// `base_url/posts/<slug>`, used as both link and guid
    pub url: String,
    pub description: String,
    pub content: String,
    pub author: String,
    pub published: DateTime<Utc>,
    pub categories: Vec<String>,
}

/// A complete feed, ready to serialize
#[derive(Debug, Clone, PartialEq)]
pub struct FeedDocument {
    pub channel: ChannelConfig,
    pub copyright: String,
    pub updated: DateTime<Utc>,
    pub items: Vec<FeedItem>,
}

/// Build the feed for `posts`, keeping their order
pub fn generate(posts: &[PostMeta], channel: &ChannelConfig, updated: DateTime<Utc>) -> FeedDocument {
    let author = channel.author();
    let items = posts
        .iter()
        .map(|meta| FeedItem {
            title: meta.title.clone(),
            url: post_url(&channel.base_url, &meta.slug),
            description: meta.description.clone(),
            content: meta.description.clone(),
            author: author.clone(),
            published: meta.published,
            categories: meta.tags.iter().cloned().collect(),
        })
        .collect();

    FeedDocument {
        copyright: format!(
            "All rights reserved {}, {}",
            updated.year(),
            channel.author_name
        ),
        channel: channel.clone(),
        updated,
        items,
    }
}

/// Serialize a feed document as RSS 2.0 XML
pub fn serialize(doc: &FeedDocument) -> BuildResult<Vec<u8>> {
    let items: Vec<rss::Item> = doc
        .items
        .iter()
        .map(|item| {
            let categories = item
                .categories
                .iter()
                .map(|tag| CategoryBuilder::default().name(tag.clone()).build())
                .collect::<Vec<_>>();

            ItemBuilder::default()
                .title(Some(item.title.clone()))
                .link(Some(item.url.clone()))
                .guid(Some(
                    GuidBuilder::default()
                        .permalink(true)
                        .value(item.url.clone())
                        .build(),
                ))
                .description(Some(item.description.clone()))
                .content(Some(item.content.clone()))
                .author(Some(item.author.clone()))
                .pub_date(Some(item.published.to_rfc2822()))
                .categories(categories)
                .build()
        })
        .collect();

    let mut self_link = Link::default();
    self_link.set_href(doc.channel.feed_url.clone());
    self_link.set_rel("self");
    self_link.set_mime_type(Some("application/rss+xml".to_string()));
    let mut atom = AtomExtension::default();
    atom.set_links(vec![self_link]);

    let mut namespaces = BTreeMap::new();
    namespaces.insert("atom".to_string(), ATOM_NAMESPACE.to_string());
    namespaces.insert("content".to_string(), CONTENT_NAMESPACE.to_string());

    let mut channel = ChannelBuilder::default()
        .title(doc.channel.title.clone())
        .link(doc.channel.base_url.clone())
        .description(doc.channel.description.clone())
        .language(Some(doc.channel.language.clone()))
        .copyright(Some(doc.copyright.clone()))
        .managing_editor(Some(doc.channel.author()))
        .last_build_date(Some(doc.updated.to_rfc2822()))
        .generator(Some(concat!("mdxpress ", env!("CARGO_PKG_VERSION")).to_string()))
        .items(items)
        .build();
    channel.set_atom_ext(Some(atom));
    channel.set_namespaces(namespaces);

    channel
        .validate()
        .map_err(|e| BuildError::InvalidFeed(e.to_string()))?;

    channel
        .pretty_write_to(Vec::new(), b' ', 2)
        .map_err(|e| BuildError::InvalidFeed(e.to_string()))
}

/// Write serialized feed bytes, replacing any previous file
pub fn write(bytes: &[u8], path: &Path) -> BuildResult<()> {
    let feed_write = |source| BuildError::FeedWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(feed_write)?;
    }
    fs::write(path, bytes).map_err(feed_write)?;

    tracing::info!("Generated feed: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PostMeta;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn channel() -> ChannelConfig {
        let mut config = SiteConfig::default();
        config.title = "Zaid Mukaddam".to_string();
        config.description = "Notes".to_string();
        config.url = "https://zaidmkz.xyz/".to_string();
        config.author.name = "Zaid".to_string();
        config.author.email = "zaid@example.com".to_string();
        ChannelConfig::from_site(&config)
    }

    fn post(slug: &str, date: &str, tags: &str) -> PostMeta {
        let raw = format!(
            "---\nslug: {slug}\ntitle: Title of {slug}\ndate: {date}\ndescription: About {slug}\ntags: {tags}\n---\n"
        );
        PostMeta::extract(&raw, None).unwrap()
    }

    fn updated() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_item_links_include_root() {
        let mut config = SiteConfig::default();
        config.url = "https://example.com".to_string();
        config.root = "/blog/".to_string();
        let channel = ChannelConfig::from_site(&config);
        assert_eq!(channel.base_url, "https://example.com/blog");

        let doc = generate(&[post("hello-world", "2024-01-15", "")], &channel, updated());
        assert_eq!(doc.items[0].url, "https://example.com/blog/posts/hello-world");
        assert_eq!(doc.channel.feed_url, "https://example.com/blog/rss.xml");
    }

    #[test]
    fn test_item_links() {
        let posts = vec![post("hello-world", "2024-01-15", "react"), post("second", "2024-02-01", "")];
        let doc = generate(&posts, &channel(), updated());
        assert_eq!(doc.items[0].url, "https://zaidmkz.xyz/posts/hello-world");
        assert_eq!(doc.items[1].url, "https://zaidmkz.xyz/posts/second");
        assert_eq!(doc.channel.feed_url, "https://zaidmkz.xyz/rss.xml");
        assert_eq!(doc.copyright, "All rights reserved 2024, Zaid");
    }

    #[test]
    fn test_items_follow_input_order() {
        let posts = vec![post("b", "2023-01-01", ""), post("a", "2024-01-01", "")];
        let doc = generate(&posts, &channel(), updated());
        let titles: Vec<_> = doc.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Title of b", "Title of a"]);
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let posts = vec![post("hello-world", "2024-01-15", "react, web")];
        let first = serialize(&generate(&posts, &channel(), updated())).unwrap();
        let second = serialize(&generate(&posts, &channel(), updated())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialized_fields() {
        let posts = vec![post("hello-world", "2024-01-15", "react, typescript,web ")];
        let xml = String::from_utf8(serialize(&generate(&posts, &channel(), updated())).unwrap())
            .unwrap();

        assert!(xml.contains("<title>Zaid Mukaddam</title>"));
        assert!(xml.contains("<link>https://zaidmkz.xyz/posts/hello-world</link>"));
        assert!(xml.contains("https://zaidmkz.xyz/posts/hello-world</guid>"));
        assert!(xml.contains("<category>react</category>"));
        assert!(xml.contains("<category>typescript</category>"));
        assert!(xml.contains("<category>web</category>"));
        assert!(xml.contains("<author>zaid@example.com (Zaid)</author>"));
        assert!(xml.contains("<language>en</language>"));
        assert!(xml.contains("Mon, 15 Jan 2024 00:00:00 +0000"));
        assert!(xml.contains("https://zaidmkz.xyz/rss.xml"));
    }

    #[test]
    fn test_empty_catalog_is_a_valid_feed() {
        let xml = serialize(&generate(&[], &channel(), updated())).unwrap();
        assert!(String::from_utf8(xml).unwrap().contains("<channel>"));
    }

    #[test]
    fn test_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("public/rss.xml");
        write(b"first version", &path).unwrap();
        write(b"second", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_write_failure_is_feed_write() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("public");
        fs::write(&blocker, "a file, not a directory").unwrap();
        let err = write(b"x", &blocker.join("rss.xml")).unwrap_err();
        assert!(matches!(err, BuildError::FeedWrite { .. }));
    }
}
