//! Post models

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::path::PathBuf;

use super::frontmatter::{FrontMatter, FrontMatterError};
use super::jsx;
use super::mdx::CompiledCode;
use crate::embed::EmbedData;

/// Components whose `id` prop names an external embed
pub const EMBED_COMPONENTS: &[&str] = &["StaticTweet"];

/// Metadata of one post, taken from its front matter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostMeta {
    /// URL-friendly name, unique across the catalog
    pub slug: String,

    pub title: String,

    /// Date exactly as written in the front matter
    pub date: String,

    /// Parsed publication date
    pub published: DateTime<Utc>,

    pub description: String,

    /// Tags in first-seen order, without duplicates
    pub tags: IndexSet<String>,

    /// External embeds the body references, in first-seen order
    pub embed_ids: Vec<String>,
}

impl PostMeta {
    /// Extract metadata from a raw MDX document.
    ///
    /// `file_slug` is the slug derived from the file name. When given, the
    /// front-matter `slug` may be omitted, but if present it must agree.
    pub fn extract(raw: &str, file_slug: Option<&str>) -> Result<Self, FrontMatterError> {
        let (fm, body) = FrontMatter::parse(raw)?;
        Self::from_front_matter(&fm, body, file_slug)
    }

    /// Build metadata from already-parsed front matter and its body
    pub fn from_front_matter(
        fm: &FrontMatter,
        body: &str,
        file_slug: Option<&str>,
    ) -> Result<Self, FrontMatterError> {
        let declared = fm.slug.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let slug = match (declared, file_slug) {
            (Some(declared), Some(expected)) if declared != expected => {
                return Err(FrontMatterError::SlugMismatch {
                    declared: declared.to_string(),
                    expected: expected.to_string(),
                });
            }
            (Some(slug), _) | (None, Some(slug)) => slug.to_string(),
            (None, None) => return Err(FrontMatterError::Missing("slug")),
        };

        let title = fm
            .title
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(FrontMatterError::Missing("title"))?
            .to_string();

        let date = fm
            .date
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(FrontMatterError::Missing("date"))?
            .to_string();
        let published = fm
            .parse_date()
            .ok_or_else(|| FrontMatterError::InvalidDate(date.clone()))?;

        Ok(Self {
            slug,
            title,
            date,
            published,
            description: fm.description.clone().unwrap_or_default(),
            tags: fm.tags.iter().cloned().collect(),
            embed_ids: collect_embed_ids(&fm.embeds, body),
        })
    }
}

/// Declared embed IDs followed by those used in the body, de-duplicated.
///
/// A body that does not scan cleanly contributes nothing here; the compiler
/// reports the syntax error with its line number.
fn collect_embed_ids(declared: &[String], body: &str) -> Vec<String> {
    let mut ids: IndexSet<String> = declared.iter().cloned().collect();
    if let Ok(tags) = jsx::scan(body) {
        for tag in tags {
            if EMBED_COMPONENTS.contains(&tag.name.as_str()) {
                if let Some(id) = tag.props.get("id") {
                    ids.insert(id.clone());
                }
            }
        }
    }
    ids.into_iter().collect()
}

/// A post in the catalog: its metadata and the MDX it was read from
#[derive(Debug, Clone)]
pub struct Post {
    pub meta: PostMeta,

    pub front_matter: FrontMatter,

    /// MDX body with the front matter removed
    pub body: String,

    /// Full source file path
    pub source: PathBuf,
}

/// Everything a post page is rendered from
#[derive(Debug, Clone, Serialize)]
pub struct CompiledPost {
    pub meta: PostMeta,
    pub code: CompiledCode,
    pub embeds: IndexMap<String, EmbedData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = r#"---
slug: hello-world
title: Hello World
date: 2024-01-15
description: The first one
tags: "react, typescript,web "
embeds: ["999"]
---

Here is a tweet:

<StaticTweet id="123" />

And another, twice:

<StaticTweet id="456" />
<StaticTweet id="123" />
"#;

    #[test]
    fn test_extract() {
        let meta = PostMeta::extract(HELLO, Some("hello-world")).unwrap();
        assert_eq!(meta.slug, "hello-world");
        assert_eq!(meta.title, "Hello World");
        assert_eq!(meta.date, "2024-01-15");
        assert_eq!(meta.published.format("%Y-%m-%d").to_string(), "2024-01-15");
        assert_eq!(meta.description, "The first one");
        assert_eq!(meta.embed_ids, vec!["999", "123", "456"]);
    }

    #[test]
    fn test_tag_parsing() {
        let meta = PostMeta::extract(HELLO, None).unwrap();
        let expected: IndexSet<String> = ["react", "typescript", "web"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(meta.tags, expected);
    }

    #[test]
    fn test_duplicate_tags_collapse() {
        let raw = "---\nslug: a\ntitle: A\ndate: 2024-01-01\ntags: rust, mdx, rust\n---\n";
        let meta = PostMeta::extract(raw, None).unwrap();
        assert_eq!(meta.tags.len(), 2);
    }

    #[test]
    fn test_slug_from_file_name() {
        let raw = "---\ntitle: A\ndate: 2024-01-01\n---\n";
        let meta = PostMeta::extract(raw, Some("from-file")).unwrap();
        assert_eq!(meta.slug, "from-file");
        assert!(meta.tags.is_empty());
        assert!(meta.embed_ids.is_empty());
    }

    #[test]
    fn test_slug_mismatch() {
        let err = PostMeta::extract(HELLO, Some("other-name")).unwrap_err();
        assert!(matches!(err, FrontMatterError::SlugMismatch { .. }));
    }

    #[test]
    fn test_missing_required_fields() {
        let raw = "---\ntitle: A\ndate: 2024-01-01\n---\n";
        assert!(matches!(
            PostMeta::extract(raw, None),
            Err(FrontMatterError::Missing("slug"))
        ));

        let raw = "---\nslug: a\ndate: 2024-01-01\n---\n";
        assert!(matches!(
            PostMeta::extract(raw, None),
            Err(FrontMatterError::Missing("title"))
        ));

        let raw = "---\nslug: a\ntitle: A\n---\n";
        assert!(matches!(
            PostMeta::extract(raw, None),
            Err(FrontMatterError::Missing("date"))
        ));

        assert!(PostMeta::extract("no front matter at all", Some("x")).is_err());
    }

    #[test]
    fn test_unparsable_date() {
        let raw = "---\nslug: a\ntitle: A\ndate: someday\n---\n";
        assert!(matches!(
            PostMeta::extract(raw, None),
            Err(FrontMatterError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_embeds_in_code_are_ignored() {
        let raw = "---\nslug: a\ntitle: A\ndate: 2024-01-01\n---\n```mdx\n<StaticTweet id=\"1\" />\n```\n";
        let meta = PostMeta::extract(raw, None).unwrap();
        assert!(meta.embed_ids.is_empty());
    }

    #[test]
    fn test_stray_backticks_keep_embed_ids() {
        let raw = "---\nslug: a\ntitle: A\ndate: 2024-01-01\n---\nPress the ` key.\n\n<StaticTweet id=\"1\" />\n\nA lone ` again.\n";
        let meta = PostMeta::extract(raw, None).unwrap();
        assert_eq!(meta.embed_ids, vec!["1"]);
    }
}
