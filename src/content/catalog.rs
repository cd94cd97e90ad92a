//! Post catalog - loads every post in the content store

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{FrontMatter, Post, PostMeta};
use crate::error::{BuildError, BuildResult};

/// All posts of one build, newest first
#[derive(Debug, Clone, Default)]
pub struct PostCatalog {
    posts: Vec<Post>,
    metas: Vec<PostMeta>,
    by_slug: HashMap<String, usize>,
}

impl PostCatalog {
    /// Load all posts from a posts directory.
    ///
    /// Posts are sorted by descending date, then by slug, so the order does
    /// not depend on how the filesystem enumerates files. A missing
    /// directory is an empty catalog.
    pub fn load(posts_dir: &Path) -> BuildResult<Self> {
        if !posts_dir.exists() {
            return Ok(Self::default());
        }

        let mut posts = Vec::new();
        for entry in WalkDir::new(posts_dir).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(posts_dir).to_path_buf();
                BuildError::io(path, e.into())
            })?;
            let path = entry.path();
            if path.is_file() && is_mdx_file(path) {
                posts.push(load_post(posts_dir, path)?);
            }
        }

        Self::from_posts(posts)
    }

    /// Build a catalog from posts already in memory
    pub fn from_posts(mut posts: Vec<Post>) -> BuildResult<Self> {
        posts.sort_by(|a, b| {
            b.meta
                .published
                .cmp(&a.meta.published)
                .then_with(|| a.meta.slug.cmp(&b.meta.slug))
        });

        let mut by_slug: HashMap<String, usize> = HashMap::with_capacity(posts.len());
        for (i, post) in posts.iter().enumerate() {
            if let Some(&first) = by_slug.get(&post.meta.slug) {
                return Err(BuildError::DuplicateSlug {
                    slug: post.meta.slug.clone(),
                    first: posts[first].source.clone(),
                    second: post.source.clone(),
                });
            }
            by_slug.insert(post.meta.slug.clone(), i);
        }

        let metas = posts.iter().map(|p| p.meta.clone()).collect();
        Ok(Self {
            posts,
            metas,
            by_slug,
        })
    }

    /// Every post's metadata in catalog order
    pub fn list_all(&self) -> &[PostMeta] {
        &self.metas
    }

    /// Look up a post by slug
    pub fn get_by_slug(&self, slug: &str) -> BuildResult<&Post> {
        self.by_slug
            .get(slug)
            .map(|&i| &self.posts[i])
            .ok_or_else(|| BuildError::PostNotFound(slug.to_string()))
    }

    /// The posts immediately newer and older than `slug`
    pub fn neighbours(&self, slug: &str) -> (Option<&PostMeta>, Option<&PostMeta>) {
        match self.by_slug.get(slug) {
            Some(&i) => (
                i.checked_sub(1).and_then(|j| self.metas.get(j)),
                self.metas.get(i + 1),
            ),
            None => (None, None),
        }
    }

    /// Tags with the number of posts carrying them, most used first
    pub fn tag_counts(&self) -> Vec<(String, usize)> {
        let mut counts: indexmap::IndexMap<&str, usize> = indexmap::IndexMap::new();
        for meta in &self.metas {
            for tag in &meta.tags {
                *counts.entry(tag.as_str()).or_insert(0) += 1;
            }
        }
        let mut counts: Vec<_> = counts
            .into_iter()
            .map(|(tag, count)| (tag.to_string(), count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Load a single post from a file
fn load_post(posts_dir: &Path, path: &Path) -> BuildResult<Post> {
    let raw = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    let file = path
        .strip_prefix(posts_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string();
    let malformed = |source| BuildError::MalformedFrontMatter {
        file: file.clone(),
        source,
    };

    let (front_matter, body) = FrontMatter::parse(&raw).map_err(malformed)?;
    let file_slug = path.file_stem().and_then(|s| s.to_str());
    let meta = PostMeta::from_front_matter(&front_matter, body, file_slug).map_err(malformed)?;
    tracing::debug!("Loaded post {} from {}", meta.slug, file);

    Ok(Post {
        meta,
        body: body.to_string(),
        front_matter,
        source: PathBuf::from(path),
    })
}

/// Check if a file is an MDX (or plain Markdown) document
fn is_mdx_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "mdx" || e == "md")
        .unwrap_or(false)
}
