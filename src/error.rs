//! Build errors
//!
//! Every failure in the content pipeline is fatal to the build. Each variant
//! carries the slug, embed ID or path that caused it so the operator can find
//! the offending file.

use std::path::PathBuf;
use thiserror::Error;

use crate::content::{CompileError, FrontMatterError};
use crate::embed::EmbedFetchError;

/// Result alias for pipeline operations
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// An error that aborts the build
#[derive(Debug, Error)]
pub enum BuildError {
    /// Front matter is missing a required field or cannot be parsed
    #[error("malformed front matter in {file}: {source}")]
    MalformedFrontMatter {
        file: String,
        #[source]
        source: FrontMatterError,
    },

    /// Two content files resolve to the same slug
    #[error("duplicate slug {slug:?} in {first:?} and {second:?}")]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// No content file maps to the requested slug
    #[error("post not found: {0}")]
    PostNotFound(String),

    /// The MDX body of a post failed to compile
    #[error("failed to compile {slug}: {source}")]
    Compile {
        slug: String,
        #[source]
        source: CompileError,
    },

    /// One or more embeds referenced by a post could not be fetched
    #[error("failed to fetch embeds for {slug}: {source}")]
    EmbedFetch {
        slug: String,
        #[source]
        source: EmbedFetchError,
    },

    /// The feed document did not pass RSS validation
    #[error("invalid feed: {0}")]
    InvalidFeed(String),

    /// The feed file could not be written
    #[error("failed to write feed {path:?}: {source}")]
    FeedWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A page template or component failed to render
    #[error("failed to render {page}: {reason}")]
    Render { page: String, reason: String },

    /// The site configuration cannot drive a build
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading content or writing output failed
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    /// The slug this error is attributed to, if any
    pub fn slug(&self) -> Option<&str> {
        match self {
            BuildError::DuplicateSlug { slug, .. }
            | BuildError::Compile { slug, .. }
            | BuildError::EmbedFetch { slug, .. } => Some(slug),
            BuildError::PostNotFound(slug) => Some(slug),
            _ => None,
        }
    }
}
