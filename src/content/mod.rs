//! Content module - front matter, posts, the post catalog and MDX compilation

pub mod catalog;
mod frontmatter;
pub mod jsx;
mod mdx;
mod post;

pub use catalog::PostCatalog;
pub use frontmatter::{parse_date_string, split_commas, FrontMatter, FrontMatterError};
pub use mdx::{CompileError, CompiledCode, MdxCompiler, Segment};
pub use post::{CompiledPost, Post, PostMeta, EMBED_COMPONENTS};
