//! List site content

use anyhow::Result;

use crate::content::PostCatalog;
use crate::Site;

/// List site content by type
pub fn run(site: &Site, content_type: &str) -> Result<()> {
    let catalog = PostCatalog::load(&site.posts_dir())?;

    match content_type {
        "post" | "posts" => {
            println!("Posts ({}):", catalog.len());
            for meta in catalog.list_all() {
                let embeds = if meta.embed_ids.is_empty() {
                    String::new()
                } else {
                    format!(" ({} embeds)", meta.embed_ids.len())
                };
                println!(
                    "  {} - {} [{}]{}",
                    meta.published.format("%Y-%m-%d"),
                    meta.title,
                    meta.slug,
                    embeds
                );
            }
        }
        "tag" | "tags" => {
            let tags = catalog.tag_counts();
            println!("Tags ({}):", tags.len());
            for (tag, count) in tags {
                println!("  {} ({})", tag, count);
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, tag", content_type);
        }
    }

    Ok(())
}
