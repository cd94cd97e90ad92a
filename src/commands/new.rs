//! Create a new post

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::Site;

/// Create a new post from a title and return its path
pub fn create_post(site: &Site, title: &str, slug: Option<&str>, tags: &[String]) -> Result<PathBuf> {
    let slug = slug::slugify(slug.unwrap_or(title));
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a slug from {:?}", title);
    }

    let target_dir = site.posts_dir();
    fs::create_dir_all(&target_dir)?;

    let file_path = target_dir.join(format!("{}.mdx", slug));
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let now = chrono::Local::now();
    let content = format!(
        "---\nslug: {slug}\ntitle: {title}\ndate: {date}\ndescription: \"\"\ntags: {tags}\n---\n\n# {raw_title}\n",
        title = yaml_string(title),
        date = now.format("%Y-%m-%d"),
        tags = yaml_string(&tags.join(", ")),
        raw_title = title,
    );

    fs::write(&file_path, content)?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}

/// Double-quoted YAML scalar
fn yaml_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
