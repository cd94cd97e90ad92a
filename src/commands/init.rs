//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const CONFIG_TEMPLATE: &str = r#"# mdxpress configuration

# Site
title: My Blog
description: ''
language: en
author:
  name: John Doe
  email: ''
  link: ''
  avatar: /images/me.jpg

# URL
url: http://example.com
root: /

# Directory
content_dir: content
public_dir: public
feed_path: rss.xml

# Head: Open Graph and Twitter cards
seo:
  site_name: example.com
  twitter_handle:
  twitter_site:
  card_type: summary_large_image

# DocSearch
search:
  enable: false
  app_id: ''
  index_name: ''
  api_key: ''

nav:
  - route: /posts
    title: Posts

# External embeds (<StaticTweet id="..." />)
embeds:
  # endpoint: https://embeds.example.com/tweets/{id}.json
  # token_env: EMBEDS_TOKEN
  concurrency: 5
  timeout_secs: 10

build:
  concurrency: 8

highlight:
  theme: base16-ocean.dark
  line_number: false
"#;

const HOME_TEMPLATE: &str = r#"---
title: Home
---

# Hi, I'm John

<MyPic />

<Spacer size={24} />

Welcome to my blog. The latest writing is under [posts](/posts).
"#;

const HELLO_TEMPLATE: &str = r#"---
slug: hello-world
title: Hello World
date: 2024-01-01
description: The first post of this blog
tags: hello, mdx
---

# Hello World

This post is written in **MDX**: Markdown with a few components.

<Spacer size={16} />

```rust
fn main() {
    println!("Hello, world!");
}
```
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }

    // Create directory structure
    fs::create_dir_all(target_dir.join("content/posts"))?;

    fs::write(&config_path, CONFIG_TEMPLATE)?;
    write_if_missing(&target_dir.join("content/home.mdx"), HOME_TEMPLATE)?;
    write_if_missing(&target_dir.join("content/posts/hello-world.mdx"), HELLO_TEMPLATE)?;

    tracing::info!("Initialized site in {:?}", target_dir);
    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if !path.exists() {
        fs::write(path, content)?;
    }
    Ok(())
}
