//! Generator module - builds every page and the feed of a site
//!
//! A build loads the catalog once, renders all outputs into memory and only
//! then writes them, so a failing post leaves the previous output untouched.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use once_cell::sync::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tera::Context;

use crate::content::{CompiledPost, FrontMatter, MdxCompiler, PostCatalog};
use crate::embed::EmbedFetcher;
use crate::error::{BuildError, BuildResult};
use crate::feed::{self, ChannelConfig};
use crate::render::{ComponentRegistry, RenderContext};
use crate::templates::{describe_error, PageData, PostData, SiteData, TagData, TemplateRenderer};
use crate::Site;

/// State shared by every consumer of one build.
///
/// The catalog is loaded on first use and then read by the home page, the
/// listing, the feed and every post page alike.
pub struct BuildContext<'a> {
    site: &'a Site,
    catalog: OnceCell<PostCatalog>,
}

impl<'a> BuildContext<'a> {
    pub fn new(site: &'a Site) -> Self {
        Self {
            site,
            catalog: OnceCell::new(),
        }
    }

    pub fn site(&self) -> &Site {
        self.site
    }

    /// The post catalog of this build
    pub fn catalog(&self) -> BuildResult<&PostCatalog> {
        self.catalog.get_or_try_init(|| {
            let catalog = PostCatalog::load(&self.site.posts_dir())?;
            tracing::info!("Loaded {} posts", catalog.len());
            Ok(catalog)
        })
    }
}

/// What a successful build produced
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub posts: usize,
    /// Files written, relative to the public directory
    pub files: Vec<PathBuf>,
    pub feed: PathBuf,
}

/// Static site generator using Tera templates
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
    fetcher: EmbedFetcher,
    home_components: ComponentRegistry,
    post_components: ComponentRegistry,
    home_compiler: MdxCompiler,
    post_compiler: MdxCompiler,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> BuildResult<Self> {
        let renderer = TemplateRenderer::new().map_err(|e| BuildError::Render {
            page: "templates".to_string(),
            reason: describe_error(&e),
        })?;
        let fetcher = EmbedFetcher::from_config(&site.config.embeds)
            .map_err(|e| BuildError::Config(e.to_string()))?;

        let home_components = ComponentRegistry::home();
        let post_components = ComponentRegistry::post();
        let highlight = &site.config.highlight;

        Ok(Self {
            home_compiler: MdxCompiler::new(home_components.names(), highlight),
            post_compiler: MdxCompiler::new(post_components.names(), highlight),
            site: site.clone(),
            renderer,
            fetcher,
            home_components,
            post_components,
        })
    }

    /// Use a different embed fetcher
    pub fn with_fetcher(mut self, fetcher: EmbedFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Generate the entire site
    pub async fn generate(&self, updated: DateTime<Utc>) -> BuildResult<BuildReport> {
        let start = Instant::now();
        let ctx = BuildContext::new(&self.site);
        let catalog = ctx.catalog()?;
        let site_data = SiteData::from_config(&self.site.config, updated);

        let mut outputs: Vec<(PathBuf, String)> = vec![
            (PathBuf::from("index.html"), self.render_home(&ctx, &site_data)?),
            (
                PathBuf::from("posts/index.html"),
                self.render_listing(&ctx, &site_data)?,
            ),
        ];

        let concurrency = self.site.config.build.concurrency.max(1);
        let ctx_ref = &ctx;
        let site_ref = &site_data;
        let mut pages: Vec<(PathBuf, String)> = stream::iter(catalog.list_all())
            .map(|meta| async move {
                let html = self.render_post(ctx_ref, site_ref, &meta.slug).await?;
                Ok::<_, BuildError>((
                    PathBuf::from("posts").join(&meta.slug).join("index.html"),
                    html,
                ))
            })
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;
        pages.sort_by(|a, b| a.0.cmp(&b.0));
        outputs.append(&mut pages);

        outputs.push((PathBuf::from("404.html"), self.render_not_found(&site_data)?));

        let channel = ChannelConfig::from_site(&self.site.config);
        let feed_bytes = feed::serialize(&feed::generate(catalog.list_all(), &channel, updated))?;

        // Everything rendered; now write
        let public_dir = &self.site.public_dir;
        for (relative, html) in &outputs {
            write_output(&public_dir.join(relative), html.as_bytes())?;
            tracing::debug!("Generated: {:?}", relative);
        }
        let feed_path = self.site.feed_path();
        feed::write(&feed_bytes, &feed_path)?;

        tracing::info!(
            "Generated {} files in {:.2}s",
            outputs.len() + 1,
            start.elapsed().as_secs_f64()
        );

        Ok(BuildReport {
            posts: catalog.len(),
            files: outputs.into_iter().map(|(path, _)| path).collect(),
            feed: feed_path,
        })
    }

    /// Compile a post and fetch the embeds it references
    pub async fn compile_post(&self, ctx: &BuildContext<'_>, slug: &str) -> BuildResult<CompiledPost> {
        let post = ctx.catalog()?.get_by_slug(slug)?;

        let code = self
            .post_compiler
            .compile(&post.body, &post.front_matter)
            .map_err(|source| BuildError::Compile {
                slug: slug.to_string(),
                source,
            })?;

        let embeds = self
            .fetcher
            .fetch_embeds(&post.meta.embed_ids)
            .await
            .map_err(|source| BuildError::EmbedFetch {
                slug: slug.to_string(),
                source,
            })?;

        Ok(CompiledPost {
            meta: post.meta.clone(),
            code,
            embeds,
        })
    }

    /// Render the page of one post
    pub async fn render_post(
        &self,
        ctx: &BuildContext<'_>,
        site_data: &SiteData,
        slug: &str,
    ) -> BuildResult<String> {
        let compiled = self.compile_post(ctx, slug).await?;
        let config = &self.site.config;
        let page_name = format!("post {slug}");

        let body = self
            .post_components
            .render(
                &compiled.code,
                &RenderContext {
                    config,
                    embeds: &compiled.embeds,
                },
            )
            .map_err(|e| render_error(&page_name, e))?;

        let (newer, older) = ctx.catalog()?.neighbours(slug);

        let mut context = self
            .renderer
            .base_context(site_data, &PageData::article(config, &compiled.meta));
        context.insert("post", &PostData::from_meta(config, &compiled.meta));
        context.insert("body", &body);
        context.insert("newer", &newer.map(|m| PostData::from_meta(config, m)));
        context.insert("older", &older.map(|m| PostData::from_meta(config, m)));

        self.render_template(&page_name, "post.html", &context)
    }

    /// Render the home document
    pub fn render_home(&self, ctx: &BuildContext<'_>, site_data: &SiteData) -> BuildResult<String> {
        let path = self.site.home_path();
        let raw = fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        let (front_matter, body) =
            FrontMatter::parse(&raw).map_err(|source| BuildError::MalformedFrontMatter {
                file: "home.mdx".to_string(),
                source,
            })?;

        let code = self
            .home_compiler
            .compile(body, &front_matter)
            .map_err(|source| BuildError::Compile {
                slug: "home".to_string(),
                source,
            })?;
        let embeds = Default::default();
        let body = self
            .home_components
            .render(
                &code,
                &RenderContext {
                    config: &ctx.site().config,
                    embeds: &embeds,
                },
            )
            .map_err(|e| render_error("home", e))?;

        let mut page = PageData::new(&self.site.config, "/");
        if let Some(title) = front_matter.title {
            page.title = title;
        }
        if let Some(description) = front_matter.description {
            page.description = description;
        }

        let mut context = self.renderer.base_context(site_data, &page);
        context.insert("body", &body);
        self.render_template("home", "home.html", &context)
    }

    /// Render the `/posts` listing
    pub fn render_listing(&self, ctx: &BuildContext<'_>, site_data: &SiteData) -> BuildResult<String> {
        let catalog = ctx.catalog()?;
        let config = &self.site.config;

        let posts: Vec<PostData> = catalog
            .list_all()
            .iter()
            .map(|meta| PostData::from_meta(config, meta))
            .collect();
        let tags: Vec<TagData> = catalog
            .tag_counts()
            .into_iter()
            .map(|(name, count)| TagData { name, count })
            .collect();

        let mut page = PageData::new(config, "/posts");
        page.document_title = format!("Posts | {}", config.seo_title());
        page.title = "Posts".to_string();

        let mut context = self.renderer.base_context(site_data, &page);
        context.insert("posts", &posts);
        context.insert("tags", &tags);
        self.render_template("posts", "posts.html", &context)
    }

    /// Render the 404 page
    pub fn render_not_found(&self, site_data: &SiteData) -> BuildResult<String> {
        let config = &self.site.config;
        let mut page = PageData::new(config, "/404.html");
        page.document_title = format!("Not found | {}", config.seo_title());
        let context = self.renderer.base_context(site_data, &page);
        self.render_template("404", "404.html", &context)
    }

    fn render_template(&self, page: &str, template: &str, context: &Context) -> BuildResult<String> {
        self.renderer
            .render(template, context)
            .map_err(|e| BuildError::Render {
                page: page.to_string(),
                reason: describe_error(&e),
            })
    }
}

fn render_error(page: &str, err: crate::render::RenderError) -> BuildError {
    BuildError::Render {
        page: page.to_string(),
        reason: err.to_string(),
    }
}

/// Write one output file, creating its directory
fn write_output(path: &Path, bytes: &[u8]) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| BuildError::io(path, e))
}
