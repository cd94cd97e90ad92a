//! Built-in site templates using the Tera template engine
//!
//! The layout, pages and partials are embedded in the binary, so a site
//! directory only needs `site.yml` and its content.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::{NavRoute, SearchConfig, SiteConfig};
use crate::content::PostMeta;
use crate::helpers::{full_url_for, post_path, url_for};

/// Template renderer with the embedded site theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> tera::Result<Self> {
        let mut tera = Tera::default();

        // URLs and rendered bodies go out as-is; templates escape text
        // fields explicitly with `| escape`
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("home.html", include_str!("site/home.html")),
            ("posts.html", include_str!("site/posts.html")),
            ("post.html", include_str!("site/post.html")),
            ("404.html", include_str!("site/404.html")),
            // Partials
            ("partials/head.html", include_str!("site/partials/head.html")),
            ("partials/nav.html", include_str!("site/partials/nav.html")),
            (
                "partials/post_list.html",
                include_str!("site/partials/post_list.html"),
            ),
        ])?;

        tera.register_filter("date_format", date_format_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> tera::Result<String> {
        self.tera.render(template_name, context)
    }

    /// Context shared by every page: site data plus the page's own head data
    pub fn base_context(&self, site: &SiteData, page: &PageData) -> Context {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("page", page);
        context
    }
}

/// Tera filter: reformat a `YYYY-MM-DD` date
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "%B %d, %Y".to_string(),
    };

    let date = s.get(..10).unwrap_or(&s);
    match chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(date) => Ok(tera::Value::String(date.format(&format).to_string())),
        // Anything else is shown as written
        Err(_) => Ok(tera::Value::String(s)),
    }
}

/// Format a Tera error with its causes; the top-level message alone only
/// names the template
pub fn describe_error(err: &tera::Error) -> String {
    use std::error::Error;

    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub url: String,
    pub root: String,
    pub feed_url: String,
    pub author: AuthorData,
    pub nav: Vec<NavRoute>,
    pub seo: SeoData,
    pub search: SearchConfig,
    pub generator: String,
    /// Year shown in the footer
    pub year: i32,
}

impl SiteData {
    pub fn from_config(config: &SiteConfig, updated: DateTime<Utc>) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            url: config.url.trim_end_matches('/').to_string(),
            root: url_for(config, "/"),
            feed_url: full_url_for(config, &config.feed_path),
            author: AuthorData {
                name: config.author.name.clone(),
                link: config.author.link.clone(),
            },
            nav: config
                .nav
                .iter()
                .map(|route| NavRoute {
                    route: url_for(config, &route.route),
                    title: route.title.clone(),
                })
                .collect(),
            seo: SeoData {
                title: config.seo_title().to_string(),
                description: config.seo_description().to_string(),
                site_name: config
                    .seo
                    .site_name
                    .clone()
                    .unwrap_or_else(|| config.title.clone()),
                twitter_handle: config.seo.twitter_handle.clone(),
                twitter_site: config.seo.twitter_site.clone(),
                card_type: config.seo.card_type.clone(),
            },
            search: config.search.clone(),
            generator: concat!("mdxpress ", env!("CARGO_PKG_VERSION")).to_string(),
            year: updated.year(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorData {
    pub name: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeoData {
    pub title: String,
    pub description: String,
    pub site_name: String,
    pub twitter_handle: Option<String>,
    pub twitter_site: Option<String>,
    pub card_type: String,
}

/// Head data of one page
#[derive(Debug, Clone, Serialize)]
pub struct PageData {
    /// Page's own title, used for `og:title`
    pub title: String,
    /// Contents of `<title>`
    pub document_title: String,
    pub description: String,
    /// Site-relative route, used to mark the active nav entry
    pub path: String,
    /// Canonical absolute URL
    pub url: String,
    /// `website` or `article`
    pub kind: &'static str,
}

impl PageData {
    pub fn new(config: &SiteConfig, path: &str) -> Self {
        Self {
            title: config.seo_title().to_string(),
            document_title: config.seo_title().to_string(),
            description: config.seo_description().to_string(),
            path: url_for(config, path),
            url: full_url_for(config, path),
            kind: "website",
        }
    }

    /// Head data of a post page
    pub fn article(config: &SiteConfig, meta: &PostMeta) -> Self {
        let mut page = Self::new(config, &post_path(&meta.slug));
        page.document_title = format!("{} | {}", meta.title, config.seo_title());
        page.title = meta.title.clone();
        if !meta.description.is_empty() {
            page.description = meta.description.clone();
        }
        page.kind = "article";
        page
    }
}

/// A post as shown in listings and pager links
#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub datetime: String,
    pub description: String,
    pub tags: Vec<String>,
    pub path: String,
}

impl PostData {
    pub fn from_meta(config: &SiteConfig, meta: &PostMeta) -> Self {
        Self {
            slug: meta.slug.clone(),
            title: meta.title.clone(),
            date: meta.published.format("%Y-%m-%d").to_string(),
            datetime: crate::helpers::date_xml(&meta.published),
            description: meta.description.clone(),
            tags: meta.tags.iter().cloned().collect(),
            path: url_for(config, &post_path(&meta.slug)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagData {
    pub name: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_page(template: &str, extra: impl FnOnce(&mut Context)) -> String {
        let renderer = TemplateRenderer::new().unwrap();
        let mut config = SiteConfig::default();
        config.title = "Zaid's site".to_string();
        config.url = "https://zaidmkz.xyz".to_string();
        config.seo.twitter_handle = Some("@zaidmukaddam".to_string());
        config.search.enable = true;
        config.search.app_id = "81S2C2Y0RN".to_string();
        config.search.index_name = "zaidmkz".to_string();

        let site = SiteData::from_config(&config, Utc::now());
        let page = PageData::new(&config, "/posts");
        let mut context = renderer.base_context(&site, &page);
        extra(&mut context);
        renderer.render(template, &context).unwrap()
    }

    #[test]
    fn test_layout_head_and_nav() {
        let html = render_page("404.html", |_| {});
        assert!(html.contains("<title>Zaid&#x27;s site</title>"));
        assert!(html.contains(r#"<meta name="twitter:creator" content="@zaidmukaddam">"#));
        assert!(html.contains(r#"<meta name="twitter:card" content="summary_large_image">"#));
        assert!(html.contains(
            r#"<link rel="alternate" type="application/rss+xml" title="Zaid&#x27;s site" href="https://zaidmkz.xyz/rss.xml">"#
        ));
        assert!(html.contains(r#"<a class="nav-link active" href="/posts">Posts</a>"#));
        assert!(html.contains("\"81S2C2Y0RN\""));
    }

    #[test]
    fn test_body_is_emitted_verbatim() {
        let html = render_page("home.html", |context| {
            context.insert("body", "<h1>Hi</h1>");
        });
        assert!(html.contains("<h1>Hi</h1>"));
    }

    #[test]
    fn test_date_format_filter() {
        let mut args = HashMap::new();
        let value = tera::Value::String("2024-01-15".to_string());
        assert_eq!(
            date_format_filter(&value, &args).unwrap(),
            tera::Value::String("January 15, 2024".to_string())
        );

        args.insert("format".to_string(), tera::Value::String("%Y".to_string()));
        assert_eq!(
            date_format_filter(&value, &args).unwrap(),
            tera::Value::String("2024".to_string())
        );

        let odd = tera::Value::String("someday".to_string());
        assert_eq!(date_format_filter(&odd, &args).unwrap(), odd);
    }
}
