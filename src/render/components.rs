//! Built-in components

use super::{Component, RenderContext, RenderError};
use crate::content::jsx::Props;
use crate::helpers::{escape_html, image_tag, url_for};

/// Vertical whitespace: `<Spacer size={32} />`
pub struct Spacer;

impl Component for Spacer {
    fn render(&self, props: &Props, _ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let size = pixels("Spacer", props, "size")?.unwrap_or(32);
        Ok(format!(
            r#"<div class="spacer" style="height: {size}px" aria-hidden="true"></div>"#
        ))
    }
}

/// A content image: `<Image src="/a.png" alt="…" width={640} height={480} />`
pub struct Image;

impl Component for Image {
    fn render(&self, props: &Props, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let src = props.get("src").ok_or(RenderError::MissingProp {
            component: "Image",
            prop: "src",
        })?;
        let alt = props.get("alt").map(String::as_str).unwrap_or_default();

        let width = pixels("Image", props, "width")?.map(|w| w.to_string());
        let height = pixels("Image", props, "height")?.map(|h| h.to_string());
        let mut attrs = Vec::new();
        if let Some(width) = &width {
            attrs.push(("width", width.as_str()));
        }
        if let Some(height) = &height {
            attrs.push(("height", height.as_str()));
        }

        Ok(image_tag(ctx.config, src, alt, &attrs))
    }
}

/// The author's portrait from `author.avatar`
pub struct MyPic;

impl Component for MyPic {
    fn render(&self, props: &Props, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let size = pixels("MyPic", props, "size")?.unwrap_or(96).to_string();
        let author = &ctx.config.author;
        Ok(format!(
            r#"<figure class="my-pic">{}</figure>"#,
            image_tag(
                ctx.config,
                &author.avatar,
                &author.name,
                &[("width", size.as_str()), ("height", size.as_str())]
            )
        ))
    }
}

/// A social post snapshot fetched at build time: `<StaticTweet id="123" />`
pub struct StaticTweet;

impl Component for StaticTweet {
    fn render(&self, props: &Props, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let id = props.get("id").ok_or(RenderError::MissingProp {
            component: "StaticTweet",
            prop: "id",
        })?;
        let embed = ctx
            .embeds
            .get(id)
            .ok_or_else(|| RenderError::MissingEmbed(id.clone()))?;

        if let Some(html) = &embed.html {
            return Ok(html.clone());
        }

        let mut out = format!(
            r#"<blockquote class="static-tweet" data-id="{}">"#,
            escape_html(id)
        );

        out.push_str(r#"<header class="static-tweet-author">"#);
        if let Some(avatar) = &embed.author_avatar {
            out.push_str(&format!(
                r#"<img src="{}" alt="" width="48" height="48" loading="lazy">"#,
                escape_html(&url_for(ctx.config, avatar))
            ));
        }
        if let Some(name) = &embed.author_name {
            out.push_str(&format!("<strong>{}</strong>", escape_html(name)));
        }
        if let Some(handle) = &embed.author_handle {
            out.push_str(&format!(
                "<span>@{}</span>",
                escape_html(handle.trim_start_matches('@'))
            ));
        }
        out.push_str("</header>");

        if let Some(text) = &embed.text {
            let text = escape_html(text).replace('\n', "<br>");
            out.push_str(&format!("<p>{text}</p>"));
        }

        match (&embed.url, &embed.created_at) {
            (Some(url), created) => out.push_str(&format!(
                r#"<footer><a href="{}" target="_blank" rel="noopener">{}</a></footer>"#,
                escape_html(url),
                escape_html(created.as_deref().unwrap_or("View original"))
            )),
            (None, Some(created)) => {
                out.push_str(&format!("<footer>{}</footer>", escape_html(created)))
            }
            (None, None) => {}
        }

        out.push_str("</blockquote>");
        Ok(out)
    }
}

/// Optional non-negative pixel size
fn pixels(component: &'static str, props: &Props, prop: &'static str) -> Result<Option<u32>, RenderError> {
    props
        .get(prop)
        .map(|value| {
            value
                .trim()
                .trim_end_matches("px")
                .parse::<u32>()
                .map_err(|_| RenderError::InvalidProp {
                    component,
                    prop,
                    value: value.clone(),
                })
        })
        .transpose()
}
