//! HTML helper functions

use super::url::url_for;
use crate::config::SiteConfig;

/// Escape HTML special characters
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Generate an image tag
///
/// # Examples
/// ```ignore
/// image_tag(&config, "/images/photo.jpg", "My Photo", &[("width", "400")])
/// ```
pub fn image_tag(config: &SiteConfig, path: &str, alt: &str, attrs: &[(&str, &str)]) -> String {
    let mut tag = format!(
        r#"<img src="{}" alt="{}""#,
        escape_html(&url_for(config, path)),
        escape_html(alt)
    );
    for (name, value) in attrs {
        tag.push_str(&format!(r#" {}="{}""#, name, escape_html(value)));
    }
    tag.push_str(r#" loading="lazy">"#);
    tag
}
