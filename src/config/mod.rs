//! Configuration module

mod site;

pub use site::AuthorConfig;
pub use site::BuildConfig;
pub use site::EmbedsConfig;
pub use site::HighlightConfig;
pub use site::NavRoute;
pub use site::SearchConfig;
pub use site::SeoConfig;
pub use site::SiteConfig;
