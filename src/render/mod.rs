//! Component rendering
//!
//! Compiled MDX refers to components by name. A [`ComponentRegistry`] maps
//! those names to renderers and is handed to every render call, so the home
//! page and post pages can each expose a different set.

mod components;

pub use components::{Image, MyPic, Spacer, StaticTweet};

use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::SiteConfig;
use crate::content::jsx::Props;
use crate::content::{CompiledCode, Segment};
use crate::embed::EmbedData;

/// Why a component could not be rendered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("unknown component <{0}>")]
    UnknownComponent(String),

    #[error("<{component}> requires the {prop:?} prop")]
    MissingProp {
        component: &'static str,
        prop: &'static str,
    },

    #[error("<{component}> has an invalid {prop:?} value {value:?}")]
    InvalidProp {
        component: &'static str,
        prop: &'static str,
        value: String,
    },

    #[error("no embed fetched for id {0:?}")]
    MissingEmbed(String),
}

/// What components may read while rendering
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub config: &'a SiteConfig,
    pub embeds: &'a IndexMap<String, EmbedData>,
}

/// A renderer for one component name
pub trait Component: Send + Sync {
    fn render(&self, props: &Props, ctx: &RenderContext<'_>) -> Result<String, RenderError>;
}

/// Component names mapped to their renderers
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: BTreeMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Components available to the home document
    pub fn home() -> Self {
        Self::new()
            .with("Spacer", Spacer)
            .with("Image", Image)
            .with("MyPic", MyPic)
    }

    /// Components available to posts
    pub fn post() -> Self {
        Self::new()
            .with("Spacer", Spacer)
            .with("Image", Image)
            .with("StaticTweet", StaticTweet)
    }

    /// Register a component under `name`, replacing any previous one
    pub fn with(mut self, name: impl Into<String>, component: impl Component + 'static) -> Self {
        self.components.insert(name.into(), Arc::new(component));
        self
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        self.components.get(name).map(|c| c.as_ref())
    }

    /// Render compiled code to HTML
    pub fn render(&self, code: &CompiledCode, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let mut html = String::new();
        for segment in &code.segments {
            match segment {
                Segment::Html { html: chunk } => html.push_str(chunk),
                Segment::Component { name, props } => {
                    let component = self
                        .get(name)
                        .ok_or_else(|| RenderError::UnknownComponent(name.clone()))?;
                    html.push_str(&component.render(props, ctx)?);
                }
            }
        }
        Ok(html)
    }
}
