//! MDX compilation
//!
//! An MDX body is Markdown with self-closing JSX components mixed in. The
//! compiler renders the Markdown to HTML (with syntax-highlighted code
//! blocks) and lifts every component out into its own segment, so the
//! result is plain data that can be serialized and rendered later against a
//! component registry.

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use thiserror::Error;

use super::frontmatter::FrontMatter;
use super::jsx::{self, ComponentTag, JsxError, Props};
use crate::config::HighlightConfig;
use crate::helpers::escape_html;

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
    static ref PLACEHOLDER: Regex = Regex::new(r"<!--mdx:(\d+)-->").expect("valid regex");
    static ref ESM: Regex = Regex::new(
        r#"^(import\s+['"]|import\s+.+\s+from\s+['"]|export\s+(const|let|var|function|default|\{))"#
    )
    .expect("valid regex");
}

/// Why an MDX body could not be compiled
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] JsxError),

    #[error("line {line}: unknown component <{name}>")]
    UnknownComponent { name: String, line: usize },

    #[error("line {line}: import/export statements are not supported")]
    Esm { line: usize },

    #[error("line {line}: component <{name}> lands inside code or raw text")]
    Misplaced { name: String, line: usize },

    #[error("front matter cannot be serialized: {0}")]
    FrontMatter(#[from] serde_json::Error),
}

/// One piece of compiled output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Rendered Markdown, ready to emit as-is
    Html { html: String },
    /// A component invocation resolved by name at render time
    Component { name: String, props: Props },
}

/// Serializable render payload of one MDX document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledCode {
    pub frontmatter: serde_json::Value,
    pub segments: Vec<Segment>,
}

impl CompiledCode {
    /// Component invocations in document order
    pub fn components(&self) -> impl Iterator<Item = (&str, &Props)> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Component { name, props } => Some((name.as_str(), props)),
            Segment::Html { .. } => None,
        })
    }
}

/// Compiles MDX bodies against a fixed set of component names
pub struct MdxCompiler {
    components: BTreeSet<String>,
    theme_name: String,
    line_numbers: bool,
}

impl MdxCompiler {
    /// Create a compiler that accepts the given component names
    pub fn new<I, S>(components: I, highlight: &HighlightConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
            theme_name: highlight.theme.clone(),
            line_numbers: highlight.line_number,
        }
    }

    /// Whether `name` may be used as a component
    pub fn knows(&self, name: &str) -> bool {
        self.components.contains(name)
    }

    /// Compile an MDX body (front matter already removed)
    pub fn compile(
        &self,
        body: &str,
        front_matter: &FrontMatter,
    ) -> Result<CompiledCode, CompileError> {
        let code = jsx::code_ranges(body);
        reject_esm(body, &code)?;

        let tags = jsx::scan_outside(body, &code)?;
        if let Some(tag) = tags.iter().find(|tag| !self.knows(&tag.name)) {
            return Err(CompileError::UnknownComponent {
                name: tag.name.clone(),
                line: tag.line,
            });
        }

        let mut markdown = String::with_capacity(body.len());
        let mut last = 0;
        for (i, tag) in tags.iter().enumerate() {
            markdown.push_str(&body[last..tag.range.start]);
            markdown.push_str(&format!("<!--mdx:{i}-->"));
            last = tag.range.end;
        }
        markdown.push_str(&body[last..]);

        let html = self.render_markdown(&markdown);

        Ok(CompiledCode {
            frontmatter: serde_json::to_value(front_matter)?,
            segments: split_segments(&html, tags)?,
        })
    }

    /// Render markdown to HTML
    fn render_markdown(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, markdown_options());

        let mut events: Vec<Event> = Vec::new();
        let mut in_code = false;
        let mut code_lang: Option<String> = None;
        let mut code = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    code_lang = match kind {
                        CodeBlockKind::Fenced(info) => fence_language(&info),
                        CodeBlockKind::Indented => None,
                    };
                    code.clear();
                    in_code = true;
                }
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted = self.highlight_code(&code, code_lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                    in_code = false;
                    code_lang = None;
                }
                Event::Text(text) if in_code => code.push_str(&text),
                other => events.push(other),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        let syntax = SYNTAX_SET
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());

        let highlighted = THEME_SET
            .themes
            .get(&self.theme_name)
            .and_then(|theme| highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).ok());

        match highlighted {
            Some(html) if self.line_numbers => {
                let gutter = (1..=code.lines().count())
                    .map(|n| format!(r#"<span class="line-number">{n}</span>"#))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    r#"<figure class="highlight {lang}"><table><tr><td class="gutter"><pre>{gutter}</pre></td><td class="code">{html}</td></tr></table></figure>"#
                )
            }
            Some(html) => format!(r#"<figure class="highlight {lang}">{html}</figure>"#),
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                lang,
                escape_html(code)
            ),
        }
    }
}

/// Markdown extensions shared by rendering and component scanning
pub(crate) fn markdown_options() -> Options {
    // YAML metadata blocks stay off: front matter is handled by FrontMatter::parse()
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Language token of a fence info string such as `rust,ignore title="x"`
fn fence_language(info: &str) -> Option<String> {
    let token = info.split([' ', ',', '{']).next()?.trim();
    let token: String = token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#'))
        .collect();
    (!token.is_empty()).then_some(token)
}

fn reject_esm(body: &str, code: &[Range<usize>]) -> Result<(), CompileError> {
    let mut offset = 0;
    for (i, line) in body.split_inclusive('\n').enumerate() {
        let in_code = code.iter().any(|range| range.contains(&offset));
        if !in_code && ESM.is_match(line) {
            return Err(CompileError::Esm { line: i + 1 });
        }
        offset += line.len();
    }
    Ok(())
}

/// Cut rendered HTML at each placeholder, putting the component it stands
/// for in between. A placeholder-shaped comment the author wrote by hand
/// does not match any tag and stays in the HTML. A tag whose placeholder
/// did not survive rendering as raw HTML is an error.
fn split_segments(html: &str, tags: Vec<ComponentTag>) -> Result<Vec<Segment>, CompileError> {
    let mut tags: Vec<Option<ComponentTag>> = tags.into_iter().map(Some).collect();
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(tag) = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|index| tags.get_mut(index))
            .and_then(Option::take)
        else {
            continue;
        };

        push_html(&mut segments, &html[last..whole.start()]);
        segments.push(Segment::Component {
            name: tag.name,
            props: tag.props,
        });
        last = whole.end();
    }
    push_html(&mut segments, &html[last..]);

    if let Some(tag) = tags.into_iter().flatten().next() {
        return Err(CompileError::Misplaced {
            name: tag.name,
            line: tag.line,
        });
    }
    Ok(segments)
}

fn push_html(segments: &mut Vec<Segment>, chunk: &str) {
    if !chunk.is_empty() {
        segments.push(Segment::Html {
            html: chunk.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler() -> MdxCompiler {
        MdxCompiler::new(["Spacer", "StaticTweet"], &HighlightConfig::default())
    }

    fn html_of(code: &CompiledCode) -> String {
        code.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Html { html } => Some(html.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_compile_basic_markdown() {
        let code = compiler()
            .compile("# Hello World\n\nThis is a test.", &FrontMatter::default())
            .unwrap();
        let html = html_of(&code);
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
        assert_eq!(code.components().count(), 0);
    }

    #[test]
    fn test_components_become_segments() {
        let body = "Before\n\n<StaticTweet id=\"123\" />\n\nAfter <Spacer size={8} /> inline";
        let code = compiler().compile(body, &FrontMatter::default()).unwrap();

        let components: Vec<_> = code.components().collect();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].0, "StaticTweet");
        assert_eq!(components[0].1["id"], "123");
        assert_eq!(components[1].0, "Spacer");

        assert!(matches!(&code.segments[0], Segment::Html { html } if html.contains("Before")));
        assert!(!html_of(&code).contains("mdx:"));
    }

    #[test]
    fn test_unknown_component() {
        let err = compiler()
            .compile("ok\n\n<Chart data={x} />", &FrontMatter::default())
            .unwrap_err();
        match err {
            CompileError::UnknownComponent { name, line } => {
                assert_eq!(name, "Chart");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error() {
        let err = compiler()
            .compile("<Spacer size={8}>", &FrontMatter::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::Syntax(JsxError::Unclosed { .. })));
    }

    #[test]
    fn test_esm_is_rejected_outside_code() {
        let err = compiler()
            .compile("import Chart from './chart'\n\n# Hi", &FrontMatter::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::Esm { line: 1 }));

        let code = compiler()
            .compile(
                "```js\nimport x from 'y'\n```\n\nimport is a keyword.",
                &FrontMatter::default(),
            )
            .unwrap();
        assert!(html_of(&code).contains("import is a keyword."));
    }

    #[test]
    fn test_code_block_is_highlighted_and_components_inside_stay_text() {
        let body = "```jsx\n<StaticTweet id=\"1\" />\n```";
        let code = compiler().compile(body, &FrontMatter::default()).unwrap();
        assert_eq!(code.components().count(), 0);
        let html = html_of(&code);
        assert!(html.contains("highlight"));
        assert!(html.contains("StaticTweet"));
    }

    #[test]
    fn test_line_numbers() {
        let highlight = HighlightConfig {
            line_number: true,
            ..Default::default()
        };
        let compiler = MdxCompiler::new(Vec::<String>::new(), &highlight);
        let code = compiler
            .compile("```rust\nfn a() {}\nfn b() {}\n```", &FrontMatter::default())
            .unwrap();
        let html = html_of(&code);
        assert!(html.contains(r#"<span class="line-number">2</span>"#));
        assert!(!html.contains(r#"<span class="line-number">3</span>"#));
    }

    #[test]
    fn test_unknown_theme_falls_back_to_plain_code() {
        let highlight = HighlightConfig {
            theme: "no-such-theme".to_string(),
            ..Default::default()
        };
        let compiler = MdxCompiler::new(Vec::<String>::new(), &highlight);
        let code = compiler
            .compile("```html\n<b>&</b>\n```", &FrontMatter::default())
            .unwrap();
        let html = html_of(&code);
        assert!(html.contains(r#"<pre><code class="language-html">&lt;b&gt;&amp;&lt;/b&gt;"#));
    }

    #[test]
    fn test_compile_is_deterministic_and_serializable() {
        let (fm, body) = FrontMatter::parse(
            "---\ntitle: T\ntags: a, b\n---\n# T\n\n<Spacer />\n\n```rust\nfn main() {}\n```",
        )
        .unwrap();
        let first = compiler().compile(body, &fm).unwrap();
        let second = compiler().compile(body, &fm).unwrap();
        assert_eq!(first, second);

        assert_eq!(first.frontmatter["title"], "T");
        let json = serde_json::to_string(&first).unwrap();
        let back: CompiledCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, first);
    }

    #[test]
    fn test_hand_written_placeholder_survives() {
        let code = compiler()
            .compile("<!--mdx:7-->\n\ntext", &FrontMatter::default())
            .unwrap();
        assert!(html_of(&code).contains("<!--mdx:7-->"));
    }

    #[test]
    fn test_stray_backticks_keep_components() {
        let body = "Press the ` key.\n\n<StaticTweet id=\"1\" />\n\nA lone ` again.";
        let code = compiler().compile(body, &FrontMatter::default()).unwrap();
        let components: Vec<_> = code.components().collect();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].1["id"], "1");
        assert!(!html_of(&code).contains("StaticTweet"));

        let err = compiler()
            .compile("A ` here.\n\n<Chart />\n\nand ` there.", &FrontMatter::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownComponent { line: 3, .. }));
    }

    #[test]
    fn test_indented_code_keeps_component_text() {
        let code = compiler()
            .compile("Para\n\n    <Spacer />\n\nafter", &FrontMatter::default())
            .unwrap();
        assert_eq!(code.components().count(), 0);
        let html = html_of(&code);
        assert!(html.contains("highlight"));
        assert!(html.contains("Spacer"));
        assert!(!html.contains("mdx:"));
    }

    #[test]
    fn test_esm_in_indented_code_is_allowed() {
        let code = compiler()
            .compile("Example:\n\n    export const x = 1;\n", &FrontMatter::default())
            .unwrap();
        assert!(html_of(&code).contains("export"));
    }

    #[test]
    fn test_lost_placeholder_is_an_error() {
        let tags = jsx::scan("<Spacer />").unwrap();
        let err = split_segments("<pre>&lt;!--mdx:0--&gt;</pre>", tags).unwrap_err();
        match err {
            CompileError::Misplaced { name, line } => {
                assert_eq!(name, "Spacer");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fence_language() {
        assert_eq!(fence_language("rust,ignore"), Some("rust".to_string()));
        assert_eq!(fence_language("ts title=\"a\""), Some("ts".to_string()));
        assert_eq!(fence_language(""), None);
    }
}
