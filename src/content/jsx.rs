//! Scanner for JSX component tags embedded in MDX bodies
//!
//! Only self-closing components are recognised: `<Name prop="v" />`. Tags
//! inside code (as pulldown-cmark parses it) and HTML comments are left
//! alone. Lower-case tags are plain HTML and are not touched.

use indexmap::IndexMap;
use pulldown_cmark::{Event, Parser, Tag};
use std::ops::Range;
use thiserror::Error;

use super::mdx::markdown_options;

/// Props of a component invocation, in source order
pub type Props = IndexMap<String, String>;

/// A component tag found in an MDX body
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentTag {
    pub name: String,
    pub props: Props,
    /// Byte range of the whole tag in the scanned source
    pub range: Range<usize>,
    /// 1-based line the tag starts on
    pub line: usize,
}

/// Syntax error in a component tag
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JsxError {
    #[error("line {line}: component <{name}> must be self-closing (`/>`)")]
    Unclosed { name: String, line: usize },

    #[error("line {line}: malformed props on <{name}>: {detail}")]
    MalformedProps {
        name: String,
        line: usize,
        detail: String,
    },
}

/// Byte ranges of inline code spans and code blocks, as the Markdown
/// renderer sees them
pub(crate) fn code_ranges(source: &str) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    for (event, range) in Parser::new_ext(source, markdown_options()).into_offset_iter() {
        if let Event::Code(_) | Event::Start(Tag::CodeBlock(_)) = event {
            if ranges.last().is_some_and(|last| range.start < last.end) {
                continue;
            }
            ranges.push(range);
        }
    }
    ranges
}

/// Find every component tag in `source`
pub fn scan(source: &str) -> Result<Vec<ComponentTag>, JsxError> {
    scan_outside(source, &code_ranges(source))
}

/// Find every component tag in `source` that does not start inside one of
/// the sorted `code` ranges
pub(crate) fn scan_outside(
    source: &str,
    code: &[Range<usize>],
) -> Result<Vec<ComponentTag>, JsxError> {
    let bytes = source.as_bytes();
    let mut tags = Vec::new();
    let mut code = code.iter().peekable();
    let mut line = 1;
    let mut i = 0;

    while i < bytes.len() {
        while code.next_if(|range| range.end <= i).is_some() {}
        if let Some(range) = code.peek().filter(|range| range.start <= i) {
            let end = range.end.min(bytes.len());
            line += newlines(&bytes[i..end]);
            i = end;
            continue;
        }

        match bytes[i] {
            b'\n' => {
                line += 1;
                i += 1;
            }
            b'<' if source[i..].starts_with("<!--") => {
                let end = source[i..].find("-->").map_or(bytes.len(), |p| i + p + 3);
                line += newlines(&bytes[i..end]);
                i = end;
            }
            b'<' if bytes.get(i + 1).is_some_and(u8::is_ascii_uppercase) => {
                let tag = parse_tag(source, i, line)?;
                line += newlines(&bytes[tag.range.clone()]);
                i = tag.range.end;
                tags.push(tag);
            }
            _ => i += 1,
        }
    }

    Ok(tags)
}

fn newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

fn parse_tag(source: &str, start: usize, line: usize) -> Result<ComponentTag, JsxError> {
    let bytes = source.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.') {
        i += 1;
    }
    let name = source[start + 1..i].to_string();

    let malformed = |detail: String| JsxError::MalformedProps {
        name: name.clone(),
        line,
        detail,
    };
    let unclosed = || JsxError::Unclosed {
        name: name.clone(),
        line,
    };

    let mut props = Props::new();
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let Some(&b) = bytes.get(i) else {
            return Err(unclosed());
        };
        match b {
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Ok(ComponentTag {
                    name: name.clone(),
                    props,
                    range: start..i + 2,
                    line,
                });
            }
            b'>' => return Err(unclosed()),
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let key_start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'-' | b':'))
                {
                    i += 1;
                }
                let key = source[key_start..i].to_string();

                let mut j = i;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if bytes.get(j) != Some(&b'=') {
                    props.insert(key, "true".to_string());
                    continue;
                }
                j += 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                let (value, end) = parse_value(source, j)
                    .ok_or_else(|| malformed(format!("unterminated value for `{key}`")))?;
                props.insert(key, value);
                i = end;
            }
            other => {
                return Err(malformed(format!(
                    "unexpected character {:?}",
                    char::from(other)
                )))
            }
        }
    }
}

/// Parse a prop value starting at `i`; returns the value and the offset
/// just past it
fn parse_value(source: &str, i: usize) -> Option<(String, usize)> {
    let bytes = source.as_bytes();
    match *bytes.get(i)? {
        quote @ (b'"' | b'\'') => {
            let end = source[i + 1..].find(char::from(quote))? + i + 1;
            Some((source[i + 1..end].to_string(), end + 1))
        }
        b'{' => {
            let mut depth = 0usize;
            let mut quote: Option<u8> = None;
            for (offset, &b) in bytes[i..].iter().enumerate() {
                match (quote, b) {
                    (Some(q), b) if b == q => quote = None,
                    (Some(_), _) => {}
                    (None, b'"' | b'\'' | b'`') => quote = Some(b),
                    (None, b'{') => depth += 1,
                    (None, b'}') => {
                        depth -= 1;
                        if depth == 0 {
                            let end = i + offset;
                            let inner = source[i + 1..end].trim();
                            return Some((unquote(inner).to_string(), end + 1));
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        _ => None,
    }
}

/// `{"text"}` and `{123}` both become plain strings
fn unquote(expr: &str) -> &str {
    for q in ['"', '\'', '`'] {
        if expr.len() >= 2 && expr.starts_with(q) && expr.ends_with(q) {
            return &expr[1..expr.len() - 1];
        }
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_self_closing_tags() {
        let source = "Intro\n\n<StaticTweet id=\"123\" />\n\nMore <Spacer size={32} /> text";
        let tags = scan(source).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "StaticTweet");
        assert_eq!(tags[0].props["id"], "123");
        assert_eq!(tags[0].line, 3);
        assert_eq!(&source[tags[0].range.clone()], "<StaticTweet id=\"123\" />");
        assert_eq!(tags[1].name, "Spacer");
        assert_eq!(tags[1].props["size"], "32");
        assert_eq!(tags[1].line, 5);
    }

    #[test]
    fn test_prop_forms() {
        let source = r#"<Image src='/a.png' alt={"A picture"} priority width={640} />"#;
        let tags = scan(source).unwrap();
        let props = &tags[0].props;
        assert_eq!(props["src"], "/a.png");
        assert_eq!(props["alt"], "A picture");
        assert_eq!(props["priority"], "true");
        assert_eq!(props["width"], "640");
        let keys: Vec<_> = props.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["src", "alt", "priority", "width"]);
    }

    #[test]
    fn test_multiline_tag() {
        let source = "<Image\n  src=\"/a.png\"\n  alt=\"x\"\n/>\n\n<Spacer />";
        let tags = scan(source).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].props["alt"], "x");
        assert_eq!(tags[1].line, 6);
    }

    #[test]
    fn test_code_is_skipped() {
        let source = "```jsx\n<StaticTweet id=\"1\" />\n```\n\nUse `<Spacer />` inline.\n\n<!-- <MyPic /> -->\n\n<Spacer />";
        let tags = scan(source).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Spacer");
        assert_eq!(tags[0].line, 9);
    }

    #[test]
    fn test_tilde_fence_needs_matching_close() {
        let source = "~~~~\n```\n<Spacer />\n~~~~\n<MyPic />";
        let tags = scan(source).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "MyPic");
    }

    #[test]
    fn test_lowercase_html_is_ignored() {
        let tags = scan("<div class=\"x\"><img src=\"a.png\"></div>").unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn test_unclosed_component() {
        let err = scan("text\n<Callout type=\"info\">hello</Callout>").unwrap_err();
        assert_eq!(
            err,
            JsxError::Unclosed {
                name: "Callout".to_string(),
                line: 2
            }
        );
    }

    #[test]
    fn test_malformed_props() {
        let err = scan("<Image src=\"/a.png />").unwrap_err();
        assert!(matches!(err, JsxError::MalformedProps { .. }));

        let err = scan("<Image src=/a.png />").unwrap_err();
        assert!(matches!(err, JsxError::MalformedProps { .. }));
    }

    #[test]
    fn test_stray_backticks_do_not_hide_components() {
        let source = "Press the ` key.\n\n<StaticTweet id=\"1\" />\n\nA lone ` again.";
        let tags = scan(source).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].props["id"], "1");
        assert_eq!(tags[0].line, 3);
    }

    #[test]
    fn test_indented_code_is_skipped() {
        let source = "Para\n\n    <Spacer />\n\n<MyPic />";
        let tags = scan(source).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "MyPic");
        assert_eq!(tags[0].line, 5);
    }

    #[test]
    fn test_code_ranges() {
        let source = "Use `<Spacer />` here.\n\n```\ncode\n```\n";
        let ranges = code_ranges(source);
        assert_eq!(ranges.len(), 2);
        assert_eq!(&source[ranges[0].clone()], "`<Spacer />`");
        assert!(source[ranges[1].clone()].starts_with("```\ncode"));
    }
}
