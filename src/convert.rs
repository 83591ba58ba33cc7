//! Post body conversion from HTML to Markdown.
//!
//! Conversion is optional and sits behind [`MarkupConverter`] so the import
//! stage does not care how it is done. [`MarkdownConverter`] walks the parsed
//! HTML fragment and emits CommonMark for the elements blog posts actually
//! use; unknown elements contribute their text.
//!
//! | HTML | Markdown |
//! |------|----------|
//! | `<p>`, `<div>` | paragraph |
//! | `<br>` | hard line break |
//! | `<h1>`–`<h6>` | `#` headings |
//! | `<b>`, `<strong>` / `<i>`, `<em>` | `**bold**` / `*italic*` |
//! | `<a href>` | `[text](href)` |
//! | `<img src alt>` | `![alt](src)` |
//! | `<ul>`, `<ol>`, `<li>` | `-` / `1.` items |
//! | `<blockquote>` | `> ` prefixed lines |
//! | `<pre>`, `<code>` | fenced block / inline code |
//! | `<hr>` | `---` |

use scraper::{ElementRef, Html, Node};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Conversion produced no output for non-empty content")]
    EmptyOutput,
}

/// Converts a post body from one markup to another.
pub trait MarkupConverter {
    fn convert(&self, content: &str) -> Result<String, ConvertError>;
}

/// HTML → Markdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownConverter;

impl MarkupConverter for MarkdownConverter {
    fn convert(&self, content: &str) -> Result<String, ConvertError> {
        let fragment = Html::parse_fragment(content);
        let mut out = Writer::default();
        out.children(fragment.root_element());
        let markdown = out.finish();
        if markdown.is_empty() && !content.trim().is_empty() && has_visible_content(&fragment) {
            return Err(ConvertError::EmptyOutput);
        }
        Ok(markdown)
    }
}

fn has_visible_content(fragment: &Html) -> bool {
    fragment
        .root_element()
        .text()
        .any(|t| !t.trim().is_empty())
}

#[derive(Default)]
struct Writer {
    out: String,
    /// Ordered-list counters, innermost last. `None` for bullet lists.
    lists: Vec<Option<usize>>,
    in_pre: bool,
}

impl Writer {
    fn children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.text(text),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.element(el);
                    }
                }
                _ => {}
            }
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_pre {
            self.out.push_str(text);
            return;
        }
        let mut last_space = self.out.is_empty() || self.out.ends_with([' ', '\n']);
        for c in text.chars() {
            if c.is_whitespace() {
                if !last_space {
                    self.out.push(' ');
                    last_space = true;
                }
            } else {
                self.out.push(c);
                last_space = false;
            }
        }
    }

    fn element(&mut self, el: ElementRef<'_>) {
        let name = el.value().name();
        match name {
            "p" | "div" | "section" | "article" => {
                self.block_break();
                self.children(el);
                self.block_break();
            }
            "br" => {
                self.trim_trailing_spaces();
                self.out.push_str("  \n");
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                self.block_break();
                self.out.push_str(&"#".repeat(level));
                self.out.push(' ');
                self.children(el);
                self.block_break();
            }
            "b" | "strong" => self.wrapped(el, "**"),
            "i" | "em" => self.wrapped(el, "*"),
            "a" => match el.value().attr("href") {
                Some(href) => {
                    self.out.push('[');
                    self.children(el);
                    self.out.push_str("](");
                    self.out.push_str(href);
                    self.out.push(')');
                }
                None => self.children(el),
            },
            "img" => {
                let src = el.value().attr("src").unwrap_or_default();
                let alt = el.value().attr("alt").unwrap_or_default();
                self.out.push_str(&format!("![{alt}]({src})"));
            }
            "ul" | "ol" => {
                self.block_break();
                self.lists.push((name == "ol").then_some(0));
                self.children(el);
                self.lists.pop();
                self.block_break();
            }
            "li" => self.list_item(el),
            "blockquote" => {
                let mut inner = Writer::default();
                inner.children(el);
                self.block_break();
                for line in inner.finish().lines() {
                    self.out.push('>');
                    if !line.is_empty() {
                        self.out.push(' ');
                        self.out.push_str(line);
                    }
                    self.out.push('\n');
                }
                self.block_break();
            }
            "pre" => {
                self.block_break();
                self.out.push_str("```\n");
                let was_pre = std::mem::replace(&mut self.in_pre, true);
                self.children(el);
                self.in_pre = was_pre;
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.out.push_str("```");
                self.block_break();
            }
            "code" if !self.in_pre => self.wrapped(el, "`"),
            "hr" => {
                self.block_break();
                self.out.push_str("---");
                self.block_break();
            }
            "script" | "style" => {}
            _ => self.children(el),
        }
    }

    fn wrapped(&mut self, el: ElementRef<'_>, marker: &str) {
        self.out.push_str(marker);
        self.children(el);
        self.out.push_str(marker);
    }

    fn list_item(&mut self, el: ElementRef<'_>) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        let depth = self.lists.len().saturating_sub(1);
        self.out.push_str(&"  ".repeat(depth));
        match self.lists.last_mut() {
            Some(Some(counter)) => {
                *counter += 1;
                self.out.push_str(&format!("{counter}. "));
            }
            _ => self.out.push_str("- "),
        }
        self.children(el);
        self.trim_trailing_spaces();
        self.out.push('\n');
    }

    /// End the current block with one blank line.
    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if self.out.is_empty() {
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn trim_trailing_spaces(&mut self) {
        while self.out.ends_with(' ') {
            self.out.pop();
        }
    }

    fn finish(self) -> String {
        let mut out = self.out.trim().to_string();
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}
