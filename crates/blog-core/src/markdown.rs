//! Markdown to display-safe HTML.
//!
//! Post bodies are Markdown. Raw HTML blocks and inline tags in the source
//! are emitted as escaped text, and script-capable link targets are
//! replaced, so the output can be embedded in a page as-is.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

const UNSAFE_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Words kept in list-page excerpts.
pub const EXCERPT_WORDS: usize = 30;

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES
}

fn neutralise(url: CowStr<'_>) -> CowStr<'_> {
    let lowered = url.trim_start().to_ascii_lowercase();
    if UNSAFE_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

/// Render Markdown `text` to HTML.
pub fn render(text: &str) -> String {
    let parser = Parser::new_ext(text, options()).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: neutralise(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: neutralise(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// First `words` words of `text`, with an ellipsis when something was cut.
pub fn truncate_words(text: &str, words: usize) -> String {
    let mut iter = text.split_whitespace();
    let kept: Vec<&str> = iter.by_ref().take(words).collect();
    let mut out = kept.join(" ");
    if iter.next().is_some() {
        out.push_str(" …");
    }
    out
}

/// Rendered excerpt for list pages.
pub fn excerpt(text: &str) -> String {
    render(&truncate_words(text, EXCERPT_WORDS))
}
