//! Markdown rendering for user-authored content.
//!
//! Post bodies, comments, and clarifications are stored as markdown.
//! comrak renders with raw HTML escaped, and ammonia sanitizes the result
//! before it is embedded unescaped in a template.

use comrak::{Options, markdown_to_html};

fn options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.superscript = true;
    options
}

pub fn render_markdown(source: &str) -> String {
    let html = markdown_to_html(source, &options());
    ammonia::clean(&html)
}
