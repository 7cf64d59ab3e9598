//! Shortening of HTML content without leaving broken markup behind.

use scraper::{Html, Node};

/// Appended to the last piece of visible text after truncation.
pub const ELLIPSIS: &str = "...";

/// Cut `html` to at most `max_chars` characters.
///
/// Content that already fits comes back untouched. Anything longer is hard cut,
/// re-parsed as a fragment so unclosed tags get closed, marked with an ellipsis on
/// its last text node, and serialized again.
pub fn truncate_html(html: &str, max_chars: usize) -> String {
    match html.char_indices().nth(max_chars) {
        None => html.to_string(),
        Some((end, _)) => repair_fragment(&html[..end]),
    }
}

/// Parse a possibly broken fragment and serialize it back with an ellipsis marker.
pub fn repair_fragment(fragment: &str) -> String {
    let mut document = Html::parse_fragment(fragment);

    let last_text = document
        .tree
        .root()
        .descendants()
        .filter(|node| matches!(node.value(), Node::Text(text) if !text.trim().is_empty()))
        .map(|node| node.id())
        .last();

    match last_text.and_then(|id| document.tree.get_mut(id)) {
        Some(mut node) => {
            if let Node::Text(text) = node.value() {
                text.text.push_slice(ELLIPSIS);
            }
            document.root_element().inner_html()
        }
        None => format!("{}{}", document.root_element().inner_html(), ELLIPSIS),
    }
}
