//! Markup cleanup for detail page bodies.
//!
//! The body container's children are re-serialized with comment nodes
//! dropped and the presentational `style`, `class` and `lang` attributes
//! removed from every element. Zero-width characters and BOMs are deleted and
//! non-breaking spaces become plain spaces.

use html_escape::{encode_double_quoted_attribute, encode_text};
use scraper::node::Node;
use scraper::ElementRef;

const STRIPPED_ATTRIBUTES: [&str; 3] = ["style", "class", "lang"];

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 6] = ["script", "style", "xmp", "iframe", "noembed", "noframes"];

/// Inner markup of `container`, cleaned and trimmed.
pub fn clean_inner_html(container: ElementRef<'_>) -> String {
    let mut out = String::new();
    write_children(container, &mut out);
    normalize_invisible(&out).trim().to_string()
}

/// Drop zero-width spaces and BOMs, turn non-breaking spaces into spaces.
pub fn normalize_invisible(text: &str) -> String {
    text.replace(['\u{FEFF}', '\u{200B}'], "")
        .replace('\u{00A0}', " ")
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    let raw_text = RAW_TEXT_ELEMENTS.contains(&element.value().name());
    for child in element.children() {
        match child.value() {
            Node::Text(text) if raw_text => out.push_str(&**text),
            Node::Text(text) => out.push_str(&encode_text(&**text)),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, out);
                }
            }
            // comments, doctypes and processing instructions are dropped
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        if STRIPPED_ATTRIBUTES.contains(&attr) {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    write_children(element, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}
