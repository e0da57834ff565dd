//! Thin selector helpers over `scraper` nodes, so extractor logic deals in
//! configured selector strings and plain text instead of parser internals.

use log::debug;
use scraper::{ElementRef, Selector};

/// Whitespace-collapsed visible text of a node.
pub fn element_text(node: ElementRef) -> String {
    node.text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first descendant matching `selector`, if any.
pub fn select_first_text(node: ElementRef, selector: &str) -> Option<String> {
    let target = select_first(node, selector)?;
    let text = element_text(target);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Attribute of the first descendant matching `selector`, if present and non-empty.
pub fn select_first_attr(node: ElementRef, selector: &str, attr: &str) -> Option<String> {
    let target = select_first(node, selector)?;
    target
        .value()
        .attr(attr)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

fn select_first<'a>(node: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    if selector.is_empty() {
        return None;
    }
    let compiled = match Selector::parse(selector) {
        Ok(compiled) => compiled,
        Err(err) => {
            debug!("invalid selector `{selector}`: {err}");
            return None;
        }
    };
    node.select(&compiled).next()
}
