//! DOM helpers shared by the readiness poll and the directory parsers.
//!
//! The directory toggles visibility through inline `style` attributes, so most
//! signals come down to "does this element's style contain this declaration".

use crate::error::{BrowserError, Result};
use scraper::{ElementRef, Selector};

/// Parse a CSS selector, mapping failures into `BrowserError`.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| BrowserError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Text content of an element with whitespace runs collapsed.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize one style declaration: `Display:none ` becomes `display: none`.
fn normalize_declaration(declaration: &str) -> String {
    declaration
        .split(':')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(": ")
        .to_lowercase()
}

/// The element's inline style split on `;` into normalized declarations.
pub fn style_tokens(element: &ElementRef<'_>) -> Vec<String> {
    element
        .value()
        .attr("style")
        .map(|style| {
            style
                .split(';')
                .map(normalize_declaration)
                .filter(|token| !token.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Whether the inline style carries the given declaration (e.g. `display: block`).
pub fn has_style_token(element: &ElementRef<'_>, token: &str) -> bool {
    let wanted = normalize_declaration(token);
    style_tokens(element).iter().any(|t| *t == wanted)
}

/// Whether the element is hidden through an inline `display: none`.
pub fn is_hidden(element: &ElementRef<'_>) -> bool {
    has_style_token(element, "display: none")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first<'a>(doc: &'a Html, selector: &str) -> ElementRef<'a> {
        let selector = parse_selector(selector).expect("valid selector");
        doc.select(&selector).next().expect("element present")
    }

    #[test]
    fn test_style_tokens_are_normalized() {
        let doc = Html::parse_fragment(
            r#"<div id="r" style="Display:none ; color :  red;;">x</div>"#,
        );
        let el = first(&doc, "#r");
        assert_eq!(style_tokens(&el), vec!["display: none", "color: red"]);
        assert!(is_hidden(&el));
        assert!(has_style_token(&el, "color:red"));
    }

    #[test]
    fn test_missing_style() {
        let doc = Html::parse_fragment(r#"<div id="r">x</div>"#);
        let el = first(&doc, "#r");
        assert!(style_tokens(&el).is_empty());
        assert!(!is_hidden(&el));
    }

    #[test]
    fn test_element_text_collapses_whitespace() {
        let doc = Html::parse_fragment("<p id=\"t\">\n  Professor of\n   <b>History</b> </p>");
        assert_eq!(element_text(&first(&doc, "#t")), "Professor of History");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            parse_selector("div[").unwrap_err(),
            BrowserError::InvalidSelector { .. }
        ));
    }
}
