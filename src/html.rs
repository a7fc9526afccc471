//! Plain-text and markup views over parsed pages.

use scraper::{ElementRef, Html, Node, Selector};

/// Text of every descendant text node, with `<br>` rendered as a newline.
pub fn flatten_text(el: ElementRef) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// Flattened, trimmed text of the first element matching `selector`.
pub fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .map(|el| flatten_text(el).trim().to_string())
}

/// Flattened text of the whole fragment or document.
pub fn document_text(doc: &Html) -> String {
    flatten_text(doc.root_element())
}

/// Whether raw markup carries a `<strong>` or `<b>` run.
pub fn has_bold(markup: &str) -> bool {
    markup.contains("<strong>") || markup.contains("<b>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;
    use pretty_assertions::assert_eq;

    lazy_static! {
        static ref STRONG: Selector = Selector::parse("strong").expect("Invalid selector");
    }

    #[test]
    fn test_flatten_text_renders_line_breaks() {
        let doc = Html::parse_fragment(
            "<strong>Les Groos</strong> – Animation<br>Talent&nbsp;: <strong>David</strong>",
        );
        assert_eq!(
            document_text(&doc),
            "Les Groos – Animation\nTalent\u{a0}: David"
        );
    }

    #[test]
    fn test_first_text() {
        let doc = Html::parse_fragment("<p><strong>  A MUSEE VOUS </strong></p><strong>B</strong>");
        assert_eq!(first_text(&doc, &STRONG).as_deref(), Some("A MUSEE VOUS"));
    }

    #[test]
    fn test_has_bold() {
        assert!(has_bold("<strong>x</strong>"));
        assert!(has_bold("<b>x</b>"));
        assert!(!has_bold("<em>x</em>"));
    }
}
