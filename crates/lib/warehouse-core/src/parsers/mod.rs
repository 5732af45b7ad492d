//! Parsers for literature records.
//!
//! Each parser turns one NCBI XML payload into the paper models shared with the
//! tool layer.

pub mod pmc_xml;
pub mod pubmed_xml;

pub use pmc_xml::{PmcParseError, extract_plaintext};
pub use pubmed_xml::{ArticleLinks, PubmedParseError, extract_links, parse_articles};

use roxmltree::{Document, Node, ParsingOptions};

/// NCBI payloads carry a DOCTYPE declaration, which roxmltree rejects unless
/// asked otherwise.
fn parse_document(xml: &str) -> Result<Document<'_>, roxmltree::Error> {
    Document::parse_with_options(
        xml,
        ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        },
    )
}

/// Concatenated text of a node and all of its descendants.
fn node_text(node: Node<'_, '_>) -> String {
    let text: String = node
        .descendants()
        .filter(Node::is_text)
        .filter_map(|child| child.text())
        .collect();
    collapse_whitespace(text.trim())
}

fn collapse_whitespace(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut last_was_space = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                output.push(' ');
                last_was_space = true;
            }
        } else {
            output.push(ch);
            last_was_space = false;
        }
    }
    output
}
