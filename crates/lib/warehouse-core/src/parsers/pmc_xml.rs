use std::{error::Error, fmt};

use super::{node_text, parse_document};

/// Error type for PMC OAI record parse failures.
#[derive(Debug)]
pub struct PmcParseError {
    message: String,
}

impl fmt::Display for PmcParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PMC XML parse error: {}", self.message)
    }
}

impl Error for PmcParseError {}

impl From<roxmltree::Error> for PmcParseError {
    fn from(err: roxmltree::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// Extracts the abstract and body text of a JATS article from an OAI-PMH
/// `GetRecord` response.
///
/// Section titles and paragraphs are emitted in document order, separated by
/// blank lines. Elements are matched by local name so the JATS namespace
/// version does not matter. Returns `None` when the record has no abstract or
/// body text, which is also what OAI error responses look like.
///
/// # Errors
/// Returns `PmcParseError` if the payload is not well-formed XML.
pub fn extract_plaintext(xml: &str) -> Result<Option<String>, PmcParseError> {
    let doc = parse_document(xml)?;
    let mut blocks = Vec::new();

    if let Some(abstract_node) = doc.descendants().find(|node| is_element(*node, "abstract")) {
        blocks.extend(
            abstract_node
                .descendants()
                .filter(|node| is_element(*node, "p"))
                .map(node_text),
        );
    }

    if let Some(body) = doc.descendants().find(|node| is_element(*node, "body")) {
        for node in body.descendants() {
            if is_element(node, "sec") {
                if let Some(title) = node.children().find(|child| is_element(*child, "title")) {
                    blocks.push(node_text(title));
                }
            } else if is_element(node, "p") {
                blocks.push(node_text(node));
            }
        }
    }

    blocks.retain(|block| !block.is_empty());
    if blocks.is_empty() {
        Ok(None)
    } else {
        Ok(Some(blocks.join("\n\n")))
    }
}

fn is_element(node: roxmltree::Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}
