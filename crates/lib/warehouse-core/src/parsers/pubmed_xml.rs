use std::{error::Error, fmt};

use roxmltree::Node;
use warehouse_store::literature::{Author, FullTextLink, JournalInfo, PaperSummary};

use super::{node_text, parse_document};

/// Error type for `EFetch` XML parse failures.
#[derive(Debug)]
pub struct PubmedParseError {
    message: String,
}

impl fmt::Display for PubmedParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubMed XML parse error: {}", self.message)
    }
}

impl Error for PubmedParseError {}

impl From<roxmltree::Error> for PubmedParseError {
    fn from(err: roxmltree::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// Full-text pointers found in an `EFetch` record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleLinks {
    pub links: Vec<FullTextLink>,
    /// Publisher links that may serve a PDF, in record order.
    pub pdf_candidates: Vec<String>,
}

/// Parses every `PubmedArticle` of an `EFetch` response.
///
/// # Errors
/// Returns `PubmedParseError` if the payload is not well-formed XML.
pub fn parse_articles(xml: &str) -> Result<Vec<PaperSummary>, PubmedParseError> {
    let doc = parse_document(xml)?;
    Ok(doc
        .descendants()
        .filter(|node| node.has_tag_name("PubmedArticle"))
        .map(parse_article)
        .collect())
}

/// Collects PMC and DOI links from an `EFetch` response.
///
/// # Errors
/// Returns `PubmedParseError` if the payload is not well-formed XML.
pub fn extract_links(xml: &str) -> Result<ArticleLinks, PubmedParseError> {
    let doc = parse_document(xml)?;
    let mut links = ArticleLinks::default();

    for article_id in doc.descendants().filter(|node| {
        node.has_tag_name("ArticleId") && node.attribute("IdType") == Some("pmc")
    }) {
        let pmc_id = node_text(article_id);
        if pmc_id.is_empty() {
            continue;
        }
        links.links.push(FullTextLink {
            kind: "PMC".to_string(),
            url: pmc_article_url(&pmc_id),
        });
    }

    for link in doc.descendants().filter(|node| node.has_tag_name("Link")) {
        let Some(url) = link.attribute("URL").filter(|url| !url.is_empty()) else {
            continue;
        };
        if link.attribute("Provider") != Some("DOI") {
            continue;
        }
        links.links.push(FullTextLink {
            kind: "DOI".to_string(),
            url: url.to_string(),
        });
        links.pdf_candidates.push(url.to_string());
    }

    Ok(links)
}

/// Article page for a PMC id given with or without its `PMC` prefix.
#[must_use]
pub fn pmc_article_url(pmc_id: &str) -> String {
    let digits = pmc_id.trim().trim_start_matches("PMC");
    format!("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC{digits}/")
}

fn parse_article(article: Node<'_, '_>) -> PaperSummary {
    let journal = descendant(article, "Journal");
    PaperSummary {
        pubmed_id: descendant_text(article, "PMID"),
        title: descendant_text(article, "ArticleTitle"),
        abstract_text: abstract_text(article),
        authors: article
            .descendants()
            .filter(|node| node.has_tag_name("Author"))
            .map(|author| Author {
                last_name: descendant_text(author, "LastName"),
                first_name: descendant_text(author, "ForeName"),
            })
            .collect(),
        journal: JournalInfo {
            name: journal
                .and_then(|journal| child(journal, "Title"))
                .map(node_text)
                .unwrap_or_default(),
            volume: descendant_text(article, "Volume"),
            issue: descendant_text(article, "Issue"),
            pages: descendant_text(article, "MedlinePgn"),
        },
        publication_date: publication_date(article),
    }
}

/// Structured abstracts keep their section labels.
fn abstract_text(article: Node<'_, '_>) -> String {
    let sections: Vec<String> = article
        .descendants()
        .filter(|node| node.has_tag_name("AbstractText"))
        .filter_map(|section| {
            let text = node_text(section);
            if text.is_empty() {
                return None;
            }
            Some(match section.attribute("Label") {
                Some(label) if !label.is_empty() => format!("{label}: {text}"),
                _ => text,
            })
        })
        .collect();
    sections.join("\n\n")
}

fn publication_date(article: Node<'_, '_>) -> String {
    let Some(pub_date) = descendant(article, "PubDate") else {
        return String::new();
    };
    let parts: Vec<String> = ["Year", "Month", "Day"]
        .into_iter()
        .filter_map(|part| child(pub_date, part))
        .map(node_text)
        .filter(|text| !text.is_empty())
        .collect();
    if parts.is_empty() {
        // free-form dates such as "2019 Nov-Dec"
        return child(pub_date, "MedlineDate").map(node_text).unwrap_or_default();
    }
    parts.join("-")
}

fn descendant<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.descendants().find(|child| child.has_tag_name(tag))
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn descendant_text(node: Node<'_, '_>, tag: &str) -> String {
    descendant(node, tag).map(node_text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">31452104</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <Volume>12</Volume>
            <Issue>3</Issue>
            <PubDate><Year>2019</Year><Month>Nov</Month></PubDate>
          </JournalIssue>
          <Title>Nature communications</Title>
        </Journal>
        <ArticleTitle>CRISPR screens in <i>human</i> cells.</ArticleTitle>
        <Pagination><MedlinePgn>101-110</MedlinePgn></Pagination>
        <Abstract>
          <AbstractText Label="BACKGROUND">Screens are useful.</AbstractText>
          <AbstractText Label="RESULTS">They found genes.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author><LastName>Doudna</LastName><ForeName>Jennifer A</ForeName></Author>
          <Author><CollectiveName>Screen Consortium</CollectiveName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">31452104</ArticleId>
        <ArticleId IdType="pmc">PMC6710325</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn parses_summary_fields() {
        let papers = parse_articles(ARTICLE).expect("parse");
        assert_eq!(papers.len(), 1);
        let paper = &papers[0];
        assert_eq!(paper.pubmed_id, "31452104");
        assert_eq!(paper.title, "CRISPR screens in human cells.");
        assert_eq!(
            paper.abstract_text,
            "BACKGROUND: Screens are useful.\n\nRESULTS: They found genes."
        );
        assert_eq!(paper.journal.name, "Nature communications");
        assert_eq!(paper.journal.volume, "12");
        assert_eq!(paper.journal.issue, "3");
        assert_eq!(paper.journal.pages, "101-110");
        assert_eq!(paper.publication_date, "2019-Nov");
    }

    #[test]
    fn authors_without_names_are_kept_blank() {
        let papers = parse_articles(ARTICLE).expect("parse");
        let authors = &papers[0].authors;
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].last_name, "Doudna");
        assert_eq!(authors[0].first_name, "Jennifer A");
        assert_eq!(authors[1], Author::default());
    }

    #[test]
    fn medline_date_is_used_when_parts_are_missing() {
        let xml = "<PubmedArticleSet><PubmedArticle><PMID>1</PMID>\
                   <PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate>\
                   </PubmedArticle></PubmedArticleSet>";
        let papers = parse_articles(xml).expect("parse");
        assert_eq!(papers[0].publication_date, "1998 Dec-1999 Jan");
        assert_eq!(papers[0].abstract_text, "");
    }

    #[test]
    fn pmc_ids_link_to_article_pages() {
        let links = extract_links(ARTICLE).expect("links");
        assert_eq!(
            links.links,
            vec![FullTextLink {
                kind: "PMC".to_string(),
                url: "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC6710325/".to_string(),
            }]
        );
        assert!(links.pdf_candidates.is_empty());
    }

    #[test]
    fn doi_links_become_pdf_candidates() {
        let xml = r#"<PubmedArticleSet><PubmedArticle>
            <Link Provider="DOI" URL="https://publisher.example/paper.pdf"/>
            <Link Provider="Other" URL="https://other.example/x"/>
            <Link Provider="DOI"/>
        </PubmedArticle></PubmedArticleSet>"#;
        let links = extract_links(xml).expect("links");
        assert_eq!(links.pdf_candidates, vec!["https://publisher.example/paper.pdf"]);
        assert_eq!(links.links.len(), 1);
        assert_eq!(links.links[0].kind, "DOI");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_articles("<PubmedArticleSet>").is_err());
    }
}
