use std::path::PathBuf;

use mockito::{Matcher, Server, ServerGuard};
use warehouse_core::clients::{
    DateRange,
    LiteratureError,
    PaperSearch,
    PubMedClient,
    PubMedClientConfig,
};
use warehouse_store::literature::FullTextSource;

const PUBMED_ID: &str = "35000001";

fn load_fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|err| {
        let path_display = path.display();
        panic!("failed to read fixture at {path_display}: {err}")
    })
}

fn load_binary_fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|err| {
        let path_display = path.display();
        panic!("failed to read fixture at {path_display}: {err}")
    })
}

fn efetch_body(server: &ServerGuard) -> String {
    load_fixture("efetch_article.xml").replace("{PDF_URL}", &format!("{}/paper.pdf", server.url()))
}

fn client_for(server: &ServerGuard) -> PubMedClient {
    let config = PubMedClientConfig::default()
        .with_eutils_base_url(server.url())
        .with_pmc_oai_url(format!("{}/oai.cgi", server.url()));
    PubMedClient::with_config(config).expect("pubmed client")
}

async fn mock_efetch(server: &mut ServerGuard) -> mockito::Mock {
    let body = efetch_body(server);
    server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("db".into(), "pubmed".into()),
            Matcher::UrlEncoded("id".into(), PUBMED_ID.into()),
            Matcher::UrlEncoded("retmode".into(), "xml".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "text/xml")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn search_returns_parsed_summaries() {
    let mut server = Server::new_async().await;
    let esearch = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("term".into(), "base editing AND review[Publication Type]".into()),
            Matcher::UrlEncoded("retmax".into(), "5".into()),
            Matcher::UrlEncoded("sort".into(), "date".into()),
            Matcher::UrlEncoded("mindate".into(), "2021/01/01".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"header":{{"type":"esearch"}},"esearchresult":{{"count":"1","idlist":["{PUBMED_ID}"]}}}}"#
        ))
        .create_async()
        .await;
    let efetch = mock_efetch(&mut server).await;

    let range = DateRange::parse(Some("2021-01-01"), None).expect("date range");
    let search = PaperSearch::new("base editing")
        .with_max_results(5)
        .with_sort_by("date")
        .with_article_type("review")
        .with_date_range(range);
    let papers = client_for(&server)
        .search_papers(&search)
        .await
        .expect("search succeeds");

    esearch.assert_async().await;
    efetch.assert_async().await;
    assert_eq!(papers.len(), 1);
    let paper = &papers[0];
    assert_eq!(paper.pubmed_id, PUBMED_ID);
    assert_eq!(paper.title, "Base editing of hematopoietic stem cells.");
    assert_eq!(paper.journal.name, "Nature communications");
    assert_eq!(paper.publication_date, "2022-Jan-14");
    assert_eq!(paper.authors.len(), 2);
    assert_eq!(paper.authors[0].last_name, "Liu");
}

#[tokio::test]
async fn empty_search_skips_fetch() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"esearchresult":{"count":"0","idlist":[]}}"#)
        .create_async()
        .await;
    let efetch = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let papers = client_for(&server)
        .search_papers(&PaperSearch::new("nothing matches this"))
        .await
        .expect("search succeeds");

    assert!(papers.is_empty());
    efetch.assert_async().await;
}

#[tokio::test]
async fn invalid_search_never_reaches_the_network() {
    let mut server = Server::new_async().await;
    let esearch = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = client_for(&server)
        .search_papers(&PaperSearch::new("crispr").with_max_results(500))
        .await
        .expect_err("validation fails");

    assert!(matches!(err, LiteratureError::InvalidParameters(_)));
    assert_eq!(err.to_string(), "max_results cannot exceed 100");
    esearch.assert_async().await;
}

#[tokio::test]
async fn upstream_failure_is_reported() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let err = client_for(&server)
        .search_papers(&PaperSearch::new("crispr"))
        .await
        .expect_err("upstream error");

    assert!(matches!(err, LiteratureError::Http(_)));
}

#[tokio::test]
async fn full_text_prefers_pmc() {
    let mut server = Server::new_async().await;
    mock_efetch(&mut server).await;
    server
        .mock("GET", "/elink.fcgi")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("dbfrom".into(), "pubmed".into()),
            Matcher::UrlEncoded("db".into(), "pmc".into()),
            Matcher::UrlEncoded("id".into(), PUBMED_ID.into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"linksets":[{"dbfrom":"pubmed","ids":["35000001"],"linksetdbs":[{"dbto":"pmc","linkname":"pubmed_pmc","links":["8750000"]}]}]}"#,
        )
        .create_async()
        .await;
    let oai = server
        .mock("GET", "/oai.cgi")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("verb".into(), "GetRecord".into()),
            Matcher::UrlEncoded("identifier".into(), "oai:pubmedcentral.nih.gov:8750000".into()),
            Matcher::UrlEncoded("metadataPrefix".into(), "pmc".into()),
        ]))
        .with_status(200)
        .with_body(load_fixture("pmc_record.xml"))
        .create_async()
        .await;
    let pdf = server.mock("GET", "/paper.pdf").expect(0).create_async().await;

    let paper = client_for(&server)
        .get_paper_fulltext(PUBMED_ID)
        .await
        .expect("full text");

    oai.assert_async().await;
    pdf.assert_async().await;
    assert_eq!(paper.full_text_source, FullTextSource::Pmc);
    assert_eq!(paper.available_content, "full_text");
    assert!(paper.full_text_links.is_none());
    assert!(paper.full_text.starts_with("Base editors install point mutations"));
    assert!(
        paper
            .full_text
            .contains("Introduction\n\nSickle cell disease is caused by a single HBB mutation.")
    );
    assert!(paper.full_text.ends_with("Engraftment\n\nEdited cells engrafted in mice."));
    assert_eq!(paper.full_text.matches("Edited cells engrafted").count(), 1);
}

#[tokio::test]
async fn full_text_uses_linked_pdf_without_pmc() {
    let mut server = Server::new_async().await;
    mock_efetch(&mut server).await;
    server
        .mock("GET", "/elink.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"linksets":[{"dbfrom":"pubmed","ids":["35000001"]}]}"#)
        .create_async()
        .await;
    let oai = server.mock("GET", "/oai.cgi").expect(0).create_async().await;
    let pdf = server
        .mock("GET", "/paper.pdf")
        .with_status(200)
        .with_header("content-type", "application/pdf")
        .with_body(load_binary_fixture("fulltext.pdf"))
        .create_async()
        .await;

    let paper = client_for(&server)
        .get_paper_fulltext(PUBMED_ID)
        .await
        .expect("pdf full text");

    oai.assert_async().await;
    pdf.assert_async().await;
    assert_eq!(paper.full_text_source, FullTextSource::Pdf);
    assert_eq!(paper.available_content, "full_text");
    assert!(
        paper.full_text.contains("hemoglobin expression"),
        "unexpected pdf text: {}",
        paper.full_text
    );
    let links = paper.full_text_links.expect("links listed");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].kind, "DOI");
    assert_eq!(links[0].url, format!("{}/paper.pdf", server.url()));
}

#[tokio::test]
async fn full_text_falls_back_to_abstract() {
    let mut server = Server::new_async().await;
    mock_efetch(&mut server).await;
    server
        .mock("GET", "/elink.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"linksets":[{"dbfrom":"pubmed","ids":["35000001"]}]}"#)
        .create_async()
        .await;
    let pdf = server
        .mock("GET", "/paper.pdf")
        .with_status(404)
        .create_async()
        .await;

    let paper = client_for(&server)
        .get_paper_fulltext(PUBMED_ID)
        .await
        .expect("abstract fallback");

    pdf.assert_async().await;
    assert_eq!(paper.full_text_source, FullTextSource::Abstract);
    assert_eq!(paper.available_content, "abstract");
    assert_eq!(
        paper.full_text,
        "Base editors install point mutations without double-strand breaks."
    );
    let links = paper.full_text_links.expect("links listed");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].kind, "DOI");
    assert_eq!(links[0].url, format!("{}/paper.pdf", server.url()));
}

#[tokio::test]
async fn link_lookup_failure_is_not_fatal() {
    let mut server = Server::new_async().await;
    mock_efetch(&mut server).await;
    server
        .mock("GET", "/elink.fcgi")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    server
        .mock("GET", "/paper.pdf")
        .with_status(200)
        .with_header("content-type", "application/pdf")
        .with_body("not really a pdf")
        .create_async()
        .await;

    let paper = client_for(&server)
        .get_paper_fulltext(PUBMED_ID)
        .await
        .expect("abstract fallback");

    assert_eq!(paper.full_text_source, FullTextSource::Abstract);
}

#[tokio::test]
async fn unknown_paper_is_not_found() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<?xml version=\"1.0\" ?>\n<PubmedArticleSet></PubmedArticleSet>")
        .create_async()
        .await;

    let err = client_for(&server)
        .get_paper_fulltext("1")
        .await
        .expect_err("missing paper");

    assert!(matches!(err, LiteratureError::NotFound(_)));
    assert_eq!(err.to_string(), "Paper not found");
}
