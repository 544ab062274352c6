//! Integration tests for doi-cite
//!
//! These tests drive the full pipeline (extraction, metadata, citations and
//! storage) against a local mock of the DOI services.

use doi_cite::config::{NetworkConfig, StorageConfig};
use doi_cite::convert::{ConversionWorker, FanOut};
use doi_cite::library::{ProjectManager, SearchEngine, SearchFilters, TagManager};
use doi_cite::sources::MetadataErrorKind;
use doi_cite::storage::{CollectionStore, JsonFileStore};
use doi_cite::utils::{clean_doi, extract_doi, is_valid_doi, HttpClient, DOI_PREFIXES};
use doi_cite::{CitationFormatter, CitationStyle, ConvertError, Converter};
use mockito::{Matcher, Mock, ServerGuard};
use std::sync::Arc;

const NATURE_DOI: &str = "10.1038/nature12373";
const SCIENCE_DOI: &str = "10.1126/science.1058040";

/// Text styles other than Vancouver
const TEXT_STYLES_EXCEPT_VANCOUVER: &str = "style=(apa|ieee|nature|science|cell|pnas|plos|\
modern-language-association|chicago-author-date|harvard-cite-them-right);";

fn network_config(server: &ServerGuard) -> NetworkConfig {
    NetworkConfig {
        doi_resolver_base: format!("{}/", server.url()),
        crossref_works_base: format!("{}/works/", server.url()),
        retry_attempts: 1,
        ..NetworkConfig::default()
    }
}

fn converter_for(server: &ServerGuard) -> Converter {
    Converter::new(HttpClient::new(&network_config(server)).unwrap())
}

fn crossref_body(doi: &str, title: &str) -> String {
    format!(
        r#"{{"status":"ok","message-type":"work","message":{{
            "DOI":"{doi}",
            "title":["{title}"],
            "author":[{{"given":"G.","family":"Kucsko"}},{{"name":"NV Consortium"}}],
            "container-title":["Nature"],
            "publisher":"Springer Science and Business Media LLC",
            "volume":"500","issue":"7460","page":"54-58",
            "type":"journal-article",
            "published-print":{{"date-parts":[[2013,8]]}},
            "abstract":"<jats:p>Foo &amp; Bar</jats:p>"
        }}}}"#
    )
}

/// Metadata plus every citation style for one DOI. When `vancouver_missing`
/// is set, only the Vancouver style answers 404.
async fn mock_paper(
    server: &mut ServerGuard,
    doi: &str,
    title: &str,
    vancouver_missing: bool,
) -> Vec<Mock> {
    let citation_path = format!("/{}", doi);
    let mut mocks = vec![
        server
            .mock("GET", format!("/works/{}", doi).as_str())
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(crossref_body(doi, title))
            .create_async()
            .await,
        server
            .mock("GET", citation_path.as_str())
            .match_header("accept", "application/x-bibtex")
            .with_status(200)
            .with_body(format!(" @article{{Kucsko_2013, title={{{}}}, doi={{{}}}}}", title, doi))
            .create_async()
            .await,
        server
            .mock("GET", citation_path.as_str())
            .match_header("accept", "application/x-research-info-systems")
            .with_status(200)
            .with_body(format!("TY  - JOUR\nTI  - {}\nDO  - {}\nER  - \n", title, doi))
            .create_async()
            .await,
        server
            .mock("GET", citation_path.as_str())
            .match_header("accept", "application/vnd.citationstyles.csl+json")
            .with_status(200)
            .with_header("content-type", "application/vnd.citationstyles.csl+json")
            .with_body(format!(r#"{{"DOI":"{}","title":"{}"}}"#, doi, title))
            .create_async()
            .await,
    ];

    let text_styles = if vancouver_missing {
        mocks.push(
            server
                .mock("GET", citation_path.as_str())
                .match_header("accept", Matcher::Regex("style=vancouver;".to_string()))
                .with_status(404)
                .create_async()
                .await,
        );
        TEXT_STYLES_EXCEPT_VANCOUVER.to_string()
    } else {
        "^text/x-bibliography".to_string()
    };
    mocks.push(
        server
            .mock("GET", citation_path.as_str())
            .match_header("accept", Matcher::Regex(text_styles))
            .with_status(200)
            .with_body(format!("Kucsko, G. (2013). {}. Nature, 500(7460), 54\u{2013}58.", title))
            .create_async()
            .await,
    );
    mocks
}

#[test]
fn test_every_known_prefix_extracts() {
    for doi in [NATURE_DOI, SCIENCE_DOI, "10.1371/journal.pone.0000217"] {
        for prefix in DOI_PREFIXES {
            let input = format!("{}{}", prefix, doi);
            assert_eq!(extract_doi(&input).as_deref(), Some(doi), "input {:?}", input);
        }
    }
}

#[test]
fn test_publisher_url_extracts() {
    assert_eq!(
        extract_doi("https://www.nature.com/articles/nature12373").as_deref(),
        Some(NATURE_DOI)
    );
}

#[test]
fn test_validity_and_clean_idempotence() {
    assert!(is_valid_doi(NATURE_DOI));
    assert!(!is_valid_doi("nature12373"));
    assert!(!is_valid_doi(""));

    for input in [
        "https://doi.org/10.1038/nature12373?utm=x#abs",
        "doi:10.1038/nature12373/",
        "  DOI: 10.1126/science.1058040 ",
        "doi.org/doi:10.1000/xyz",
        "not a doi",
        "",
    ] {
        let once = clean_doi(input);
        assert_eq!(clean_doi(&once), once, "input {:?}", input);
    }
}

#[tokio::test]
async fn test_format_always_returns_text() {
    // no mocks: every request gets mockito's default 501
    let server = mockito::Server::new_async().await;
    let formatter = CitationFormatter::new(HttpClient::new(&network_config(&server)).unwrap());

    for key in Converter::available_formats().into_iter().chain(["Turabian", ""]) {
        for doi in [NATURE_DOI, "not-a-doi", ""] {
            let text = formatter.format(doi, key).await;
            assert!(!text.is_empty(), "style {:?}, doi {:?}", key, doi);
        }
    }
}

#[tokio::test]
async fn test_convert_one_builds_complete_record() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_paper(&mut server, NATURE_DOI, "Nanometre-scale thermometry", false).await;

    let record = converter_for(&server)
        .convert_one("https://doi.org/10.1038/nature12373")
        .await
        .unwrap();

    assert_eq!(record.id, NATURE_DOI);
    assert_eq!(record.doi, NATURE_DOI);
    assert_eq!(record.year(), Some(2013));
    assert_eq!(record.journal(), Some("Nature"));
    assert_eq!(record.author_names(), vec!["G. Kucsko", "NV Consortium"]);
    assert_eq!(record.r#abstract, "Foo & Bar");
    assert!(record.added_date.is_some());
    assert!(record.tags.is_empty());

    assert_eq!(record.citations.len(), 14);
    assert!(record.citation(CitationStyle::Bibtex).unwrap().starts_with("@article"));
    assert!(record.citation(CitationStyle::Ris).unwrap().starts_with("TY"));
    assert!(record
        .citation(CitationStyle::Apa)
        .unwrap()
        .contains("Nanometre-scale thermometry"));
}

#[tokio::test]
async fn test_single_style_failure_is_isolated() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_paper(&mut server, NATURE_DOI, "Nanometre-scale thermometry", true).await;

    let converter = converter_for(&server).with_fan_out(FanOut::Parallel { max_concurrency: 4 });
    let record = converter.convert_one(NATURE_DOI).await.unwrap();

    assert_eq!(record.citations.len(), 14);
    assert_eq!(record.citation(CitationStyle::Vancouver), Some("DOI not found"));
    for (style, text) in &record.citations {
        if *style != CitationStyle::Vancouver {
            assert_ne!(text, "DOI not found", "style {}", style.key());
            assert!(!text.starts_with("Service error"), "style {}", style.key());
        }
    }
}

#[tokio::test]
async fn test_metadata_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _crossref = server
        .mock("GET", "/works/10.1000/missing")
        .with_status(404)
        .create_async()
        .await;
    let _resolver = server
        .mock("GET", "/10.1000/missing")
        .with_status(404)
        .create_async()
        .await;

    let err = converter_for(&server)
        .convert_one("10.1000/missing")
        .await
        .unwrap_err();

    match &err {
        ConvertError::Metadata(e) => assert_eq!(e.kind, MetadataErrorKind::NotFound),
        other => panic!("expected metadata error, got {:?}", other),
    }
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_csl_fallback_when_crossref_fails() {
    let mut server = mockito::Server::new_async().await;
    let _crossref = server
        .mock("GET", "/works/10.1000/fallback")
        .with_status(503)
        .create_async()
        .await;
    let _csl = server
        .mock("GET", "/10.1000/fallback")
        .match_header("accept", "application/vnd.citationstyles.csl+json")
        .with_status(200)
        .with_header("content-type", "application/vnd.citationstyles.csl+json")
        .with_body(r#"{"DOI":"10.1000/fallback","title":"Recovered from CSL","type":"book"}"#)
        .create_async()
        .await;

    let record = converter_for(&server)
        .convert_one("doi:10.1000/fallback")
        .await
        .unwrap();

    assert_eq!(record.title, "Recovered from CSL");
    assert_eq!(record.work_type, "book");
    assert_eq!(record.citations.len(), 14);
}

#[tokio::test]
async fn test_convert_many_keeps_order() {
    let mut server = mockito::Server::new_async().await;
    let _nature = mock_paper(&mut server, NATURE_DOI, "Thermometry", false).await;
    let _science = mock_paper(&mut server, SCIENCE_DOI, "Thermal conductance", false).await;

    let records = converter_for(&server)
        .convert_many(&[NATURE_DOI, "garbage", SCIENCE_DOI])
        .await;

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].id, NATURE_DOI);
    assert!(!records[0].is_error());
    assert_eq!(records[0].citations.len(), 14);

    assert!(records[1].is_error());
    assert_eq!(records[1].error_type.as_deref(), Some("InputError"));
    assert!(records[1].citations.is_empty());

    assert_eq!(records[2].id, SCIENCE_DOI);
    assert_eq!(records[2].title, "Thermal conductance");
}

#[tokio::test]
async fn test_worker_with_progress() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_paper(&mut server, NATURE_DOI, "Thermometry", false).await;

    let converter = Arc::new(converter_for(&server));
    let mut worker = ConversionWorker::spawn(
        converter,
        vec![NATURE_DOI.to_string(), "10.1038.nature".to_string()],
    );
    let mut progress = worker.take_progress().unwrap();

    let report = worker.join().await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.records[1].error_type.as_deref(), Some("FormatError"));

    let mut events = 0;
    while progress.recv().await.is_some() {
        events += 1;
    }
    // started, two per-input events, finished
    assert_eq!(events, 4);
}

#[tokio::test]
async fn test_store_round_trip_and_library() {
    let mut server = mockito::Server::new_async().await;
    let _nature = mock_paper(&mut server, NATURE_DOI, "Nanometre-scale thermometry", false).await;
    let _science = mock_paper(&mut server, SCIENCE_DOI, "Thermal conductance", false).await;

    let records = converter_for(&server)
        .convert_many(&[NATURE_DOI, SCIENCE_DOI])
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig {
        data_dir: dir.path().to_path_buf(),
        ..StorageConfig::default()
    };

    {
        let mut store = JsonFileStore::open(&storage).unwrap();
        let project = ProjectManager::new(&mut store)
            .create_project("Thermal transport")
            .unwrap();
        for record in &records {
            store.add_paper_to_project(&project.id, record.clone()).unwrap();
        }
        TagManager::new(&mut store)
            .add_tag_to_paper(NATURE_DOI, "Quantum Sensing")
            .unwrap();
    }

    let store = JsonFileStore::open(&storage).unwrap();
    let science = store.get_paper(SCIENCE_DOI).unwrap();
    assert_eq!(science, &records[1]);

    let nature = store.get_paper(NATURE_DOI).unwrap();
    assert_eq!(nature.tags, vec!["quantum sensing"]);
    assert_eq!(nature.citations, records[0].citations);
    assert!(nature.modified.is_some());

    let hits = SearchEngine::new(&store).search("thermo", &SearchFilters::default());
    assert_eq!(hits[0].paper.id, NATURE_DOI);
}
