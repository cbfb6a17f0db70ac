//! Integration tests for the scans
//!
//! These tests use wiremock to serve a miniature copy of the catalogue and
//! run the pipelines end-to-end against the real HTTP fetcher and sinks.

use atc_harvester::config::Config;
use atc_harvester::crawler::{
    scan_atc_tree, scan_drugs, DocumentFetcher, HttpFetcher, Link, Pipeline, RunProgress,
};
use atc_harvester::extract::{DrugDetails, GoodsList, ALL_DOSAGES_LABEL};
use atc_harvester::sink::{CsvSink, JsonTreeSink, RecordSink, SqliteSink};
use atc_harvester::HarvestError;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.source.root_url = format!("{}/atc/", base_url);
    config.crawler.workers = 3;
    config.crawler.request_timeout_secs = 5;
    config
}

fn fetcher(config: &Config) -> Arc<dyn DocumentFetcher> {
    Arc::new(HttpFetcher::from_config(&config.crawler).expect("Failed to build client"))
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn serve_error(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

fn atc_page(children: &[(&str, &str)]) -> String {
    let items: String = children
        .iter()
        .map(|(href, title)| format!(r#"<li><a href="{}" title="{}">{}</a></li>"#, href, title, title))
        .collect();
    format!(
        r#"<html><body><div id="ctl00_MainContent_ATCPanel"><ul>{}</ul></div></body></html>"#,
        items
    )
}

fn goods_page(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| format!(r#"<div><a href="{}">item</a></div>"#, href))
        .collect();
    format!(
        r#"<html><body><div id="ctl00_MainContent_GoodsListPanel">{}</div></body></html>"#,
        items
    )
}

fn dosage_page(aggregate: &str, hrefs: &[&str]) -> String {
    let mut items = format!(r#"<li><a href="{}">{}</a></li>"#, aggregate, ALL_DOSAGES_LABEL);
    for href in hrefs {
        items.push_str(&format!(r#"<li><a href="{}">dose</a></li>"#, href));
    }
    format!(
        r#"<html><body><div class="search-control-panel"><div><div><ul>{}</ul></div></div></div></body></html>"#,
        items
    )
}

fn drug_page(name: &str, dosage: &str, atc: &str) -> String {
    format!(
        r#"<html><body>
        <div class="header-panel"><h1>{name}</h1></div>
        <div itemprop="description">Перевести на русский язык: Перевести Инструкция для {name}</div>
        <div id="ctl00_MainContent_InstructionPanel"><table><tbody>
          <tr><td>Дозировка</td><td>{dosage}</td></tr>
          <tr><td>Производитель</td><td>Дарница, Украина</td></tr>
          <tr><td>МНН</td><td>Paracetamol</td></tr>
          <tr><td>Фармакологическая группа</td><td>Анальгетики</td></tr>
          <tr><td>Регистрация</td><td>UA/0001/01/01</td></tr>
          <tr><td>Код АТХ</td><td><div><b>{atc}</b> <a href="/atc/{atc}/"><span>Парацетамол</span></a></div></td></tr>
        </tbody></table></div>
        </body></html>"#
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_category_with_one_failing_leaf_writes_two_rows() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/atc/N02BE01/",
        goods_page(&["/Paracetamol/200mg/", "/Paracetamol/500mg/", "/Paracetamol/broken/"]),
    )
    .await;
    serve(&server, "/Paracetamol/200mg/", drug_page("Парацетамол 200", "200 мг", "N02BE01")).await;
    serve(&server, "/Paracetamol/500mg/", drug_page("Парацетамол 500", "500 мг", "N02BE01")).await;
    serve_error(&server, "/Paracetamol/broken/").await;

    let config = test_config(&base);
    let pipeline = Pipeline::new(fetcher(&config), 1);
    let seed = pipeline.seed(vec![Link::parse(&format!("{}/atc/N02BE01/", base)).unwrap()]);
    let leaves = pipeline.stage(1, seed, GoodsList);
    let records = pipeline.stage(3, leaves, DrugDetails);

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("tabletki.csv");
    let mut sink = CsvSink::create(&csv_path).unwrap();
    let total = sink.accept(records).await.unwrap();
    drop(sink);

    assert_eq!(total, 2);

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["Name", "Link", "Dosage", "Manufacture", "INN", "PharmGroup", "Registration", "ATCCode"]
    );

    let mut rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    rows.sort_by(|a, b| a[0].cmp(&b[0]));
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "Парацетамол 200");
    assert_eq!(&rows[0][1], format!("{}/Paracetamol/200mg/", base));
    assert_eq!(&rows[0][2], "200 мг");
    assert_eq!(&rows[0][3], "Дарница, Украина");
    assert_eq!(&rows[0][7], "N02BE01 - Парацетамол");
    assert_eq!(&rows[1][0], "Парацетамол 500");

    let snapshot = pipeline.progress().snapshot();
    let (name, drugs) = &snapshot[1];
    assert_eq!(name, "drugs");
    assert_eq!(drugs.failed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_drug_scan_into_database() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(&server, "/atc/", atc_page(&[("/atc/A/", "A"), ("/atc/N/", "N")])).await;
    serve(&server, "/atc/A/", goods_page(&["/Almagel/"])).await;
    serve(&server, "/atc/N/", goods_page(&["/Paracetamol/", "/Nimesil/"])).await;
    serve(&server, "/Almagel/", dosage_page("/Almagel/", &["/Almagel/susp/"])).await;
    serve(
        &server,
        "/Paracetamol/",
        dosage_page("/Paracetamol/", &["/Paracetamol/200mg/", "/Paracetamol/500mg/"]),
    )
    .await;
    // Only the aggregate entry: no dosage pages
    serve(&server, "/Nimesil/", dosage_page("/Nimesil/", &[])).await;
    serve(&server, "/Almagel/susp/", drug_page("Алмагель", "170 мл", "A02AB10")).await;
    serve(&server, "/Paracetamol/200mg/", drug_page("Парацетамол 200", "200 мг", "N02BE01")).await;
    serve(&server, "/Paracetamol/500mg/", drug_page("Парацетамол 500", "500 мг", "N02BE01")).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("drugs.db");

    let config = test_config(&base);
    let progress = Arc::new(RunProgress::new());
    let mut sink = SqliteSink::open(&db_path, 2).unwrap();

    let total = scan_drugs(&config, fetcher(&config), &mut sink, Arc::clone(&progress))
        .await
        .unwrap();

    assert_eq!(total, 3);
    assert_eq!(sink.stored().unwrap(), 3);
    drop(sink);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let mut stmt = conn
        .prepare("SELECT name, dosage, instruction FROM drugs ORDER BY name")
        .unwrap();
    let rows: Vec<(String, String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(rows[0].0, "Алмагель");
    assert_eq!(rows[0].1, "170 мл");
    assert_eq!(rows[0].2, "Инструкция для Алмагель");
    assert_eq!(rows[1].0, "Парацетамол 200");
    assert_eq!(rows[2].0, "Парацетамол 500");

    let stages = progress.snapshot();
    assert_eq!(stages.len(), 4);
    assert!(stages.iter().all(|(_, snap)| snap.finished && snap.failed == 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_atc_tree_to_json() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(
        &server,
        "/atc/",
        atc_page(&[("/atc/A/", "A Пищеварительный тракт"), ("/atc/B/", "B Кровь")]),
    )
    .await;
    serve(
        &server,
        "/atc/A/",
        atc_page(&[("/atc/A01/", "A01 Стоматологические препараты")]),
    )
    .await;
    serve(&server, "/atc/A01/", atc_page(&[])).await;
    serve(&server, "/atc/B/", atc_page(&[])).await;

    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("ATC_tree.json");

    let mut config = test_config(&base);
    config.crawler.tree_workers = 2;
    let mut sink = JsonTreeSink::create(&json_path).unwrap();

    let tree = scan_atc_tree(&config, fetcher(&config), &mut sink, Arc::new(RunProgress::new()))
        .await
        .unwrap();
    assert_eq!(tree.node_count(), 4);

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "name": "АТХ (ATC) классификация",
            "children": [
                {
                    "name": "A Пищеварительный тракт",
                    "children": [{"name": "A01 Стоматологические препараты", "children": []}]
                },
                {"name": "B Кровь", "children": []}
            ]
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_atc_tree_failure_is_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve(&server, "/atc/", atc_page(&[("/atc/A/", "A"), ("/atc/B/", "B")])).await;
    serve(&server, "/atc/A/", atc_page(&[])).await;
    serve_error(&server, "/atc/B/").await;

    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("ATC_tree.json");

    let config = test_config(&base);
    let mut sink = JsonTreeSink::create(&json_path).unwrap();
    let result =
        scan_atc_tree(&config, fetcher(&config), &mut sink, Arc::new(RunProgress::new())).await;

    assert!(matches!(result, Err(HarvestError::Tree(_))));
    assert_eq!(std::fs::read_to_string(&json_path).unwrap(), "");
}
