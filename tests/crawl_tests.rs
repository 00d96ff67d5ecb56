//! Integration tests for catalogue crawls
//!
//! These tests use wiremock to stand in for the marketplace and drive the
//! real HTTP session through both crawl modes end-to-end.

use listing_harvester::catalogue::{CrawlOrchestrator, CrawlSettings};
use listing_harvester::client::FetchError;
use listing_harvester::config::{ClientConfig, FiltersConfig};
use listing_harvester::harvest::run_batch;
use listing_harvester::storage::{RunStatus, SqliteStorage, Storage};
use listing_harvester::{
    FilterCriteria, HarvestError, HttpSession, PageSource, RegionTable, SearchQuery, ShopQuery,
};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/web/1/js/items";
const SHOP_PATH: &str = "/web/1/profile/public/items";

fn client_config(base_url: &str, index_retries: u32) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        user_agent: "Mozilla/5.0 (test)".to_string(),
        cookie: Some("sessid=test".to_string()),
        timeout_secs: 5,
        request_delay_ms: 0,
        index_retries,
        retry_backoff_ms: 1,
    }
}

fn regions() -> RegionTable {
    [
        ("Москва".to_string(), 637640),
        ("Санкт-Петербург".to_string(), 653240),
    ]
    .into_iter()
    .collect()
}

fn search_page(entries: &[(&str, &str)]) -> String {
    let items: Vec<String> = entries
        .iter()
        .map(|(kind, path)| format!(r#"{{"type":"{}","urlPath":"{}"}}"#, kind, path))
        .collect();
    format!(r#"{{"catalog":{{"items":[{}]}}}}"#, items.join(","))
}

fn shop_page(paths: &[&str]) -> String {
    let items: Vec<String> = paths
        .iter()
        .map(|path| format!(r#"{{"url":"{}"}}"#, path))
        .collect();
    format!(r#"{{"result":{{"list":[{}]}}}}"#, items.join(","))
}

fn detail_page(title: &str, seller: &str, condition: &str) -> String {
    format!(
        r#"<html><head><title>{title}</title></head><body>
        <h1 data-marker="item-view/title-info">{title}</h1>
        <span data-marker="item-view/item-price" content="2750">2 750 ₽</span>
        <div data-marker="item-view/item-description"><p>Описание</p></div>
        <div data-marker="seller-info/name">{seller}</div>
        <span data-marker="item-view/total-views">315 просмотров</span>
        <ul>
            <li class="params-paramsList__item-_2Y2O">Производитель: Hella</li>
            <li class="params-paramsList__item-_2Y2O">Состояние: {condition}</li>
        </ul>
        </body></html>"#
    )
}

async fn mount_search_page(server: &MockServer, text: &str, region_id: u32, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("name", text))
        .and(query_param("locationId", region_id.to_string().as_str()))
        .and(query_param("p", page.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, listing_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(listing_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_search_crawl_end_to_end() {
    let server = MockServer::start().await;

    mount_search_page(
        &server,
        "lamp",
        637640,
        1,
        search_page(&[("item", "/moskva/lamp_1"), ("vip", "/moskva/promo")]),
    )
    .await;
    mount_search_page(&server, "lamp", 637640, 2, search_page(&[])).await;
    mount_detail(&server, "/moskva/lamp_1", detail_page("Лампа H7", "AutoParts", "Новое")).await;

    let config = client_config(&server.uri(), 0);
    let session = HttpSession::new(&config).unwrap();
    let regions = regions();
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config).unwrap());

    let catalogue = orchestrator
        .crawl_search(&SearchQuery::new("lamp", "Москва"), &FilterCriteria::default())
        .await
        .unwrap();

    assert_eq!(catalogue.len(), 1);
    let record = &catalogue.records()[0];
    assert_eq!(record.title, "Лампа H7");
    assert_eq!(record.price, 2750);
    assert_eq!(record.seller_name, "AutoParts");
    assert_eq!(record.views, "315");
    assert!(record.is_new());
    assert_eq!(record.url, format!("{}/moskva/lamp_1", server.uri()));

    assert_eq!(catalogue.stats.index_fetches, 2);
    assert_eq!(catalogue.stats.detail_fetches, 1);
    assert_eq!(catalogue.stats.skipped_stubs, 1);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_search_crawl_drops_used_listing() {
    let server = MockServer::start().await;

    mount_search_page(&server, "lamp", 637640, 1, search_page(&[("item", "/moskva/lamp_1")])).await;
    mount_search_page(&server, "lamp", 637640, 2, search_page(&[])).await;
    mount_detail(&server, "/moskva/lamp_1", detail_page("Лампа", "AutoParts", "Б/у")).await;

    let config = client_config(&server.uri(), 0);
    let session = HttpSession::new(&config).unwrap();
    let regions = regions();
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config).unwrap());

    let catalogue = orchestrator
        .crawl_search(&SearchQuery::new("lamp", "Москва"), &FilterCriteria::default())
        .await
        .unwrap();

    assert!(catalogue.is_empty());
    assert_eq!(catalogue.stats.dropped_condition, 1);
}

#[tokio::test]
async fn test_unknown_region_makes_no_requests() {
    let server = MockServer::start().await;

    let config = client_config(&server.uri(), 0);
    let session = HttpSession::new(&config).unwrap();
    let regions = regions();
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config).unwrap());

    let result = orchestrator
        .crawl_search(&SearchQuery::new("lamp", "Нарния"), &FilterCriteria::default())
        .await;

    assert!(matches!(result, Err(HarvestError::Configuration { .. })));
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_shop_crawl_pages_by_offset_and_keeps_degraded_listings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SHOP_PATH))
        .and(query_param("hashUserId", "f00dbabe"))
        .and(query_param("shortcut", "active"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(shop_page(&["/a_1", "/a_2"])))
        .expect(1)
        .mount(&server)
        .await;

    // Browser-rendered JSON arrives wrapped in <pre>
    Mock::given(method("GET"))
        .and(path(SHOP_PATH))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<html><body><pre>{}</pre></body></html>",
            shop_page(&["/a_3"])
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SHOP_PATH))
        .and(query_param("offset", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_string(shop_page(&[])))
        .expect(1)
        .mount(&server)
        .await;

    mount_detail(&server, "/a_1", detail_page("Фара", "Shop", "Б/у")).await;
    Mock::given(method("GET"))
        .and(path("/a_2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_detail(&server, "/a_3", detail_page("Фонарь", "Shop", "Новое")).await;

    let config = client_config(&server.uri(), 0);
    let session = HttpSession::new(&config).unwrap();
    let regions = regions();
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config).unwrap());

    let catalogue = orchestrator
        .crawl_shop(&ShopQuery::new("https://www.avito.ru/user/f00dbabe/profile"))
        .await
        .unwrap();

    let titles: Vec<&str> = catalogue.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Фара", "", "Фонарь"]);
    assert!(catalogue.records()[1].is_blank());
    assert_eq!(catalogue.records()[1].url, format!("{}/a_2", server.uri()));

    assert_eq!(catalogue.stats.index_fetches, 3);
    assert_eq!(catalogue.stats.detail_fetches, 3);
    assert_eq!(catalogue.stats.degraded, 1);
    assert_eq!(request_count(&server).await, 6);
}

#[tokio::test]
async fn test_shop_url_without_marketplace_token_makes_no_requests() {
    let server = MockServer::start().await;

    let config = client_config(&server.uri(), 0);
    let session = HttpSession::new(&config).unwrap();
    let regions = regions();
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config).unwrap());

    let catalogue = orchestrator
        .crawl_shop(&ShopQuery::new("https://example.org/user/f00dbabe/profile"))
        .await
        .unwrap();

    assert!(catalogue.is_empty());
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_fetch_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut config = client_config(&server.uri(), 0);
    config.timeout_secs = 1;
    let session = HttpSession::new(&config).unwrap();
    let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();

    let started = Instant::now();
    let result = session.fetch(&url).await;

    assert_eq!(result, Err(FetchError::Timeout));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_slow_detail_page_degrades_and_crawl_continues() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SHOP_PATH))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(shop_page(&["/slow", "/a_2"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SHOP_PATH))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(shop_page(&[])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_page("Фара", "Shop", "Новое"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_detail(&server, "/a_2", detail_page("Фонарь", "Shop", "Новое")).await;

    let mut config = client_config(&server.uri(), 0);
    config.timeout_secs = 1;
    let session = HttpSession::new(&config).unwrap();
    let regions = regions();
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config).unwrap());

    let catalogue = orchestrator
        .crawl_shop(&ShopQuery::new("https://www.avito.ru/user/f00dbabe/profile"))
        .await
        .unwrap();

    let titles: Vec<&str> = catalogue.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["", "Фонарь"]);
    assert!(catalogue.records()[0].is_blank());
    assert_eq!(catalogue.stats.degraded, 1);
    assert_eq!(catalogue.stats.index_fetches, 2);
    assert_eq!(catalogue.stats.detail_fetches, 2);
}

#[tokio::test]
async fn test_listing_on_another_host_is_never_requested() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&other)
        .await;

    let absolute = format!("{}/stolen", other.uri());
    let protocol_relative = format!("//{}/stolen2", other.address());
    Mock::given(method("GET"))
        .and(path(SHOP_PATH))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(shop_page(&[
            absolute.as_str(),
            protocol_relative.as_str(),
            "/a_3",
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SHOP_PATH))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(shop_page(&[])))
        .expect(1)
        .mount(&server)
        .await;
    mount_detail(&server, "/a_3", detail_page("Фонарь", "Shop", "Новое")).await;

    let config = client_config(&server.uri(), 0);
    let session = HttpSession::new(&config).unwrap();
    let regions = regions();
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config).unwrap());

    let catalogue = orchestrator
        .crawl_shop(&ShopQuery::new("https://www.avito.ru/user/f00dbabe/profile"))
        .await
        .unwrap();

    assert_eq!(request_count(&other).await, 0);
    assert_eq!(catalogue.len(), 3);
    assert!(catalogue.records()[0].is_blank());
    assert!(catalogue.records()[1].is_blank());
    assert_eq!(catalogue.stats.degraded, 2);
    assert_eq!(catalogue.stats.detail_fetches, 1);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_failed_index_page_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_search_page(&server, "lamp", 637640, 1, search_page(&[])).await;

    let config = client_config(&server.uri(), 1);
    let session = HttpSession::new(&config).unwrap();
    let regions = regions();
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config).unwrap());

    let catalogue = orchestrator
        .crawl_search(&SearchQuery::new("lamp", "Москва"), &FilterCriteria::default())
        .await
        .unwrap();

    assert!(catalogue.is_empty());
    assert_eq!(catalogue.stats.index_fetches, 2);
}

#[tokio::test]
async fn test_index_failure_without_retries_aborts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let config = client_config(&server.uri(), 0);
    let session = HttpSession::new(&config).unwrap();
    let regions = regions();
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config).unwrap());

    let result = orchestrator
        .crawl_search(&SearchQuery::new("lamp", "Москва"), &FilterCriteria::default())
        .await;

    assert!(matches!(result, Err(HarvestError::Pagination { .. })));
}

#[tokio::test]
async fn test_batch_harvest_writes_database() {
    let server = MockServer::start().await;

    mount_search_page(&server, "lamp", 637640, 1, search_page(&[("item", "/moskva/l_1")])).await;
    mount_search_page(&server, "lamp", 637640, 2, search_page(&[])).await;
    mount_search_page(&server, "lamp", 653240, 1, search_page(&[("item", "/spb/l_2")])).await;
    mount_search_page(&server, "lamp", 653240, 2, search_page(&[])).await;
    mount_detail(&server, "/moskva/l_1", detail_page("Лампа", "AutoParts", "Новое")).await;
    mount_detail(&server, "/spb/l_2", detail_page("Лампа", "LR-STUDIO", "Новое")).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("listings.db");
    let mut storage = SqliteStorage::new(&db_path).unwrap();
    storage.insert_or_get_search_phrase(7, "lamp").unwrap();
    storage.insert_or_get_city("Москва").unwrap();
    storage.insert_or_get_city("Санкт-Петербург").unwrap();

    let filters = FiltersConfig {
        excluded_sellers: vec!["LR-STUDIO".to_string()],
        ..FiltersConfig::default()
    };

    let config = client_config(&server.uri(), 0);
    let session = HttpSession::new(&config).unwrap();
    let regions = regions();
    let orchestrator =
        CrawlOrchestrator::new(&session, &regions, CrawlSettings::from_config(&config).unwrap());

    let summary = run_batch(&orchestrator, &mut storage, &filters, "test-hash")
        .await
        .unwrap();
    assert_eq!(summary.crawls, 2);
    assert_eq!(summary.listings, 1);
    drop(storage);

    let reopened = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(reopened.count_listings().unwrap(), 1);
    let run = reopened.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
}
