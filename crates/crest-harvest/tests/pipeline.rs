//! Crawl pipeline integration tests
//!
//! Serves a miniature wiki (hub list, municipality articles, file pages) from
//! a wiremock server and drives the three crawl stages against it.

use crest_harvest::crawl::pipeline::redirect_targets;
use crest_harvest::{
    AssetFetcher, CrawlConfig, Crawler, DownloadConfig, EntityId, EntityStore, HarvestError,
    LockedStore,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Page builders ──

fn hub_page(names: &[&str]) -> String {
    let rows: String = names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            format!(
                r#"<tr><td>{}</td><td><a href="/wiki/{n}">Občina {n}</a></td><td>x</td></tr>"#,
                i + 1
            )
        })
        .collect();
    format!(
        r#"<html><body><table class="wikitable"><tbody>
           <tr><th>#</th><th>Ime</th><th>Regija</th></tr>{rows}
           </tbody></table></body></html>"#
    )
}

fn detail_page(links: &[(&str, &str)]) -> String {
    let spans: String = links
        .iter()
        .map(|(href, title)| format!(r#"<span><a href="{href}" title="{title}">img</a></span>"#))
        .collect();
    format!(
        r#"<html><body><table class="infobox"><tbody><tr>
           <td class="infobox-full-data"><table><tbody><tr><td>{spans}</td></tr></tbody></table></td>
           </tr></tbody></table></body></html>"#
    )
}

fn file_page(server: &MockServer, asset: &str) -> String {
    format!(
        r#"<html><body><div id="bodyContent"><div class="fullMedia"><p>
           <a href="//{}/assets/{asset}" class="internal">Izvirna datoteka</a>
           </p></div></div></body></html>"#,
        server.address()
    )
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Wire up hub → detail → file page for every name.
async fn serve_wiki(server: &MockServer, names: &[&str]) {
    serve(server, "/wiki/Seznam", hub_page(names)).await;
    for name in names {
        let file = format!("/wiki/Slika:Grb_{name}.svg");
        let flag = format!("/wiki/Slika:Zastava_{name}.svg");
        serve(
            server,
            &format!("/wiki/{name}"),
            detail_page(&[(flag.as_str(), "Zastava Občine"), (file.as_str(), "Grb Občine")]),
        )
        .await;
        serve(server, &file, file_page(server, &format!("grb_{name}.svg"))).await;
    }
}

fn config(server: &MockServer) -> CrawlConfig {
    CrawlConfig {
        hub_url: format!("{}/wiki/Seznam", server.uri()),
        allowed_domains: Vec::new(),
        page_retries: 0,
        page_timeout_ms: 5_000,
        ..CrawlConfig::default()
    }
}

fn crawler(server: &MockServer) -> Crawler {
    Crawler::over_http(&config(server)).unwrap()
}

// ── Tests ──

#[tokio::test]
async fn test_two_entities_resolve_to_assets() {
    let server = MockServer::start().await;
    serve_wiki(&server, &["A", "B"]).await;

    let report = crawler(&server).run().await.unwrap();

    assert_eq!(report.discovered, 2);
    assert_eq!(report.records.len(), 2);
    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
    for record in &report.records {
        let asset = record.asset_url.as_deref().unwrap();
        assert!(asset.ends_with(&format!("/assets/grb_{}.svg", record.name)));
        assert!(record
            .redirect_url
            .as_deref()
            .unwrap()
            .ends_with(&format!("/wiki/Slika:Grb_{}.svg", record.name)));
    }
    assert_eq!(report.detail.completed, 2);
    assert_eq!(report.redirect.completed, 2);
}

#[tokio::test]
async fn test_ids_are_one_through_n() {
    let server = MockServer::start().await;
    let names: Vec<String> = (0..25).map(|i| format!("Obcina{i:02}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    serve_wiki(&server, &refs).await;

    let report = crawler(&server).run().await.unwrap();

    let ids: Vec<u32> = report.records.iter().map(|r| r.id.0).collect();
    assert_eq!(ids, (1..=25).collect::<Vec<_>>());
    // Every response was attributed to the entity that requested it.
    for record in &report.records {
        assert!(record.source_page_url.ends_with(&format!("/wiki/{}", record.name)));
        assert!(record
            .asset_url
            .as_deref()
            .unwrap()
            .ends_with(&format!("grb_{}.svg", record.name)));
    }
}

#[tokio::test]
async fn test_decoy_only_detail_page_is_a_soft_miss() {
    let server = MockServer::start().await;
    serve(&server, "/wiki/Seznam", hub_page(&["A", "B"])).await;
    serve(
        &server,
        "/wiki/A",
        detail_page(&[("/wiki/Slika:Grb_A.svg", "Grb Občine A")]),
    )
    .await;
    serve(
        &server,
        "/wiki/B",
        detail_page(&[("/wiki/Slika:Zastava_B.svg", "Zastava Občine B")]),
    )
    .await;
    serve(&server, "/wiki/Slika:Grb_A.svg", file_page(&server, "grb_a.svg")).await;

    let crawler = crawler(&server);
    crawler.hub_stage().await.unwrap();
    let detail = crawler.detail_stage().await;
    assert_eq!(detail.completed, 2);
    assert_eq!(detail.failed, 0);

    let snapshot = crawler.store().snapshot();
    let b = snapshot.iter().find(|r| r.name == "B").unwrap();
    assert!(b.redirect_url.is_none());

    let stage3: Vec<EntityId> = redirect_targets(&snapshot).iter().map(|(id, _)| *id).collect();
    assert_eq!(stage3, vec![EntityId(1)]);

    crawler.redirect_stage().await;
    let snapshot = crawler.store().snapshot();
    assert!(snapshot[0].asset_url.is_some());
    assert!(snapshot[1].asset_url.is_none());
}

#[tokio::test]
async fn test_failed_detail_page_does_not_stop_siblings() {
    let server = MockServer::start().await;
    serve(&server, "/wiki/Seznam", hub_page(&["A", "B"])).await;
    serve(
        &server,
        "/wiki/A",
        detail_page(&[("/wiki/Slika:Grb_A.svg", "Grb")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/wiki/B"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    serve(&server, "/wiki/Slika:Grb_A.svg", file_page(&server, "grb_a.svg")).await;

    let report = crawler(&server).run().await.unwrap();
    assert_eq!(report.detail.failed, 1);
    assert_eq!(report.resolved(), 1);
    for record in &report.records {
        assert!(record.asset_url.is_none() || record.redirect_url.is_some());
    }
}

#[tokio::test]
async fn test_unreachable_hub_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(LockedStore::new());
    let crawler = Crawler::new(
        &config(&server),
        Arc::new(crest_harvest::crawl::HttpFetcher::new(Duration::from_secs(5), 0)),
        store.clone(),
    )
    .unwrap();

    match crawler.run().await {
        Err(HarvestError::HubUnreachable { reason, .. }) => assert_eq!(reason, "HTTP 404"),
        other => panic!("expected HubUnreachable, got {other:?}"),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_disallowed_hub_host_is_fatal() {
    let server = MockServer::start().await;
    let config = CrawlConfig {
        allowed_domains: vec!["sl.wikipedia.org".to_string()],
        ..config(&server)
    };
    let crawler = Crawler::over_http(&config).unwrap();
    assert!(matches!(
        crawler.run().await,
        Err(HarvestError::HubUnreachable { .. })
    ));
}

#[tokio::test]
async fn test_crawl_then_download_end_to_end() {
    let server = MockServer::start().await;
    serve_wiki(&server, &["Kranjska-Gora", "Bled"]).await;
    for asset in ["/assets/grb_Kranjska-Gora.svg", "/assets/grb_Bled.svg"] {
        Mock::given(method("GET"))
            .and(path(asset))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<svg/>".to_vec()))
            .mount(&server)
            .await;
    }

    let report = crawler(&server).run().await.unwrap();
    assert_eq!(report.resolved(), 2);

    let out = TempDir::new().unwrap();
    let fetcher = AssetFetcher::new(&DownloadConfig {
        out_dir: out.path().join("coa"),
        start_jitter_ms: 0,
        base_delay_ms: 10,
        ..DownloadConfig::default()
    });
    let downloads = fetcher.fetch_all(&report.records).await.unwrap();

    assert_eq!(downloads.downloaded.len(), 2, "{:?}", downloads.failed);
    assert!(out.path().join("coa/kranjska_gora.svg").exists());
    assert_eq!(
        std::fs::read(out.path().join("coa/bled.svg")).unwrap(),
        b"<svg/>"
    );
}
