use crate::common::engine;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "application/xml")
}

#[tokio::test]
async fn test_sitemap_index_and_robots_directive() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nDisallow: /private\nSitemap: {}/extra-sitemap.xml\n",
            base
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(xml(format!(
            r#"<?xml version="1.0"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{}/posts.xml</loc></sitemap>
</sitemapindex>"#,
            base
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/posts.xml"))
        .respond_with(xml(format!(
            r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{}/a/</loc><lastmod>2025-02-01</lastmod></url>
  <url><loc>{}/b</loc></url>
</urlset>"#,
            base, base
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/extra-sitemap.xml"))
        .respond_with(xml(format!(
            r#"<urlset><url><loc>{}/c</loc><lastmod>2025-03-04T05:06:07+00:00</lastmod></url></urlset>"#,
            base
        )))
        .mount(&server)
        .await;

    let engine = engine();
    let data = engine.sitemap_data(&Url::parse(&base).unwrap()).await;

    assert_eq!(data.len(), 2);
    assert_eq!(data.lastmod(&format!("{}/a", base)), Some("2025-02-01"));
    assert_eq!(data.lastmod(&format!("{}/b", base)), None);
    assert_eq!(
        data.lastmod_timestamp(&format!("{}/c", base))
            .map(|ts| ts.to_string())
            .as_deref(),
        Some("2025-03-04 05:06:07 UTC")
    );
}

#[tokio::test]
async fn test_sitemap_missing_everywhere() {
    let server = MockServer::start().await;
    let data = engine()
        .sitemap_data(&Url::parse(&server.uri()).unwrap())
        .await;
    assert!(data.is_empty());
}
