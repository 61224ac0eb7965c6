use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

use comic_digest::verification::TTL_RETAIN;

use crate::helpers::TestApp;

async fn serve_latest_comic(app: &TestApp) {
    Mock::given(path("/info.0.json"))
        .and(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "num": 1,
            "title": "Barrel - Part 1",
            "img": "https://imgs.example.com/comics/barrel_cropped_(1).jpg",
            "alt": "Don't we all.",
            "day": "1",
            "month": "1",
            "year": "2006"
        })))
        .mount(&app.comic_server)
        .await;
}

#[tokio::test]
async fn the_digest_reaches_confirmed_subscribers_only() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    serve_latest_comic(&app).await;
    app.subscribe("alice@example.com").await;
    app.post_subscriptions("pending@example.com").await;
    let before = app.email_server.received_requests().await.unwrap().len();

    // Act
    let report = app.digest_worker().run_once().await.unwrap();

    // Assert
    assert_eq!((report.sent, report.failed), (1, 0));
    let digest = app.email_request(before).await;
    assert_eq!(digest["To"], "alice@example.com");
    assert!(digest["HtmlBody"]
        .as_str()
        .unwrap()
        .contains("Barrel - Part 1"));
}

#[tokio::test]
async fn the_digest_links_to_the_unsubscription_page() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    serve_latest_comic(&app).await;
    app.subscribe("alice@example.com").await;

    // Act
    app.digest_worker().run_once().await.unwrap();

    // Assert
    let digest = app.email_request(1).await;
    let text = digest["TextBody"].as_str().unwrap();
    let (_, link) = text
        .split_once("To unsubscribe, visit: ")
        .expect("No unsubscribe link in the digest");
    let link = link.trim();
    assert_eq!(link, format!("{}/unsubscriptions", app.address));
    assert!(digest["HtmlBody"].as_str().unwrap().contains(link));
    assert_eq!(200, app.get(link).await.status().as_u16());
}

#[tokio::test]
async fn the_digest_cycle_sweeps_stale_codes() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.comic_server)
        .await;
    app.post_subscriptions("stale@example.com").await;
    app.clock.advance(TTL_RETAIN);
    app.post_subscriptions("fresh@example.com").await;

    // Act
    let report = app.digest_worker().run_once().await.unwrap();

    // Assert
    assert_eq!(report.swept, 1);
    let entries = app.ledger.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].email, "fresh@example.com");
}

#[tokio::test]
async fn the_digest_cycle_fails_if_the_comic_api_is_down() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.subscribe("alice@example.com").await;
    Mock::given(path("/info.0.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.comic_server)
        .await;

    // Act
    let outcome = app.digest_worker().run_once().await;

    // Assert
    assert!(outcome.is_err());
}
