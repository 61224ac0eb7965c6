use claim::assert_ok_eq;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

use comic_digest::verification::TTL_VALIDATE;

use crate::helpers::TestApp;

#[tokio::test]
async fn subscribe_mails_a_verification_code() {
    // Arrange
    let app = TestApp::spawn().await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_subscriptions("ursula_le_guin@gmail.com").await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let body = app.email_request(0).await;
    assert_eq!(body["To"], "ursula_le_guin@gmail.com");
    assert_eq!(
        body["Subject"],
        "Comic Digest Subscription - Verification Code"
    );
    let code = app.last_code().await;
    let entries = app.ledger.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].email, "ursula_le_guin@gmail.com");
    assert_eq!(entries[0].code, code);
    assert_ok_eq!(app.subscribers.contains("ursula_le_guin@gmail.com"), false);
}

#[tokio::test]
async fn subscribe_returns_400_for_invalid_data() {
    // Arrange
    let app = TestApp::spawn().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;
    let test_cases = [
        (vec![("email", "")], "empty email"),
        (vec![("email", "definitely-not-an-email")], "invalid email"),
        (vec![("email", "@domain.com")], "missing local part"),
        (vec![], "missing email"),
    ];

    for (body, description) in test_cases {
        // Act
        let response = app.post_form("/subscriptions", &body).await;

        // Assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not return 400 Bad Request when the payload was {description}"
        );
    }
    assert!(app.ledger.entries().unwrap().is_empty());
}

#[tokio::test]
async fn subscribe_returns_409_for_subscribed_emails() {
    // Arrange
    let app = TestApp::spawn().await;
    app.subscribers.add("alice@example.com").unwrap();
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_subscriptions("alice@example.com").await;

    // Assert
    assert_eq!(409, response.status().as_u16());
    assert!(app.ledger.entries().unwrap().is_empty());
}

#[tokio::test]
async fn subscribe_succeeds_even_if_the_code_cannot_be_delivered() {
    // Arrange
    let app = TestApp::spawn().await;
    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_subscriptions("alice@example.com").await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    assert_eq!(app.ledger.entries().unwrap().len(), 1);
}

#[tokio::test]
async fn confirming_with_the_mailed_code_subscribes_the_email() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.post_subscriptions("alice@example.com").await;
    let code = app.last_code().await;

    // Act
    let response = app
        .post_subscriptions_confirm("alice@example.com", &code)
        .await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    assert_ok_eq!(app.subscribers.list(), vec!["alice@example.com".to_string()]);
    assert!(app.ledger.entries().unwrap().is_empty());
}

#[tokio::test]
async fn surrounding_whitespace_is_ignored() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;

    // Act
    app.post_subscriptions("  alice@example.com ").await;
    let code = app.last_code().await;
    let response = app
        .post_subscriptions_confirm(" alice@example.com", &format!(" {code} "))
        .await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    assert_ok_eq!(app.subscribers.contains("alice@example.com"), true);
}

#[tokio::test]
async fn a_code_can_only_be_used_once() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.post_subscriptions("alice@example.com").await;
    let code = app.last_code().await;
    app.post_subscriptions_confirm("alice@example.com", &code)
        .await;

    // Act
    let response = app
        .post_subscriptions_confirm("alice@example.com", &code)
        .await;

    // Assert
    assert_eq!(401, response.status().as_u16());
    assert_ok_eq!(app.subscribers.list(), vec!["alice@example.com".to_string()]);
}

#[tokio::test]
async fn confirming_with_a_wrong_code_returns_401() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.post_subscriptions("alice@example.com").await;
    let code = app.last_code().await;
    let wrong = if code == "000000" { "000001" } else { "000000" };

    // Act
    let responses = [
        app.post_subscriptions_confirm("alice@example.com", wrong)
            .await,
        app.post_subscriptions_confirm("bob@example.com", &code)
            .await,
        app.post_subscriptions_confirm("alice@example.com", "12ab56")
            .await,
        app.post_subscriptions_confirm("not-an-email", &code).await,
    ];

    // Assert
    for response in responses {
        assert_eq!(401, response.status().as_u16());
    }
    assert_ok_eq!(app.subscribers.contains("alice@example.com"), false);
    assert_eq!(app.ledger.entries().unwrap().len(), 1);
}

#[tokio::test]
async fn confirming_an_expired_code_returns_401() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.post_subscriptions("alice@example.com").await;
    let code = app.last_code().await;
    app.clock.advance(TTL_VALIDATE);

    // Act
    let response = app
        .post_subscriptions_confirm("alice@example.com", &code)
        .await;

    // Assert
    assert_eq!(401, response.status().as_u16());
    assert_ok_eq!(app.subscribers.contains("alice@example.com"), false);
}

#[tokio::test]
async fn confirming_just_before_expiry_succeeds() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.post_subscriptions("alice@example.com").await;
    let code = app.last_code().await;
    app.clock.advance(TTL_VALIDATE - 1);

    // Act
    let response = app
        .post_subscriptions_confirm("alice@example.com", &code)
        .await;

    // Assert
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn confirming_after_someone_else_subscribed_the_email_fails_and_burns_the_code() {
    // Arrange
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.post_subscriptions("alice@example.com").await;
    let code = app.last_code().await;
    app.subscribers.add("alice@example.com").unwrap();

    // Act
    let response = app
        .post_subscriptions_confirm("alice@example.com", &code)
        .await;

    // Assert
    assert_eq!(500, response.status().as_u16());
    assert!(app.ledger.entries().unwrap().is_empty());
    assert_ok_eq!(app.subscribers.list(), vec!["alice@example.com".to_string()]);
}

#[tokio::test]
async fn confirming_without_a_code_returns_400() {
    // Arrange
    let app = TestApp::spawn().await;

    // Act
    let response = app
        .post_form("/subscriptions/confirm", &[("email", "alice@example.com")])
        .await;

    // Assert
    assert_eq!(400, response.status().as_u16());
}
