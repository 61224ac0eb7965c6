use crate::helpers::TestApp;

#[tokio::test]
async fn healthcheck_works() {
    // Arrange
    let app = TestApp::spawn().await;

    // Act
    let response = app.get_healthcheck().await;

    // Assert
    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}
