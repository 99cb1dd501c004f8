//! Integration tests for [`AzureImageBackend`] against a mockito server.
//!
//! BDD style: each test documents scenario and expected outcome.

use image_generation_client::{AzureImageBackend, ImageBackend};
use mockito::Matcher;
use serde_json::json;

fn backend(server: &mockito::ServerGuard) -> AzureImageBackend {
    AzureImageBackend::new(
        reqwest::Client::new(),
        "azure-key".to_string(),
        format!("{}/", server.url()),
        "256x256".to_string(),
    )
}

/// **Test: Submission is polled until it succeeds.**
///
/// **Expected:** contentUrl of the succeeded operation is returned; caption/resolution sent.
#[tokio::test]
async fn azure_create_image_polls_until_succeeded() {
    let mut server = mockito::Server::new_async().await;
    let operation = format!("{}/operations/42", server.url());

    let submit = server
        .mock("POST", "/dalle/text-to-image")
        .match_query(Matcher::UrlEncoded(
            "api-version".into(),
            "2022-08-03-preview".into(),
        ))
        .match_header("api-key", "azure-key")
        .match_body(Matcher::Json(json!({"caption": "一只猫", "resolution": "256x256"})))
        .with_status(202)
        .with_header("Operation-Location", &operation)
        .with_header("Retry-after", "0")
        .create_async()
        .await;
    let poll = server
        .mock("GET", "/operations/42")
        .match_header("api-key", "azure-key")
        .with_status(200)
        .with_body(r#"{"status": "Succeeded", "result": {"contentUrl": "https://img/cat.png"}}"#)
        .create_async()
        .await;

    let url = backend(&server).create_image("一只猫", None).await.unwrap();

    submit.assert_async().await;
    poll.assert_async().await;
    assert_eq!(url, "https://img/cat.png");
}

/// **Test: A caller-supplied key overrides the configured one.**
#[tokio::test]
async fn azure_create_image_uses_caller_key() {
    let mut server = mockito::Server::new_async().await;
    let operation = format!("{}/operations/7", server.url());
    let _submit = server
        .mock("POST", "/dalle/text-to-image")
        .match_query(Matcher::Any)
        .match_header("api-key", "caller-key")
        .with_status(202)
        .with_header("Operation-Location", &operation)
        .with_header("Retry-after", "0")
        .create_async()
        .await;
    let _poll = server
        .mock("GET", "/operations/7")
        .with_body(r#"{"status": "Succeeded", "result": {"contentUrl": "u"}}"#)
        .create_async()
        .await;

    let url = backend(&server)
        .create_image("dog", Some("caller-key"))
        .await
        .unwrap();
    assert_eq!(url, "u");
}

/// **Test: Operation that never succeeds gives up after max polls.**
#[tokio::test]
async fn azure_create_image_gives_up_after_max_polls() {
    let mut server = mockito::Server::new_async().await;
    let operation = format!("{}/operations/9", server.url());
    let _submit = server
        .mock("POST", "/dalle/text-to-image")
        .match_query(Matcher::Any)
        .with_status(202)
        .with_header("Operation-Location", &operation)
        .with_header("Retry-after", "0")
        .create_async()
        .await;
    let poll = server
        .mock("GET", "/operations/9")
        .with_body(r#"{"status": "Running"}"#)
        .expect(3)
        .create_async()
        .await;

    let result = backend(&server)
        .with_max_polls(3)
        .create_image("dog", None)
        .await;

    poll.assert_async().await;
    assert!(result.is_err());
}

/// **Test: Missing Operation-Location header is an error.**
#[tokio::test]
async fn azure_create_image_missing_operation_location() {
    let mut server = mockito::Server::new_async().await;
    let _submit = server
        .mock("POST", "/dalle/text-to-image")
        .match_query(Matcher::Any)
        .with_status(202)
        .create_async()
        .await;

    let err = backend(&server).create_image("dog", None).await.unwrap_err();
    assert!(err.to_string().contains("Operation-Location"));
}
