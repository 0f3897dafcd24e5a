mod common;

use actix_web::web;
use bucketry_rs::{Attachment, Client, ClientError, RequestOptions, ValidationError};
use common::{echo, MockServer};
use serde_json::json;

async fn echo_server() -> MockServer {
    MockServer::start(|cfg: &mut web::ServiceConfig| {
        cfg.route("/{tail:.*}", web::route().to(echo));
    })
    .await
}

fn posts() -> RequestOptions {
    RequestOptions::new().with_bucket("blog").with_collection("posts")
}

#[actix_web::test]
async fn test_safe_create_requires_absence() {
    let server = echo_server().await;
    let client = Client::new(server.config().with_safe(true)).unwrap();

    let echoed = client
        .create_record(json!({"id": "p1", "title": "hello"}), &posts())
        .await
        .unwrap();

    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["path"], "/v1/buckets/blog/collections/posts/records/p1");
    assert_eq!(echoed["headers"]["if-none-match"], "*");
    assert_eq!(echoed["body"], json!({"data": {"id": "p1", "title": "hello"}}));

    let echoed = client
        .create_record(json!({"title": "anonymous"}), &posts().with_safe(false))
        .await
        .unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["path"], "/v1/buckets/blog/collections/posts/records");
    assert!(echoed["headers"].get("if-none-match").is_none());

    server.stop().await;
}

#[actix_web::test]
async fn test_safe_delete_sends_version() {
    let server = echo_server().await;
    let client = server.client();

    let echoed = client
        .delete_record("p1", &posts().with_safe(true).with_last_modified(42))
        .await
        .unwrap();

    assert_eq!(echoed["method"], "DELETE");
    assert_eq!(echoed["headers"]["if-match"], "\"42\"");
    assert_eq!(echoed["body"], serde_json::Value::Null);

    let err = client
        .delete_record("p1", &posts().with_safe(true))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::MissingLastModified)
    ));

    server.stop().await;
}

#[actix_web::test]
async fn test_update_variants() {
    let server = echo_server().await;
    let client = server.client();

    let echoed = client
        .update_record(
            json!({"id": "p1", "title": "edited", "last_modified": 7}),
            &posts().with_safe(true),
        )
        .await
        .unwrap();
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["headers"]["if-match"], "\"7\"");

    let echoed = client
        .update_record(json!({"id": "p1", "title": "patched"}), &posts().with_patch(true))
        .await
        .unwrap();
    assert_eq!(echoed["method"], "PATCH");
    assert_eq!(echoed["body"], json!({"data": {"id": "p1", "title": "patched"}}));

    server.stop().await;
}

#[actix_web::test]
async fn test_bucket_comes_from_client_defaults() {
    let server = echo_server().await;
    let client = Client::new(server.config().with_bucket("main")).unwrap();

    let echoed = client
        .get_record("p1", &RequestOptions::new().with_collection("posts"))
        .await
        .unwrap();
    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["path"], "/v1/buckets/main/collections/posts/records/p1");

    let err = client
        .get_record("p1", &RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::MissingId { kind: "collection" })
    ));

    server.stop().await;
}

#[actix_web::test]
async fn test_attachment_is_multipart() {
    let server = echo_server().await;
    let client = server.client();

    let attachment = Attachment {
        file_name: "notes.txt".to_string(),
        content_type: "text/plain".to_string(),
        bytes: b"some notes".to_vec(),
    };
    let echoed = client
        .add_attachment("p1", attachment, &posts())
        .await
        .unwrap();

    assert_eq!(echoed["method"], "POST");
    assert_eq!(
        echoed["path"],
        "/v1/buckets/blog/collections/posts/records/p1/attachment"
    );
    let content_type = echoed["headers"]["content-type"].as_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="), "{}", content_type);

    let body = echoed["body"].as_str().unwrap();
    assert!(body.contains("name=\"attachment\""));
    assert!(body.contains("filename=\"notes.txt\""));
    assert!(body.contains("some notes"));

    server.stop().await;
}
