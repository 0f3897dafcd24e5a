mod common;

use actix_web::{web, HttpRequest, HttpResponse};
use bucketry_rs::{ClientError, ListParams, Pages, ValidationError};
use common::MockServer;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const RECORDS: &str = "/v1/buckets/blog/collections/posts/records";

/// Three pages of one record each, linked with absolute `Next-Page` URLs
async fn paginated(calls: Arc<AtomicUsize>) -> MockServer {
    MockServer::start(move |cfg: &mut web::ServiceConfig| {
        let calls = calls.clone();
        cfg.route(
            RECORDS,
            web::get().to(move |req: HttpRequest, query: web::Query<HashMap<String, String>>| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
                    let etag = if page == 1 { "\"1500\"" } else { "\"1400\"" };

                    let mut response = HttpResponse::Ok();
                    response
                        .insert_header(("ETag", etag))
                        .insert_header(("Total-Records", "3"));
                    if page < 3 {
                        let next = format!(
                            "http://{}{}?page={}",
                            req.connection_info().host(),
                            req.path(),
                            page + 1
                        );
                        response.insert_header(("Next-Page", next));
                    }
                    response.json(json!({"data": [{"id": format!("r{}", page)}]}))
                }
            }),
        );
    })
    .await
}

fn record_ids(data: &[serde_json::Value]) -> Vec<&str> {
    data.iter().filter_map(|r| r["id"].as_str()).collect()
}

#[actix_web::test]
async fn test_unbounded_pages_follow_every_continuation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let server = paginated(calls.clone()).await;

    let result = server
        .client()
        .list_records("blog", "posts", &ListParams::new().pages(Pages::Unbounded))
        .await
        .unwrap();

    assert_eq!(record_ids(&result.data), vec!["r1", "r2", "r3"]);
    assert_eq!(result.last_modified.as_deref(), Some("1500"));
    assert_eq!(result.total_records, Some(3));
    assert!(!result.has_next_page);
    assert_eq!(result.pages_consumed, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let err = result.next().await.unwrap_err();
    assert!(matches!(err, ClientError::PaginationExhausted));
    assert_eq!(err.to_string(), "Pagination exhausted.");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    server.stop().await;
}

#[actix_web::test]
async fn test_single_page_by_default_then_next() {
    let calls = Arc::new(AtomicUsize::new(0));
    let server = paginated(calls.clone()).await;

    let first = server
        .client()
        .list_records("blog", "posts", &ListParams::new())
        .await
        .unwrap();

    assert_eq!(record_ids(&first.data), vec!["r1"]);
    assert!(first.has_next_page);
    assert!(first.next_page_url().unwrap().ends_with("?page=2"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = first.next().await.unwrap();
    assert_eq!(record_ids(&second.data), vec!["r1", "r2"]);
    assert_eq!(second.last_modified.as_deref(), Some("1500"));
    assert_eq!(second.total_records, Some(3));
    assert_eq!(second.pages_consumed, 2);
    assert!(second.has_next_page);

    // The earlier cursor is left untouched
    assert_eq!(record_ids(&first.data), vec!["r1"]);

    let third = second.next().await.unwrap();
    assert_eq!(record_ids(&third.data), vec!["r1", "r2", "r3"]);
    assert_eq!(third.pages_consumed, 3);
    assert!(!third.has_next_page);
    assert!(matches!(
        third.next().await.unwrap_err(),
        ClientError::PaginationExhausted
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    server.stop().await;
}

#[actix_web::test]
async fn test_page_count_limits_requests() {
    let calls = Arc::new(AtomicUsize::new(0));
    let server = paginated(calls.clone()).await;

    let result = server
        .client()
        .list_records("blog", "posts", &ListParams::new().pages(Pages::Count(2)))
        .await
        .unwrap();

    assert_eq!(record_ids(&result.data), vec!["r1", "r2"]);
    assert_eq!(result.last_modified.as_deref(), Some("1500"));
    assert!(result.has_next_page);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    server.stop().await;
}

#[actix_web::test]
async fn test_invalid_since_sends_nothing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let server = paginated(calls.clone()).await;

    let err = server
        .client()
        .list_records("blog", "posts", &ListParams::new().since("15 00"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::InvalidSince(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    server.stop().await;
}

#[actix_web::test]
async fn test_query_and_headers_are_sent() {
    let server = MockServer::start(|cfg: &mut web::ServiceConfig| {
        cfg.route(
            "/v1/buckets",
            web::get().to(|req: HttpRequest| async move {
                let header = req
                    .headers()
                    .get("X-Trace")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                HttpResponse::Ok().json(json!({
                    "data": [{"query": req.query_string(), "trace": header}]
                }))
            }),
        );
    })
    .await;

    let params = ListParams::new()
        .filter("has_posts", "true")
        .limit(5)
        .since("\"1500\"")
        .fields(["id"])
        .header("X-Trace", "abc");
    let result = server.client().list_buckets(&params).await.unwrap();

    assert_eq!(
        result.data[0]["query"],
        "_sort=-last_modified&has_posts=true&_limit=5&_since=1500&_fields=id"
    );
    assert_eq!(result.data[0]["trace"], "abc");
    assert_eq!(result.last_modified, None);
    assert_eq!(result.total_records, None);
    assert!(!result.has_next_page);

    server.stop().await;
}
