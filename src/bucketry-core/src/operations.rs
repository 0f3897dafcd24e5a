//! Resource-level operations expressed as descriptors.
//!
//! Each function resolves the bucket/collection scope from the merged
//! options, builds the path and delegates to the builders in
//! [`crate::requests`]. Both the batch context and the direct client
//! calls go through these.

use serde_json::{Map, Value};

use crate::endpoint;
use crate::error::ValidationError;
use crate::models::{Attachment, PermissionOp, Permissions, RequestDescriptor};
use crate::options::RequestOptions;
use crate::requests::{
    add_attachment_request, create_request, delete_request, json_patch_permissions_request,
    require_id, update_request,
};

type Result<T> = std::result::Result<T, ValidationError>;

fn scoped_bucket(options: &RequestOptions) -> Result<&str> {
    options
        .bucket
        .as_deref()
        .filter(|b| !b.is_empty())
        .ok_or(ValidationError::MissingId { kind: "bucket" })
}

fn scoped_collection(options: &RequestOptions) -> Result<&str> {
    options
        .collection
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(ValidationError::MissingId { kind: "collection" })
}

fn with_id(data: Option<Value>, id: &str) -> Value {
    let mut fields = match data {
        Some(Value::Object(fields)) => fields,
        _ => Map::new(),
    };
    fields.insert("id".to_string(), Value::String(id.to_string()));
    Value::Object(fields)
}

pub fn create_bucket(
    id: &str,
    data: Option<Value>,
    permissions: Option<Permissions>,
    options: &RequestOptions,
) -> Result<RequestDescriptor> {
    let id = require_id("bucket", Some(id), None)?;
    Ok(create_request(
        &endpoint::bucket(id),
        Some(with_id(data, id)),
        permissions,
        options,
    ))
}

pub fn update_bucket(
    data: Value,
    permissions: Option<Permissions>,
    options: &RequestOptions,
) -> Result<RequestDescriptor> {
    let id = require_id("bucket", None, Some(&data))?.to_string();
    Ok(update_request(
        &endpoint::bucket(&id),
        Some(data),
        permissions,
        options,
    ))
}

pub fn delete_bucket(id: &str, options: &RequestOptions) -> Result<RequestDescriptor> {
    let id = require_id("bucket", Some(id), None)?;
    delete_request(&endpoint::bucket(id), options)
}

/// Without an id the server assigns one (POST on the collection list)
pub fn create_collection(
    id: Option<&str>,
    data: Option<Value>,
    permissions: Option<Permissions>,
    options: &RequestOptions,
) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let request = match id.filter(|id| !id.is_empty()) {
        Some(id) => create_request(
            &endpoint::collection(bucket, id),
            Some(with_id(data, id)),
            permissions,
            options,
        ),
        None => create_request(&endpoint::collections(bucket), data, permissions, options),
    };
    Ok(request)
}

pub fn update_collection(
    data: Value,
    permissions: Option<Permissions>,
    options: &RequestOptions,
) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let id = require_id("collection", None, Some(&data))?.to_string();
    Ok(update_request(
        &endpoint::collection(bucket, &id),
        Some(data),
        permissions,
        options,
    ))
}

pub fn delete_collection(id: &str, options: &RequestOptions) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let id = require_id("collection", Some(id), None)?;
    delete_request(&endpoint::collection(bucket, id), options)
}

pub fn create_group(
    id: &str,
    members: Vec<String>,
    data: Option<Value>,
    permissions: Option<Permissions>,
    options: &RequestOptions,
) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let id = require_id("group", Some(id), None)?;
    let mut data = with_id(data, id);
    if let Value::Object(fields) = &mut data {
        fields.insert(
            "members".to_string(),
            Value::Array(members.into_iter().map(Value::String).collect()),
        );
    }
    Ok(create_request(
        &endpoint::group(bucket, id),
        Some(data),
        permissions,
        options,
    ))
}

pub fn update_group(
    data: Value,
    permissions: Option<Permissions>,
    options: &RequestOptions,
) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let id = require_id("group", None, Some(&data))?.to_string();
    Ok(update_request(
        &endpoint::group(bucket, &id),
        Some(data),
        permissions,
        options,
    ))
}

pub fn delete_group(id: &str, options: &RequestOptions) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let id = require_id("group", Some(id), None)?;
    delete_request(&endpoint::group(bucket, id), options)
}

pub fn create_record(record: Value, options: &RequestOptions) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let collection = scoped_collection(options)?;
    let path = match require_id("record", None, Some(&record)) {
        Ok(id) => endpoint::record(bucket, collection, id),
        Err(_) => endpoint::records(bucket, collection),
    };
    Ok(create_request(&path, Some(record), None, options))
}

pub fn update_record(record: Value, options: &RequestOptions) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let collection = scoped_collection(options)?;
    let id = require_id("record", None, Some(&record))?.to_string();
    Ok(update_request(
        &endpoint::record(bucket, collection, &id),
        Some(record),
        None,
        options,
    ))
}

pub fn delete_record(id: &str, options: &RequestOptions) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let collection = scoped_collection(options)?;
    let id = require_id("record", Some(id), None)?;
    delete_request(&endpoint::record(bucket, collection, id), options)
}

pub fn get_record(id: &str, options: &RequestOptions) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let collection = scoped_collection(options)?;
    let id = require_id("record", Some(id), None)?;
    Ok(RequestDescriptor::get(endpoint::record(bucket, collection, id))
        .with_headers(options.headers.clone()))
}

pub fn patch_collection_permissions(
    id: &str,
    permissions: &Permissions,
    op: PermissionOp,
    options: &RequestOptions,
) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let id = require_id("collection", Some(id), None)?;
    Ok(json_patch_permissions_request(
        &endpoint::collection(bucket, id),
        permissions,
        op,
        options,
    ))
}

pub fn add_attachment(
    record_id: &str,
    attachment: Attachment,
    options: &RequestOptions,
) -> Result<RequestDescriptor> {
    let bucket = scoped_bucket(options)?;
    let collection = scoped_collection(options)?;
    let id = require_id("record", Some(record_id), None)?;
    Ok(add_attachment_request(
        &endpoint::attachment(bucket, collection, id),
        attachment,
        options,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpMethod;
    use serde_json::json;

    fn scoped() -> RequestOptions {
        RequestOptions::new()
            .with_bucket("blog")
            .with_collection("posts")
    }

    #[test]
    fn test_create_record_with_and_without_id() {
        let req = create_record(json!({"title": "hello"}), &scoped()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "/buckets/blog/collections/posts/records");

        let req = create_record(json!({"id": "p1", "title": "hello"}), &scoped()).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "/buckets/blog/collections/posts/records/p1");
    }

    #[test]
    fn test_update_record_requires_id() {
        let err = update_record(json!({"title": "x"}), &scoped()).unwrap_err();
        assert_eq!(err, ValidationError::MissingId { kind: "record" });
    }

    #[test]
    fn test_record_ops_require_collection_scope() {
        let opts = RequestOptions::new().with_bucket("blog");
        assert_eq!(
            delete_record("p1", &opts).unwrap_err(),
            ValidationError::MissingId { kind: "collection" }
        );
    }

    #[test]
    fn test_delete_record_empty_id() {
        assert_eq!(
            delete_record("", &scoped()).unwrap_err(),
            ValidationError::MissingId { kind: "record" }
        );
    }

    #[test]
    fn test_create_bucket_injects_id() {
        let req = create_bucket("blog", Some(json!({"title": "Blog"})), None, &RequestOptions::new())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.body, Some(json!({"data": {"id": "blog", "title": "Blog"}})));
    }

    #[test]
    fn test_create_collection_without_id_posts() {
        let req = create_collection(None, None, None, &scoped()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "/buckets/blog/collections");
    }

    #[test]
    fn test_create_group_members() {
        let req = create_group(
            "editors",
            vec!["alice".to_string()],
            None,
            None,
            &scoped(),
        )
        .unwrap();
        assert_eq!(req.path, "/buckets/blog/groups/editors");
        assert_eq!(
            req.body,
            Some(json!({"data": {"id": "editors", "members": ["alice"]}}))
        );
    }

    #[test]
    fn test_safe_delete_collection() {
        let opts = scoped().with_safe(true).with_last_modified(42);
        let req = delete_collection("posts", &opts).unwrap();
        assert_eq!(req.headers["If-Match"], "\"42\"");
    }
}
