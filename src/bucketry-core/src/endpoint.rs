//! Resource paths, relative to the remote (which carries the API version).

pub const ROOT: &str = "/";
pub const BATCH: &str = "/batch";
pub const PERMISSIONS: &str = "/permissions";

pub fn buckets() -> String {
    "/buckets".to_string()
}

pub fn bucket(bucket: &str) -> String {
    format!("/buckets/{}", bucket)
}

pub fn collections(bucket: &str) -> String {
    format!("/buckets/{}/collections", bucket)
}

pub fn collection(bucket: &str, collection: &str) -> String {
    format!("/buckets/{}/collections/{}", bucket, collection)
}

pub fn groups(bucket: &str) -> String {
    format!("/buckets/{}/groups", bucket)
}

pub fn group(bucket: &str, group: &str) -> String {
    format!("/buckets/{}/groups/{}", bucket, group)
}

pub fn records(bucket: &str, collection: &str) -> String {
    format!("/buckets/{}/collections/{}/records", bucket, collection)
}

pub fn record(bucket: &str, collection: &str, record: &str) -> String {
    format!("/buckets/{}/collections/{}/records/{}", bucket, collection, record)
}

pub fn attachment(bucket: &str, collection: &str, record: &str) -> String {
    format!("{}/attachment", self::record(bucket, collection, record))
}
