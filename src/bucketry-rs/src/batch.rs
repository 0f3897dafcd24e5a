use bucketry_core::{
    endpoint, operations, AggregateResult, Attachment, BatchDefaults, BatchRequest, BatchResponse,
    HttpMethod, PermissionOp, Permissions, RequestDescriptor, RequestOptions, SubResponse,
    ValidationError,
};
use futures::future::try_join_all;
use serde_json::Value;

use crate::http::HttpTransport;
use crate::Result;

/// Outcome of a batch call, shaped by the `aggregate` option
#[derive(Debug, Clone, PartialEq)]
pub enum BatchResult {
    Responses(Vec<SubResponse>),
    Aggregate(AggregateResult),
}

impl BatchResult {
    pub(crate) fn empty(aggregate: bool) -> Self {
        if aggregate {
            BatchResult::Aggregate(AggregateResult::default())
        } else {
            BatchResult::Responses(Vec::new())
        }
    }

    pub fn responses(&self) -> Option<&[SubResponse]> {
        match self {
            BatchResult::Responses(responses) => Some(responses),
            BatchResult::Aggregate(_) => None,
        }
    }

    pub fn aggregate(&self) -> Option<&AggregateResult> {
        match self {
            BatchResult::Aggregate(result) => Some(result),
            BatchResult::Responses(_) => None,
        }
    }
}

/// Operations that can be queued in a batch.
///
/// Each method builds a descriptor with the batch options merged with the
/// per-call `options` and appends it; nothing is sent until the batch
/// callback returns.
pub trait BatchOperations {
    /// Options every queued operation starts from
    fn defaults(&self) -> &RequestOptions;

    /// Queue a prepared descriptor
    fn append(&mut self, request: RequestDescriptor) -> Result<()>;

    fn create_bucket(
        &mut self,
        id: &str,
        data: Option<Value>,
        options: &RequestOptions,
    ) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::create_bucket(id, data, None, &opts)?)
    }

    fn update_bucket(&mut self, data: Value, options: &RequestOptions) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::update_bucket(data, None, &opts)?)
    }

    fn delete_bucket(&mut self, id: &str, options: &RequestOptions) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::delete_bucket(id, &opts)?)
    }

    fn create_collection(
        &mut self,
        id: Option<&str>,
        data: Option<Value>,
        options: &RequestOptions,
    ) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::create_collection(id, data, None, &opts)?)
    }

    fn update_collection(&mut self, data: Value, options: &RequestOptions) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::update_collection(data, None, &opts)?)
    }

    fn delete_collection(&mut self, id: &str, options: &RequestOptions) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::delete_collection(id, &opts)?)
    }

    fn create_group(
        &mut self,
        id: &str,
        members: Vec<String>,
        options: &RequestOptions,
    ) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::create_group(id, members, None, None, &opts)?)
    }

    fn update_group(&mut self, data: Value, options: &RequestOptions) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::update_group(data, None, &opts)?)
    }

    fn delete_group(&mut self, id: &str, options: &RequestOptions) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::delete_group(id, &opts)?)
    }

    fn create_record(&mut self, record: Value, options: &RequestOptions) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::create_record(record, &opts)?)
    }

    fn update_record(&mut self, record: Value, options: &RequestOptions) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::update_record(record, &opts)?)
    }

    fn delete_record(&mut self, id: &str, options: &RequestOptions) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::delete_record(id, &opts)?)
    }

    fn patch_permissions(
        &mut self,
        collection: &str,
        permissions: &Permissions,
        op: PermissionOp,
        options: &RequestOptions,
    ) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::patch_collection_permissions(
            collection,
            permissions,
            op,
            &opts,
        )?)
    }

    /// Attachments are multipart uploads and cannot be batched
    fn add_attachment(
        &mut self,
        record_id: &str,
        attachment: Attachment,
        options: &RequestOptions,
    ) -> Result<()> {
        let opts = self.defaults().merge(options);
        self.append(operations::add_attachment(record_id, attachment, &opts)?)
    }
}

/// Batch-scoped context handed to the batch callback.
///
/// Owns the buffer of one top-level batch call. A `Batch` only exists
/// while that call's callback runs, so it is always inside a batch.
#[derive(Debug)]
pub struct Batch {
    defaults: RequestOptions,
    requests: Vec<RequestDescriptor>,
}

impl Batch {
    pub(crate) fn new(defaults: RequestOptions) -> Self {
        Self {
            defaults,
            requests: Vec::new(),
        }
    }

    /// Batches do not nest: always fails with `NestedBatch`, leaving the
    /// queued operations untouched. Queue operations on this context instead.
    pub fn batch<F>(&mut self, _f: F) -> Result<()>
    where
        F: FnOnce(&mut Batch) -> Result<()>,
    {
        Err(ValidationError::NestedBatch.into())
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[RequestDescriptor] {
        &self.requests
    }

    pub(crate) fn into_requests(self) -> Vec<RequestDescriptor> {
        self.requests
    }
}

impl BatchOperations for Batch {
    fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    fn append(&mut self, request: RequestDescriptor) -> Result<()> {
        if request.is_multipart() {
            return Err(ValidationError::AttachmentInBatch.into());
        }
        self.requests.push(request);
        Ok(())
    }
}

/// Split into contiguous chunks of at most `max` requests; `None` means
/// a single chunk.
pub(crate) fn partition(
    requests: Vec<RequestDescriptor>,
    max: Option<usize>,
) -> Vec<Vec<RequestDescriptor>> {
    match max {
        Some(max) if max > 0 && requests.len() > max => {
            requests.chunks(max).map(|chunk| chunk.to_vec()).collect()
        }
        _ => vec![requests],
    }
}

/// Send `requests` as one composite request per chunk.
///
/// Chunks are dispatched concurrently; responses are concatenated in
/// submission order and the first failing chunk fails the whole call.
pub(crate) async fn send_batch(
    transport: &HttpTransport,
    remote: &str,
    requests: Vec<RequestDescriptor>,
    options: &RequestOptions,
    max_requests: Option<usize>,
) -> Result<Vec<SubResponse>> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let url = format!("{}{}", remote, endpoint::BATCH);
    let chunks = partition(requests, max_requests);
    let total = chunks.len();

    let calls = chunks.into_iter().enumerate().map(|(index, chunk)| {
        let url = url.as_str();
        async move {
            tracing::debug!(
                chunk = index + 1,
                of = total,
                requests = chunk.len(),
                "Dispatching batch chunk"
            );
            let body = BatchRequest {
                defaults: BatchDefaults {
                    headers: options.headers.clone(),
                },
                requests: chunk,
            };
            let descriptor = RequestDescriptor::new(HttpMethod::Post, endpoint::BATCH)
                .with_headers(options.headers.clone())
                .with_body(serde_json::to_value(&body)?);

            let response = transport
                .request(url, &descriptor, options.retry_budget())
                .await?;
            let parsed: BatchResponse = serde_json::from_value(response.json)?;
            Ok::<_, crate::ClientError>(parsed.responses)
        }
    });

    let responses: Vec<SubResponse> = try_join_all(calls).await?.into_iter().flatten().collect();
    Ok(responses)
}
