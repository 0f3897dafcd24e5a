use bucketry_core::{
    aggregate, endpoint, merge_headers, operations, Attachment, ClientConfig, RequestDescriptor,
    RequestOptions, ServerInfo, ServerSettings, ValidationError,
};
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::batch::{self, Batch, BatchResult};
use crate::events::{ClientEvents, NoopEvents};
use crate::http::{HttpResponse, HttpTransport};
use crate::pagination::{self, ListParams, PageResult};
use crate::{ClientError, Result};

/// Bucketry REST API Client
pub struct Client {
    remote: String,
    defaults: RequestOptions,
    transport: Arc<HttpTransport>,
    server_info: OnceCell<ServerInfo>,
}

impl Client {
    /// Create a new client from configuration, without event observer
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_events(config, Arc::new(NoopEvents))
    }

    /// Create a new client reporting backoff/deprecation/retry-after to `events`
    pub fn with_events(config: ClientConfig, events: Arc<dyn ClientEvents>) -> Result<Self> {
        let remote = config.normalized_remote().to_string();
        Url::parse(&remote).map_err(|e| ValidationError::InvalidRemote {
            url: config.remote.clone(),
            reason: e.to_string(),
        })?;

        let transport = HttpTransport::new(config.timeout(), events)?;
        tracing::debug!(remote = %remote, timeout = ?config.timeout(), "Client created");

        Ok(Self {
            remote,
            defaults: config.defaults(),
            transport: Arc::new(transport),
            server_info: OnceCell::new(),
        })
    }

    /// Create a client from a JSON configuration file
    pub fn from_config_file(path: &str) -> anyhow::Result<Self> {
        let config = ClientConfig::load(path)?;
        Ok(Self::new(config)?)
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    /// Time left before the server's backoff request expires, zero if none
    pub async fn backoff(&self) -> Duration {
        self.transport.backoff().await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.remote, path)
    }

    /// Send one descriptor, returning the full response
    pub async fn execute_raw(
        &self,
        request: &RequestDescriptor,
        options: &RequestOptions,
    ) -> Result<HttpResponse> {
        let opts = self.defaults.merge(options);
        let mut request = request.clone();
        request.headers = merge_headers(&opts.headers, &request.headers);

        self.transport
            .request(&self.url(&request.path), &request, opts.retry_budget())
            .await
    }

    /// Send one descriptor, returning the parsed body
    pub async fn execute(
        &self,
        request: &RequestDescriptor,
        options: &RequestOptions,
    ) -> Result<Value> {
        Ok(self.execute_raw(request, options).await?.json)
    }

    /// Server root document, fetched at most once per client
    pub async fn fetch_server_info(&self) -> Result<&ServerInfo> {
        self.server_info
            .get_or_try_init(|| async {
                let request = RequestDescriptor::get(endpoint::ROOT);
                let response = self.execute_raw(&request, &RequestOptions::new()).await?;
                let info: ServerInfo = serde_json::from_value(response.json)?;
                tracing::debug!(
                    http_api_version = ?info.http_api_version,
                    batch_max_requests = ?info.settings.batch_max_requests,
                    "Fetched server info"
                );
                Ok::<_, ClientError>(info)
            })
            .await
    }

    pub async fn fetch_server_settings(&self) -> Result<&ServerSettings> {
        Ok(&self.fetch_server_info().await?.settings)
    }

    pub async fn fetch_server_capabilities(&self) -> Result<&serde_json::Map<String, Value>> {
        Ok(&self.fetch_server_info().await?.capabilities)
    }

    pub async fn fetch_user(&self) -> Result<Option<&Value>> {
        Ok(self.fetch_server_info().await?.user.as_ref())
    }

    pub async fn fetch_http_api_version(&self) -> Result<Option<&str>> {
        Ok(self.fetch_server_info().await?.http_api_version.as_deref())
    }

    /// Queue operations in `f` and send them as chunked batch requests.
    ///
    /// Returns the sub-responses in submission order, or their aggregate
    /// when the `aggregate` option is set.
    #[tracing::instrument(skip(self, f, options))]
    pub async fn batch<F>(&self, f: F, options: &RequestOptions) -> Result<BatchResult>
    where
        F: FnOnce(&mut Batch) -> Result<()>,
    {
        let opts = self.defaults.merge(options);
        let mut batch = Batch::new(opts.clone());
        f(&mut batch)?;

        let requests = batch.into_requests();
        if requests.is_empty() {
            return Ok(BatchResult::empty(opts.is_aggregate()));
        }

        let max_requests = self.fetch_server_settings().await?.max_batch_size();
        tracing::debug!(
            requests = requests.len(),
            max_requests = ?max_requests,
            "Sending batch"
        );

        let responses = batch::send_batch(
            &self.transport,
            &self.remote,
            requests.clone(),
            &opts,
            max_requests,
        )
        .await?;

        if opts.is_aggregate() {
            Ok(BatchResult::Aggregate(aggregate(responses, requests)?))
        } else {
            Ok(BatchResult::Responses(responses))
        }
    }

    /// List any list endpoint (`path` relative to the remote)
    pub async fn list(&self, path: &str, params: &ListParams) -> Result<PageResult> {
        pagination::list(
            self.transport.clone(),
            &self.url(path),
            params,
            &self.defaults.headers,
            self.defaults.retry_budget(),
        )
        .await
    }

    pub async fn list_buckets(&self, params: &ListParams) -> Result<PageResult> {
        self.list(&endpoint::buckets(), params).await
    }

    /// Permissions the current user holds, across every resource
    pub async fn list_permissions(&self, params: &ListParams) -> Result<PageResult> {
        self.list(endpoint::PERMISSIONS, params).await
    }

    pub async fn list_collections(&self, bucket: &str, params: &ListParams) -> Result<PageResult> {
        self.list(&endpoint::collections(bucket), params).await
    }

    pub async fn list_groups(&self, bucket: &str, params: &ListParams) -> Result<PageResult> {
        self.list(&endpoint::groups(bucket), params).await
    }

    pub async fn list_records(
        &self,
        bucket: &str,
        collection: &str,
        params: &ListParams,
    ) -> Result<PageResult> {
        self.list(&endpoint::records(bucket, collection), params).await
    }

    /// Fetch one record (`bucket`/`collection` taken from the options)
    pub async fn get_record(&self, id: &str, options: &RequestOptions) -> Result<Value> {
        let opts = self.defaults.merge(options);
        let request = operations::get_record(id, &opts)?;
        self.execute(&request, &opts).await
    }

    #[tracing::instrument(skip(self, record, options))]
    pub async fn create_record(&self, record: Value, options: &RequestOptions) -> Result<Value> {
        let opts = self.defaults.merge(options);
        let request = operations::create_record(record, &opts)?;
        self.execute(&request, &opts).await
    }

    #[tracing::instrument(skip(self, record, options))]
    pub async fn update_record(&self, record: Value, options: &RequestOptions) -> Result<Value> {
        let opts = self.defaults.merge(options);
        let request = operations::update_record(record, &opts)?;
        self.execute(&request, &opts).await
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn delete_record(&self, id: &str, options: &RequestOptions) -> Result<Value> {
        let opts = self.defaults.merge(options);
        let request = operations::delete_record(id, &opts)?;
        self.execute(&request, &opts).await
    }

    /// Upload a file attached to a record
    #[tracing::instrument(skip(self, attachment, options))]
    pub async fn add_attachment(
        &self,
        record_id: &str,
        attachment: Attachment,
        options: &RequestOptions,
    ) -> Result<Value> {
        let opts = self.defaults.merge(options);
        let request = operations::add_attachment(record_id, attachment, &opts)?;
        self.execute(&request, &opts).await
    }
}
