//! Raw HTTP transport.
//!
//! The engine only talks to the platform through [`Transport`], so tests can
//! script responses and observe request ordering.

use async_trait::async_trait;
use reqwest::Client;

use super::request::{ApiRequest, Method, RequestBody};
use super::response::ApiResponse;
use crate::error::Result;

/// Sends one request and returns the raw response, whatever its status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("proxyctl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn to_reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    async fn attach_body(
        builder: reqwest::RequestBuilder,
        body: RequestBody,
    ) -> Result<reqwest::RequestBuilder> {
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Form(encoded) => builder.body(encoded),
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                builder.body(reqwest::Body::from(file))
            }
            RequestBody::Multipart { field, path } => {
                let bytes = tokio::fs::read(&path).await?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "bundle.zip".to_string());
                let part = reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("application/zip")?;
                builder.multipart(reqwest::multipart::Form::new().part(field, part))
            }
        };
        Ok(builder)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        let builder = Self::attach_body(builder, request.body).await?;

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}
