//! Normalized request descriptions for management-API operations.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        })
    }
}

/// Request payload. File-backed variants are read by the transport at send time.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Form(String),
    Json(serde_json::Value),
    /// Raw file streamed as the request body.
    File(PathBuf),
    /// File sent as one part of a multipart form.
    Multipart { field: String, path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Form-encode `params` as the body.
    pub fn form<T: Serialize>(mut self, params: &T) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(params)
            .map_err(|e| Error::InvalidArgument(format!("cannot encode form body: {}", e)))?;
        self.body = RequestBody::Form(encoded);
        Ok(self.header("content-type", CONTENT_TYPE_FORM))
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self.header("content-type", CONTENT_TYPE_JSON)
    }

    pub fn file_body(mut self, path: PathBuf) -> Self {
        self.body = RequestBody::File(path);
        self.header("content-type", CONTENT_TYPE_OCTET_STREAM)
    }

    /// The transport sets the multipart boundary header itself.
    pub fn multipart_file(mut self, field: &str, path: PathBuf) -> Self {
        self.body = RequestBody::Multipart {
            field: field.to_string(),
            path,
        };
        self
    }

    pub fn query(mut self, pairs: &[(&str, &str)]) -> Self {
        {
            let mut query = self.url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key, value);
            }
        }
        self
    }
}

/// Append path segments to a base URL. Segments are percent-encoded.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidArgument(format!("base url {} cannot carry a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
