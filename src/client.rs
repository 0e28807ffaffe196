use crate::config::ClientConfig;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode};
use thiserror::Error;
use tracing::debug;

const EMPTY_OBJECT: &[u8] = b"{}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    fn as_reqwest(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// One request against the API. Built per invocation and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCall {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl EndpointCall {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Option<Vec<u8>>) -> Self {
        self.body = body;
        self
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("building HTTP client")]
    Build(#[source] reqwest::Error),
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: String,
    http: Client,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(HeaderValue::from_static(concat!(
                "cio/",
                env!("CARGO_PKG_VERSION")
            )))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            http,
        })
    }

    pub fn get(&self, path: &str, query: &[(String, String)]) -> Result<Vec<u8>, ClientError> {
        self.request(HttpMethod::Get, path, query, None)
    }

    pub fn delete(&self, path: &str, query: &[(String, String)]) -> Result<Vec<u8>, ClientError> {
        self.request(HttpMethod::Delete, path, query, None)
    }

    pub fn post(&self, path: &str, body: Option<&[u8]>) -> Result<Vec<u8>, ClientError> {
        self.request(HttpMethod::Post, path, &[], body)
    }

    pub fn put(&self, path: &str, body: Option<&[u8]>) -> Result<Vec<u8>, ClientError> {
        self.request(HttpMethod::Put, path, &[], body)
    }

    /// GET and DELETE never carry a body; POST and PUT never carry a query.
    pub fn execute(&self, call: &EndpointCall) -> Result<Vec<u8>, ClientError> {
        match call.method {
            HttpMethod::Get => self.get(&call.path, &call.query),
            HttpMethod::Delete => self.delete(&call.path, &call.query),
            HttpMethod::Post => self.post(&call.path, call.body.as_deref()),
            HttpMethod::Put => self.put(&call.path, call.body.as_deref()),
        }
    }

    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method.as_reqwest(), %url, "sending request");

        let mut request = self
            .http
            .request(method.as_reqwest(), &url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let transport = |source| ClientError::Transport {
            url: url.clone(),
            source,
        };
        let response = request.send().map_err(transport)?;
        let status = response.status();
        let data = response.bytes().map_err(transport)?;
        debug!(status = status.as_u16(), bytes = data.len(), "received response");

        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: error_message(status, &data),
            });
        }

        if data.is_empty() {
            return Ok(EMPTY_OBJECT.to_vec());
        }
        Ok(data.to_vec())
    }
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}
