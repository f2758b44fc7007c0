//! Request execution.

use std::time::Duration;

use reqwest::blocking::{Client, Response, multipart};
use serde_json::Value;
use tracing::debug;

use crate::request::{ApiRequest, Method, UploadForm};
use crate::{ApiError, ApiResult};

/// Executes requests against the backend and returns the decoded JSON body
/// (`Value::Null` for an empty body). Non-2xx responses are errors.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &ApiRequest) -> ApiResult<Value>;

    fn upload(&self, path: &str, form: UploadForm) -> ApiResult<Value>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ApiError::Transport {
            target: base_url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ApiRequest) -> ApiResult<Value> {
        let target = request.target();
        debug!(method = %request.method, %target, "api request");

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .client
            .request(method, self.url(&request.path))
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|e| ApiError::Transport {
            target: target.clone(),
            message: e.to_string(),
        })?;
        read_response(&target, response)
    }

    fn upload(&self, path: &str, form: UploadForm) -> ApiResult<Value> {
        debug!(%path, file = %form.file_name, bytes = form.bytes.len(), "api upload");

        let part = multipart::Part::bytes(form.bytes)
            .file_name(form.file_name)
            .mime_str("text/csv")
            .map_err(|e| ApiError::Transport {
                target: path.to_string(),
                message: e.to_string(),
            })?;
        let mut multipart_form = multipart::Form::new().part(form.file_field, part);
        for (key, value) in form.fields {
            multipart_form = multipart_form.text(key, value);
        }

        let response = self
            .client
            .post(self.url(path))
            .multipart(multipart_form)
            .send()
            .map_err(|e| ApiError::Transport {
                target: path.to_string(),
                message: e.to_string(),
            })?;
        read_response(path, response)
    }
}

fn read_response(target: &str, response: Response) -> ApiResult<Value> {
    let status = response.status();
    let text = response.text().map_err(|e| ApiError::Transport {
        target: target.to_string(),
        message: e.to_string(),
    })?;

    if !status.is_success() {
        return Err(ApiError::Status {
            target: target.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Decode {
        target: target.to_string(),
        message: e.to_string(),
    })
}
