//! In-memory transport with canned responses.
//!
//! Responses are keyed by `"METHOD /path?query"` (query in the order the
//! client adds it). Each key holds a queue; the last queued response is
//! sticky, so a route scripted once answers every call. Unscripted routes
//! answer `404`. Every request is recorded for later inspection.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::request::{ApiRequest, Method, UploadForm};
use crate::transport::Transport;
use crate::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub target: String,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<ApiResult<Value>>>>,
    log: Mutex<Vec<RecordedRequest>>,
}

fn route_key(method: Method, target: &str) -> String {
    format!("{method} {target}")
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful JSON response.
    pub fn respond(&self, method: Method, target: &str, body: Value) -> &Self {
        self.push(method, target, Ok(body))
    }

    /// Queue a non-2xx response.
    pub fn fail(&self, method: Method, target: &str, status: u16) -> &Self {
        let err = ApiError::Status {
            target: target.to_string(),
            status,
            body: json!({"error": "scripted failure"}).to_string(),
        };
        self.push(method, target, Err(err))
    }

    fn push(&self, method: Method, target: &str, response: ApiResult<Value>) -> &Self {
        self.routes
            .lock()
            .entry(route_key(method, target))
            .or_default()
            .push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().clone()
    }

    /// Requests whose target starts with `prefix`.
    pub fn requests_to(&self, method: Method, prefix: &str) -> Vec<RecordedRequest> {
        self.log
            .lock()
            .iter()
            .filter(|r| r.method == method && r.target.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn answer(&self, method: Method, target: &str, body: Option<Value>) -> ApiResult<Value> {
        self.log.lock().push(RecordedRequest {
            method,
            target: target.to_string(),
            body,
        });

        let mut routes = self.routes.lock();
        let Some(queue) = routes.get_mut(&route_key(method, target)) else {
            return Err(ApiError::Status {
                target: target.to_string(),
                status: 404,
                body: "no scripted response".to_string(),
            });
        };
        if queue.len() > 1 {
            if let Some(next) = queue.pop_front() {
                return next;
            }
        }
        queue.front().cloned().unwrap_or(Ok(Value::Null))
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &ApiRequest) -> ApiResult<Value> {
        self.answer(request.method, &request.target(), request.body.clone())
    }

    fn upload(&self, path: &str, form: UploadForm) -> ApiResult<Value> {
        let mut fields: serde_json::Map<String, Value> = form
            .fields
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        fields.insert(form.file_field, Value::String(form.file_name));
        self.answer(Method::Post, path, Some(Value::Object(fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_response_is_sticky() {
        let transport = ScriptedTransport::new();
        transport
            .respond(Method::Get, "/p", json!(1))
            .respond(Method::Get, "/p", json!(2));

        let req = ApiRequest::get("/p");
        assert_eq!(transport.execute(&req), Ok(json!(1)));
        assert_eq!(transport.execute(&req), Ok(json!(2)));
        assert_eq!(transport.execute(&req), Ok(json!(2)));
        assert_eq!(transport.requests().len(), 3);
    }

    #[test]
    fn unscripted_route_is_not_found() {
        let transport = ScriptedTransport::new();
        let err = transport.execute(&ApiRequest::get("/missing")).unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
    }

    #[test]
    fn upload_records_fields() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Post, "/csvs/", json!({"csv_id": 1}));
        let form = UploadForm {
            file_field: "csv_file".to_string(),
            file_name: "a.csv".to_string(),
            bytes: b"x,y\n1,2\n".to_vec(),
            fields: vec![("writer".to_string(), "me".to_string())],
        };
        transport.upload("/csvs/", form).unwrap();
        let recorded = transport.requests_to(Method::Post, "/csvs/");
        assert_eq!(
            recorded[0].body,
            Some(json!({"writer": "me", "csv_file": "a.csv"}))
        );
    }
}
