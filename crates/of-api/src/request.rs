use core::fmt;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, path: &str, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            body,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path, None)
    }

    pub fn post(path: &str, body: Value) -> Self {
        Self::new(Method::Post, path, Some(body))
    }

    pub fn put(path: &str, body: Value) -> Self {
        Self::new(Method::Put, path, Some(body))
    }

    pub fn delete(path: &str, body: Value) -> Self {
        Self::new(Method::Delete, path, Some(body))
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Path plus query string, in insertion order (`/flows/?project_id=3`).
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

/// Multipart upload: one file part plus plain text fields.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadForm {
    pub file_field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub fields: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_keeps_query_order() {
        let req = ApiRequest::get("/histograms/")
            .with_query("flow_id", 5)
            .with_query("column_name", "temp");
        assert_eq!(req.target(), "/histograms/?flow_id=5&column_name=temp");
        assert_eq!(req.method, Method::Get);
        assert!(req.body.is_none());
    }

    #[test]
    fn body_methods_carry_json() {
        let req = ApiRequest::delete("/flows/", json!({"flow_id": 2}));
        assert_eq!(req.target(), "/flows/");
        assert_eq!(req.body, Some(json!({"flow_id": 2})));
        assert_eq!(req.method.to_string(), "DELETE");
    }
}
