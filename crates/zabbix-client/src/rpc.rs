//! JSON-RPC 2.0 envelope types for the Zabbix API.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// JSON-RPC protocol version sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

// ─────────────────────────────────────────────────────────────────────────────
// Envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct Request<'a, P: Serialize> {
    /// Always "2.0".
    pub jsonrpc: &'static str,
    /// API method, e.g. `host.get`.
    pub method: &'a str,
    /// Method parameters.
    pub params: P,
    /// Request id echoed by the server.
    pub id: u64,
    /// Auth token for servers that expect it in the body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<&'a str>,
}

impl<'a, P: Serialize> Request<'a, P> {
    /// Build an unauthenticated request.
    pub fn new(method: &'a str, params: P, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id,
            auth: None,
        }
    }

    /// Attach an auth token to the request body.
    pub fn with_auth(mut self, token: &'a str) -> Self {
        self.auth = Some(token);
        self
    }
}

/// Incoming JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct Response<R> {
    /// Successful result.
    pub result: Option<R>,
    /// Error object, set when the call failed.
    #[serde(default)]
    pub error: Option<RpcError>,
    /// Echoed request id.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl<R> Response<R> {
    /// Turn the envelope into the result or an [`Error::Api`].
    pub fn into_result(self) -> Result<R> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        self.result.ok_or_else(|| Error::Api {
            code: 0,
            message: "Empty response".to_string(),
            data: "response carried neither result nor error".to_string(),
        })
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: String,
}

impl From<RpcError> for Error {
    fn from(e: RpcError) -> Self {
        Error::Api {
            code: e.code,
            message: e.message,
            data: e.data,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API version
// ─────────────────────────────────────────────────────────────────────────────

/// Zabbix API version as reported by `apiinfo.version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// `user.login` takes `username` instead of `user` from 5.4 on.
    pub fn uses_username_param(&self) -> bool {
        *self >= ApiVersion::new(5, 4, 0)
    }

    /// The token goes in an `Authorization: Bearer` header from 6.4 on.
    pub fn uses_bearer_auth(&self) -> bool {
        *self >= ApiVersion::new(6, 4, 0)
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Protocol(format!("Invalid API version: {:?}", s));

        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        // Pre-release builds report e.g. "7.0.0alpha1"
        let patch = match parts.next() {
            Some(p) => {
                let digits: String = p.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().unwrap_or(0)
            }
            None => 0,
        };

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let req = Request::new("host.get", json!({"output": "extend"}), 7);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "host.get");
        assert_eq!(value["id"], 7);
        assert!(value.get("auth").is_none());

        let req = Request::new("host.get", json!({}), 8).with_auth("abc");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["auth"], "abc");
    }

    #[test]
    fn test_response_error_maps_to_api_error() {
        let resp: Response<String> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32602, "message": "Invalid params.", "data": "No permissions."},
            "id": 1
        }))
        .unwrap();

        match resp.into_result() {
            Err(Error::Api { code, data, .. }) => {
                assert_eq!(code, -32602);
                assert_eq!(data, "No permissions.");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_response_result() {
        let resp: Response<String> =
            serde_json::from_value(json!({"jsonrpc": "2.0", "result": "6.0.21", "id": 1}))
                .unwrap();
        assert_eq!(resp.into_result().unwrap(), "6.0.21");
    }

    #[test]
    fn test_parse_api_version() {
        assert_eq!(
            "6.0.21".parse::<ApiVersion>().unwrap(),
            ApiVersion::new(6, 0, 21)
        );
        assert_eq!("5.4".parse::<ApiVersion>().unwrap(), ApiVersion::new(5, 4, 0));
        assert_eq!(
            "7.0.0alpha1".parse::<ApiVersion>().unwrap(),
            ApiVersion::new(7, 0, 0)
        );
        assert!(matches!(
            "garbage".parse::<ApiVersion>(),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_version_gates() {
        let v52 = ApiVersion::new(5, 2, 7);
        assert!(!v52.uses_username_param());
        assert!(!v52.uses_bearer_auth());

        let v60 = ApiVersion::new(6, 0, 0);
        assert!(v60.uses_username_param());
        assert!(!v60.uses_bearer_auth());

        let v70 = ApiVersion::new(7, 0, 3);
        assert!(v70.uses_username_param());
        assert!(v70.uses_bearer_auth());
    }
}
