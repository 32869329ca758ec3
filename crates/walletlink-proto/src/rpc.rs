//! JSON-RPC framing between the provider and the wallet.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProtocolError, Result};

/// JSON-RPC protocol version tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method names with special meaning to the orchestration layer.
pub mod methods {
    /// Ask the wallet to expose its accounts to the application.
    pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    /// Read the accounts already exposed to the application.
    pub const ETH_ACCOUNTS: &str = "eth_accounts";
    /// Fetch the canonical provider state snapshot.
    pub const METAMASK_GET_PROVIDER_STATE: &str = "metamask_getProviderState";
    /// Wallet notification: active chain changed.
    pub const METAMASK_CHAIN_CHANGED: &str = "metamask_chainChanged";
    /// Wallet notification: exposed accounts changed.
    pub const METAMASK_ACCOUNTS_CHANGED: &str = "metamask_accountsChanged";
    /// Wallet notification: lock state changed.
    pub const METAMASK_UNLOCK_STATE_CHANGED: &str = "metamask_unlockStateChanged";
}

/// Arguments of a provider request, as issued by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestArguments {
    /// RPC method name.
    pub method: String,
    /// Positional or named parameters.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl RequestArguments {
    /// Request with parameters.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self { method: method.into(), params }
    }

    /// Request without parameters.
    pub fn method(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }
}

/// A request as it travels to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id chosen by the provider.
    pub id: u64,
    /// RPC method name.
    pub method: String,
    /// Request parameters.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Frame request arguments under the given id.
    pub fn new(id: u64, args: RequestArguments) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.into(), id, method: args.method, params: args.params }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code (EIP-1193 / JSON-RPC).
    pub code: i64,
    /// Human readable message.
    pub message: String,
    /// Optional extra data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A response from the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Id of the request being answered.
    pub id: u64,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response.
    pub fn success(id: u64, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    /// Failed response.
    pub fn failure(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self { id, result: None, error: Some(JsonRpcError { code, message: message.into(), data: None }) }
    }

    /// Collapse into a `Result`, treating a missing result as `null`.
    pub fn into_result(self) -> std::result::Result<Value, JsonRpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// An unsolicited message pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Notification method.
    pub method: String,
    /// Notification payload.
    #[serde(default)]
    pub params: Value,
}

/// Classified provider-bound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundRpc {
    /// Answer to an earlier request.
    Response(JsonRpcResponse),
    /// Wallet-initiated notification.
    Notification(JsonRpcNotification),
}

impl InboundRpc {
    /// Classify a provider payload.
    ///
    /// Payloads carrying an `id` together with `result` or `error` are
    /// responses; payloads carrying a `method` and no id are notifications.
    pub fn from_value(value: Value) -> Result<Self> {
        let is_response = value.get("id").is_some_and(|id| !id.is_null())
            && (value.get("result").is_some() || value.get("error").is_some());

        if is_response {
            return serde_json::from_value(value)
                .map(Self::Response)
                .map_err(|e| ProtocolError::MalformedPayload(e.to_string()));
        }

        if value.get("method").is_some() {
            return serde_json::from_value(value)
                .map(Self::Notification)
                .map_err(|e| ProtocolError::MalformedPayload(e.to_string()));
        }

        Err(ProtocolError::MalformedPayload("neither response nor notification".into()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_framing() {
        let request = JsonRpcRequest::new(7, RequestArguments::new("eth_requestAccounts", json!([])));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "jsonrpc": "2.0", "id": 7, "method": "eth_requestAccounts", "params": [] })
        );

        let bare = JsonRpcRequest::new(8, RequestArguments::method("eth_chainId"));
        assert_eq!(
            serde_json::to_value(&bare).unwrap(),
            json!({ "jsonrpc": "2.0", "id": 8, "method": "eth_chainId" })
        );
    }

    #[test]
    fn classifies_responses_and_notifications() {
        let response = InboundRpc::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": ["0xabc"] })).unwrap();
        assert_eq!(response, InboundRpc::Response(JsonRpcResponse::success(1, json!(["0xabc"]))));

        let error = InboundRpc::from_value(json!({ "id": 2, "error": { "code": 4001, "message": "rejected" } }))
            .unwrap();
        let InboundRpc::Response(error) = error else { panic!("expected response") };
        assert_eq!(error.into_result().unwrap_err().code, 4001);

        let notification = InboundRpc::from_value(json!({
            "method": "metamask_chainChanged",
            "params": { "chainId": "0x1" }
        }))
        .unwrap();
        assert!(matches!(notification, InboundRpc::Notification(n) if n.method == methods::METAMASK_CHAIN_CHANGED));

        assert!(InboundRpc::from_value(json!({ "id": 3 })).is_err());
    }
}
