//! Simulated wallet answering provider requests.

use parking_lot::Mutex;
use serde_json::{Value, json};
use walletlink_proto::{JsonRpcRequest, JsonRpcResponse, methods};

/// Error code answered to methods configured to fail.
pub const REJECTED_CODE: i64 = 4001;

/// Wallet that answers every request it receives over a [`crate::SimChannel`].
#[derive(Debug)]
pub struct SimWallet {
    accounts: Vec<String>,
    chain_id: String,
    network_version: Option<String>,
    rejected: Vec<String>,
    received: Mutex<Vec<String>>,
}

impl SimWallet {
    /// Wallet exposing `accounts` on `chain_id`.
    pub fn new(accounts: &[&str], chain_id: &str) -> Self {
        Self {
            accounts: accounts.iter().map(|a| (*a).to_owned()).collect(),
            chain_id: chain_id.to_owned(),
            network_version: Some("1".to_owned()),
            rejected: Vec::new(),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Omit the network version from state snapshots.
    #[must_use]
    pub fn without_network_version(mut self) -> Self {
        self.network_version = None;
        self
    }

    /// Answer `method` with a user rejection.
    #[must_use]
    pub fn rejecting(mut self, method: &str) -> Self {
        self.rejected.push(method.to_owned());
        self
    }

    /// Exposed accounts.
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Active chain id.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Methods received so far, in order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// How many times `method` was received.
    pub fn count(&self, method: &str) -> usize {
        self.received.lock().iter().filter(|m| m.as_str() == method).count()
    }

    /// Answer one request payload. Payloads that are not requests get no
    /// answer.
    pub fn respond(&self, payload: &Value) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = serde_json::from_value(payload.clone()).ok()?;
        self.received.lock().push(request.method.clone());

        if self.rejected.contains(&request.method) {
            return Some(JsonRpcResponse::failure(request.id, REJECTED_CODE, "User rejected the request."));
        }

        let result = match request.method.as_str() {
            methods::ETH_REQUEST_ACCOUNTS | methods::ETH_ACCOUNTS => json!(self.accounts),
            methods::METAMASK_GET_PROVIDER_STATE => {
                let mut snapshot = json!({
                    "accounts": self.accounts,
                    "chainId": self.chain_id,
                    "isUnlocked": true,
                });
                if let (Some(version), Some(object)) = (&self.network_version, snapshot.as_object_mut()) {
                    object.insert("networkVersion".into(), json!(version));
                }
                snapshot
            },
            "eth_chainId" => json!(self.chain_id),
            _ => Value::Null,
        };

        Some(JsonRpcResponse::success(request.id, result))
    }
}

impl Default for SimWallet {
    fn default() -> Self {
        Self::new(&["0x3c7a5af0b6ddf1fd6c4eb1b8a1e5a7a9e3d2f7c1"], "0x1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_state_requests() {
        let wallet = SimWallet::new(&["0xabc"], "0x89");
        let response = wallet
            .respond(&json!({ "jsonrpc": "2.0", "id": 4, "method": methods::METAMASK_GET_PROVIDER_STATE }))
            .unwrap();

        assert_eq!(response.id, 4);
        assert_eq!(
            response.into_result().unwrap(),
            json!({ "accounts": ["0xabc"], "chainId": "0x89", "isUnlocked": true, "networkVersion": "1" })
        );
        assert_eq!(wallet.count(methods::METAMASK_GET_PROVIDER_STATE), 1);
    }

    #[test]
    fn ignores_non_requests_and_rejects_on_demand() {
        let wallet = SimWallet::default().rejecting("personal_sign");
        assert!(wallet.respond(&json!([1, 2])).is_none());

        let response = wallet.respond(&json!({ "jsonrpc": "2.0", "id": 1, "method": "personal_sign" })).unwrap();
        assert_eq!(response.into_result().unwrap_err().code, REJECTED_CODE);
    }
}
