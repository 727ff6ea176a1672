//! Naming registry seam: the remote service holding public names and caller-scoped nicknames.

use crate::keys::KeyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authenticated caller. Nickname queries and mutations need one; anonymous callers are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity(pub String);

impl CallerIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public neuron name row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNeuronName {
    pub collective_id: String,
    pub fingerprint_hex: String,
    pub name: String,
    #[serde(default)]
    pub verified: bool,
}

/// Caller-scoped neuron nickname row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNeuronNickname {
    pub collective_id: String,
    pub fingerprint_hex: String,
    pub nickname: String,
}

/// Public principal name row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPrincipalName {
    pub principal: String,
    pub name: String,
    #[serde(default)]
    pub verified: bool,
}

/// Caller-scoped principal nickname row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPrincipalNickname {
    pub principal: String,
    pub nickname: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry unreachable: {0}")]
    Unreachable(String),
    #[error("registry rejected call: {0}")]
    Rejected(String),
    #[error("registry response decode: {0}")]
    Decode(String),
    #[error("caller identity required")]
    Anonymous,
    #[error(transparent)]
    InvalidKey(#[from] KeyError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Remote naming registry. Queries return every row the registry holds.
#[async_trait]
pub trait NamingRegistry: Send + Sync {
    async fn neuron_names(&self) -> RegistryResult<Vec<RawNeuronName>>;

    async fn neuron_nicknames(&self, caller: &CallerIdentity) -> RegistryResult<Vec<RawNeuronNickname>>;

    async fn principal_names(&self) -> RegistryResult<Vec<RawPrincipalName>>;

    async fn principal_nicknames(
        &self,
        caller: &CallerIdentity,
    ) -> RegistryResult<Vec<RawPrincipalNickname>>;

    async fn set_neuron_name(
        &self,
        caller: &CallerIdentity,
        collective_id: &str,
        fingerprint_hex: &str,
        name: &str,
    ) -> RegistryResult<()>;

    async fn set_neuron_nickname(
        &self,
        caller: &CallerIdentity,
        collective_id: &str,
        fingerprint_hex: &str,
        nickname: &str,
    ) -> RegistryResult<()>;

    async fn set_principal_name(&self, caller: &CallerIdentity, principal: &str, name: &str) -> RegistryResult<()>;

    async fn set_principal_nickname(
        &self,
        caller: &CallerIdentity,
        principal: &str,
        nickname: &str,
    ) -> RegistryResult<()>;
}

#[cfg(feature = "http")]
pub use http::HttpNamingRegistry;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use serde::de::DeserializeOwned;
    use std::time::Duration;

    #[derive(Serialize)]
    struct SetNeuronBody<'a> {
        caller: &'a str,
        collective_id: &'a str,
        fingerprint_hex: &'a str,
        value: &'a str,
    }

    #[derive(Serialize)]
    struct SetPrincipalBody<'a> {
        caller: &'a str,
        principal: &'a str,
        value: &'a str,
    }

    /// JSON-over-HTTP registry client.
    ///
    /// | Method | Path |
    /// |--------|------|
    /// | GET | `/neurons/names` |
    /// | GET | `/neurons/nicknames?caller=..` |
    /// | GET | `/principals/names` |
    /// | GET | `/principals/nicknames?caller=..` |
    /// | POST | same paths, for the setters |
    pub struct HttpNamingRegistry {
        base_url: String,
        client: reqwest::Client,
    }

    impl HttpNamingRegistry {
        pub fn new(base_url: &str, timeout: Duration) -> Self {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new());
            Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            }
        }

        async fn get<T: DeserializeOwned>(&self, path: &str, caller: Option<&CallerIdentity>) -> RegistryResult<T> {
            let url = format!("{}{}", self.base_url, path);
            let mut req = self.client.get(&url);
            if let Some(c) = caller {
                req = req.query(&[("caller", c.as_str())]);
            }
            let res = req.send().await.map_err(|e| RegistryError::Unreachable(e.to_string()))?;
            let status = res.status();
            if !status.is_success() {
                let text = res.text().await.unwrap_or_default();
                return Err(RegistryError::Rejected(format!("{} {}: {}", status, path, text)));
            }
            res.json::<T>().await.map_err(|e| RegistryError::Decode(e.to_string()))
        }

        async fn post<B: Serialize>(&self, path: &str, body: &B) -> RegistryResult<()> {
            let url = format!("{}{}", self.base_url, path);
            let res = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| RegistryError::Unreachable(e.to_string()))?;
            let status = res.status();
            if !status.is_success() {
                let text = res.text().await.unwrap_or_default();
                return Err(RegistryError::Rejected(format!("{} {}: {}", status, path, text)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl NamingRegistry for HttpNamingRegistry {
        async fn neuron_names(&self) -> RegistryResult<Vec<RawNeuronName>> {
            self.get("/neurons/names", None).await
        }

        async fn neuron_nicknames(&self, caller: &CallerIdentity) -> RegistryResult<Vec<RawNeuronNickname>> {
            self.get("/neurons/nicknames", Some(caller)).await
        }

        async fn principal_names(&self) -> RegistryResult<Vec<RawPrincipalName>> {
            self.get("/principals/names", None).await
        }

        async fn principal_nicknames(
            &self,
            caller: &CallerIdentity,
        ) -> RegistryResult<Vec<RawPrincipalNickname>> {
            self.get("/principals/nicknames", Some(caller)).await
        }

        async fn set_neuron_name(
            &self,
            caller: &CallerIdentity,
            collective_id: &str,
            fingerprint_hex: &str,
            name: &str,
        ) -> RegistryResult<()> {
            let body = SetNeuronBody {
                caller: caller.as_str(),
                collective_id,
                fingerprint_hex,
                value: name,
            };
            self.post("/neurons/names", &body).await
        }

        async fn set_neuron_nickname(
            &self,
            caller: &CallerIdentity,
            collective_id: &str,
            fingerprint_hex: &str,
            nickname: &str,
        ) -> RegistryResult<()> {
            let body = SetNeuronBody {
                caller: caller.as_str(),
                collective_id,
                fingerprint_hex,
                value: nickname,
            };
            self.post("/neurons/nicknames", &body).await
        }

        async fn set_principal_name(&self, caller: &CallerIdentity, principal: &str, name: &str) -> RegistryResult<()> {
            let body = SetPrincipalBody {
                caller: caller.as_str(),
                principal,
                value: name,
            };
            self.post("/principals/names", &body).await
        }

        async fn set_principal_nickname(
            &self,
            caller: &CallerIdentity,
            principal: &str,
            nickname: &str,
        ) -> RegistryResult<()> {
            let body = SetPrincipalBody {
                caller: caller.as_str(),
                principal,
                value: nickname,
            };
            self.post("/principals/nicknames", &body).await
        }
    }
}
