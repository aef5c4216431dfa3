//! Client serialization chain.
//!
//! Transactions that survive the consent round trip store a compact form of
//! the client. Serializers and deserializers are tried in registration order;
//! the first one that matches wins.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::guard::guard;
use crate::models::OAuth2Error;

/// Result of a single chain link.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome<T> {
    /// The link handled the input.
    Matched(T),
    /// The link does not apply; try the next one.
    Skip,
    /// Abort the chain.
    Failed(OAuth2Error),
}

/// Turns a client entity into its storable form.
#[async_trait]
pub trait ClientSerializer: Send + Sync {
    async fn serialize(&self, client: &Value) -> ChainOutcome<Value>;
}

/// Turns a stored form back into a client.
///
/// `Matched(None)` means the client was found but has been deauthorized.
#[async_trait]
pub trait ClientDeserializer: Send + Sync {
    async fn deserialize(&self, stored: &Value) -> ChainOutcome<Option<Value>>;
}

#[async_trait]
impl<F> ClientSerializer for F
where
    F: Fn(&Value) -> ChainOutcome<Value> + Send + Sync,
{
    async fn serialize(&self, client: &Value) -> ChainOutcome<Value> {
        self(client)
    }
}

#[async_trait]
impl<F> ClientDeserializer for F
where
    F: Fn(&Value) -> ChainOutcome<Option<Value>> + Send + Sync,
{
    async fn deserialize(&self, stored: &Value) -> ChainOutcome<Option<Value>> {
        self(stored)
    }
}

#[derive(Clone, Default)]
pub struct ClientSerialization {
    serializers: Vec<Arc<dyn ClientSerializer>>,
    deserializers: Vec<Arc<dyn ClientDeserializer>>,
}

impl ClientSerialization {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_serializer(&mut self, serializer: impl ClientSerializer + 'static) {
        self.serializers.push(Arc::new(serializer));
    }

    pub fn add_deserializer(&mut self, deserializer: impl ClientDeserializer + 'static) {
        self.deserializers.push(Arc::new(deserializer));
    }

    pub async fn serialize(&self, client: &Value) -> Result<Value, OAuth2Error> {
        for (index, link) in self.serializers.iter().enumerate() {
            let outcome = guard(async { Ok(link.serialize(client).await) }).await?;
            match outcome {
                ChainOutcome::Matched(value) if is_present(&value) => return Ok(value),
                ChainOutcome::Matched(_) | ChainOutcome::Skip => {
                    tracing::debug!(link = index, "client serializer skipped");
                }
                ChainOutcome::Failed(err) => return Err(err),
            }
        }
        Err(OAuth2Error::server(
            "Failed to serialize client. Register serialization function using serialize_client().",
        ))
    }

    /// `Ok(None)` when the client has been deauthorized.
    pub async fn deserialize(&self, stored: &Value) -> Result<Option<Value>, OAuth2Error> {
        for (index, link) in self.deserializers.iter().enumerate() {
            let outcome = guard(async { Ok(link.deserialize(stored).await) }).await?;
            match outcome {
                ChainOutcome::Matched(Some(value)) if is_present(&value) => return Ok(Some(value)),
                ChainOutcome::Matched(_) => {
                    tracing::warn!(link = index, "client deauthorized during deserialization");
                    return Ok(None);
                }
                ChainOutcome::Skip => {
                    tracing::debug!(link = index, "client deserializer skipped");
                }
                ChainOutcome::Failed(err) => return Err(err),
            }
        }
        Err(OAuth2Error::server(
            "Failed to deserialize client. Register deserialization function using deserialize_client().",
        ))
    }
}

fn is_present(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}
