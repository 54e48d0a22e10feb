//! Host-facing resource reconcilers.
//!
//! A host keeps each managed object as a [`ResourceData`]: an optional id plus
//! a bag of JSON attributes. Reconcilers translate the host's create, read,
//! update, delete and import intents into API calls and write the outcome
//! back onto that state.

mod teammate;

pub use teammate::{TeammateConfig, TeammateResource};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{SendGridError, SendGridResult};
use crate::resilience::OperationContext;

/// Host-side state of one managed resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Remote identifier. `None` while the resource does not exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Resource attributes.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ResourceData {
    /// Creates empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates state holding only an id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            attributes: Map::new(),
        }
    }

    /// Sets an attribute, builder style.
    #[must_use]
    pub fn attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Returns the id, or an empty string when unset.
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Records the remote identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Marks the resource as gone.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// Reads a typed attribute. Absent and `null` attributes read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> SendGridResult<Option<T>> {
        match self.attributes.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                SendGridError::configuration(format!("invalid attribute `{key}`: {e}"))
            }),
        }
    }

    /// Writes a typed attribute.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SendGridResult<()> {
        let value = serde_json::to_value(value).map_err(|e| {
            SendGridError::configuration(format!("invalid attribute `{key}`: {e}"))
        })?;
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }
}

/// Lifecycle of a resource type as driven by the host.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Creates the remote object described by `data` and records its id.
    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData) -> SendGridResult<()>;

    /// Refreshes `data` from the remote object.
    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData) -> SendGridResult<()>;

    /// Applies changed attributes to the remote object.
    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData) -> SendGridResult<()>;

    /// Deletes the remote object and clears the id.
    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData) -> SendGridResult<()>;

    /// Builds state for an existing remote object from its id.
    fn import(&self, id: &str) -> ResourceData {
        ResourceData::with_id(id)
    }
}
