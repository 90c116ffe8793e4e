//! Payload handlers and the explicit registration table
//!
//! The transport collaborator delivers decoded [`Payload`] envelopes; each
//! handler binds the body to its typed request and calls the directory. The
//! table is built by one [`register_handlers`] call at startup — there is no
//! runtime handler discovery.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::info;

use locus_common::LocusError;

use crate::{
    model::{
        self, ObjectAddRequest, ObjectGetRequest, ObjectGetResponse, ObjectLockRequest,
        ObjectRemoveRequest, ObjectUnlockRequest, Payload,
    },
    registry::DirectoryRegistry,
};

/// Handler for one message type.
#[async_trait]
pub trait PayloadHandler: Send + Sync {
    /// Message type this handler accepts.
    fn message_type(&self) -> &'static str;

    async fn handle(&self, payload: &Payload) -> Result<Payload, LocusError>;
}

/// Message-type to handler table, built explicitly at startup.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn PayloadHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn PayloadHandler>) -> anyhow::Result<()> {
        let message_type = handler.message_type();
        if self.handlers.insert(message_type, handler).is_some() {
            anyhow::bail!("handler for '{message_type}' registered twice");
        }
        Ok(())
    }

    pub async fn dispatch(&self, payload: &Payload) -> Result<Payload, LocusError> {
        let handler = self
            .handlers
            .get(payload.r#type.as_str())
            .ok_or_else(|| LocusError::UnknownMessageType(payload.r#type.clone()))?;
        handler.handle(payload).await
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn bind<T: DeserializeOwned>(payload: &Payload) -> Result<T, LocusError> {
    serde_json::from_value(payload.body.clone()).map_err(|source| LocusError::MalformedPayload {
        message_type: payload.r#type.clone(),
        source,
    })
}

struct ObjectAddHandler {
    directories: Arc<DirectoryRegistry>,
}

#[async_trait]
impl PayloadHandler for ObjectAddHandler {
    fn message_type(&self) -> &'static str {
        model::OBJECT_ADD_REQUEST
    }

    async fn handle(&self, payload: &Payload) -> Result<Payload, LocusError> {
        let request: ObjectAddRequest = bind(payload)?;
        self.directories
            .directory(request.kind)
            .add(request.key, request.address)
            .await;
        Ok(Payload::ack(model::OBJECT_ADD_RESPONSE))
    }
}

struct ObjectRemoveHandler {
    directories: Arc<DirectoryRegistry>,
}

#[async_trait]
impl PayloadHandler for ObjectRemoveHandler {
    fn message_type(&self) -> &'static str {
        model::OBJECT_REMOVE_REQUEST
    }

    async fn handle(&self, payload: &Payload) -> Result<Payload, LocusError> {
        let request: ObjectRemoveRequest = bind(payload)?;
        self.directories
            .directory(request.kind)
            .remove(request.key)
            .await;
        Ok(Payload::ack(model::OBJECT_REMOVE_RESPONSE))
    }
}

struct ObjectLockHandler {
    directories: Arc<DirectoryRegistry>,
}

#[async_trait]
impl PayloadHandler for ObjectLockHandler {
    fn message_type(&self) -> &'static str {
        model::OBJECT_LOCK_REQUEST
    }

    async fn handle(&self, payload: &Payload) -> Result<Payload, LocusError> {
        let request: ObjectLockRequest = bind(payload)?;
        self.directories
            .directory(request.kind)
            .lock(request.key, request.holder, request.timeout_ms)
            .await;
        Ok(Payload::ack(model::OBJECT_LOCK_RESPONSE))
    }
}

struct ObjectUnlockHandler {
    directories: Arc<DirectoryRegistry>,
}

#[async_trait]
impl PayloadHandler for ObjectUnlockHandler {
    fn message_type(&self) -> &'static str {
        model::OBJECT_UNLOCK_REQUEST
    }

    async fn handle(&self, payload: &Payload) -> Result<Payload, LocusError> {
        let request: ObjectUnlockRequest = bind(payload)?;
        self.directories.directory(request.kind).unlock(
            request.key,
            request.expected_holder,
            request.new_address,
        );
        Ok(Payload::ack(model::OBJECT_UNLOCK_RESPONSE))
    }
}

struct ObjectGetHandler {
    directories: Arc<DirectoryRegistry>,
}

#[async_trait]
impl PayloadHandler for ObjectGetHandler {
    fn message_type(&self) -> &'static str {
        model::OBJECT_GET_REQUEST
    }

    async fn handle(&self, payload: &Payload) -> Result<Payload, LocusError> {
        let request: ObjectGetRequest = bind(payload)?;
        let address = self
            .directories
            .directory(request.kind)
            .get(request.key)
            .await
            .unwrap_or(crate::model::Address::ZERO);
        Ok(Payload::of(
            model::OBJECT_GET_RESPONSE,
            &ObjectGetResponse { address },
        ))
    }
}

/// Install every directory handler into `registry`.
pub fn register_handlers(
    registry: &mut HandlerRegistry,
    directories: Arc<DirectoryRegistry>,
) -> anyhow::Result<()> {
    registry.register(Arc::new(ObjectAddHandler {
        directories: directories.clone(),
    }))?;
    registry.register(Arc::new(ObjectRemoveHandler {
        directories: directories.clone(),
    }))?;
    registry.register(Arc::new(ObjectLockHandler {
        directories: directories.clone(),
    }))?;
    registry.register(Arc::new(ObjectUnlockHandler {
        directories: directories.clone(),
    }))?;
    registry.register(Arc::new(ObjectGetHandler { directories }))?;

    info!(handlers = registry.len(), "directory handlers registered");
    Ok(())
}
