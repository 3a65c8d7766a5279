use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::error::ValidationError;

/// A remote node able to run its own worker pool on command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlaveNode {
    pub address: String,
}

impl SlaveNode {
    /// Builds a node from `host:port` or a full `http(s)://` base URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the address is empty.
    pub fn new(address: &str) -> Result<Self, ValidationError> {
        let address = address.trim().trim_end_matches('/');
        if address.is_empty() {
            return Err(ValidationError::SlaveAddressEmpty);
        }
        Ok(Self {
            address: address.to_owned(),
        })
    }

    /// URL of `path` on this node's control server.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if self.address.starts_with("http://") || self.address.starts_with("https://") {
            format!("{}{}", self.address, path)
        } else {
            format!("http://{}{}", self.address, path)
        }
    }
}

/// Registered slave nodes, in registration order. Cloning shares the set.
#[derive(Debug, Clone, Default)]
pub struct SlaveRegistry {
    nodes: Arc<RwLock<Vec<SlaveNode>>>,
}

impl SlaveRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a registry from configured addresses.
    ///
    /// # Errors
    ///
    /// Returns an error when any address is empty.
    pub fn from_addresses<S: AsRef<str>>(addresses: &[S]) -> Result<Self, ValidationError> {
        let registry = Self::new();
        for address in addresses {
            registry.register(address.as_ref())?;
        }
        Ok(registry)
    }

    /// Adds a node. Returns `false` when it was already registered.
    ///
    /// # Errors
    ///
    /// Returns an error when the address is empty.
    pub fn register(&self, address: &str) -> Result<bool, ValidationError> {
        let node = SlaveNode::new(address)?;
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if nodes.contains(&node) {
            return Ok(false);
        }
        nodes.push(node);
        Ok(true)
    }

    /// Removes a node. Returns `false` when it was not registered.
    pub fn deregister(&self, address: &str) -> bool {
        let Ok(node) = SlaveNode::new(address) else {
            return false;
        };
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let before = nodes.len();
        nodes.retain(|existing| existing != &node);
        nodes.len() != before
    }

    #[must_use]
    pub fn nodes(&self) -> Vec<SlaveNode> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
