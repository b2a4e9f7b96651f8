//! Discriminator-keyed operation registry.
//!
//! Operations travel as [`PortableOp`] objects tagged with a `type` string.
//! The registry maps each tag to a factory that rebuilds the concrete
//! operation, so new operation types are added by registration alone.

use crate::error::{Error, Result};
use crate::operation::{BoxedOperation, Operation, PortableOp};
use crate::versioned::{PortableVersioned, VersionedOperation};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;

/// Rebuilds an operation from its portable form.
///
/// Factories receive the registry itself so composite operations can decode
/// their children.
pub type Factory<D> = fn(&Registry<D>, &PortableOp) -> Result<BoxedOperation<D>>;

/// Factory for any operation whose wire body is its serde representation.
pub fn decode_as<T, D>(_registry: &Registry<D>, portable: &PortableOp) -> Result<BoxedOperation<D>>
where
    T: Operation<D> + DeserializeOwned + 'static,
{
    Ok(Box::new(portable.decode::<T>()?))
}

/// Maps operation discriminators to factories.
pub struct Registry<D> {
    factories: HashMap<&'static str, Factory<D>>,
}

impl<D> Registry<D> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory, returning the one it replaced, if any.
    pub fn register(&mut self, kind: &'static str, factory: Factory<D>) -> Option<Factory<D>> {
        self.factories.insert(kind, factory)
    }

    /// Builder variant of [`register`](Self::register).
    pub fn with(mut self, kind: &'static str, factory: Factory<D>) -> Self {
        self.register(kind, factory);
        self
    }

    /// Whether a discriminator is known.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// All registered discriminators, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Rebuild an operation from its portable form.
    pub fn decode(&self, portable: &PortableOp) -> Result<BoxedOperation<D>> {
        let factory = self
            .factories
            .get(portable.kind.as_str())
            .ok_or_else(|| Error::UnknownOperation(portable.kind.clone()))?;
        factory(self, portable)
    }

    /// Rebuild an operation from a JSON string.
    pub fn decode_json(&self, json: &str) -> Result<BoxedOperation<D>> {
        self.decode(&PortableOp::from_json(json)?)
    }

    /// Rebuild a versioned operation received from a collaborator.
    pub fn decode_versioned(&self, portable: &PortableVersioned) -> Result<VersionedOperation<D>> {
        let operation = self.decode(&portable.operation)?;
        let mut vop = VersionedOperation::new(
            operation,
            portable.version_id,
            portable.author.clone(),
            portable.local,
        );
        vop.set_reverted(portable.reverted);
        Ok(vop)
    }
}

impl<D> Default for Registry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for Registry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
