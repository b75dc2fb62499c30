//! Named object registry with name reservation.
//!
//! A run reserves its output name before any work starts. The returned
//! [`Promise`] either registers the finished object or, when dropped,
//! releases the name again, so a failed or cancelled run leaves nothing
//! behind.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use pcbmill_core::{FailKind, FailResult, GeneratedObject};
use tracing::debug;

/// A registered object and whether it should be plotted
#[derive(Debug, Clone)]
pub struct RegisteredObject {
    pub object: GeneratedObject,
    pub plot: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    objects: HashMap<String, RegisteredObject>,
    reserved: HashSet<String>,
}

impl RegistryState {
    fn taken(&self, name: &str) -> bool {
        self.objects.contains_key(name) || self.reserved.contains(name)
    }
}

#[derive(Debug, Default)]
pub struct ObjectRegistry {
    state: Mutex<RegistryState>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name` for an in-flight run
    pub fn reserve(self: &Arc<Self>, name: &str) -> FailResult<Promise> {
        let mut state = self.state.lock();
        if state.taken(name) {
            return Err(FailKind::NameReserved(name.to_string()));
        }
        state.reserved.insert(name.to_string());
        debug!("Reserved object name '{}'", name);
        Ok(Promise {
            registry: Arc::clone(self),
            name: name.to_string(),
            fulfilled: false,
        })
    }

    /// Register an object directly under its own name
    pub fn insert(&self, object: GeneratedObject, plot: bool) -> FailResult<()> {
        let mut state = self.state.lock();
        let name = object.name().to_string();
        if state.taken(&name) {
            return Err(FailKind::NameReserved(name));
        }
        state.objects.insert(name, RegisteredObject { object, plot });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<RegisteredObject> {
        self.state.lock().objects.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().objects.contains_key(name)
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.state.lock().reserved.contains(name)
    }

    pub fn remove(&self, name: &str) -> Option<RegisteredObject> {
        self.state.lock().objects.remove(name)
    }

    pub fn len(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().objects.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Reservation of an output name
#[derive(Debug)]
pub struct Promise {
    registry: Arc<ObjectRegistry>,
    name: String,
    fulfilled: bool,
}

impl Promise {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `object` under the reserved name
    pub fn fulfill(mut self, object: GeneratedObject, plot: bool) {
        let mut state = self.registry.state.lock();
        state.reserved.remove(&self.name);
        state
            .objects
            .insert(self.name.clone(), RegisteredObject { object, plot });
        self.fulfilled = true;
    }
}

impl Drop for Promise {
    fn drop(&mut self) {
        if !self.fulfilled {
            self.registry.state.lock().reserved.remove(&self.name);
            debug!("Released object name '{}'", self.name);
        }
    }
}
