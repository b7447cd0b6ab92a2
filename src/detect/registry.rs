use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::VerifyError;

use super::backend::{DetectionCapability, DetectorBackend};

/// A backend shared between independent verification runs.
pub type SharedBackend = Arc<Mutex<dyn DetectorBackend>>;

/// Thread-safe registry of detector backends.
///
/// Backends are wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
/// Runs on different videos may share a backend; each run locks it for its duration.
pub struct BackendRegistry {
    backends: HashMap<String, SharedBackend>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<(), VerifyError> {
        if !self.backends.contains_key(name) {
            return Err(VerifyError::InvalidConfiguration(format!(
                "backend '{}' not registered",
                name
            )));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<SharedBackend> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<SharedBackend> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends, sorted by name.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Select a backend by name and check that it can do object detection.
    pub fn select(&self, name: &str) -> Result<SharedBackend, VerifyError> {
        let backend = self.get(name).ok_or_else(|| {
            VerifyError::InvalidConfiguration(format!(
                "backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            ))
        })?;
        let supports = {
            let guard = backend
                .lock()
                .map_err(|_| VerifyError::config("backend lock poisoned"))?;
            guard.supports(DetectionCapability::ObjectDetection)
        };
        if !supports {
            return Err(VerifyError::InvalidConfiguration(format!(
                "backend '{}' does not support object detection",
                name
            )));
        }
        Ok(backend)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Detection, StubBackend};

    /// Registers fine but cannot produce boxes.
    struct Captioner;

    impl DetectorBackend for Captioner {
        fn name(&self) -> &'static str {
            "captioner"
        }

        fn supports(&self, _capability: DetectionCapability) -> bool {
            false
        }

        fn detect(&mut self, _pixels: &[u8], _w: u32, _h: u32) -> anyhow::Result<Vec<Detection>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn first_registered_backend_is_default() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        registry.register(Captioner);
        let default = registry.default_backend().unwrap();
        assert_eq!(default.lock().unwrap().name(), "stub");
        assert_eq!(registry.list(), vec!["captioner", "stub"]);
    }

    #[test]
    fn select_rejects_unknown_and_incapable_backends() {
        let mut registry = BackendRegistry::new();
        registry.register(Captioner);
        assert!(matches!(
            registry.select("tract"),
            Err(VerifyError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            registry.select("captioner"),
            Err(VerifyError::InvalidConfiguration(_))
        ));
        assert!(registry.set_default("missing").is_err());
    }
}
