// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Registry of loadable HAL modules, keyed by module identifier.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use hwbridge_core::error::{BridgeError, Result};

use crate::hal::HalModule;

#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn HalModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module under its own identifier, replacing any previous one.
    pub fn register(&mut self, module: Arc<dyn HalModule>) {
        let id = module.id().to_string();
        debug!(module = %id, "HAL module registered");
        self.modules.insert(id, module);
    }

    /// Resolve a module. Unknown identifiers are `ResourceUnavailable`.
    pub fn get(&self, id: &str) -> Result<Arc<dyn HalModule>> {
        self.modules
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::ResourceUnavailable(format!("HAL module {id:?}")))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}
