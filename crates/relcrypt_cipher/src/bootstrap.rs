//! Encryption subsystem bootstrap.
//!
//! Encryption is configured by a single string naming a provider module.
//! At startup the module is loaded, it registers a [`CipherProvider`] with
//! the [`ProviderRegistry`], and the provider's `setup` routine is run.
//! The outcome is an [`EncryptionState`] that is passed into every copy.
//!
//! [`CipherProvider`]: crate::CipherProvider

use crate::block::BlockCipher;
use crate::error::ProviderError;
use crate::registry::ProviderRegistry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Loads a provider module by name.
///
/// Loading must register the module's provider synchronously, before
/// `load` returns. How modules are located and linked is up to the
/// implementation.
pub trait ProviderLoader {
    /// Loads the module named `library`, letting it register with `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::LoadFailed`] if the module cannot be loaded.
    fn load(&self, library: &str, registry: &ProviderRegistry) -> Result<(), ProviderError>;
}

/// Initialization routine of a statically linked provider module.
pub type ModuleInit = Box<dyn Fn(&ProviderRegistry) + Send + Sync>;

/// A [`ProviderLoader`] over modules linked into the binary.
///
/// Each module is a name and an initializer that is run when the module is
/// "loaded". Unknown names fail to load.
#[derive(Default)]
pub struct StaticLoader {
    modules: HashMap<String, ModuleInit>,
}

impl StaticLoader {
    /// Creates a loader with no modules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module.
    #[must_use]
    pub fn with_module<F>(mut self, name: impl Into<String>, init: F) -> Self
    where
        F: Fn(&ProviderRegistry) + Send + Sync + 'static,
    {
        self.modules.insert(name.into(), Box::new(init));
        self
    }

    /// Returns true if a module named `name` is known.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }
}

impl ProviderLoader for StaticLoader {
    fn load(&self, library: &str, registry: &ProviderRegistry) -> Result<(), ProviderError> {
        let init = self
            .modules
            .get(library)
            .ok_or_else(|| ProviderError::load_failed(library, "no such module"))?;
        init(registry);
        Ok(())
    }
}

impl fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.modules.keys().collect();
        names.sort();
        f.debug_struct("StaticLoader").field("modules", &names).finish()
    }
}

/// Whether encryption is active, and the cipher to use if so.
///
/// Fixed for the lifetime of the process once [`EncryptionSetup::setup`]
/// has produced it.
#[derive(Debug, Clone, Default)]
pub struct EncryptionState {
    cipher: Option<Arc<BlockCipher>>,
}

impl EncryptionState {
    /// Encryption inactive.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Encryption active through `cipher`.
    #[must_use]
    pub fn enabled(cipher: BlockCipher) -> Self {
        Self {
            cipher: Some(Arc::new(cipher)),
        }
    }

    /// Returns true if data encryption is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    /// Returns the active cipher.
    #[must_use]
    pub fn cipher(&self) -> Option<&Arc<BlockCipher>> {
        self.cipher.as_ref()
    }
}

/// One-shot initializer for the encryption subsystem.
///
/// [`setup`](Self::setup) consumes the initializer, so encryption is set up
/// at most once per instance. Each instance owns its own registry, which
/// keeps independent engines (and tests) isolated from one another.
#[derive(Debug, Default)]
pub struct EncryptionSetup {
    registry: ProviderRegistry,
}

impl EncryptionSetup {
    /// Creates an initializer with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an initializer around an existing registry.
    ///
    /// Useful when a provider was registered before configuration was read.
    #[must_use]
    pub fn with_registry(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry modules register with.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Initializes encryption from the configured `library` name.
    ///
    /// An empty name leaves encryption disabled. Otherwise the module is
    /// loaded through `loader`, and the provider it registered is set up.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::LoadFailed`] if the module cannot be loaded
    /// - [`ProviderError::NoProviderRegistered`] if loading registered nothing
    /// - [`ProviderError::SetupFailed`] if the provider's setup returned false
    pub fn setup(
        self,
        library: &str,
        loader: &dyn ProviderLoader,
    ) -> Result<EncryptionState, ProviderError> {
        let library = library.trim();
        if library.is_empty() {
            debug!("no encryption library configured, data encryption disabled");
            return Ok(EncryptionState::disabled());
        }

        loader.load(library, &self.registry)?;
        debug!(library, "loaded library for encryption");

        let (Some(name), Some(provider)) = (self.registry.active_name(), self.registry.active())
        else {
            return Err(ProviderError::NoProviderRegistered {
                library: library.to_string(),
            });
        };

        if !provider.setup() {
            return Err(ProviderError::SetupFailed { provider: name });
        }

        info!(library, provider = %name, "data encryption performed by {library}");
        Ok(EncryptionState::enabled(BlockCipher::new(name, provider)))
    }
}
