//! Provider registration.

use crate::provider::CipherProvider;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

struct Registration {
    name: String,
    provider: Arc<dyn CipherProvider>,
}

/// Holds at most one registered cipher provider.
///
/// Provider modules call [`register`](Self::register) while they are being
/// loaded. The first registration wins; later ones are ignored. The registry
/// is written once during startup and only read afterwards.
///
/// # Example
///
/// ```ignore
/// use relcrypt_cipher::ProviderRegistry;
/// use std::sync::Arc;
///
/// let registry = ProviderRegistry::new();
/// assert!(registry.register("aes-xts", Arc::new(MyProvider::new())));
/// assert_eq!(registry.active_name().as_deref(), Some("aes-xts"));
/// ```
#[derive(Default)]
pub struct ProviderRegistry {
    slot: RwLock<Option<Registration>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under `name`.
    ///
    /// Returns `true` if the provider was stored, `false` if another
    /// provider was already registered. A rejected registration is not an
    /// error.
    pub fn register(&self, name: &str, provider: Arc<dyn CipherProvider>) -> bool {
        let mut slot = self.slot.write();
        if let Some(existing) = slot.as_ref() {
            debug!(
                rejected = name,
                active = %existing.name,
                "encryption module already registered, ignoring"
            );
            return false;
        }

        debug!(module = name, "registering encryption module");
        *slot = Some(Registration {
            name: name.to_string(),
            provider,
        });
        true
    }

    /// Returns the registered provider, if any.
    #[must_use]
    pub fn active(&self) -> Option<Arc<dyn CipherProvider>> {
        self.slot.read().as_ref().map(|r| Arc::clone(&r.provider))
    }

    /// Returns the name the active provider registered under.
    #[must_use]
    pub fn active_name(&self) -> Option<String> {
        self.slot.read().as_ref().map(|r| r.name.clone())
    }

    /// Returns true if a provider has been registered.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.slot.read().is_some()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("active", &self.active_name())
            .finish()
    }
}
