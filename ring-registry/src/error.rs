use ring_config::ConfigError;
use ring_enforcer::RingError;
use ring_store::StoreError;
use thiserror::Error;

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by the ring registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Registration settings were unusable.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    /// Priming or installing an enforcer failed.
    #[error(transparent)]
    Ring(#[from] RingError),
    /// Reading specs or subscribing to the configuration collection failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
