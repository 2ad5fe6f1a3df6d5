pub mod config;
pub mod enumerate;
pub mod error;
pub mod math;
pub mod types;

#[cfg(feature = "partition")]
pub mod partition;

#[cfg(feature = "lattice")]
pub mod lattice;

#[cfg(feature = "martingale")]
pub mod martingale;

#[cfg(feature = "filtration")]
pub mod filtration;

pub use config::{CutPolicy, EngineConfig, EngineLimits};
pub use error::LatticeError;
pub use types::*;

/// Standard result type for all measure-lattice operations
pub type LatticeResult<T> = Result<T, LatticeError>;
