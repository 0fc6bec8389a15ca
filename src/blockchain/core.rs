// core.rs splits chain responsibilities into submodules for easier maintenance.
pub mod chain;
#[cfg(any(test, feature = "tamper"))]
pub mod tamper;
pub mod validation;

pub use chain::*;
#[cfg(any(test, feature = "tamper"))]
pub use tamper::*;
pub use validation::*;
