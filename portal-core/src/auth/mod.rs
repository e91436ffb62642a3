//! Password authentication with device binding.

pub mod binding;
pub mod fingerprint;
pub mod password;

pub use binding::{AuthError, BindingCheck, DeviceBindingAuth, LoginOutcome, check_binding};
pub use fingerprint::{EmptyFingerprint, Fingerprint, FingerprintSignals, rolling_hash};
pub use password::{hash_password, verify_password};
