pub mod auth;
pub mod calculations;
pub mod db;
pub mod error;
pub mod models;
pub mod validation;
pub mod workflows;

pub use db::repository::{PortalRepository, RepositoryError};
pub use error::PortalError;
pub use models::*;
