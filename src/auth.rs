//! Auth-domain role sets, credentials, claims, and profile models.

pub mod claims;
pub mod profile;
pub mod role;
pub mod token;

pub use claims::*;
pub use profile::*;
pub use role::*;
pub use token::*;
