//! Data Transfer Objects
//!
//! Wire representations of the Redash API. They are converted into domain
//! types as soon as they leave the HTTP client.

pub mod redash;
