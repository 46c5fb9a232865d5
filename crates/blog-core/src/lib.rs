//! # Blog Core
//!
//! The domain layer of the Inkwell blog.
//! Entities, repository ports, page/query logic and the services that the
//! HTTP layer drives. No infrastructure dependencies live here.

pub mod domain;
pub mod error;
pub mod forms;
pub mod markdown;
pub mod ports;
pub mod query;
pub mod service;

pub use error::{DomainError, RepoError};
pub use service::{BlogPorts, BlogService, BlogSettings};
