//! # API Client
//!
//! reqwest-based access to the `/api` endpoints, for tools and services that
//! talk to a running CRM server rather than to its storage.

pub mod api_client;
pub mod remote_cascade;

#[cfg(test)]
pub(crate) mod test_server;

pub use api_client::{ApiClient, ClientError, DEFAULT_FAILURE_MESSAGE};
pub use remote_cascade::{cascade_delete_remote, RemoteRecordDeleter, RemoteSubjectDeleter};
