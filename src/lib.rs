//! teams-graph - descriptor-driven Microsoft Graph Teams client
//!
//! Every Graph operation is an [`api::EndpointDescriptor`] executed by one
//! generic [`api::Executor`]; [`TeamsClient`] adds a catalog and a few typed
//! wrappers on top.

pub mod api;
pub mod cache;
pub mod config;
pub mod types;

pub use api::client::TeamsClient;
pub use config::Config;
