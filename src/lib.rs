//! # forcepack
//!
//! Salesforce metadata packaging, retrieval and deployment client for Rust.
//!
//! This library moves "metadata" — named, typed configuration artifacts —
//! between a local file tree and an org, translating between the on-disk
//! directory convention and the server's type/member manifest structure,
//! and driving the server's asynchronous retrieve/deploy jobs to
//! completion.
//!
//! ## Crates
//!
//! - **forcepack-client** - SOAP transport, session ownership, single-retry
//!   session renewal
//! - **forcepack-manifest** - Type registry, path translation, the
//!   `package.xml` manifest model
//! - **forcepack-partner** - Partner API: query paging, batched record
//!   CRUD, anonymous Apex
//! - **forcepack-metadata** - Retrieve/deploy orchestration, listing,
//!   archive packing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forcepack::client::{Credentials, GatewayConfig, SessionGateway, SoapTransport};
//! use forcepack::manifest::Manifest;
//! use forcepack::metadata::MetadataApi;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Arc::new(SessionGateway::new(
//!         SoapTransport::new()?,
//!         Credentials::from_env()?,
//!         GatewayConfig::default(),
//!     )?);
//!
//!     let mut manifest = Manifest::new("62.0");
//!     manifest.add_members("ApexClass", ["*".to_string()]);
//!
//!     let api = MetadataApi::new(gateway);
//!     let retrieved = api.retrieve(&manifest).await?;
//!     println!("retrieved {} files", retrieved.file_properties.len());
//!     Ok(())
//! }
//! ```

// Re-export member crates for convenient access
#[cfg(feature = "client")]
pub use forcepack_client as client;
#[cfg(feature = "manifest")]
pub use forcepack_manifest as manifest;
#[cfg(feature = "metadata")]
pub use forcepack_metadata as metadata;
#[cfg(feature = "partner")]
pub use forcepack_partner as partner;
