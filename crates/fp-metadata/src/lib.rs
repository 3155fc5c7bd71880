//! # forcepack-metadata
//!
//! Metadata API orchestration: retrieve and deploy jobs driven to
//! completion, metadata listing, and archive packing.
//!
//! ## Features
//!
//! - **Retrieve** - Pull the metadata a manifest describes as a zip blob
//! - **Deploy** - Push a zip package and wait for the verdict
//! - **List Metadata** - Enumerate members by type, batched the way the
//!   server requires
//! - **Quick Deploy** - Promote a validated check-only deployment
//! - **Status Polling** - Bounded, cancellable polling for async jobs
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forcepack_client::{Credentials, GatewayConfig, SessionGateway, SoapTransport};
//! use forcepack_manifest::Manifest;
//! use forcepack_metadata::{archive, DeployOptions, MetadataApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Arc::new(SessionGateway::new(
//!         SoapTransport::new()?,
//!         Credentials::from_env()?,
//!         GatewayConfig::default(),
//!     )?);
//!     let api = MetadataApi::new(gateway);
//!
//!     // Pull everything the manifest names.
//!     let manifest = Manifest::read_from_file("package.xml")?;
//!     let retrieved = api.retrieve(&manifest).await?;
//!     if let Some(blob) = retrieved.zip_file {
//!         archive::unzip("out".as_ref(), &blob, None)?;
//!     }
//!
//!     // Push a tree back.
//!     let files = manifest.archive_file_list()?;
//!     let blob = archive::make_zip("src".as_ref(), &files)?;
//!     let zip_bytes = base64::Engine::decode(
//!         &base64::engine::general_purpose::STANDARD, blob)?;
//!     let result = api.deploy(&zip_bytes, &DeployOptions::default()).await?;
//!     println!("deployed as {}", result.id);
//!     Ok(())
//! }
//! ```

pub mod archive;
mod client;
mod deploy;
mod error;
mod list;
mod poll;
mod retrieve;

pub use client::MetadataApi;
pub use deploy::{ComponentFailure, DeployOptions, DeployResult, DeployStatus, TestLevel};
pub use error::{Error, ErrorKind, Result};
pub use list::{ListQuery, LIST_QUERY_BATCH};
pub use poll::{cancellation, CancelHandle, CancelToken, PollConfig, Probe};
pub use retrieve::{FileProperties, RetrieveMessage, RetrieveResult, RetrieveStatus};
