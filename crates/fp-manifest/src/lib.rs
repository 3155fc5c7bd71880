//! # forcepack-manifest
//!
//! Package manifest model and disk-layout translation for the Metadata API.
//!
//! Three pieces cooperate here:
//!
//! - [`registry`] — the static table mapping disk folder names to canonical
//!   metadata type names, with each type's packaging rules
//! - [`parse_path`] / [`archive_entries`] — translation between one disk
//!   path and a typed artifact identity, and back out to the full set of
//!   archive entries a deployment of that artifact needs
//! - [`Manifest`] — the type→members model behind `package.xml`, with
//!   order-independent merging and deterministic serialization
//!
//! ## Example
//!
//! ```rust
//! use forcepack_manifest::Manifest;
//!
//! let mut manifest = Manifest::new("62.0");
//! manifest.add_from_paths(["src/classes/Invoicing.cls"]).unwrap();
//! manifest.add_members("ApexTrigger", ["AccountAudit"]);
//!
//! assert_eq!(manifest.members("ApexClass").unwrap(), ["Invoicing"]);
//! assert_eq!(
//!     manifest.archive_file_list().unwrap(),
//!     vec![
//!         "classes/Invoicing.cls",
//!         "classes/Invoicing.cls-meta.xml",
//!         "triggers/AccountAudit.trigger",
//!         "triggers/AccountAudit.trigger-meta.xml",
//!     ]
//! );
//! ```

mod error;
mod manifest;
mod path;
pub mod registry;

pub use error::{Error, ErrorKind, Result};
pub use manifest::{Manifest, PACKAGE_XMLNS};
pub use path::{archive_entries, parse_path, ArtifactDescriptor, SOURCE_ROOTS};
pub use registry::ArtifactType;
