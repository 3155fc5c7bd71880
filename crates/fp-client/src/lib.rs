//! # forcepack-client
//!
//! SOAP transport and session infrastructure for the Salesforce APIs.
//!
//! This crate provides the foundations the higher-level crates build on:
//! - A wire-format-agnostic [`Transport`] trait with one concrete SOAP 1.1
//!   adapter over `reqwest`
//! - [`SessionGateway`]: session ownership, lazy login, and a single
//!   re-authenticate-and-retry pass when the server reports the token invalid
//! - XML escape/extract helpers shared by all SOAP-speaking crates
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │        (forcepack-partner, forcepack-metadata)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  operation name + body XML
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SessionGateway                          │
//! │  - Holds credentials + the one mutable Session              │
//! │  - Wraps bodies in envelopes with the SessionHeader         │
//! │  - Re-authenticates once on invalid-session faults          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  envelope + SOAPAction
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Transport (SoapTransport)                  │
//! │  - POSTs the envelope, separates faults from results        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use forcepack_client::{Credentials, GatewayConfig, SessionGateway, SoapApi, SoapTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), forcepack_client::Error> {
//!     let credentials = Credentials::from_env()?;
//!     let gateway = SessionGateway::new(
//!         SoapTransport::new()?,
//!         credentials,
//!         GatewayConfig::default(),
//!     )?;
//!
//!     let body = gateway
//!         .invoke(SoapApi::Partner, "getServerTimestamp",
//!                 r#"<getServerTimestamp xmlns="urn:partner.soap.sforce.com"/>"#)
//!         .await?;
//!     println!("{body}");
//!     Ok(())
//! }
//! ```

mod credentials;
mod error;
mod session;
mod transport;
pub mod xml;

pub use credentials::Credentials;
pub use error::{Error, ErrorKind, Result};
pub use session::{GatewayConfig, Session, SessionGateway, SoapApi};
pub use transport::{parse_fault, SoapFault, SoapRequest, SoapResponse, SoapTransport, Transport};

/// Default API version.
pub const DEFAULT_API_VERSION: &str = "62.0";

/// Default login URL for production orgs.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";

/// Default login URL for sandbox orgs.
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";

/// User-Agent string for the client.
pub const USER_AGENT: &str = concat!("forcepack/", env!("CARGO_PKG_VERSION"));
