//! # forcepack-partner
//!
//! Partner API operations: SOQL query paging, batched record CRUD, and
//! anonymous Apex execution.
//!
//! These are thin pass-throughs: no retry logic of their own beyond the
//! session renewal the shared [`forcepack_client::SessionGateway`]
//! provides. Queries page through the server's locator/`done` protocol;
//! record operations batch in chunks of [`CRUD_BATCH_SIZE`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forcepack_client::{Credentials, GatewayConfig, SessionGateway, SoapTransport};
//! use forcepack_partner::{PartnerApi, Record};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Arc::new(SessionGateway::new(
//!         SoapTransport::new()?,
//!         Credentials::from_env()?,
//!         GatewayConfig::default(),
//!     )?);
//!     let partner = PartnerApi::new(gateway);
//!
//!     let accounts = partner.query_all("SELECT Id, Name FROM Account").await?;
//!     for account in &accounts {
//!         println!("{}", account.fields["Name"]);
//!     }
//!
//!     let results = partner
//!         .create(&[Record::new("Account").field("Name", "Acme")])
//!         .await?;
//!     println!("created: {:?}", results[0].id);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{PartnerApi, CRUD_BATCH_SIZE};
pub use error::{Error, ErrorKind, Result};
pub use types::{
    ApiError, DeleteResult, ExecuteAnonymousResult, QueryResult, Record, SaveResult,
};
