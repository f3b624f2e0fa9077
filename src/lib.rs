//! Pingdom API client library.
//!
//! Provides a typed async client for the Pingdom REST API (v2.0): checks,
//! results, probes, contacts, and summary rollups, with rate-limit tracking
//! from the service's quota headers.
//!
//! ```no_run
//! use pingdom_lib::{Client, Credentials, Params};
//!
//! # async fn run() -> Result<(), pingdom_lib::Error> {
//! let client = Client::new(Credentials::from_env()?)?;
//! for check in client.checks(Params::new()).await? {
//!     println!("{} ({})", check.name, check.status.unwrap_or_default());
//! }
//! println!("quota left: {:?}", client.rate_limits().short);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod limits;
pub mod params;
pub mod resources;
pub mod transport;

pub use client::{Client, API_BASE};
pub use config::Credentials;
pub use error::{ConfigError, Error, ParseError, TransportError, ValidationError};
pub use limits::{RateLimit, RateLimits};
pub use params::{ParamValue, Params};
pub use resources::{
    Check, CheckResult, CheckType, Contact, Probe, Resource, Summary, SummaryAverage,
};
pub use transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport};

/// Library version for User-Agent and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
