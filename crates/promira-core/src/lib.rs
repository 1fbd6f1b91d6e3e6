//! promira-core - Shared types for Promira host adapter tooling
//!
//! This crate defines everything that is independent of how the vendor
//! libraries are reached:
//!
//! - Status codes of the platform management API (`pm_*`) and of the
//!   promact_is application API (`ps_*`), plus a typed [`Error`]
//! - Version words and version matrices
//! - Handle newtypes, flag sets and protocol enums
//! - The API traits ([`PlatformApi`], [`AppApi`], [`I2cApi`], [`SpiApi`],
//!   [`GpioApi`]) that the sample commands are written against
//!
//! Two implementations exist: `promira-ffi` forwards to the vendor shared
//! libraries, `promira-dummy` emulates a device in memory.
//!
//! # Example
//!
//! ```ignore
//! use promira_core::PlatformApi;
//!
//! fn load_app(api: &dyn PlatformApi, addr: &str) -> promira_core::Result<()> {
//!     let pm = api.open(addr)?;
//!     api.load(pm, "com.totalphase.promact_is")?;
//!     api.close(pm)
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod error;
pub mod types;
pub mod version;

pub use api::{AppApi, GpioApi, I2cApi, PlatformApi, Promact, SpiApi};
pub use error::{check_app, check_platform, AppStatus, Error, PlatformStatus, Result};
pub use types::*;
pub use version::{AppVersion, LibraryVersion, PromiraVersion, Version};

/// Name of the promact_is application installed on Promira platforms
pub const PROMACT_IS_APP: &str = "com.totalphase.promact_is";
