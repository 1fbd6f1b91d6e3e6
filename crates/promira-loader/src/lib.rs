//! promira-loader - Lazy binding of the Promira vendor shared libraries
//!
//! The vendor ships its API as a closed shared library per component
//! (`promira` for platform management, `promact_is` for the I2C/SPI
//! application). This crate finds and opens such a library on first use,
//! refuses it unless its version matches these bindings in both directions,
//! and then hands out function pointers one entry point at a time.
//!
//! - [`Locator`] reproduces the Windows search order (executable directory,
//!   then current directory) on POSIX systems
//! - [`Binder`] owns the open library and performs the version check
//! - [`LazySymbol`] caches one resolved function pointer; the
//!   [`symbol_table!`] macro declares a whole table of them
//!
//! Failures are reported as [`BindError`], which maps onto the legacy
//! status codes `-1` (library not found), `-3` (function not found) and
//! `-4` (incompatible library).

#![warn(rust_2018_idioms)]

pub mod binder;
pub mod error;
pub mod locator;
pub mod symbol;

pub use binder::{
    Binder, LibrarySpec, Loader, NativeLoader, RawSymbol, SymbolTable, APP_LIBRARY,
    PLATFORM_LIBRARY,
};
pub use error::BindError;
pub use locator::{library_file_name, Locator};
pub use symbol::LazySymbol;
