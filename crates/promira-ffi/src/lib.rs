//! promira-ffi - Native Promira backend
//!
//! Implements the `promira-core` API traits by forwarding to the vendor
//! shared libraries. Nothing is loaded until the first call; each entry point
//! is bound on its own first use and then called directly.
//!
//! ```ignore
//! use promira_core::PlatformApi;
//! use promira_ffi::NativePlatform;
//!
//! let pm = NativePlatform::new();
//! for dev in pm.find_devices_ext()? {
//!     println!("{} ({})", dev.address, dev.serial());
//! }
//! ```
//!
//! A failure to find or accept a library surfaces as the usual status codes
//! (`UnableToLoadLibrary`, `IncompatibleLibrary`, `UnableToLoadFunction`) of
//! the API that was called.

#![warn(rust_2018_idioms)]

mod app;
mod platform;
pub mod raw;

pub use app::NativeApp;
pub use platform::NativePlatform;

use promira_core::LibraryVersion;
use std::path::Path;

/// Load both vendor libraries from `dir` instead of searching for them
///
/// Must be called before the first API call; returns `false` if either
/// library had already been looked up.
pub fn set_library_dir(dir: &Path) -> bool {
    let platform = platform::PLATFORM_BINDER.set_library_dir(dir);
    let app = app::APP_BINDER.set_library_dir(dir);
    if !(platform && app) {
        log::warn!(
            "Library directory {} set after first use; ignored",
            dir.display()
        );
    }
    platform && app
}

/// Version of the loaded platform library, if loaded
pub fn platform_library_version() -> Option<LibraryVersion> {
    platform::PLATFORM_BINDER.library_version()
}

/// Version of the loaded promact_is library, if loaded
pub fn app_library_version() -> Option<LibraryVersion> {
    app::APP_BINDER.library_version()
}
