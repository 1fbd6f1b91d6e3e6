//! Binding errors

use promira_core::{AppStatus, PlatformStatus, Version};
use thiserror::Error;

/// Why a vendor entry point could not be bound
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The operating system could not open the shared library
    #[error("Unable to load library '{name}': {reason}")]
    LibraryNotFound { name: String, reason: String },

    /// The library exports no version symbol
    #[error("Library '{name}' has no version symbol '{symbol}'")]
    MissingVersionSymbol { name: String, symbol: &'static str },

    /// Library and binding do not accept each other's versions
    #[error(
        "Incompatible library '{name}': library v{library} (binding requires >= v{required_library}), \
         binding v{header} (library requires >= v{required_header})"
    )]
    IncompatibleVersion {
        name: String,
        library: Version,
        required_library: Version,
        header: Version,
        required_header: Version,
    },

    /// The library was accepted but does not export the symbol
    #[error("Function '{0}' not found in library")]
    FunctionNotFound(&'static str),
}

impl BindError {
    /// Legacy negative status code of the C shim
    ///
    /// A missing version symbol and a version mismatch are both reported as
    /// "incompatible library".
    pub fn status(&self) -> i32 {
        match self {
            BindError::LibraryNotFound { .. } => -1,
            BindError::FunctionNotFound(_) => -3,
            BindError::MissingVersionSymbol { .. } | BindError::IncompatibleVersion { .. } => -4,
        }
    }

    /// Whether this is one of the two "incompatible library" failures
    pub fn is_incompatible(&self) -> bool {
        self.status() == -4
    }

    /// Status in the platform API's code table
    pub fn platform_status(&self) -> PlatformStatus {
        match self {
            BindError::LibraryNotFound { .. } => PlatformStatus::UnableToLoadLibrary,
            BindError::FunctionNotFound(_) => PlatformStatus::UnableToLoadFunction,
            _ => PlatformStatus::IncompatibleLibrary,
        }
    }

    /// Status in the application API's code table
    pub fn app_status(&self) -> AppStatus {
        match self {
            BindError::LibraryNotFound { .. } => AppStatus::UnableToLoadLibrary,
            BindError::FunctionNotFound(_) => AppStatus::UnableToLoadFunction,
            _ => AppStatus::IncompatibleLibrary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_status_codes() {
        let not_found = BindError::LibraryNotFound {
            name: "promira.so".into(),
            reason: "missing".into(),
        };
        assert_eq!(not_found.status(), -1);
        assert_eq!(not_found.platform_status().code(), -1);

        let missing = BindError::MissingVersionSymbol {
            name: "promira.so".into(),
            symbol: "pm_c_version",
        };
        assert!(missing.is_incompatible());
        assert_eq!(missing.app_status(), AppStatus::IncompatibleLibrary);

        assert_eq!(BindError::FunctionNotFound("c_pm_open").status(), -3);
    }

    #[test]
    fn test_version_message() {
        let err = BindError::IncompatibleVersion {
            name: "promira.so".into(),
            library: Version::new(1, 20),
            required_library: Version::new(1, 40),
            header: Version::new(1, 60),
            required_header: Version::new(1, 28),
        };
        let msg = err.to_string();
        assert!(msg.contains("v1.20"));
        assert!(msg.contains(">= v1.40"));
    }
}
