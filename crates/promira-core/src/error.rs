//! Status codes and error types
//!
//! Every vendor entry point returns an `int` that is either a non-negative
//! result or a negative status code. The platform library and the
//! promact_is library use overlapping code ranges with different meanings
//! (e.g. -101 is `PM_APP_NOT_FOUND` but `PS_I2C_NOT_ENABLED`), so each gets
//! its own enum.

use core::fmt;
use thiserror::Error;

macro_rules! status_codes {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $text:literal, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )*
        }

        impl $name {
            /// Look up the status for a raw return code
            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )*
                    _ => None,
                }
            }

            /// Raw return code of this status
            pub fn code(self) -> i32 {
                match self {
                    $( Self::$variant => $code, )*
                }
            }

            /// Human readable description
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )*
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} ({})", self.as_str(), self.code())
            }
        }
    };
}

status_codes! {
    /// Status codes of the platform management API (`pm_*`)
    pub enum PlatformStatus {
        /// Success
        Ok = 0 => "ok",
        /// The shared library could not be found or opened
        UnableToLoadLibrary = -1 => "unable to load library",
        /// The host driver is missing
        UnableToLoadDriver = -2 => "unable to load driver",
        /// The library does not export the requested function
        UnableToLoadFunction = -3 => "unable to load function",
        /// Library and binding versions are incompatible
        IncompatibleLibrary = -4 => "incompatible library",
        /// Device firmware is incompatible with the library
        IncompatibleDevice = -5 => "incompatible device",
        /// Network communication with the device failed
        CommunicationError = -6 => "communication error",
        /// The device could not be opened
        UnableToOpen = -7 => "unable to open",
        /// The device could not be closed
        UnableToClose = -8 => "unable to close",
        /// The handle does not refer to an open device
        InvalidHandle = -9 => "invalid handle",
        /// Configuration request rejected
        ConfigError = -10 => "configuration error",
        /// Output buffer too small for the result
        ShortBuffer = -11 => "short buffer",
        /// Function not available on this device
        FunctionNotAvailable = -12 => "function not available",
        /// The requested application is not installed
        AppNotFound = -101 => "application not found",
        /// The licence is invalid
        InvalidLicense = -102 => "invalid license",
        /// The application failed to start
        UnableToLoadApp = -103 => "unable to load application",
        /// The licence is for another device
        InvalidDevice = -104 => "invalid device",
        /// The licence has expired
        InvalidDate = -105 => "invalid date",
        /// The device is not licensed
        NotLicensed = -106 => "not licensed",
        /// The application is invalid
        InvalidApp = -107 => "invalid application",
        /// The feature is unknown
        InvalidFeature = -108 => "invalid feature",
        /// The application is not licensed
        UnlicensedApp = -109 => "unlicensed application",
        /// Another application is already loaded
        AppAlreadyLoaded = -110 => "application already loaded",
        /// Network configuration failed
        NetconfigError = -201 => "network configuration error",
        /// Malformed IP address
        InvalidIpaddr = -202 => "invalid IP address",
        /// Malformed netmask
        InvalidNetmask = -203 => "invalid netmask",
        /// Address and netmask do not form a valid subnet
        InvalidSubnet = -204 => "invalid subnet",
        /// Network configuration not supported on this interface
        NetconfigUnsupported = -205 => "network configuration unsupported",
        /// The connection dropped while reconfiguring the network
        NetconfigLostConnection = -206 => "lost connection during network configuration",
    }
}

status_codes! {
    /// Status codes of the promact_is application API (`ps_*`)
    pub enum AppStatus {
        /// Success
        Ok = 0 => "ok",
        /// The shared library could not be found or opened
        UnableToLoadLibrary = -1 => "unable to load library",
        /// The host driver is missing
        UnableToLoadDriver = -2 => "unable to load driver",
        /// The library does not export the requested function
        UnableToLoadFunction = -3 => "unable to load function",
        /// Library and binding versions are incompatible
        IncompatibleLibrary = -4 => "incompatible library",
        /// Application firmware is incompatible with the library
        IncompatibleDevice = -5 => "incompatible device",
        /// Network communication with the application failed
        CommunicationError = -6 => "communication error",
        /// The application could not be reached
        UnableToOpen = -7 => "unable to open",
        /// The connection could not be closed
        UnableToClose = -8 => "unable to close",
        /// The handle does not refer to an open object
        InvalidHandle = -9 => "invalid handle",
        /// Configuration request rejected
        ConfigError = -10 => "configuration error",
        /// Out of memory
        MemoryAllocError = -11 => "memory allocation error",
        /// A subsystem failed to initialise
        UnableToInitSubsystem = -12 => "unable to initialize subsystem",
        /// The licence is invalid
        InvalidLicense = -13 => "invalid license",
        /// An asynchronous command is still pending
        PendingAsyncCmd = -30 => "pending asynchronous command",
        /// Operation timed out
        Timeout = -31 => "timeout",
        /// The connection to the application was lost
        ConnectionLost = -32 => "connection lost",
        /// The application accepts no more connections
        ConnectionFull = -33 => "connection full",
        /// The queue cannot hold more commands
        QueueFull = -50 => "queue full",
        /// The command does not match the queue type
        QueueInvalidCmdType = -51 => "invalid command type for queue",
        /// The queue holds no commands
        QueueEmpty = -52 => "queue empty",
        /// Every response of the collect handle has been consumed
        NoMoreCmdsToCollect = -80 => "no more commands to collect",
        /// No submitted queue is left to collect
        NoMoreQueuesToCollect = -81 => "no more queues to collect",
        /// The collect call does not match the current response
        MismatchedCmd = -82 => "mismatched command",
        /// The response type is unknown
        UnknownCmd = -83 => "unknown command",
        /// A response was lost
        LostResponse = -84 => "lost response",
        /// I2C is not available on this device
        I2cNotAvailable = -100 => "I2C not available",
        /// I2C subsystem is not enabled
        I2cNotEnabled = -101 => "I2C not enabled",
        /// I2C read failed
        I2cReadError = -102 => "I2C read error",
        /// I2C write failed
        I2cWriteError = -103 => "I2C write error",
        /// I2C slave configuration is invalid
        I2cSlaveBadConfig = -104 => "I2C slave bad configuration",
        /// I2C slave read failed
        I2cSlaveReadError = -105 => "I2C slave read error",
        /// I2C slave timed out
        I2cSlaveTimeout = -106 => "I2C slave timeout",
        /// I2C slave dropped bytes beyond the buffer
        I2cDroppedExcessBytes = -107 => "I2C dropped excess bytes",
        /// The I2C bus was already free
        I2cBusAlreadyFree = -108 => "I2C bus already free",
        /// SPI is not available on this device
        SpiNotAvailable = -200 => "SPI not available",
        /// SPI subsystem is not enabled
        SpiNotEnabled = -201 => "SPI not enabled",
        /// An SPI write of zero bytes was requested
        SpiWrite0Bytes = -202 => "SPI write of 0 bytes",
        /// SPI slave read failed
        SpiSlaveReadError = -203 => "SPI slave read error",
        /// SPI slave timed out
        SpiSlaveTimeout = -204 => "SPI slave timeout",
        /// SPI slave dropped bytes beyond the buffer
        SpiDroppedExcessBytes = -205 => "SPI dropped excess bytes",
        /// SPI slave command error
        SpiSlaveCmdError = -206 => "SPI slave command error",
        /// SPI slave does not support 3-wire mode
        SpiSlave3wire = -207 => "SPI slave 3-wire unsupported",
        /// SPI master output is not enabled
        SpiOutputNotEnabled = -250 => "SPI output not enabled",
        /// SPI slave mode is enabled
        SpiSlaveEnabled = -251 => "SPI slave enabled",
        /// SPI master output is enabled
        SpiOutputEnabled = -252 => "SPI output enabled",
    }
}

/// Errors returned by the API traits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Platform management API failure
    #[error("platform: {0}")]
    Platform(PlatformStatus),

    /// promact_is application API failure
    #[error("application: {0}")]
    App(AppStatus),

    /// A negative return code that neither status table knows
    #[error("unrecognized status code {0}")]
    UnknownStatus(i32),

    /// Argument rejected before reaching the device
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    /// Raw status code for this error, as the C API would have returned it
    pub fn code(&self) -> i32 {
        match self {
            Error::Platform(s) => s.code(),
            Error::App(s) => s.code(),
            Error::UnknownStatus(code) => *code,
            Error::InvalidParameter(_) => AppStatus::ConfigError.code(),
        }
    }

    /// Application status, if this error came from the promact_is API
    pub fn app_status(&self) -> Option<AppStatus> {
        match self {
            Error::App(s) => Some(*s),
            _ => None,
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

/// Convert a raw platform API return value into a result
///
/// Non-negative values are passed through.
pub fn check_platform(ret: i32) -> Result<i32> {
    if ret >= 0 {
        return Ok(ret);
    }
    Err(PlatformStatus::from_code(ret)
        .map(Error::Platform)
        .unwrap_or(Error::UnknownStatus(ret)))
}

/// Convert a raw application API return value into a result
///
/// Non-negative values are passed through.
pub fn check_app(ret: i32) -> Result<i32> {
    if ret >= 0 {
        return Ok(ret);
    }
    Err(AppStatus::from_code(ret)
        .map(Error::App)
        .unwrap_or(Error::UnknownStatus(ret)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_codes_stay_distinct() {
        assert_eq!(
            check_platform(-101),
            Err(Error::Platform(PlatformStatus::AppNotFound))
        );
        assert_eq!(check_app(-101), Err(Error::App(AppStatus::I2cNotEnabled)));
    }

    #[test]
    fn test_positive_values_pass_through() {
        assert_eq!(check_app(42), Ok(42));
        assert_eq!(check_platform(0), Ok(0));
    }

    #[test]
    fn test_unknown_code() {
        let err = check_app(-9999).unwrap_err();
        assert_eq!(err, Error::UnknownStatus(-9999));
        assert_eq!(err.code(), -9999);
    }

    #[test]
    fn test_display_includes_code() {
        let err = Error::App(AppStatus::SpiNotEnabled);
        assert_eq!(err.to_string(), "application: SPI not enabled (-201)");
    }
}
