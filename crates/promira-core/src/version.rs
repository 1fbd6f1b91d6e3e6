//! Version numbers and version matrices
//!
//! All Promira version numbers are encoded as `(major << 8) | minor`, so
//! v1.60 is `0x013c`. The minor part is printed as two decimal digits.

use core::fmt;
use core::str::FromStr;

/// A packed `major.minor` version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version(pub u16);

impl Version {
    /// Build a version from its parts
    pub const fn new(major: u8, minor: u8) -> Self {
        Version(((major as u16) << 8) | minor as u16)
    }

    /// Major part
    pub const fn major(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Minor part
    pub const fn minor(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Raw packed value
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major(), self.minor())
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('v').unwrap_or(s);
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| format!("Invalid version '{}': expected MAJOR.MINOR", s))?;
        let major = major
            .parse::<u8>()
            .map_err(|e| format!("Invalid major version '{}': {}", major, e))?;
        let minor = minor
            .parse::<u8>()
            .map_err(|e| format!("Invalid minor version '{}': {}", minor, e))?;
        Ok(Version::new(major, minor))
    }
}

/// Version pair reported by a vendor library's version symbol
///
/// The library packs its own version in the low 16 bits and the minimum
/// API (header) version it requires from callers in the high 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryVersion {
    /// Version of the shared library itself
    pub software: Version,
    /// Minimum binding version the library accepts
    pub required_api: Version,
}

impl LibraryVersion {
    /// Unpack the 32-bit version word
    pub const fn from_word(word: u32) -> Self {
        Self {
            software: Version((word & 0xffff) as u16),
            required_api: Version((word >> 16) as u16),
        }
    }

    /// Pack into the 32-bit version word
    pub const fn to_word(self) -> u32 {
        ((self.required_api.0 as u32) << 16) | self.software.0 as u32
    }
}

/// Version matrix of a Promira platform
///
/// Describes the version dependencies between the host library, the
/// device firmware and the hardware. Used to tell which component caused
/// an incompatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromiraVersion {
    /// Host library version
    pub software: Version,
    /// Device firmware version
    pub firmware: Version,
    /// Hardware revision
    pub hardware: Version,
    /// Firmware requires that software must be >= this version
    pub sw_req_by_fw: Version,
    /// Software requires that firmware must be >= this version
    pub fw_req_by_sw: Version,
    /// Software requires that the API interface must be >= this version
    pub api_req_by_sw: Version,
    /// Build stamp: `(year << 24) | (month << 16) | (day << 8) | build`
    pub build: u32,
}

impl PromiraVersion {
    /// Build date as `(year, month, day, build)`
    pub fn build_date(&self) -> (u8, u8, u8, u8) {
        let b = self.build;
        ((b >> 24) as u8, (b >> 16) as u8, (b >> 8) as u8, b as u8)
    }
}

/// Version matrix of an application running on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppVersion {
    /// Host library version
    pub software: Version,
    /// Application firmware version
    pub firmware: Version,
    /// Hardware revision
    pub hardware: Version,
    /// Firmware requires that software must be >= this version
    pub sw_req_by_fw: Version,
    /// Software requires that firmware must be >= this version
    pub fw_req_by_sw: Version,
    /// Software requires that the API interface must be >= this version
    pub api_req_by_sw: Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Version(0x013c).to_string(), "1.60");
        assert_eq!(Version(0x0128).to_string(), "1.40");
        assert_eq!(Version(0x0105).to_string(), "1.05");
    }

    #[test]
    fn test_parse() {
        assert_eq!("1.60".parse::<Version>(), Ok(Version(0x013c)));
        assert_eq!("v2.00".parse::<Version>(), Ok(Version(0x0200)));
        assert!("1".parse::<Version>().is_err());
        assert!("1.300".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering_follows_packed_value() {
        assert!(Version::new(1, 60) > Version::new(1, 40));
        assert!(Version::new(2, 0) > Version::new(1, 99));
    }

    #[test]
    fn test_library_version_word() {
        let v = LibraryVersion::from_word(0x011c_013c);
        assert_eq!(v.software, Version::new(1, 60));
        assert_eq!(v.required_api, Version::new(1, 28));
        assert_eq!(v.to_word(), 0x011c_013c);
    }

    #[test]
    fn test_build_date() {
        let v = PromiraVersion {
            build: 0x16_0a_1f_03,
            ..Default::default()
        };
        assert_eq!(v.build_date(), (22, 10, 31, 3));
    }
}
