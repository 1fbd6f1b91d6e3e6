//! C layouts shared with the vendor libraries

use promira_core::{AppVersion, PromiraVersion, SpiSlaveReadInfo, Version};
use std::ffi::{c_char, CStr, CString};

/// `PromiraVersion`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct RawPromiraVersion {
    pub software: u16,
    pub firmware: u16,
    pub hardware: u16,
    pub sw_req_by_fw: u16,
    pub fw_req_by_sw: u16,
    pub api_req_by_sw: u16,
    pub build: u32,
}

impl From<RawPromiraVersion> for PromiraVersion {
    fn from(raw: RawPromiraVersion) -> Self {
        PromiraVersion {
            software: Version(raw.software),
            firmware: Version(raw.firmware),
            hardware: Version(raw.hardware),
            sw_req_by_fw: Version(raw.sw_req_by_fw),
            fw_req_by_sw: Version(raw.fw_req_by_sw),
            api_req_by_sw: Version(raw.api_req_by_sw),
            build: raw.build,
        }
    }
}

/// `PromiraAppVersion`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct RawAppVersion {
    pub software: u16,
    pub firmware: u16,
    pub hardware: u16,
    pub sw_req_by_fw: u16,
    pub fw_req_by_sw: u16,
    pub api_req_by_sw: u16,
}

impl From<RawAppVersion> for AppVersion {
    fn from(raw: RawAppVersion) -> Self {
        AppVersion {
            software: Version(raw.software),
            firmware: Version(raw.firmware),
            hardware: Version(raw.hardware),
            sw_req_by_fw: Version(raw.sw_req_by_fw),
            fw_req_by_sw: Version(raw.fw_req_by_sw),
            api_req_by_sw: Version(raw.api_req_by_sw),
        }
    }
}

/// `PromiraSpiSlaveReadInfo`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSpiSlaveReadInfo {
    pub in_data_bits: u32,
    pub out_data_bits: u32,
    pub header_bits: u8,
    pub resp_id: u8,
    pub ss_mask: u8,
    pub is_last: u8,
}

impl From<RawSpiSlaveReadInfo> for SpiSlaveReadInfo {
    fn from(raw: RawSpiSlaveReadInfo) -> Self {
        SpiSlaveReadInfo {
            in_data_bits: raw.in_data_bits,
            out_data_bits: raw.out_data_bits,
            header_bits: raw.header_bits,
            resp_id: raw.resp_id,
            ss_mask: raw.ss_mask,
            is_last: raw.is_last != 0,
        }
    }
}

/// Text the library wrote into `buf`, up to the first NUL
pub fn buf_to_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Copy a string returned by pointer, `None` for NULL
///
/// # Safety
///
/// `ptr` must be NULL or point to a NUL terminated string.
pub unsafe fn ptr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// C string argument; interior NULs are rejected
pub fn c_string(s: &str) -> promira_core::Result<CString> {
    CString::new(s).map_err(|_| {
        promira_core::Error::InvalidParameter(format!("'{}' contains a NUL byte", s))
    })
}

/// Clamp a buffer length to a C `u16` length parameter
pub fn len_u16(len: usize) -> u16 {
    len.min(u16::MAX as usize) as u16
}

/// Clamp a buffer length to a C `u32` length parameter
pub fn len_u32(len: usize) -> u32 {
    len.min(u32::MAX as usize) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buf_to_string_stops_at_nul() {
        assert_eq!(buf_to_string(b"com.totalphase.promact_is\0garbage"), "com.totalphase.promact_is");
        assert_eq!(buf_to_string(b"no nul"), "no nul");
        assert_eq!(buf_to_string(&[0u8; 8]), "");
    }

    #[test]
    fn test_ptr_to_string() {
        let s = CString::new("192.168.11.240").unwrap();
        assert_eq!(unsafe { ptr_to_string(s.as_ptr()) }.as_deref(), Some("192.168.11.240"));
        assert_eq!(unsafe { ptr_to_string(std::ptr::null()) }, None);
    }

    #[test]
    fn test_layouts() {
        assert_eq!(std::mem::size_of::<RawPromiraVersion>(), 16);
        assert_eq!(std::mem::size_of::<RawAppVersion>(), 12);
        assert_eq!(std::mem::size_of::<RawSpiSlaveReadInfo>(), 12);
    }

    #[test]
    fn test_lengths_are_clamped() {
        assert_eq!(len_u16(70_000), u16::MAX);
        assert_eq!(len_u16(26), 26);
        assert!(c_string("a\0b").is_err());
    }

    #[test]
    fn test_read_info_conversion() {
        let info: SpiSlaveReadInfo = RawSpiSlaveReadInfo {
            in_data_bits: 16,
            is_last: 1,
            ..Default::default()
        }
        .into();
        assert!(info.is_last);
        assert_eq!(info.in_data_bits, 16);
    }
}
