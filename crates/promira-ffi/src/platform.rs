//! Platform management API over `promira.so` / `promira.dll`

use crate::raw::{buf_to_string, c_string, ptr_to_string, RawPromiraVersion};
use once_cell::sync::Lazy;
use promira_core::{
    check_platform, ipv4_from_raw, DeviceInfo, Error, LoadFlags, NetCommand, PlatformApi,
    PlatformHandle, PromiraVersion, Result,
};
use promira_loader::{symbol_table, Binder, PLATFORM_LIBRARY};
use std::ffi::{c_char, c_int};
use std::net::Ipv4Addr;

/// Size of the string buffers handed to the library
const STRING_BUF: usize = 256;
/// Size of the licence buffer
const LICENSE_BUF: usize = 1024;
/// Device slots for discovery; grown if more devices answer
const DISCOVERY_SLOTS: usize = 16;

pub(crate) static PLATFORM_BINDER: Lazy<Binder> = Lazy::new(|| Binder::new(PLATFORM_LIBRARY));

symbol_table! {
    struct PlatformSymbols {
        c_pm_find_devices: unsafe extern "C" fn(c_int, *mut u32) -> c_int;
        c_pm_find_devices_ext:
            unsafe extern "C" fn(c_int, *mut u32, c_int, *mut u32, c_int, *mut u32) -> c_int;
        c_pm_open: unsafe extern "C" fn(*const c_char) -> c_int;
        c_pm_version: unsafe extern "C" fn(c_int, *mut RawPromiraVersion) -> c_int;
        c_pm_app_version: unsafe extern "C" fn(c_int, *const c_char, *mut RawPromiraVersion) -> c_int;
        c_pm_sleep_ms: unsafe extern "C" fn(u32) -> c_int;
        c_pm_query_net: unsafe extern "C" fn(c_int, c_int, c_int, *mut u8) -> c_int;
        c_pm_config_net: unsafe extern "C" fn(c_int, c_int, *const c_char) -> c_int;
        c_pm_query_pref: unsafe extern "C" fn(c_int, *const c_char, c_int, *mut u8) -> c_int;
        c_pm_config_pref: unsafe extern "C" fn(c_int, *const c_char, *const c_char) -> c_int;
        c_pm_apps: unsafe extern "C" fn(c_int, u16, *mut u8) -> c_int;
        c_pm_licensed_apps: unsafe extern "C" fn(c_int, u16, *mut u8) -> c_int;
        c_pm_load: unsafe extern "C" fn(c_int, *const c_char) -> c_int;
        c_pm_load_ext: unsafe extern "C" fn(c_int, *const c_char, c_int) -> c_int;
        c_pm_get_net_addr: unsafe extern "C" fn(c_int) -> *const c_char;
        c_pm_close: unsafe extern "C" fn(c_int) -> c_int;
        c_pm_unique_id: unsafe extern "C" fn(c_int) -> u32;
        c_pm_status_string: unsafe extern "C" fn(c_int) -> *const c_char;
        c_pm_init_device: unsafe extern "C" fn(c_int) -> c_int;
        c_pm_read_license: unsafe extern "C" fn(c_int, c_int, *mut u8) -> c_int;
        c_pm_features: unsafe extern "C" fn(c_int, *const c_char, u16, *mut u8) -> c_int;
        c_pm_feature_value:
            unsafe extern "C" fn(c_int, *const c_char, *const c_char, u16, *mut u8) -> c_int;
        c_pm_feature_description:
            unsafe extern "C" fn(c_int, *const c_char, *const c_char, u16, *mut u8) -> c_int;
    }
}

static PM: PlatformSymbols = PlatformSymbols::new();

/// Bind `$sym` and call it, turning a bind failure into the platform error
macro_rules! pm_call {
    ($sym:ident ( $($arg:expr),* $(,)? )) => {{
        let f = PM
            .$sym
            .get(&PLATFORM_BINDER)
            .map_err(|e| Error::Platform(e.platform_status()))?;
        // SAFETY: arguments follow the declared C signature; buffers passed
        // with a length are at least that long.
        unsafe { f($($arg),*) }
    }};
}

/// Platform management API backed by the vendor library
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePlatform;

impl NativePlatform {
    /// Handle to the process-wide platform library
    pub fn new() -> Self {
        NativePlatform
    }

    fn read_string(
        &self,
        size: usize,
        fill: impl FnOnce(&mut [u8]) -> Result<c_int>,
    ) -> Result<String> {
        let mut buf = vec![0u8; size];
        check_platform(fill(&mut buf)?)?;
        Ok(buf_to_string(&buf))
    }
}

impl PlatformApi for NativePlatform {
    fn find_devices(&self) -> Result<Vec<Ipv4Addr>> {
        let mut devices = vec![0u32; DISCOVERY_SLOTS];
        loop {
            let count = check_platform(pm_call!(c_pm_find_devices(
                devices.len() as c_int,
                devices.as_mut_ptr()
            )))? as usize;
            if count <= devices.len() {
                devices.truncate(count);
                return Ok(devices.into_iter().map(ipv4_from_raw).collect());
            }
            devices.resize(count, 0);
        }
    }

    fn find_devices_ext(&self) -> Result<Vec<DeviceInfo>> {
        let mut slots = DISCOVERY_SLOTS;
        loop {
            let mut devices = vec![0u32; slots];
            let mut ids = vec![0u32; slots];
            let mut statuses = vec![0u32; slots];
            let count = check_platform(pm_call!(c_pm_find_devices_ext(
                slots as c_int,
                devices.as_mut_ptr(),
                slots as c_int,
                ids.as_mut_ptr(),
                slots as c_int,
                statuses.as_mut_ptr(),
            )))? as usize;
            if count <= slots {
                return Ok((0..count)
                    .map(|i| DeviceInfo::from_raw(devices[i], ids[i], statuses[i]))
                    .collect());
            }
            slots = count;
        }
    }

    fn open(&self, net_addr: &str) -> Result<PlatformHandle> {
        let addr = c_string(net_addr)?;
        let pm = pm_call!(c_pm_open(addr.as_ptr()));
        if pm <= 0 {
            check_platform(pm)?;
            return Err(Error::Platform(promira_core::PlatformStatus::UnableToOpen));
        }
        log::debug!("Opened platform {} as handle {}", net_addr, pm);
        Ok(PlatformHandle(pm))
    }

    fn close(&self, pm: PlatformHandle) -> Result<()> {
        check_platform(pm_call!(c_pm_close(pm.raw())))?;
        Ok(())
    }

    fn version(&self, pm: PlatformHandle) -> Result<PromiraVersion> {
        let mut raw = RawPromiraVersion::default();
        check_platform(pm_call!(c_pm_version(pm.raw(), &mut raw)))?;
        Ok(raw.into())
    }

    fn app_version(&self, pm: PlatformHandle, app_name: &str) -> Result<PromiraVersion> {
        let app = c_string(app_name)?;
        let mut raw = RawPromiraVersion::default();
        check_platform(pm_call!(c_pm_app_version(pm.raw(), app.as_ptr(), &mut raw)))?;
        Ok(raw.into())
    }

    fn sleep_ms(&self, milliseconds: u32) -> Result<()> {
        check_platform(pm_call!(c_pm_sleep_ms(milliseconds)))?;
        Ok(())
    }

    fn query_net(&self, pm: PlatformHandle, cmd: NetCommand) -> Result<String> {
        self.read_string(STRING_BUF, |buf| {
            Ok(pm_call!(c_pm_query_net(
                pm.raw(),
                cmd as c_int,
                buf.len() as c_int,
                buf.as_mut_ptr()
            )))
        })
    }

    fn config_net(&self, pm: PlatformHandle, cmd: NetCommand, data: &str) -> Result<()> {
        let data = c_string(data)?;
        check_platform(pm_call!(c_pm_config_net(pm.raw(), cmd as c_int, data.as_ptr())))?;
        Ok(())
    }

    fn query_pref(&self, pm: PlatformHandle, key: &str) -> Result<String> {
        let key = c_string(key)?;
        self.read_string(STRING_BUF, |buf| {
            Ok(pm_call!(c_pm_query_pref(
                pm.raw(),
                key.as_ptr(),
                buf.len() as c_int,
                buf.as_mut_ptr()
            )))
        })
    }

    fn config_pref(&self, pm: PlatformHandle, key: &str, data: &str) -> Result<()> {
        let key = c_string(key)?;
        let data = c_string(data)?;
        check_platform(pm_call!(c_pm_config_pref(pm.raw(), key.as_ptr(), data.as_ptr())))?;
        Ok(())
    }

    fn apps(&self, pm: PlatformHandle) -> Result<String> {
        self.read_string(STRING_BUF, |buf| {
            Ok(pm_call!(c_pm_apps(pm.raw(), buf.len() as u16, buf.as_mut_ptr())))
        })
    }

    fn licensed_apps(&self, pm: PlatformHandle) -> Result<String> {
        self.read_string(STRING_BUF, |buf| {
            Ok(pm_call!(c_pm_licensed_apps(pm.raw(), buf.len() as u16, buf.as_mut_ptr())))
        })
    }

    fn load(&self, pm: PlatformHandle, app_name: &str) -> Result<()> {
        let app = c_string(app_name)?;
        check_platform(pm_call!(c_pm_load(pm.raw(), app.as_ptr())))?;
        Ok(())
    }

    fn load_ext(&self, pm: PlatformHandle, app_name: &str, flags: LoadFlags) -> Result<()> {
        let app = c_string(app_name)?;
        check_platform(pm_call!(c_pm_load_ext(pm.raw(), app.as_ptr(), flags.bits())))?;
        Ok(())
    }

    fn net_addr(&self, pm: PlatformHandle) -> Option<String> {
        let f = PM.c_pm_get_net_addr.get(&PLATFORM_BINDER).ok()?;
        // SAFETY: the library returns NULL or a NUL terminated string.
        unsafe { ptr_to_string(f(pm.raw())) }
    }

    fn unique_id(&self, pm: PlatformHandle) -> Result<u32> {
        Ok(pm_call!(c_pm_unique_id(pm.raw())))
    }

    fn status_string(&self, status: i32) -> Option<String> {
        let f = PM.c_pm_status_string.get(&PLATFORM_BINDER).ok()?;
        // SAFETY: the library returns NULL or a static NUL terminated string.
        unsafe { ptr_to_string(f(status)) }
    }

    fn init_device(&self, pm: PlatformHandle) -> Result<()> {
        check_platform(pm_call!(c_pm_init_device(pm.raw())))?;
        Ok(())
    }

    fn read_license(&self, pm: PlatformHandle) -> Result<String> {
        self.read_string(LICENSE_BUF, |buf| {
            Ok(pm_call!(c_pm_read_license(
                pm.raw(),
                buf.len() as c_int,
                buf.as_mut_ptr()
            )))
        })
    }

    fn features(&self, pm: PlatformHandle, app: &str) -> Result<String> {
        let app = c_string(app)?;
        self.read_string(STRING_BUF, |buf| {
            Ok(pm_call!(c_pm_features(
                pm.raw(),
                app.as_ptr(),
                buf.len() as u16,
                buf.as_mut_ptr()
            )))
        })
    }

    fn feature_value(&self, pm: PlatformHandle, app: &str, feature: &str) -> Result<String> {
        let app = c_string(app)?;
        let feature = c_string(feature)?;
        self.read_string(STRING_BUF, |buf| {
            Ok(pm_call!(c_pm_feature_value(
                pm.raw(),
                app.as_ptr(),
                feature.as_ptr(),
                buf.len() as u16,
                buf.as_mut_ptr()
            )))
        })
    }

    fn feature_description(
        &self,
        pm: PlatformHandle,
        app: &str,
        feature: &str,
    ) -> Result<String> {
        let app = c_string(app)?;
        let feature = c_string(feature)?;
        self.read_string(STRING_BUF, |buf| {
            Ok(pm_call!(c_pm_feature_description(
                pm.raw(),
                app.as_ptr(),
                feature.as_ptr(),
                buf.len() as u16,
                buf.as_mut_ptr()
            )))
        })
    }
}
