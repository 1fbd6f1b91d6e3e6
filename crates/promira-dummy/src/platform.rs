//! Platform management API over the emulated devices

use crate::{lock, DeviceState, State};
use promira_core::{
    DeviceInfo, Error, LoadFlags, NetCommand, PlatformApi, PlatformHandle, PlatformStatus,
    PromiraVersion, Result,
};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

/// `PlatformApi` view of a [`Dummy`](crate::Dummy)
pub struct DummyPlatform {
    state: Arc<Mutex<State>>,
}

impl DummyPlatform {
    pub(crate) fn new(state: Arc<Mutex<State>>) -> Self {
        Self { state }
    }

    /// Run `f` on the device behind an open handle
    fn with_device<T>(
        &self,
        pm: PlatformHandle,
        f: impl FnOnce(&mut DeviceState) -> Result<T>,
    ) -> Result<T> {
        let mut state = lock(&self.state);
        let index = *state
            .platforms
            .get(&pm.raw())
            .ok_or(Error::Platform(PlatformStatus::InvalidHandle))?;
        f(&mut state.devices[index])
    }
}

fn platform_err(status: PlatformStatus) -> Error {
    Error::Platform(status)
}

fn feature<'a>(
    device: &'a DeviceState,
    app: &str,
    name: &str,
) -> Result<&'a (String, String, String, String)> {
    device
        .info
        .features
        .iter()
        .find(|(a, f, _, _)| a == app && f == name)
        .ok_or(platform_err(PlatformStatus::InvalidFeature))
}

impl PlatformApi for DummyPlatform {
    fn find_devices(&self) -> Result<Vec<Ipv4Addr>> {
        Ok(self
            .find_devices_ext()?
            .into_iter()
            .map(|d| d.address)
            .collect())
    }

    fn find_devices_ext(&self) -> Result<Vec<DeviceInfo>> {
        let state = lock(&self.state);
        Ok(state
            .devices
            .iter()
            .map(|d| DeviceInfo {
                address: d.info.address,
                unique_id: d.info.unique_id,
                in_use: d.info.in_use,
            })
            .collect())
    }

    fn open(&self, net_addr: &str) -> Result<PlatformHandle> {
        let mut state = lock(&self.state);
        let index = state
            .device_by_addr(net_addr)
            .ok_or(platform_err(PlatformStatus::UnableToOpen))?;
        if state.devices[index].info.in_use {
            log::debug!("dummy {}: held by another host", net_addr);
            return Err(platform_err(PlatformStatus::UnableToOpen));
        }
        let handle = state.alloc_handle();
        state.platforms.insert(handle, index);
        log::trace!("dummy: opened platform {} as {}", net_addr, handle);
        Ok(PlatformHandle(handle))
    }

    fn close(&self, pm: PlatformHandle) -> Result<()> {
        lock(&self.state)
            .platforms
            .remove(&pm.raw())
            .map(|_| ())
            .ok_or(platform_err(PlatformStatus::InvalidHandle))
    }

    fn version(&self, pm: PlatformHandle) -> Result<PromiraVersion> {
        match self.with_device(pm, |d| Ok(d.info.version)) {
            Err(Error::Platform(PlatformStatus::InvalidHandle)) => {
                let state = lock(&self.state);
                let reference = state
                    .devices
                    .first()
                    .map(|d| d.info.version)
                    .unwrap_or_default();
                Ok(PromiraVersion {
                    software: reference.software,
                    api_req_by_sw: reference.api_req_by_sw,
                    ..Default::default()
                })
            }
            other => other,
        }
    }

    fn app_version(&self, pm: PlatformHandle, app_name: &str) -> Result<PromiraVersion> {
        self.with_device(pm, |d| {
            if !d.info.apps.iter().any(|a| a == app_name) {
                return Err(platform_err(PlatformStatus::AppNotFound));
            }
            Ok(PromiraVersion {
                firmware: d.info.app_firmware,
                ..Default::default()
            })
        })
    }

    fn sleep_ms(&self, milliseconds: u32) -> Result<()> {
        lock(&self.state).slept_ms += u64::from(milliseconds);
        Ok(())
    }

    fn query_net(&self, pm: PlatformHandle, cmd: NetCommand) -> Result<String> {
        self.with_device(pm, |d| {
            d.net
                .get(&(cmd as i32))
                .cloned()
                .ok_or(platform_err(PlatformStatus::NetconfigUnsupported))
        })
    }

    fn config_net(&self, pm: PlatformHandle, cmd: NetCommand, data: &str) -> Result<()> {
        self.with_device(pm, |d| {
            match cmd {
                NetCommand::EthIp | NetCommand::UsbIp => {
                    data.parse::<Ipv4Addr>()
                        .map_err(|_| platform_err(PlatformStatus::InvalidIpaddr))?;
                }
                NetCommand::EthNetmask | NetCommand::UsbNetmask => {
                    data.parse::<Ipv4Addr>()
                        .map_err(|_| platform_err(PlatformStatus::InvalidNetmask))?;
                }
                NetCommand::EthMac | NetCommand::UsbMac => {
                    return Err(platform_err(PlatformStatus::NetconfigUnsupported));
                }
                NetCommand::EthDhcpRenew => return Ok(()),
                _ => {}
            }
            d.net.insert(cmd as i32, data.to_string());
            Ok(())
        })
    }

    fn query_pref(&self, pm: PlatformHandle, key: &str) -> Result<String> {
        self.with_device(pm, |d| {
            d.prefs
                .get(key)
                .cloned()
                .ok_or(platform_err(PlatformStatus::ConfigError))
        })
    }

    fn config_pref(&self, pm: PlatformHandle, key: &str, data: &str) -> Result<()> {
        self.with_device(pm, |d| {
            d.prefs.insert(key.to_string(), data.to_string());
            Ok(())
        })
    }

    fn apps(&self, pm: PlatformHandle) -> Result<String> {
        self.with_device(pm, |d| Ok(d.info.apps.join(",")))
    }

    fn licensed_apps(&self, pm: PlatformHandle) -> Result<String> {
        self.with_device(pm, |d| Ok(d.info.licensed_apps.join(",")))
    }

    fn load(&self, pm: PlatformHandle, app_name: &str) -> Result<()> {
        self.load_ext(pm, app_name, LoadFlags::empty())
    }

    fn load_ext(&self, pm: PlatformHandle, app_name: &str, flags: LoadFlags) -> Result<()> {
        self.with_device(pm, |d| d.load(app_name, flags).map_err(platform_err))
    }

    fn net_addr(&self, pm: PlatformHandle) -> Option<String> {
        self.with_device(pm, |d| Ok(d.info.address.to_string())).ok()
    }

    fn unique_id(&self, pm: PlatformHandle) -> Result<u32> {
        self.with_device(pm, |d| Ok(d.info.unique_id))
    }

    fn status_string(&self, status: i32) -> Option<String> {
        PlatformStatus::from_code(status).map(|s| s.as_str().to_string())
    }

    fn init_device(&self, pm: PlatformHandle) -> Result<()> {
        self.with_device(pm, |d| {
            log::debug!("dummy {}: reset to factory state", d.info.address);
            *d = DeviceState::new(d.info.clone());
            Ok(())
        })
    }

    fn read_license(&self, pm: PlatformHandle) -> Result<String> {
        self.with_device(pm, |d| Ok(d.info.license.clone()))
    }

    fn features(&self, pm: PlatformHandle, app: &str) -> Result<String> {
        self.with_device(pm, |d| {
            if !d.info.licensed_apps.iter().any(|a| a == app) {
                return Err(platform_err(PlatformStatus::UnlicensedApp));
            }
            let names: Vec<&str> = d
                .info
                .features
                .iter()
                .filter(|(a, _, _, _)| a == app)
                .map(|(_, f, _, _)| f.as_str())
                .collect();
            Ok(names.join(","))
        })
    }

    fn feature_value(&self, pm: PlatformHandle, app: &str, name: &str) -> Result<String> {
        self.with_device(pm, |d| Ok(feature(d, app, name)?.2.clone()))
    }

    fn feature_description(&self, pm: PlatformHandle, app: &str, name: &str) -> Result<String> {
        self.with_device(pm, |d| Ok(feature(d, app, name)?.3.clone()))
    }
}
