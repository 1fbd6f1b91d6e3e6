//! Open platform, application connection and channel
//!
//! Every sample command needs the same three handles. [`Session`] opens them
//! in order, loading the promact_is application on the way, and releases
//! them again when dropped.

use promira_core::{
    ChannelHandle, CollectHandle, Command, ConnectionHandle, Error, PlatformApi, PlatformHandle,
    Promact, PROMACT_IS_APP,
};
use thiserror::Error as ThisError;

/// Stage of [`Session::open`] that failed
#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error("Unable to open Promira platform on {addr}\nError code = {}", .source.code())]
    Platform { addr: String, source: Error },

    #[error("Unable to load the application({app})\nError code = {}", .source.code())]
    Load { app: &'static str, source: Error },

    #[error("Unable to open the application on {addr}\nError code = {}", .source.code())]
    Connect { addr: String, source: Error },

    #[error("Unable to open the channel on {addr}\nError code = {}", .source.code())]
    Channel { addr: String, source: Error },
}

impl SessionError {
    /// Underlying API error
    pub fn api_error(&self) -> &Error {
        match self {
            SessionError::Platform { source, .. }
            | SessionError::Load { source, .. }
            | SessionError::Connect { source, .. }
            | SessionError::Channel { source, .. } => source,
        }
    }
}

/// A channel on the promact_is application of one platform
pub struct Session<'a> {
    platform: &'a dyn PlatformApi,
    app: &'a dyn Promact,
    pm: PlatformHandle,
    conn: ConnectionHandle,
    channel: ChannelHandle,
}

impl<'a> Session<'a> {
    /// Open the platform at `addr`, load promact_is, connect and open a channel
    ///
    /// Handles opened before a failing stage are released again.
    pub fn open(
        platform: &'a dyn PlatformApi,
        app: &'a dyn Promact,
        addr: &str,
    ) -> Result<Self, SessionError> {
        let pm = platform.open(addr).map_err(|source| SessionError::Platform {
            addr: addr.to_string(),
            source,
        })?;

        if let Err(source) = platform.load(pm, PROMACT_IS_APP) {
            let _ = platform.close(pm);
            return Err(SessionError::Load {
                app: PROMACT_IS_APP,
                source,
            });
        }

        let conn = match app.connect(addr) {
            Ok(conn) => conn,
            Err(source) => {
                let _ = platform.close(pm);
                return Err(SessionError::Connect {
                    addr: addr.to_string(),
                    source,
                });
            }
        };

        let channel = match app.channel_open(conn) {
            Ok(channel) => channel,
            Err(source) => {
                let _ = app.disconnect(conn);
                let _ = platform.close(pm);
                return Err(SessionError::Channel {
                    addr: addr.to_string(),
                    source,
                });
            }
        };

        log::debug!(
            "Opened {}: platform {}, connection {}, channel {}",
            addr,
            pm,
            conn,
            channel
        );
        Ok(Self {
            platform,
            app,
            pm,
            conn,
            channel,
        })
    }

    pub fn platform(&self) -> &'a dyn PlatformApi {
        self.platform
    }

    pub fn app(&self) -> &'a dyn Promact {
        self.app
    }

    pub fn pm(&self) -> PlatformHandle {
        self.pm
    }

    pub fn conn(&self) -> ConnectionHandle {
        self.conn
    }

    pub fn channel(&self) -> ChannelHandle {
        self.channel
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.app.channel_close(self.channel) {
            log::debug!("Closing channel {}: {}", self.channel, e);
        }
        if let Err(e) = self.app.disconnect(self.conn) {
            log::debug!("Disconnecting {}: {}", self.conn, e);
        }
        if let Err(e) = self.platform.close(self.pm) {
            log::debug!("Closing platform {}: {}", self.pm, e);
        }
    }
}

/// Drain every response of a submitted queue
///
/// Data of SPI read responses is copied into `buf` back to back until it is
/// full. Returns the number of bytes copied.
pub fn collect_all(
    app: &dyn Promact,
    collect: CollectHandle,
    buf: &mut [u8],
) -> promira_core::Result<usize> {
    let mut offset = 0;
    while let Some(resp) = app.collect_resp(collect, -1)? {
        if resp.kind() == Some(Command::SpiRead) && offset < buf.len() {
            offset += app.collect_spi_read(collect, &mut buf[offset..])?;
        }
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promira_core::{AppApi, ModuleId, PlatformStatus, SpiApi, SpiIoMode};
    use promira_dummy::{Dummy, DummyConfig, DummyDevice};

    const ADDR: &str = "192.168.11.240";

    #[test]
    fn test_open_loads_app_and_drop_closes() {
        let dummy = Dummy::new_default();
        let (platform, app) = (dummy.platform(), dummy.app());
        let channel = {
            let session = Session::open(&platform, &app, ADDR).unwrap();
            assert_eq!(
                dummy.loaded_app(ADDR.parse().unwrap()).as_deref(),
                Some(PROMACT_IS_APP)
            );
            session.channel()
        };
        assert!(app.channel_close(channel).is_err());
    }

    #[test]
    fn test_open_unknown_address() {
        let dummy = Dummy::new_default();
        let (platform, app) = (dummy.platform(), dummy.app());
        let err = Session::open(&platform, &app, "10.0.0.1").err().unwrap();
        assert_eq!(
            err.to_string(),
            format!(
                "Unable to open Promira platform on 10.0.0.1\nError code = {}",
                PlatformStatus::UnableToOpen.code()
            )
        );
    }

    #[test]
    fn test_missing_app_fails_load_stage() {
        let dummy = Dummy::new(DummyConfig {
            devices: vec![DummyDevice {
                apps: vec![],
                ..DummyDevice::default()
            }],
            ..DummyConfig::default()
        });
        let (platform, app) = (dummy.platform(), dummy.app());
        let err = Session::open(&platform, &app, ADDR).err().unwrap();
        assert!(matches!(err, SessionError::Load { .. }));
        assert_eq!(
            err.api_error(),
            &Error::Platform(PlatformStatus::AppNotFound)
        );
        assert!(err
            .to_string()
            .starts_with("Unable to load the application(com.totalphase.promact_is)"));
    }

    #[test]
    fn test_collect_all_concatenates_spi_reads() {
        let dummy = Dummy::new_default();
        let (platform, app) = (dummy.platform(), dummy.app());
        let session = Session::open(&platform, &app, ADDR).unwrap();
        let queue = app.queue_create(session.conn(), ModuleId::SpiActive).unwrap();
        app.queue_spi_oe(queue, true).unwrap();
        app.queue_spi_ss(queue, 0x1).unwrap();
        app.queue_spi_write(queue, SpiIoMode::Standard, 8, 2, &[0x05, 0x00])
            .unwrap();
        app.queue_spi_read(queue, SpiIoMode::Standard, 8, 3).unwrap();
        app.queue_spi_ss(queue, 0).unwrap();

        let collect = app.queue_submit(queue, session.channel(), 0).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(collect_all(&app, collect, &mut buf).unwrap(), 5);

        // A short buffer takes what fits
        let collect = app.queue_submit(queue, session.channel(), 0).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(collect_all(&app, collect, &mut buf).unwrap(), 3);
    }
}
