//! Command queues and collected responses

use promira_core::{AppStatus, Command, I2cFlags, ModuleId, Response, SpiIoMode};
use std::collections::VecDeque;

/// One command waiting in a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QueuedCmd {
    I2cWrite {
        addr: u16,
        flags: I2cFlags,
        data: Vec<u8>,
    },
    I2cRead {
        addr: u16,
        flags: I2cFlags,
        len: usize,
    },
    DelayMs(i32),
    SpiOe(bool),
    SpiSs(u8),
    SpiDelayCycles(u32),
    SpiDelayNs(u32),
    /// Bytes to clock out; MISO comes back as a `SpiRead` response
    SpiShift { io: SpiIoMode, mosi: Vec<u8> },
}

impl QueuedCmd {
    /// Module a queue must be created for to accept this command
    pub fn module(&self) -> Option<ModuleId> {
        match self {
            QueuedCmd::I2cWrite { .. } | QueuedCmd::I2cRead { .. } => Some(ModuleId::I2cActive),
            QueuedCmd::DelayMs(_) => None,
            _ => Some(ModuleId::SpiActive),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Queue {
    pub module: ModuleId,
    pub conn: i32,
    pub cmds: Vec<QueuedCmd>,
}

impl Queue {
    pub fn new(module: ModuleId, conn: i32) -> Self {
        Self {
            module,
            conn,
            cmds: Vec::new(),
        }
    }

    pub fn push(&mut self, cmd: QueuedCmd) -> Result<(), AppStatus> {
        match cmd.module() {
            Some(module) if module != self.module => Err(AppStatus::QueueInvalidCmdType),
            _ => {
                self.cmds.push(cmd);
                Ok(())
            }
        }
    }

    /// Response type of a delay on this queue
    pub fn delay_command(&self) -> Command {
        match self.module {
            ModuleId::I2cActive => Command::I2cDelayMs,
            ModuleId::SpiActive => Command::SpiDelayMs,
            ModuleId::Gpio => Command::GpioDelayMs,
        }
    }
}

/// Response produced by running one queued command
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Collected {
    pub command: Command,
    pub result: i32,
    pub data: Vec<u8>,
}

impl Collected {
    pub fn status(command: Command, result: i32) -> Self {
        Self {
            command,
            result,
            data: Vec::new(),
        }
    }

    pub fn response(&self) -> Response {
        Response {
            command: self.command as i32,
            length: self.data.len() as i32,
            result: self.result,
        }
    }
}

/// Responses of one submitted queue
#[derive(Debug, Default)]
pub(crate) struct Collect {
    pending: VecDeque<Collected>,
    current: Option<Collected>,
}

impl Collect {
    pub fn new(responses: Vec<Collected>) -> Self {
        Self {
            pending: responses.into(),
            current: None,
        }
    }

    /// Advance to the next response
    pub fn next(&mut self) -> Option<Response> {
        self.current = self.pending.pop_front();
        self.current.as_ref().map(Collected::response)
    }

    /// The current response, if it has type `command`
    pub fn current(&self, command: Command) -> Result<&Collected, AppStatus> {
        match &self.current {
            Some(c) if c.command == command => Ok(c),
            _ => Err(AppStatus::MismatchedCmd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_rejects_foreign_commands() {
        let mut queue = Queue::new(ModuleId::SpiActive, 1);
        assert_eq!(
            queue.push(QueuedCmd::I2cRead {
                addr: 0x50,
                flags: I2cFlags::empty(),
                len: 1
            }),
            Err(AppStatus::QueueInvalidCmdType)
        );
        assert_eq!(queue.push(QueuedCmd::SpiSs(1)), Ok(()));
        assert_eq!(queue.push(QueuedCmd::DelayMs(5)), Ok(()));
        assert_eq!(queue.cmds.len(), 2);
        assert_eq!(queue.delay_command(), Command::SpiDelayMs);
    }

    #[test]
    fn test_collect_walks_responses() {
        let mut collect = Collect::new(vec![
            Collected::status(Command::SpiOe, 0),
            Collected {
                command: Command::SpiRead,
                result: 2,
                data: vec![0xaa, 0xbb],
            },
        ]);
        assert!(collect.current(Command::SpiOe).is_err());

        let first = collect.next().unwrap();
        assert_eq!(first.kind(), Some(Command::SpiOe));
        assert_eq!(
            collect.current(Command::SpiRead),
            Err(AppStatus::MismatchedCmd)
        );

        let second = collect.next().unwrap();
        assert_eq!(second.length, 2);
        assert_eq!(collect.current(Command::SpiRead).unwrap().data, vec![0xaa, 0xbb]);

        assert_eq!(collect.next(), None);
    }
}
