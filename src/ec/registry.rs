//! EC host command table and dispatch.

use super::host::{HostState, Platform};
use super::wire::{ver_mask, Status};

/// Handler for one command. The returned status becomes the response result.
pub type Handler = fn(&mut HandlerArgs<'_>) -> Status;

/// One entry of the command table.
#[derive(Clone, Copy)]
pub struct HostCommand {
    pub command: u16,
    /// Bit `n` set means version `n` is supported.
    pub version_mask: u32,
    pub handler: Handler,
}

/// Context handed to a handler for one invocation.
///
/// `response` is the whole payload area of the response buffer; a handler
/// fills a prefix of it and records the length in `response_size`.
pub struct HandlerArgs<'a> {
    pub command: u16,
    pub version: u8,
    pub params: &'a [u8],
    pub response: &'a mut [u8],
    pub response_size: usize,
    pub host: &'a mut HostState,
    pub table: &'a CommandTable,
    pub platform: &'a mut dyn Platform,
}

impl HandlerArgs<'_> {
    pub fn response_max(&self) -> usize {
        self.response.len()
    }

    pub fn param_u8(&self, offset: usize) -> Option<u8> {
        self.params.get(offset).copied()
    }

    pub fn param_u16(&self, offset: usize) -> Option<u16> {
        let b = self.params.get(offset..offset + 2)?;
        Some(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn param_u32(&self, offset: usize) -> Option<u32> {
        let b = self.params.get(offset..offset + 4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Copy `bytes` in as the response payload.
    pub fn reply(&mut self, bytes: &[u8]) -> Status {
        match self.response.get_mut(..bytes.len()) {
            Some(out) => {
                out.copy_from_slice(bytes);
                self.response_size = bytes.len();
                Status::Success
            }
            None => Status::ResponseTooBig,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TableError {
    /// Entry `index` is not strictly greater than the one before it.
    Unsorted { index: usize },
}

/// Command table sorted by code, looked up by binary search.
pub struct CommandTable {
    commands: &'static [HostCommand],
}

impl CommandTable {
    /// Build a table, panicking if the codes are not strictly ascending.
    ///
    /// Used in a `static` initialiser this turns an unsorted or duplicated
    /// table into a compile error.
    pub const fn new(commands: &'static [HostCommand]) -> Self {
        let mut i = 1;
        while i < commands.len() {
            if commands[i - 1].command >= commands[i].command {
                panic!("host command table must be sorted by code without duplicates");
            }
            i += 1;
        }
        Self { commands }
    }

    pub fn try_new(commands: &'static [HostCommand]) -> Result<Self, TableError> {
        for (i, pair) in commands.windows(2).enumerate() {
            if pair[0].command >= pair[1].command {
                return Err(TableError::Unsorted { index: i + 1 });
            }
        }
        Ok(Self { commands })
    }

    pub fn commands(&self) -> &'static [HostCommand] {
        self.commands
    }

    pub fn find(&self, command: u16) -> Option<&'static HostCommand> {
        let commands = self.commands;
        commands
            .binary_search_by_key(&command, |c| c.command)
            .ok()
            .map(|i| &commands[i])
    }

    /// Look up `args.command`, check the version and run the handler.
    pub fn dispatch(&self, args: &mut HandlerArgs<'_>) -> Status {
        let Some(cmd) = self.find(args.command) else {
            warn!("host cmd 0x{:04X}: unknown", args.command);
            return Status::InvalidCommand;
        };
        if args.version >= 32 || ver_mask(args.version) & cmd.version_mask == 0 {
            warn!("host cmd 0x{:04X}: version {} unsupported", args.command, args.version);
            return Status::InvalidVersion;
        }
        (cmd.handler)(args)
    }
}
