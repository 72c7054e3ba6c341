//! Datagram command table: unsorted, linear scan, first match wins.

use super::packet::{Message, DATA_WORDS};
use super::rc::RcInput;

/// Handler for one datagram command. `Err(code)` reports a handler failure.
pub type DatagramHandler = fn(&mut DatagramArgs<'_>) -> Result<(), u8>;

#[derive(Clone, Copy)]
pub struct DatagramCommand {
    pub id: u8,
    pub handler: DatagramHandler,
}

pub struct DatagramArgs<'a> {
    pub id: u8,
    pub data: &'a [u16; DATA_WORDS],
    /// Message to queue back to the host, if any.
    pub reply: Option<Message>,
    pub rc: &'a RcInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    UnknownCommand,
    Handler(u8),
}

pub struct DatagramTable {
    commands: &'static [DatagramCommand],
}

impl DatagramTable {
    pub const fn new(commands: &'static [DatagramCommand]) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &'static [DatagramCommand] {
        self.commands
    }

    pub fn find(&self, id: u8) -> Option<&'static DatagramCommand> {
        self.commands.iter().find(|c| c.id == id)
    }

    pub fn dispatch(&self, args: &mut DatagramArgs<'_>) -> Result<(), DispatchError> {
        let cmd = self.find(args.id).ok_or(DispatchError::UnknownCommand)?;
        (cmd.handler)(args).map_err(DispatchError::Handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(_: &mut DatagramArgs<'_>) -> Result<(), u8> {
        Ok(())
    }

    fn second(_: &mut DatagramArgs<'_>) -> Result<(), u8> {
        Err(9)
    }

    static TABLE: [DatagramCommand; 3] = [
        DatagramCommand { id: 0x30, handler: first },
        DatagramCommand { id: 0x05, handler: second },
        DatagramCommand { id: 0x30, handler: second },
    ];

    #[test]
    fn first_match_wins() {
        let table = DatagramTable::new(&TABLE);
        let rc = RcInput::new();
        let data = [0; DATA_WORDS];
        let mut args = DatagramArgs {
            id: 0x30,
            data: &data,
            reply: None,
            rc: &rc,
        };
        assert_eq!(table.dispatch(&mut args), Ok(()));

        args.id = 0x05;
        assert_eq!(table.dispatch(&mut args), Err(DispatchError::Handler(9)));

        args.id = 0x06;
        assert_eq!(table.dispatch(&mut args), Err(DispatchError::UnknownCommand));
    }
}
