//! Task-side processing of delivered datagram commands.

use super::link::{RxRing, TxRing};
use super::packet::{id, Message, DATA_WORDS};
use super::rc::RcInput;
use super::registry::{DatagramArgs, DatagramTable, DispatchError};

pub struct DatagramHost<'a> {
    table: &'a DatagramTable,
    rx_ring: &'a RxRing,
    tx_ring: &'a TxRing,
    rc: &'a RcInput,
}

impl<'a> DatagramHost<'a> {
    pub fn new(table: &'a DatagramTable, rx_ring: &'a RxRing, tx_ring: &'a TxRing, rc: &'a RcInput) -> Self {
        Self {
            table,
            rx_ring,
            tx_ring,
            rc,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.rx_ring.is_empty()
    }

    /// Run the oldest delivered command. Failures are reported back to the
    /// host as a status message carrying the command id.
    pub fn process_one(&mut self) -> Option<Result<(), DispatchError>> {
        let msg = self.rx_ring.pop().ok()?;

        let mut args = DatagramArgs {
            id: msg.id,
            data: &msg.data,
            reply: None,
            rc: self.rc,
        };
        let res = self.table.dispatch(&mut args);
        let reply = args.reply;

        let out = match res {
            Ok(()) => reply,
            Err(DispatchError::UnknownCommand) => {
                warn!("datagram: unknown command 0x{:02X}", msg.id);
                Some(status(id::UNKNOWN_COMMAND, msg.id, 0))
            }
            Err(DispatchError::Handler(code)) => {
                warn!("datagram: command 0x{:02X} failed: {}", msg.id, code);
                Some(status(id::HANDLER_ERROR, msg.id, code))
            }
        };

        if let Some(out) = out {
            if self.tx_ring.push(out).is_err() {
                warn!("datagram: tx ring full, reply 0x{:02X} lost", out.id);
            }
        }
        Some(res)
    }
}

fn status(code: u8, command: u8, detail: u8) -> Message {
    let mut data = [0u16; DATA_WORDS];
    data[0] = command.into();
    data[1] = detail.into();
    Message::new(code, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagram::commands::{feature, BUILTIN_TABLE};
    use crate::datagram::rc::FrameStatus;

    #[test]
    fn req_info_queues_reply() {
        let rx = RxRing::new();
        let tx = TxRing::new();
        let rc = RcInput::new();
        let mut host = DatagramHost::new(&BUILTIN_TABLE, &rx, &tx, &rc);
        assert!(!host.has_pending());

        rx.push(Message::new(id::REQ_INFO, [0; DATA_WORDS])).unwrap();
        assert!(host.has_pending());
        assert_eq!(host.process_one(), Some(Ok(())));
        assert!(!host.has_pending());

        let reply = tx.pop().unwrap();
        assert_eq!(reply.id, id::RES_INFO);
        assert_eq!(reply.data[0] & 0xFF, 1);
        let features = u32::from(reply.data[12]) | u32::from(reply.data[13]) << 16;
        assert_eq!(features, crate::config::DATAGRAM_FEATURES);
        assert_ne!(features & feature::PWM_OUT, 0);
    }

    #[test]
    fn set_rc_data_feeds_rc_input() {
        let rx = RxRing::new();
        let tx = TxRing::new();
        let rc = RcInput::new();
        let mut host = DatagramHost::new(&BUILTIN_TABLE, &rx, &tx, &rc);
        let mut data = [0u16; DATA_WORDS];
        data[..5].copy_from_slice(&[1100, 1200, 1300, 1400, 1500]);
        rx.push(Message::new(id::SET_RC_DATA, data)).unwrap();

        assert_eq!(host.process_one(), Some(Ok(())));
        assert!(tx.is_empty());
        assert_eq!(rc.check_received(), FrameStatus::Complete);
        assert_eq!(rc.raw(3), 1400);
        assert_eq!(rc.raw(4), 0);
    }

    #[test]
    fn unknown_command_is_reported() {
        let rx = RxRing::new();
        let tx = TxRing::new();
        let rc = RcInput::new();
        let mut host = DatagramHost::new(&BUILTIN_TABLE, &rx, &tx, &rc);
        rx.push(Message::new(0x42, [0; DATA_WORDS])).unwrap();
        assert_eq!(host.process_one(), Some(Err(DispatchError::UnknownCommand)));
        let st = tx.pop().unwrap();
        assert_eq!((st.id, st.data[0]), (id::UNKNOWN_COMMAND, 0x42));
        assert_eq!(host.process_one(), None);
    }
}
