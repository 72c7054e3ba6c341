use hostcmd_embassy::config::{DATAGRAM_FEATURES, FW_VERSION};
use hostcmd_embassy::datagram::commands::BUILTIN_TABLE;
use hostcmd_embassy::datagram::packet::{flags, id, DATA_WORDS};
use hostcmd_embassy::datagram::{
    DatagramHost, DatagramLink, FrameStatus, Packet, PacketError, RcInput, RxOutcome, RxRing, TxRing,
};
use std::boxed::Box;

struct Rig {
    link: DatagramLink<'static>,
    host: DatagramHost<'static>,
    rc: &'static RcInput,
}

impl Rig {
    fn new() -> Self {
        let rx: &'static RxRing = Box::leak(Box::new(RxRing::new()));
        let tx: &'static TxRing = Box::leak(Box::new(TxRing::new()));
        let rc: &'static RcInput = Box::leak(Box::new(RcInput::new()));
        Self {
            link: DatagramLink::new(rx, tx),
            host: DatagramHost::new(&BUILTIN_TABLE, rx, tx, rc),
            rc,
        }
    }

    /// One bus cycle as the host sees it.
    fn cycle(&mut self, packet: &Packet) -> (Result<RxOutcome, PacketError>, Packet) {
        let (res, reply) = self.link.exchange(&packet.encode());
        (res, Packet::decode_reply(&reply).unwrap())
    }
}

fn from_host(id: u8, extra_flags: u8, data: [u16; DATA_WORDS]) -> Packet {
    Packet {
        id,
        flags: flags::MOSI | extra_flags,
        data,
    }
}

fn idle() -> Packet {
    from_host(id::INVALID, 0, [0; DATA_WORDS])
}

#[test]
fn req_info_round_trip_with_lost_ack() {
    let mut rig = Rig::new();
    let req = from_host(id::REQ_INFO, flags::ACKREQ, [0; DATA_WORDS]);

    let (res, ack) = rig.cycle(&req);
    assert_eq!(res, Ok(RxOutcome::Delivered));
    assert_eq!((ack.id, ack.flags), (id::ACK, flags::ACK));

    // Host missed the ack and repeats itself.
    let (res, ack) = rig.cycle(&req);
    assert_eq!(res, Ok(RxOutcome::Duplicate));
    assert_eq!(ack.id, id::ACK);

    assert_eq!(rig.host.process_one(), Some(Ok(())));
    assert!(!rig.host.has_pending());

    let (_, info) = rig.cycle(&idle());
    assert_eq!(info.id, id::RES_INFO);
    assert_eq!(info.flags, flags::ACKREQ);
    assert_eq!(info.data[0] >> 8, FW_VERSION & 0xFF);
    assert_eq!(u32::from(info.data[12]) | u32::from(info.data[13]) << 16, DATAGRAM_FEATURES);

    // Not acked yet: it comes again.
    let (_, again) = rig.cycle(&idle());
    assert_eq!(again, info);

    let (_, after) = rig.cycle(&from_host(id::ACK, flags::ACK, [0; DATA_WORDS]));
    assert_eq!(after.id, id::INVALID);
    assert!(rig.link.tx_toggle());
    assert_eq!(rig.link.counters().acked, 1);
    assert_eq!(rig.link.counters().retransmits, 1);
}

#[test]
fn rc_data_reaches_rc_input() {
    let mut rig = Rig::new();
    let mut data = [0u16; DATA_WORDS];
    data[..4].copy_from_slice(&[1000, 1250, 1500, 2000]);

    let (res, reply) = rig.cycle(&from_host(id::SET_RC_DATA, 0, data));
    assert_eq!(res, Ok(RxOutcome::Delivered));
    assert_eq!(reply.id, id::INVALID);

    assert_eq!(rig.rc.check_received(), FrameStatus::Pending);
    assert_eq!(rig.host.process_one(), Some(Ok(())));
    assert_eq!(rig.rc.check_received(), FrameStatus::Complete);
    assert_eq!(rig.rc.raw(1), 1250);
}

#[test]
fn noise_does_not_disturb_delivery_state() {
    let mut rig = Rig::new();
    let req = from_host(id::SET_RC_DATA, flags::ACKREQ | flags::ACKTGL, [5; DATA_WORDS]);
    let (res, _) = rig.cycle(&req);
    assert_eq!(res, Ok(RxOutcome::Delivered));
    let before = rig.link.rx_toggle();

    let mut raw = from_host(id::SET_RC_DATA, flags::ACKREQ, [6; DATA_WORDS]).encode();
    raw[31] ^= 0x04;
    let (res, reply) = rig.link.exchange(&raw);
    assert_eq!(res, Err(PacketError::CrcMismatch));
    assert_eq!(rig.link.rx_toggle(), before);
    assert_eq!(Packet::decode_reply(&reply).unwrap().id, id::INVALID);

    // An all-zero cycle (host not talking) is not a host packet.
    let (res, _) = rig.link.exchange(&[0u8; 32]);
    assert_eq!(res, Err(PacketError::NoDirection));
    assert_eq!(rig.link.counters().no_direction, 1);
}

#[test]
fn unknown_command_is_answered_with_status() {
    let mut rig = Rig::new();
    let (res, _) = rig.cycle(&from_host(0x77, 0, [0; DATA_WORDS]));
    assert_eq!(res, Ok(RxOutcome::Delivered));
    assert!(rig.host.process_one().is_some());
    let (_, status) = rig.cycle(&idle());
    assert_eq!(status.id, id::UNKNOWN_COMMAND);
    assert_eq!(status.data[0], 0x77);
}
