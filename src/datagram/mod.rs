//! Datagram protocol: fixed 32-byte CRC-16 packets, stop-and-wait
//! acknowledgement with a toggle bit, ring-buffered in both directions.

pub mod commands;
pub mod host;
pub mod link;
pub mod packet;
pub mod rc;
pub mod registry;

pub use host::DatagramHost;
pub use link::{DatagramLink, LinkCounters, RxOutcome, RxRing, TxRing};
pub use packet::{Message, Packet, PacketError, PACKET_LEN};
pub use rc::{FrameStatus, RcFailsafe, RcInput};
pub use registry::{DatagramArgs, DatagramCommand, DatagramTable, DispatchError};
