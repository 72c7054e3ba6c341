pub mod datagram;
pub mod ec_link;
pub mod host_command;

pub use datagram::{datagram_host_task, datagram_link_task, rc_failsafe_task};
pub use ec_link::{ec_link_task, EmbassyPort, LinkSink, SharedLink};
pub use host_command::host_command_task;
