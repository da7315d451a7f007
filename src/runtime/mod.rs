//! Runtime support for streaming node graphs

pub mod errors;
pub mod node;
pub mod receiver;
pub mod sample;
pub mod scheduler;
pub mod sender;
pub mod watchdog;

pub use errors::{WorkError, WorkResult};
pub use node::ProcessNode;
pub use receiver::Receiver;
pub use sample::Sample;
pub use scheduler::{NodeExit, NodeReport, Scheduler};
pub use sender::{ChannelMessage, Sender};
pub use watchdog::Watchdog;
