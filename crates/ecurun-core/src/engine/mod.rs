pub mod interrupt;
pub mod progress;
pub mod supervisor;

pub use interrupt::{Interrupt, InterruptTrigger};
pub use progress::{Heartbeat, HeartbeatSink};
pub use supervisor::Supervisor;
