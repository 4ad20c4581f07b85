//! In-process pub/sub for application lifecycle transitions and
//! deployment log lines.

mod bus;

pub use bus::{Event, EventBus};
