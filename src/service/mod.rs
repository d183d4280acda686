pub mod glue;
pub mod signals;

pub use glue::{ConfigSource, GlueService};
pub use signals::{SignalHandler, SignalType};
