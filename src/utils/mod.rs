pub mod channels;
pub mod logging;

pub use channels::SessionChannels;
pub use logging::init_tracing;
