//! # Event subscribers.
//!
//! ```text
//! Master ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet
//!                                                              ├──► LogWriter (default)
//!                                                              └──► user subscribers
//! ```
//!
//! - [`Subscribe`] the extension trait
//! - [`SubscriberSet`] isolated, non-blocking fan-out
//! - [`LogWriter`] renders events through `tracing`

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
