//! The popup-side credential handoff: wire-message encoding, the delivery
//! state machine, and the rendered callback page.
//!
//! Everything that crosses a window boundary here is a single delimited
//! string, never a structured object, because the admin window's listener is
//! contractually a string consumer doing a prefix check.

pub mod broadcast;
pub mod message;
pub mod page;

pub use message::ExchangeResult;
