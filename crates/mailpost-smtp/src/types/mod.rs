//! Core SMTP types.

mod extension;
mod reply;

pub use extension::{AuthMechanism, Capabilities, Extension};
pub use reply::{Reply, ReplyCode};
