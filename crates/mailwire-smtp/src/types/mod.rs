//! Core SMTP types.

mod address;
mod dsn;
mod extension;
mod reply;

pub use address::Address;
pub use dsn::{Dsn, DsnNotify, DsnRet, xtext};
pub use extension::{AuthMechanism, Extension};
pub use reply::{Reply, ReplyClass, ReplyCode};
