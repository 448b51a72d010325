#![allow(clippy::new_without_default)]

pub mod api;
pub mod error;
pub mod gate;
pub mod navigation;
pub mod persist;
pub mod reconcile;
pub mod resource;
pub mod sse;
pub mod store;
pub mod util;
pub mod watch;

pub use playbacker_protocol as protocol;
