//! Simulated Oberthur AWP card
//!
//! [`SimulatedCard`] keeps a file tree rooted at the MF `3F00`, enforces the
//! access conditions stored on each file, answers card control requests and
//! journals every call it receives. Faults can be queued to make a specific
//! call fail once.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]

mod card;
mod journal;
mod keygen;
mod snapshot;

pub use card::{Fault, SimulatedCard, StoredKey, StoredPin};
pub use journal::{Call, CallKind};
pub use snapshot::{CardSnapshot, FileEntry, KeyEntry, PinEntry};
