//! PKCS#15 personalization of Oberthur AuthentIC Web Pack cards
//!
//! [`Personalizer`] drives the card-family-specific protocols over an owned
//! [`Session`](awp_core::Session):
//!
//! - [`Personalizer::erase_card`] and [`Personalizer::create_dir`] tear down
//!   and build the AWP file tree
//! - [`Personalizer::select_pin_reference`] and [`Personalizer::create_pin`]
//!   provision PIN and PUK credentials into their fixed card slots
//! - [`Personalizer::create_key`], [`Personalizer::generate_key`] and
//!   [`Personalizer::store_key`] allocate key files and fill them
//! - [`Personalizer::write_token_info`] maintains the TokenInfo record
//!
//! Every protocol fails fast. Nothing already written to the card is rolled
//! back; a later erase reclaims whatever an aborted sequence left behind.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]

mod constants;
mod ops;
mod personalizer;

pub use constants::*;
pub use ops::key_file::KeyFileRule;
pub use personalizer::Personalizer;
