//! Personalization protocols, one module per operation family

pub(crate) mod delete;
pub(crate) mod directory;
pub(crate) mod erase;
pub(crate) mod generate_key;
pub(crate) mod key_file;
pub(crate) mod pin;
pub(crate) mod store_key;
pub(crate) mod token_info;
