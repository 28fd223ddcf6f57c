//! Shared fixtures for personalization tests

#![allow(dead_code, unreachable_pub)]

use awp_core::prelude::*;
use awp_core::profile::names;
use awp_core::{KeyId, StaticProfile};
use awp_pkcs15init::Personalizer;
use awp_sim::{Call, SimulatedCard};

pub type TestPersonalizer = Personalizer<SimulatedCard, StaticProfile>;

pub fn path(hex: &str) -> Path {
    Path::from_hex(hex).unwrap()
}

/// Stock profile without a label, so tokens fall back to the default label
pub fn profile() -> StaticProfile {
    let mut profile = StaticProfile::oberthur_default();
    profile.label = None;
    profile
}

pub fn personalizer(profile: StaticProfile) -> TestPersonalizer {
    Personalizer::new(SimulatedCard::new(), profile)
}

/// Personalizer over a card that already holds the AWP file tree
pub fn initialized(profile: StaticProfile) -> TestPersonalizer {
    let mut p = personalizer(profile);
    let root = p.profile().df_info().unwrap();
    p.create_dir(&root).unwrap();
    p.session_mut().card_mut().clear_journal();
    p
}

pub fn file(p: &TestPersonalizer, name: &str) -> FileDescriptor {
    p.profile().file(name).unwrap()
}

pub fn token_info(p: &TestPersonalizer) -> TokenInfo {
    let path = file(p, names::TOKEN_INFO).path;
    p.card().token_info(&path).unwrap()
}

pub fn journal(p: &TestPersonalizer) -> &[Call] {
    p.card().journal()
}

pub fn control_count(p: &TestPersonalizer) -> usize {
    journal(p)
        .iter()
        .filter(|call| matches!(call, Call::Control { .. }))
        .count()
}

pub fn updates_of(p: &TestPersonalizer, target: &Path) -> usize {
    journal(p)
        .iter()
        .filter(|call| matches!(call, Call::Update { path, .. } if path == target))
        .count()
}

/// 1024-bit RSA private key object in slot 1 of the private DF
pub fn rsa_key_object() -> KeyObject {
    KeyObject {
        id: KeyId::new([0x45, 0x01]),
        object_type: ObjectType::PRKEY_RSA,
        modulus_bits: 1024,
        path: path("3F00501190023001"),
        key_reference: 1,
    }
}
