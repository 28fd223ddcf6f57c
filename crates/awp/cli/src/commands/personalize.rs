//! Full personalization run

use awp_core::PrivateKey;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::{CardPersonalizer, init_command};
use crate::config::{Config, KeyConfig, PinConfig};

/// Initialize the card, then provision every configured PIN and key
pub(crate) fn personalize_command(
    personalizer: &mut CardPersonalizer,
    config: &Config,
) -> eyre::Result<()> {
    init_command(personalizer)?;

    for pin in &config.pins {
        provision_pin(personalizer, pin)?;
    }
    for key in &config.keys {
        provision_key(personalizer, key)?;
    }

    println!("Card personalized.");
    println!("  Token flags: {}", personalizer.token().flags());
    Ok(())
}

fn provision_pin(personalizer: &mut CardPersonalizer, config: &PinConfig) -> eyre::Result<()> {
    let mut credential = config.credential.clone();
    personalizer.select_pin_reference(&mut credential)?;
    debug!(label = %credential.label, reference = ?credential.reference, "Provisioning PIN");

    let value = Zeroizing::new(config.value.clone().into_bytes());
    let puk = config
        .puk
        .as_ref()
        .map(|puk| Zeroizing::new(puk.clone().into_bytes()));
    personalizer.create_pin(
        &mut credential,
        Some(value.as_slice()),
        puk.as_deref().map(Vec::as_slice),
    )?;

    println!(
        "PIN '{}' created at reference {:#04x}",
        credential.label,
        credential.reference.unwrap_or_default()
    );
    Ok(())
}

fn provision_key(personalizer: &mut CardPersonalizer, config: &KeyConfig) -> eyre::Result<()> {
    let mut object = config.object.clone();
    personalizer.create_key(&mut object)?;

    match &config.import {
        Some(key) => {
            personalizer.store_key(&object, &PrivateKey::Rsa(key.clone()))?;
            info!(id = %object.id, path = %object.path, "Imported private key");
            println!("Key {} imported into {}", object.id, object.path);
        }
        None => {
            let public = personalizer.generate_key(&mut object)?;
            println!("Key {} generated in {}", object.id, object.path);
            println!("  Modulus: {}", hex::encode(&public.modulus));
            println!("  Exponent: {}", hex::encode(&public.exponent));
        }
    }
    println!("  Key reference: {:#04x}", object.key_reference);
    Ok(())
}
