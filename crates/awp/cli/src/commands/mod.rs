//! Command implementations for the CLI

mod card_operations;
mod personalize;

pub(crate) use card_operations::*;
pub(crate) use personalize::*;

use awp_core::StaticProfile;
use awp_pkcs15init::Personalizer;
use awp_sim::SimulatedCard;

/// Personalizer driving the simulated card
pub(crate) type CardPersonalizer = Personalizer<SimulatedCard, StaticProfile>;
