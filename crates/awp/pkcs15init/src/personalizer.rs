//! Personalization facade
//!
//! Bundles the card session, the profile and the live token state that every
//! protocol step reads or updates.

use awp_core::prelude::*;

/// Oberthur AWP personalization driver
#[derive(Debug)]
pub struct Personalizer<C, P> {
    /// Card session
    pub(crate) session: Session<C>,
    /// File templates and PIN policies
    pub(crate) profile: P,
    /// Single copy of the token status
    pub(crate) token: TokenState,
}

impl<C: Card, P: Profile> Personalizer<C, P> {
    /// Create a personalizer for a card without a known label
    pub fn new(card: C, profile: P) -> Self {
        Self::with_session(Session::new(card), profile)
    }

    /// Create a personalizer over an existing session
    pub fn with_session(session: Session<C>, profile: P) -> Self {
        Self {
            session,
            profile,
            token: TokenState::default(),
        }
    }

    /// Builder-style token state, e.g. from a label already read off the card
    pub fn with_token_state(mut self, token: TokenState) -> Self {
        self.token = token;
        self
    }

    /// Card session
    pub const fn session(&self) -> &Session<C> {
        &self.session
    }

    /// Mutable card session
    pub fn session_mut(&mut self) -> &mut Session<C> {
        &mut self.session
    }

    /// The underlying card
    pub const fn card(&self) -> &C {
        self.session.card()
    }

    /// Profile in use
    pub const fn profile(&self) -> &P {
        &self.profile
    }

    /// Current token state
    pub const fn token(&self) -> &TokenState {
        &self.token
    }

    /// Resolve a file the protocol requires
    pub(crate) fn required_file(&self, name: &str) -> Result<FileDescriptor> {
        self.profile
            .file(name)
            .ok_or_else(|| Error::missing_template(name))
    }
}
