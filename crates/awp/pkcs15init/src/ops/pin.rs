//! PIN and PUK provisioning
//!
//! The card has fixed slots: the security officer PIN and every unblocking
//! PIN live at reference 4, the default user PIN at 1, and PINs local to the
//! application DF carry the `0x80` bit on top. Only user PINs (`0x81`) and user
//! PUKs (`0x84`) are actually created; the security officer PIN is fixed by
//! the card.

use awp_core::prelude::*;
use awp_core::profile::names;
use awp_core::{ControlRequest, PinType};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::{
    LOCAL_PIN_BIT, MAX_PIN_LENGTH, Personalizer, RECOVERY_PUK, RECOVERY_PUK_TRIES,
    SO_PIN_REFERENCE, USER_PIN_DEFAULT_REFERENCE, USER_PIN_REFERENCE, USER_PUK_REFERENCE,
};

impl<C: Card, P: Profile> Personalizer<C, P> {
    fn app_df(&self) -> Result<FileDescriptor> {
        self.required_file(names::APP_DF)
    }

    /// Assign the card slot of `pin` if it has none yet
    ///
    /// Reference 0 counts as unassigned. Local credentials are moved under the
    /// application DF.
    pub fn select_pin_reference(&self, pin: &mut PinCredential) -> Result<()> {
        let app_df = self.app_df()?;
        if pin.is_local() {
            pin.path = Some(app_df.path);
        }

        if matches!(pin.reference, None | Some(0)) {
            let reference = if pin.is_so_pin() || pin.is_unblocking() {
                SO_PIN_REFERENCE
            } else {
                USER_PIN_DEFAULT_REFERENCE
            };
            let reference = if pin.is_local() {
                reference | LOCAL_PIN_BIT
            } else {
                reference
            };
            debug!(label = %pin.label, reference = format_args!("{reference:#04x}"), "Selected PIN reference");
            pin.reference = Some(reference);
        }
        Ok(())
    }

    /// Validate the slot of `pin` and, if a value is given, provision it
    #[instrument(level = "debug", skip_all, fields(label = %pin.label, reference = ?pin.reference))]
    pub fn create_pin(
        &mut self,
        pin: &mut PinCredential,
        pin_value: Option<&[u8]>,
        puk_value: Option<&[u8]>,
    ) -> Result<()> {
        let app_df = self.app_df()?;
        if pin.is_local() {
            pin.path = Some(app_df.path);
        }

        let (expected, message) = match (pin.is_so_pin(), pin.is_unblocking()) {
            (true, true) => return Err(Error::NotSupported("SO PIN unblocking")),
            (true, false) => (SO_PIN_REFERENCE, "invalid SO PIN reference"),
            (false, true) => (USER_PUK_REFERENCE, "invalid user PUK reference"),
            (false, false) => (USER_PIN_REFERENCE, "invalid user PIN reference"),
        };
        if pin.reference != Some(expected) {
            return Err(Error::invalid_pin_reference(pin.reference, message));
        }

        match pin_value {
            Some(value) if !value.is_empty() => self.update_pin(pin, value, puk_value),
            _ => Ok(()),
        }
    }

    /// Change the value of `pin`
    ///
    /// The security officer PIN is fixed by the card: the call only checks its
    /// reference.
    pub fn update_pin(
        &mut self,
        pin: &PinCredential,
        pin_value: &[u8],
        puk_value: Option<&[u8]>,
    ) -> Result<()> {
        if pin.is_so_pin() {
            if pin.reference != Some(SO_PIN_REFERENCE) {
                return Err(Error::invalid_pin_reference(
                    pin.reference,
                    "invalid SO PIN reference",
                ));
            }
            debug!("SO PIN update ignored");
            return Ok(());
        }

        self.create_reference_data(pin, pin_value, puk_value)
            .context("Failed to change PIN")?;
        self.write_token_info(
            None,
            TokenFlags::TOKEN_INITIALIZED
                | TokenFlags::PRN_GENERATION
                | TokenFlags::LOGIN_REQUIRED
                | TokenFlags::USER_PIN_INITIALIZED,
        )
        .context("Failed to update token info")
    }

    /// Create the reference data of `pin` on the card
    ///
    /// A supplied `puk_value` must be non-empty; the PUK actually installed is
    /// [`RECOVERY_PUK`], attached whenever the profile's user PUK policy allows
    /// retries.
    pub fn create_reference_data(
        &mut self,
        pin: &PinCredential,
        pin_value: &[u8],
        puk_value: Option<&[u8]>,
    ) -> Result<()> {
        debug!(pin_len = pin_value.len(), puk_len = ?puk_value.map(<[u8]>::len), "Creating reference data");
        if pin_value.len() > MAX_PIN_LENGTH {
            return Err(Error::InvalidArguments("PIN is too long"));
        }
        if puk_value.is_some_and(<[u8]>::is_empty) {
            return Err(Error::InvalidArguments("PUK is empty"));
        }
        let reference = pin
            .reference
            .ok_or(Error::invalid_pin_reference(None, "PIN reference is not assigned"))?;
        let path = pin
            .path
            .as_ref()
            .ok_or(Error::InvalidArguments("PIN has no path"))?;

        self.session.select(path).context("Cannot select file")?;

        let pin_policy = self
            .profile
            .pin_policy(PinRole::UserPin)
            .unwrap_or_default();
        let puk_policy = self
            .profile
            .pin_policy(PinRole::UserPuk)
            .unwrap_or_default();

        let (pin_tries, puk) = if pin.is_unblocking() {
            (puk_policy.tries_left, None)
        } else if puk_policy.tries_left > 0 {
            (
                pin_policy.tries_left,
                Some((Zeroizing::new(RECOVERY_PUK.to_vec()), RECOVERY_PUK_TRIES)),
            )
        } else {
            (pin_policy.tries_left, None)
        };
        let attach_puk = puk.is_some();

        let request = ControlRequest::CreatePin {
            pin_type: PinType::Chv,
            reference,
            pin: Zeroizing::new(pin_value.to_vec()),
            pin_tries,
            puk,
        };
        self.session
            .control(&request)
            .context("'CREATE_PIN' card specific command failed")?;

        if attach_puk {
            let puk_file = self.required_file(names::PUK_FILE)?;
            self.session
                .update_file(&puk_file, &RECOVERY_PUK)
                .context("Failed to update PUK file")?;
        }
        Ok(())
    }
}
