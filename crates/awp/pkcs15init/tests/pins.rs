//! PIN reference allocation and provisioning

mod common;

use awp_core::prelude::*;
use awp_core::profile::names;
use awp_pkcs15init::{RECOVERY_PUK, RECOVERY_PUK_TRIES};
use common::*;

fn user_pin() -> PinCredential {
    PinCredential::new("User PIN", PinFlags::LOCAL | PinFlags::INITIALIZED)
}

fn user_puk() -> PinCredential {
    PinCredential::new("User PUK", PinFlags::LOCAL | PinFlags::UNBLOCKING)
}

fn so_pin() -> PinCredential {
    PinCredential::new("Security Officer PIN", PinFlags::SO_PIN)
}

#[test]
fn test_reference_allocation() {
    let p = personalizer(profile());
    let app_df = file(&p, names::APP_DF).path;
    let cases = [
        (PinFlags::SO_PIN, 0x04),
        (PinFlags::SO_PIN | PinFlags::LOCAL, 0x84),
        (PinFlags::UNBLOCKING, 0x04),
        (PinFlags::UNBLOCKING | PinFlags::LOCAL, 0x84),
        (PinFlags::INITIALIZED, 0x01),
        (PinFlags::INITIALIZED | PinFlags::LOCAL, 0x81),
    ];

    for (flags, expected) in cases {
        let mut pin = PinCredential::new("pin", flags);
        p.select_pin_reference(&mut pin).unwrap();
        assert_eq!(pin.reference, Some(expected), "{flags}");
        assert_eq!(pin.path.is_some(), pin.is_local());
        if pin.is_local() {
            assert_eq!(pin.path.as_ref(), Some(&app_df));
        }
    }
}

#[test]
fn test_reference_allocation_keeps_assigned_reference() {
    let p = personalizer(profile());
    let mut pin = user_pin().with_reference(0x02);
    p.select_pin_reference(&mut pin).unwrap();
    assert_eq!(pin.reference, Some(0x02));
}

#[test]
fn test_reference_zero_is_reallocated() {
    let mut p = initialized(profile());
    let mut pin = user_pin().with_reference(0);
    p.select_pin_reference(&mut pin).unwrap();
    assert_eq!(pin.reference, Some(0x81));

    p.create_pin(&mut pin, Some(b"1234"), None).unwrap();
    let stored = p.card().pin(0x81).unwrap();
    assert_eq!(stored.value.as_slice(), b"1234");
    assert_eq!(stored.tries, 5);
}

#[test]
fn test_create_user_pin_attaches_recovery_puk() {
    let mut p = initialized(profile());
    let mut pin = user_pin();
    p.select_pin_reference(&mut pin).unwrap();
    p.create_pin(&mut pin, Some(b"1234"), None).unwrap();

    let stored = p.card().pin(0x81).unwrap();
    assert_eq!(stored.value.as_slice(), b"1234");
    assert_eq!(stored.tries, 5);
    let (puk, puk_tries) = stored.puk.as_ref().unwrap();
    assert_eq!(puk.as_slice(), RECOVERY_PUK.as_slice());
    assert_eq!(*puk_tries, RECOVERY_PUK_TRIES);
    assert_eq!(stored.path.as_ref(), Some(&file(&p, names::APP_DF).path));

    let puk_file = file(&p, names::PUK_FILE).path;
    assert_eq!(p.card().file_data(&puk_file), Some(RECOVERY_PUK.as_slice()));

    let info = token_info(&p);
    assert!(info.flags.contains(TokenFlags::USER_PIN_INITIALIZED));
    assert!(info.flags.contains(TokenFlags::LOGIN_REQUIRED));
    assert_eq!(info.flags.to_device(), 0x040D);
    assert_eq!(p.token().flags(), info.flags);
}

#[test]
fn test_reference_data_without_puk_policy() {
    let profile = profile().with_pin(PinRole::UserPuk, PinPolicy::new(0));
    let mut p = initialized(profile);
    let mut pin = user_pin();
    p.select_pin_reference(&mut pin).unwrap();

    p.create_reference_data(&pin, b"1234", None).unwrap();

    assert_eq!(
        p.card().controls(),
        &[ControlRequest::CreatePin {
            pin_type: awp_core::PinType::Chv,
            reference: 0x81,
            pin: b"1234".to_vec().into(),
            pin_tries: 5,
            puk: None,
        }]
    );
    assert_eq!(updates_of(&p, &file(&p, names::PUK_FILE).path), 0);
}

#[test]
fn test_reference_data_for_unblocking_pin() {
    let profile = profile().with_pin(PinRole::UserPuk, PinPolicy::new(7));
    let mut p = initialized(profile);
    let mut puk = user_puk();
    p.select_pin_reference(&mut puk).unwrap();

    p.create_reference_data(&puk, b"87654321", None).unwrap();

    let stored = p.card().pin(0x84).unwrap();
    assert_eq!(stored.tries, 7);
    assert!(stored.puk.is_none());
    assert_eq!(updates_of(&p, &file(&p, names::PUK_FILE).path), 0);
}

#[test]
fn test_reference_data_rejects_long_pin() {
    let mut p = initialized(profile());
    let mut pin = user_pin();
    p.select_pin_reference(&mut pin).unwrap();

    let err = p.create_reference_data(&pin, &[b'1'; 65], None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    assert_eq!(control_count(&p), 0);

    p.create_reference_data(&pin, &[b'1'; 64], None).unwrap();
    assert_eq!(control_count(&p), 1);
}

#[test]
fn test_reference_data_rejects_empty_puk() {
    let mut p = initialized(profile());
    let mut pin = user_pin();
    p.select_pin_reference(&mut pin).unwrap();

    let err = p.create_reference_data(&pin, b"1234", Some(b"")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
    assert_eq!(control_count(&p), 0);
}

#[test]
fn test_create_pin_validates_references() {
    let mut p = initialized(profile());

    let mut so = so_pin().with_reference(0x01);
    let err = p.create_pin(&mut so, Some(b"1234"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPinReference);

    let mut user = user_pin().with_reference(0x01);
    let err = p.create_pin(&mut user, Some(b"1234"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPinReference);

    let mut puk = user_puk().with_reference(0x04);
    let err = p.create_pin(&mut puk, None, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPinReference);

    let mut so_puk = PinCredential::new("SO PUK", PinFlags::SO_PIN | PinFlags::UNBLOCKING);
    let err = p.create_pin(&mut so_puk, None, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);

    assert_eq!(control_count(&p), 0);
}

#[test]
fn test_so_pin_is_never_written() {
    let mut p = initialized(profile());
    let mut so = so_pin().with_reference(0x04);
    p.create_pin(&mut so, Some(b"00000000"), None).unwrap();

    assert_eq!(control_count(&p), 0);
    assert!(p.card().pin(0x04).is_none());
}

#[test]
fn test_create_pin_without_value_only_validates() {
    let mut p = initialized(profile());
    let mut pin = user_pin();
    p.select_pin_reference(&mut pin).unwrap();

    p.create_pin(&mut pin, None, None).unwrap();
    p.create_pin(&mut pin, Some(b""), None).unwrap();
    assert_eq!(control_count(&p), 0);
}

#[test]
fn test_failed_pin_creation_leaves_token_flags() {
    let mut p = initialized(profile());
    let mut pin = user_pin();
    p.select_pin_reference(&mut pin).unwrap();
    p.session_mut().card_mut().fail_next(
        awp_sim::CallKind::Control(Opcode::CreatePin),
        Error::control_failure(Opcode::CreatePin, "6A80"),
    );

    let err = p.create_pin(&mut pin, Some(b"1234"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CardControlFailure);
    assert!(!p.token().flags().contains(TokenFlags::USER_PIN_INITIALIZED));
    assert_eq!(updates_of(&p, &file(&p, names::PUK_FILE).path), 0);
}
