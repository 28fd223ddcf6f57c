//! File structure lifecycle against the simulated card

mod common;

use awp_core::prelude::*;
use awp_core::StaticProfile;
use awp_core::profile::names;
use awp_pkcs15init::DIRECTORY_LAYOUT;
use awp_sim::{Call, CallKind};
use common::*;

#[test]
fn test_create_dir_builds_layout() {
    let mut p = personalizer(profile());
    let root = p.profile().df_info().unwrap();
    p.create_dir(&root).unwrap();

    assert!(p.card().exists(&root.path));
    for name in DIRECTORY_LAYOUT {
        let expected = file(&p, name);
        assert!(p.card().exists(&expected.path), "{name} missing");
    }

    let info = token_info(&p);
    assert_eq!(info.label, TokenInfo::DEFAULT_LABEL);
    assert_eq!(
        info.flags,
        TokenFlags::TOKEN_INITIALIZED | TokenFlags::PRN_GENERATION
    );

    let record = p.card().file_data(&file(&p, names::TOKEN_INFO).path).unwrap();
    assert_eq!(record.len(), 36);
    assert_eq!(&record[32..], &[0x00, 0x00, 0x04, 0x01]);
    assert_eq!(
        p.token().flags(),
        TokenFlags::TOKEN_INITIALIZED | TokenFlags::PRN_GENERATION
    );
}

#[test]
fn test_create_dir_uses_profile_label() {
    let mut p = personalizer(StaticProfile::oberthur_default());
    let root = p.profile().df_info().unwrap();
    p.create_dir(&root).unwrap();
    assert_eq!(token_info(&p).label, "Oberthur AWP");
}

#[test]
fn test_create_dir_keeps_existing_files() {
    let mut p = personalizer(profile());
    let app_df = file(&p, names::APP_DF);
    p.session_mut().create_file(&app_df).unwrap();

    let root = p.profile().df_info().unwrap();
    p.create_dir(&root).unwrap();
    assert!(p.card().exists(&file(&p, names::PRIVATE_LIST).path));
}

#[test]
fn test_create_dir_aborts_when_root_exists() {
    let mut p = initialized(profile());
    let root = p.profile().df_info().unwrap();

    let err = p.create_dir(&root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileAlreadyExists);
    assert_eq!(control_count(&p), 0);
    assert_eq!(updates_of(&p, &file(&p, names::TOKEN_INFO).path), 0);
}

#[test]
fn test_create_dir_requires_every_template() {
    let mut profile = profile();
    profile.remove_file(names::PUK_FILE);
    let mut p = personalizer(profile);
    let root = p.profile().df_info().unwrap();

    let err = p.create_dir(&root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentProfile);
    assert!(!p.card().exists(&path("3F0050113000")));
}

#[test]
fn test_short_token_info_is_never_written() {
    let mut profile = profile();
    let mut info = profile.remove_file(names::TOKEN_INFO).unwrap();
    info.size = 8;
    let profile = profile.with_file(names::TOKEN_INFO, info.clone());
    let mut p = personalizer(profile);
    let root = p.profile().df_info().unwrap();

    let err = p.create_dir(&root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentProfile);
    assert_eq!(updates_of(&p, &info.path), 0);
    assert_eq!(p.token().flags(), TokenFlags::empty());
}

#[test]
fn test_write_token_info_label_precedence() {
    let mut p = initialized(StaticProfile::oberthur_default());

    p.write_token_info(Some("Explicit"), TokenFlags::TOKEN_INITIALIZED)
        .unwrap();
    assert_eq!(token_info(&p).label, "Explicit");

    p.write_token_info(None, TokenFlags::TOKEN_INITIALIZED).unwrap();
    assert_eq!(token_info(&p).label, "Oberthur AWP");

    let mut p = p.with_token_state(TokenState::new(
        Some("On card".to_string()),
        TokenFlags::READ_ONLY,
    ));
    p.write_token_info(None, TokenFlags::TOKEN_INITIALIZED).unwrap();
    assert_eq!(token_info(&p).label, "On card");
    assert_eq!(
        p.token().flags(),
        TokenFlags::READ_ONLY | TokenFlags::TOKEN_INITIALIZED
    );
}

#[test]
fn test_failed_token_info_update_keeps_flags() {
    let mut p = initialized(profile());
    let before = p.token().flags();
    p.session_mut().card_mut().fail_next(
        CallKind::Update,
        Error::SecurityStatusNotSatisfied {
            path: path("3F0050111000"),
            operation: AclOperation::Update,
        },
    );

    let all = TokenFlags::TOKEN_INITIALIZED
        | TokenFlags::PRN_GENERATION
        | TokenFlags::LOGIN_REQUIRED
        | TokenFlags::USER_PIN_INITIALIZED;
    let err = p.write_token_info(None, all).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecurityStatusNotSatisfied);
    assert_eq!(p.token().flags(), before);
}

#[test]
fn test_erase_removes_structure() {
    let mut p = initialized(profile());
    p.erase_card().unwrap();

    let remaining: Vec<_> = p.card().paths().cloned().collect();
    assert_eq!(remaining, vec![path("3F00")]);
    assert_eq!(p.card().resets(), 1);
}

#[test]
fn test_erase_is_idempotent() {
    let mut p = initialized(profile());
    p.erase_card().unwrap();
    p.session_mut().card_mut().clear_journal();

    p.erase_card().unwrap();
    assert_eq!(p.card().resets(), 2);
    let remaining: Vec<_> = p.card().paths().cloned().collect();
    assert_eq!(remaining, vec![path("3F00")]);
    assert_eq!(journal(&p).last(), Some(&Call::ResetApplications));

    // DFs fail on their own DELETE check, so only the DIR file reaches the
    // delete command, and it finds nothing
    let deletes: Vec<_> = journal(&p)
        .iter()
        .filter(|call| matches!(call, Call::Delete { .. }))
        .collect();
    assert_eq!(
        deletes,
        [&Call::Delete {
            parent: Some(path("3F00")),
            id: FileId::new(0x2F00),
        }]
    );

    for name in [
        names::DIR,
        names::PKCS15_APP_DF,
        names::PRIVATE_DF,
        names::PUBLIC_DF,
        names::APP_DF,
    ] {
        let target = file(&p, name);
        let err = p.delete_file(&target).unwrap_err();
        assert!(err.is_file_not_found(), "{name}: {err}");
    }
}

#[test]
fn test_erase_requires_df_info() {
    let mut profile = profile();
    profile.df_info = "missing".to_string();
    let mut p = personalizer(profile);

    let err = p.erase_card().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentProfile);
    assert!(journal(&p).is_empty());
    assert_eq!(p.card().resets(), 0);
}

#[test]
fn test_delete_df_authorizes_itself_first() {
    let mut p = initialized(profile());
    let df = file(&p, names::PKCS15_APP_DF);

    p.delete_file(&df).unwrap();
    assert_eq!(
        journal(&p),
        [
            Call::Authenticate {
                path: path("3F005015"),
                operation: AclOperation::Delete,
            },
            Call::Select {
                path: path("3F00"),
            },
            Call::Authenticate {
                path: path("3F00"),
                operation: AclOperation::Delete,
            },
            Call::Delete {
                parent: Some(path("3F00")),
                id: FileId::new(0x5015),
            },
        ]
    );
    assert!(!p.card().exists(&df.path));
}

#[test]
fn test_delete_ef_authorizes_parent_only() {
    let mut p = initialized(profile());
    let token_info = file(&p, names::TOKEN_INFO);

    p.delete_file(&token_info).unwrap();
    assert_eq!(
        journal(&p),
        [
            Call::Select {
                path: path("3F005011"),
            },
            Call::Authenticate {
                path: path("3F005011"),
                operation: AclOperation::Delete,
            },
            Call::Delete {
                parent: Some(path("3F005011")),
                id: FileId::new(0x1000),
            },
        ]
    );
    assert!(!p.card().exists(&token_info.path));
    assert!(p.card().exists(&file(&p, names::APP_DF).path));
}

#[test]
fn test_erase_on_blank_card() {
    let mut p = personalizer(profile());
    p.erase_card().unwrap();
    assert_eq!(p.card().resets(), 1);
}

#[test]
fn test_erase_deletes_dir_first() {
    let mut p = initialized(profile());
    let dir = file(&p, names::DIR);
    p.session_mut().create_file(&dir).unwrap();
    p.session_mut().card_mut().clear_journal();

    p.erase_card().unwrap();
    let deletes: Vec<_> = journal(&p)
        .iter()
        .filter_map(|call| match call {
            Call::Delete { id, .. } => Some(id.value()),
            _ => None,
        })
        .collect();
    assert_eq!(deletes, vec![0x2F00, 0x5015, 0x9002, 0x9001, 0x5011]);
}

#[test]
fn test_erase_aborts_on_access_failure() {
    let mut p = initialized(profile());
    p.session_mut().card_mut().fail_next(
        CallKind::Authenticate,
        Error::SecurityStatusNotSatisfied {
            path: path("3F00"),
            operation: AclOperation::Delete,
        },
    );

    let err = p.erase_card().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecurityStatusNotSatisfied);
    assert_eq!(p.card().resets(), 0);
    assert!(p.card().exists(&file(&p, names::APP_DF).path));
}
