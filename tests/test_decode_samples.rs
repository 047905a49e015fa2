
use fixtures::*;

use acr::{AcrError, DecodeOptions, Guid, decode_session, decode_tab};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[test]
fn it_decodes_a_recovery_store() {
    ensure_env_logger_initialized();
    let dir = tempdir().unwrap();
    let store = create_recovery_store(dir.path(), false);

    let session = decode_session(&store).unwrap();

    assert_eq!(session.opened_at.unwrap().as_second(), OPENED_UNIX);
    assert_eq!(session.closed_at.unwrap().as_second(), CLOSED_UNIX);
    assert!(!session.private_browsing);

    let tab_id = Guid::from_dashed(TAB_GUID);
    assert_eq!(session.open_tabs, vec![tab_id]);
    // The closed list carried one valid window and one nil terminator
    // window; only the valid one survives.
    assert_eq!(session.closed_tabs, vec![tab_id]);
}

#[test]
fn the_privacy_flag_is_an_existence_test() {
    ensure_env_logger_initialized();
    let dir = tempdir().unwrap();

    // The property value is zero; presence of the id alone marks InPrivate.
    let store = create_recovery_store(dir.path(), true);
    assert!(decode_session(&store).unwrap().private_browsing);
}

#[test]
fn it_decodes_a_tab_data_file_without_its_session() {
    ensure_env_logger_initialized();
    let dir = tempdir().unwrap();
    let tab_file = create_tab_file(dir.path());

    let tab = decode_tab(&tab_file, &DecodeOptions::default()).unwrap();

    assert_eq!(tab.id, Guid::from_dashed(TAB_GUID));
    assert_eq!(tab.created_at.unwrap().as_second(), OPENED_UNIX);
    assert_eq!(tab.navigation_order, vec![3, 1, 2]);
    assert_eq!(tab.current_page, Some(2));

    // Pages come back in natural stream-name order: TL2 before TL10.
    let indices: Vec<u32> = tab.pages.iter().map(|page| page.index).collect();
    assert_eq!(indices, vec![1, 2, 10]);

    assert_eq!(tab.pages[0].url.as_deref(), Some("http://example.com/"));
    assert_eq!(tab.pages[0].title.as_deref(), Some("Example Domain"));
    assert_eq!(tab.pages[1].url.as_deref(), Some("http://example.com/login"));
    assert_eq!(
        tab.pages[2].url.as_deref(),
        Some("http://example.com/deep/path.html")
    );

    // Without string collection the evidence set stays empty.
    assert!(tab.pages.iter().all(|page| page.all_strings.is_empty()));
    assert!(tab.page_errors.is_empty());
}

#[test]
fn string_collection_yields_a_deduplicated_superset() {
    ensure_env_logger_initialized();
    let dir = tempdir().unwrap();
    let tab_file = create_tab_file(dir.path());

    let options = DecodeOptions {
        collect_strings: true,
    };
    let tab = decode_tab(&tab_file, &options).unwrap();

    let login_page = &tab.pages[1];
    assert_eq!(
        login_page.all_strings,
        vec![
            "http://example.com/login".to_owned(),
            "Sign in".to_owned(),
            "user=admin".to_owned(),
        ]
    );
}

#[test]
fn a_corrupted_sibling_does_not_affect_a_well_formed_store() {
    ensure_env_logger_initialized();
    let dir = tempdir().unwrap();
    let good = create_recovery_store(dir.path(), false);
    let corrupt = create_corrupt_store(dir.path());

    let decoded = decode_session(&good).unwrap();
    assert_eq!(decoded.opened_at.unwrap().as_second(), OPENED_UNIX);

    assert!(decode_session(&corrupt).is_err());
}

#[test]
fn a_file_without_the_container_signature_is_unsupported() {
    ensure_env_logger_initialized();
    let dir = tempdir().unwrap();
    let path = create_unsupported_file(dir.path());

    match decode_session(&path) {
        Err(AcrError::UnsupportedFormat { .. }) => {}
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }

    match decode_tab(&path, &DecodeOptions::default()) {
        Err(AcrError::UnsupportedFormat { .. }) => {}
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
}

#[test]
fn a_store_without_a_property_stream_still_decodes() {
    ensure_env_logger_initialized();
    let dir = tempdir().unwrap();
    let path = dir.path().join("RecoveryStore.{77777777-0000-0000-0000-000000000000}.dat");

    // Only a pointer stream, no properties at all.
    let mut compound = cfb::create(&path).unwrap();
    {
        use std::io::Write;
        let mut stream = compound.create_stream("/TS0").unwrap();
        stream.write_all(&guid_wire_bytes(TAB_GUID)).unwrap();
    }
    compound.flush().unwrap();

    let session = decode_session(&path).unwrap();
    assert_eq!(session.opened_at, None);
    assert_eq!(session.closed_at, None);
    assert!(!session.private_browsing);
    assert_eq!(session.open_tabs, vec![Guid::from_dashed(TAB_GUID)]);
}
