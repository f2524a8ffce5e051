use std::fs;
use std::path::Path;
use xmlvars_core::format::{parse_document, read_header};
use xmlvars_core::store::{backup_file, open_store, save_document};
use xmlvars_core::{
    FormatError, Layout, OpenOutcome, RecoveryPolicy, SettingsDocument, StoreError, StoreOptions,
    Value, Variable, CURRENT_FORMAT_VERSION,
};

const FLAT_V1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<settings version="1">
  <variable name="username" type="string" value="ada" default="guest"/>
  <variable name="fullscreen" type="boolean" value="true" default="false"/>
  <variable name="width" type="integer" value="1280" default="800"/>
  <variable name="nickname" type="string" value="" default=""/>
</settings>
"#;

fn write(path: &Path, text: &str) {
    fs::write(path, text).unwrap();
}

#[test]
fn missing_file_is_created_in_current_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.xml");

    let open = open_store(&path, &StoreOptions::default()).unwrap();
    assert_eq!(open.outcome, OpenOutcome::Created);
    assert!(open.document.is_empty());

    let header = read_header(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(header.version, CURRENT_FORMAT_VERSION);
}

#[test]
fn missing_file_without_create_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");
    let options = StoreOptions {
        create_if_missing: false,
        ..StoreOptions::default()
    };

    let err = open_store(&path, &options).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(missing) if missing == path));
    assert!(!path.exists());
}

#[test]
fn opening_same_file_twice_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");

    let mut doc = SettingsDocument::new();
    doc.insert(Variable::new("retries", Value::Integer(3)).unwrap())
        .unwrap();
    save_document(&path, &doc).unwrap();

    let first = open_store(&path, &StoreOptions::default()).unwrap();
    let second = open_store(&path, &StoreOptions::default()).unwrap();
    assert_eq!(first.outcome, OpenOutcome::Loaded);
    assert_eq!(second.outcome, OpenOutcome::Loaded);
    assert_eq!(second.document, doc);
}

#[test]
fn flat_file_is_condensed_and_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");
    write(&path, FLAT_V1);

    let open = open_store(&path, &StoreOptions::default()).unwrap();
    assert_eq!(open.outcome, OpenOutcome::Condensed { from_version: 1 });
    assert_eq!(open.document.len(), 4);

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains("<group type=\"string\">"));
    let (reparsed, header) = parse_document(&on_disk).unwrap();
    assert_eq!(header.layout(), Layout::Grouped);
    assert_eq!(reparsed, open.document);

    let username = reparsed.get("username").unwrap();
    assert_eq!(username.value(), &Value::from("ada"));
    assert_eq!(username.default_value(), &Value::from("guest"));

    let again = open_store(&path, &StoreOptions::default()).unwrap();
    assert_eq!(again.outcome, OpenOutcome::Loaded);
}

#[test]
fn unversioned_legacy_file_is_condensed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");
    write(
        &path,
        r#"<settings><variable name="ratio" type="double" value="0.5" default="1.0"/></settings>"#,
    );

    let open = open_store(&path, &StoreOptions::default()).unwrap();
    assert_eq!(open.outcome, OpenOutcome::Condensed { from_version: 1 });
    assert_eq!(
        open.document.get("ratio").unwrap().value(),
        &Value::Double(0.5)
    );
}

#[test]
fn newer_version_is_backed_up_and_recreated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");
    let future = r#"<settings version="7"><anything/></settings>"#;
    write(&path, future);

    let open = open_store(&path, &StoreOptions::default()).unwrap();
    match open.outcome {
        OpenOutcome::Recovered { backup, reason } => {
            assert_eq!(backup, dir.path().join("settings.xml.bak"));
            assert_eq!(fs::read_to_string(&backup).unwrap(), future);
            assert_eq!(
                reason,
                FormatError::UnsupportedVersion {
                    file_version: 7,
                    latest_supported: CURRENT_FORMAT_VERSION,
                }
            );
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(open.document.is_empty());

    let header = read_header(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(header.version, CURRENT_FORMAT_VERSION);
}

#[test]
fn malformed_files_never_overwrite_earlier_backups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");

    write(&path, "<settings version=\"2\"><group type=\"integer\">");
    let first = open_store(&path, &StoreOptions::default()).unwrap();

    write(&path, "not xml at all");
    let second = open_store(&path, &StoreOptions::default()).unwrap();

    let backups: Vec<_> = [first.outcome, second.outcome]
        .into_iter()
        .map(|outcome| match outcome {
            OpenOutcome::Recovered { backup, reason } => {
                assert!(matches!(reason, FormatError::Malformed(_)));
                backup
            }
            other => panic!("unexpected outcome: {other:?}"),
        })
        .collect();

    assert_eq!(backups[0], dir.path().join("settings.xml.bak"));
    assert_eq!(backups[1], dir.path().join("settings.xml.bak.1"));
    assert_eq!(fs::read_to_string(&backups[1]).unwrap(), "not xml at all");
}

#[test]
fn fail_policy_leaves_bad_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");
    write(&path, "<config/>");
    let options = StoreOptions {
        recovery: RecoveryPolicy::Fail,
        ..StoreOptions::default()
    };

    let err = open_store(&path, &options).unwrap_err();
    assert!(matches!(err, StoreError::Format(FormatError::Malformed(_))));
    assert_eq!(fs::read_to_string(&path).unwrap(), "<config/>");
    assert!(!dir.path().join("settings.xml.bak").exists());
}

#[test]
fn invalid_utf8_is_treated_as_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");
    fs::write(&path, [0xff, 0xfe, 0x00, 0x3c]).unwrap();

    let open = open_store(&path, &StoreOptions::default()).unwrap();
    assert!(matches!(open.outcome, OpenOutcome::Recovered { .. }));
}

#[test]
fn custom_backup_suffix_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");
    write(&path, "garbage");

    let backup = backup_file(&path, "broken").unwrap();
    assert_eq!(backup, dir.path().join("settings.xml.broken"));
    assert!(path.exists());
}

#[test]
fn store_options_deserialize_with_defaults() {
    let options: StoreOptions = serde_json::from_str(r#"{ "recovery": "fail" }"#).unwrap();
    assert_eq!(options.recovery, RecoveryPolicy::Fail);
    assert!(options.create_if_missing);
    assert_eq!(options.backup_suffix, "bak");
}

#[test]
fn tmp_backup_suffix_keeps_the_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");
    write(&path, "garbage-precious");
    let options = StoreOptions {
        backup_suffix: "tmp".to_string(),
        ..StoreOptions::default()
    };

    let open = open_store(&path, &options).unwrap();
    let backup = match open.outcome {
        OpenOutcome::Recovered { backup, .. } => backup,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(backup, dir.path().join("settings.xml.tmp"));
    assert_eq!(fs::read_to_string(&backup).unwrap(), "garbage-precious");

    let header = read_header(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(header.version, CURRENT_FORMAT_VERSION);
}

#[test]
fn saves_leave_no_temp_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.xml");

    let mut doc = SettingsDocument::new();
    doc.insert(Variable::new("retries", Value::Integer(3)).unwrap())
        .unwrap();
    save_document(&path, &doc).unwrap();
    save_document(&path, &doc).unwrap();

    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("settings.xml")]);
}
