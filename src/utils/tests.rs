use super::*;

#[test]
fn safe_filename_replaces_dangerous_chars() {
    assert_eq!(safe_filename("a/b\\c:d*e"), "a_b_c_d_e");
    assert_eq!(safe_filename("file<>|name"), "file___name");
}

#[test]
fn safe_filename_keeps_message_ids() {
    assert_eq!(safe_filename("3EB0C431C26A1916"), "3EB0C431C26A1916");
}

#[test]
fn resolve_home_prefers_override() {
    let home = resolve_home(Some(OsString::from("/srv/nanobot"))).unwrap();
    assert_eq!(home, PathBuf::from("/srv/nanobot"));
}

#[test]
fn resolve_home_ignores_empty_override() {
    let home = resolve_home(Some(OsString::new())).unwrap();
    assert!(home.ends_with(".nanobot"));
}

#[test]
fn resolve_home_defaults_to_dot_nanobot() {
    let home = resolve_home(None).unwrap();
    assert_eq!(home, dirs::home_dir().unwrap().join(".nanobot"));
}
