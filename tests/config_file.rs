use simple_todo::config::{self, Config};
use simple_todo::theme::Theme;

#[test]
fn set_then_get_preserves_other_content() {
    let td = tempfile::tempdir().expect("tempdir");
    let path = td.path().join("config.toml");
    std::fs::write(&path, "# my settings\n[ui]\nicons = false\n").expect("write");

    config::set_value_string_at_path(&path, "ui.theme", "dark").expect("set theme");
    config::set_value_string_at_path(&path, "storage.key", "work").expect("set key");

    let raw = std::fs::read_to_string(&path).expect("read");
    assert!(raw.contains("# my settings"));
    assert!(raw.contains("icons = false"));

    assert_eq!(
        config::get_value_string_at_path(&path, "ui.default_theme").expect("get"),
        Some("dark".to_owned())
    );
    assert_eq!(
        config::get_value_string_at_path(&path, "storage.key").expect("get"),
        Some("work".to_owned())
    );

    let cfg: Config = toml::from_str(&raw).expect("parse");
    assert_eq!(cfg.ui.default_theme, Theme::Dark);
    assert!(!cfg.ui.icons);
    assert!(cfg.ui.confirm_delete);
}

#[test]
fn rejects_bad_keys_and_values() {
    let td = tempfile::tempdir().expect("tempdir");
    let path = td.path().join("config.toml");

    assert!(config::set_value_string_at_path(&path, "ui.colour", "red").is_err());
    assert!(config::set_value_string_at_path(&path, "ui.theme", "sepia").is_err());
    assert!(config::set_value_string_at_path(&path, "ui.icons", "yes").is_err());
    assert!(config::set_value_string_at_path(&path, "storage.key", "../escape").is_err());
    assert!(config::set_value_string_at_path(&path, "storage.key", "todo-theme").is_err());
    assert!(!path.exists());
}
