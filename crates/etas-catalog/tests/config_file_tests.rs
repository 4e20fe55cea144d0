//! Integration tests for configuration-driven catalog files.

use etas_catalog::{str_source, CatalogConfig, CatalogFile, ErrorKind, LineCodec, DEFAULT_SECTION};

const CONFIG: &str = r#"
[format]
comment_prefix = "//"
control_prefix = "@"
format_keyword = "layout"

[file]
emit_default_header = true
default_format = "legacy_10 wrapped"

[new_section]
allowed_definitions = ["start_time", "label"]
allow_converter = false
max_ruptures = 2
"#;

fn configured_file() -> CatalogFile {
    CatalogFile::with_config(&CatalogConfig::from_toml_str(CONFIG).unwrap()).unwrap()
}

#[test]
fn test_custom_grammar_reads_and_writes() {
    let text = "\
@begin: default
// file scope
@begin: shallow
@define: label = near surface
2020\t3\t4\t5\t6\t7.890\t34.05000\t241.75000\t8.000\t4.500
";
    let mut file = configured_file();
    file.read_all_sections(&mut str_source(text)).unwrap();

    let section = file.section("shallow").unwrap();
    assert_eq!(section.codec().unwrap().type_tag(), "legacy_10");
    assert_eq!(section.ruptures()[0].absolute().unwrap().lon, 241.75);
    assert_eq!(section.ruptures()[0].strings().event_id(), Some("ev1"));
    assert_eq!(file.get_definition_string("shallow", "label"), Some("near surface"));

    let mut lines: Vec<String> = Vec::new();
    file.write_all_sections(&mut lines).unwrap();
    assert_eq!(
        lines,
        vec![
            "@begin: default",
            "// file scope",
            "@layout: legacy_10 wrapped",
            "@begin: shallow",
            "@define: label = near surface",
            "2020\t3\t4\t5\t6\t7.890\t34.05000\t241.75000\t8.000\t4.500",
        ]
    );
}

#[test]
fn test_new_section_restrictions_apply() {
    let mut file = configured_file();
    let err = file
        .read_all_sections(&mut str_source("@begin: s\n@define: other = 1\n"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DefinitionDisallowed);

    let mut file = configured_file();
    let err = file
        .read_all_sections(&mut str_source(
            "@begin: s\n@convert: etas_origin 0 0 0 0\n",
        ))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ControlLineInvalid);

    let line = "2020\t1\t1\t0\t0\t0.000\t0.00000\t0.00000\t0.000\t1.000";
    let text = format!("@begin: s\n{line}\n{line}\n{line}\n");
    let mut file = configured_file();
    let err = file.read_all_sections(&mut str_source(&text)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
    assert_eq!(file.section("s").unwrap().rupture_count(), 2);
}

#[test]
fn test_default_section_keeps_file_permissions() {
    let mut file = configured_file();
    file.read_all_sections(&mut str_source("@define: anything = 1\n"))
        .unwrap();
    assert_eq!(
        file.get_definition_string(DEFAULT_SECTION, "anything"),
        Some("1")
    );
}

#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.toml");
    std::fs::write(&path, CONFIG).unwrap();
    let config = CatalogConfig::load_from_file(&path).unwrap();
    assert_eq!(config.format.control_prefix, "@");
    assert_eq!(config.new_section.max_ruptures, Some(2));

    std::fs::write(&path, "[format]\ncontrol_prefix = \"//\"\ncomment_prefix = \"//\"\n").unwrap();
    let err = CatalogConfig::load_from_file(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    assert!(err.to_string().contains("catalog.toml"));
}
