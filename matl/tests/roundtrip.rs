//! File-level read/write tests.
//!
//! Libraries are built in code, written to a temporary directory and read back
//! through the path-based API.

use matl::*;

fn sampler(name: &str, sample: &str) -> ShaderProperty {
    ShaderProperty {
        name: name.into(),
        sample_name: sample.into(),
        property_type: ShaderPropertyType::Sample,
        ..Default::default()
    }
}

fn build_library(version: FormatVersion) -> Library {
    let mut technique = Technique {
        name: "Forward".into(),
        flags: vec![0x10],
        passes: vec![Pass {
            name: "Base".into(),
            render_states: vec![RenderState {
                word0: 0x0102,
                word1: 0x0304,
            }],
            shader_properties: vec![sampler("NormalMap", "NormalSampler")],
            global_properties: vec![ShaderProperty {
                name: "Time".into(),
                defaults: vec![0.0],
                ..Default::default()
            }],
            ui_properties: vec![UiProperty::new("Strength", 2, UiValue::Float(1.25))],
            ..Default::default()
        }],
        ..Default::default()
    };
    technique.sub_objects[0].vertex_code = vec![0xDE, 0xAD, 0xBE, 0xEF];
    technique.sub_objects[0].pixel_code = vec![0xCA, 0xFE];

    let mut library = Library::new(version);
    library.templates.push(Template {
        name: "Water".into(),
        checksum: 0x5EED,
        techniques: vec![technique],
        ui_properties: vec![UiProperty::new("Caption", 9, UiValue::Text("Deep water".into()))],
        ..Default::default()
    });
    library
}

#[test]
fn test_write_then_read_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("water.matl");

    let library = build_library(FormatVersion::V4);
    write(&library, &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], &MATL_MAGIC);
    assert_eq!(bytes, encode(&library).unwrap());

    let loaded = read(&path).unwrap();
    assert_eq!(loaded, library);

    let template = loaded.template("Water").unwrap();
    let pass = &template.techniques[0].passes[0];
    assert_eq!(pass.shader_properties[0].sample_name, "NormalSampler");
    assert_eq!(template.ui_properties[0].value, UiValue::Text("Deep water".into()));
}

#[test]
fn test_file_sizes_follow_plan() {
    let dir = tempfile::tempdir().unwrap();
    for version in [FormatVersion::V2, FormatVersion::V3, FormatVersion::V4] {
        let library = build_library(version);
        let path = dir.path().join(format!("v{}.matl", version));
        write(&library, &path).unwrap();

        let table = plan(&library).unwrap();
        let size = std::fs::metadata(&path).unwrap().len();
        // Fixed regions plus 6 bytes of microcode
        assert_eq!(size, u64::from(table.microcode_base()) + 6);
        assert_eq!(
            table.chunk(Region::Techniques).size(),
            version.policy().record_size(EntityKind::Technique)
        );
        assert_eq!(read(&path).unwrap(), library);
    }
}

#[test]
fn test_counts() {
    let counts = build_library(FormatVersion::V4).counts().unwrap();
    assert_eq!(counts.templates, 1);
    assert_eq!(counts.passes, 1);
    assert_eq!(counts.shader_properties, 2);
    assert_eq!(counts.ui_properties, 2);
    assert_eq!(counts.flags, 1);
    assert_eq!(counts.defaults, 1);
}

#[test]
fn test_read_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = read(dir.path().join("missing.matl")).unwrap_err();
    assert!(matches!(err, MatlError::Io(_)));
}

#[test]
fn test_read_wrong_magic_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not-a-library.bin");
    std::fs::write(&path, b"XXXX\0\0\0\x04\0\0\0\0\0\0\0\0").unwrap();
    assert!(matches!(read(&path), Err(MatlError::InvalidMagic { .. })));
}

#[test]
fn test_failed_write_creates_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.matl");
    let mut library = build_library(FormatVersion::V4);
    library.templates[0].name = "\u{2603}".into();

    assert!(write(&library, &path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_options_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let options_path = dir.path().join("matl.toml");
    std::fs::write(&options_path, "size_check = \"warn\"\nreport_anomalies = false\n").unwrap();
    let options = CodecOptions::load(&options_path).unwrap();
    assert_eq!(options.size_check, SizeCheck::Warn);

    let path = dir.path().join("lenient.matl");
    let library = build_library(FormatVersion::V3);
    write_with(&library, &path, &options).unwrap();
    assert_eq!(read_with(&path, &options).unwrap(), library);
}
