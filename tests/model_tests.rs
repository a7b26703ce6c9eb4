//! Loading models and options from disk.

mod common;

use common::*;
use native_bridge::model::{Library, ModelError};
use native_bridge::{Error, GeneratorOptions};
use tempfile::TempDir;

#[test]
fn test_model_file_round_trip_generates_same_source() -> Result<(), anyhow::Error> {
    let fixture = geometry();
    let dir = TempDir::new()?;
    let path = dir.path().join("geometry.json");
    std::fs::write(&path, fixture.library.to_json()?)?;

    let loaded = Library::from_file(&path)?;
    let options = GeneratorOptions::default();
    let expected = native_bridge::generate_source(&fixture.library, &options)?;
    let actual = native_bridge::generate_source(&loaded, &options)?;
    assert_eq!(expected.len(), actual.len());
    for (a, b) in expected.iter().zip(&actual) {
        assert_eq!(a.source, b.source);
        assert_eq!(a.diagnostics.len(), b.diagnostics.len());
    }
    Ok(())
}

#[test]
fn test_hand_written_model() -> Result<(), anyhow::Error> {
    let json = r#"{
        "classes": [
            {
                "name": "Counter",
                "original_name": "counter",
                "namespace": ["util"],
                "kind": "ref-type",
                "layout": { "size": 4 },
                "fields": [
                    { "name": "Value", "original_name": "value", "ty": { "ty": { "primitive": "uint32" } } }
                ]
            }
        ],
        "units": [
            { "name": "counter", "root": { "namespaces": [ { "name": "util", "classes": [0] } ] } }
        ]
    }"#;
    let library = Library::from_json(json)?;
    let units = native_bridge::generate_source(&library, &GeneratorOptions::new("Util"))?;
    let source = &units[0].source;
    assert!(source.contains("namespace util\n{\n    public unsafe partial class Counter : IDisposable\n"));
    assert!(source.contains("return *(uint*) (Instance + 0);"));
    Ok(())
}

#[test]
fn test_options_file() -> Result<(), anyhow::Error> {
    let dir = TempDir::new()?;
    let path = dir.path().join("bridge.toml");
    std::fs::write(
        &path,
        "library_name = \"Geo\"\nshared_library = \"libgeo.so\"\noutput_debug = true\n",
    )?;
    let options = GeneratorOptions::from_file(&path)?;
    assert_eq!(options.dll_name(), "libgeo.so");
    assert!(options.output_debug);
    Ok(())
}

#[test]
fn test_malformed_model_is_a_model_error() {
    let err = Library::from_json("{\"classes\": 3}").unwrap_err();
    assert!(matches!(err, ModelError::Json(_)));

    let err: Error = Library::from_file("/nonexistent/model.json").unwrap_err().into();
    assert!(err.is_model());
}
