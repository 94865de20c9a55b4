use std::fs;

use assert_matches::assert_matches;

use portal_download_engine::config::{
    Config, ConfigLoader, DEFAULT_API_URL, FeatureEntries, MAX_PER_PAGE,
};
use portal_download_engine::error::PortalError;

#[test]
fn resolve_detailed_config() {
    let config = Config {
        schema_version: Some(2),
        api_url: Some(" https://graphql.example.org/v1/graphql ".to_string()),
        page_size: Some(50),
        features: FeatureEntries {
            multiple_tomograms: Some(true),
        },
    };

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.schema_version, 2);
    assert_eq!(resolved.api_url, "https://graphql.example.org/v1/graphql");
    assert_eq!(resolved.page_size, 50);
    assert!(resolved.features.multiple_tomograms);
}

#[test]
fn load_config_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("portal.json");
    fs::write(&path, r#"{ "features": { "multiple_tomograms": true } }"#).unwrap();

    let resolved = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap();
    assert!(resolved.features.multiple_tomograms);
    assert_eq!(resolved.page_size, MAX_PER_PAGE);
    if std::env::var("PORTAL_API_URL").is_err() {
        assert_eq!(resolved.api_url, DEFAULT_API_URL);
    }
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("missing.json");
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, PortalError::ConfigRead(_));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("portal.json");
    fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, PortalError::ConfigParse(_));
}
