use proptest::prelude::*;

use portal_download_engine::address::AddressSnapshot;
use portal_download_engine::catalog::SnapshotCatalog;
use portal_download_engine::catalog::{CatalogClient, RunQuery};
use portal_download_engine::config::FeatureFlags;
use portal_download_engine::domain::{RunId, RunPage};
use portal_download_engine::resolver::{DownloadDescriptor, resolve};
use portal_download_engine::selection::Selection;

const FIXTURE: &str = include_str!("fixtures/run_page.json");

fn page(run: u64) -> RunPage {
    let catalog = SnapshotCatalog::from_json(FIXTURE).unwrap();
    let query = RunQuery::from_address(RunId::new(run), &AddressSnapshot::default(), 20);
    catalog.fetch_run(&query).unwrap().unwrap()
}

fn resolve_query(page: &RunPage, query: &str, features: FeatureFlags) -> DownloadDescriptor {
    let selection = Selection::from_address(&AddressSnapshot::from_query(query), features);
    resolve(&selection, page)
}

#[test]
fn tomogram_mrc_resolves_to_single_file_pair() {
    let page = page(14069);
    let descriptor = resolve_query(
        &page,
        "download-config=tomogram&file-format=mrc&tomogram-sampling=10&tomogram-processing=denoised",
        FeatureFlags::default(),
    );
    let tomogram = page.tomograms().find(|t| t.id.get() == 501).unwrap();
    assert_eq!(descriptor.storage_path, tomogram.s3_mrc_scale0);
    assert_eq!(descriptor.transfer_path, tomogram.https_mrc_scale0);
    assert_eq!(descriptor.size_query, tomogram.https_mrc_scale0);
}

#[test]
fn tomogram_zarr_resolves_to_directory_without_size_query() {
    let page = page(14069);
    let descriptor = resolve_query(
        &page,
        "download-config=tomogram&file-format=zarr&tomogram-sampling=10&tomogram-processing=denoised",
        FeatureFlags::default(),
    );
    let tomogram = page.tomograms().find(|t| t.id.get() == 501).unwrap();
    assert_eq!(descriptor.storage_path, tomogram.s3_omezarr_dir);
    assert_eq!(descriptor.size_query, None);
}

#[test]
fn sampling_matches_decimal_spellings() {
    let page = page(14069);
    let descriptor = resolve_query(
        &page,
        "download-config=tomogram&file-format=mrc&tomogram-sampling=13.480&tomogram-processing=raw",
        FeatureFlags::default(),
    );
    assert!(
        descriptor
            .storage_path
            .unwrap()
            .contains("VoxelSpacing13.480/Tomograms/102")
    );
}

#[test]
fn tomogram_by_id_requires_feature_flag() {
    let page = page(14069);
    let query = "download-config=tomogram&file-format=mrc&tomogram-id=502";
    let enabled = FeatureFlags {
        multiple_tomograms: true,
    };
    let descriptor = resolve_query(&page, query, enabled);
    assert!(descriptor.storage_path.unwrap().contains("Tomograms/101"));
    assert_eq!(
        resolve_query(&page, query, FeatureFlags::default()),
        DownloadDescriptor::default()
    );
}

#[test]
fn missing_format_or_tomogram_is_unresolved() {
    let page = page(14069);
    let no_format = resolve_query(
        &page,
        "download-config=tomogram&tomogram-sampling=10&tomogram-processing=denoised",
        FeatureFlags::default(),
    );
    assert!(!no_format.is_resolved());
    let no_match = resolve_query(
        &page,
        "download-config=tomogram&file-format=mrc&tomogram-sampling=99&tomogram-processing=denoised",
        FeatureFlags::default(),
    );
    assert_eq!(no_match, DownloadDescriptor::default());
}

#[test]
fn all_annotations_appends_suffix_to_run_prefix() {
    let descriptor = resolve_query(
        &page(14069),
        "download-config=all-annotations",
        FeatureFlags::default(),
    );
    assert_eq!(
        descriptor.storage_path.as_deref(),
        Some("s3://cryoet-data-portal-public/10001/TS_026/Reconstructions/VoxelSpacing10.000/Annotations")
    );
    assert_eq!(descriptor.size_query, None);
}

#[test]
fn all_annotations_without_voxel_spacing_is_absent() {
    let descriptor = resolve_query(
        &page(14070),
        "download-config=all-annotations",
        FeatureFlags::default(),
    );
    assert_eq!(descriptor, DownloadDescriptor::default());
}

#[test]
fn annotation_file_matches_format_and_shape() {
    let page = page(14069);
    let descriptor = resolve_query(
        &page,
        "annotation_id=7001&file-format=mrc&object_shape=SegmentationMask",
        FeatureFlags::default(),
    );
    assert_eq!(descriptor.storage_path.as_deref(), Some("s3://bucket/7001/mask.mrc"));
    assert_eq!(descriptor.size_query.as_deref(), Some("https://files/7001/mask.mrc"));

    let zarr = resolve_query(
        &page,
        "annotation_id=7001&file-format=zarr&object_shape=SegmentationMask",
        FeatureFlags::default(),
    );
    assert_eq!(zarr.storage_path.as_deref(), Some("s3://bucket/7001/mask.zarr"));
    assert_eq!(zarr.size_query, None);
}

#[test]
fn annotation_without_shape_is_not_yet_computable() {
    let descriptor = resolve_query(
        &page(14069),
        "annotation_id=7001&file-format=mrc",
        FeatureFlags::default(),
    );
    assert_eq!(descriptor, DownloadDescriptor::default());
}

#[test]
fn no_download_parameters_resolve_to_nothing() {
    let descriptor = resolve_query(&page(14069), "annotations-page=1&object=ribo", FeatureFlags::default());
    assert_eq!(descriptor, DownloadDescriptor::default());
}

fn tomogram_params() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["10", "13.48", "99"]),
        prop::sample::select(vec!["raw", "denoised", "filtered"]),
        prop::sample::select(vec!["mrc", "zarr"]),
    )
        .prop_map(|(sampling, processing, format)| {
            format!(
                "download-config=tomogram&tomogram-sampling={sampling}&tomogram-processing={processing}&file-format={format}"
            )
        })
}

proptest! {
    #[test]
    fn annotation_parameters_take_precedence(tomogram in tomogram_params(), annotation_first in any::<bool>()) {
        let page = page(14069);
        let annotation = "annotation_id=7001&object_shape=SegmentationMask";
        let query = if annotation_first {
            format!("{annotation}&{tomogram}")
        } else {
            format!("{tomogram}&{annotation}")
        };
        // The tomogram params carry their own file-format, so the annotation file must match it.
        let descriptor = resolve_query(&page, &query, FeatureFlags::default());
        let expected = resolve_query(
            &page,
            &format!("{annotation}&file-format={}", query_format(&query)),
            FeatureFlags::default(),
        );
        prop_assert!(descriptor.storage_path.as_deref().unwrap_or_default().starts_with("s3://bucket/7001/"));
        prop_assert_eq!(descriptor, expected);
    }

    #[test]
    fn resolution_is_deterministic(
        tomogram in tomogram_params(),
        with_annotation in any::<bool>(),
        multiple in any::<bool>(),
    ) {
        let page = page(14069);
        let query = if with_annotation {
            format!("{tomogram}&annotation_id=7001&object_shape=SegmentationMask")
        } else {
            tomogram
        };
        let features = FeatureFlags { multiple_tomograms: multiple };
        prop_assert_eq!(
            resolve_query(&page, &query, features),
            resolve_query(&page, &query, features)
        );
    }
}

fn query_format(query: &str) -> String {
    AddressSnapshot::from_query(query)
        .get("file-format")
        .unwrap_or_default()
        .to_string()
}
