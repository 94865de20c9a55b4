use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PortalError;

macro_rules! numeric_id {
    ($name:ident, $err:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            pub fn get(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = PortalError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value
                    .trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| PortalError::$err(value.to_string()))
            }
        }
    };
}

numeric_id!(RunId, InvalidRunId);
numeric_id!(TomogramId, InvalidTomogramId);
numeric_id!(AnnotationId, InvalidAnnotationId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposition {
    pub id: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tomogram {
    pub id: TomogramId,
    pub processing: String,
    pub voxel_spacing: f64,
    #[serde(default)]
    pub s3_mrc_scale0: Option<String>,
    #[serde(default)]
    pub https_mrc_scale0: Option<String>,
    #[serde(default)]
    pub s3_omezarr_dir: Option<String>,
    #[serde(default)]
    pub https_omezarr_dir: Option<String>,
}

impl Tomogram {
    /// Sampling as it is written into the address, e.g. `10` or `13.48`.
    pub fn sampling(&self) -> String {
        format_sampling(self.voxel_spacing)
    }
}

/// Tomograms of a run that share one voxel spacing, plus the storage prefix they live under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelSpacingGroup {
    pub id: u64,
    pub voxel_spacing: f64,
    #[serde(default)]
    pub s3_prefix: Option<String>,
    #[serde(default)]
    pub tomograms: Vec<Tomogram>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub orcid: Option<String>,
    #[serde(default)]
    pub primary_author_status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationFile {
    pub format: String,
    pub shape_type: String,
    pub s3_path: String,
    pub https_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub object_name: String,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub annotation_software: Option<String>,
    #[serde(default)]
    pub object_count: Option<u64>,
    #[serde(default)]
    pub ground_truth_status: bool,
    #[serde(default)]
    pub method_type: Option<String>,
    #[serde(default)]
    pub confidence_precision: Option<f64>,
    #[serde(default)]
    pub confidence_recall: Option<f64>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub files: Vec<AnnotationFile>,
}

impl Annotation {
    pub fn find_file(&self, format: &str, shape_type: &str) -> Option<&AnnotationFile> {
        self.files
            .iter()
            .find(|file| file.format == format && file.shape_type == shape_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub name: String,
    pub dataset: Dataset,
    #[serde(default)]
    pub tomogram_voxel_spacings: Vec<VoxelSpacingGroup>,
    /// Current page of the run's annotations, already filtered by the catalog.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationAggregates {
    pub total_count: u64,
    pub filtered_count: u64,
}

/// Everything the catalog returns for one run page load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPage {
    pub run: Run,
    #[serde(default)]
    pub annotation_aggregates: AnnotationAggregates,
    #[serde(default)]
    pub deposition: Option<Deposition>,
}

impl RunPage {
    pub fn tomograms(&self) -> impl Iterator<Item = &Tomogram> {
        self.run
            .tomogram_voxel_spacings
            .iter()
            .flat_map(|group| group.tomograms.iter())
    }

    pub fn tomograms_count(&self) -> usize {
        self.tomograms().count()
    }

    /// Distinct processing methods in first-seen order.
    pub fn processing_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = Vec::new();
        for tomogram in self.tomograms() {
            if !methods.contains(&tomogram.processing) {
                methods.push(tomogram.processing.clone());
            }
        }
        methods
    }

    pub fn primary_voxel_spacing(&self) -> Option<&VoxelSpacingGroup> {
        self.run.tomogram_voxel_spacings.first()
    }

    pub fn find_annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.run.annotations.iter().find(|annotation| annotation.id == id)
    }
}

/// Renders a voxel spacing the way JavaScript stringifies numbers: no trailing `.0`.
pub fn format_sampling(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_run_id_valid() {
        let id: RunId = " 14069 ".parse().unwrap();
        assert_eq!(id.get(), 14069);
    }

    #[test]
    fn parse_run_id_invalid() {
        let err = "abc".parse::<RunId>().unwrap_err();
        assert_matches!(err, PortalError::InvalidRunId(_));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn sampling_formatting() {
        assert_eq!(format_sampling(10.0), "10");
        assert_eq!(format_sampling(13.48), "13.48");
    }
}
