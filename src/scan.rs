use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dicom::core::Tag;
use dicom::object::{open_file, DefaultDicomObject};
use rayon::prelude::*;
use tracing::warn;
use walkdir::WalkDir;

use crate::errors::{PipelineError, Result};
use crate::models::SeriesInfo;

const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
const SERIES_NUMBER: Tag = Tag(0x0020, 0x0011);
const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);
const MODALITY: Tag = Tag(0x0008, 0x0060);

fn element_str(obj: &DefaultDicomObject, tag: Tag) -> Option<String> {
    obj.element(tag)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

struct InstanceAttributes {
    series_uid: String,
    series_number: Option<String>,
    modality: Option<String>,
    description: Option<String>,
}

fn describe_instance(obj: &DefaultDicomObject) -> InstanceAttributes {
    InstanceAttributes {
        series_uid: element_str(obj, SERIES_INSTANCE_UID).unwrap_or_else(|| "UNKNOWN".to_string()),
        series_number: element_str(obj, SERIES_NUMBER),
        modality: element_str(obj, MODALITY),
        description: element_str(obj, SERIES_DESCRIPTION),
    }
}

/// Sweep the input directory and group every parseable DICOM instance by
/// its series, so the operator knows what the interactive converter will
/// offer. Scanner exports rarely carry file extensions, so every regular
/// file is probed.
pub fn inventory(dir: &Path) -> Result<Vec<SeriesInfo>> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    let parsed: Vec<Option<InstanceAttributes>> = files
        .par_iter()
        .map(|path| open_file(path).ok().map(|obj| describe_instance(&obj)))
        .collect();

    let skipped = parsed.iter().filter(|p| p.is_none()).count();
    if skipped > 0 {
        warn!(
            "{} file(s) under {:?} are not parseable DICOM and were skipped",
            skipped, dir
        );
    }

    let mut series: BTreeMap<String, SeriesInfo> = BTreeMap::new();
    for instance in parsed.into_iter().flatten() {
        let entry = series
            .entry(instance.series_uid.clone())
            .or_insert_with(|| SeriesInfo {
                series_uid: instance.series_uid.clone(),
                series_number: instance.series_number.clone(),
                modality: instance.modality.clone(),
                description: instance.description.clone(),
                instances: 0,
            });
        entry.instances += 1;
    }

    if series.is_empty() {
        return Err(PipelineError::acquisition(format!(
            "no DICOM instances found under {:?}",
            dir
        )));
    }

    let mut series: Vec<SeriesInfo> = series.into_values().collect();
    series.sort_by_key(|s| {
        let number = s
            .series_number
            .as_deref()
            .and_then(|n| n.parse::<i64>().ok())
            .unwrap_or(i64::MAX);
        (number, s.series_uid.clone())
    });
    Ok(series)
}
