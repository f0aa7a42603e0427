//
// dicom_scan.rs
// Dwi-Prep-rs
//
// Tests for the input-directory inventory: series grouping, skipped files, and the empty-directory failure.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::Path;

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use tempfile::tempdir;

use dwi_prep::errors::PipelineError;
use dwi_prep::scan;

fn write_instance(
    path: &Path,
    series_uid: &str,
    series_number: &str,
    description: &str,
    instance_uid: &str,
) {
    // A minimal MR instance carrying just the series-level attributes the
    // inventory reads.
    let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    obj.put(DataElement::new(
        Tag(0x0008, 0x0016),
        VR::UI,
        PrimitiveValue::from("1.2.840.10008.5.1.4.1.1.4"),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0018),
        VR::UI,
        PrimitiveValue::from(instance_uid),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0060),
        VR::CS,
        PrimitiveValue::from("MR"),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x103E),
        VR::LO,
        PrimitiveValue::from(description),
    ));
    obj.put(DataElement::new(
        Tag(0x0020, 0x000E),
        VR::UI,
        PrimitiveValue::from(series_uid),
    ));
    obj.put(DataElement::new(
        Tag(0x0020, 0x0011),
        VR::IS,
        PrimitiveValue::from(series_number),
    ));

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.4")
        .media_storage_sop_instance_uid(instance_uid)
        .build()
        .expect("meta");

    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    for elem in obj {
        file_obj.put(elem);
    }
    file_obj.write_to_file(path).expect("write test dicom");
}

#[test]
fn inventory_groups_instances_by_series_and_sorts_by_number() {
    let dir = tempdir().expect("tempdir");

    // A two-instance b=0 series and a one-instance diffusion series, plus a
    // stray non-DICOM file like the ones scanners leave behind.
    write_instance(
        &dir.path().join("IM0001"),
        "1.2.826.0.1.3680043.2.1125.10",
        "4",
        "ep2d_diff_b0_PA",
        "1.2.826.0.1.3680043.2.1125.10.1",
    );
    write_instance(
        &dir.path().join("IM0002"),
        "1.2.826.0.1.3680043.2.1125.10",
        "4",
        "ep2d_diff_b0_PA",
        "1.2.826.0.1.3680043.2.1125.10.2",
    );
    write_instance(
        &dir.path().join("IM0003"),
        "1.2.826.0.1.3680043.2.1125.20",
        "2",
        "ep2d_diff_AP",
        "1.2.826.0.1.3680043.2.1125.20.1",
    );
    fs::write(dir.path().join("DICOMDIR.txt"), b"not a dicom file").expect("write stray file");

    let series = scan::inventory(dir.path()).expect("inventory");

    assert_eq!(series.len(), 2);
    // Ordered by series number, not by UID.
    assert_eq!(series[0].series_number.as_deref(), Some("2"));
    assert_eq!(series[0].description.as_deref(), Some("ep2d_diff_AP"));
    assert_eq!(series[0].instances, 1);
    assert_eq!(series[1].series_number.as_deref(), Some("4"));
    assert_eq!(series[1].instances, 2);
    assert_eq!(series[1].modality.as_deref(), Some("MR"));
}

#[test]
fn directory_without_dicom_instances_is_an_acquisition_error() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("notes.txt"), b"just text").expect("write");

    let err = scan::inventory(dir.path()).unwrap_err();
    assert!(matches!(err, PipelineError::Acquisition(_)));
}

#[test]
fn nested_directories_are_swept_recursively() {
    let dir = tempdir().expect("tempdir");
    let nested = dir.path().join("series_002").join("deep");
    fs::create_dir_all(&nested).expect("mkdirs");
    write_instance(
        &nested.join("IM0001"),
        "1.2.826.0.1.3680043.2.1125.30",
        "7",
        "t1_mprage",
        "1.2.826.0.1.3680043.2.1125.30.1",
    );

    let series = scan::inventory(dir.path()).expect("inventory");
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].instances, 1);
}
