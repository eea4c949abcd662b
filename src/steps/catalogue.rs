// src/steps/catalogue.rs

//! Step catalogues per pipeline release.
//!
//! Each entry is `(marker basename, module, description, weight)`. Weights are
//! relative processing cost; only their ratio to the run total matters.

use crate::types::ModuleName::{self, *};

pub(super) type StepRow = (&'static str, ModuleName, &'static str, f64);

pub(super) const V1_10_0: &[StepRow] = &[
    // Structural
    ("010_LinearReg_T1w2MNI.status", Structural, "Linear registration of T1w to MNI space", 2.0),
    ("020_LinearReg_FLAIR2T1w.status", StructuralFlair, "Linear registration of FLAIR to T1w", 2.0),
    ("030_Resample_FLAIR2T1w.status", StructuralFlair, "Resampling FLAIR to T1w space", 1.0),
    ("040_Segment_FLAIR.status", StructuralFlair, "Segmentation of FLAIR hyperintensities", 8.0),
    ("050_LesionFilling.status", StructuralFlair, "Lesion filling of the T1w image", 3.0),
    ("060_Segment_T1w.status", Structural, "Segmentation of the T1w image", 20.0),
    ("070_CleanUpWMH_SEGM.status", StructuralFlair, "Clean-up of the WMH segmentation", 2.0),
    ("080_Resample2StandardSpace.status", Structural, "Resampling structural images to standard space", 4.0),
    ("090_GetVolumetrics.status", Structural, "Computing tissue volumetrics", 1.0),
    ("100_VisualQC_Structural.status", Structural, "Visual quality control of structural images", 2.0),
    ("110_DoWAD.status", Structural, "Computing WAD-QC structural parameters", 1.0),
    // Longitudinal registration
    ("010_LongReg.status", LongReg, "Longitudinal registration across visits", 6.0),
    // Cross-subject registration
    ("010_DARTEL.status", Dartel, "DARTEL population registration", 30.0),
    // ASL
    ("010_TopUpASL.status", Asl, "TopUp geometric distortion correction", 4.0),
    ("020_RealignASL.status", Asl, "Motion correction of the ASL series", 4.0),
    ("030_RegisterASL.status", Asl, "Registration of ASL to T1w", 6.0),
    ("040_ResampleASL.status", Asl, "Resampling ASL to standard space", 3.0),
    ("050_PreparePV.status", Asl, "Preparing partial volume maps", 2.0),
    ("060_ProcessM0.status", Asl, "Processing the M0 image", 3.0),
    ("070_CreateAnalysisMask.status", Asl, "Creating the ASL analysis mask", 1.0),
    ("080_Quantification.status", Asl, "CBF quantification", 4.0),
    ("090_VisualQC_ASL.status", Asl, "Visual quality control of ASL images", 2.0),
    ("100_WADQC.status", Asl, "Computing WAD-QC ASL parameters", 1.0),
    // Population
    ("010_CreatePopulationTemplates.status", Population, "Creating population templates", 6.0),
    ("020_CreateAnalysisMask.status", Population, "Creating the population analysis mask", 2.0),
    ("030_CreateBiasfield.status", Population, "Creating the population bias field", 2.0),
    ("040_GetDICOMStatistics.status", Population, "Collecting DICOM parameter statistics", 1.0),
    ("050_GetVolumeStatistics.status", Population, "Collecting volume statistics", 1.0),
    ("060_GetMotionStatistics.status", Population, "Collecting motion statistics", 1.0),
    ("065_GetRegistrationStatistics.status", Population, "Collecting registration statistics", 1.0),
    ("070_GetROIstatistics.status", Population, "Collecting ROI statistics", 4.0),
    ("080_SortBySpatialCoV.status", Population, "Sorting images by spatial CoV", 1.0),
    ("090_DeleteAndZip.status", Population, "Cleaning up and compressing outputs", 1.0),
];

pub(super) const V1_11_0: &[StepRow] = &[
    ("010_LinearReg_T1w2MNI.status", Structural, "Linear registration of T1w to MNI space", 2.0),
    ("020_LinearReg_FLAIR2T1w.status", StructuralFlair, "Linear registration of FLAIR to T1w", 2.0),
    ("030_Resample_FLAIR2T1w.status", StructuralFlair, "Resampling FLAIR to T1w space", 1.0),
    ("040_Segment_FLAIR.status", StructuralFlair, "Segmentation of FLAIR hyperintensities", 8.0),
    ("050_LesionFilling.status", StructuralFlair, "Lesion filling of the T1w image", 3.0),
    ("060_Segment_T1w.status", Structural, "Segmentation of the T1w image", 20.0),
    ("070_CleanUpWMH_SEGM.status", StructuralFlair, "Clean-up of the WMH segmentation", 2.0),
    ("080_Resample2StandardSpace.status", Structural, "Resampling structural images to standard space", 4.0),
    ("090_GetVolumetrics.status", Structural, "Computing tissue volumetrics", 1.0),
    ("100_VisualQC_Structural.status", Structural, "Visual quality control of structural images", 2.0),
    ("110_DoWAD.status", Structural, "Computing WAD-QC structural parameters", 1.0),
    ("010_LongReg.status", LongReg, "Longitudinal registration across visits", 6.0),
    ("010_DARTEL.status", Dartel, "DARTEL population registration", 30.0),
    ("010_TopUpASL.status", Asl, "TopUp geometric distortion correction", 4.0),
    ("020_RealignASL.status", Asl, "Motion correction of the ASL series", 4.0),
    ("030_RegisterASL.status", Asl, "Registration of ASL to T1w", 6.0),
    ("040_ResampleASL.status", Asl, "Resampling ASL to standard space", 3.0),
    ("050_PreparePV.status", Asl, "Preparing partial volume maps", 2.0),
    ("060_ProcessM0.status", Asl, "Processing the M0 image", 3.0),
    ("070_CreateAnalysisMask.status", Asl, "Creating the ASL analysis mask", 1.0),
    ("080_Quantification.status", Asl, "CBF quantification", 4.0),
    ("090_VisualQC_ASL.status", Asl, "Visual quality control of ASL images", 2.0),
    ("100_WADQC.status", Asl, "Computing WAD-QC ASL parameters", 1.0),
    ("010_CreatePopulationTemplates.status", Population, "Creating population templates", 6.0),
    ("020_CreateAnalysisMask.status", Population, "Creating the population analysis mask", 2.0),
    ("030_CreateBiasfield.status", Population, "Creating the population bias field", 2.0),
    ("040_GetDICOMStatistics.status", Population, "Collecting DICOM parameter statistics", 1.0),
    ("050_GetVolumeStatistics.status", Population, "Collecting volume statistics", 1.0),
    ("060_GetMotionStatistics.status", Population, "Collecting motion statistics", 1.0),
    ("065_GetRegistrationStatistics.status", Population, "Collecting registration statistics", 1.0),
    ("070_GetROIstatistics.status", Population, "Collecting ROI statistics", 4.0),
    ("075_GetAtlasStatistics.status", Population, "Collecting atlas-based statistics", 2.0),
    ("080_SortBySpatialCoV.status", Population, "Sorting images by spatial CoV", 1.0),
    ("090_DeleteAndZip.status", Population, "Cleaning up and compressing outputs", 1.0),
];
