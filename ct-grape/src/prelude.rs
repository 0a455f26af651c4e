//! 🍇欢迎光临🍇
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::slice::{CompactLabelMap, LabelMap, LabelSlice, ScanSlice};
pub use crate::data::window::CtWindow;
pub use crate::data::{CtScan, LabelVolume, NiftiHeaderAttr};

pub use crate::consts::gray::{LITS_BACKGROUND, LITS_LIVER, LITS_TUMOR};
pub use crate::consts::MODEL_EDGE;

pub use crate::infer::{InferenceError, SliceClassifier};
pub use crate::prep::{prepare, InvalidSliceError, ModelInput};

pub use crate::pipeline::{
    process_volume, PipelineError, PipelineResult, VolumeSegmentation, VoxelCounts,
};

#[cfg(feature = "rayon")]
pub use crate::pipeline::par_process_volume;

pub use crate::report::{severity_color, summarize, ClinicalReport, Severity, Stage};
