//! 端到端演示工具: 加载一个 nii 扫描, 跑完整条分割-分期流水线并打印报告.
//!
//! 真实分割模型不在本仓库内, 这里以一个确定性的强度分带分类器占位,
//! 使整条链路在没有模型权重的机器上也可以运行. 接入真实后端时,
//! 只需替换 [`BandClassifier`] 为任何 [`SliceClassifier`] 实现.

use ct_grape::prelude::*;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
fn sep() {
    println!("{SEP}");
}

/// 获取待处理扫描的路径.
///
/// 1. 若给出第一个命令行参数, 则返回其值;
/// 2. 否则, 若环境变量 `$CT_GRAPE_SCAN` 非空, 则返回其值.
fn scan_path_from_arg_or_env() -> Option<PathBuf> {
    env::args()
        .nth(1)
        .or_else(|| env::var("CT_GRAPE_SCAN").ok())
        .map(PathBuf::from)
}

/// 占位分类器: 按归一化强度分带产生逐像素标签.
///
/// 软组织窗下, 肝实质大致落在中间强度带, 高强度带粗略当作病灶.
/// 输出仅用于演示链路, 不具有临床意义.
struct BandClassifier;

impl BandClassifier {
    const LIVER_BAND: (f32, f32) = (0.35, 0.65);
    const TUMOR_BAND: (f32, f32) = (0.65, 0.80);

    fn label_of(v: f32) -> u8 {
        let (ll, lu) = Self::LIVER_BAND;
        let (tl, tu) = Self::TUMOR_BAND;
        if v > tl && v <= tu {
            LITS_TUMOR
        } else if v >= ll && v <= lu {
            LITS_LIVER
        } else {
            LITS_BACKGROUND
        }
    }
}

impl SliceClassifier for BandClassifier {
    fn classify(&self, input: &ModelInput) -> Result<LabelMap, InferenceError> {
        Ok(LabelMap::from_raw(input.plane().mapv(Self::label_of)))
    }
}

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new().init().expect("Logger init error");

    let Some(path) = scan_path_from_arg_or_env() else {
        eprintln!("Usage: runner <scan.nii[.gz]>  (or set $CT_GRAPE_SCAN)");
        return ExitCode::FAILURE;
    };

    log::info!("loading scan from {}", path.display());
    let scan = match CtScan::open(&path) {
        Ok(s) => s,
        Err(e) => {
            log::error!("cannot open scan: {e}");
            return ExitCode::FAILURE;
        }
    };
    let (z, h, w) = scan.shape();
    log::info!(
        "scan loaded: {z} slices of {h}x{w}, slice thickness {:.3} mm",
        scan.slice_thickness_mm()
    );

    let window = CtWindow::from_soft_tissue();
    log::info!(
        "processing with window [{}, {}]",
        window.lower_bound(),
        window.upper_bound()
    );
    let seg = match par_process_volume(&scan, window, &BandClassifier) {
        Ok(seg) => seg,
        Err(e) => {
            log::error!("volume processing failed: {e:?}");
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "segmentation done: {} liver voxels, {} tumor voxels",
        seg.counts.liver,
        seg.counts.tumor
    );

    let report = seg.summarize(scan.slice_thickness_mm());
    sep();
    println!("Liver volume : {:>8.1} cm3", report.liver_volume_cm3);
    println!("Tumor volume : {:>8.1} cm3", report.tumor_volume_cm3);
    println!("Tumor/liver  : {:>8.2} %", report.tlr_percent);
    println!("Staging      : {} ({})", report.stage.as_str(), report.severity.as_str());
    println!("Color        : {}", report.color);
    println!("Best slice   : {}", report.best_slice);
    sep();

    ExitCode::SUCCESS
}
