//! 临床度量与分期: 体素计数 → 物理体积 → 肿瘤/肝脏比 → 分期与报告.
//!
//! 体积折算采用逐切片近似: 每个体素贡献 `层厚 / 1000` 立方厘米.
//! 该近似与逐切片分割的粒度一致, 面内分辨率的影响被归一化吸收.

use crate::pipeline::{RepresentativeSlice, VoxelCounts};
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

/// 肿瘤负荷分期.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// 肿瘤/肝脏比不超过 5%.
    I,

    /// 肿瘤/肝脏比在 (5%, 15%] 内.
    II,

    /// 肿瘤/肝脏比在 (15%, 30%] 内.
    III,

    /// 肿瘤/肝脏比超过 30%, 或分割未找到肝脏.
    IV,
}

impl Stage {
    /// 分期的展示名.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Stage::I => "Stage I",
            Stage::II => "Stage II",
            Stage::III => "Stage III",
            Stage::IV => "Stage IV",
        }
    }
}

/// 严重程度, 与 [`Stage`] 一一对应.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// 对应 Stage I.
    Mild,

    /// 对应 Stage II.
    Moderate,

    /// 对应 Stage III.
    Severe,

    /// 对应 Stage IV.
    Critical,
}

impl Severity {
    /// 严重程度的展示名.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "MILD",
            Severity::Moderate => "MODERATE",
            Severity::Severe => "SEVERE",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[cfg(feature = "serde")]
impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 各严重程度的展示颜色.
static SEVERITY_COLOR: Lazy<HashMap<Severity, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (Severity::Mild, "#2ECC71"),
        (Severity::Moderate, "#F1C40F"),
        (Severity::Severe, "#E67E22"),
        (Severity::Critical, "#E74C3C"),
    ])
});

/// 表中无对应条目时的中性颜色.
const NEUTRAL_COLOR: &str = "#95A5A6";

/// 查询严重程度的展示颜色 (十六进制 RGB). 表中无条目时返回中性灰.
#[inline]
pub fn severity_color(severity: Severity) -> &'static str {
    SEVERITY_COLOR.get(&severity).copied().unwrap_or(NEUTRAL_COLOR)
}

/// 将体素计数折算为物理体积, 以立方厘米为单位.
#[inline]
pub fn voxels_to_cm3(count: usize, slice_thickness_mm: f64) -> f64 {
    count as f64 * slice_thickness_mm / 1000.0
}

/// 由肿瘤/肝脏比 (百分数) 决定分期与严重程度.
///
/// `tlr <= 0` 意味着分割未找到肝脏 (或未找到任何前景),
/// 此时无法给出可信的低负荷结论, 保守地判为最重一档.
pub fn stage_of(tlr: f64) -> (Stage, Severity) {
    if tlr <= 0.0 {
        (Stage::IV, Severity::Critical)
    } else if tlr <= 5.0 {
        (Stage::I, Severity::Mild)
    } else if tlr <= 15.0 {
        (Stage::II, Severity::Moderate)
    } else if tlr <= 30.0 {
        (Stage::III, Severity::Severe)
    } else {
        (Stage::IV, Severity::Critical)
    }
}

/// 保留 `digits` 位小数的十进制舍入.
fn round_to(v: f64, digits: u32) -> f64 {
    let base = 10f64.powi(digits as i32);
    (v * base).round() / base
}

/// 整卷的结构化临床报告.
///
/// 体积保留 1 位小数, 肿瘤/肝脏比保留 2 位小数;
/// 分期基于上报的 (已舍入的) 比值决定, 与报告内容自洽.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ClinicalReport {
    /// 肿瘤负荷分期.
    pub stage: Stage,

    /// 严重程度.
    pub severity: Severity,

    /// 肝脏体积, 以立方厘米为单位.
    pub liver_volume_cm3: f64,

    /// 肿瘤体积, 以立方厘米为单位.
    pub tumor_volume_cm3: f64,

    /// 肿瘤/肝脏体积比, 百分数. 未找到肝脏时为 0.
    pub tlr_percent: f64,

    /// 代表切片的 z 索引. 全卷无肝脏时为 -1.
    pub best_slice: i32,

    /// 严重程度的展示颜色.
    pub color: &'static str,
}

/// 将整卷体素计数与层厚折算为临床报告.
///
/// 肝脏体积为 0 时, 肿瘤/肝脏比取 0 而不是除以零,
/// 随后由 [`stage_of`] 判为 Stage IV / CRITICAL.
pub fn summarize(
    counts: VoxelCounts,
    slice_thickness_mm: f64,
    representative: Option<&RepresentativeSlice>,
) -> ClinicalReport {
    let liver_volume = voxels_to_cm3(counts.liver, slice_thickness_mm);
    let tumor_volume = voxels_to_cm3(counts.tumor, slice_thickness_mm);
    let tlr = if liver_volume > 0.0 {
        round_to(tumor_volume / liver_volume * 100.0, 2)
    } else {
        0.0
    };
    let (stage, severity) = stage_of(tlr);

    ClinicalReport {
        stage,
        severity,
        liver_volume_cm3: round_to(liver_volume, 1),
        tumor_volume_cm3: round_to(tumor_volume, 1),
        tlr_percent: tlr,
        best_slice: representative.map_or(-1, |r| r.index as i32),
        color: severity_color(severity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 各分期边界: 上界含、下界不含.
    #[test]
    fn test_stage_boundaries() {
        assert_eq!(stage_of(0.01), (Stage::I, Severity::Mild));
        assert_eq!(stage_of(5.0), (Stage::I, Severity::Mild));
        assert_eq!(stage_of(5.0001), (Stage::II, Severity::Moderate));
        assert_eq!(stage_of(15.0), (Stage::II, Severity::Moderate));
        assert_eq!(stage_of(15.0001), (Stage::III, Severity::Severe));
        assert_eq!(stage_of(30.0), (Stage::III, Severity::Severe));
        assert_eq!(stage_of(30.0001), (Stage::IV, Severity::Critical));
        assert_eq!(stage_of(100.0), (Stage::IV, Severity::Critical));
    }

    /// 比值为 0 意味着未找到肝脏, 保守判为最重一档.
    #[test]
    fn test_stage_zero_ratio_is_critical() {
        assert_eq!(stage_of(0.0), (Stage::IV, Severity::Critical));
    }

    #[test]
    fn test_severity_colors() {
        assert_eq!(severity_color(Severity::Mild), "#2ECC71");
        assert_eq!(severity_color(Severity::Moderate), "#F1C40F");
        assert_eq!(severity_color(Severity::Severe), "#E67E22");
        assert_eq!(severity_color(Severity::Critical), "#E74C3C");
    }

    #[test]
    fn test_voxels_to_cm3() {
        assert!(f64_eq(voxels_to_cm3(0, 2.5), 0.0));
        assert!(f64_eq(voxels_to_cm3(1000, 1.0), 1.0));
        assert!(f64_eq(voxels_to_cm3(150, 2.5), 0.375));
    }

    #[test]
    fn test_summarize_moderate_case() {
        let counts = VoxelCounts {
            liver: 150,
            tumor: 10,
        };
        let report = summarize(counts, 2.5, None);

        // 0.375 -> 0.4, 0.025 -> 0.0; 比值先于体积舍入计算.
        assert!(f64_eq(report.liver_volume_cm3, 0.4));
        assert!(f64_eq(report.tumor_volume_cm3, 0.0));
        assert!(f64_eq(report.tlr_percent, 6.67));
        assert_eq!(report.stage, Stage::II);
        assert_eq!(report.severity, Severity::Moderate);
        assert_eq!(report.color, "#F1C40F");
        assert_eq!(report.best_slice, -1);
    }

    /// 全背景体积: 比值取 0, 判为 Stage IV / CRITICAL, 无代表切片.
    #[test]
    fn test_summarize_zero_liver() {
        let report = summarize(VoxelCounts::default(), 5.0, None);
        assert!(f64_eq(report.liver_volume_cm3, 0.0));
        assert!(f64_eq(report.tumor_volume_cm3, 0.0));
        assert!(f64_eq(report.tlr_percent, 0.0));
        assert_eq!(report.stage, Stage::IV);
        assert_eq!(report.severity, Severity::Critical);
        assert_eq!(report.color, "#E74C3C");
        assert_eq!(report.best_slice, -1);
    }

    /// 有肿瘤无肝脏: 比值仍按 0 处理.
    #[test]
    fn test_summarize_tumor_without_liver() {
        let counts = VoxelCounts {
            liver: 0,
            tumor: 500,
        };
        let report = summarize(counts, 2.0, None);
        assert!(f64_eq(report.tlr_percent, 0.0));
        assert_eq!(report.stage, Stage::IV);
        assert_eq!(report.severity, Severity::Critical);
        assert!(f64_eq(report.tumor_volume_cm3, 1.0));
    }

    #[test]
    fn test_summarize_mild_case() {
        let counts = VoxelCounts {
            liver: 10_000,
            tumor: 300,
        };
        let report = summarize(counts, 1.0, None);
        assert!(f64_eq(report.liver_volume_cm3, 10.0));
        assert!(f64_eq(report.tumor_volume_cm3, 0.3));
        assert!(f64_eq(report.tlr_percent, 3.0));
        assert_eq!(report.stage, Stage::I);
        assert_eq!(report.severity, Severity::Mild);
        assert_eq!(report.color, "#2ECC71");
    }
}
