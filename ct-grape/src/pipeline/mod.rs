//! 体积编排: 按升序逐切片驱动 "归一化 → 预处理 → 推理",
//! 累计逐类体素计数并重组 3D 标签体积.
//!
//! 任一切片失败会使整个体积处理失败, 不产生部分结果.
//! 静默丢弃坏切片会低估真实肝脏/肿瘤体积且没有任何可见信号,
//! 因此绝不这样做.

mod error;

pub use error::{PipelineError, PipelineResult};

use crate::consts::MODEL_EDGE;
use crate::data::{CtScan, CtWindow, LabelMap, LabelVolume, NiftiHeaderAttr, ScanSlice};
use crate::infer::SliceClassifier;
use crate::prep::{self, ModelInput};
use crate::report::ClinicalReport;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Axis;
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 整卷累计的逐类体素计数.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VoxelCounts {
    /// 肝脏体素总数.
    pub liver: usize,

    /// 肿瘤体素总数.
    pub tumor: usize,
}

impl VoxelCounts {
    /// 肝脏与肿瘤体素总数之和.
    #[inline]
    pub fn total(&self) -> usize {
        self.liver + self.tumor
    }
}

/// 代表切片: 肝脏像素数最多的那张切片及其上下文, 供 2D 叠加展示.
///
/// 肝脏像素数相同时, 索引较小者胜出; 全卷无肝脏时不存在代表切片.
#[derive(Debug, Clone)]
pub struct RepresentativeSlice {
    /// 切片的 z 索引.
    pub index: usize,

    /// 该切片上的肝脏像素数, 恒为正.
    pub liver_pixels: usize,

    /// 该切片的模型输入张量, 可直接用于展示.
    pub input: ModelInput,

    /// 该切片的预测标签图.
    pub label: LabelMap,
}

/// 整卷分割结果: 3D 标签体积、逐类计数与代表切片.
#[derive(Debug, Clone)]
pub struct VolumeSegmentation {
    /// 与源扫描切片序严格一致的 3D 标签体积.
    pub labels: LabelVolume,

    /// 整卷逐类体素计数.
    pub counts: VoxelCounts,

    /// 代表切片. 全卷无肝脏时为 `None`.
    pub representative: Option<RepresentativeSlice>,
}

impl VolumeSegmentation {
    /// 代表切片的 z 索引. 全卷无肝脏时为 `None`.
    #[inline]
    pub fn representative_index(&self) -> Option<usize> {
        self.representative.as_ref().map(|r| r.index)
    }

    /// 结合层厚将分割结果折算为临床报告.
    #[inline]
    pub fn summarize(&self, slice_thickness_mm: f64) -> ClinicalReport {
        crate::report::summarize(
            self.counts,
            slice_thickness_mm,
            self.representative.as_ref(),
        )
    }
}

/// 按切片升序合并逐切片结果的累加器.
struct Merger {
    maps: Vec<LabelMap>,
    counts: VoxelCounts,
    representative: Option<RepresentativeSlice>,
}

impl Merger {
    fn with_capacity(depth: usize) -> Self {
        Self {
            maps: Vec::with_capacity(depth),
            counts: VoxelCounts::default(),
            representative: None,
        }
    }

    /// 吸收第 `z` 张切片的结果. 必须按 `z` 升序调用.
    fn push(&mut self, z: usize, input: ModelInput, map: LabelMap) {
        debug_assert_eq!(z, self.maps.len());
        let [_, liver, tumor] = map.as_immut().numeric_statistics();
        self.counts.liver += liver;
        self.counts.tumor += tumor;

        // 严格大于: 计数相同时先到的切片保持胜出.
        let wins = liver > 0
            && self
                .representative
                .as_ref()
                .map_or(true, |r| liver > r.liver_pixels);
        if wins {
            self.representative = Some(RepresentativeSlice {
                index: z,
                liver_pixels: liver,
                input,
                label: map.clone(),
            });
        }
        self.maps.push(map);
    }

    fn finish(self) -> VolumeSegmentation {
        VolumeSegmentation {
            labels: LabelVolume::from_maps(&self.maps),
            counts: self.counts,
            representative: self.representative,
        }
    }
}

/// 处理单张切片: 归一化 → 预处理 → 推理 → 输出校验.
fn run_slice<C>(
    z: usize,
    slice: ScanSlice,
    window: CtWindow,
    model: &C,
) -> PipelineResult<(ModelInput, LabelMap)>
where
    C: SliceClassifier,
{
    let normalized = window.normalize(slice.data());
    let input = prep::prepare(normalized.view()).map_err(|e| PipelineError::InvalidSlice(z, e))?;
    let map = model
        .classify(&input)
        .map_err(|e| PipelineError::Inference(z, e))?;

    let sh = map.shape();
    if sh != (MODEL_EDGE, MODEL_EDGE) {
        return Err(PipelineError::LabelShape(z, sh));
    }
    if let Some(bad) = map.invalid_label() {
        return Err(PipelineError::InvalidLabel(z, bad));
    }
    Ok((input, map))
}

/// 串行处理整卷扫描.
///
/// 切片按升序依次处理, 第一个失败的切片立即中止整卷并带着
/// 它的 z 索引返回.
///
/// # 错误
///
/// 1. 扫描不含切片时返回 [`PipelineError::EmptyVolume`].
/// 2. 其余变体见 [`PipelineError`].
pub fn process_volume<C>(
    scan: &CtScan,
    window: CtWindow,
    model: &C,
) -> PipelineResult<VolumeSegmentation>
where
    C: SliceClassifier,
{
    let depth = scan.len_z();
    if depth == 0 {
        return Err(PipelineError::EmptyVolume);
    }

    let mut merger = Merger::with_capacity(depth);
    for (z, slice) in scan.slice_iter().enumerate() {
        let (input, map) = run_slice(z, slice, window, model)?;
        merger.push(z, input, map);
    }
    Ok(merger.finish())
}

/// 借助 `rayon` 并行处理整卷扫描.
///
/// 切片间互相独立, 可乱序推理; 合并阶段仍按原始 z 索引升序进行,
/// 因此结果与 [`process_volume`] 完全一致. 多张切片同时失败时,
/// 返回 z 索引最小的那个错误.
#[cfg(feature = "rayon")]
pub fn par_process_volume<C>(
    scan: &CtScan,
    window: CtWindow,
    model: &C,
) -> PipelineResult<VolumeSegmentation>
where
    C: SliceClassifier,
{
    let depth = scan.len_z();
    if depth == 0 {
        return Err(PipelineError::EmptyVolume);
    }

    let results: Vec<PipelineResult<(ModelInput, LabelMap)>> = scan
        .data()
        .axis_iter(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(z, v)| run_slice(z, ScanSlice::new(v), window, model))
        .collect();

    let mut merger = Merger::with_capacity(depth);
    for (z, res) in results.into_iter().enumerate() {
        let (input, map) = res?;
        merger.push(z, input, map);
    }
    Ok(merger.finish())
}
