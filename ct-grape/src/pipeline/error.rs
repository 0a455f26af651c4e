//! 体积编排过程中的错误类型.

use crate::infer::InferenceError;
use crate::prep::InvalidSliceError;
use crate::Idx2d;

/// 整卷处理失败的原因.
///
/// 任一切片失败都会使整卷失败, 因此除 [`PipelineError::EmptyVolume`]
/// 外每个变体都携带失败切片的 z 索引.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// 输入体积不含任何切片.
    EmptyVolume,

    /// 第 `.0` 张切片未通过预处理.
    InvalidSlice(usize, InvalidSliceError),

    /// 第 `.0` 张切片推理失败.
    Inference(usize, InferenceError),

    /// 第 `.0` 张切片的预测含有非法标签值 `.1`.
    InvalidLabel(usize, u8),

    /// 第 `.0` 张切片的预测形状 `.1` 与模型输入分辨率不符.
    LabelShape(usize, Idx2d),
}

/// 以 [`PipelineError`] 为错误类型的运算结果.
pub type PipelineResult<T> = Result<T, PipelineError>;
