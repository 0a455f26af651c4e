//! 切片预处理: 把一张归一化后的水平切片变换为模型输入张量.
//!
//! 变换顺序固定: 合法性检查 → 面内逆时针旋转 90 度 → 双线性重采样到
//! [`MODEL_EDGE`]x[`MODEL_EDGE`] → 追加尾部单通道维.

use crate::consts::MODEL_EDGE;
use crate::Idx2d;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

/// 切片无法作为模型输入的原因.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidSliceError {
    /// 切片不含任何像素.
    Empty,

    /// 切片在给定位置 (高, 宽) 含有非有限值 (NaN 或无穷).
    NonFinite(Idx2d),
}

/// 固定分辨率的模型输入张量, 形状恒为 `(MODEL_EDGE, MODEL_EDGE, 1)`.
///
/// 尾部单通道维是分割模型的输入契约的一部分, 本结构保证它的存在,
/// 消费方不需要再检查.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    data: Array3<f32>,
}

impl ModelInput {
    /// 获得数据的一份不可变 shallow copy, 含尾部通道维.
    #[inline]
    pub fn data(&self) -> ArrayView3<f32> {
        self.data.view()
    }

    /// 获得去掉尾部通道维后的二维平面视图.
    #[inline]
    pub fn plane(&self) -> ArrayView2<f32> {
        self.data.index_axis(Axis(2), 0)
    }

    /// 输入张量的固定边长.
    #[inline]
    pub const fn edge() -> usize {
        MODEL_EDGE
    }
}

/// 将 `(h, w)` 切片逆时针旋转 90 度, 得到 `(w, h)` 切片.
///
/// 即 `out[i][j] = in[j][w - 1 - i]`: 原图最右一列成为新图第一行.
fn rot90_ccw(slice: ArrayView2<f32>) -> Array2<f32> {
    let (h, w) = (slice.nrows(), slice.ncols());
    Array2::from_shape_fn((w, h), |(i, j)| slice[[j, w - 1 - i]])
}

/// 将旋转后的切片双线性重采样到 `MODEL_EDGE x MODEL_EDGE`.
fn resample(rotated: Array2<f32>) -> Array2<f32> {
    let (h, w) = (rotated.nrows(), rotated.ncols());
    debug_assert!(rotated.is_standard_layout());
    let img: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(w as u32, h as u32, rotated.into_raw_vec())
            .expect("像素缓冲与尺寸不符");
    let resized = imageops::resize(
        &img,
        MODEL_EDGE as u32,
        MODEL_EDGE as u32,
        FilterType::Triangle,
    );
    Array2::from_shape_vec((MODEL_EDGE, MODEL_EDGE), resized.into_raw()).unwrap()
}

/// 将一张归一化切片预处理为模型输入.
///
/// # 错误
///
/// 1. 切片为空时返回 [`InvalidSliceError::Empty`].
/// 2. 切片含非有限值时返回 [`InvalidSliceError::NonFinite`],
///   携带行优先序第一个违规像素的位置.
pub fn prepare(slice: ArrayView2<f32>) -> Result<ModelInput, InvalidSliceError> {
    if slice.is_empty() {
        return Err(InvalidSliceError::Empty);
    }
    if let Some((pos, _)) = slice.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(InvalidSliceError::NonFinite(pos));
    }

    let plane = resample(rot90_ccw(slice));
    Ok(ModelInput {
        data: plane.insert_axis(Axis(2)),
    })
}
