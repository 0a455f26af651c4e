//! 二维水平切片视图与拥有所有权的预测标签图.

use crate::consts::gray::*;
use crate::Idx2d;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ndarray::iter::Iter;
use ndarray::{Array2, ArrayView2, Ix2};
use std::borrow::Cow;
use std::io::{Read, Write};
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 不可变、借用的二维水平 CT 扫描切片.
pub struct ScanSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::CtScan`].
    ///
    /// 这里有意把代码写死为 `ArrayView` 降低灵活性, 但使结构的意图更加明确.
    data: ArrayView2<'a, f32>,
}

impl Index<Idx2d> for ScanSlice<'_> {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> ScanSlice<'a> {
    /// 直接初始化.
    #[inline]
    pub(crate) fn new(data: ArrayView2<'a, f32>) -> Self {
        Self { data }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView2<f32> {
        self.data.view()
    }

    /// 获取可以迭代图像像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'_, f32, Ix2> {
        self.data.iter()
    }

    /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&f32> {
        self.data.get(pos)
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let &[h, w] = self.data.shape() else {
            unreachable!()
        };
        (h, w)
    }

    /// 图像的像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (h, w) = self.shape();
        h * w
    }

    /// 以行优先规则, 获取能迭代图像所有 `(索引, CT HU 值)` 的迭代器.
    #[inline]
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &f32)> {
        self.data.indexed_iter()
    }
}

/// 不可变、借用的二维水平标签切片.
pub struct LabelSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::LabelVolume`].
    ///
    /// 这里有意把代码写死为 `ArrayView` 降低灵活性, 但使结构的意图更加明确.
    data: ArrayView2<'a, u8>,
}

impl Index<Idx2d> for LabelSlice<'_> {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> LabelSlice<'a> {
    /// 直接初始化.
    #[inline]
    pub(crate) fn new(data: ArrayView2<'a, u8>) -> Self {
        Self { data }
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'a, u8> {
        self.data
    }

    /// 获取可以迭代图像像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'_, u8, Ix2> {
        self.data.iter()
    }

    /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u8> {
        self.data.get(pos)
    }

    /// 该图是否为全背景图?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().copied().all(is_background)
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let &[h, w] = self.data.shape() else {
            unreachable!()
        };
        (h, w)
    }

    /// 图像的像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (h, w) = self.shape();
        h * w
    }

    /// 统计图像中值为 `label` 的像素总个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|&p| *p == label).count()
    }

    /// 判断图像上是否有肿瘤 [`LITS_TUMOR`] 像素.
    #[inline]
    pub fn has_tumor(&self) -> bool {
        self.iter().any(|c| is_tumor(*c))
    }

    /// 判断图像上是否有肝脏 [`LITS_LIVER`] 像素.
    #[inline]
    pub fn has_liver(&self) -> bool {
        self.iter().any(|c| is_liver(*c))
    }

    /// 获取标签切片的基本统计信息.
    ///
    /// 统计信息格式为: \[背景像素数, 肝脏像素数, 肿瘤像素数\].
    /// 该操作不会统计任何其他像素信息.
    pub fn numeric_statistics(&self) -> [usize; 3] {
        let mut ans = [0; 3];
        for pixel in self.data.iter().filter(|p| **p <= 2) {
            ans[*pixel as usize] += 1;
        }
        ans
    }

    /// 克隆自己, 获得一个拥有所有权的标签图.
    pub fn to_owned(&self) -> LabelMap {
        LabelMap {
            data: self.data.to_owned(),
        }
    }
}

/// 拥有所有权的二维预测标签图, 即分割模型对单张切片的逐像素输出.
///
/// 像素值应当落在 {背景, 肝脏, 肿瘤} 之内; [`LabelMap::invalid_label`]
/// 可以校验这一点.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMap {
    data: Array2<u8>,
}

impl LabelMap {
    /// 从底层数组初始化.
    #[inline]
    pub fn from_raw(data: Array2<u8>) -> Self {
        Self { data }
    }

    /// 获得不可变切片引用.
    #[inline]
    pub fn as_immut(&self) -> LabelSlice<'_> {
        LabelSlice::new(self.data.view())
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<u8> {
        self.data
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.as_immut().shape()
    }

    /// 肝脏像素总数.
    #[inline]
    pub fn liver_pixels(&self) -> usize {
        self.as_immut().count(LITS_LIVER)
    }

    /// 肿瘤像素总数.
    #[inline]
    pub fn tumor_pixels(&self) -> usize {
        self.as_immut().count(LITS_TUMOR)
    }

    /// 寻找第一个不属于 {背景, 肝脏, 肿瘤} 的像素值.
    /// 全部合法时返回 `None`.
    pub fn invalid_label(&self) -> Option<u8> {
        self.data.iter().copied().find(|&p| !is_valid_label(p))
    }

    /// 将图像转化为行优先的序列化存储.
    /// 当原始数据本身就是行优先格式时, 可以避免一次 deepcopy.
    pub fn as_row_major_slice(&self) -> Cow<[u8]> {
        if self.data.is_standard_layout() {
            Cow::Borrowed(self.data.as_slice().unwrap())
        } else {
            let mut buf = Vec::with_capacity(self.data.len());
            buf.extend(self.data.iter());
            Cow::Owned(buf)
        }
    }

    /// 压缩数据.
    pub fn compress(&self) -> CompactLabelMap {
        let buf = self.as_row_major_slice();
        let mut e = ZlibEncoder::new(Vec::with_capacity(8), Compression::best());
        e.write_all(buf.as_ref()).expect("Compression error");
        CompactLabelMap {
            buf: e.finish().expect("Compression error"),
            sh: self.shape(),
        }
    }
}

/// 压缩存储的 [`LabelMap`]; 不透明类型.
///
/// 预测标签图几乎总是大片背景, zlib 压缩对它非常有效,
/// 适合整卷缓存或落盘.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompactLabelMap {
    /// 压缩的不透明字节流.
    buf: Vec<u8>,

    /// 形状.
    sh: Idx2d,
}

impl CompactLabelMap {
    /// 解压缩数据.
    pub fn decompress(self) -> LabelMap {
        let Self { buf, sh: (h, w) } = self;
        let mut d = ZlibDecoder::new(buf.as_slice());
        let mut buf = Vec::with_capacity(h * w);
        d.read_to_end(&mut buf).expect("Decompression error");
        debug_assert_eq!(buf.len(), h * w);
        let data = Array2::<u8>::from_shape_vec((h, w), buf).unwrap();
        LabelMap { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_label_map_statistics() {
        let map = LabelMap::from_raw(array![[0, 1, 1], [2, 0, 1]]);
        assert_eq!(map.liver_pixels(), 3);
        assert_eq!(map.tumor_pixels(), 1);
        assert_eq!(map.as_immut().numeric_statistics(), [2, 3, 1]);
        assert_eq!(map.invalid_label(), None);
        assert!(map.as_immut().has_liver());
        assert!(map.as_immut().has_tumor());
    }

    #[test]
    fn test_label_map_invalid_label() {
        let map = LabelMap::from_raw(array![[0, 1], [7, 2]]);
        assert_eq!(map.invalid_label(), Some(7));
    }

    #[test]
    fn test_compact_label_map_identity() {
        let map = LabelMap::from_raw(array![[0, 0, 1], [1, 2, 0], [0, 0, 0]]);
        let restored = map.clone().compress().decompress();
        assert_eq!(restored, map);
        assert_eq!(restored.shape(), (3, 3));
    }
}
