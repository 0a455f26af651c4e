use std::ops::Index;
use std::path::Path;

use itertools::Itertools;
use ndarray::{stack, Array3, ArrayView, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::{Idx2d, Idx3d};

pub mod slice;
pub mod window;

pub use slice::{CompactLabelMap, LabelMap, LabelSlice, ScanSlice};
pub use window::CtWindow;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// nii 格式 3D CT 扫描, 包括 header 和 CT 扫描 (HU). HU 值以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct CtScan {
    header: BoxedHeader,
    data: Array3<f32>,
}

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 3D CT nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据水平切片形状大小.
    #[inline]
    fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    ///
    /// 该值也可以通过 `self.{z_mm, height_mm, width_mm}` 分别获取.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取 width 方向 (自然 2D 图像的水平方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn width_mm(&self) -> f64 {
        self.header().pixdim[1] as f64
    }

    /// 获取 height 方向 (自然 2D 图像的垂直方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn height_mm(&self) -> f64 {
        self.header().pixdim[2] as f64
    }

    /// 获取空间方向 (相邻 2D 切片的方向) 体素分辨率, 以毫米为单位.
    #[inline]
    fn z_mm(&self) -> f64 {
        self.header().pixdim[3] as f64
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [z, h, w] = self.pix_dim();
        z == h && z == w
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.affine_spacing().iter().product()
    }

    /// 获取水平切片方向的像素实际面积值, 以平方毫米为单位.
    #[inline]
    fn slice_pixel(&self) -> f64 {
        self.affine_spacing().iter().skip(1).product()
    }

    /// 从仿射矩阵推导体素间距, 以毫米为单位, 按 \[z, 高, 宽\] 排列.
    ///
    /// 当 header 携带 sform 仿射 (`sform_code > 0`) 时, 间距取 3x3
    /// 方向子矩阵的各列 L2 范数, 因此对旋转过的扫描同样正确;
    /// 否则退化为 `pixdim` 字段.
    fn affine_spacing(&self) -> [f64; 3] {
        let h = self.header();
        if h.sform_code > 0 {
            let col_norm = |j: usize| {
                let (x, y, z) = (
                    h.srow_x[j] as f64,
                    h.srow_y[j] as f64,
                    h.srow_z[j] as f64,
                );
                (x * x + y * y + z * z).sqrt()
            };
            // 仿射列序为 [宽, 高, z].
            [col_norm(2), col_norm(1), col_norm(0)]
        } else {
            self.pix_dim()
        }
    }

    /// 获取相邻水平切片之间的物理间距 (层厚), 以毫米为单位.
    #[inline]
    fn slice_thickness_mm(&self) -> f64 {
        self.affine_spacing()[0]
    }
}

impl NiftiHeaderAttr for CtScan {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for CtScan {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl CtScan {
    /// 打开 nii 文件格式的 3D CT 扫描. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj
            .into_volume()
            .into_ndarray()?
            .permuted_axes([2, 1, 0].as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        // 该操作不会生成 `Err`, 可直接 unwrap.
        let data =
            Array3::<f32>::from_shape_vec(get_shape_from_header(&header), data.into_raw_vec())
                .unwrap();

        Ok(Self { header, data })
    }

    /// 根据裸 HU 数据和部分元信息直接创建 `CtScan` 实体.
    ///
    /// # 参数
    ///
    /// 1. `data` 按照 nifti 惯用标准以 \[w, h, z\] 格式存储.
    /// 2. `pix_dim` 按照 \[w, h, z\] 格式存储.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<f32>, pix_dim: [f32; 3]) -> Self {
        let data = data.permuted_axes([2, 1, 0]);
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().to_owned()
        };
        debug_assert!(data.is_standard_layout());

        let mut header = Box::<NiftiHeader>::default();
        let (z, h, w) = {
            let &[z, h, w] = data.shape() else {
                unreachable!()
            };
            (z, h, w)
        };
        header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
        let [_, pw, ph, pz, ..] = &mut header.pixdim;
        let [w, h, z] = &pix_dim;
        assert_eq!(w, h); // 目前仅支持水平方向各向同性的情况
        (*pw, *ph, *pz) = (*w, *h, *z);
        // 无仿射信息, 间距退化为 pixdim.
        header.sform_code = 0;
        header.intent_name[..4].copy_from_slice(b"fake");

        Self { header, data }
    }

    /// 判断该结构是否是由 `fake` 方法手动拼接的.
    pub fn is_faked(&self) -> bool {
        self.header.intent_name.starts_with(b"fake")
    }

    /// 获取 3D 扫描 z 空间的第 `z_index` 层切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ScanSlice<'_> {
        ScanSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取能按升序迭代 3D 扫描水平不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = ScanSlice> {
        self.data.axis_iter(Axis(0)).map(ScanSlice::new)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }
}

/// 由逐切片预测重组而成的 3D 标签体积.
///
/// 数据按 \[z, 高, 宽\] 组织, 第 `z` 层即第 `z` 张输入切片的预测结果,
/// 切片次序与源扫描严格一致.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVolume {
    data: Array3<u8>,
}

impl Index<Idx3d> for LabelVolume {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl LabelVolume {
    /// 由升序排列的逐切片预测标签图重组 3D 标签体积.
    ///
    /// `maps` 必须非空且所有标签图形状一致, 否则程序 panic.
    pub fn from_maps(maps: &[LabelMap]) -> Self {
        assert!(!maps.is_empty(), "标签图序列为空");
        assert!(
            maps.iter().map(|m| m.shape()).all_equal(),
            "标签图形状不一致"
        );
        let views: Vec<_> = maps.iter().map(|m| m.as_immut().array_view()).collect();
        // 形状一致性已校验, 可直接 unwrap.
        let data = stack(Axis(0), &views).unwrap();
        Self { data }
    }

    /// 获取 3D 标签体积 z 空间的第 `z_index` 层不可变切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> LabelSlice {
        LabelSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取能按升序迭代 3D 标签体积水平不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = LabelSlice> {
        self.data.axis_iter(Axis(0)).map(LabelSlice::new)
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        let &[z, h, w] = self.data.shape() else {
            unreachable!()
        };
        (z, h, w)
    }

    /// 获取水平切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 获取 3D 标签体积中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 获取标签体积的基本统计信息.
    ///
    /// 统计信息格式为: \[背景体素数, 肝脏体素数, 肿瘤体素数\].
    /// 该操作不会统计任何其他体素信息.
    pub fn numeric_statistics(&self) -> [usize; 3] {
        let mut ans = [0; 3];
        for pixel in self.data.iter().filter(|p| **p <= 2) {
            ans[*pixel as usize] += 1;
        }
        ans
    }

    /// 将每层预测逐切片压缩, 得到适合整卷缓存的紧凑表示.
    pub fn compress_slices(&self) -> Vec<CompactLabelMap> {
        self.slice_iter().map(|s| s.to_owned().compress()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fake_scan_shape_and_spacing() {
        // [w, h, z] = [2, 2, 3].
        let data = Array3::<f32>::zeros((2, 2, 3));
        let scan = CtScan::fake(data, [0.8, 0.8, 2.5]);
        assert!(scan.is_faked());
        assert_eq!(scan.shape(), (3, 2, 2));
        assert_eq!(scan.len_z(), 3);
        assert_eq!(scan.slice_shape(), (2, 2));
        assert!(f64_eq(scan.slice_thickness_mm(), 2.5));
        let [z, h, w] = scan.affine_spacing();
        assert!(f64_eq(z, 2.5));
        assert!(f64_eq(h, 0.8));
        assert!(f64_eq(w, 0.8));
    }

    /// 带 sform 仿射的 header, 间距应取列范数而非 pixdim.
    #[test]
    fn test_affine_spacing_prefers_sform() {
        let mut scan = CtScan::fake(Array3::<f32>::zeros((2, 2, 2)), [1.0, 1.0, 1.0]);
        scan.header.sform_code = 1;
        // 仿射: 宽 0.7mm, 高 0.7mm, z 5.0mm, 且绕 z 轴旋转 90 度.
        scan.header.srow_x = [0.0, -0.7, 0.0, 0.0];
        scan.header.srow_y = [0.7, 0.0, 0.0, 0.0];
        scan.header.srow_z = [0.0, 0.0, 5.0, 0.0];
        let [z, h, w] = scan.affine_spacing();
        assert!(f64_eq(z, 5.0));
        assert!(f64_eq(h, 0.7));
        assert!(f64_eq(w, 0.7));
        assert!(f64_eq(scan.slice_thickness_mm(), 5.0));
    }

    #[test]
    fn test_label_volume_from_maps() {
        let m0 = LabelMap::from_raw(array![[0, 1], [1, 2]]);
        let m1 = LabelMap::from_raw(array![[0, 0], [1, 0]]);
        let vol = LabelVolume::from_maps(&[m0, m1]);
        assert_eq!(vol.shape(), (2, 2, 2));
        assert_eq!(vol.len_z(), 2);
        assert_eq!(vol[(0, 1, 1)], 2);
        assert_eq!(vol[(1, 1, 0)], 1);
        assert_eq!(vol.count(1), 3);
        assert_eq!(vol.numeric_statistics(), [4, 3, 1]);
        assert_eq!(vol.slice_at(1).numeric_statistics(), [3, 1, 0]);
    }

    #[test]
    #[should_panic]
    fn test_label_volume_shape_mismatch() {
        let m0 = LabelMap::from_raw(array![[0, 1], [1, 2]]);
        let m1 = LabelMap::from_raw(array![[0, 0, 0]]);
        let _ = LabelVolume::from_maps(&[m0, m1]);
    }

    #[test]
    fn test_label_volume_compress_slices() {
        let m0 = LabelMap::from_raw(array![[0, 1], [1, 2]]);
        let m1 = LabelMap::from_raw(array![[0, 0], [1, 0]]);
        let vol = LabelVolume::from_maps(&[m0.clone(), m1]);
        let compact = vol.compress_slices();
        assert_eq!(compact.len(), 2);
        let restored = compact.into_iter().next().unwrap().decompress();
        assert_eq!(restored, m0);
    }
}
