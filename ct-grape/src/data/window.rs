use ndarray::{Array2, ArrayView2};

/// CT 窗口, 包含窗位 (window level) 和窗宽 (window width).
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug)]
pub struct CtWindow {
    level: f32,
    width: f32,
}

/// 归一化分母的保护项, 保证窗宽为 0 时除法仍有定义.
const EPSILON: f32 = 1e-6;

impl CtWindow {
    /// 构建 CT 窗.
    ///
    /// `level` 和 `width` 必须在合理范围内, 否则返回 `None`.
    /// 窗宽允许为 0, 此时所有落窗内的值都会被归一化到 0.
    pub fn new(level: f32, width: f32) -> Option<CtWindow> {
        if (-1e5..=1e5).contains(&level) && (0.0..=1e5).contains(&width) {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 构建一个突出腹部软组织 (肝实质与病灶) 对比度的 CT 窗口.
    /// 该窗口的窗位为 60, 窗宽为 158.
    #[inline]
    pub const fn from_soft_tissue() -> CtWindow {
        Self {
            level: 60.0,
            width: 158.0,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// 求在当前 CT 窗设置下, `ct` HU 值对应的归一化强度 (0.0 <= value <= 1.0).
    ///
    /// 裁剪到 `[lower_bound, upper_bound]` 后线性缩放, 分母带极小保护项,
    /// 因此窗宽为 0 时结果为 0 而不是 NaN.
    ///
    /// 如果 `ct` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, ct: f32) -> Option<f32> {
        if !ct.is_finite() {
            return None;
        }
        let lb = self.lower_bound();
        let ub = self.upper_bound();
        Some((ct.clamp(lb, ub) - lb) / (self.width + EPSILON))
    }

    /// 对一张 `(h, w)` HU 切片逐像素应用 [`CtWindow::eval`],
    /// 返回同形状的归一化强度图.
    ///
    /// 非有限输入像素被映射为 NaN, 由下游预处理统一拒绝,
    /// 本函数不报错.
    pub fn normalize(&self, slice: ArrayView2<f32>) -> Array2<f32> {
        slice.mapv(|hu| self.eval(hu).unwrap_or(f32::NAN))
    }
}
