//! 通用常量.

/// 单通道类别标签.
pub mod gray {
    /// LiTS 标签规范中, 背景的像素值.
    pub const LITS_BACKGROUND: u8 = 0;

    /// LiTS 标签规范中, 肝脏的像素值.
    pub const LITS_LIVER: u8 = 1;

    /// LiTS 标签规范中, 肿瘤的像素值.
    pub const LITS_TUMOR: u8 = 2;

    /// 像素是否是肿瘤?
    #[inline]
    pub const fn is_tumor(p: u8) -> bool {
        matches!(p, LITS_TUMOR)
    }

    /// 像素是否是肝脏?
    #[inline]
    pub const fn is_liver(p: u8) -> bool {
        matches!(p, LITS_LIVER)
    }

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, LITS_BACKGROUND)
    }

    /// 像素是否是肝脏或肿瘤?
    #[inline]
    pub const fn is_liver_or_tumor(p: u8) -> bool {
        matches!(p, LITS_LIVER | LITS_TUMOR)
    }

    /// 像素是否是合法标签 (背景/肝脏/肿瘤之一)?
    #[inline]
    pub const fn is_valid_label(p: u8) -> bool {
        matches!(p, LITS_BACKGROUND | LITS_LIVER | LITS_TUMOR)
    }
}

/// 模型输入图像边长 (像素). 每个体积的每张切片都会被重采样到
/// `MODEL_EDGE x MODEL_EDGE`, 与源体积自身分辨率无关.
pub const MODEL_EDGE: usize = 256;
