//! 外部分割模型的推理适配层.
//!
//! 分割模型本体 (网络结构、权重、运行时) 不在本 crate 内.
//! 这里只固定它与编排器之间的契约: 单通道 2D 输入进, 逐像素标签出.

use crate::data::LabelMap;
use crate::prep::ModelInput;

/// 推理失败的描述.
///
/// 失败原因来自外部模型后端, 对本 crate 是不透明的,
/// 因此以自由文本保存并原样向上传递.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceError {
    /// 后端给出的失败原因.
    pub reason: String,
}

impl InferenceError {
    /// 以给定原因构建错误.
    #[inline]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// 单切片分割能力.
///
/// 任何满足 "给定 [`ModelInput`], 返回同分辨率 {0, 1, 2} 逐像素标签"
/// 契约的实现都可以接入编排器.
///
/// # 实现约定
///
/// 1. 输出 [`LabelMap`] 的形状必须与输入平面一致
///   (即 `MODEL_EDGE x MODEL_EDGE`), 且像素值落在 {背景, 肝脏, 肿瘤} 内.
///   编排器会校验这两点, 违反时整卷处理失败.
/// 2. 实现应当是确定性的: 同一输入多次调用返回相同结果.
/// 3. 实现之间不得共享会随调用变化的状态; 并行编排器会从多个线程
///   并发调用 `classify`.
pub trait SliceClassifier: Sync {
    /// 对一张预处理过的切片做逐像素分类.
    fn classify(&self, input: &ModelInput) -> Result<LabelMap, InferenceError>;
}
