#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供 3D 腹部 CT 扫描的逐切片语义分割编排、3D 标签体积重建、
//! 体积测量与临床分期功能.
//!
//! 流水线严格单向: 原始体积 → 窗口归一化/预处理切片 → 逐切片标签 →
//! 聚合 3D 标签体积 + 计数 → 物理体积 → 分期 → 结构化报告.
//! 任何组件都不依赖其下游.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 分割模型本身不在本 crate 内. 模型被抽象为 [`infer::SliceClassifier`]
//!   单方法能力, 任何满足 "给定单通道 2D 图像, 返回 {0, 1, 2} 逐像素标签"
//!   契约的实现都可以接入, 编排器无需改动.
//! 2. 任一切片处理失败会使整个体积处理失败, 不产生部分结果.
//!   静默丢弃坏切片会低估真实肝脏/肿瘤体积且没有任何可见信号,
//!   因此绝不这样做.
//! 3. 在非期望情况下 (如索引越界), 程序会直接 panic, 而不会导致内存错误.
//!   As what Rust promises.
//!
//! # 模块总览
//!
//! ### CT 窗口归一化 ✅
//!
//! 将扫描仪 HU 值按照固定窗口 (窗位, 窗宽) 裁剪并线性缩放到 `[0, 1]`.
//!
//! 实现位于 `ct-grape/src/data/window.rs`.
//!
//! ### 切片预处理 ✅
//!
//! 面内旋转对齐 + 双线性重采样到模型固定分辨率, 输出保留尾部单通道维.
//!
//! 实现位于 `ct-grape/src/prep.rs`.
//!
//! ### 推理适配 ✅
//!
//! 外部分割模型的多态接缝.
//!
//! 实现位于 `ct-grape/src/infer.rs`.
//!
//! ### 体积编排 ✅
//!
//! 按升序逐切片驱动 "归一化 → 预处理 → 推理", 累计逐类体素计数,
//! 跟踪代表切片, 重组 3D 标签体积. 提供可选的 rayon 并行版本
//! (合并仍按原始索引序).
//!
//! 实现位于 `ct-grape/src/pipeline`.
//!
//! ### 临床度量与分期 ✅
//!
//! 体素计数 → 物理体积 (cm³) → 肿瘤/肝脏比 → 分期/严重程度 → 报告.
//!
//! 实现位于 `ct-grape/src/report.rs`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 3D CT nii 文件与预测标签体积的基础数据结构.
mod data;

pub use data::{
    CompactLabelMap, CtScan, CtWindow, LabelMap, LabelSlice, LabelVolume, NiftiHeaderAttr,
    ScanSlice,
};

pub mod consts;

pub mod infer;

pub mod prep;

pub mod pipeline;

pub mod report;

pub mod prelude;
