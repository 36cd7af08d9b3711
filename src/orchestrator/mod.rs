//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量生成和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 加载运行计划和模板列表
//! - 解析选择、输出 diff 报告
//! - 输出全局统计信息
//!
//! ### `generation_orchestrator` - 批量生成编排器
//! - 按选择顺序串行调用远程生成
//! - 每次尝试后发布进度快照
//! - 支持取消
//!
//! ### `progress_tracker` - 进度状态机
//! - 纯数据，无 I/O
//! - 每个转换返回新的快照
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (App)
//!     ↓
//! generation_orchestrator ──→ progress_tracker
//!     ↓
//! diff (能力层：snapshot cache / classifier)
//!     ↓
//! clients (基础设施：ExamCreatorClient)
//! ```

pub mod batch_processor;
pub mod generation_orchestrator;
pub mod progress_tracker;

// 重新导出主要类型
pub use batch_processor::App;
pub use generation_orchestrator::{CancelHandle, GenerationOrchestrator, RunReport, RunSummary};
pub use progress_tracker::{
    GenerationProgress, GenerationStatus, ProgressTracker, UNKNOWN_TEMPLATE_NAME,
};
