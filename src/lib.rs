//! # Exam Generation
//!
//! 基于 exam-creator 服务的考试批量生成与部署 diff 工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 基础设施层（Clients）
//! - `clients/` - 与 exam-creator 服务通信，只暴露能力
//! - `ExamGenerator` - 触发一次生成
//! - `ExamStore` - 模板列表与各环境中的部署
//!
//! ### ② 业务能力层（Diff）
//! - `diff/` - 比较本地模板与部署，只处理单个模板
//! - `DeploymentSnapshotCache` - 按 模板 × 环境 缓存，单飞读取
//! - `classifier` - 字段级 unchanged / modified / new
//! - `DiffContext` - diff 模式和所选环境
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/progress_tracker` - 进度状态机
//! - `orchestrator/generation_orchestrator` - 串行批量生成
//! - `orchestrator/batch_processor` - 应用入口
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod diff;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod utils;

// 重新导出常用类型
pub use clients::{ExamCreatorClient, ExamGenerator, ExamStore};
pub use config::Config;
pub use diff::{DeploymentSnapshotCache, DiffContext, DiffResult};
pub use error::{AppError, AppResult};
pub use models::{Environment, ExamField, ExamTemplate, RunPlan, TemplateId};
pub use orchestrator::{App, GenerationOrchestrator, ProgressTracker, RunReport};
