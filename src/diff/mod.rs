//! 部署 diff 引擎（业务能力层）
//!
//! ```text
//! DiffContext (diff 模式 / 所选环境)
//!     ↓
//! DeploymentSnapshotCache (按 模板 × 环境 缓存部署快照)
//!     ↓
//! classifier (unchanged / modified / new)
//!     ↓
//! equality (结构化相等比较)
//! ```

pub mod classifier;
pub mod context;
pub mod equality;
pub mod snapshot_cache;

pub use classifier::{classify, classify_template, format_value, DiffResult, FieldDiff};
pub use context::DiffContext;
pub use equality::values_equal;
pub use snapshot_cache::{DeploymentSnapshot, DeploymentSnapshotCache, SnapshotState};
