//! 生成进度跟踪器
//!
//! 模板 ID → `GenerationProgress` 的映射，不做任何 I/O。
//!
//! 每个状态转换都接收 `&self` 并返回一份新的快照，外部只需在快照变化时
//! 重新渲染，不参与状态机本身的逻辑。所有修改都是单调的：计数只增不减，
//! 失败的尝试是本次运行的永久记录。

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::models::TemplateId;

/// 模板名称缺失时使用的占位名
pub const UNKNOWN_TEMPLATE_NAME: &str = "Unknown Exam";

/// 单个模板的生成状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::InProgress => "in-progress",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 单个模板在一次运行中的进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationProgress {
    pub template_id: TemplateId,
    /// 运行开始时的名称快照
    pub template_name: String,
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub status: GenerationStatus,
    /// 最近一次失败的错误信息
    pub last_error: Option<String>,
}

impl GenerationProgress {
    fn new(template_id: TemplateId, template_name: String, total: u32) -> Self {
        Self {
            template_id,
            template_name,
            total,
            completed: 0,
            failed: 0,
            status: GenerationStatus::Pending,
            last_error: None,
        }
    }

    /// 已发出的尝试次数
    pub fn attempted(&self) -> u32 {
        self.completed + self.failed
    }

    /// 成功比例（0-100）
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.completed) / f64::from(self.total) * 100.0
    }

    fn check_recordable(&self) -> Result<(), TrackerError> {
        if self.status.is_terminal() {
            return Err(TrackerError::AlreadyFinalized(self.template_id.to_string()));
        }
        if self.attempted() >= self.total {
            return Err(TrackerError::AttemptOverflow {
                template_id: self.template_id.to_string(),
                total: self.total,
            });
        }
        Ok(())
    }

    /// 只要有一次成功就算 completed（部分成功也算成功）
    fn terminal_status(&self) -> GenerationStatus {
        if self.completed > 0 {
            GenerationStatus::Completed
        } else {
            GenerationStatus::Failed
        }
    }
}

/// 进度快照（按选择顺序保存）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTracker {
    records: Vec<GenerationProgress>,
}

impl ProgressTracker {
    /// 为每个模板创建一条 `pending` 记录
    pub fn initialize<F>(template_ids: &[TemplateId], repeat_count: u32, name_lookup: F) -> Self
    where
        F: Fn(&TemplateId) -> Option<String>,
    {
        let records = template_ids
            .iter()
            .map(|id| {
                let name = name_lookup(id).unwrap_or_else(|| UNKNOWN_TEMPLATE_NAME.to_string());
                GenerationProgress::new(id.clone(), name, repeat_count)
            })
            .collect();
        Self { records }
    }

    pub fn get(&self, template_id: &TemplateId) -> Option<&GenerationProgress> {
        self.records.iter().find(|r| &r.template_id == template_id)
    }

    pub fn records(&self) -> &[GenerationProgress] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 全部记录的 (成功总数, 失败总数)
    pub fn totals(&self) -> (u32, u32) {
        self.records
            .iter()
            .fold((0, 0), |(completed, failed), r| (completed + r.completed, failed + r.failed))
    }

    fn update<F>(&self, template_id: &TemplateId, apply: F) -> Result<Self, TrackerError>
    where
        F: FnOnce(&mut GenerationProgress) -> Result<(), TrackerError>,
    {
        let mut next = self.clone();
        let record = next
            .records
            .iter_mut()
            .find(|r| &r.template_id == template_id)
            .ok_or_else(|| TrackerError::UnknownTemplate(template_id.to_string()))?;
        apply(record)?;
        Ok(next)
    }

    /// `pending → in-progress`；其他状态下不做任何事
    pub fn mark_in_progress(&self, template_id: &TemplateId) -> Result<Self, TrackerError> {
        self.update(template_id, |record| {
            if record.status == GenerationStatus::Pending {
                record.status = GenerationStatus::InProgress;
            }
            Ok(())
        })
    }

    pub fn record_success(&self, template_id: &TemplateId) -> Result<Self, TrackerError> {
        self.update(template_id, |record| {
            record.check_recordable()?;
            record.status = GenerationStatus::InProgress;
            record.completed += 1;
            Ok(())
        })
    }

    pub fn record_failure(
        &self,
        template_id: &TemplateId,
        error: impl Into<String>,
    ) -> Result<Self, TrackerError> {
        let error = error.into();
        self.update(template_id, move |record| {
            record.check_recordable()?;
            record.status = GenerationStatus::InProgress;
            record.failed += 1;
            record.last_error = Some(error);
            Ok(())
        })
    }

    /// 设置终态；要求全部尝试都已发出
    pub fn finalize(&self, template_id: &TemplateId) -> Result<Self, TrackerError> {
        self.update(template_id, |record| {
            if record.attempted() != record.total {
                return Err(TrackerError::IncompleteFinalize {
                    template_id: record.template_id.to_string(),
                    completed: record.completed,
                    failed: record.failed,
                    total: record.total,
                });
            }
            record.status = record.terminal_status();
            Ok(())
        })
    }

    /// 取消运行时使用：按已达到的计数设置终态
    pub fn finalize_partial(&self, template_id: &TemplateId) -> Result<Self, TrackerError> {
        self.update(template_id, |record| {
            record.status = record.terminal_status();
            Ok(())
        })
    }
}
