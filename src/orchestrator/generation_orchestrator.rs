//! 批量生成编排器 - 编排层
//!
//! ## 职责
//!
//! 对选中的每个模板（按选择顺序）依次发起 `repeat_count` 次远程生成调用，
//! 每次尝试后更新并发布进度，最后汇总整次运行的结果。
//!
//! ## 设计特点
//!
//! - **严格串行**：上一次调用返回后才发起下一次，模板之间不交错
//! - **失败隔离**：单次失败只记入该模板的 `failed`，不会中止运行
//! - **不重试**：生成操作不幂等，每次失败永久占用一个名额
//! - **逐次发布**：每次尝试后通过 watch 通道发布新的进度快照

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::clients::ExamGenerator;
use crate::error::{AppError, AppResult, TrackerError};
use crate::models::TemplateId;
use crate::orchestrator::progress_tracker::{GenerationProgress, ProgressTracker};

/// 运行汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_completed: u32,
    pub total_failed: u32,
    /// 运行被取消，只完成了一部分
    pub partial: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

/// 一次运行的结果：汇总 + 最终进度快照
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub progress: ProgressTracker,
}

/// 取消句柄
///
/// 取消后，当前进行中的调用会正常结束，之后不再发起新的调用。
/// 在 `run` 开始前请求的取消同样生效；每次运行结束时清除。
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 批量生成编排器
pub struct GenerationOrchestrator {
    generator: Arc<dyn ExamGenerator>,
    progress_tx: watch::Sender<ProgressTracker>,
    cancel: CancelHandle,
}

impl GenerationOrchestrator {
    pub fn new(generator: Arc<dyn ExamGenerator>) -> Self {
        let (progress_tx, _) = watch::channel(ProgressTracker::default());
        Self::with_progress_channel(generator, progress_tx)
    }

    /// 使用外部创建的进度通道（观察者可以在编排器创建前订阅）
    pub fn with_progress_channel(
        generator: Arc<dyn ExamGenerator>,
        progress_tx: watch::Sender<ProgressTracker>,
    ) -> Self {
        Self {
            generator,
            progress_tx,
            cancel: CancelHandle::default(),
        }
    }

    /// 订阅进度快照
    pub fn subscribe(&self) -> watch::Receiver<ProgressTracker> {
        self.progress_tx.subscribe()
    }

    /// 当前进度快照
    pub fn progress(&self) -> ProgressTracker {
        self.progress_tx.borrow().clone()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// 丢弃上一次运行的进度
    pub fn reset(&self) {
        self.progress_tx.send_replace(ProgressTracker::default());
    }

    fn publish(&self, tracker: &ProgressTracker) {
        self.progress_tx.send_replace(tracker.clone());
    }

    /// 执行一次批量生成
    ///
    /// # 参数
    /// - `selected`: 选中的模板（按选择顺序；重复的 ID 只保留第一次出现）
    /// - `repeat_count`: 每个模板的生成次数，必须 >= 1
    /// - `names`: 模板名称（运行开始时快照）
    ///
    /// # 返回
    /// 前置条件不满足时在发起任何远程调用前返回错误；
    /// 单次生成失败不会返回错误，只有进度不变量被破坏才会中止运行。
    #[instrument(skip_all, fields(templates = selected.len(), repeat_count = repeat_count))]
    pub async fn run(
        &self,
        selected: &[TemplateId],
        repeat_count: u32,
        names: &HashMap<TemplateId, String>,
    ) -> AppResult<RunReport> {
        let result = self.run_selected(selected, repeat_count, names).await;
        self.cancel.reset();
        result
    }

    async fn run_selected(
        &self,
        selected: &[TemplateId],
        repeat_count: u32,
        names: &HashMap<TemplateId, String>,
    ) -> AppResult<RunReport> {
        let selected = dedupe_preserving_order(selected);
        if selected.is_empty() {
            return Err(AppError::EmptySelection);
        }
        if repeat_count < 1 {
            return Err(AppError::InvalidRepeatCount(repeat_count));
        }

        let started_at = Local::now();

        let mut tracker =
            ProgressTracker::initialize(&selected, repeat_count, |id| names.get(id).cloned());
        self.publish(&tracker);

        info!(
            "🚀 开始批量生成: {} 个模板 × {} 次 = {} 次生成",
            selected.len(),
            repeat_count,
            selected.len() as u64 * u64::from(repeat_count)
        );

        let mut partial = false;

        for (index, template_id) in selected.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("⚠️ 运行已取消，剩余 {} 个模板不再处理", selected.len() - index);
                partial = true;
                break;
            }

            tracker = tracker.mark_in_progress(template_id).map_err(fatal)?;
            self.publish(&tracker);

            let name = template_name(&tracker, template_id);
            info!(
                "[模板 {}] 开始生成 ({}/{}), 共 {} 次",
                name,
                index + 1,
                selected.len(),
                repeat_count
            );

            for attempt in 1..=repeat_count {
                if attempt > 1 && self.cancel.is_cancelled() {
                    warn!("[模板 {}] ⚠️ 运行已取消，停止在第 {} 次之前", name, attempt);
                    partial = true;
                    break;
                }

                tracker = match self.generator.generate_exam(template_id).await {
                    Ok(generated) => {
                        info!(
                            "[模板 {}] ✓ 第 {}/{} 次生成成功: {}",
                            name, attempt, repeat_count, generated.id
                        );
                        tracker.record_success(template_id)
                    }
                    Err(e) => {
                        warn!(
                            "[模板 {}] ❌ 第 {}/{} 次生成失败: {}",
                            name, attempt, repeat_count, e
                        );
                        tracker.record_failure(template_id, e.to_string())
                    }
                }
                .map_err(fatal)?;
                self.publish(&tracker);
            }

            tracker = if partial {
                tracker.finalize_partial(template_id)
            } else {
                tracker.finalize(template_id)
            }
            .map_err(fatal)?;
            self.publish(&tracker);

            if let Some(record) = tracker.get(template_id) {
                log_template_complete(record);
            }

            if partial {
                break;
            }
        }

        let (total_completed, total_failed) = tracker.totals();
        let summary = RunSummary {
            total_completed,
            total_failed,
            partial,
            started_at,
            finished_at: Local::now(),
        };

        Ok(RunReport {
            summary,
            progress: tracker,
        })
    }
}

fn fatal(e: TrackerError) -> AppError {
    error!("❌ 进度记录不一致，终止本次运行: {}", e);
    AppError::Tracker(e)
}

fn template_name(tracker: &ProgressTracker, template_id: &TemplateId) -> String {
    tracker
        .get(template_id)
        .map(|r| r.template_name.clone())
        .unwrap_or_else(|| template_id.to_string())
}

fn dedupe_preserving_order(selected: &[TemplateId]) -> Vec<TemplateId> {
    let mut seen = HashSet::new();
    selected
        .iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

fn log_template_complete(record: &GenerationProgress) {
    info!(
        "[模板 {}] 完成: 成功 {}/{}, 失败 {}, 状态 {}",
        record.template_name, record.completed, record.total, record.failed, record.status
    );
}
