//! 批量生成应用 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责加载运行计划、准备外部客户端并调度生成与 diff。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化日志文件、创建 exam-creator 客户端
//! 2. **加载计划**：读取运行计划 TOML，拉取模板列表
//! 3. **解析选择**：按计划中的顺序确定要生成的模板
//! 4. **批量生成**：委托 `GenerationOrchestrator` 串行执行
//! 5. **进度输出**：订阅进度快照，输出总进度
//! 6. **diff 报告**：按计划比较本地模板与所选环境中的部署
//! 7. **全局统计**：汇总并写入日志文件

use crate::clients::{ExamCreatorClient, ExamStore};
use crate::config::Config;
use crate::diff::{format_value, DeploymentSnapshotCache, DiffContext, DiffResult, SnapshotState};
use crate::models::{load_run_plan, DiffPlan, ExamTemplate, RunPlan, TemplateId};
use crate::orchestrator::generation_orchestrator::GenerationOrchestrator;
use crate::orchestrator::progress_tracker::ProgressTracker;
use crate::utils::logging;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    client: Arc<ExamCreatorClient>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)?;

        logging::log_startup(&config.api_base_url);

        let client = ExamCreatorClient::new(&config).context("无法创建 exam-creator 客户端")?;

        Ok(Self {
            config,
            client: Arc::new(client),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let plan = self.load_plan().await?;
        let exams = self.load_exams().await?;

        if plan.has_generation() {
            self.run_generation(&plan, &exams).await?;
        }

        if let Some(diff_plan) = &plan.diff {
            self.run_diff(diff_plan, &exams).await?;
        }

        Ok(())
    }

    /// 加载并校验运行计划
    async fn load_plan(&self) -> Result<RunPlan> {
        info!("\n📁 正在加载运行计划: {}", self.config.run_plan_file);
        let plan = load_run_plan(Path::new(&self.config.run_plan_file)).await?;
        plan.validate(self.config.max_repeat_count)
            .context("运行计划无效")?;
        Ok(plan)
    }

    /// 拉取模板列表
    async fn load_exams(&self) -> Result<Vec<ExamTemplate>> {
        let exams = self.client.list_exams().await.context("无法获取考试模板列表")?;
        info!("✓ 找到 {} 个考试模板", exams.len());
        Ok(exams)
    }

    /// 批量生成
    async fn run_generation(&self, plan: &RunPlan, exams: &[ExamTemplate]) -> Result<()> {
        let selected = resolve_selection(plan, exams);
        let names = template_names(exams);

        let (progress_tx, progress_rx) = watch::channel(ProgressTracker::default());
        let watcher = tokio::spawn(watch_progress(progress_rx));

        let orchestrator =
            GenerationOrchestrator::with_progress_channel(self.client.clone(), progress_tx);

        // Ctrl+C：当前调用结束后停止
        let cancel = orchestrator.cancel_handle();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⚠️ 收到 Ctrl+C，当前生成完成后停止");
                cancel.cancel();
            }
        });

        let result = orchestrator.run(&selected, plan.repeat_count, &names).await;
        ctrl_c.abort();

        // 发送端释放后观察任务自行结束
        drop(orchestrator);
        if let Err(e) = watcher.await {
            warn!("进度观察任务异常结束: {}", e);
        }

        let report = result.context("批量生成失败")?;

        logging::append_run_report(&self.config.output_log_file, &report)?;
        logging::print_final_stats(&report.summary, &self.config.output_log_file);

        Ok(())
    }

    /// 输出 diff 报告
    async fn run_diff(&self, diff_plan: &DiffPlan, exams: &[ExamTemplate]) -> Result<()> {
        let environment = diff_plan.environment()?;
        let fields = diff_plan.fields()?;

        let local = exams
            .iter()
            .find(|exam| exam.id == diff_plan.template)
            .with_context(|| format!("模板列表中不存在: {}", diff_plan.template))?;

        let store: Arc<dyn ExamStore> = self.client.clone();
        let mut ctx = DiffContext::new(local.id.clone(), DeploymentSnapshotCache::new(store));
        ctx.select_environment(environment).await;
        ctx.enable().await;

        info!("\n{}", "=".repeat(60));
        info!(
            "🔍 diff: {} ({}) ↔ {}",
            local.display_name(),
            local.id,
            environment
        );
        info!("{}", "=".repeat(60));

        let report = ctx.field_report(local, &fields).await;
        if let Some(snapshot) = ctx.current_snapshot() {
            debug!("{} 快照状态: {}", environment, snapshot.state.label());
            if let SnapshotState::Error(e) = snapshot.state {
                warn!("⚠️ 无法读取 {} 中的部署，字段不做标注: {}", environment, e);
            }
        }

        for diff in report {
            match &diff.result {
                DiffResult::Modified { deployed_value } => {
                    info!("✏️ {} 已修改", diff.field);
                    info!(
                        "   当前值: {}",
                        logging::truncate_text(&format_value(&diff.current_value), 500)
                    );
                    info!(
                        "   {} 值: {}",
                        environment,
                        logging::truncate_text(&format_value(deployed_value), 500)
                    );
                }
                DiffResult::New => info!("🆕 {} 新建 (未部署到 {})", diff.field, environment),
                DiffResult::Unchanged | DiffResult::Pending => {
                    debug!("{} {}", diff.field, diff.result.label())
                }
            }
        }

        Ok(())
    }
}

/// 确定要生成的模板（按选择顺序）
///
/// `select_all` 时按列表顺序选择全部模板；否则按计划顺序，丢弃列表中不存在的 ID
pub fn resolve_selection(plan: &RunPlan, exams: &[ExamTemplate]) -> Vec<TemplateId> {
    if plan.select_all {
        return exams.iter().map(|exam| exam.id.clone()).collect();
    }

    plan.templates
        .iter()
        .filter(|id| {
            let known = exams.iter().any(|exam| &exam.id == *id);
            if !known {
                warn!("⚠️ 模板 {} 不在模板列表中，已跳过", id);
            }
            known
        })
        .cloned()
        .collect()
}

/// 运行开始时的模板名称快照
///
/// 名称为空的模板不写入，进度中显示为 `Unknown Exam`
pub fn template_names(exams: &[ExamTemplate]) -> HashMap<TemplateId, String> {
    exams
        .iter()
        .filter(|exam| !exam.config.name.trim().is_empty())
        .map(|exam| (exam.id.clone(), exam.config.name.clone()))
        .collect()
}

async fn watch_progress(mut progress_rx: watch::Receiver<ProgressTracker>) {
    while progress_rx.changed().await.is_ok() {
        let tracker = progress_rx.borrow_and_update().clone();
        let total: u32 = tracker.records().iter().map(|r| r.total).sum();
        if total == 0 {
            continue;
        }
        let (completed, failed) = tracker.totals();
        debug!(
            "📈 总进度: {}/{} (成功 {}, 失败 {})",
            completed + failed,
            total,
            completed,
            failed
        );
    }
}
