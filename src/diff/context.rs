//! diff 上下文
//!
//! 一个普通的结构体，显式传给需要它的函数：
//! 当前模板、是否处于 diff 模式、所选环境、共享的快照缓存。

use serde_json::Value;
use tracing::info;

use crate::diff::classifier::{classify, classify_template, DiffResult, FieldDiff};
use crate::diff::snapshot_cache::{DeploymentSnapshot, DeploymentSnapshotCache};
use crate::models::{Environment, ExamField, ExamTemplate, TemplateId};

pub struct DiffContext {
    template_id: TemplateId,
    diff_mode: bool,
    selected_environment: Environment,
    cache: DeploymentSnapshotCache,
}

impl DiffContext {
    /// 创建上下文；默认关闭 diff 模式，比较 Staging
    pub fn new(template_id: TemplateId, cache: DeploymentSnapshotCache) -> Self {
        Self {
            template_id,
            diff_mode: false,
            selected_environment: Environment::Staging,
            cache,
        }
    }

    pub fn template_id(&self) -> &TemplateId {
        &self.template_id
    }

    pub fn is_diff_mode(&self) -> bool {
        self.diff_mode
    }

    pub fn selected_environment(&self) -> Environment {
        self.selected_environment
    }

    /// 打开 diff 模式并并发预取两个环境
    pub async fn enable(&mut self) -> Vec<DeploymentSnapshot> {
        self.diff_mode = true;
        info!("🔍 打开 diff 模式: 模板 {}", self.template_id);
        self.cache.prefetch(&self.template_id).await
    }

    /// 关闭 diff 模式；再次打开时重新读取
    pub fn disable(&mut self) {
        self.diff_mode = false;
        self.cache.invalidate_template(&self.template_id);
    }

    /// 切换比较的环境
    ///
    /// 新环境的快照总是重新读取；diff 模式打开时等待读取完成，
    /// 关闭时留给下一次 `enable`。
    pub async fn select_environment(&mut self, environment: Environment) {
        if environment == self.selected_environment {
            return;
        }
        info!("切换比较环境: {} → {}", self.selected_environment, environment);
        self.selected_environment = environment;

        if self.diff_mode {
            self.cache.refresh(&self.template_id, environment).await;
        } else {
            self.cache.invalidate(&self.template_id, environment);
        }
    }

    /// 当前所选环境的快照（非阻塞）；从未请求过时为 `None`
    pub fn current_snapshot(&self) -> Option<DeploymentSnapshot> {
        self.cache.peek(&self.template_id, self.selected_environment)
    }

    /// 单个字段的标注；diff 模式关闭时返回 `None`
    ///
    /// 所选环境的快照尚未请求时在后台发起读取，本次返回 `Pending`。
    pub fn decorate(&self, field: ExamField, current: &Value) -> Option<DiffResult> {
        if !self.diff_mode {
            return None;
        }
        let snapshot = self.cache.request(&self.template_id, self.selected_environment);
        Some(classify(current, field, &snapshot))
    }

    /// 等待所选环境的快照就绪后，生成字段报告
    pub async fn field_report(&self, local: &ExamTemplate, fields: &[ExamField]) -> Vec<FieldDiff> {
        let snapshot = self
            .cache
            .get_snapshot(&self.template_id, self.selected_environment)
            .await;
        classify_template(local, &snapshot, fields)
    }
}
