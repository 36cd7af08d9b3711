//! 外部协作者契约
//!
//! 编排器与 diff 引擎只通过这两个 trait 接触 exam-store，
//! 传输细节（HTTP、鉴权）由实现方负责。

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Environment, ExamTemplate, GeneratedExam, TemplateId};

/// 生成单个考试实例
///
/// 不保证幂等：重复调用可能产生重复实例，因此调用方不做自动重试。
#[async_trait]
pub trait ExamGenerator: Send + Sync {
    async fn generate_exam(&self, template_id: &TemplateId) -> AppResult<GeneratedExam>;
}

/// 考试模板存储
#[async_trait]
pub trait ExamStore: Send + Sync {
    /// 列出全部模板（用于选择和解析模板名称）
    async fn list_exams(&self) -> AppResult<Vec<ExamTemplate>>;

    /// 查询某环境中已部署的模板；`Ok(None)` 表示从未部署到该环境
    async fn get_deployed_exam(
        &self,
        template_id: &TemplateId,
        environment: Environment,
    ) -> AppResult<Option<ExamTemplate>>;
}
