use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::environment::Environment;
use crate::models::exam::{ExamField, TemplateId};

/// 运行计划（从 TOML 文件加载）
///
/// ```toml
/// repeat_count = 3
/// templates = ["65f0c0ffee", "65f0decade"]
///
/// [diff]
/// template = "65f0c0ffee"
/// environment = "Staging"
/// fields = ["tags", "questionSets"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPlan {
    /// 按选择顺序列出的模板
    #[serde(default)]
    pub templates: Vec<TemplateId>,
    /// 选择列表中的全部模板（按列表顺序），忽略 `templates`
    #[serde(default)]
    pub select_all: bool,
    /// 每个模板的生成次数
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
    #[serde(default)]
    pub diff: Option<DiffPlan>,
}

fn default_repeat_count() -> u32 {
    1
}

/// diff 报告配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffPlan {
    pub template: TemplateId,
    #[serde(default = "default_environment")]
    pub environment: String,
    /// 为空时比较全部字段
    #[serde(default)]
    pub fields: Vec<String>,
}

fn default_environment() -> String {
    Environment::Staging.name().to_string()
}

impl RunPlan {
    /// 是否包含生成任务
    pub fn has_generation(&self) -> bool {
        self.select_all || !self.templates.is_empty()
    }

    /// 校验计划本身（不涉及远程数据）
    pub fn validate(&self, max_repeat_count: u32) -> Result<(), ConfigError> {
        if !self.has_generation() && self.diff.is_none() {
            return Err(ConfigError::EmptyPlan);
        }
        if self.repeat_count > max_repeat_count {
            return Err(ConfigError::RepeatCountTooLarge {
                requested: self.repeat_count,
                max: max_repeat_count,
            });
        }
        if let Some(diff) = &self.diff {
            diff.environment()?;
            diff.fields()?;
        }
        Ok(())
    }
}

impl DiffPlan {
    pub fn environment(&self) -> Result<Environment, ConfigError> {
        Environment::from_str(&self.environment)
            .ok_or_else(|| ConfigError::UnknownEnvironment(self.environment.clone()))
    }

    pub fn fields(&self) -> Result<Vec<ExamField>, ConfigError> {
        if self.fields.is_empty() {
            return Ok(ExamField::ALL.to_vec());
        }
        self.fields
            .iter()
            .map(|name| {
                ExamField::from_str(name).ok_or_else(|| ConfigError::UnknownField(name.clone()))
            })
            .collect()
    }
}
