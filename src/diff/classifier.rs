//! 字段级 diff 分类

use serde_json::Value;

use crate::diff::equality::values_equal;
use crate::diff::snapshot_cache::{DeploymentSnapshot, SnapshotState};
use crate::models::{ExamField, ExamTemplate};

/// 单个字段的 diff 结果（每次渲染重新计算，不持久化）
#[derive(Debug, Clone, PartialEq)]
pub enum DiffResult {
    /// 与部署值一致（或快照读取失败，按未修改显示）
    Unchanged,
    /// 与部署值不同，附带部署值用于并排展示
    Modified { deployed_value: Value },
    /// 该环境中没有此模板的部署，无可比较对象
    New,
    /// 快照仍在读取中，不做任何标注
    Pending,
}

impl DiffResult {
    pub fn label(&self) -> &'static str {
        match self {
            DiffResult::Unchanged => "unchanged",
            DiffResult::Modified { .. } => "modified",
            DiffResult::New => "new",
            DiffResult::Pending => "pending",
        }
    }

    /// 是否需要在字段上加标注（Modified / New）
    pub fn is_decorated(&self) -> bool {
        matches!(self, DiffResult::Modified { .. } | DiffResult::New)
    }
}

/// 字段及其 diff 结果
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiff {
    pub field: ExamField,
    pub current_value: Value,
    pub result: DiffResult,
}

/// 对单个字段分类
pub fn classify(current: &Value, field: ExamField, snapshot: &DeploymentSnapshot) -> DiffResult {
    match &snapshot.state {
        SnapshotState::Loading => DiffResult::Pending,
        SnapshotState::Error(_) => DiffResult::Unchanged,
        SnapshotState::Absent => DiffResult::New,
        SnapshotState::Ready(deployed) => {
            let deployed_value = field.extract(deployed);
            if values_equal(current, &deployed_value) {
                DiffResult::Unchanged
            } else {
                DiffResult::Modified { deployed_value }
            }
        }
    }
}

/// 对本地模板的多个字段分类
pub fn classify_template(
    local: &ExamTemplate,
    snapshot: &DeploymentSnapshot,
    fields: &[ExamField],
) -> Vec<FieldDiff> {
    fields
        .iter()
        .map(|&field| {
            let current_value = field.extract(local);
            let result = classify(&current_value, field, snapshot);
            FieldDiff {
                field,
                current_value,
                result,
            }
        })
        .collect()
}

/// 格式化字段值用于展示（对象和数组使用缩进 JSON）
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Environment, TagConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn ready(template: ExamTemplate) -> DeploymentSnapshot {
        DeploymentSnapshot::new(Environment::Production, SnapshotState::Ready(Arc::new(template)))
    }

    #[test]
    fn test_unchanged_and_modified() {
        let deployed = ExamTemplate::new("t1", "Exam");
        let snapshot = ready(deployed);

        assert_eq!(classify(&json!("Exam"), ExamField::Name, &snapshot), DiffResult::Unchanged);
        assert_eq!(
            classify(&json!("Exam v2"), ExamField::Name, &snapshot),
            DiffResult::Modified {
                deployed_value: json!("Exam")
            }
        );
    }

    #[test]
    fn test_absent_is_new_for_every_field() {
        let local = ExamTemplate::new("t1", "Exam");
        let snapshot = DeploymentSnapshot::new(Environment::Staging, SnapshotState::Absent);

        let diffs = classify_template(&local, &snapshot, &ExamField::ALL);
        assert_eq!(diffs.len(), ExamField::ALL.len());
        assert!(diffs.iter().all(|d| d.result == DiffResult::New));
    }

    #[test]
    fn test_loading_and_error_are_undecorated() {
        let loading = DeploymentSnapshot::new(Environment::Staging, SnapshotState::Loading);
        let error = DeploymentSnapshot::new(Environment::Staging, SnapshotState::Error("boom".into()));

        let pending = classify(&json!("x"), ExamField::Name, &loading);
        assert_eq!(pending, DiffResult::Pending);
        assert!(!pending.is_decorated());

        let failed = classify(&json!("x"), ExamField::Name, &error);
        assert_eq!(failed, DiffResult::Unchanged);
        assert!(!failed.is_decorated());
    }

    #[test]
    fn test_classify_is_idempotent() {
        let mut local = ExamTemplate::new("t1", "Exam");
        local.config.tags.push(TagConfig {
            group: vec!["css".into()],
            number_of_questions: 3,
        });
        let snapshot = ready(ExamTemplate::new("t1", "Exam"));

        let first = classify_template(&local, &snapshot, &ExamField::ALL);
        let second = classify_template(&local, &snapshot, &ExamField::ALL);
        assert_eq!(first, second);

        let modified: Vec<_> = first.iter().filter(|d| d.result.is_decorated()).collect();
        assert_eq!(modified.len(), 1);
        assert_eq!(modified[0].field, ExamField::Tags);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("name")), "name");
        assert_eq!(format_value(&Value::Null), "null");
        assert_eq!(format_value(&json!([1])), "[\n  1\n]");
    }
}
