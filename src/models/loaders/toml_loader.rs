use crate::error::{AppResult, FileError};
use crate::models::run_plan::RunPlan;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载运行计划
pub async fn load_run_plan(toml_file_path: &Path) -> AppResult<RunPlan> {
    let path = toml_file_path.display().to_string();

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: path.clone(),
            source,
        })?;

    let plan: RunPlan =
        toml::from_str(&content).map_err(|source| FileError::TomlParseFailed { path, source })?;

    tracing::info!(
        "成功加载运行计划: {} 个模板, 每个生成 {} 次{}",
        plan.templates.len(),
        plan.repeat_count,
        if plan.select_all { " (全选)" } else { "" }
    );

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_load_run_plan_from_file() {
        let path = std::env::temp_dir().join(format!("run_plan_{}.toml", std::process::id()));
        fs::write(&path, "templates = [\"t1\"]\nrepeat_count = 2\n")
            .await
            .unwrap();

        let plan = load_run_plan(&path).await.unwrap();
        assert_eq!(plan.repeat_count, 2);
        assert_eq!(plan.templates.len(), 1);

        fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let err = load_run_plan(Path::new("/definitely/not/here.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::File(FileError::ReadFailed { .. })));
    }
}
