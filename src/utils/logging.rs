/// 日志工具模块
///
/// 提供运行日志文件和统计输出的辅助函数
use crate::error::{AppResult, FileError};
use crate::orchestrator::{GenerationProgress, RunReport, RunSummary};
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n考试批量生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|source| FileError::WriteFailed {
        path: log_file_path.to_string(),
        source,
    })?;
    Ok(())
}

/// 把运行报告追加到日志文件
///
/// 每个模板一行，保留各自最后一次的错误信息
pub fn append_run_report(log_file_path: &str, report: &RunReport) -> AppResult<()> {
    let write_failed = |source| FileError::WriteFailed {
        path: log_file_path.to_string(),
        source,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(write_failed)?;

    let mut content = String::new();
    for record in report.progress.records() {
        content.push_str(&format_progress_line(record));
        content.push('\n');
    }
    content.push_str(&format_summary_line(&report.summary));
    content.push('\n');

    file.write_all(content.as_bytes()).map_err(write_failed)?;
    Ok(())
}

/// 格式化单个模板的进度
pub fn format_progress_line(record: &GenerationProgress) -> String {
    let mut line = format!(
        "[{}] {} ({}): 成功 {}/{}, 失败 {} ({:.0}%)",
        record.status,
        record.template_name,
        record.template_id,
        record.completed,
        record.total,
        record.failed,
        record.percent_complete()
    );
    if let Some(error) = &record.last_error {
        line.push_str(&format!(" | 最后错误: {}", truncate_text(error, 200)));
    }
    line
}

/// 格式化汇总
pub fn format_summary_line(summary: &RunSummary) -> String {
    format!(
        "汇总: 成功 {}, 失败 {}{} (开始 {}, 结束 {})",
        summary.total_completed,
        summary.total_failed,
        if summary.partial { ", 已取消(部分完成)" } else { "" },
        summary.started_at.format("%Y-%m-%d %H:%M:%S"),
        summary.finished_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// 记录程序启动信息
pub fn log_startup(api_base_url: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 考试批量生成");
    info!("🌐 服务地址: {}", api_base_url);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部生成完成统计");
    info!(
        "完成时间: {}",
        summary.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}", summary.total_completed);
    info!("❌ 失败: {}", summary.total_failed);
    if summary.partial {
        info!("⚠️ 运行被取消，仅部分完成");
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemplateId;
    use crate::orchestrator::{GenerationStatus, ProgressTracker};

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
    }

    #[test]
    fn test_progress_line_includes_last_error() {
        let record = GenerationProgress {
            template_id: TemplateId::from("t1"),
            template_name: "Exam".into(),
            total: 3,
            completed: 2,
            failed: 1,
            status: GenerationStatus::Completed,
            last_error: Some("timeout".into()),
        };
        let line = format_progress_line(&record);
        assert!(line.starts_with("[completed] Exam (t1): 成功 2/3, 失败 1 (67%)"));
        assert!(line.ends_with("最后错误: timeout"));
    }

    #[test]
    fn test_append_run_report() {
        let path = std::env::temp_dir().join(format!("run_report_{}.txt", std::process::id()));
        let path = path.to_string_lossy().to_string();
        init_log_file(&path).unwrap();

        let now = chrono::Local::now();
        let report = RunReport {
            summary: RunSummary {
                total_completed: 0,
                total_failed: 0,
                partial: false,
                started_at: now,
                finished_at: now,
            },
            progress: ProgressTracker::initialize(&[TemplateId::from("t1")], 1, |_| None),
        };
        append_run_report(&path, &report).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("考试批量生成日志"));
        assert!(content.contains("[pending] Unknown Exam (t1)"));
        assert!(content.contains("汇总: 成功 0, 失败 0"));
        fs::remove_file(&path).unwrap();
    }
}
