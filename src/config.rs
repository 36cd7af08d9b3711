use tracing::warn;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// exam-creator 服务地址
    pub api_base_url: String,
    /// 会话 ID（以 sid cookie 发送，可选）
    pub session_id: Option<String>,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 运行计划 TOML 文件
    pub run_plan_file: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 每个模板允许的最大生成次数
    pub max_repeat_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".to_string(),
            session_id: None,
            request_timeout_secs: 120,
            run_plan_file: "generation.toml".to_string(),
            output_log_file: "generation_log.txt".to_string(),
            verbose_logging: false,
            max_repeat_count: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("EXAM_CREATOR_API_URL").unwrap_or(default.api_base_url),
            session_id: std::env::var("EXAM_CREATOR_SID").ok().filter(|v| !v.is_empty()),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", default.request_timeout_secs),
            run_plan_file: std::env::var("RUN_PLAN_FILE").unwrap_or(default.run_plan_file),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            verbose_logging: parse_env("VERBOSE_LOGGING", default.verbose_logging),
            max_repeat_count: parse_env("MAX_REPEAT_COUNT", default.max_repeat_count),
        }
    }
}

fn parse_env<T: std::str::FromStr + std::fmt::Debug>(var_name: &str, default: T) -> T {
    match std::env::var(var_name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!(
                "环境变量 {} 的值 '{}' 无法解析，使用默认值 {:?}",
                var_name, value, default
            );
            default
        }),
        Err(_) => default,
    }
}
