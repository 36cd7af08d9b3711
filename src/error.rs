use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 未选择任何模板（前置条件，不发起任何远程调用）
    #[error("未选择任何考试模板")]
    EmptySelection,

    /// 生成次数不合法（前置条件）
    #[error("生成次数必须 >= 1，实际为 {0}")]
    InvalidRepeatCount(u32),

    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),

    /// 进度跟踪器不变量被破坏（编排逻辑错误，对本次运行是致命的）
    #[error("进度跟踪错误: {0}")]
    Tracker(#[from] TrackerError),

    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

/// 进度跟踪器错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// 模板不在本次运行中
    #[error("模板 {0} 不在本次运行的进度记录中")]
    UnknownTemplate(String),

    /// 尝试次数尚未用完就结束模板
    #[error("模板 {template_id} 尚未完成全部尝试就被结束: 成功 {completed} + 失败 {failed} != 总数 {total}")]
    IncompleteFinalize {
        template_id: String,
        completed: u32,
        failed: u32,
        total: u32,
    },

    /// 记录的尝试次数超过总数
    #[error("模板 {template_id} 的尝试次数超过总数 {total}")]
    AttemptOverflow { template_id: String, total: u32 },

    /// 模板已结束，不再接受新的尝试结果
    #[error("模板 {0} 已结束，不能再记录尝试结果")]
    AlreadyFinalized(String),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 运行计划中的环境名无法识别
    #[error("无法识别的部署环境: {0}")]
    UnknownEnvironment(String),

    /// 运行计划中的字段名无法识别
    #[error("无法识别的考试字段: {0}")]
    UnknownField(String),

    /// 运行计划既没有列出模板也没有 select_all
    #[error("运行计划未指定任何模板 (templates 为空且 select_all = false)")]
    EmptyPlan,

    /// 生成次数超出上限
    #[error("生成次数 {requested} 超出上限 {max}")]
    RepeatCountTooLarge { requested: u32, max: u32 },

    /// HTTP 客户端构建失败
    #[error("HTTP 客户端构建失败: {0}")]
    HttpClient(String),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建API错误响应
    pub fn api_bad_response(
        endpoint: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        AppError::Api(ApiError::BadResponse {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        })
    }

    /// 是否为前置条件错误（调用方同步处理，不计入进度）
    pub fn is_precondition(&self) -> bool {
        matches!(self, AppError::EmptySelection | AppError::InvalidRepeatCount(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
