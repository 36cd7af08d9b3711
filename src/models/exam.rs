use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 考试模板 ID（exam-store 中的 ObjectId 十六进制串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TemplateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TemplateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 考试模板
///
/// 由 exam-store 持有；编排器与 diff 引擎只读取，不直接修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamTemplate {
    pub id: TemplateId,
    pub config: ExamConfig,
    /// 题目集内容（对本工具不透明）
    #[serde(default)]
    pub question_sets: Vec<Value>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default = "default_version")]
    pub version: i64,
    #[serde(default)]
    pub challenges: Vec<ChallengeRef>,
}

fn default_version() -> i64 {
    1
}

impl ExamTemplate {
    /// 创建一个使用默认配置的模板
    pub fn new(id: impl Into<TemplateId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config: ExamConfig {
                name: name.into(),
                ..Default::default()
            },
            question_sets: Vec::new(),
            prerequisites: Vec::new(),
            deprecated: false,
            version: default_version(),
            challenges: Vec::new(),
        }
    }

    /// 显示名称；名称为空时返回 "Untitled Exam"
    pub fn display_name(&self) -> &str {
        if self.config.name.trim().is_empty() {
            "Untitled Exam"
        } else {
            &self.config.name
        }
    }
}

/// 考试配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamConfig {
    pub name: String,
    #[serde(default)]
    pub note: String,
    /// 标签组题目配额
    #[serde(default)]
    pub tags: Vec<TagConfig>,
    /// 题目集配额
    #[serde(default)]
    pub question_sets: Vec<QuestionSetConfig>,
    pub total_time_in_s: Option<i64>,
    pub retake_time_in_s: Option<i64>,
    /// 毫秒精度的考试时长（exam-environment 使用）
    #[serde(rename = "totalTimeInMS")]
    pub total_time_in_ms: Option<f64>,
    #[serde(rename = "retakeTimeInMS")]
    pub retake_time_in_ms: Option<f64>,
    pub passing_percent: f64,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            note: String::new(),
            tags: Vec::new(),
            question_sets: Vec::new(),
            total_time_in_s: Some(2 * 60 * 60),
            retake_time_in_s: Some(24 * 60 * 60),
            total_time_in_ms: Some(2.0 * 60.0 * 60.0 * 1000.0),
            retake_time_in_ms: Some(24.0 * 60.0 * 60.0 * 1000.0),
            passing_percent: 80.0,
        }
    }
}

/// 标签组配额：从带有这组标签的题目中抽取 `number_of_questions` 道
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagConfig {
    pub group: Vec<String>,
    pub number_of_questions: i64,
}

/// 题目集配额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSetConfig {
    #[serde(rename = "type")]
    pub question_type: String,
    pub number_of_set: i64,
    pub number_of_questions: i64,
    pub number_of_correct_answers: i64,
    pub number_of_incorrect_answers: i64,
}

/// 关联的挑战
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRef {
    pub challenge_id: String,
}

/// 生成的考试实例（编排器只关心成功与否，内容被丢弃）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedExam {
    pub id: String,
    #[serde(default)]
    pub exam_id: Option<TemplateId>,
}

/// 可独立比较的模板字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExamField {
    Name,
    Note,
    Tags,
    ConfigQuestionSets,
    TotalTime,
    RetakeTime,
    TotalTimeMs,
    RetakeTimeMs,
    PassingPercent,
    QuestionSets,
    Prerequisites,
    Deprecated,
    Challenges,
}

impl ExamField {
    pub const ALL: [ExamField; 13] = [
        ExamField::Name,
        ExamField::Note,
        ExamField::Tags,
        ExamField::ConfigQuestionSets,
        ExamField::TotalTime,
        ExamField::RetakeTime,
        ExamField::TotalTimeMs,
        ExamField::RetakeTimeMs,
        ExamField::PassingPercent,
        ExamField::QuestionSets,
        ExamField::Prerequisites,
        ExamField::Deprecated,
        ExamField::Challenges,
    ];

    /// 字段路径（与序列化后的字段名一致）
    pub fn name(self) -> &'static str {
        match self {
            ExamField::Name => "config.name",
            ExamField::Note => "config.note",
            ExamField::Tags => "config.tags",
            ExamField::ConfigQuestionSets => "config.questionSets",
            ExamField::TotalTime => "config.totalTimeInS",
            ExamField::RetakeTime => "config.retakeTimeInS",
            ExamField::TotalTimeMs => "config.totalTimeInMS",
            ExamField::RetakeTimeMs => "config.retakeTimeInMS",
            ExamField::PassingPercent => "config.passingPercent",
            ExamField::QuestionSets => "questionSets",
            ExamField::Prerequisites => "prerequisites",
            ExamField::Deprecated => "deprecated",
            ExamField::Challenges => "challenges",
        }
    }

    /// 从字段路径解析（接受带或不带 `config.` 前缀的写法）
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|field| field.name().strip_prefix("config.") == Some(s))
            })
    }

    /// 从模板中取出该字段的值
    pub fn extract(self, exam: &ExamTemplate) -> Value {
        let config = &exam.config;
        let value = match self {
            ExamField::Name => serde_json::to_value(&config.name),
            ExamField::Note => serde_json::to_value(&config.note),
            ExamField::Tags => serde_json::to_value(&config.tags),
            ExamField::ConfigQuestionSets => serde_json::to_value(&config.question_sets),
            ExamField::TotalTime => serde_json::to_value(config.total_time_in_s),
            ExamField::RetakeTime => serde_json::to_value(config.retake_time_in_s),
            ExamField::TotalTimeMs => serde_json::to_value(config.total_time_in_ms),
            ExamField::RetakeTimeMs => serde_json::to_value(config.retake_time_in_ms),
            ExamField::PassingPercent => serde_json::to_value(config.passing_percent),
            ExamField::QuestionSets => serde_json::to_value(&exam.question_sets),
            ExamField::Prerequisites => serde_json::to_value(&exam.prerequisites),
            ExamField::Deprecated => serde_json::to_value(exam.deprecated),
            ExamField::Challenges => serde_json::to_value(&exam.challenges),
        };
        // 非有限浮点数无法表示为 JSON，按缺失处理
        value.unwrap_or(Value::Null)
    }
}

impl std::fmt::Display for ExamField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
