pub mod environment;
pub mod exam;
pub mod loaders;
pub mod run_plan;

pub use environment::Environment;
pub use exam::{
    ChallengeRef, ExamConfig, ExamField, ExamTemplate, GeneratedExam, QuestionSetConfig,
    TagConfig, TemplateId,
};
pub use loaders::load_run_plan;
pub use run_plan::{DiffPlan, RunPlan};
