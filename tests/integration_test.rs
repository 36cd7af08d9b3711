use async_trait::async_trait;
use exam_generation::clients::{ExamCreatorClient, ExamGenerator, ExamStore};
use exam_generation::config::Config;
use exam_generation::diff::{DeploymentSnapshotCache, DiffContext, DiffResult};
use exam_generation::error::{AppError, AppResult};
use exam_generation::logger;
use exam_generation::models::{Environment, ExamField, ExamTemplate, GeneratedExam, TemplateId};
use exam_generation::orchestrator::batch_processor::template_names;
use exam_generation::orchestrator::{GenerationOrchestrator, GenerationStatus, ProgressTracker};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// 内存中的 exam-creator：按模板预设失败的第 N 次调用
struct InMemoryExamCreator {
    exams: Vec<ExamTemplate>,
    deployments: HashMap<(TemplateId, Environment), ExamTemplate>,
    failures: Vec<(TemplateId, usize)>,
    calls: Mutex<Vec<TemplateId>>,
    /// 调用时检查：之前的模板必须已经到达终态
    progress_rx: Mutex<Option<watch::Receiver<ProgressTracker>>>,
}

impl InMemoryExamCreator {
    fn new(exams: Vec<ExamTemplate>) -> Self {
        Self {
            exams,
            deployments: HashMap::new(),
            failures: Vec::new(),
            calls: Mutex::new(Vec::new()),
            progress_rx: Mutex::new(None),
        }
    }

    fn fail_on(mut self, template_id: &str, nth: usize) -> Self {
        self.failures.push((TemplateId::from(template_id), nth));
        self
    }

    fn deploy(mut self, environment: Environment, exam: ExamTemplate) -> Self {
        self.deployments.insert((exam.id.clone(), environment), exam);
        self
    }

    fn calls(&self) -> Vec<TemplateId> {
        self.calls.lock().unwrap().clone()
    }

    fn assert_no_interleaving(&self, template_id: &TemplateId) {
        let guard = self.progress_rx.lock().unwrap();
        let Some(rx) = guard.as_ref() else {
            return;
        };
        let tracker = rx.borrow();
        for record in tracker.records() {
            if &record.template_id == template_id {
                break;
            }
            assert!(
                record.status.is_terminal(),
                "{} 仍为 {}，却已开始生成 {}",
                record.template_id,
                record.status,
                template_id
            );
        }
        let current = tracker.get(template_id).unwrap();
        assert_eq!(current.status, GenerationStatus::InProgress);
    }
}

#[async_trait]
impl ExamGenerator for InMemoryExamCreator {
    async fn generate_exam(&self, template_id: &TemplateId) -> AppResult<GeneratedExam> {
        self.assert_no_interleaving(template_id);

        let nth = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(template_id.clone());
            calls.iter().filter(|c| *c == template_id).count()
        };
        tokio::task::yield_now().await;

        if self
            .failures
            .iter()
            .any(|(id, n)| id == template_id && *n == nth)
        {
            return Err(AppError::api_bad_response(
                format!("/api/exams/{}/generate", template_id),
                500,
                "Internal Server Error",
            ));
        }
        Ok(GeneratedExam {
            id: format!("gen-{}-{}", template_id, nth),
            exam_id: Some(template_id.clone()),
        })
    }
}

#[async_trait]
impl ExamStore for InMemoryExamCreator {
    async fn list_exams(&self) -> AppResult<Vec<ExamTemplate>> {
        Ok(self.exams.clone())
    }

    async fn get_deployed_exam(
        &self,
        template_id: &TemplateId,
        environment: Environment,
    ) -> AppResult<Option<ExamTemplate>> {
        Ok(self
            .deployments
            .get(&(template_id.clone(), environment))
            .cloned())
    }
}

fn ids(names: &[&str]) -> Vec<TemplateId> {
    names.iter().map(|n| TemplateId::from(*n)).collect()
}

#[tokio::test]
async fn test_batch_generation_with_partial_failure() {
    let exams = vec![ExamTemplate::new("t1", "HTML"), ExamTemplate::new("t2", "CSS")];
    let creator = Arc::new(InMemoryExamCreator::new(exams.clone()).fail_on("t1", 2));

    let (tx, rx) = watch::channel(ProgressTracker::default());
    *creator.progress_rx.lock().unwrap() = Some(rx.clone());

    let orchestrator = GenerationOrchestrator::with_progress_channel(creator.clone(), tx);
    let report = orchestrator
        .run(&ids(&["t1", "t2"]), 3, &template_names(&exams))
        .await
        .unwrap();

    assert_eq!(creator.calls(), ids(&["t1", "t1", "t1", "t2", "t2", "t2"]));

    let t1 = report.progress.get(&"t1".into()).unwrap();
    assert_eq!((t1.completed, t1.failed), (2, 1));
    assert_eq!(t1.status, GenerationStatus::Completed);
    assert_eq!(t1.template_name, "HTML");
    assert!(t1.last_error.is_some());

    let t2 = report.progress.get(&"t2".into()).unwrap();
    assert_eq!((t2.completed, t2.failed), (3, 0));
    assert_eq!(t2.status, GenerationStatus::Completed);
    assert!(t2.last_error.is_none());

    // 汇总等于各模板计数之和
    let (completed, failed) = report.progress.totals();
    assert_eq!(report.summary.total_completed, completed);
    assert_eq!(report.summary.total_failed, failed);
    assert_eq!((completed, failed), (5, 1));
    assert!(report.summary.finished_at >= report.summary.started_at);

    // 观察者看到的最后一个快照就是最终结果
    assert_eq!(*rx.borrow(), report.progress);
}

#[tokio::test]
async fn test_every_attempt_failing_marks_template_failed() {
    let creator = Arc::new(
        InMemoryExamCreator::new(Vec::new())
            .fail_on("t1", 1)
            .fail_on("t1", 2),
    );
    let orchestrator = GenerationOrchestrator::new(creator.clone());

    let report = orchestrator
        .run(&ids(&["t1"]), 2, &HashMap::new())
        .await
        .unwrap();

    let t1 = report.progress.get(&"t1".into()).unwrap();
    assert_eq!((t1.completed, t1.failed), (0, 2));
    assert_eq!(t1.status, GenerationStatus::Failed);
    assert_eq!(t1.template_name, "Unknown Exam");
    assert_eq!(report.summary.total_failed, 2);
}

#[tokio::test]
async fn test_invalid_runs_issue_no_remote_calls() {
    let creator = Arc::new(InMemoryExamCreator::new(Vec::new()));
    let orchestrator = GenerationOrchestrator::new(creator.clone());

    let err = orchestrator.run(&[], 2, &HashMap::new()).await.unwrap_err();
    assert!(err.is_precondition());

    let err = orchestrator
        .run(&ids(&["t1"]), 0, &HashMap::new())
        .await
        .unwrap_err();
    assert!(err.is_precondition());

    assert!(creator.calls().is_empty());
}

#[tokio::test]
async fn test_progress_is_published_for_every_attempt() {
    let creator = Arc::new(InMemoryExamCreator::new(Vec::new()).fail_on("t1", 1));
    let orchestrator = GenerationOrchestrator::new(creator);
    let mut rx = orchestrator.subscribe();

    let observer = tokio::spawn(async move {
        let mut attempts_seen = Vec::new();
        while rx.changed().await.is_ok() {
            let tracker = rx.borrow_and_update().clone();
            if let Some(record) = tracker.get(&"t1".into()) {
                attempts_seen.push(record.attempted());
                if record.status.is_terminal() {
                    break;
                }
            }
        }
        attempts_seen
    });

    orchestrator
        .run(&ids(&["t1"]), 2, &HashMap::new())
        .await
        .unwrap();

    let attempts_seen = observer.await.unwrap();
    // 计数单调递增
    assert!(attempts_seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(attempts_seen.last(), Some(&2));
}

#[tokio::test]
async fn test_diff_against_environments() {
    let local = {
        let mut exam = ExamTemplate::new("t1", "Responsive Web Design");
        exam.config.passing_percent = 75.0;
        exam
    };
    let deployed = ExamTemplate::new("t1", "Responsive Web Design");

    let store = Arc::new(
        InMemoryExamCreator::new(vec![local.clone()]).deploy(Environment::Production, deployed),
    );
    let mut ctx = DiffContext::new(local.id.clone(), DeploymentSnapshotCache::new(store));
    ctx.enable().await;

    // Staging 中没有部署：所有字段都是新建
    assert_eq!(ctx.selected_environment(), Environment::Staging);
    let report = ctx.field_report(&local, &ExamField::ALL).await;
    assert!(report.iter().all(|d| d.result == DiffResult::New));

    // Production 只有及格线不同
    ctx.select_environment(Environment::Production).await;
    for _ in 0..3 {
        assert_eq!(
            ctx.decorate(ExamField::PassingPercent, &serde_json::json!(75.0)),
            Some(DiffResult::Modified {
                deployed_value: serde_json::json!(80.0)
            })
        );
    }
    let report = ctx.field_report(&local, &ExamField::ALL).await;
    let modified: Vec<_> = report
        .iter()
        .filter(|d| matches!(d.result, DiffResult::Modified { .. }))
        .collect();
    assert_eq!(modified.len(), 1);
    assert_eq!(modified[0].field, ExamField::PassingPercent);
    assert_eq!(
        modified[0].result,
        DiffResult::Modified {
            deployed_value: serde_json::json!(80.0)
        }
    );
    assert!(report
        .iter()
        .filter(|d| d.field != ExamField::PassingPercent)
        .all(|d| d.result == DiffResult::Unchanged));
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_list_exams_from_live_server() {
    // 初始化日志
    logger::init(true);

    // 加载配置（EXAM_CREATOR_API_URL / EXAM_CREATOR_SID）
    let config = Config::from_env();

    let client = ExamCreatorClient::new(&config).expect("创建客户端失败");
    let exams = client.list_exams().await.expect("获取模板列表失败");

    for exam in &exams {
        println!("{} - {}", exam.id, exam.display_name());
    }
}
