//! 已部署模板快照缓存
//!
//! 按 (模板 ID, 环境) 缓存 exam-store 中已部署的模板：
//! - 首次请求发起一次读取，状态 `Loading → Ready | Absent | Error`；
//!   从未请求过的键没有状态（`peek` 返回 `None`）
//! - 之后的请求直接返回缓存，除非被显式失效
//! - 同一个键同时只有一个读取在进行（single-flight），
//!   并发的调用方共享同一个 future
//! - 失效后才完成的读取不会回填缓存

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::clients::ExamStore;
use crate::models::{Environment, ExamTemplate, TemplateId};

/// 快照状态
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotState {
    /// 读取进行中
    Loading,
    /// 已获取部署的模板
    Ready(Arc<ExamTemplate>),
    /// 该环境中从未部署过此模板（合法结果，不是错误）
    Absent,
    /// 传输或服务端失败
    Error(String),
}

impl SnapshotState {
    pub fn label(&self) -> &'static str {
        match self {
            SnapshotState::Loading => "loading",
            SnapshotState::Ready(_) => "ready",
            SnapshotState::Absent => "absent",
            SnapshotState::Error(_) => "error",
        }
    }
}

/// 某环境的部署快照
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentSnapshot {
    pub environment: Environment,
    pub state: SnapshotState,
}

impl DeploymentSnapshot {
    pub fn new(environment: Environment, state: SnapshotState) -> Self {
        Self { environment, state }
    }

    /// 已部署的模板（仅 `Ready` 时存在）
    pub fn template(&self) -> Option<&ExamTemplate> {
        match &self.state {
            SnapshotState::Ready(template) => Some(template),
            _ => None,
        }
    }
}

type SnapshotKey = (TemplateId, Environment);
type SharedFetch = Shared<BoxFuture<'static, SnapshotState>>;

enum Lookup {
    Resolved(SnapshotState),
    InFlight {
        epoch: u64,
        fetch: SharedFetch,
        /// 本次查询新发起了读取
        started: bool,
    },
}

enum CacheEntry {
    InFlight { epoch: u64, fetch: SharedFetch },
    Resolved(SnapshotState),
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<SnapshotKey, CacheEntry>,
    next_epoch: u64,
}

/// 部署快照缓存
#[derive(Clone)]
pub struct DeploymentSnapshotCache {
    store: Arc<dyn ExamStore>,
    inner: Arc<Mutex<CacheInner>>,
}

impl DeploymentSnapshotCache {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self {
            store,
            inner: Arc::new(Mutex::new(CacheInner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 获取快照；必要时发起（或加入进行中的）读取并等待结果
    pub async fn get_snapshot(
        &self,
        template_id: &TemplateId,
        environment: Environment,
    ) -> DeploymentSnapshot {
        let key = (template_id.clone(), environment);
        let state = match self.lookup_or_start(&key) {
            Lookup::Resolved(state) => state,
            Lookup::InFlight { epoch, fetch, .. } => self.complete_fetch(key, epoch, fetch).await,
        };
        DeploymentSnapshot::new(environment, state)
    }

    /// 非阻塞获取：从未请求过的键在后台发起读取，立即返回当前状态
    ///
    /// 后台读取需要 tokio 运行时；没有运行时时只登记读取，由下一次
    /// `get_snapshot` 驱动完成。
    pub fn request(&self, template_id: &TemplateId, environment: Environment) -> DeploymentSnapshot {
        let key = (template_id.clone(), environment);
        match self.lookup_or_start(&key) {
            Lookup::Resolved(state) => DeploymentSnapshot::new(environment, state),
            Lookup::InFlight {
                epoch,
                fetch,
                started,
            } => {
                if started {
                    if let Ok(handle) = tokio::runtime::Handle::try_current() {
                        let cache = self.clone();
                        handle.spawn(async move {
                            cache.complete_fetch(key, epoch, fetch).await;
                        });
                    }
                }
                DeploymentSnapshot::new(environment, SnapshotState::Loading)
            }
        }
    }

    fn lookup_or_start(&self, key: &SnapshotKey) -> Lookup {
        let mut inner = self.lock();
        match inner.entries.get(key) {
            Some(CacheEntry::Resolved(state)) => Lookup::Resolved(state.clone()),
            Some(CacheEntry::InFlight { epoch, fetch }) => Lookup::InFlight {
                epoch: *epoch,
                fetch: fetch.clone(),
                started: false,
            },
            None => {
                let epoch = inner.next_epoch;
                inner.next_epoch += 1;
                let fetch = self.start_fetch(key.0.clone(), key.1);
                inner.entries.insert(
                    key.clone(),
                    CacheEntry::InFlight {
                        epoch,
                        fetch: fetch.clone(),
                    },
                );
                Lookup::InFlight {
                    epoch,
                    fetch,
                    started: true,
                }
            }
        }
    }

    /// 等待读取完成；键在此期间被失效时不回填
    async fn complete_fetch(&self, key: SnapshotKey, epoch: u64, fetch: SharedFetch) -> SnapshotState {
        let state = fetch.await;

        let mut inner = self.lock();
        let still_current = matches!(
            inner.entries.get(&key),
            Some(CacheEntry::InFlight { epoch: current, .. }) if *current == epoch
        );
        if still_current {
            debug!("快照 {} / {}: {}", key.0, key.1, state.label());
            inner
                .entries
                .insert(key, CacheEntry::Resolved(state.clone()));
        }

        state
    }

    fn start_fetch(&self, template_id: TemplateId, environment: Environment) -> SharedFetch {
        let store = Arc::clone(&self.store);
        async move {
            debug!("读取 {} 环境中的模板 {}", environment, template_id);
            match store.get_deployed_exam(&template_id, environment).await {
                Ok(Some(template)) => SnapshotState::Ready(Arc::new(template)),
                Ok(None) => {
                    info!("模板 {} 尚未部署到 {}", template_id, environment);
                    SnapshotState::Absent
                }
                Err(e) => {
                    warn!("⚠️ 读取 {} 环境中的模板 {} 失败: {}", environment, template_id, e);
                    SnapshotState::Error(e.to_string())
                }
            }
        }
        .boxed()
        .shared()
    }

    /// 非阻塞查看：进行中返回 `Loading`，从未请求过返回 `None`
    pub fn peek(&self, template_id: &TemplateId, environment: Environment) -> Option<DeploymentSnapshot> {
        let inner = self.lock();
        inner
            .entries
            .get(&(template_id.clone(), environment))
            .map(|entry| match entry {
                CacheEntry::InFlight { .. } => {
                    DeploymentSnapshot::new(environment, SnapshotState::Loading)
                }
                CacheEntry::Resolved(state) => DeploymentSnapshot::new(environment, state.clone()),
            })
    }

    /// 并发预取所有环境（各个键互不相关）
    pub async fn prefetch(&self, template_id: &TemplateId) -> Vec<DeploymentSnapshot> {
        join_all(
            Environment::ALL.map(|environment| self.get_snapshot(template_id, environment)),
        )
        .await
    }

    /// 失效单个键
    pub fn invalidate(&self, template_id: &TemplateId, environment: Environment) {
        self.lock().entries.remove(&(template_id.clone(), environment));
    }

    /// 失效某模板在所有环境中的快照
    pub fn invalidate_template(&self, template_id: &TemplateId) {
        self.lock().entries.retain(|(id, _), _| id != template_id);
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// 失效后重新读取
    pub async fn refresh(&self, template_id: &TemplateId, environment: Environment) -> DeploymentSnapshot {
        self.invalidate(template_id, environment);
        self.get_snapshot(template_id, environment).await
    }
}
