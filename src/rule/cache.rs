//! 规则缓存与加载协调
//! - 每个缓存作用域（RuleStore）只有一份生效的编译后规则集，只替换不修改
//! - 同一时刻至多一次拉取（single-flight），拉取结果分发给所有等待方
//! - 拉取在独立任务中执行，调用方放弃等待不会取消拉取

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::loader::RuleLoader;
use crate::compiler::{CompiledRuleSet, RuleCompiler};
use crate::config::{DetectorConfig, RetryPolicy};
use crate::error::{MmDetectError, MmResult};

/// 一次拉取的结果
pub type LoadOutcome = MmResult<Arc<CompiledRuleSet>>;

type InFlight = watch::Receiver<Option<LoadOutcome>>;

#[derive(Default)]
struct StoreState {
    rules: Option<Arc<CompiledRuleSet>>,
    in_flight: Option<InFlight>,
    failed_attempts: u32,
    last_error: Option<MmDetectError>,
    fetch_count: usize,
}

/// 规则存储槽：生效规则集 + 进行中的拉取
/// 可通过 Arc 在多个检测器实例间共享
#[derive(Default)]
pub struct RuleStore {
    state: Mutex<StoreState>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建可在多个实例间共享的存储
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// 当前生效的规则集，不阻塞
    pub fn get(&self) -> Option<Arc<CompiledRuleSet>> {
        self.lock().rules.clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// 已发起的拉取次数
    pub fn fetch_count(&self) -> usize {
        self.lock().fetch_count
    }

    /// 直接发布一份已编译的规则集（整体替换）
    pub fn publish(&self, rules: Arc<CompiledRuleSet>) {
        let mut state = self.lock();
        state.rules = Some(rules);
        state.failed_attempts = 0;
        state.last_error = None;
    }

    // 状态只做整体替换，锁中毒时沿用内部数据
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 拉取结束：先发布/记录，再清除进行中标记
    fn complete(&self, outcome: &LoadOutcome) {
        let mut state = self.lock();
        state.in_flight = None;
        match outcome {
            Ok(rules) => {
                state.rules = Some(Arc::clone(rules));
                state.failed_attempts = 0;
                state.last_error = None;
            }
            Err(e) => {
                state.failed_attempts += 1;
                state.last_error = Some(e.clone());
            }
        }
    }

    /// 拉取任务异常退出（未发送结果）时释放进行中标记
    fn abandon(&self, rx: &InFlight, error: &MmDetectError) {
        let mut state = self.lock();
        if state.in_flight.as_ref().is_some_and(|current| current.same_channel(rx)) {
            state.in_flight = None;
            state.failed_attempts += 1;
            state.last_error = Some(error.clone());
        }
    }
}

/// 调用方与存储槽的关系
enum Attach {
    Ready(Arc<CompiledRuleSet>),
    Wait(InFlight),
    Refused(MmDetectError),
}

/// 规则缓存 + 加载协调器
pub struct RuleCache {
    loader: Arc<dyn RuleLoader>,
    private_store: Arc<RuleStore>,
    shared_store: Option<Arc<RuleStore>>,
    share_cache: bool,
    retry_policy: RetryPolicy,
}

impl RuleCache {
    /// 创建缓存；`shared_store` 仅在配置开启共享时被读写
    pub fn new(loader: Arc<dyn RuleLoader>, config: &DetectorConfig, shared_store: Option<Arc<RuleStore>>) -> Self {
        Self {
            loader,
            private_store: Arc::new(RuleStore::new()),
            shared_store,
            share_cache: config.share_cache,
            retry_policy: config.retry_policy,
        }
    }

    /// 当前生效的存储槽
    pub fn store(&self) -> &Arc<RuleStore> {
        match (&self.shared_store, self.share_cache) {
            (Some(shared), true) => shared,
            _ => &self.private_store,
        }
    }

    /// 最近一次发布的规则集，不阻塞
    pub fn get_cached(&self) -> Option<Arc<CompiledRuleSet>> {
        self.store().get()
    }

    pub fn is_fetching(&self) -> bool {
        self.store().is_fetching()
    }

    /// 确保规则集可用：已缓存直接返回，否则发起或加入进行中的拉取
    ///
    /// 同一次拉取的所有等待方得到相同结果，只有一个例外：若加入的是一次失败的 `reload`
    /// 且存储槽中已有旧规则集，这里返回旧规则集，而 `reload` 调用方收到错误。
    pub async fn ensure_ready(&self) -> MmResult<Arc<CompiledRuleSet>> {
        match self.attach(false) {
            Attach::Ready(rules) => Ok(rules),
            Attach::Refused(e) => Err(e),
            Attach::Wait(rx) => match self.wait(rx).await {
                Ok(rules) => Ok(rules),
                // 重新加载失败时，旧规则集仍然有效
                Err(e) => match self.get_cached() {
                    Some(rules) => {
                        warn!("Rule reload failed, keeping previous rule set: {}", e);
                        Ok(rules)
                    }
                    None => Err(e),
                },
            },
        }
    }

    /// 强制重新拉取（已缓存也拉取），失败时保留旧规则集并返回错误
    pub async fn reload(&self) -> MmResult<Arc<CompiledRuleSet>> {
        match self.attach(true) {
            Attach::Ready(rules) => Ok(rules),
            Attach::Refused(e) => Err(e),
            Attach::Wait(rx) => self.wait(rx).await,
        }
    }

    /// 在锁内决定：直接返回 / 加入进行中的拉取 / 发起新拉取 / 按重试策略拒绝
    fn attach(&self, force: bool) -> Attach {
        let store = self.store();
        let mut state = store.lock();

        if let Some(rx) = &state.in_flight {
            debug!("Attaching to in-flight rule fetch");
            return Attach::Wait(rx.clone());
        }

        if !force {
            if let Some(rules) = &state.rules {
                return Attach::Ready(Arc::clone(rules));
            }

            if state.failed_attempts > 0 && !self.retry_policy.allows_attempt(state.failed_attempts) {
                let last_error = state
                    .last_error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                warn!(
                    "Retry policy {:?} refuses another fetch after {} failures",
                    self.retry_policy, state.failed_attempts
                );
                return Attach::Refused(MmDetectError::RetryExhausted {
                    attempts: state.failed_attempts,
                    last_error,
                });
            }
        }

        let (tx, rx) = watch::channel(None);
        state.in_flight = Some(rx.clone());
        state.fetch_count += 1;
        drop(state);

        let loader = Arc::clone(&self.loader);
        let store = Arc::clone(store);
        info!("Starting rule fetch via {} loader", loader.name());
        tokio::spawn(async move {
            let outcome = Self::fetch_and_compile(loader.as_ref()).await;
            store.complete(&outcome);
            // 所有接收端都已放弃时发送失败，结果已发布到存储槽
            let _ = tx.send(Some(outcome));
        });

        Attach::Wait(rx)
    }

    /// 等待进行中的拉取结束
    async fn wait(&self, mut rx: InFlight) -> LoadOutcome {
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(outcome) = current {
                return outcome;
            }

            if rx.changed().await.is_err() {
                let current = rx.borrow().clone();
                return match current {
                    Some(outcome) => outcome,
                    None => {
                        let error = MmDetectError::RulesUnavailable("规则拉取任务异常退出".to_string());
                        self.store().abandon(&rx, &error);
                        Err(error)
                    }
                };
            }
        }
    }

    /// 拉取并编译；编译完成前不触碰存储槽
    async fn fetch_and_compile(loader: &dyn RuleLoader) -> LoadOutcome {
        let definition = loader.load().await.map_err(|e| {
            warn!("Rule fetch via {} loader failed: {}", loader.name(), e);
            e
        })?;

        let compiled = RuleCompiler::compile(&definition).map_err(|e| {
            warn!("Rule compilation failed, previous rule set retained: {}", e);
            e
        })?;

        info!(
            "Rule set published: legacy={}, standard={}",
            compiled.legacy_rules.len(),
            compiled.standard_rules.len()
        );
        Ok(Arc::new(compiled))
    }
}
