use crate::grace::WaitPolicy;
use crate::reader::LocalReader;
use crate::state::{DEFAULT_CLEANUP_INTERVAL, DEFAULT_RECLAIM_THRESHOLD, SharedState};
use crate::sync::{Arc, AtomicUsize, Mutex};
use crate::writer::{WriterGuard, WriterState};
use std::time::Duration;
use std::vec::Vec;

/// Builder for configuring an `RcuDomain`.
///
/// Use this builder to customize grace-period behavior:
/// - `wait_policy`: How the writer waits between registry scans
/// - `grace_timeout`: Turn a wedged grace period into an error
/// - `auto_reclaim_threshold`: Pending-object count that triggers an
///   opportunistic sweep
/// - `cleanup_interval`: How often to prune dead reader slots
///
/// # Example
/// ```
/// use std::time::Duration;
/// use rcu_domain::{RcuDomain, WaitPolicy};
///
/// let domain = RcuDomain::builder()
///     .wait_policy(WaitPolicy::Spin)
///     .grace_timeout(Duration::from_secs(1))
///     .build();
/// # drop(domain);
/// ```
///
/// 用于配置 `RcuDomain` 的构建器。
pub struct RcuDomainBuilder {
    wait_policy: WaitPolicy,
    grace_timeout: Option<Duration>,
    auto_reclaim_threshold: Option<usize>,
    cleanup_interval: usize,
}

impl RcuDomainBuilder {
    /// Create a new builder with default settings.
    /// 创建一个带有默认设置的新构建器。
    #[inline]
    pub fn new() -> Self {
        Self {
            wait_policy: WaitPolicy::default(),
            grace_timeout: None,
            auto_reclaim_threshold: Some(DEFAULT_RECLAIM_THRESHOLD),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }

    /// Set how the grace-period engine waits between registry scans.
    ///
    /// Default: `WaitPolicy::Yield`
    ///
    /// 设置宽限期引擎在两次注册表扫描之间的等待方式。
    /// 默认值：`WaitPolicy::Yield`
    #[inline]
    pub fn wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    /// Bound the time `synchronize` may spend waiting for quiescence.
    ///
    /// With a timeout set, a reader stuck inside a critical section turns
    /// `synchronize` into `Err(GraceTimeout)` instead of blocking the writer
    /// forever; nothing is ever reclaimed early. Pass `None` to wait without
    /// bound.
    ///
    /// Default: `None`
    ///
    /// 限定 `synchronize` 等待静默可花费的时间。
    /// 设置超时后，卡在临界区内的读者会使 `synchronize` 返回
    /// `Err(GraceTimeout)`，而不是让写者永远阻塞；绝不会提前回收任何东西。
    /// 传 `None` 表示无限等待。
    /// 默认值：`None`
    #[inline]
    pub fn grace_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.grace_timeout = timeout.into();
        self
    }

    /// Set the pending-object count that triggers an opportunistic sweep.
    ///
    /// When the reclaim queue grows past this threshold, `assign` and
    /// `defer_free` call `try_reclaim()` (a non-blocking scan). Pass `None`
    /// to disable automatic sweeps.
    ///
    /// Default: `Some(64)`
    ///
    /// 设置触发机会性回收的待回收对象数量阈值。
    /// 当回收队列超过该阈值时，`assign` 和 `defer_free` 会调用
    /// `try_reclaim()`（非阻塞扫描）。传 `None` 可禁用自动回收。
    /// 默认值：`Some(64)`
    #[inline]
    pub fn auto_reclaim_threshold(mut self, threshold: impl Into<Option<usize>>) -> Self {
        self.auto_reclaim_threshold = threshold.into();
        self
    }

    /// Set the pruning interval for dead reader slots.
    ///
    /// Slots of dropped readers are pruned every N grace periods to keep the
    /// registry proportional to live readers, not history. Set to `0` to
    /// disable pruning (not recommended).
    ///
    /// Default: `16`
    ///
    /// 设置死读者槽的清理间隔。
    /// 已 drop 读者的槽每 N 个宽限期清理一次，使注册表规模与存活读者
    /// 成正比，而非与历史成正比。设为 `0` 可禁用清理（不推荐）。
    /// 默认值：`16`
    #[inline]
    pub fn cleanup_interval(mut self, interval: usize) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Build the `RcuDomain` with the configured settings.
    /// 使用配置的设置构建 `RcuDomain`。
    #[inline]
    pub fn build(self) -> RcuDomain {
        let shared = Arc::new(SharedState {
            generation: AtomicUsize::new(0),
            readers: Mutex::new(Vec::new()),
            writer: Mutex::new(WriterState::new(
                self.wait_policy,
                self.grace_timeout,
                self.auto_reclaim_threshold,
                self.cleanup_interval,
            )),
        });

        RcuDomain { shared }
    }
}

impl Default for RcuDomainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An independent RCU synchronization domain.
///
/// `RcuDomain` owns one generation clock, one reader registry and one writer
/// serializer. It is the explicitly constructed context object: no global
/// state, so multiple domains can coexist (and be tested) independently.
///
/// `RcuDomain` is `Clone` and can be safely shared across threads.
/// Typically, you create one domain at startup and clone it to the threads
/// that need it.
///
/// **Typical Usage**:
/// ```
/// use rcu_domain::RcuDomain;
///
/// // Main thread: create the domain
/// let domain = RcuDomain::new();
///
/// // Reader threads: register, then enter critical sections
/// let reader = domain.register_reader();
/// let guard = reader.read_lock();
/// # drop(guard);
///
/// // Writer threads: serialize through the writer lock
/// let mut writer = domain.write_lock();
/// writer.synchronize().unwrap();
/// ```
///
/// 一个独立的 RCU 同步域。
/// `RcuDomain` 拥有一个世代时钟、一个读者注册表和一个写者串行器。
/// 它是显式构造的上下文对象：没有全局状态，因此多个域可以独立共存
/// （并被独立测试）。
/// `RcuDomain` 是 `Clone` 的，可以安全地在线程间共享。
/// 通常在启动时创建一个域，再克隆给需要它的线程。
#[derive(Clone, Debug)]
pub struct RcuDomain {
    shared: Arc<SharedState>,
}

impl RcuDomain {
    /// Create a new domain with default settings.
    /// 创建一个使用默认设置的新域。
    #[inline]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for configuring the domain.
    ///
    /// # Example
    /// ```
    /// use rcu_domain::{RcuDomain, WaitPolicy};
    ///
    /// let domain = RcuDomain::builder()
    ///     .wait_policy(WaitPolicy::Yield)
    ///     .auto_reclaim_threshold(128)
    ///     .build();
    /// # drop(domain);
    /// ```
    ///
    /// 创建一个用于配置域的构建器。
    #[inline]
    pub fn builder() -> RcuDomainBuilder {
        RcuDomainBuilder::new()
    }

    /// Register a new reader for the current thread.
    ///
    /// Returns a `LocalReader` that should be stored per-thread. The caller
    /// is responsible for ensuring that each `LocalReader` is used by only
    /// one thread. Registration takes the registry lock once; read-side
    /// critical sections never do.
    ///
    /// 为当前线程注册一个新的读者。
    /// 返回一个应按线程存储的 `LocalReader`。调用者有责任确保每个
    /// `LocalReader` 仅由一个线程使用。注册获取注册表锁一次；
    /// 读侧临界区绝不获取。
    #[inline]
    pub fn register_reader(&self) -> LocalReader {
        LocalReader::new(Arc::clone(&self.shared))
    }

    /// Acquire the writer serializer.
    ///
    /// Blocks until no other writer holds it; at most one `WriterGuard`
    /// exists per domain at a time, which is what serializes the publish →
    /// synchronize → reclaim sequence. The lock is released when the guard
    /// drops, on every exit path. Readers are never blocked by this gate.
    ///
    /// 获取写者串行器。
    /// 阻塞直到没有其他写者持有它；每个域同一时刻至多存在一个
    /// `WriterGuard`，这正是发布 → synchronize → 回收序列被串行化的原因。
    /// 锁在守卫 drop 时释放，覆盖每条退出路径。读者绝不会被这道门阻塞。
    #[inline]
    pub fn write_lock(&self) -> WriterGuard<'_> {
        WriterGuard {
            shared: &self.shared,
            state: self.shared.writer.lock(),
        }
    }
}

impl Default for RcuDomain {
    fn default() -> Self {
        Self::new()
    }
}
