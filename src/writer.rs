use crate::grace::{self, GraceTimeout, WaitPolicy};
use crate::reclaim::ReclaimQueue;
use crate::state::{Generation, INACTIVE_GENERATION, SharedState};
use crate::sync::{Arc, MutexGuard, Ordering, fence};
use std::boxed::Box;
use std::time::Duration;

/// Writer-side state, protected by the domain's writer mutex.
///
/// Holds the queue of superseded objects and the grace-period configuration
/// fixed at domain construction.
///
/// 写者侧状态，由域的写者互斥锁保护。
/// 持有已取代对象的队列以及在域构造时固定的宽限期配置。
#[derive(Debug)]
pub(crate) struct WriterState {
    pub(crate) pending: ReclaimQueue,
    pub(crate) wait_policy: WaitPolicy,
    pub(crate) grace_timeout: Option<Duration>,
    pub(crate) auto_reclaim_threshold: Option<usize>,
    pub(crate) cleanup_interval: usize,
    /// Grace periods completed so far, drives dead-slot pruning.
    /// 已完成的宽限期计数，驱动死槽清理。
    pub(crate) grace_counter: usize,
}

impl WriterState {
    pub(crate) fn new(
        wait_policy: WaitPolicy,
        grace_timeout: Option<Duration>,
        auto_reclaim_threshold: Option<usize>,
        cleanup_interval: usize,
    ) -> Self {
        Self {
            pending: ReclaimQueue::new(),
            wait_policy,
            grace_timeout,
            auto_reclaim_threshold,
            cleanup_interval,
            grace_counter: 0,
        }
    }
}

/// Exclusive writer access to an RCU domain.
///
/// `WriterGuard` is obtained from `RcuDomain::write_lock()` and holds the
/// domain's writer mutex for its lifetime, so at most one writer runs the
/// publish / synchronize / reclaim sequence at a time. The lock is released
/// on every exit path, including panics, by the guard's drop. Readers never
/// contend on this mutex.
///
/// While holding the guard, a writer:
/// - publishes through [`RcuCell::assign`],
/// - queues already-unlinked objects with [`defer_free`],
/// - drives grace periods with [`synchronize`],
/// - or sweeps opportunistically with [`try_reclaim`].
///
/// [`RcuCell::assign`]: crate::RcuCell::assign
/// [`defer_free`]: WriterGuard::defer_free
/// [`synchronize`]: WriterGuard::synchronize
/// [`try_reclaim`]: WriterGuard::try_reclaim
///
/// 对 RCU 域的独占写者访问。
/// `WriterGuard` 从 `RcuDomain::write_lock()` 获得，在其生命周期内持有域的
/// 写者互斥锁，因此同一时刻至多一个写者执行发布 / synchronize / 回收序列。
/// 锁通过守卫的 drop 在每条退出路径上释放，包括 panic。读者绝不会在这把
/// 互斥锁上竞争。
pub struct WriterGuard<'a> {
    pub(crate) shared: &'a SharedState,
    pub(crate) state: MutexGuard<'a, WriterState>,
}

impl<'a> WriterGuard<'a> {
    /// The current value of the generation clock.
    /// 世代时钟的当前值。
    #[inline]
    pub fn generation(&self) -> Generation {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Number of superseded objects still awaiting reclamation.
    /// 仍在等待回收的已取代对象数量。
    #[inline]
    pub fn pending(&self) -> usize {
        self.state.pending.len()
    }

    /// Queue a superseded object and advance the generation clock.
    ///
    /// The object is recorded under the generation it was last visible at
    /// (the pre-advance value); the returned generation is the one the new
    /// object is published under.
    ///
    /// 将已取代对象入队并推进世代时钟。
    /// 对象按其最后可见的世代（推进前的值）记录；返回的世代是新对象
    /// 发布时所处的世代。
    pub(crate) fn retire_and_advance<T: Send + 'static>(&mut self, old: Box<T>) -> Generation {
        let superseded_at = self.shared.generation.load(Ordering::Relaxed);
        self.state.pending.defer(old, superseded_at);

        let new_generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;

        self.maybe_auto_reclaim();
        new_generation
    }

    /// Hand an already-unlinked object to the reclaimer.
    ///
    /// The object must no longer be reachable through any publication slot;
    /// it is queued under the current generation and released once every
    /// reader that entered at or before it has exited. This call never
    /// blocks.
    ///
    /// 将已摘除的对象移交给回收器。
    /// 对象必须不再能通过任何发布槽到达；它按当前世代入队，在所有于该世代
    /// 或之前进入的读者退出后被释放。此调用从不阻塞。
    pub fn defer_free<T: Send + 'static>(&mut self, value: Box<T>) {
        let superseded_at = self.shared.generation.load(Ordering::Relaxed);
        self.state.pending.defer(value, superseded_at);

        self.maybe_auto_reclaim();
    }

    /// Run a full grace period and reclaim everything it proves quiesced.
    ///
    /// Advances the generation clock, waits until every reader that entered
    /// at or before the pre-advance generation has exited, then releases all
    /// objects superseded at or before it. Readers entering after the advance
    /// never block the wait. Returns the generation that was waited out.
    ///
    /// With a grace timeout configured on the domain, a reader stuck inside a
    /// critical section turns this into `Err(GraceTimeout)`; nothing is
    /// released early and the queue is left intact for a later attempt.
    ///
    /// 运行一个完整的宽限期并回收其证明静默的所有对象。
    ///
    /// 推进世代时钟，等待所有在推进前世代或之前进入的读者退出，
    /// 然后释放所有在该世代或之前被取代的对象。推进之后进入的读者
    /// 绝不会阻塞等待。返回被等待的世代。
    ///
    /// 若域配置了宽限超时，卡在临界区内的读者会使本调用返回
    /// `Err(GraceTimeout)`；不会提前释放任何东西，队列保持原样以待
    /// 之后重试。
    pub fn synchronize(&mut self) -> Result<Generation, GraceTimeout> {
        let target = self.shared.generation.fetch_add(1, Ordering::AcqRel);

        self.state.grace_counter += 1;
        let should_cleanup = self.state.cleanup_interval > 0
            && self.state.grace_counter % self.state.cleanup_interval == 0;
        if should_cleanup {
            self.prune_dead_slots();
        }

        grace::wait_for_quiescence(
            self.shared,
            target,
            self.state.wait_policy,
            self.state.grace_timeout,
        )?;

        self.state.pending.reclaim_through(target);
        Ok(target)
    }

    /// Release whatever is already provably quiescent, without waiting.
    ///
    /// Scans the registry once: with no active reader, everything queued is
    /// released; otherwise only objects superseded strictly before the oldest
    /// active entry generation. Returns the number of objects released.
    ///
    /// 在不等待的情况下释放已可证明静默的对象。
    /// 扫描注册表一次：没有活跃读者时释放所有排队对象；否则仅释放严格早于
    /// 最老活跃进入世代被取代的对象。返回释放的对象数量。
    pub fn try_reclaim(&mut self) -> usize {
        // Pair with the fence in read_lock, as in wait_for_quiescence.
        fence(Ordering::SeqCst);

        let current = self.shared.generation.load(Ordering::Acquire);

        let mut min_active: Option<Generation> = None;
        {
            let readers = self.shared.readers.lock();
            for slot in readers.iter() {
                let generation = slot.active_generation.load(Ordering::Acquire);
                if generation != INACTIVE_GENERATION {
                    min_active = Some(match min_active {
                        Some(min) => min.min(generation),
                        None => generation,
                    });
                }
            }
        }

        match min_active {
            None => self.state.pending.reclaim_through(current),
            Some(0) => 0,
            Some(min) => self.state.pending.reclaim_through(min - 1),
        }
    }

    #[inline]
    fn maybe_auto_reclaim(&mut self) {
        if let Some(threshold) = self.state.auto_reclaim_threshold {
            if self.state.pending.len() > threshold {
                self.try_reclaim();
            }
        }
    }

    /// Drop registry slots whose `LocalReader` has gone away.
    ///
    /// A slot whose only owner is the registry belongs to a dropped reader;
    /// a dropped reader cannot be inside a critical section (the guard
    /// borrows the reader), so pruning it cannot lose an active entry.
    ///
    /// 丢弃其 `LocalReader` 已消失的注册表槽。
    /// 仅被注册表持有的槽属于已 drop 的读者；已 drop 的读者不可能处于
    /// 临界区内（守卫借用读者），因此清理它不会丢失活跃条目。
    fn prune_dead_slots(&self) {
        let mut readers = self.shared.readers.lock();
        readers.retain(|slot| Arc::strong_count(slot) > 1);
    }
}

impl<'a> std::fmt::Debug for WriterGuard<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterGuard")
            .field("generation", &self.generation())
            .field("pending", &self.pending())
            .finish()
    }
}
