use crate::state::{Generation, INACTIVE_GENERATION, ReaderSlot, SharedState};
use crate::sync::{Arc, Ordering, fence, spin_hint, yield_now};
use std::error;
use std::fmt;
use std::time::Duration;
#[cfg(not(feature = "loom"))]
use std::time::Instant;
use std::vec::Vec;

/// How the grace-period engine waits between scans of the reader registry.
///
/// This is a policy choice, not a correctness requirement: any variant upholds
/// the termination invariant. The variant is fixed at domain construction,
/// before any concurrent execution starts.
///
/// - `Spin`: tightest latency, burns a core; suited to grace periods expected
///   to end within microseconds.
/// - `Yield`: cede the timeslice between scans; the default.
/// - `Sleep`: park the writer for a fixed interval between scans; suited to
///   long read-side sections where synchronize latency does not matter.
///
/// 宽限期引擎在两次读者注册表扫描之间的等待方式。
///
/// 这是策略选择而非正确性要求：任一变体都维持终止不变量。
/// 变体在域构造时固定，先于任何并发执行。
///
/// - `Spin`：延迟最低，占满一个核；适合微秒级结束的宽限期。
/// - `Yield`：在扫描间让出时间片；默认值。
/// - `Sleep`：在扫描间将写者挂起固定间隔；适合读侧临界区很长、
///   synchronize 延迟无关紧要的场景。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Busy-poll with a spin hint.
    /// 带自旋提示的忙等。
    Spin,
    /// Yield the thread between scans.
    /// 在扫描间让出线程。
    Yield,
    /// Sleep for the given interval between scans.
    /// 在扫描间休眠给定的间隔。
    Sleep(Duration),
}

impl Default for WaitPolicy {
    fn default() -> Self {
        WaitPolicy::Yield
    }
}

/// An error returned from [`synchronize`] when a grace period did not
/// complete within the domain's configured timeout.
///
/// The superseded objects stay queued: nothing is released early, and a later
/// `synchronize` or `try_reclaim` will release them once the stalled readers
/// finally exit. The error reports which generation was being waited out and
/// how many readers were still inside critical sections entered at or before
/// it.
///
/// [`synchronize`]: crate::WriterGuard::synchronize
///
/// 当宽限期未在域配置的超时内完成时由 [`synchronize`] 返回的错误。
/// 已取代对象仍然排队：不会提前释放任何东西，一旦停滞的读者最终退出，
/// 后续的 `synchronize` 或 `try_reclaim` 会释放它们。错误报告正在等待的
/// 世代，以及仍处于在该世代或之前进入的临界区内的读者数量。
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct GraceTimeout {
    target: Generation,
    stalled: usize,
}

impl GraceTimeout {
    /// The generation the grace period was waiting out.
    /// 宽限期正在等待的世代。
    pub fn target(&self) -> Generation {
        self.target
    }

    /// How many readers were still active at or below the target.
    /// 仍在目标世代或之下活跃的读者数量。
    pub fn stalled_readers(&self) -> usize {
        self.stalled
    }
}

impl fmt::Display for GraceTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "grace period for generation {} timed out with {} reader(s) still active",
            self.target, self.stalled
        )
    }
}

impl error::Error for GraceTimeout {}

/// Block until every reader that entered at or before `target` has exited.
///
/// Algorithm:
/// 1. Fence, then snapshot the currently-active slots with
///    `entered_generation <= target`. Readers entering after the snapshot
///    carry a later generation and are irrelevant to this grace period.
/// 2. Poll the snapshot under the wait policy, dropping each slot as it
///    turns inactive or re-enters at a later generation.
/// 3. Return once the snapshot drains. An empty snapshot returns
///    immediately.
///
/// On return, no reader that entered at or before `target` is still inside
/// its critical section; releasing objects superseded at or before `target`
/// is therefore safe. With a deadline set, a stalled reader turns the wait
/// into `Err(GraceTimeout)` instead of wedging the writer forever.
///
/// 阻塞直到每个在 `target` 或之前进入的读者都已退出。
///
/// 算法：
/// 1. 栅栏，然后对 `entered_generation <= target` 的当前活跃槽做快照。
///    快照之后进入的读者携带更晚的世代，与本宽限期无关。
/// 2. 按等待策略轮询快照，槽变为不活跃或以更晚世代重新进入时将其移除。
/// 3. 快照排空后返回。空快照立即返回。
///
/// 返回时，没有在 `target` 或之前进入的读者仍处于其临界区内；
/// 因此释放在 `target` 或之前被取代的对象是安全的。设置了截止时间后，
/// 停滞的读者会使等待变为 `Err(GraceTimeout)`，而不是让写者永远卡死。
pub(crate) fn wait_for_quiescence(
    shared: &SharedState,
    target: Generation,
    policy: WaitPolicy,
    timeout: Option<Duration>,
) -> Result<(), GraceTimeout> {
    // Pair with the fence in LocalReader::read_lock: a reader whose slot
    // store is not visible to the snapshot below cannot have dereferenced
    // the pointer that was current before `target` was advanced past.
    fence(Ordering::SeqCst);

    let mut snapshot: Vec<Arc<ReaderSlot>> = {
        let readers = shared.readers.lock();
        readers
            .iter()
            .filter(|slot| {
                let generation = slot.active_generation.load(Ordering::Acquire);
                generation != INACTIVE_GENERATION && generation <= target
            })
            .cloned()
            .collect()
    };

    if snapshot.is_empty() {
        return Ok(());
    }

    let deadline = timeout.map(deadline_from);

    loop {
        snapshot.retain(|slot| {
            let generation = slot.active_generation.load(Ordering::Acquire);
            generation != INACTIVE_GENERATION && generation <= target
        });

        if snapshot.is_empty() {
            return Ok(());
        }

        if let Some(deadline) = &deadline {
            if deadline_passed(deadline) {
                return Err(GraceTimeout {
                    target,
                    stalled: snapshot.len(),
                });
            }
        }

        relax(policy);
    }
}

#[inline]
fn relax(policy: WaitPolicy) {
    match policy {
        WaitPolicy::Spin => spin_hint(),
        WaitPolicy::Yield => yield_now(),
        WaitPolicy::Sleep(interval) => sleep(interval),
    }
}

#[cfg(not(feature = "loom"))]
#[inline]
fn sleep(interval: Duration) {
    std::thread::sleep(interval);
}

// loom models logical time only; sleeping for real would not let the model
// scheduler explore other threads.
// loom 只建模逻辑时间；真实休眠不会让模型调度器探索其他线程。
#[cfg(feature = "loom")]
#[inline]
fn sleep(_interval: Duration) {
    yield_now();
}

#[cfg(not(feature = "loom"))]
type Deadline = Instant;

#[cfg(not(feature = "loom"))]
#[inline]
fn deadline_from(timeout: Duration) -> Deadline {
    Instant::now() + timeout
}

#[cfg(not(feature = "loom"))]
#[inline]
fn deadline_passed(deadline: &Deadline) -> bool {
    Instant::now() >= *deadline
}

// Under loom a timeout degenerates to a bounded number of scan rounds so
// that executions stay finite.
// 在 loom 下，超时退化为有限的扫描轮数，以保证执行是有限的。
#[cfg(feature = "loom")]
type Deadline = std::cell::Cell<usize>;

#[cfg(feature = "loom")]
const LOOM_SCAN_BUDGET: usize = 2;

#[cfg(feature = "loom")]
#[inline]
fn deadline_from(_timeout: Duration) -> Deadline {
    std::cell::Cell::new(LOOM_SCAN_BUDGET)
}

#[cfg(feature = "loom")]
#[inline]
fn deadline_passed(deadline: &Deadline) -> bool {
    let remaining = deadline.get();
    if remaining == 0 {
        true
    } else {
        deadline.set(remaining - 1);
        false
    }
}
