use crate::state::{Generation, INACTIVE_GENERATION, ReaderSlot, SharedState};
use crate::sync::{Arc, AtomicUsize, Cell, Ordering, fence};

/// A reader thread's registration in an RCU domain.
///
/// Each reader thread should create exactly one `LocalReader` via
/// `RcuDomain::register_reader()`. It is `!Sync` (due to `Cell`) and must be
/// stored per-thread.
///
/// The `LocalReader` is used to:
/// - Enter a read-side critical section via `read_lock()`.
/// - Obtain a `ReadGuard` that protects access to `RcuCell` values.
///
/// A reader that is registered but outside any critical section costs the
/// writer one slot scan per grace period and nothing else; a reader that
/// stays inside a critical section forever prevents grace periods from
/// completing past its entry generation. That is a liveness hazard, not a
/// safety one, and it is reported through the writer's grace timeout.
///
/// **Thread Safety**: `LocalReader` is not `Sync` and must be used by only
/// one thread.
///
/// 读者线程在 RCU 域中的注册。
/// 每个读者线程应该通过 `RcuDomain::register_reader()` 创建恰好一个
/// `LocalReader`。它是 `!Sync` 的（因为 `Cell`），必须在每个线程中存储。
/// `LocalReader` 用于：
/// - 通过 `read_lock()` 进入读侧临界区。
/// - 获取保护对 `RcuCell` 值访问的 `ReadGuard`。
/// 已注册但处于临界区之外的读者，对写者的代价只是每个宽限期扫描一个槽；
/// 永远停留在临界区内的读者会阻止宽限期越过其进入世代完成。
/// 这是活性风险而非安全风险，通过写者的宽限超时上报。
/// **线程安全性**：`LocalReader` 不是 `Sync` 的，必须仅由一个线程使用。
pub struct LocalReader {
    slot: Arc<ReaderSlot>,
    shared: Arc<SharedState>,
    lock_count: Cell<usize>,
}

impl LocalReader {
    pub(crate) fn new(shared: Arc<SharedState>) -> Self {
        let slot = Arc::new(ReaderSlot {
            active_generation: AtomicUsize::new(INACTIVE_GENERATION),
        });

        // Register the reader immediately in the shared registry
        shared.readers.lock().push(Arc::clone(&slot));

        LocalReader {
            slot,
            shared,
            lock_count: Cell::new(0),
        }
    }

    /// Enter a read-side critical section.
    ///
    /// Returns a `ReadGuard` recording the generation the section was entered
    /// at; dropping the guard is the matching `read_unlock`.
    ///
    /// The entry protocol is: load the generation clock, publish it into this
    /// reader's slot, then issue a sequentially consistent fence before any
    /// pointer is dereferenced. The writer issues the matching fence after
    /// advancing the clock and before scanning the slots. The paired fences
    /// guarantee that a writer which does not observe this reader in its scan
    /// can only be observed by this reader *after* its publication, so the
    /// reader cannot be holding the superseded object the writer is about to
    /// release.
    ///
    /// **Reentrancy**: This method is reentrant. Multiple calls can be
    /// nested, and the thread remains inside the critical section until all
    /// returned guards are dropped. You can also clone a guard to create
    /// additional references: `let guard2 = guard1.clone();`
    ///
    /// This call never blocks and never fails; readers are wait-free on this
    /// path.
    ///
    /// 进入读侧临界区。
    ///
    /// 返回记录进入世代的 `ReadGuard`；drop 守卫即对应的 `read_unlock`。
    ///
    /// 进入协议为：加载世代时钟，将其发布到本读者的槽中，然后在任何指针
    /// 被解引用之前执行一次顺序一致栅栏。写者在推进时钟之后、扫描槽之前
    /// 执行配对的栅栏。配对栅栏保证：扫描中未观察到本读者的写者，
    /// 其发布只可能在本读者之后被观察到，因此本读者不可能持有写者
    /// 即将释放的已取代对象。
    ///
    /// **可重入性**：此方法是可重入的。多个调用可以嵌套，线程在所有返回的
    /// 守卫被 drop 之前保持在临界区内。你也可以克隆一个守卫来创建额外的
    /// 引用：`let guard2 = guard1.clone();`
    ///
    /// 此调用从不阻塞也从不失败；读者在这条路径上是 wait-free 的。
    #[inline]
    pub fn read_lock(&self) -> ReadGuard<'_> {
        let lock_count = self.lock_count.get();

        if lock_count == 0 {
            let generation = self.shared.generation.load(Ordering::Acquire);
            self.slot
                .active_generation
                .store(generation, Ordering::Relaxed);

            // Order the slot store before any subsequent RcuCell load; the
            // writer fences between advancing the clock and scanning.
            fence(Ordering::SeqCst);
        }

        self.lock_count.set(lock_count + 1);

        ReadGuard { reader: self }
    }
}

/// A guard marking the current thread as inside a read-side critical section.
///
/// `ReadGuard` is obtained by calling `LocalReader::read_lock()`.
/// It is `!Send` and `!Sync` because it references a `!Sync` `LocalReader`.
/// Its lifetime is bound to the `LocalReader` it came from.
///
/// While a `ReadGuard` is held, the writer will not release any object that
/// was published at or before the guard's entry generation. Dereferencing an
/// `RcuCell` requires a `&ReadGuard`, so a read outside a critical section is
/// a compile error rather than a latent data race.
///
/// 标记当前线程处于读侧临界区内的守卫。
/// `ReadGuard` 通过调用 `LocalReader::read_lock()` 获得。
/// 它是 `!Send` 和 `!Sync` 的，因为它引用了一个 `!Sync` 的 `LocalReader`。
/// 它的生命周期被绑定到它来自的 `LocalReader`。
/// 当 `ReadGuard` 被持有时，写者不会释放任何在守卫进入世代或之前发布的
/// 对象。解引用 `RcuCell` 需要 `&ReadGuard`，因此临界区之外的读取是
/// 编译错误，而不是潜伏的数据竞争。
#[must_use]
pub struct ReadGuard<'a> {
    reader: &'a LocalReader,
}

impl<'a> ReadGuard<'a> {
    /// The generation this critical section was entered at.
    /// 本临界区进入时的世代。
    #[inline]
    pub fn generation(&self) -> Generation {
        // Own thread's slot; only this thread stores while the guard is live.
        self.reader.slot.active_generation.load(Ordering::Relaxed)
    }
}

impl<'a> Clone for ReadGuard<'a> {
    /// Clone this guard to extend the critical section into a nested scope.
    ///
    /// Cloning increments the lock count, and the thread remains inside the
    /// critical section until all cloned guards are dropped.
    ///
    /// 克隆此守卫以将临界区延伸到嵌套作用域。
    /// 克隆会增加锁计数，线程在所有克隆的守卫被 drop 之前保持在临界区内。
    #[inline]
    fn clone(&self) -> Self {
        let lock_count = self.reader.lock_count.get();

        assert!(
            lock_count > 0,
            "BUG: Cloning a ReadGuard outside a critical section (lock_count = 0). \
             This indicates incorrect API usage or a library bug."
        );

        self.reader.lock_count.set(lock_count + 1);

        ReadGuard {
            reader: self.reader,
        }
    }
}

impl<'a> Drop for ReadGuard<'a> {
    #[inline]
    fn drop(&mut self) {
        let lock_count = self.reader.lock_count.get();

        assert!(
            lock_count > 0,
            "BUG: Dropping a ReadGuard outside a critical section (lock_count = 0). \
             This indicates incorrect API usage or a library bug."
        );

        if lock_count == 1 {
            // Outermost unlock: signal quiescence to the writer side.
            self.reader
                .slot
                .active_generation
                .store(INACTIVE_GENERATION, Ordering::Release);
        }

        self.reader.lock_count.set(lock_count - 1);
    }
}
