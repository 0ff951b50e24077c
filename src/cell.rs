use crate::reader::ReadGuard;
use crate::state::Generation;
use crate::sync::{AtomicPtr, Ordering};
use crate::writer::WriterGuard;
use std::boxed::Box;
use std::marker::PhantomData;

/// The guarded pointer: a single publication slot for RCU-protected data.
///
/// `RcuCell<T>` is an atomic pointer that can be read by any number of
/// readers (via `dereference()` with a `ReadGuard`) and replaced by the
/// serialized writer (via `assign()` with a `WriterGuard`). At any instant
/// exactly one object is current; superseded objects stay alive until the
/// grace period covering their last visible generation completes.
///
/// **Safety Contract**:
/// - Readers must hold a `ReadGuard` when calling `dereference()`; the
///   returned borrow cannot outlive the guard. There is no unordered read
///   path: the load is always acquire and always guard-gated, so the
///   plain-load misuse is a compile error, not a latent race.
/// - Writers must hold the `WriterGuard` of the domain whose readers access
///   this cell. Pairing a cell with guards from an unrelated domain voids
///   the grace-period proof.
///
/// **Typical Usage**:
/// ```
/// use rcu_domain::{RcuCell, RcuDomain};
///
/// let domain = RcuDomain::new();
/// let cell = RcuCell::new(42i32);
///
/// // Reader thread:
/// let reader = domain.register_reader();
/// let guard = reader.read_lock();
/// let value = cell.dereference(&guard);
/// assert_eq!(*value, 42);
/// drop(guard);
///
/// // Writer thread:
/// let mut writer = domain.write_lock();
/// cell.assign(100i32, &mut writer);
/// writer.synchronize().unwrap();
/// ```
///
/// 被保护指针：RCU 保护数据的唯一发布槽。
/// `RcuCell<T>` 是一个原子指针，可被任意数量的读者读取
/// （通过 `dereference()` 和 `ReadGuard`），并由串行化的写者替换
/// （通过 `assign()` 和 `WriterGuard`）。任一时刻恰好一个对象是当前的；
/// 被取代的对象存活到覆盖其最后可见世代的宽限期结束。
/// **安全合约**：
/// - 读者调用 `dereference()` 时必须持有 `ReadGuard`；返回的借用不能
///   比守卫活得更久。不存在无序读取路径：加载始终是 acquire 且始终由
///   守卫把关，因此裸加载误用是编译错误，而非潜伏的竞争。
/// - 写者必须持有其读者访问此单元的那个域的 `WriterGuard`。
///   将单元与无关域的守卫配对会使宽限期证明失效。
pub struct RcuCell<T> {
    ptr: AtomicPtr<T>,
    // Ties Send/Sync to T: concurrent readers alias &T, and reclamation
    // drops T on the writer's thread.
    // 将 Send/Sync 绑定到 T：并发读者别名 &T，回收在写者线程上 drop T。
    marker: PhantomData<T>,
}

impl<T: Send + 'static> RcuCell<T> {
    /// Create a new publication slot, initialized with the given value.
    /// 创建一个新的发布槽，初始化为给定的值。
    #[inline]
    pub fn new(data: T) -> Self {
        Self {
            ptr: AtomicPtr::new(Box::into_raw(Box::new(data))),
            marker: PhantomData,
        }
    }

    /// Reader dereference: acquire-load the current value.
    ///
    /// The `guard` parameter is what makes the read-side contract checkable
    /// at compile time: the calling thread is provably inside a registered
    /// critical section, and the returned borrow cannot be used after the
    /// guard drops. The acquire load pairs with the release publication in
    /// `assign`, so a reader that observes the new pointer also observes
    /// every write that built the new object.
    ///
    /// 读者解引用：以 acquire 加载当前值。
    /// `guard` 参数使读侧合约可在编译期检查：调用线程可证明处于已注册的
    /// 临界区内，且返回的借用在守卫 drop 后无法使用。acquire 加载与
    /// `assign` 中的 release 发布配对，因此观察到新指针的读者也观察到
    /// 构造新对象的每次写入。
    #[inline]
    pub fn dereference<'guard>(&self, _guard: &'guard ReadGuard) -> &'guard T {
        let ptr = self.ptr.load(Ordering::Acquire);
        // SAFETY:
        // 1. `ptr` is never null: the cell is created initialized and every
        //    assign installs a freshly boxed value.
        // 2. While `_guard` is live the writer cannot release the pointee:
        //    reclamation requires a grace period covering this reader's
        //    entry generation.
        // 3. The borrow is bound to `_guard`, so it cannot escape the
        //    critical section.
        // SAFETY:
        // 1. `ptr` 永远不为空：单元创建时即已初始化，每次 assign 都装入
        //    新装箱的值。
        // 2. `_guard` 存活期间写者无法释放指针目标：回收需要覆盖本读者
        //    进入世代的宽限期。
        // 3. 借用被绑定到 `_guard`，因此无法逃出临界区。
        unsafe { &*ptr }
    }

    /// Writer publication: replace the value and retire the old one.
    ///
    /// Stores the new object with release ordering (so its construction is
    /// visible to every reader that subsequently acquires the pointer), hands
    /// the superseded object to the reclaim queue, and advances the
    /// generation clock. Returns the generation the new object is published
    /// under. The old object is released no earlier than the next completed
    /// grace period covering its generation.
    ///
    /// This call never blocks; only `synchronize` does.
    ///
    /// 写者发布：替换值并退休旧值。
    /// 以 release 顺序存储新对象（使其构造对随后 acquire 该指针的每个读者
    /// 可见），将被取代对象交给回收队列，并推进世代时钟。返回新对象发布
    /// 时所处的世代。旧对象最早在覆盖其世代的下一个完成的宽限期被释放。
    /// 此调用从不阻塞；只有 `synchronize` 会阻塞。
    #[inline]
    pub fn assign(&self, data: T, writer: &mut WriterGuard<'_>) -> Generation {
        let new_ptr = Box::into_raw(Box::new(data));
        let old_ptr = self.ptr.swap(new_ptr, Ordering::Release);

        // SAFETY:
        // `old_ptr` came from `Box::into_raw` in `new` or a previous
        // `assign`, and the swap above just unlinked it; the writer guard
        // defers its release past the covering grace period.
        // SAFETY:
        // `old_ptr` 来自 `new` 或上一次 `assign` 中的 `Box::into_raw`，
        // 上面的 swap 刚将其摘除；写者守卫将其释放推迟到覆盖它的宽限期
        // 之后。
        unsafe { writer.retire_and_advance(Box::from_raw(old_ptr)) }
    }
}

impl<T> std::fmt::Debug for RcuCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ptr = self.ptr.load(Ordering::Relaxed);
        f.debug_tuple("RcuCell").field(&ptr).finish()
    }
}

impl<T> Drop for RcuCell<T> {
    /// When an `RcuCell` is dropped, it drops the current value.
    ///
    /// At drop time no other thread can be accessing the cell, so the final
    /// object can be taken back directly without a grace period.
    ///
    /// 当 `RcuCell` 被 drop 时，它 drop 当前值。
    /// drop 时没有其他线程可能访问该单元，因此最后的对象可以直接取回，
    /// 无需宽限期。
    #[inline]
    fn drop(&mut self) {
        let ptr = self.ptr.load(Ordering::Relaxed);
        if !ptr.is_null() {
            unsafe {
                drop(Box::from_raw(ptr));
            }
        }
    }
}
