use crate::state::Generation;
use std::boxed::Box;
use std::collections::VecDeque;
use std::vec::Vec;

/// An object that has been superseded (unlinked from the publication slot)
/// but not yet released. It stores the raw pointer and a destructor function
/// to safely drop the concrete type.
///
/// 一个已被取代（从发布槽中摘除）但尚未释放的对象。
/// 它存储原始指针和析构函数，以安全地 drop 具体类型。
struct Deferred {
    /// The raw pointer to the data.
    /// 数据的原始指针。
    ptr: *mut (),
    /// Function pointer to the type-specific destructor.
    /// 类型特定析构函数的函数指针。
    dtor: unsafe fn(*mut ()),
}

// The queued pointee was handed over as Box<T> with T: Send, so releasing it
// from the writer thread that drains the queue is sound.
// 入队的指针目标以 Box<T>（T: Send）的形式移交，
// 由排空队列的写者线程释放它是合理的。
unsafe impl Send for Deferred {}

/// Generic destructor for deferred objects.
/// Converts the raw pointer back to Box<T> and drops it.
///
/// 延迟对象的通用析构函数。
/// 将原始指针转换回 Box<T> 并将其 drop。
#[inline(always)]
unsafe fn drop_value<T>(ptr: *mut ()) {
    let ptr = ptr as *mut T;
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

impl Deferred {
    /// Create a new deferred-release record from a Box<T>.
    /// 从 Box<T> 创建一个新的延迟释放记录。
    #[inline(always)]
    fn new<T: Send + 'static>(value: Box<T>) -> Self {
        let ptr = Box::into_raw(value) as *mut ();
        Deferred {
            ptr,
            dtor: drop_value::<T>,
        }
    }
}

impl Drop for Deferred {
    /// Executes the type-erased destructor.
    /// 执行类型擦除的析构函数。
    #[inline(always)]
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                (self.dtor)(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Queue of superseded objects awaiting the end of their grace period.
///
/// Objects are stored in bags tagged with the generation they were superseded
/// at. A bag may only be dropped once that generation has been proven
/// quiesced; the proof lives in the grace-period engine, which hands the
/// quiesced horizon to [`reclaim_through`].
///
/// [`reclaim_through`]: ReclaimQueue::reclaim_through
///
/// 等待宽限期结束的已取代对象队列。
/// 对象按其被取代时的世代分袋存储。只有该世代被证明静默后，
/// 袋子才能被 drop；证明由宽限期引擎给出，它把静默水位传给
/// [`reclaim_through`]。
pub(crate) struct ReclaimQueue {
    /// Bags ordered by superseded generation.
    queue: VecDeque<(Generation, Vec<Deferred>)>,
    /// Pool of empty vectors to reduce allocation.
    pool: Vec<Vec<Deferred>>,
    /// Total number of queued objects.
    count: usize,
}

impl std::fmt::Debug for ReclaimQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReclaimQueue")
            .field("bags", &self.queue.len())
            .field("count", &self.count)
            .finish()
    }
}

impl ReclaimQueue {
    /// Create a new empty queue.
    /// 创建一个新的空队列。
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            pool: Vec::new(),
            count: 0,
        }
    }

    /// Get the total number of queued objects.
    /// 获取排队对象的总数。
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    /// Queue a superseded object under the generation it was last visible at.
    ///
    /// If the newest bag carries the same tag the object is appended to it,
    /// otherwise a new bag is opened (possibly reused from the pool). Tags
    /// only grow, so the queue stays ordered.
    ///
    /// 将已取代对象按其最后可见的世代入队。
    /// 若最新的袋子带有相同标签则追加，否则开一个新袋子（可能从池中复用）。
    /// 标签只增不减，因此队列保持有序。
    #[inline]
    pub(crate) fn defer<T: Send + 'static>(
        &mut self,
        value: Box<T>,
        superseded_at: Generation,
    ) {
        let node = Deferred::new(value);

        let append_to_last = match self.queue.back() {
            Some((last_gen, _)) => *last_gen == superseded_at,
            None => false,
        };

        if append_to_last {
            // Safe to unwrap because we checked back() above
            self.queue.back_mut().unwrap().1.push(node);
        } else {
            let mut bag = self.pool.pop().unwrap_or_else(|| Vec::with_capacity(16));
            bag.push(node);
            self.queue.push_back((superseded_at, bag));
        }

        self.count += 1;
    }

    /// Release every object superseded at or before `horizon`.
    ///
    /// The caller must have proven that no reader which entered at or before
    /// `horizon` is still active. Returns the number of objects released.
    ///
    /// 释放所有在 `horizon` 或之前被取代的对象。
    /// 调用者必须已证明没有在 `horizon` 或之前进入的读者仍然活跃。
    /// 返回释放的对象数量。
    pub(crate) fn reclaim_through(&mut self, horizon: Generation) -> usize {
        let mut released = 0;

        while let Some((tag, _)) = self.queue.front() {
            if *tag > horizon {
                break;
            }
            if let Some((_, mut bag)) = self.queue.pop_front() {
                released += bag.len();
                bag.clear(); // Drops all deferred objects inside
                self.pool.push(bag);
            }
        }

        self.count -= released;
        released
    }
}
