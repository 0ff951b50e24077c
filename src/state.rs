use crate::sync::{Arc, AtomicUsize, Mutex};
use crate::writer::WriterState;
use std::vec::Vec;

/// A published version number of the guarded pointer.
///
/// Strictly increases on every publication and on every grace period; it never
/// wraps within a process lifetime (`usize::MAX` is reserved as the inactive
/// sentinel, so the usable range ends one below it).
///
/// 被保护指针的已发布版本号。
/// 每次发布和每个宽限期都严格递增；在进程生命周期内不会回绕
/// （`usize::MAX` 被保留为不活跃哨兵值，可用范围止于其下一位）。
pub type Generation = usize;

/// Default count of pending objects that triggers an opportunistic sweep.
/// 触发机会性回收的待回收对象数量的默认阈值。
pub(crate) const DEFAULT_RECLAIM_THRESHOLD: usize = 64;

/// Default interval for pruning dead reader slots (in grace periods).
/// 清理死读者槽的默认间隔（以宽限期为单位）。
pub(crate) const DEFAULT_CLEANUP_INTERVAL: usize = 16;

/// Represents a reader that is not currently inside a read-side critical section.
/// 表示当前不在读侧临界区内的读者。
pub(crate) const INACTIVE_GENERATION: Generation = usize::MAX;

/// A slot allocated for a reader thread to record the generation it entered at.
///
/// Cache-aligned to prevent false sharing between readers.
///
/// 为读者线程分配的槽，用于记录其进入时的世代。
/// 缓存对齐以防止读者之间的伪共享。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct ReaderSlot {
    /// The generation the reader entered its critical section at, or
    /// INACTIVE_GENERATION.
    /// 读者进入临界区时的世代，或 INACTIVE_GENERATION。
    pub(crate) active_generation: AtomicUsize,
}

/// Global shared state for one RCU domain.
///
/// Contains the generation clock, the reader registry and the writer
/// serializer. The registry mutex is taken by readers only at registration
/// time, never inside a critical section; the writer mutex is never taken by
/// readers at all.
///
/// 一个 RCU 域的全局共享状态。
/// 包含世代时钟、读者注册表和写者串行器。注册表互斥锁仅在读者注册时
/// 被读者获取，绝不会在临界区内；写者互斥锁则完全不会被读者触碰。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct SharedState {
    /// The monotonic generation clock. Advanced only under the writer lock.
    /// 单调世代时钟。仅在持有写者锁时推进。
    pub(crate) generation: AtomicUsize,
    /// List of all registered reader slots.
    /// 所有已注册读者槽的列表。
    pub(crate) readers: Mutex<Vec<Arc<ReaderSlot>>>,
    /// The writer serializer and the state it protects.
    /// 写者串行器及其保护的状态。
    pub(crate) writer: Mutex<WriterState>,
}
