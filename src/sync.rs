#[cfg(feature = "loom")]
pub use loom::cell::Cell;
#[cfg(not(feature = "loom"))]
pub use std::cell::Cell;

#[cfg(feature = "loom")]
pub use loom::sync::atomic::{AtomicPtr, AtomicUsize, Ordering, fence};
#[cfg(not(feature = "loom"))]
pub use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering, fence};

#[cfg(feature = "loom")]
pub use loom::sync::Arc;
#[cfg(not(feature = "loom"))]
pub use std::sync::Arc;

#[cfg(not(feature = "loom"))]
pub use antidote::{Mutex, MutexGuard};

#[cfg(feature = "loom")]
pub use loom::sync::MutexGuard;

#[cfg(feature = "loom")]
#[derive(Debug, Default)]
pub struct Mutex<T>(loom::sync::Mutex<T>);

#[cfg(feature = "loom")]
impl<T> Mutex<T> {
    pub fn new(t: T) -> Self {
        Self(loom::sync::Mutex::new(t))
    }

    pub fn lock(&self) -> loom::sync::MutexGuard<'_, T> {
        self.0.lock().unwrap()
    }
}

/// Polling hint used by the grace-period engine between scans.
///
/// Under loom every variant must yield so the model scheduler can run the
/// other threads; a raw spin would never terminate inside a single execution.
///
/// 宽限期引擎在两次扫描之间使用的轮询提示。
/// 在 loom 下每个变体都必须让出，使模型调度器能运行其他线程；
/// 原地自旋在单次执行中永远不会结束。
#[cfg(feature = "loom")]
pub fn spin_hint() {
    loom::thread::yield_now();
}

#[cfg(not(feature = "loom"))]
pub fn spin_hint() {
    std::hint::spin_loop();
}

#[cfg(feature = "loom")]
pub fn yield_now() {
    loom::thread::yield_now();
}

#[cfg(not(feature = "loom"))]
pub fn yield_now() {
    std::thread::yield_now();
}
