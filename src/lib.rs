//! A read-copy-update (RCU) synchronization core.
//!
//! Many readers traverse a shared pointer with no locks and no blocking; a
//! serialized writer replaces the pointed-to object and releases the old one
//! only after a *grace period* proves that no reader can still observe it.
//!
//! The moving parts, leaves first:
//! - [`LocalReader`] / [`ReadGuard`] — the reader registry: who is inside a
//!   read-side critical section, and at which generation it entered.
//! - [`Generation`] — the monotonic clock of published versions.
//! - [`RcuCell`] — the publication slot: release-stored, acquire-loaded.
//! - [`WriterGuard`] — the writer serializer: at most one writer publishes
//!   and drives grace periods at a time.
//! - [`WriterGuard::synchronize`] — the grace-period engine: blocks until
//!   every reader that entered at or before the target generation has
//!   exited, then releases everything that generation superseded.
//!
//! Reads are wait-free and cannot be blocked by the writer; the writer
//! blocks only inside `synchronize`. Dereferencing outside a critical
//! section or publishing without the writer lock are compile errors: the
//! guard parameters are the contract.
//!
//! # Example
//!
//! ```
//! use rcu_domain::{RcuCell, RcuDomain};
//!
//! let domain = RcuDomain::new();
//! let cell = RcuCell::new(vec![0u8; 3]);
//!
//! // Read side: register once per thread, then lock/dereference/unlock.
//! let reader = domain.register_reader();
//! {
//!     let guard = reader.read_lock();
//!     assert_eq!(cell.dereference(&guard)[1], 0);
//! }
//!
//! // Write side: copy, update, publish, wait out old readers, reclaim.
//! let mut writer = domain.write_lock();
//! cell.assign(vec![0, b'd', 0], &mut writer);
//! writer.synchronize().unwrap();
//!
//! let guard = reader.read_lock();
//! assert_eq!(cell.dereference(&guard)[1], b'd');
//! ```
//!
//! 一个读-复制-更新（RCU）同步核心。
//!
//! 多个读者在无锁、不阻塞的情况下遍历共享指针；串行化的写者替换被指向的
//! 对象，并且只有在*宽限期*证明没有读者还能观察到旧对象后才释放它。
//! 读取是 wait-free 的且不会被写者阻塞；写者只在 `synchronize` 内阻塞。
//! 在临界区之外解引用、或不持有写者锁就发布，都是编译错误：
//! 守卫参数就是合约。

mod cell;
mod domain;
mod grace;
mod reader;
mod reclaim;
mod state;
mod sync;
mod writer;

pub use cell::RcuCell;
pub use domain::{RcuDomain, RcuDomainBuilder};
pub use grace::{GraceTimeout, WaitPolicy};
pub use reader::{LocalReader, ReadGuard};
pub use state::Generation;
pub use writer::WriterGuard;

#[cfg(test)]
mod tests;
