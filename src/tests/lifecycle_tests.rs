/// 生命周期测试模块
/// 测试对象从发布、取代到回收的完整生命周期，以及句柄的销毁路径
use crate::{RcuCell, RcuDomain};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 释放时设置标志的值
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn flagged() -> (DropFlag, Arc<AtomicBool>) {
    let flag = Arc::new(AtomicBool::new(false));
    (DropFlag(Arc::clone(&flag)), flag)
}

/// 测试1: 被取代的对象要等到宽限期结束才释放
#[test]
fn test_superseded_released_after_grace_period() {
    let domain = RcuDomain::builder().auto_reclaim_threshold(None).build();
    let (old, old_flag) = flagged();
    let cell = RcuCell::new(old);

    let mut writer = domain.write_lock();
    let (new, _new_flag) = flagged();
    cell.assign(new, &mut writer);

    // 已取代但尚未回收
    assert!(!old_flag.load(Ordering::SeqCst));
    assert_eq!(writer.pending(), 1);

    writer.synchronize().unwrap();
    assert!(old_flag.load(Ordering::SeqCst));
}

/// 测试2: 读者持有守卫期间，被取代的对象保持存活
#[test]
fn test_superseded_survives_active_reader() {
    let domain = RcuDomain::builder().auto_reclaim_threshold(None).build();
    let reader = domain.register_reader();

    let (old, old_flag) = flagged();
    let cell = RcuCell::new(old);

    let guard = reader.read_lock();
    let held = cell.dereference(&guard);

    let mut writer = domain.write_lock();
    let (new, _) = flagged();
    cell.assign(new, &mut writer);

    // 守卫还在，机会性清扫必须空手而归
    assert_eq!(writer.try_reclaim(), 0);
    assert!(!old_flag.load(Ordering::SeqCst));
    // 持有的引用仍然指向存活的对象
    assert!(!held.0.load(Ordering::SeqCst));

    drop(guard);

    assert_eq!(writer.try_reclaim(), 1);
    assert!(old_flag.load(Ordering::SeqCst));
}

/// 测试3: defer_free 的对象走同一条回收路径
#[test]
fn test_defer_free_lifecycle() {
    let domain = RcuDomain::builder().auto_reclaim_threshold(None).build();

    let (value, flag) = flagged();

    let mut writer = domain.write_lock();
    writer.defer_free(Box::new(value));
    assert!(!flag.load(Ordering::SeqCst));

    writer.synchronize().unwrap();
    assert!(flag.load(Ordering::SeqCst));
}

/// 测试4: RcuCell drop 释放最终的当前值
#[test]
fn test_cell_drop_releases_current() {
    let (value, flag) = flagged();
    let cell = RcuCell::new(value);

    assert!(!flag.load(Ordering::SeqCst));
    drop(cell);
    assert!(flag.load(Ordering::SeqCst));
}

/// 测试5: 域销毁时释放仍在排队的对象
#[test]
fn test_domain_drop_releases_pending() {
    let (value, flag) = flagged();

    let domain = RcuDomain::builder().auto_reclaim_threshold(None).build();
    {
        let mut writer = domain.write_lock();
        writer.defer_free(Box::new(value));
    }

    assert!(!flag.load(Ordering::SeqCst));
    drop(domain);
    assert!(flag.load(Ordering::SeqCst));
}

/// 测试6: 已 drop 的读者在清理周期后不再拖累宽限期
#[test]
fn test_dropped_readers_are_pruned() {
    let domain = RcuDomain::builder().cleanup_interval(4).build();

    for _ in 0..50 {
        let reader = domain.register_reader();
        let guard = reader.read_lock();
        drop(guard);
        // reader 在此被 drop，槽只剩注册表持有
    }

    let mut writer = domain.write_lock();
    // 跨过若干清理周期；死槽被修剪，宽限期照常完成
    for _ in 0..8 {
        writer.synchronize().unwrap();
    }

    // 清理之后新注册的读者工作如常
    drop(writer);
    let reader = domain.register_reader();
    let guard = reader.read_lock();
    drop(guard);
}

/// 测试7: 写者守卫 drop 即释放串行器
#[test]
fn test_writer_lock_released_on_drop() {
    let domain = RcuDomain::new();

    {
        let mut writer = domain.write_lock();
        writer.synchronize().unwrap();
    }

    // 前一个守卫已释放，这里不会死锁
    let mut writer = domain.write_lock();
    writer.synchronize().unwrap();
}

/// 测试8: 写者临界区 panic 也会释放串行器
#[test]
fn test_writer_lock_released_on_panic() {
    let domain = RcuDomain::new();
    let (value, flag) = flagged();

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut writer = domain.write_lock();
        writer.defer_free(Box::new(value));
        panic!("writer body failed");
    }));
    assert!(result.is_err());

    // 锁在展开路径上被释放；排队的对象也没有丢失
    let mut writer = domain.write_lock();
    writer.synchronize().unwrap();
    assert!(flag.load(Ordering::SeqCst));
}

/// 测试9: 嵌套守卫共享同一个进入世代
#[test]
fn test_nested_guards_share_generation() {
    let domain = RcuDomain::new();
    let reader = domain.register_reader();
    let cell = RcuCell::new(0i32);

    let outer = reader.read_lock();
    let outer_generation = outer.generation();

    {
        let mut writer = domain.write_lock();
        cell.assign(1, &mut writer);
    }

    // 发布推进了时钟，但嵌套进入沿用外层的世代
    let inner = reader.read_lock();
    assert_eq!(inner.generation(), outer_generation);
}
