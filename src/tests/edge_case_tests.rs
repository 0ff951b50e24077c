/// 边界情况测试模块
/// 测试宽限期的退化路径、超时和回收阈值
use crate::{RcuCell, RcuDomain, WaitPolicy};
use std::time::Duration;

/// 测试1: 没有读者时 synchronize 立即返回
#[test]
fn test_synchronize_without_readers() {
    let domain = RcuDomain::new();

    let mut writer = domain.write_lock();
    // 退化情形：空快照不是错误，立即完成
    writer.synchronize().unwrap();
    writer.synchronize().unwrap();
}

/// 测试2: 已注册但不在临界区内的读者不阻塞宽限期
#[test]
fn test_synchronize_with_idle_readers() {
    let domain = RcuDomain::new();

    let _reader1 = domain.register_reader();
    let _reader2 = domain.register_reader();

    let mut writer = domain.write_lock();
    writer.synchronize().unwrap();
}

/// 测试3: 卡住的读者触发宽限超时
#[test]
fn test_grace_timeout() {
    let domain = RcuDomain::builder()
        .grace_timeout(Duration::from_millis(10))
        .build();

    let reader = domain.register_reader();
    let guard = reader.read_lock();

    let mut writer = domain.write_lock();
    writer.defer_free(Box::new(1i32));

    let err = writer.synchronize().unwrap_err();
    assert_eq!(err.stalled_readers(), 1);
    assert!(
        err.to_string()
            .contains("timed out with 1 reader(s) still active")
    );

    drop(guard);
}

/// 测试4: 超时不提前回收，读者退出后重试成功
#[test]
fn test_timeout_preserves_pending_then_retry() {
    let domain = RcuDomain::builder()
        .grace_timeout(Duration::from_millis(10))
        .auto_reclaim_threshold(None)
        .build();

    let reader = domain.register_reader();
    let guard = reader.read_lock();

    let mut writer = domain.write_lock();
    writer.defer_free(Box::new(1i32));
    writer.defer_free(Box::new(2i32));

    assert!(writer.synchronize().is_err());
    // 队列原封不动，没有任何东西被提前释放
    assert_eq!(writer.pending(), 2);

    drop(guard);

    writer.synchronize().unwrap();
    assert_eq!(writer.pending(), 0);
}

/// 测试5: 嵌套 read_lock —— 内层守卫 drop 后临界区仍然持续
#[test]
fn test_reentrant_read_lock() {
    let domain = RcuDomain::builder()
        .grace_timeout(Duration::from_millis(10))
        .build();

    let reader = domain.register_reader();

    let outer = reader.read_lock();
    {
        let _inner = reader.read_lock();
    }
    // 内层已 drop，外层仍应将临界区保持为活跃
    {
        let mut writer = domain.write_lock();
        assert!(writer.synchronize().is_err());
    }

    drop(outer);

    let mut writer = domain.write_lock();
    writer.synchronize().unwrap();
}

/// 测试6: 克隆守卫延续临界区
#[test]
fn test_guard_clone_extends_critical_section() {
    let domain = RcuDomain::builder()
        .grace_timeout(Duration::from_millis(10))
        .build();

    let reader = domain.register_reader();

    let guard = reader.read_lock();
    let clone = guard.clone();
    drop(guard);

    // 克隆还活着，临界区没有结束
    {
        let mut writer = domain.write_lock();
        assert!(writer.synchronize().is_err());
    }

    drop(clone);

    let mut writer = domain.write_lock();
    writer.synchronize().unwrap();
}

/// 测试7: 一次 read_lock 对应一次 unlock，注册表无泄漏
#[test]
fn test_lock_unlock_leaves_no_residue() {
    let domain = RcuDomain::new();
    let reader = domain.register_reader();

    for _ in 0..100 {
        let guard = reader.read_lock();
        drop(guard);
    }

    // 任何残留的活跃条目都会让这次 synchronize 卡住
    let mut writer = domain.write_lock();
    writer.synchronize().unwrap();
}

/// 测试8: 自动回收阈值触发机会性清扫
#[test]
fn test_auto_reclaim_threshold() {
    let domain = RcuDomain::builder().auto_reclaim_threshold(2).build();

    let mut writer = domain.write_lock();
    for i in 0..10i32 {
        writer.defer_free(Box::new(i));
    }

    // 没有读者，每次越过阈值都会清扫，队列不会涨到 10
    assert!(writer.pending() <= 3);
}

/// 测试9: 关闭自动回收后队列只增不减，手动清扫有效
#[test]
fn test_disabled_auto_reclaim() {
    let domain = RcuDomain::builder().auto_reclaim_threshold(None).build();

    let mut writer = domain.write_lock();
    for i in 0..10i32 {
        writer.defer_free(Box::new(i));
    }
    assert_eq!(writer.pending(), 10);

    let released = writer.try_reclaim();
    assert_eq!(released, 10);
    assert_eq!(writer.pending(), 0);
}

/// 测试10: 世代 0 的活跃读者阻止一切回收
#[test]
fn test_try_reclaim_blocked_by_generation_zero_reader() {
    let domain = RcuDomain::builder().auto_reclaim_threshold(None).build();
    let reader = domain.register_reader();

    let _guard = reader.read_lock();

    let mut writer = domain.write_lock();
    writer.defer_free(Box::new(1i32));

    assert_eq!(writer.try_reclaim(), 0);
    assert_eq!(writer.pending(), 1);
}

/// 测试11: try_reclaim 只释放最老活跃世代之前的对象
#[test]
fn test_try_reclaim_respects_oldest_active_reader() {
    let domain = RcuDomain::builder().auto_reclaim_threshold(None).build();
    let reader = domain.register_reader();
    let cell = RcuCell::new(0i32);

    let mut writer = domain.write_lock();
    cell.assign(1, &mut writer); // 旧值以世代 0 入队，时钟 -> 1
    cell.assign(2, &mut writer); // 旧值以世代 1 入队，时钟 -> 2

    let guard = reader.read_lock(); // 进入世代 2

    cell.assign(3, &mut writer); // 旧值以世代 2 入队，时钟 -> 3

    // 世代 0、1 的对象已静默，世代 2 的对象被守卫挡住
    assert_eq!(writer.try_reclaim(), 2);
    assert_eq!(writer.pending(), 1);

    drop(guard);
    assert_eq!(writer.try_reclaim(), 1);
    assert_eq!(writer.pending(), 0);
}

/// 测试12: 禁用死槽清理不影响宽限期
#[test]
fn test_zero_cleanup_interval() {
    let domain = RcuDomain::builder().cleanup_interval(0).build();

    for _ in 0..20 {
        domain.register_reader();
    }

    let mut writer = domain.write_lock();
    for _ in 0..20 {
        writer.synchronize().unwrap();
    }
}

/// 测试13: 三种等待策略都满足终止不变量
#[test]
fn test_wait_policies() {
    for policy in [
        WaitPolicy::Spin,
        WaitPolicy::Yield,
        WaitPolicy::Sleep(Duration::from_micros(50)),
    ] {
        let domain = RcuDomain::builder().wait_policy(policy).build();
        let cell = RcuCell::new(0i32);

        let mut writer = domain.write_lock();
        cell.assign(1, &mut writer);
        writer.synchronize().unwrap();
        assert_eq!(writer.pending(), 0);
    }
}

/// 测试14: 超时错误可比较、可复制、携带目标世代
#[test]
fn test_grace_timeout_error_shape() {
    let domain = RcuDomain::builder()
        .grace_timeout(Duration::from_millis(5))
        .build();

    let reader = domain.register_reader();
    let guard = reader.read_lock();

    let mut writer = domain.write_lock();
    let err = writer.synchronize().unwrap_err();
    let copy = err;

    assert_eq!(err, copy);
    assert_eq!(err.target(), copy.target());

    drop(guard);
}
