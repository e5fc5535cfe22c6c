//! End-to-end scenarios against a hand-rolled mock session.
//!
//! No mocking crate appears anywhere in this crate's dependency graph, so
//! the mock here is a plain struct driven by a shared, lockable script of
//! canned outcomes — the same shape a hand-rolled test double takes in any
//! of this crate's sibling async database drivers.
use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use myskel_pool::{Diagnostics, Error, Pool, PoolConfig, Session, SessionManager};

fn io_err(message: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, message.to_string())
}

/// Canned outcomes and call counters shared between a [`MockSessionManager`]
/// and every [`MockSession`] it hands out.
#[derive(Default)]
struct Script {
    resolve_fail: VecDeque<bool>,
    connect_fail: VecDeque<bool>,
    ping_fail: VecDeque<bool>,
    connect_delay: Option<Duration>,
    resolve_attempts: u32,
    connect_attempts: u32,
    ping_attempts: u32,
    close_calls: u32,
}

#[derive(Clone)]
struct MockSessionManager {
    script: Arc<Mutex<Script>>,
    next_id: Arc<AtomicU64>,
}

impl MockSessionManager {
    fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    fn script(&self) -> Arc<Mutex<Script>> {
        self.script.clone()
    }
}

impl SessionManager for MockSessionManager {
    type Session = MockSession;

    fn hostname(&self) -> &str {
        "db.example.test"
    }

    fn port(&self) -> &str {
        "3306"
    }

    fn hparams(&self) -> &() {
        &()
    }

    fn new_session(&self) -> MockSession {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        MockSession {
            id,
            script: self.script.clone(),
        }
    }
}

struct MockSession {
    id: u64,
    script: Arc<Mutex<Script>>,
}

impl MockSession {
    fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl Session for MockSession {
    type Hparams = ();

    async fn resolve(&mut self, _host: &str, _port: &str) -> myskel_pool::Result<Vec<SocketAddr>> {
        let mut script = self.script.lock().unwrap();
        script.resolve_attempts += 1;
        if script.resolve_fail.pop_front().unwrap_or(false) {
            Err(Error::resolve(io_err("resolve failed")))
        } else {
            Ok(vec!["127.0.0.1:3306".parse().unwrap()])
        }
    }

    async fn connect(
        &mut self,
        _endpoint: SocketAddr,
        _hparams: &(),
        _diag: &mut Diagnostics,
    ) -> myskel_pool::Result<()> {
        let delay = {
            let mut script = self.script.lock().unwrap();
            script.connect_attempts += 1;
            script.connect_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.script.lock().unwrap().connect_fail.pop_front().unwrap_or(false) {
            Err(Error::connect(io_err("connect failed")))
        } else {
            Ok(())
        }
    }

    async fn ping(&mut self) -> myskel_pool::Result<()> {
        let mut script = self.script.lock().unwrap();
        script.ping_attempts += 1;
        if script.ping_fail.pop_front().unwrap_or(false) {
            Err(Error::ping(io_err("ping failed")))
        } else {
            Ok(())
        }
    }

    async fn close(&mut self) {
        self.script.lock().unwrap().close_calls += 1;
    }

    async fn reset(&mut self) -> myskel_pool::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn happy_path_fresh_pool_reuses_the_entry_without_reconnecting() {
    let manager = MockSessionManager::new();
    let script = manager.script();
    let pool = Pool::new(manager, PoolConfig::new().capacity(1));

    let mut diag = Diagnostics::new();
    let conn = pool.get_connection(&mut diag).await.expect("connects on the first try");
    assert!(diag.is_empty());
    drop(conn);

    {
        let script = script.lock().unwrap();
        assert_eq!(script.resolve_attempts, 1);
        assert_eq!(script.connect_attempts, 1);
    }

    // The released entry must come back as `Iddle`, not stuck `InUse`: a
    // second borrow should ping the live session rather than reconnect.
    let mut diag = Diagnostics::new();
    let conn = pool.get_connection(&mut diag).await.expect("reuses the released entry");
    drop(conn);

    let script = script.lock().unwrap();
    assert_eq!(script.ping_attempts, 1);
    assert_eq!(script.connect_attempts, 1, "the second borrow must not reconnect");
}

#[tokio::test(start_paused = true)]
async fn retries_a_failed_connect_before_succeeding() {
    let manager = MockSessionManager::new();
    let script = manager.script();
    script.lock().unwrap().connect_fail.push_back(true);

    let pool = Pool::new(
        manager,
        PoolConfig::new().capacity(1).between_tries(Duration::from_millis(10)),
    );

    let mut diag = Diagnostics::new();
    let conn = pool.get_connection(&mut diag).await.expect("the second attempt connects");
    drop(conn);

    let script = script.lock().unwrap();
    assert_eq!(script.connect_attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn exhausts_its_retry_budget_and_reports_the_attempt_count() {
    let manager = MockSessionManager::new();
    let script = manager.script();
    for _ in 0..5 {
        script.lock().unwrap().connect_fail.push_back(true);
    }

    let pool = Pool::new(
        manager,
        PoolConfig::new()
            .capacity(1)
            .max_num_tries(5)
            .between_tries(Duration::from_millis(1)),
    );

    let mut diag = Diagnostics::new();
    let err = pool.get_connection(&mut diag).await.unwrap_err();
    assert!(err.is_retries_exhausted());
    assert_eq!(err.to_string(), "pool exhausted its retry budget after 5 attempt(s)");

    let script = script.lock().unwrap();
    assert_eq!(script.connect_attempts, 5);
}

#[tokio::test(start_paused = true)]
async fn heals_a_stale_iddle_entry_with_a_freshly_constructed_session() {
    let manager = MockSessionManager::new();
    let script = manager.script();
    let pool = Pool::new(
        manager,
        PoolConfig::new().capacity(1).between_tries(Duration::from_millis(1)),
    );

    // One full successful cycle puts the single entry into `Iddle`.
    let mut diag = Diagnostics::new();
    let mut first = pool.get_connection(&mut diag).await.unwrap();
    let first_id = first.session().id();
    drop(first);

    script.lock().unwrap().ping_fail.push_back(true);

    let mut diag = Diagnostics::new();
    let mut second = pool
        .get_connection(&mut diag)
        .await
        .expect("heals through a close-and-reconnect");
    let second_id = second.session().id();
    drop(second);

    assert_ne!(first_id, second_id, "a fresh Session replaces the stale one");

    let script = script.lock().unwrap();
    assert_eq!(script.ping_attempts, 1);
    assert_eq!(script.close_calls, 1);
    assert_eq!(script.connect_attempts, 2, "the original connect plus the post-ping reconnect");
    assert_eq!(script.resolve_attempts, 2);
}

#[tokio::test]
async fn a_released_entry_wakes_a_caller_blocked_on_it() {
    let manager = MockSessionManager::new();
    let pool = Pool::new(manager, PoolConfig::new().capacity(1).wait_timeout(Duration::from_secs(5)));

    let mut diag = Diagnostics::new();
    let first = pool.get_connection(&mut diag).await.unwrap();

    let waiting_pool = pool.clone();
    let waiter = tokio::spawn(async move {
        let mut diag = Diagnostics::new();
        waiting_pool.get_connection(&mut diag).await
    });

    tokio::task::yield_now().await;
    assert!(!waiter.is_finished(), "the only entry is still checked out");

    drop(first);

    let second = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("the waiter completes well within one wait_timeout window")
        .unwrap()
        .expect("the released entry is immediately reusable");
    drop(second);
}

#[tokio::test(start_paused = true)]
async fn cancelling_mid_setup_clears_locked_so_the_next_caller_can_proceed() {
    let manager = MockSessionManager::new();
    let script = manager.script();
    script.lock().unwrap().connect_delay = Some(Duration::from_secs(30));

    let pool = Pool::new(manager, PoolConfig::new().capacity(1));

    let task_pool = pool.clone();
    let handle = tokio::spawn(async move {
        let mut diag = Diagnostics::new();
        task_pool.get_connection(&mut diag).await
    });

    // Let the task suspend inside the artificial connect delay, then cancel
    // it — the same observable effect as a caller dropping its future mid-setup.
    tokio::task::yield_now().await;
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    script.lock().unwrap().connect_delay = None;

    let mut diag = Diagnostics::new();
    let conn = tokio::time::timeout(Duration::from_secs(1), pool.get_connection(&mut diag))
        .await
        .expect("locked was cleared by the cancelled future's Drop")
        .expect("a fresh attempt connects");
    drop(conn);
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_never_exceed_capacity_and_all_make_progress() {
    const CAPACITY: usize = 2;
    const CALLERS: usize = 6;

    let manager = MockSessionManager::new();
    let pool = Pool::new(manager, PoolConfig::new().capacity(CAPACITY));
    let outstanding = Arc::new(AtomicU64::new(0));
    let peak = Arc::new(AtomicU64::new(0));

    let mut tasks = Vec::new();
    for _ in 0..CALLERS {
        let pool = pool.clone();
        let outstanding = outstanding.clone();
        let peak = peak.clone();
        tasks.push(tokio::spawn(async move {
            let mut diag = Diagnostics::new();
            let conn = pool.get_connection(&mut diag).await.expect("the mock never fails");
            let now = outstanding.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            outstanding.fetch_sub(1, Ordering::SeqCst);
            drop(conn);
        }));
    }

    for task in tasks {
        task.await.expect("every caller eventually completes");
    }

    assert!(
        peak.load(Ordering::SeqCst) as usize <= CAPACITY,
        "no more entries were concurrently held than the pool's capacity"
    );
}

#[tokio::test(start_paused = true)]
async fn no_leaks_across_many_sequential_borrows() {
    let manager = MockSessionManager::new();
    let pool = Pool::new(
        manager,
        PoolConfig::new().capacity(1).wait_timeout(Duration::from_millis(50)),
    );

    for _ in 0..50 {
        let mut diag = Diagnostics::new();
        let conn = tokio::time::timeout(Duration::from_millis(500), pool.get_connection(&mut diag))
            .await
            .expect("the single entry is always returned before the next request needs it")
            .unwrap();
        drop(conn);
    }
}
