//! Staging and dispatch flow tests over recording test doubles

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use kiosk_client::{
    ClientConfig, ClientError, ClientResult, CommandSink, Gateway, GatewayError, OrderApi,
    OrderQuery, PositionApi,
};
use kiosk_controller::{
    Dispatcher, IdentityDoors, Notifier, OrderBoard, PickupCenter, PickupStaging, PositionWatcher,
    StageError, StageState, StagingPointListener,
};
use parking_lot::Mutex;
use shared::WireMessage;
use shared::message::PickupCmd;
use shared::models::{Order, OrderStatus, OrderType};
use shared::position::PositionSample;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

// ========================================================================
// Test doubles
// ========================================================================

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<WireMessage>>,
    fail: AtomicBool,
    /// When set, sends block until a permit is released
    gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn send(&self, msg: WireMessage) -> Result<(), GatewayError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail.load(Ordering::Acquire) {
            return Err(GatewayError::Closed);
        }
        self.sent.lock().push(msg);
        Ok(())
    }
}

impl RecordingSink {
    fn sent(&self) -> Vec<WireMessage> {
        self.sent.lock().clone()
    }

    fn open_commands(&self) -> Vec<(u32, Option<u32>)> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                WireMessage::Pickup {
                    cmd: PickupCmd::Open,
                    table,
                    door,
                } => Some((table, door)),
                _ => None,
            })
            .collect()
    }

    fn close_commands(&self) -> Vec<u32> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                WireMessage::Pickup {
                    cmd: PickupCmd::Close,
                    table,
                    ..
                } => Some(table),
                _ => None,
            })
            .collect()
    }

    fn dispatch_commands(&self) -> Vec<Vec<u32>> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                WireMessage::Dispatch { tables } => Some(tables),
                _ => None,
            })
            .collect()
    }
}

struct StubPositions {
    key: Mutex<String>,
    fail: AtomicBool,
}

impl StubPositions {
    fn reporting(key: &str) -> Arc<Self> {
        Arc::new(Self {
            key: Mutex::new(key.to_string()),
            fail: AtomicBool::new(false),
        })
    }

    fn set_key(&self, key: &str) {
        *self.key.lock() = key.to_string();
    }
}

#[async_trait]
impl PositionApi for StubPositions {
    async fn current_position(&self) -> ClientResult<PositionSample> {
        if self.fail.load(Ordering::Acquire) {
            return Err(ClientError::Internal("position service down".into()));
        }
        Ok(PositionSample::from_raw(&self.key.lock()))
    }

    async fn update_position(&self, _position: &str) -> ClientResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct StubOrders {
    orders: Mutex<Vec<Order>>,
    fetches: AtomicUsize,
    status_updates: Mutex<Vec<(String, OrderStatus)>>,
    fail_update_for: Mutex<Option<String>>,
    /// When set, status updates block until a permit is released
    gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl OrderApi for StubOrders {
    async fn fetch_orders(&self, _query: &OrderQuery) -> ClientResult<Vec<Order>> {
        self.fetches.fetch_add(1, Ordering::AcqRel);
        Ok(self.orders.lock().clone())
    }

    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<()> {
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|_| {
                ClientError::Internal("gate closed".into())
            })?;
            permit.forget();
        }
        if self.fail_update_for.lock().as_deref() == Some(order_id) {
            return Err(ClientError::Internal("update failed".into()));
        }
        self.status_updates.lock().push((order_id.to_string(), status));
        Ok(())
    }

    async fn delete_order(&self, _order_id: &str) -> ClientResult<()> {
        Ok(())
    }

    async fn update_order(&self, _order_id: &str, _order: &Order) -> ClientResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    successes: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.successes.lock().push(message.to_string());
    }

    fn warning(&self, message: &str) {
        self.warnings.lock().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }
}

// ========================================================================
// Helpers
// ========================================================================

fn order(no: i64, table: Option<u32>) -> Order {
    Order {
        id: format!("ord-{no}"),
        order_no: no,
        table_number: table,
        order_status: OrderStatus::Pending,
        order_type: OrderType::DineIn,
        total_price: 100.0,
        cash: Some(100.0),
        change_amount: Some(0.0),
        items: Vec::new(),
        order_time: NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
    }
}

struct Fixture {
    sink: Arc<RecordingSink>,
    positions: Arc<StubPositions>,
    orders: Arc<StubOrders>,
    notifier: Arc<RecordingNotifier>,
    staging: Arc<PickupStaging>,
}

impl Fixture {
    fn with_robot_at(key: &str) -> Self {
        Self::build(StubPositions::reporting(key), StubOrders::default())
    }

    fn build(positions: Arc<StubPositions>, orders: StubOrders) -> Self {
        Self::build_with(Arc::new(RecordingSink::default()), positions, orders)
    }

    fn build_with(
        sink: Arc<RecordingSink>,
        positions: Arc<StubPositions>,
        orders: StubOrders,
    ) -> Self {
        let orders = Arc::new(orders);
        let notifier = Arc::new(RecordingNotifier::default());
        let staging = Arc::new(PickupStaging::new(
            sink.clone(),
            positions.clone(),
            Arc::new(IdentityDoors),
            notifier.clone(),
        ));
        Self {
            sink,
            positions,
            orders,
            notifier,
            staging,
        }
    }

    fn dispatcher(&self) -> Dispatcher {
        let board = Arc::new(OrderBoard::new(self.orders.clone(), self.notifier.clone()));
        Dispatcher::new(
            self.staging.clone(),
            board,
            self.orders.clone(),
            self.sink.clone(),
            self.notifier.clone(),
        )
    }

    fn center(&self) -> (Arc<PositionWatcher>, Arc<PickupCenter>) {
        self.center_with_gateway(dead_gateway(), Duration::from_millis(250))
    }

    fn center_with_gateway(
        &self,
        gateway: Gateway,
        debounce: Duration,
    ) -> (Arc<PositionWatcher>, Arc<PickupCenter>) {
        let board = Arc::new(OrderBoard::new(self.orders.clone(), self.notifier.clone()));
        let watcher = Arc::new(PositionWatcher::new(
            self.positions.clone(),
            Duration::from_millis(100),
        ));
        let dispatcher = Dispatcher::new(
            self.staging.clone(),
            board.clone(),
            self.orders.clone(),
            self.sink.clone(),
            self.notifier.clone(),
        );
        let center = Arc::new(PickupCenter::new(
            board,
            self.staging.clone(),
            watcher.clone(),
            dispatcher,
            gateway,
            debounce,
        ));
        (watcher, center)
    }
}

/// Gateway pointed at a closed port. The worker stays in its backoff loop;
/// the session glue under test never depends on it.
fn dead_gateway() -> Gateway {
    let config = ClientConfig::new("http://127.0.0.1:9").with_gateway_url("ws://127.0.0.1:9");
    Gateway::connect(&config)
}

// ========================================================================
// Staging
// ========================================================================

#[tokio::test]
async fn test_staging_caps_at_three_tables() {
    let fx = Fixture::with_robot_at("kitchen");

    for no in 1..=3 {
        fx.staging.stage(&order(no, Some(no as u32))).await.unwrap();
    }
    let err = fx.staging.stage(&order(4, Some(4))).await.unwrap_err();

    assert_eq!(err, StageError::Full);
    assert_eq!(fx.staging.len(), 3);
    assert_eq!(fx.notifier.warnings.lock().len(), 1);
}

#[tokio::test]
async fn test_staging_rejects_duplicate_table() {
    let fx = Fixture::with_robot_at("kitchen");

    fx.staging.stage(&order(1, Some(2))).await.unwrap();
    let err = fx.staging.stage(&order(2, Some(2))).await.unwrap_err();

    assert_eq!(err, StageError::DuplicateTable(2));
    assert_eq!(fx.staging.len(), 1);
}

#[tokio::test]
async fn test_stage_without_table_has_no_side_effect() {
    let fx = Fixture::with_robot_at("starting");

    let err = fx.staging.stage(&order(1, None)).await.unwrap_err();

    assert_eq!(err, StageError::NoTable);
    assert!(fx.staging.is_empty());
    assert!(fx.sink.sent().is_empty());
    assert_eq!(fx.notifier.warnings.lock().as_slice(), &["No table. Cannot stage."]);
}

#[tokio::test]
async fn test_stage_opens_door_when_robot_already_parked() {
    let fx = Fixture::with_robot_at("Starting");

    fx.staging.stage(&order(1, Some(2))).await.unwrap();

    assert_eq!(
        fx.sink.sent(),
        vec![
            WireMessage::table_ready(2),
            WireMessage::order_ready(2),
            WireMessage::open_door(2, 2),
        ]
    );
    assert_eq!(fx.staging.snapshot()[0].state, StageState::DoorOpened);
    assert_eq!(fx.notifier.successes.lock().as_slice(), &["Staged Order #1 for Table 2"]);
}

#[tokio::test]
async fn test_stage_defers_open_until_arrival() {
    let fx = Fixture::with_robot_at("table5");

    fx.staging.stage(&order(1, Some(1))).await.unwrap();
    assert!(fx.sink.open_commands().is_empty());
    assert_eq!(fx.staging.snapshot()[0].state, StageState::ReadySent);

    // Robot arrives; the watcher-side trigger opens exactly once
    fx.staging.staging_point_reached().await;
    fx.staging.staging_point_reached().await;

    assert_eq!(fx.sink.open_commands(), vec![(1, Some(1))]);
    assert_eq!(fx.staging.snapshot()[0].state, StageState::DoorOpened);
}

#[tokio::test]
async fn test_position_failure_at_stage_time_is_swallowed() {
    let fx = Fixture::with_robot_at("starting");
    fx.positions.fail.store(true, Ordering::Release);

    fx.staging.stage(&order(1, Some(1))).await.unwrap();

    assert_eq!(fx.staging.snapshot()[0].state, StageState::ReadySent);
    assert!(fx.sink.open_commands().is_empty());
}

#[tokio::test]
async fn test_reopen_requires_remove_and_restage() {
    let fx = Fixture::with_robot_at("starting");

    fx.staging.stage(&order(1, Some(1))).await.unwrap();
    fx.staging.staging_point_reached().await;
    assert_eq!(fx.sink.open_commands().len(), 1);

    assert!(fx.staging.remove(1));
    fx.staging.stage(&order(2, Some(1))).await.unwrap();

    assert_eq!(fx.sink.open_commands().len(), 2);
}

// ========================================================================
// Dispatch
// ========================================================================

#[tokio::test]
async fn test_dispatch_on_empty_staging_is_a_noop() {
    let fx = Fixture::with_robot_at("kitchen");

    fx.dispatcher().dispatch_all().await.unwrap();

    assert!(fx.sink.sent().is_empty());
    assert!(fx.orders.status_updates.lock().is_empty());
}

#[tokio::test]
async fn test_dispatch_closes_doors_then_commits_in_order() {
    let fx = Fixture::with_robot_at("kitchen");
    fx.staging.stage(&order(1, Some(1))).await.unwrap();
    fx.staging.stage(&order(2, Some(2))).await.unwrap();

    fx.dispatcher().dispatch_all().await.unwrap();

    assert_eq!(fx.sink.close_commands(), vec![1, 2]);
    assert_eq!(fx.sink.dispatch_commands(), vec![vec![1, 2]]);
    assert_eq!(
        fx.orders.status_updates.lock().as_slice(),
        &[
            ("ord-1".to_string(), OrderStatus::Done),
            ("ord-2".to_string(), OrderStatus::Done),
        ]
    );
    assert!(fx.staging.is_empty());
    assert_eq!(fx.notifier.successes.lock().last().unwrap(), "Dispatched. Orders marked DONE.");
}

#[tokio::test]
async fn test_dispatch_partial_failure_keeps_uncommitted_entries() {
    let fx = Fixture::with_robot_at("kitchen");
    fx.staging.stage(&order(1, Some(1))).await.unwrap();
    fx.staging.stage(&order(2, Some(2))).await.unwrap();
    *fx.orders.fail_update_for.lock() = Some("ord-2".to_string());

    let err = fx.dispatcher().dispatch_all().await.unwrap_err();
    assert!(err.to_string().contains("#2"));

    // First order committed, second retained for retry
    assert_eq!(
        fx.orders.status_updates.lock().as_slice(),
        &[("ord-1".to_string(), OrderStatus::Done)]
    );
    let remaining = fx.staging.snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].table, 2);
    assert_eq!(fx.notifier.errors.lock().len(), 1);
}

#[tokio::test]
async fn test_staging_rejected_while_dispatch_in_flight() {
    let gate = Arc::new(Semaphore::new(0));
    let orders = StubOrders {
        gate: Some(gate.clone()),
        ..StubOrders::default()
    };
    let fx = Arc::new(Fixture::build(StubPositions::reporting("kitchen"), orders));
    fx.staging.stage(&order(1, Some(1))).await.unwrap();

    let dispatcher = fx.dispatcher();
    let dispatch = tokio::spawn(async move { dispatcher.dispatch_all().await });
    // Let the dispatch reach the gated status update
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let err = fx.staging.stage(&order(2, Some(2))).await.unwrap_err();
    assert_eq!(err, StageError::DispatchInFlight);

    gate.add_permits(1);
    dispatch.await.unwrap().unwrap();
    assert!(fx.staging.is_empty());

    // Guard released — staging works again
    fx.staging.stage(&order(3, Some(3))).await.unwrap();
}

// ========================================================================
// Position watcher
// ========================================================================

#[tokio::test(start_paused = true)]
async fn test_watcher_opens_ready_doors_on_arrival() {
    let fx = Fixture::with_robot_at("table3");
    fx.staging.stage(&order(1, Some(1))).await.unwrap();
    assert!(fx.sink.open_commands().is_empty());

    let watcher = PositionWatcher::new(fx.positions.clone(), Duration::from_millis(100));
    watcher.start(fx.staging.clone());

    // Not at the staging point yet — a few ticks pass with no opens
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(fx.sink.open_commands().is_empty());

    fx.positions.set_key("Starting");
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(fx.sink.open_commands(), vec![(1, Some(1))]);

    // Already open — later ticks send nothing more
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fx.sink.open_commands().len(), 1);

    watcher.stop();
    assert!(!watcher.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_watcher_skips_failed_ticks_and_recovers() {
    let fx = Fixture::with_robot_at("starting");
    // Stage while the robot is away so the door stays shut
    fx.positions.set_key("table2");
    fx.staging.stage(&order(1, Some(1))).await.unwrap();

    fx.positions.fail.store(true, Ordering::Release);
    let watcher = PositionWatcher::new(fx.positions.clone(), Duration::from_millis(100));
    watcher.start(fx.staging.clone());

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(fx.sink.open_commands().is_empty());

    fx.positions.fail.store(false, Ordering::Release);
    fx.positions.set_key("starting");
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(fx.sink.open_commands().len(), 1);

    watcher.stop();
}

#[tokio::test(start_paused = true)]
async fn test_watcher_start_is_idempotent_and_stop_cancels() {
    let fx = Fixture::with_robot_at("starting");
    fx.staging.stage(&order(1, Some(1))).await.unwrap();
    // Entry opened at stage time; remove and restage away from the robot
    fx.staging.remove(1);
    fx.positions.set_key("table4");
    fx.staging.stage(&order(2, Some(1))).await.unwrap();

    let watcher = PositionWatcher::new(fx.positions.clone(), Duration::from_millis(100));
    watcher.start(fx.staging.clone());
    watcher.start(fx.staging.clone());
    assert!(watcher.is_running());

    watcher.stop();
    fx.positions.set_key("starting");
    let opens_before = fx.sink.open_commands().len();
    tokio::time::sleep(Duration::from_millis(500)).await;

    // No ticks after stop
    assert_eq!(fx.sink.open_commands().len(), opens_before);
}

#[tokio::test(start_paused = true)]
async fn test_stop_lets_in_flight_door_open_finish() {
    // Two permits cover the ready pair at stage time; the open send blocks
    let gate = Arc::new(Semaphore::new(2));
    let sink = Arc::new(RecordingSink {
        gate: Some(gate.clone()),
        ..RecordingSink::default()
    });
    let fx = Fixture::build_with(sink, StubPositions::reporting("table7"), StubOrders::default());

    fx.staging.stage(&order(1, Some(1))).await.unwrap();
    assert!(fx.sink.open_commands().is_empty());

    fx.positions.set_key("starting");
    let watcher = PositionWatcher::new(fx.positions.clone(), Duration::from_millis(100));
    watcher.start(fx.staging.clone());

    // One tick reaches the gated open send, then the watcher is stopped
    tokio::time::sleep(Duration::from_millis(150)).await;
    watcher.stop();
    assert!(!watcher.is_running());

    gate.add_permits(1);
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The entry was marked opened before the send; the command still goes out
    assert_eq!(fx.sink.open_commands(), vec![(1, Some(1))]);
    assert_eq!(fx.staging.snapshot()[0].state, StageState::DoorOpened);

    // No further ticks run after the in-flight one completes
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fx.sink.open_commands().len(), 1);
}

// ========================================================================
// Pickup center
// ========================================================================

#[tokio::test]
async fn test_watcher_runs_exactly_while_session_open_and_entries_staged() {
    let fx = Fixture::with_robot_at("kitchen");
    let (watcher, center) = fx.center();
    assert!(!watcher.is_running());

    // A rejected stage opens no session
    center.mark_as_done(&order(1, None)).await.unwrap_err();
    assert!(!center.is_session_open());
    assert!(!watcher.is_running());

    center.mark_as_done(&order(1, Some(1))).await.unwrap();
    assert!(center.is_session_open());
    assert!(watcher.is_running());

    // Removing the last entry closes the session and stops the watcher
    assert!(center.remove_staged(1));
    assert!(!center.is_session_open());
    assert!(!watcher.is_running());
}

#[tokio::test]
async fn test_dispatch_empties_staging_and_stops_watcher() {
    let fx = Fixture::with_robot_at("kitchen");
    let (watcher, center) = fx.center();
    center.mark_as_done(&order(1, Some(1))).await.unwrap();
    center.mark_as_done(&order(2, Some(2))).await.unwrap();
    assert!(watcher.is_running());

    center.dispatch_all().await.unwrap();

    assert!(fx.staging.is_empty());
    assert!(!center.is_session_open());
    assert!(!watcher.is_running());
}

#[tokio::test]
async fn test_failed_dispatch_keeps_session_and_watcher_alive() {
    let fx = Fixture::with_robot_at("kitchen");
    let (watcher, center) = fx.center();
    center.mark_as_done(&order(1, Some(1))).await.unwrap();
    center.mark_as_done(&order(2, Some(2))).await.unwrap();
    *fx.orders.fail_update_for.lock() = Some("ord-2".to_string());

    center.dispatch_all().await.unwrap_err();

    // The failed entry is still staged, so the pickup session stays live
    assert_eq!(fx.staging.len(), 1);
    assert!(center.is_session_open());
    assert!(watcher.is_running());
}

#[tokio::test]
async fn test_payment_complete_schedules_a_debounced_refresh() {
    let fx = Fixture::with_robot_at("kitchen");
    let (_watcher, center) = fx.center();

    let payment = WireMessage::parse(r#"{"type":"payment","status":"complete"}"#).unwrap();
    assert_eq!(
        center.on_gateway_message(&payment),
        Some(Duration::from_millis(250))
    );

    let pending = WireMessage::parse(r#"{"type":"payment","status":"pending"}"#).unwrap();
    assert_eq!(center.on_gateway_message(&pending), None);
    assert_eq!(center.on_gateway_message(&WireMessage::order_ready(1)), None);
}

/// Accept one connection, wait for the controller hello, then push `count`
/// payment notifications `gap` apart and hold the connection open.
async fn hub_push_payments(listener: tokio::net::TcpListener, count: usize, gap: Duration) {
    use futures::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

    loop {
        match ws.next().await {
            Some(Ok(Message::Text(_))) => break,
            Some(Ok(_)) => {}
            other => panic!("hub session ended early: {other:?}"),
        }
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    for _ in 0..count {
        ws.send(Message::Text(
            r#"{"type":"payment","status":"complete"}"#.to_string(),
        ))
        .await
        .unwrap();
        tokio::time::sleep(gap).await;
    }
    tokio::time::sleep(Duration::from_secs(10)).await;
}

#[tokio::test]
async fn test_run_loop_collapses_payment_burst_into_one_refresh() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let hub = tokio::spawn(hub_push_payments(listener, 2, Duration::from_millis(50)));

    let fx = Arc::new(Fixture::with_robot_at("kitchen"));
    let gateway = Gateway::connect(
        &ClientConfig::new("http://127.0.0.1:9")
            .with_gateway_url(url)
            .with_branch_id("branch-1"),
    );
    let (_watcher, center) = fx.center_with_gateway(gateway, Duration::from_millis(200));

    let shutdown = CancellationToken::new();
    let run = tokio::spawn({
        let center = center.clone();
        let shutdown = shutdown.clone();
        async move { center.run(shutdown).await }
    });

    // Initial load, then exactly one refresh after the burst settles
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(fx.orders.fetches.load(Ordering::Acquire), 2);

    shutdown.cancel();
    run.await.unwrap();
    hub.abort();
}
