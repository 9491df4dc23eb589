#![allow(clippy::unwrap_used)]
// End-to-end tests for the live alert subsystem over a scripted connector.
//
// Every test runs on a paused tokio clock, so reconnect delays elapse
// instantly and deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use url::Url;

use geowatch_api::{Channel, Connector, Error, Frame};
use geowatch_core::{AlertsConfig, HubState, LiveAlerts, Notice, Phase};

// ── Scripted connector ──────────────────────────────────────────────

type FrameTx = mpsc::UnboundedSender<Result<Frame, Error>>;

enum Attempt {
    Refuse,
    Accept(mpsc::UnboundedReceiver<Result<Frame, Error>>),
}

/// Plays back a fixed list of connection outcomes. Once the list runs
/// out, further attempts hang forever.
#[derive(Default)]
struct ScriptedConnector {
    plan: Mutex<VecDeque<Attempt>>,
    attempts: Mutex<Vec<Instant>>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    fn refuse(&self) {
        self.plan.lock().unwrap().push_back(Attempt::Refuse);
    }

    fn accept(&self) -> FrameTx {
        let (tx, rx) = mpsc::unbounded_channel();
        self.plan.lock().unwrap().push_back(Attempt::Accept(rx));
        tx
    }

    fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    fn connect<'a>(&'a self, _url: &'a Url) -> BoxFuture<'a, Result<Channel, Error>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(Instant::now());
            let next = self.plan.lock().unwrap().pop_front();
            match next {
                Some(Attempt::Accept(rx)) => {
                    let closes = Arc::clone(&self.closes);
                    Ok(
                        Channel::new(UnboundedReceiverStream::new(rx)).with_closer(move || {
                            Box::pin(async move {
                                closes.fetch_add(1, Ordering::SeqCst);
                            })
                        }),
                    )
                }
                Some(Attempt::Refuse) => Err(Error::WebSocketConnect("connection refused".into())),
                None => std::future::pending().await,
            }
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn config() -> AlertsConfig {
    AlertsConfig::new(Url::parse("ws://alerts.test/ws/alerts").unwrap())
}

fn setup() -> (Arc<ScriptedConnector>, LiveAlerts) {
    let connector = Arc::new(ScriptedConnector::default());
    let live = LiveAlerts::with_connector(config(), Arc::clone(&connector) as Arc<dyn Connector>);
    (connector, live)
}

/// Forward every hub notification into a channel the test can await.
fn watch(live: &LiveAlerts) -> (geowatch_core::Subscription, mpsc::UnboundedReceiver<HubState>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sub = live.subscribe(move |state| {
        let _ = tx.send(state.clone());
    });
    (sub, rx)
}

fn event_json(id: &str, kind: &str) -> Result<Frame, Error> {
    Ok(Frame::Text(format!(
        r#"{{"event_id":"{id}","event_type":"{kind}","timestamp":"2026-10-19T08:15:00Z",
            "vehicle":{{"vehicle_number":"KA-01-1234"}},
            "geofence":{{"geofence_name":"Warehouse"}}}}"#
    )))
}

async fn next_state(rx: &mut mpsc::UnboundedReceiver<HubState>) -> HubState {
    tokio::time::timeout(Duration::from_secs(60), rx.recv())
        .await
        .expect("hub notification")
        .expect("hub alive")
}

async fn wait_connected(rx: &mut mpsc::UnboundedReceiver<HubState>, connected: bool) {
    loop {
        if next_state(rx).await.is_connected == connected {
            return;
        }
    }
}

/// Assert no notification arrives for a long (virtual) while.
async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<HubState>) {
    let outcome = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
    assert!(outcome.is_err(), "unexpected notification: {outcome:?}");
}

// ── Reconnect ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_reconnect_converges_after_fixed_delays() {
    let (connector, live) = setup();
    for _ in 0..3 {
        connector.refuse();
    }
    let _tx = connector.accept();

    let notices = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&notices);
    let live = live.with_notifier(Arc::new(move |n: &Notice| seen.lock().unwrap().push(n.clone())));
    let (_sub, mut rx) = watch(&live);
    assert!(!next_state(&mut rx).await.is_connected);

    let started = Instant::now();
    live.start();
    wait_connected(&mut rx, true).await;

    let offsets: Vec<Duration> = connector
        .attempts()
        .iter()
        .map(|t| t.duration_since(started))
        .collect();
    assert_eq!(
        offsets,
        vec![
            Duration::ZERO,
            Duration::from_millis(3000),
            Duration::from_millis(6000),
            Duration::from_millis(9000),
        ]
    );
    assert_eq!(live.phase(), Phase::Open);
    assert_eq!(notices.lock().unwrap().len(), 1);

    // Open and idle: no further attempts.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.attempts().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_server_close_schedules_one_retry() {
    let (connector, live) = setup();
    let first = connector.accept();
    let _second = connector.accept();
    let (_sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;
    let opened_at = Instant::now();

    first.send(Ok(Frame::Close(None))).unwrap();
    wait_connected(&mut rx, false).await;
    assert_eq!(live.phase(), Phase::Closed);
    assert!(live.connection().state().pending_retry().is_some());

    wait_connected(&mut rx, true).await;
    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1].duration_since(opened_at), Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn test_stream_end_and_errors_reconnect() {
    let (connector, live) = setup();
    let first = connector.accept();
    let second = connector.accept();
    let (_sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;

    // A read error alone changes nothing; the end of stream does.
    first
        .send(Err(Error::WebSocketStream("reset by peer".into())))
        .unwrap();
    first.send(event_json("e1", "entry")).unwrap();
    assert_eq!(next_state(&mut rx).await.sequence, 1);
    drop(first);

    wait_connected(&mut rx, false).await;
    wait_connected(&mut rx, true).await;
    assert_eq!(connector.attempts().len(), 2);

    // last_event survives the reconnect
    assert_eq!(
        live.state().last_event.unwrap().event_id,
        "e1".to_owned()
    );
    drop(second);
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent_while_running() {
    let (connector, live) = setup();
    connector.refuse();
    let _tx = connector.accept();
    let (_sub, mut rx) = watch(&live);

    live.start();
    live.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(live.phase(), Phase::Closed);
    live.start();

    wait_connected(&mut rx, true).await;
    assert_eq!(connector.attempts().len(), 2);
}

// ── Fan-out ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_fan_out_order_across_subscribers() {
    let (connector, live) = setup();
    let tx = connector.accept();

    let log = Arc::new(Mutex::new(Vec::new()));
    let subs: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|label| {
            let log = Arc::clone(&log);
            live.subscribe(move |state: &HubState| {
                if let Some(event) = &state.last_event {
                    log.lock().unwrap().push(format!("{label}:{}", event.event_id));
                }
            })
        })
        .collect();
    let (_sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;
    tx.send(event_json("e1", "entry")).unwrap();
    tx.send(event_json("e2", "exit")).unwrap();
    next_state(&mut rx).await;
    next_state(&mut rx).await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["a:e1", "b:e1", "c:e1", "a:e2", "b:e2", "c:e2"]
    );
    drop(subs);
}

#[tokio::test(start_paused = true)]
async fn test_late_subscriber_sees_last_event() {
    let (connector, live) = setup();
    let tx = connector.accept();
    let (_sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;
    tx.send(event_json("e1", "entry")).unwrap();
    next_state(&mut rx).await;

    let (_late, mut late_rx) = watch(&live);
    let first = next_state(&mut late_rx).await;
    assert_eq!(first.last_event.unwrap().event_id, "e1");
    assert!(first.is_connected);
    assert_eq!(first.sequence, 1);
}

// ── Malformed input ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_malformed_frames_are_invisible() {
    let (connector, live) = setup();
    let tx = connector.accept();
    let (_sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;

    tx.send(event_json("e1", "entry")).unwrap();
    tx.send(Ok(Frame::Text("not json".into()))).unwrap();
    tx.send(Ok(Frame::Text(r#"{"event_id":"x","event_type":"entry"}"#.into())))
        .unwrap();
    tx.send(Ok(Frame::Text(r#"{"event_id":"x","#.into()))).unwrap();
    tx.send(Ok(Frame::Binary(vec![1, 2, 3]))).unwrap();
    tx.send(event_json("e2", "exit")).unwrap();

    let a = next_state(&mut rx).await;
    let b = next_state(&mut rx).await;
    assert_eq!(a.last_event.unwrap().event_id, "e1");
    assert_eq!(b.last_event.unwrap().event_id, "e2");
    assert_eq!(b.sequence, 2);

    assert_quiet(&mut rx).await;
    assert_eq!(live.phase(), Phase::Open);
    assert_eq!(connector.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_event_type_is_delivered() {
    let (connector, live) = setup();
    let tx = connector.accept();
    let (_sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;
    tx.send(event_json("e1", "dwell")).unwrap();

    let state = next_state(&mut rx).await;
    let event = state.last_event.unwrap();
    assert!(!event.event_type.is_recognized());
    assert_eq!(event.event_type.as_str(), "dwell");
}

// ── Teardown ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_stop_while_open_closes_channel_and_silences_hub() {
    let (connector, live) = setup();
    let tx = connector.accept();
    let (_sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;

    live.shutdown().await;
    live.stop();
    assert_eq!(live.phase(), Phase::Idle);
    assert_eq!(connector.closes(), 1);

    let after = next_state(&mut rx).await;
    assert!(!after.is_connected);
    assert!(!live.state().is_connected);

    // The old channel's sender may still be alive; nothing gets through.
    let _ = tx.send(event_json("late", "entry"));
    assert_quiet(&mut rx).await;
    assert_eq!(live.state().sequence, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_pending_retry_cancels_timer() {
    let (connector, live) = setup();
    connector.refuse();
    let _never = connector.accept();
    let (_sub, mut rx) = watch(&live);

    live.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(live.phase(), Phase::Closed);

    live.stop();
    live.stop();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.attempts().len(), 1);
    assert_eq!(live.phase(), Phase::Idle);
    next_state(&mut rx).await; // initial replay only
    assert_quiet(&mut rx).await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_connecting_and_before_start() {
    let (connector, live) = setup();
    live.stop();
    assert_eq!(live.phase(), Phase::Idle);

    // Empty plan: the attempt hangs.
    live.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(live.phase(), Phase::Connecting);

    live.shutdown().await;
    assert_eq!(live.phase(), Phase::Idle);
    assert_eq!(connector.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_from_inside_subscriber() {
    let connector = Arc::new(ScriptedConnector::default());
    let tx = connector.accept();
    let live = Arc::new(LiveAlerts::with_connector(
        config(),
        Arc::clone(&connector) as Arc<dyn Connector>,
    ));

    let handle = Arc::downgrade(&live);
    let _stopper = live.subscribe(move |state| {
        if state.sequence == 1 {
            if let Some(live) = handle.upgrade() {
                live.stop();
            }
        }
    });
    let (_sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;
    tx.send(event_json("e1", "entry")).unwrap();
    tx.send(event_json("e2", "entry")).unwrap();

    // e1 finishes its fan-out, then the channel is reported down; e2
    // never arrives.
    assert_eq!(next_state(&mut rx).await.sequence, 1);
    let after = next_state(&mut rx).await;
    assert!(!after.is_connected);
    assert_eq!(after.sequence, 1);
    assert_quiet(&mut rx).await;
    assert_eq!(live.phase(), Phase::Idle);
    assert!(!live.state().is_connected);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let (connector, live) = setup();
    let _first = connector.accept();
    let second = connector.accept();
    let (_sub, mut rx) = watch(&live);

    let notices = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&notices);
    let live = live.with_notifier(Arc::new(move |_: &Notice| {
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    live.start();
    wait_connected(&mut rx, true).await;
    live.shutdown().await;
    wait_connected(&mut rx, false).await;

    live.start();
    assert!(!live.state().is_connected);
    wait_connected(&mut rx, true).await;
    assert_eq!(live.phase(), Phase::Open);
    assert_eq!(connector.attempts().len(), 2);
    assert_eq!(notices.load(Ordering::SeqCst), 2);

    second.send(event_json("e1", "exit")).unwrap();
    assert_eq!(next_state(&mut rx).await.sequence, 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_tears_down() {
    let (connector, live) = setup();
    let _tx = connector.accept();
    let (sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;
    drop(sub);
    drop(live);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(connector.closes(), 1);
    assert_eq!(connector.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_reports_disconnected() {
    let (connector, live) = setup();
    let _tx = connector.accept();
    let (_sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;
    live.shutdown().await;

    assert_eq!(live.phase(), Phase::Idle);
    assert!(!live.state().is_connected);
    wait_connected(&mut rx, false).await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_open_sends_no_connectivity_change() {
    let (connector, live) = setup();
    connector.refuse();
    let (_sub, mut rx) = watch(&live);

    live.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    live.stop();

    next_state(&mut rx).await; // initial replay
    assert_quiet(&mut rx).await;
}

// ── Cross-thread teardown ───────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_inside_initial_callback_while_event_in_flight() {
    let connector = Arc::new(ScriptedConnector::default());
    let tx = connector.accept();
    let live = Arc::new(LiveAlerts::with_connector(
        config(),
        Arc::clone(&connector) as Arc<dyn Connector>,
    ));
    let (_sub, mut rx) = watch(&live);

    live.start();
    wait_connected(&mut rx, true).await;

    // On another thread, subscribe with a callback that hands the worker
    // an event, lets it block on the hub, and then stops the connection
    // while the subscribe call still holds the hub.
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let handle = Arc::downgrade(&live);
    let subscriber = Arc::clone(&live);
    std::thread::spawn(move || {
        let fired = AtomicUsize::new(0);
        let sub = subscriber.subscribe(move |_| {
            if fired.fetch_add(1, Ordering::SeqCst) > 0 {
                return;
            }
            tx.send(event_json("e1", "entry")).unwrap();
            std::thread::sleep(Duration::from_millis(300));
            if let Some(live) = handle.upgrade() {
                live.stop();
            }
        });
        drop(sub);
        let _ = done_tx.send(());
    });

    tokio::time::timeout(Duration::from_secs(5), done_rx)
        .await
        .expect("subscribe with stop inside returns")
        .unwrap();

    assert_eq!(live.phase(), Phase::Idle);
    let after = next_state(&mut rx).await;
    assert!(!after.is_connected);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let state = live.state();
    assert_eq!(state.sequence, 0);
    assert!(!state.is_connected);
}
