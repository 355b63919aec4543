#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use simvisor::{
    Config, Event, EventKind, LogPattern, MissionState, MissionTime, Monitor, Phase,
    RunParameters, Severity, StopReason, Subscribe, Subscription, TransitionKind,
};
use tempfile::TempDir;
use tokio::sync::Mutex;

const LOG: &str = "logs/sls_simulation.log";

/// Temp project whose "simulator" is `/bin/sh sim.sh`.
fn project(script: &str) -> (TempDir, Config) {
    let tmp = tempfile::tempdir().unwrap();
    let script_path = tmp.path().join("sim.sh");
    std::fs::write(&script_path, format!("mkdir -p logs\n{script}\n")).unwrap();

    let cfg = Config {
        executable: PathBuf::from("/bin/sh"),
        base_args: vec![script_path.display().to_string()],
        project_root: tmp.path().to_path_buf(),
        poll_interval: Duration::from_millis(20),
        grace: Duration::from_secs(2),
        ..Config::default()
    };
    (tmp, cfg)
}

async fn next_event(sub: &mut Subscription) -> Arc<Event> {
    tokio::time::timeout(Duration::from_secs(10), sub.recv())
        .await
        .expect("no event within 10s")
        .expect("bus closed")
}

async fn until_stopped(sub: &mut Subscription) -> Vec<Arc<Event>> {
    let mut out = Vec::new();
    loop {
        let ev = next_event(sub).await;
        let stop = ev.is_supervisor_stopped();
        out.push(ev);
        if stop {
            return out;
        }
    }
}

async fn until_line(sub: &mut Subscription, text: &str) {
    loop {
        if let EventKind::LogLine(l) = &next_event(sub).await.kind {
            if l.as_str() == text {
                return;
            }
        }
    }
}

async fn assert_quiet(sub: &mut Subscription) {
    let extra = tokio::time::timeout(Duration::from_millis(300), sub.recv()).await;
    assert!(extra.is_err(), "unexpected event after stop: {extra:?}");
}

fn lines(events: &[Arc<Event>]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::LogLine(l) => Some(l.as_str().to_string()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_exit_drains_log_then_single_stop_event() {
    let (_tmp, cfg) = project(&format!(
        r#"
i=1
while [ $i -le 3 ]; do
  echo "[00:00:0$i.000] INFO  FCC         : Altitude: ${{i}}00.5 m" >> {LOG}
  i=$((i+1))
done
echo "[00:00:04.000] INFO  FCC         : Mission phase changed to: 3 at T+4.0" >> {LOG}
printf 'final line\n' >> {LOG}
printf 'unterminated' >> {LOG}
exit 0
"#
    ));
    let state = Arc::new(MissionState::new());
    let monitor = Monitor::builder(cfg)
        .with_subscribers(vec![state.clone() as Arc<dyn Subscribe>])
        .build()
        .unwrap();
    let mut sub = monitor.subscribe();

    let run = monitor.start_run(RunParameters::default()).await.unwrap();
    let events = until_stopped(&mut sub).await;
    assert_quiet(&mut sub).await;

    assert!(events.iter().all(|e| e.run == Some(run)));
    assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));
    assert_eq!(events.iter().filter(|e| e.is_supervisor_stopped()).count(), 1);

    let seen = lines(&events);
    assert_eq!(seen.len(), 5);
    assert_eq!(seen.last().map(String::as_str), Some("final line"));

    let altitudes: Vec<f64> = events
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::Telemetry(s) => s.altitude,
            _ => None,
        })
        .collect();
    assert_eq!(altitudes, vec![100.5, 200.5, 300.5]);

    let phase = events.iter().find_map(|e| match &e.kind {
        EventKind::Phase(t) => Some(t.clone()),
        _ => None,
    });
    let phase = phase.expect("phase event");
    assert_eq!(phase.from, Phase::Unknown);
    assert_eq!(phase.to, Phase::Ascent);
    assert_eq!(phase.kind, TransitionKind::Initial);

    match &events.last().unwrap().kind {
        EventKind::SupervisorStopped(r) => {
            assert_eq!(r.reason, StopReason::Exited);
            assert_eq!(r.exit_code, Some(0));
            assert!(!r.forced);
        }
        other => panic!("last event was {other:?}"),
    }
    assert!(monitor.wait().await.is_some());
    assert!(!monitor.is_running().await);

    monitor.shutdown().await;
    let snap = state.snapshot().await;
    assert_eq!(snap.altitude, Some(300.5));
    assert_eq!(snap.phase, Phase::Ascent);
    assert!(snap.stopped.is_some());
}

#[tokio::test]
async fn test_term_ignoring_process_is_killed_within_grace() {
    let (_tmp, mut cfg) = project(&format!(
        r#"
trap '' TERM
echo "INFO  MAIN : started" >> {LOG}
exec sleep 30
"#
    ));
    cfg.grace = Duration::from_millis(300);
    let poll = cfg.poll_interval;
    let grace = cfg.grace;
    let monitor = Monitor::builder(cfg).build().unwrap();
    let mut sub = monitor.subscribe();

    monitor.start_run(RunParameters::default()).await.unwrap();
    until_line(&mut sub, "INFO  MAIN : started").await;

    let started = Instant::now();
    let report = monitor.stop_run().await.unwrap().expect("report");
    let elapsed = started.elapsed();

    assert!(report.forced);
    assert_eq!(report.reason, StopReason::Requested);
    assert_eq!(report.signal, Some(9));
    // One poll interval plus scheduling slack for loaded machines.
    assert!(elapsed < grace + poll + Duration::from_millis(700), "took {elapsed:?}");

    let rest = until_stopped(&mut sub).await;
    assert_eq!(rest.iter().filter(|e| e.is_supervisor_stopped()).count(), 1);
    assert_quiet(&mut sub).await;
    assert_eq!(monitor.stop_run().await.unwrap(), None);
    monitor.shutdown().await;
}

#[tokio::test]
async fn test_spawn_failure_reports_error_status() {
    let (tmp, mut cfg) = project("exit 0");
    cfg.executable = tmp.path().join("bin/space_launch_sim");
    cfg.base_args.clear();
    let monitor = Monitor::builder(cfg).build().unwrap();
    let mut sub = monitor.subscribe();

    let err = monitor.start_run(RunParameters::default()).await.unwrap_err();
    assert_eq!(err.as_label(), "runtime_spawn_failed");

    match &next_event(&mut sub).await.kind {
        EventKind::Status(m) => {
            assert_eq!(m.component, "ERROR");
            assert_eq!(m.severity, Severity::Error);
            assert!(m.message.starts_with("Failed to start simulation"), "{}", m.message);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_quiet(&mut sub).await;
    assert!(!monitor.is_running().await);
    assert_eq!(monitor.stop_run().await.unwrap(), None);
    monitor.shutdown().await;
}

#[tokio::test]
async fn test_parameters_forwarded_and_second_start_rejected() {
    let (_tmp, cfg) = project(&format!(
        r#"
echo "args: $*" >> {LOG}
exec sleep 30
"#
    ));
    let monitor = Monitor::builder(cfg).build().unwrap();
    let mut sub = monitor.subscribe();

    let params = RunParameters {
        mission_time: "T-60".parse::<MissionTime>().unwrap(),
        verbose: true,
    };
    let run = monitor.start_run(params.clone()).await.unwrap();
    until_line(&mut sub, "args: --mission-time t-60 --verbose").await;

    let err = monitor.start_run(params).await.unwrap_err();
    assert_eq!(err.as_label(), "runtime_already_running");
    assert!(monitor.is_running().await);

    let report = monitor.stop_run().await.unwrap().expect("report");
    assert_eq!(report.run, run);
    assert!(!report.forced);
    assert_eq!(report.signal, Some(15));

    // A fresh run gets a new id and a fresh cursor.
    let next = monitor.start_run(RunParameters::default()).await.unwrap();
    assert_eq!(next, run + 1);
    until_line(&mut sub, "args: ").await;
    monitor.shutdown().await;
    assert!(!monitor.is_running().await);
}

#[tokio::test]
async fn test_glob_tails_new_run_log_not_previous_one() {
    let (tmp, mut cfg) = project(
        r#"
sleep 0.2
echo "Altitude: 42 m" >> logs/space_launch_002.log
"#,
    );
    std::fs::create_dir_all(tmp.path().join("logs")).unwrap();
    std::fs::write(tmp.path().join("logs/space_launch_001.log"), "old run line\n").unwrap();
    cfg.log_pattern = LogPattern::Glob("space_launch_*.log".into());

    let monitor = Monitor::builder(cfg).build().unwrap();
    let mut sub = monitor.subscribe();
    monitor.start_run(RunParameters::default()).await.unwrap();

    let events = until_stopped(&mut sub).await;
    assert_eq!(lines(&events), vec!["Altitude: 42 m"]);
    monitor.shutdown().await;
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(u64, Option<String>)>>,
    slow: bool,
    stall: Duration,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        let line = match &ev.kind {
            EventKind::LogLine(l) => Some(l.as_str().to_string()),
            _ => None,
        };
        let count = {
            let mut seen = self.seen.lock().await;
            seen.push((ev.seq, line));
            seen.len()
        };
        if !self.stall.is_zero() {
            tokio::time::sleep(self.stall).await;
        } else if self.slow && count % 50 == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
    fn name(&self) -> &'static str {
        if self.slow || !self.stall.is_zero() {
            "slow-recorder"
        } else {
            "recorder"
        }
    }
}

#[tokio::test]
async fn test_two_subscribers_see_same_order_over_burst() {
    let (_tmp, mut cfg) = project(&format!(
        r#"
i=1
while [ $i -le 1000 ]; do
  echo "Altitude: $i m"
  i=$((i+1))
done >> {LOG}
"#
    ));
    cfg.bus_capacity = 8192;
    let fast = Arc::new(Recorder::default());
    let slow = Arc::new(Recorder {
        slow: true,
        ..Recorder::default()
    });
    let monitor = Monitor::builder(cfg)
        .with_subscribers(vec![fast.clone() as Arc<dyn Subscribe>, slow.clone()])
        .build()
        .unwrap();

    monitor.start_run(RunParameters::default()).await.unwrap();
    let report = monitor.wait().await.expect("report");
    assert_eq!(report.reason, StopReason::Exited);
    monitor.shutdown().await;

    let fast = fast.seen.lock().await;
    let slow = slow.seen.lock().await;
    assert_eq!(*fast, *slow);

    let expected: Vec<String> = (1..=1000).map(|i| format!("Altitude: {i} m")).collect();
    let got: Vec<String> = fast.iter().filter_map(|(_, l)| l.clone()).collect();
    assert_eq!(got, expected);
    assert!(fast.windows(2).all(|w| w[0].0 < w[1].0));
}

#[tokio::test]
async fn test_slow_subscriber_drops_oldest_under_overload() {
    let (_tmp, mut cfg) = project(&format!(
        r#"
i=1
while [ $i -le 1000 ]; do
  echo "Altitude: $i m"
  i=$((i+1))
done >> {LOG}
"#
    ));
    cfg.bus_capacity = 32;
    let fast = Arc::new(Recorder::default());
    let slow = Arc::new(Recorder {
        stall: Duration::from_millis(2),
        ..Recorder::default()
    });
    let monitor = Monitor::builder(cfg)
        .with_subscribers(vec![fast.clone() as Arc<dyn Subscribe>, slow.clone()])
        .build()
        .unwrap();
    // Never read during the run: only the newest `bus_capacity` events survive.
    let mut idle = monitor.subscribe();

    monitor.start_run(RunParameters::default()).await.unwrap();
    monitor.wait().await.expect("report");
    monitor.shutdown().await;

    let mut buffered = Vec::new();
    while let Some(ev) = idle.try_recv() {
        buffered.push(ev);
    }
    assert_eq!(buffered.len(), 32);
    assert!(idle.dropped() > 0);
    assert!(buffered.windows(2).all(|w| w[0].seq < w[1].seq));
    let stop_seq = buffered.last().filter(|e| e.is_supervisor_stopped()).map(|e| e.seq);
    assert!(stop_seq.is_some(), "stop event must be the newest buffered event");
    let total = buffered.len() as u64 + idle.dropped();

    let lag = monitor.subscriber_lag();
    let names: Vec<&str> = lag.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, ["recorder", "slow-recorder"]);
    assert!(lag[1].1 > 0, "slow subscriber never overflowed: {lag:?}");

    for (rec, (_, dropped)) in [&fast, &slow].into_iter().zip(&lag) {
        let seen = rec.seen.lock().await;
        assert_eq!(seen.len() as u64 + dropped, total);
        assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(seen.last().map(|(seq, _)| *seq), stop_seq);
    }
}
