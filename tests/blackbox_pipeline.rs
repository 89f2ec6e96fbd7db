use std::thread;

use timecomplexity::analysis::{analyse, observations_for_path, AnalysisError};
use timecomplexity::config::{Config, RecorderConfig};
use timecomplexity::fitting::ModelKind;
use timecomplexity::recorder::{CallPath, Measurement, Snapshot, TimeRecorder};

const SIZES: [u64; 6] = [1_000, 2_000, 4_000, 8_000, 16_000, 32_000];

fn sort_path() -> CallPath {
    CallPath::from(["app::main", "app::sort::merge_sort"])
}

fn io_path() -> CallPath {
    CallPath::from(["app::main", "app::io::flush"])
}

/// Synthetic cost in nanoseconds of a `5 n ln n + 1000` algorithm.
fn linearithmic_cost(n: u64) -> i64 {
    let n = n as f64;
    (5.0 * n * n.ln() + 1_000.0).round() as i64
}

/// Records `repetitions` samples at `n` from several producer threads.
/// Samples alternate around the true cost so every average is exact.
fn record_size(n: u64, producers: usize, repetitions: usize) -> Snapshot<Measurement> {
    let recorder = TimeRecorder::start(&RecorderConfig::default()).expect("start recorder");
    let cost = linearithmic_cost(n);

    thread::scope(|s| {
        for _ in 0..producers {
            let handle = recorder.handle();
            s.spawn(move || {
                for rep in 0..repetitions {
                    let jitter = if rep % 2 == 0 { -250 } else { 250 };
                    handle
                        .report_nanos(cost + jitter, sort_path())
                        .expect("sort report accepted");
                    handle
                        .report_nanos(40_000, io_path())
                        .expect("io report accepted");
                }
            });
        }
    });

    recorder.stop().expect("stop recorder")
}

#[test]
fn recorded_sweep_is_classified_linearithmic() {
    let runs: Vec<(u64, Snapshot<Measurement>)> = SIZES
        .iter()
        .map(|&n| (n, record_size(n, 4, 10)))
        .collect();

    for (n, snapshot) in &runs {
        let m = snapshot.get(&sort_path()).expect("sort path recorded");
        assert_eq!(m.count(), 40.0, "n = {n}");
        assert_eq!(m.average(), Some(linearithmic_cost(*n) as f64));
        // Parent frame exists only as an ancestor.
        assert_eq!(snapshot.get(&CallPath::from(["app::main"])), None);
    }

    let observations = observations_for_path(&runs, &sort_path());
    assert_eq!(observations.len(), SIZES.len());

    let report = analyse(&observations, &Config::default().fitting).expect("analysis succeeds");
    assert_eq!(report.complexity(), ModelKind::Linearithmic);
    assert!((report.best.params()[0] - 5.0).abs() < 1e-3, "{report}");

    // Constant-cost sibling is classified independently.
    let io = observations_for_path(&runs, &io_path());
    let io_report = analyse(&io, &Config::default().fitting).expect("analysis succeeds");
    assert_eq!(io_report.complexity(), ModelKind::Constant);
}

#[test]
fn split_recording_merges_to_same_result() {
    let n = 4_000;
    let whole = record_size(n, 2, 20);

    let first = record_size(n, 1, 20);
    let second = record_size(n, 1, 20);
    let merged = first.into_tree().merged(second.as_tree());

    assert_eq!(merged.get(&sort_path()), whole.get(&sort_path()));
    assert_eq!(merged.get(&io_path()), whole.get(&io_path()));
    assert_eq!(merged.entries().len(), whole.entries().len());
}

#[test]
fn missing_path_yields_no_observations() {
    let runs = vec![(1_000, record_size(1_000, 1, 2))];
    let observations = observations_for_path(&runs, &CallPath::from(["app::main", "never"]));

    assert!(observations.is_empty());
    assert_eq!(
        analyse(&observations, &Config::default().fitting).err(),
        Some(AnalysisError::NoObservations)
    );
}

#[test]
fn yaml_config_drives_fitting() {
    let cfg = Config::from_yaml(
        r#"
recorder:
  stop_timeout: 5s
fitting:
  parallel: false
"#,
    )
    .expect("valid config");

    let recorder = TimeRecorder::start(&cfg.recorder).expect("start recorder");
    for n in [10i64, 20, 30] {
        recorder
            .report_time(n * 1_000, CallPath::from(["probe"]))
            .expect("report accepted");
    }
    let snapshot = recorder.stop().expect("stop recorder");
    assert_eq!(
        snapshot.get(&CallPath::from(["probe"])),
        Some(&Measurement::new(3.0, 60_000.0))
    );
}
