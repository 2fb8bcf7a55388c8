use super::*;
use crate::density::DensitySnapshot;
use crate::plant::Stage;
use crate::weather::{ScriptedWeather, WeatherRecord};
use std::sync::Mutex;

fn record(date: &str, temperature: f32, precipitation: f32) -> WeatherRecord {
    WeatherRecord {
        date: date.to_string(),
        temperature,
        precipitation,
        wind_direction: 45,
        wind_speed: 10.0,
    }
}

fn warm_days(n: usize) -> Vec<WeatherRecord> {
    (0..n)
        .map(|i| {
            let date = format!("2020-{:02}-{:02}", 4 + i / 28, 1 + i % 28);
            // Alternate dry and wet days so health moves both ways.
            let precipitation = if i % 3 == 0 { 0.2 } else { 2.5 };
            record(&date, 15.0 + (i % 10) as f32, precipitation)
        })
        .collect()
}

fn make_config(ratio: u32) -> SimConfig {
    SimConfig {
        ratio,
        day_length_ms: 0,
        ..SimConfig::default()
    }
}

fn make_coordinator(config: SimConfig, records: Vec<WeatherRecord>) -> Coordinator {
    Coordinator::new(config, Box::new(ScriptedWeather::new(records))).unwrap()
}

fn advance(coordinator: &mut Coordinator) -> DayReport {
    match coordinator.tick().unwrap() {
        DayOutcome::Advanced(report) => report,
        other => panic!("expected the day to advance, got {other:?}"),
    }
}

fn assert_counters_match_habitat(coordinator: &Coordinator) {
    let ratio = i64::from(coordinator.config().ratio);
    let ctx = coordinator.context();
    let habitat = coordinator.habitat();
    assert_eq!(ctx.population(), ratio * habitat.population() as i64);
    let grid = ctx.density().snapshot();
    assert_eq!(grid.total(), ctx.population());
    for y in 0..grid.size() {
        for x in 0..grid.size() {
            let plants = habitat.cell(CellCoord::new(x, y)).len() as i64;
            assert_eq!(grid.get(x, y), ratio * plants, "cell ({x}, {y})");
        }
    }
}

#[test]
fn founder_releases_on_first_warm_day_and_survives() {
    let mut coordinator = make_coordinator(make_config(10), warm_days(1));
    assert_eq!(coordinator.context().population(), 10);

    let report = advance(&mut coordinator);
    let founder_cell = CellCoord::new(49, 49);
    let founders: Vec<_> = coordinator
        .habitat()
        .cell(founder_cell)
        .iter()
        .filter(|p| p.is_founder)
        .collect();
    assert_eq!(founders.len(), 1);
    assert_eq!(founders[0].stage, Stage::SubsequentMaturing);

    assert_eq!(report.stats.releases, 1);
    assert_eq!(report.stats.deaths, 0);
    let total = report.seeds_inserted + report.stats.seeds_discarded;
    assert!((150..=200).contains(&total), "founder seeds {total}");
    assert_eq!(report.population, 10 * (1 + report.seeds_inserted as i64));
    assert_eq!(report.plants, 1 + report.seeds_inserted as usize);
    assert_counters_match_habitat(&coordinator);
}

#[test]
fn population_counter_tracks_births_and_deaths_exactly() {
    let mut coordinator = make_coordinator(make_config(3), warm_days(45));
    let mut inserted = 0i64;
    let mut deaths = 0i64;
    for _ in 0..45 {
        let report = advance(&mut coordinator);
        inserted += report.seeds_inserted as i64;
        deaths += report.stats.deaths as i64;
        assert_eq!(report.population, 3 * (1 + inserted - deaths));
    }
    assert!(deaths > 0, "dry days and predation should kill some seedlings");
    assert_counters_match_habitat(&coordinator);
}

#[test]
fn every_region_reports_before_seeds_merge() {
    let config = SimConfig {
        grid_size: 99,
        regions_per_axis: 3,
        // North-east corner of the centre region; the wind blows north-east.
        founder_cell: [64, 34],
        ..make_config(1)
    };
    let mut coordinator = make_coordinator(config, warm_days(5));
    assert_eq!(coordinator.workers().len(), 9);
    for _ in 0..5 {
        let report = advance(&mut coordinator);
        assert_eq!(report.workers_reported, 9);
        assert!(coordinator.habitat().is_settled());
    }
    assert!(
        coordinator
            .workers()
            .iter()
            .all(|w| w.state() == crate::worker::WorkerState::Idle)
    );
    let occupied_regions = coordinator
        .habitat()
        .regions()
        .iter()
        .filter(|r| r.population() > 0)
        .count();
    assert!(occupied_regions > 1);
    assert_counters_match_habitat(&coordinator);
}

#[test]
fn corner_founder_loses_seeds_off_grid() {
    let config = SimConfig {
        founder_cell: [0, 0],
        ..make_config(1)
    };
    let mut coordinator = make_coordinator(config, vec![record("2020-06-01", 20.0, 2.0)]);
    let report = advance(&mut coordinator);
    let total = report.seeds_inserted + report.stats.seeds_discarded;
    assert!((1500..=2000).contains(&total));
    assert!(report.stats.seeds_discarded > 0);
    assert_eq!(report.population, 1 + report.seeds_inserted as i64);
    assert_counters_match_habitat(&coordinator);
}

#[test]
fn pausing_freezes_everything() {
    let records = vec![record("2020-05-01", 20.0, 2.0), record("2020-05-02", 20.0, 2.0)];
    let mut coordinator = make_coordinator(make_config(2), records);
    let ctx = coordinator.context();
    let before = ctx.density().snapshot();

    assert!(ctx.toggle_pause());
    for _ in 0..3 {
        assert_eq!(coordinator.tick().unwrap(), DayOutcome::Paused);
    }
    assert_eq!(ctx.density().snapshot(), before);
    assert_eq!(ctx.day(), 1);
    assert_eq!(coordinator.habitat().population(), 1);
    assert!(coordinator.history().is_empty());

    assert!(!ctx.toggle_pause());
    let report = advance(&mut coordinator);
    assert_eq!(report.date, "2020-05-01", "paused ticks must not consume weather");
    assert_eq!(report.day, 1);
    assert_eq!(ctx.day(), 2);
}

#[test]
fn exhausted_weather_pauses_and_ends_run() {
    let mut coordinator = make_coordinator(make_config(1), warm_days(3));
    let summary = coordinator.run().unwrap();
    assert_eq!(summary.days, 3);
    assert!(summary.weather_exhausted);
    assert!(coordinator.context().is_paused());
    assert_eq!(coordinator.tick().unwrap(), DayOutcome::Paused);
    coordinator.context().resume();
    assert_eq!(coordinator.tick().unwrap(), DayOutcome::Exhausted);
    assert_eq!(summary.reports.len(), 3);
    assert_eq!(summary.final_population, coordinator.context().population());
}

#[test]
fn shutdown_request_stops_run_before_first_day() {
    let mut coordinator = make_coordinator(make_config(1), warm_days(10));
    coordinator.context().request_shutdown();
    let summary = coordinator.run().unwrap();
    assert_eq!(summary.days, 0);
    assert_eq!(summary.final_population, 1);
    coordinator.shutdown();
}

#[test]
fn identical_seeds_produce_identical_runs() {
    let run = |seed: u64| {
        let config = SimConfig {
            seed,
            ..make_config(4)
        };
        let mut coordinator = make_coordinator(config, warm_days(30));
        let populations: Vec<i64> = (0..30).map(|_| advance(&mut coordinator).population).collect();
        (populations, coordinator.context().density().snapshot())
    };
    let (a_pop, a_grid) = run(77);
    let (b_pop, b_grid) = run(77);
    assert_eq!(a_pop, b_pop);
    assert_eq!(a_grid, b_grid);

    let (_, c_grid) = run(78);
    assert_ne!(a_grid, c_grid);
}

#[derive(Clone, Default)]
struct RecordingExporter {
    calls: Arc<Mutex<Vec<(String, i64)>>>,
}

impl SnapshotExporter for RecordingExporter {
    fn export(&mut self, date: &str, grid: &DensitySnapshot) -> Result<Vec<PathBuf>, SnapshotError> {
        self.calls
            .lock()
            .unwrap()
            .push((date.to_string(), grid.total()));
        Ok(Vec::new())
    }
}

#[test]
fn snapshot_taken_once_per_date_before_stepping() {
    let config = SimConfig {
        snapshot_dates: vec!["2020-05-01".into(), "2020-05-03".into(), "2021-01-01".into()],
        ..make_config(5)
    };
    let records = vec![
        record("2020-05-01", 20.0, 2.0),
        record("2020-05-01", 20.0, 2.0),
        record("2020-05-02", 20.0, 2.0),
        record("2020-05-03", 20.0, 2.0),
    ];
    let exporter = RecordingExporter::default();
    let calls = Arc::clone(&exporter.calls);
    let mut coordinator = make_coordinator(config, records).with_exporter(Box::new(exporter));
    let summary = coordinator.run().unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    // The first export sees only the founder; its seeds land afterwards.
    assert_eq!(calls[0], ("2020-05-01".to_string(), 5));
    assert_eq!(calls[1].0, "2020-05-03");
    assert_eq!(calls[1].1, summary.reports[2].population);
    assert_eq!(summary.snapshots_written, vec!["2020-05-01", "2020-05-03"]);
}

struct FailingExporter;

impl SnapshotExporter for FailingExporter {
    fn export(&mut self, _date: &str, _grid: &DensitySnapshot) -> Result<Vec<PathBuf>, SnapshotError> {
        Err(SnapshotError::Io {
            path: PathBuf::from("/nowhere/2020-05-01.png"),
            source: std::io::Error::other("read-only filesystem"),
        })
    }
}

#[test]
fn snapshot_failure_is_fatal() {
    let config = SimConfig {
        snapshot_dates: vec!["2020-05-01".into()],
        ..make_config(1)
    };
    let mut coordinator = make_coordinator(config, vec![record("2020-05-01", 20.0, 2.0)])
        .with_exporter(Box::new(FailingExporter));
    assert!(matches!(
        coordinator.tick(),
        Err(CoordinatorError::Snapshot(SnapshotError::Io { .. }))
    ));
}

#[test]
fn invalid_config_is_rejected_before_workers_start() {
    let config = SimConfig {
        grid_size: 101,
        ..make_config(1)
    };
    let result = Coordinator::new(config, Box::new(ScriptedWeather::new(Vec::new())));
    assert!(matches!(
        result,
        Err(CoordinatorError::Config(SimConfigError::IndivisibleGrid { .. }))
    ));
}

#[test]
fn context_publishes_each_day_environment() {
    let mut coordinator = make_coordinator(
        SimConfig {
            climate: crate::environment::Climate::Desert,
            ..make_config(1)
        },
        vec![record("2020-07-04", 33.0, 0.0)],
    );
    advance(&mut coordinator);
    let ctx = coordinator.context();
    assert_eq!(ctx.date(), "2020-07-04");
    let env = ctx.environment();
    assert_eq!(env.season, Season::Summer);
    assert_eq!(env.temperature, 33.0);
    assert_eq!(
        env.humidity,
        crate::environment::humidity_for(Season::Summer, crate::environment::Climate::Desert)
    );
}
