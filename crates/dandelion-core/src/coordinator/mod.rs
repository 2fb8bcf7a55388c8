//! The day loop: weather in, workers stepped, seeds merged.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{SimConfig, SimConfigError};
use crate::context::SimulationContext;
use crate::dispersal::{Disperser, SeedEvent};
use crate::environment::{Environment, Season};
use crate::genome::GenomeSampler;
use crate::habitat::{CellCoord, Habitat, Partition};
use crate::metrics::{DayReport, RunSummary};
use crate::plant::Plant;
use crate::rng::{create_rng, derive_worker_rng};
use crate::snapshot::{SnapshotError, SnapshotExporter};
use crate::weather::WeatherSource;
use crate::worker::{RegionWorker, StepReport, StepRules, StepStats};

/// How often a paused run re-checks its control flags.
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How often the barrier checks for dead workers while waiting.
const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] SimConfigError),
    #[error("failed to spawn worker for region {region}: {source}")]
    WorkerSpawn {
        region: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("worker for region {region} stopped unexpectedly")]
    WorkerDisconnected { region: usize },
    #[error("snapshot export failed: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Result of one pass through the day loop.
#[derive(Clone, Debug, PartialEq)]
pub enum DayOutcome {
    Advanced(DayReport),
    /// The pause flag is set; nothing happened.
    Paused,
    /// The weather source ran dry. The run is now paused.
    Exhausted,
}

pub struct Coordinator {
    config: SimConfig,
    context: Arc<SimulationContext>,
    habitat: Habitat,
    workers: Vec<RegionWorker>,
    reports: mpsc::Receiver<StepReport>,
    weather: Box<dyn WeatherSource>,
    exporter: Option<Box<dyn SnapshotExporter>>,
    pending_snapshots: HashSet<String>,
    snapshots_written: Vec<String>,
    season: Season,
    history: Vec<DayReport>,
    peak_population: i64,
    weather_exhausted: bool,
}

impl Coordinator {
    /// Validate `config`, plant the founder and start one worker per region.
    pub fn new(
        config: SimConfig,
        weather: Box<dyn WeatherSource>,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        let genome = GenomeSampler::new(&config.genome)?;
        let disperser = Disperser::new(&config.dispersal, config.grid_size, config.ratio)?;
        let rules = Arc::new(StepRules {
            ratio: config.ratio,
            disperser,
            genome,
        });

        let context = Arc::new(SimulationContext::new(config.grid_size));
        let partition = Partition::new(config.grid_size, config.regions_per_axis);
        let mut habitat = Habitat::new(partition);

        let [fx, fy] = config.founder_cell;
        let founder_cell = CellCoord::new(fx, fy);
        let mut founder_rng = create_rng(config.seed);
        let founder = Plant::founder(rules.genome.sample(&mut founder_rng));
        if habitat.insert(founder_cell, founder).is_err() {
            return Err(SimConfigError::FounderOutOfBounds {
                x: fx,
                y: fy,
                grid_size: config.grid_size,
            }
            .into());
        }
        context.density().add(founder_cell, i64::from(config.ratio));

        let (report_tx, reports) = mpsc::channel();
        let workers = (0..partition.region_count())
            .map(|region| {
                RegionWorker::spawn(
                    region,
                    Arc::clone(&rules),
                    Arc::clone(&context),
                    derive_worker_rng(config.seed, region),
                    report_tx.clone(),
                )
                .map_err(|source| CoordinatorError::WorkerSpawn { region, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            seed = config.seed,
            grid_size = config.grid_size,
            regions = workers.len(),
            ratio = config.ratio,
            climate = %config.climate,
            founder_x = fx,
            founder_y = fy,
            "simulation initialized"
        );

        Ok(Self {
            pending_snapshots: config.snapshot_dates.iter().cloned().collect(),
            snapshots_written: Vec::new(),
            peak_population: context.population(),
            config,
            context,
            habitat,
            workers,
            reports,
            weather,
            exporter: None,
            season: Season::default(),
            history: Vec::new(),
            weather_exhausted: false,
        })
    }

    pub fn with_exporter(mut self, exporter: Box<dyn SnapshotExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Shared handle for observers and control threads.
    pub fn context(&self) -> Arc<SimulationContext> {
        Arc::clone(&self.context)
    }

    pub fn habitat(&self) -> &Habitat {
        &self.habitat
    }

    pub fn workers(&self) -> &[RegionWorker] {
        &self.workers
    }

    pub fn history(&self) -> &[DayReport] {
        &self.history
    }

    /// One pass of the day loop, honoring the pause flag.
    pub fn tick(&mut self) -> Result<DayOutcome, CoordinatorError> {
        if self.context.is_paused() {
            return Ok(DayOutcome::Paused);
        }
        let started = Instant::now();

        let Some(record) = self.weather.next_record() else {
            if !self.weather_exhausted {
                warn!("weather data ran out; pausing");
            }
            self.weather_exhausted = true;
            self.context.pause();
            return Ok(DayOutcome::Exhausted);
        };
        let environment = Environment::from_record(&record, self.config.climate, self.season);
        self.season = environment.season;
        self.context.publish(&record.date, environment);

        self.export_snapshot_if_due(&record.date)?;

        let reports = self.step_regions(environment)?;
        let workers_reported = reports.len();
        let (stats, seeds_inserted) = self.merge(reports);
        let step_us = started.elapsed().as_micros() as u64;

        let day = self.context.day();
        let population = self.context.population();
        self.peak_population = self.peak_population.max(population);
        let report = DayReport {
            day,
            date: record.date,
            environment,
            population,
            plants: self.habitat.population(),
            stats,
            seeds_inserted,
            workers_reported,
            step_us,
        };
        info!(
            day,
            date = %report.date,
            season = %environment.season,
            temperature = environment.temperature,
            humidity = environment.humidity,
            light = environment.light,
            precipitation = environment.precipitation,
            wind_direction = environment.wind_direction,
            wind_speed = environment.wind_speed,
            population,
            "day complete"
        );

        let budget = Duration::from_millis(self.config.day_length_ms);
        if let Some(rest) = budget.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
        self.context.advance_day();

        self.history.push(report.clone());
        Ok(DayOutcome::Advanced(report))
    }

    /// Loop until shutdown is requested, or until the weather runs out when
    /// `stop_when_exhausted` is set.
    pub fn run(&mut self) -> Result<RunSummary, CoordinatorError> {
        info!(day = self.context.day(), "simulation running");
        while !self.context.shutdown_requested() {
            match self.tick()? {
                DayOutcome::Advanced(_) => {}
                DayOutcome::Paused => thread::sleep(PAUSE_POLL_INTERVAL),
                DayOutcome::Exhausted if self.config.stop_when_exhausted => break,
                DayOutcome::Exhausted => {}
            }
        }
        let summary = self.summary();
        info!(
            days = summary.days,
            population = summary.final_population,
            plants = summary.final_plants,
            "simulation finished"
        );
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            schema_version: 1,
            seed: self.config.seed,
            ratio: self.config.ratio,
            climate: self.config.climate,
            days: self.history.len() as u64,
            final_population: self.context.population(),
            final_plants: self.habitat.population(),
            peak_population: self.peak_population,
            total_deaths: self.history.iter().map(|r| r.stats.deaths).sum(),
            total_seeds_inserted: self.history.iter().map(|r| r.seeds_inserted).sum(),
            snapshots_written: self.snapshots_written.clone(),
            weather_exhausted: self.weather_exhausted,
            reports: self.history.clone(),
        }
    }

    /// Stop every worker and wait for it to exit.
    pub fn shutdown(mut self) {
        self.context.request_shutdown();
        for worker in &mut self.workers {
            worker.shutdown();
        }
    }

    /// Each configured date is exported at most once, before that day is stepped.
    fn export_snapshot_if_due(&mut self, date: &str) -> Result<(), CoordinatorError> {
        if !self.pending_snapshots.remove(date) {
            return Ok(());
        }
        let Some(exporter) = self.exporter.as_mut() else {
            debug!(date, "snapshot date reached with no exporter configured");
            return Ok(());
        };
        let grid = self.context.density().snapshot();
        let written: Vec<PathBuf> = exporter.export(date, &grid)?;
        debug!(date, files = written.len(), "snapshot exported");
        self.snapshots_written.push(date.to_string());
        Ok(())
    }

    /// Hand every region to its worker and wait until all of them report.
    fn step_regions(&mut self, environment: Environment) -> Result<Vec<StepReport>, CoordinatorError> {
        let regions = self.habitat.take_regions();
        let expected = regions.len();
        for region in regions {
            let index = region.index();
            if self.workers[index].dispatch(region, environment).is_err() {
                return Err(CoordinatorError::WorkerDisconnected { region: index });
            }
        }

        let mut reports = Vec::with_capacity(expected);
        while reports.len() < expected {
            match self.reports.recv_timeout(WORKER_POLL_INTERVAL) {
                Ok(report) => reports.push(report),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if let Some(region) = self.dead_worker(&reports) {
                        return Err(CoordinatorError::WorkerDisconnected { region });
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    let region = self.dead_worker(&reports).unwrap_or_default();
                    return Err(CoordinatorError::WorkerDisconnected { region });
                }
            }
        }
        reports.sort_by_key(|r| r.region.index());
        Ok(reports)
    }

    /// First worker that exited without reporting this step.
    fn dead_worker(&self, reports: &[StepReport]) -> Option<usize> {
        self.workers
            .iter()
            .filter(|w| w.is_finished())
            .map(RegionWorker::index)
            .find(|&idx| reports.iter().all(|r| r.region.index() != idx))
    }

    /// Put the regions back, then insert every seed in region order.
    fn merge(&mut self, reports: Vec<StepReport>) -> (StepStats, u64) {
        let mut stats = StepStats::default();
        let mut regions = Vec::with_capacity(reports.len());
        let mut seeds: Vec<Vec<SeedEvent>> = Vec::with_capacity(reports.len());
        for report in reports {
            stats += report.stats;
            regions.push(report.region);
            seeds.push(report.seeds);
        }
        self.habitat.restore(regions);

        let mut inserted = 0u64;
        for seed in seeds.into_iter().flatten() {
            let destination = seed.destination;
            match self.habitat.insert(destination, seed.plant) {
                Ok(()) => inserted += 1,
                Err(_) => warn!(x = destination.x, y = destination.y, "dropping seed outside habitat"),
            }
        }
        (stats, inserted)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.context.request_shutdown();
    }
}

#[cfg(test)]
mod tests;
