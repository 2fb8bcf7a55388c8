//! Region workers: one persistent thread per region of the habitat.
//!
//! A region is moved into its worker with each day-step and moved back with
//! the report, so a worker owns its cells outright while it steps them.

use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use tracing::{debug, error};

use crate::context::SimulationContext;
use crate::density::DensityGrid;
use crate::dispersal::{Disperser, SeedEvent};
use crate::environment::Environment;
use crate::genome::GenomeSampler;
use crate::habitat::Region;
use crate::lifecycle::{self, Outcome};

/// Per-region tallies for one day-step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStats {
    pub plants_stepped: u64,
    pub deaths: u64,
    pub releases: u64,
    /// Seeds that landed on the grid and are waiting to be merged.
    pub seeds_emitted: u64,
    pub seeds_discarded: u64,
}

impl AddAssign for StepStats {
    fn add_assign(&mut self, rhs: Self) {
        self.plants_stepped += rhs.plants_stepped;
        self.deaths += rhs.deaths;
        self.releases += rhs.releases;
        self.seeds_emitted += rhs.seeds_emitted;
        self.seeds_discarded += rhs.seeds_discarded;
    }
}

/// Immutable rules every worker applies, shared across threads.
#[derive(Clone, Debug)]
pub struct StepRules {
    pub ratio: u32,
    pub disperser: Disperser,
    pub genome: GenomeSampler,
}

impl StepRules {
    fn weight(&self) -> i64 {
        i64::from(self.ratio)
    }
}

/// Run one day over every plant in `region`.
///
/// Dead plants are removed once their cell has been fully iterated. Seeds
/// are returned rather than inserted, whatever region they land in; the
/// density counters are updated immediately.
pub fn step_region(
    region: &mut Region,
    env: &Environment,
    rules: &StepRules,
    density: &DensityGrid,
    rng: &mut ChaCha12Rng,
) -> (Vec<SeedEvent>, StepStats) {
    let weight = rules.weight();
    let mut seeds = Vec::new();
    let mut stats = StepStats::default();
    let mut dead = Vec::new();
    let mut releasing = Vec::new();

    for (coord, cell) in region.cells_mut() {
        if cell.is_empty() {
            continue;
        }
        dead.clear();
        releasing.clear();
        for (i, plant) in cell.iter_mut().enumerate() {
            match lifecycle::step(plant, env, rng) {
                Outcome::Continue => {}
                Outcome::ReleaseSeeds => releasing.push(plant.is_founder),
                Outcome::Die => dead.push(i),
            }
        }
        stats.plants_stepped += cell.len() as u64;

        for &is_founder in &releasing {
            let release = rules
                .disperser
                .release(coord, is_founder, env, &rules.genome, rng);
            for seed in &release.seeds {
                density.add(seed.destination, weight);
            }
            stats.releases += 1;
            stats.seeds_emitted += release.seeds.len() as u64;
            stats.seeds_discarded += u64::from(release.discarded);
            seeds.extend(release.seeds);
        }

        // Descending order keeps the pending indices valid under swap_remove.
        for &i in dead.iter().rev() {
            cell.swap_remove(i);
            density.remove(coord, weight);
        }
        stats.deaths += dead.len() as u64;
    }

    (seeds, stats)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Stepping,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        if raw == 1 {
            WorkerState::Stepping
        } else {
            WorkerState::Idle
        }
    }
}

/// What a worker hands back at the end of a day-step.
#[derive(Debug)]
pub struct StepReport {
    pub region: Region,
    pub seeds: Vec<SeedEvent>,
    pub stats: StepStats,
}

#[derive(Debug)]
enum WorkerCommand {
    Step {
        region: Region,
        environment: Environment,
    },
    Shutdown,
}

/// Handle to a persistent region worker thread.
pub struct RegionWorker {
    index: usize,
    commands: mpsc::Sender<WorkerCommand>,
    state: Arc<AtomicU8>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RegionWorker {
    pub fn spawn(
        index: usize,
        rules: Arc<StepRules>,
        context: Arc<SimulationContext>,
        mut rng: ChaCha12Rng,
        reports: mpsc::Sender<StepReport>,
    ) -> std::io::Result<Self> {
        let (commands, rx) = mpsc::channel::<WorkerCommand>();
        let state = Arc::new(AtomicU8::new(0));
        let worker_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name(format!("dandelion-region-{index}"))
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    match command {
                        WorkerCommand::Step {
                            mut region,
                            environment,
                        } => {
                            worker_state.store(1, Ordering::Release);
                            let (seeds, stats) = step_region(
                                &mut region,
                                &environment,
                                &rules,
                                context.density(),
                                &mut rng,
                            );
                            debug!(
                                region = index,
                                plants = stats.plants_stepped,
                                deaths = stats.deaths,
                                releases = stats.releases,
                                seeds = stats.seeds_emitted,
                                "region step complete"
                            );
                            worker_state.store(0, Ordering::Release);
                            if reports
                                .send(StepReport {
                                    region,
                                    seeds,
                                    stats,
                                })
                                .is_err()
                            {
                                error!(region = index, "coordinator hung up; worker exiting");
                                break;
                            }
                        }
                        WorkerCommand::Shutdown => break,
                    }
                }
            })?;
        Ok(Self {
            index,
            commands,
            state,
            handle: Some(handle),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True once the thread has exited (after shutdown or a panic).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Hand `region` to the worker for one day-step. Gives the region back if
    /// the worker thread is gone.
    pub(crate) fn dispatch(&self, region: Region, environment: Environment) -> Result<(), Region> {
        self.commands
            .send(WorkerCommand::Step {
                region,
                environment,
            })
            .map_err(|err| match err.0 {
                WorkerCommand::Step { region, .. } => region,
                WorkerCommand::Shutdown => unreachable!("only step commands are dispatched"),
            })
    }

    /// Release the worker one last time so it observes shutdown, then join it.
    pub fn shutdown(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!(region = self.index, "region worker thread panicked");
        }
    }
}

impl Drop for RegionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
