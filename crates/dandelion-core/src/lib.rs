pub mod config;
pub mod constants;
pub mod context;
pub mod coordinator;
pub mod density;
pub mod dispersal;
pub mod environment;
pub mod genome;
pub mod habitat;
pub mod lifecycle;
pub mod metrics;
pub mod plant;
pub mod rng;
pub mod snapshot;
pub mod weather;
pub mod worker;

pub use config::{SimConfig, SimConfigError, parse_ratio};
pub use context::SimulationContext;
pub use coordinator::{Coordinator, CoordinatorError, DayOutcome};
pub use environment::{Climate, Environment, Season};
pub use metrics::{DayReport, RunSummary};
pub use snapshot::{FileSnapshotExporter, SnapshotError, SnapshotExporter};
pub use weather::{CsvWeatherSource, ScriptedWeather, WeatherError, WeatherRecord, WeatherSource};
