use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::weather::WeatherRecord;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Climate {
    Polar,
    Continental,
    Tropical,
    Desert,
    #[default]
    Temperate,
}

impl Climate {
    pub const ALL: [Climate; 5] = [
        Climate::Polar,
        Climate::Continental,
        Climate::Tropical,
        Climate::Desert,
        Climate::Temperate,
    ];

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|climate| climate.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Like [`Climate::from_name`], but unknown names fall back to `Temperate`.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            warn!(name, "unknown climate; falling back to temperate");
            Self::default()
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Climate::Polar => "polar",
            Climate::Continental => "continental",
            Climate::Tropical => "tropical",
            Climate::Desert => "desert",
            Climate::Temperate => "temperate",
        }
    }

    fn column(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Climate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    #[default]
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Meteorological season for a calendar month (1-12).
    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Season::Winter),
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Autumn),
            _ => None,
        }
    }

    /// Season of an ISO `YYYY-MM-DD` date label.
    pub fn from_date(date: &str) -> Option<Self> {
        let month = date.get(5..7)?.parse::<u32>().ok()?;
        Self::from_month(month)
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }

    fn row(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relative humidity (%) by season row and climate column.
const HUMIDITY: [[i32; 5]; 4] = [
    [73, 70, 87, 60, 49],
    [79, 50, 88, 58, 53],
    [90, 48, 89, 50, 58],
    [86, 57, 89, 62, 49],
];

/// Daylight hours by season row and climate column.
const LIGHT: [[f32; 5]; 4] = [
    [2.0 + 1.0 / 6.0, 8.5, 10.0 + 5.0 / 6.0, 9.5, 10.5],
    [17.5, 13.0 + 1.0 / 6.0, 11.5, 12.25, 11.0 + 5.0 / 6.0],
    [22.25, 15.75, 10.0 + 52.0 / 60.0, 13.25, 13.0 + 5.0 / 6.0],
    [13.0, 10.0 + 2.0 / 3.0, 10.75, 11.75, 11.25],
];

pub fn humidity_for(season: Season, climate: Climate) -> i32 {
    HUMIDITY[season.row()][climate.column()]
}

pub fn light_for(season: Season, climate: Climate) -> f32 {
    LIGHT[season.row()][climate.column()]
}

/// Environmental inputs shared by every plant for one simulated day.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Environment {
    pub season: Season,
    /// Daily mean temperature in C.
    pub temperature: f32,
    /// Precipitation in mm.
    pub precipitation: f32,
    /// Direction the wind blows toward, in degrees.
    pub wind_direction: i32,
    /// Wind speed in km/h.
    pub wind_speed: f32,
    /// Relative humidity in percent.
    pub humidity: i32,
    /// Daylight in hours.
    pub light: f32,
}

impl Environment {
    /// Build the snapshot for `record`.
    ///
    /// When the record's date carries no recognizable month the season of
    /// `previous` is kept.
    pub fn from_record(record: &WeatherRecord, climate: Climate, previous: Season) -> Self {
        let season = Season::from_date(&record.date).unwrap_or_else(|| {
            warn!(date = %record.date, "weather record has no parseable month; keeping season");
            previous
        });
        Self {
            season,
            temperature: record.temperature,
            precipitation: record.precipitation,
            wind_direction: record.wind_direction,
            wind_speed: record.wind_speed,
            humidity: humidity_for(season, climate),
            light: light_for(season, climate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str) -> WeatherRecord {
        WeatherRecord {
            date: date.to_string(),
            temperature: 12.5,
            precipitation: 1.0,
            wind_direction: 270,
            wind_speed: 7.2,
        }
    }

    #[test]
    fn months_map_to_meteorological_seasons() {
        assert_eq!(Season::from_month(12), Some(Season::Winter));
        assert_eq!(Season::from_month(2), Some(Season::Winter));
        assert_eq!(Season::from_month(3), Some(Season::Spring));
        assert_eq!(Season::from_month(8), Some(Season::Summer));
        assert_eq!(Season::from_month(11), Some(Season::Autumn));
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn season_is_read_from_iso_date() {
        assert_eq!(Season::from_date("2021-07-04"), Some(Season::Summer));
        assert_eq!(Season::from_date("2021-x7-04"), None);
        assert_eq!(Season::from_date("2021"), None);
    }

    #[test]
    fn climate_lookup_is_case_insensitive_and_defaults_to_temperate() {
        assert_eq!(Climate::from_name("Desert"), Some(Climate::Desert));
        assert_eq!(Climate::from_name(" polar "), Some(Climate::Polar));
        assert_eq!(Climate::from_name("martian"), None);
        assert_eq!(Climate::from_name_or_default("martian"), Climate::Temperate);
    }

    #[test]
    fn tables_are_indexed_by_season_then_climate() {
        assert_eq!(humidity_for(Season::Summer, Climate::Polar), 90);
        assert_eq!(humidity_for(Season::Spring, Climate::Continental), 50);
        assert!((light_for(Season::Winter, Climate::Polar) - 2.1666667).abs() < 1e-5);
        assert!((light_for(Season::Autumn, Climate::Temperate) - 11.25).abs() < f32::EPSILON);
    }

    #[test]
    fn snapshot_copies_weather_and_looks_up_tables() {
        let env = Environment::from_record(&record("2020-04-01"), Climate::Tropical, Season::Winter);
        assert_eq!(env.season, Season::Spring);
        assert_eq!(env.humidity, 88);
        assert!((env.light - 11.5).abs() < f32::EPSILON);
        assert_eq!(env.wind_direction, 270);
        assert!((env.temperature - 12.5).abs() < f32::EPSILON);
    }

    #[test]
    fn unparseable_date_keeps_previous_season() {
        let env = Environment::from_record(&record("n/a"), Climate::Temperate, Season::Autumn);
        assert_eq!(env.season, Season::Autumn);
        assert_eq!(env.humidity, 49);
    }
}
