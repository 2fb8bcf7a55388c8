//! Daily weather records and the sources that supply them.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// One day of observed weather.
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherRecord {
    /// ISO `YYYY-MM-DD` label. Also used to match snapshot dates.
    pub date: String,
    /// Average temperature in C.
    pub temperature: f32,
    /// Precipitation in mm.
    pub precipitation: f32,
    /// Wind direction in degrees.
    pub wind_direction: i32,
    /// Wind speed in km/h.
    pub wind_speed: f32,
}

/// Sequential supplier of daily weather. `None` means the data ran out.
pub trait WeatherSource: Send {
    fn next_record(&mut self) -> Option<WeatherRecord>;
}

/// In-memory source serving a fixed list of records in order.
#[derive(Clone, Debug, Default)]
pub struct ScriptedWeather {
    records: VecDeque<WeatherRecord>,
}

impl ScriptedWeather {
    pub fn new(records: impl IntoIterator<Item = WeatherRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl WeatherSource for ScriptedWeather {
    fn next_record(&mut self) -> Option<WeatherRecord> {
        self.records.pop_front()
    }
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("failed to read weather data: {0}")]
    Io(#[from] std::io::Error),
    #[error("weather data has no header row")]
    MissingHeader,
    #[error("weather header has no `date` column")]
    MissingDateColumn,
}

#[derive(Clone, Copy, Debug)]
struct Columns {
    date: usize,
    temperature: Option<usize>,
    precipitation: Option<usize>,
    wind_direction: Option<usize>,
    wind_speed: Option<usize>,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, WeatherError> {
        let names: Vec<&str> = header.split(',').map(|s| s.trim().trim_matches('"')).collect();
        let find = |name: &str| names.iter().position(|n| n.eq_ignore_ascii_case(name));
        Ok(Self {
            date: find("date").ok_or(WeatherError::MissingDateColumn)?,
            temperature: find("tavg"),
            precipitation: find("prcp"),
            wind_direction: find("wdir"),
            wind_speed: find("wspd"),
        })
    }
}

/// Reads Meteostat-style CSV exports (`date,tavg,...,prcp,...,wdir,wspd,...`).
///
/// Columns are located by header name and extra columns are ignored. A column
/// that is missing, or a cell that is empty, carries the previous day's value
/// forward. Rows with unparseable numbers are skipped.
pub struct CsvWeatherSource<R> {
    lines: Lines<R>,
    columns: Columns,
    line_number: usize,
    last: WeatherRecord,
}

impl CsvWeatherSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WeatherError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: BufRead> CsvWeatherSource<R> {
    pub fn from_reader(reader: R) -> Result<Self, WeatherError> {
        let mut lines = reader.lines();
        let header = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(WeatherError::MissingHeader),
            }
        };
        let columns = Columns::from_header(header.trim_start_matches('\u{feff}'))?;
        Ok(Self {
            lines,
            columns,
            line_number: 1,
            last: WeatherRecord {
                date: String::new(),
                temperature: 0.0,
                precipitation: 0.0,
                wind_direction: 0,
                wind_speed: 0.0,
            },
        })
    }

    fn parse_row(&self, line: &str) -> Result<WeatherRecord, &'static str> {
        let fields: Vec<&str> = line.split(',').map(|s| s.trim().trim_matches('"')).collect();
        let date = fields
            .get(self.columns.date)
            .filter(|d| !d.is_empty())
            .ok_or("date")?
            .to_string();
        Ok(WeatherRecord {
            date,
            temperature: carry(&fields, self.columns.temperature, self.last.temperature)
                .map_err(|_| "tavg")?,
            precipitation: carry(&fields, self.columns.precipitation, self.last.precipitation)
                .map_err(|_| "prcp")?,
            wind_direction: carry::<f32>(
                &fields,
                self.columns.wind_direction,
                self.last.wind_direction as f32,
            )
            .map(|deg| deg.round() as i32)
            .map_err(|_| "wdir")?,
            wind_speed: carry(&fields, self.columns.wind_speed, self.last.wind_speed)
                .map_err(|_| "wspd")?,
        })
    }
}

fn carry<T: std::str::FromStr>(fields: &[&str], column: Option<usize>, previous: T) -> Result<T, T::Err> {
    match column.and_then(|c| fields.get(c)).filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse(),
        None => Ok(previous),
    }
}

impl<R: BufRead + Send> WeatherSource for CsvWeatherSource<R> {
    fn next_record(&mut self) -> Option<WeatherRecord> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    warn!(line = self.line_number + 1, %err, "weather read failed; treating as end of data");
                    return None;
                }
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            match self.parse_row(&line) {
                Ok(record) => {
                    self.last = record.clone();
                    return Some(record);
                }
                Err(column) => {
                    warn!(line = self.line_number, column, "skipping malformed weather row");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn source(text: &str) -> CsvWeatherSource<Cursor<Vec<u8>>> {
        CsvWeatherSource::from_reader(Cursor::new(text.as_bytes().to_vec()))
            .expect("header should parse")
    }

    #[test]
    fn reads_columns_by_name_and_ignores_extras() {
        let mut src = source(
            "date,tavg,tmin,tmax,prcp,snow,wdir,wspd,wpgt\n\
             2020-03-01,6.1,1.0,9.0,0.4,,225,11.5,30\n",
        );
        let r = src.next_record().unwrap();
        assert_eq!(r.date, "2020-03-01");
        assert!((r.temperature - 6.1).abs() < 1e-6);
        assert!((r.precipitation - 0.4).abs() < 1e-6);
        assert_eq!(r.wind_direction, 225);
        assert!((r.wind_speed - 11.5).abs() < 1e-6);
        assert!(src.next_record().is_none());
    }

    #[test]
    fn empty_cells_and_missing_columns_carry_previous_values() {
        let mut src = source("date,tavg,prcp\n2020-01-01,3.0,2.0\n2020-01-02,,0.5\n");
        let first = src.next_record().unwrap();
        assert_eq!(first.wind_direction, 0);
        let second = src.next_record().unwrap();
        assert!((second.temperature - 3.0).abs() < 1e-6);
        assert!((second.precipitation - 0.5).abs() < 1e-6);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let mut src = source("date,tavg\n2020-01-01,warm\n2020-01-02,4.0\n");
        let r = src.next_record().unwrap();
        assert_eq!(r.date, "2020-01-02");
    }

    #[test]
    fn header_without_date_is_rejected() {
        let err = CsvWeatherSource::from_reader(Cursor::new(b"day,tavg\n".to_vec()))
            .err()
            .unwrap();
        assert!(matches!(err, WeatherError::MissingDateColumn));
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = CsvWeatherSource::from_reader(Cursor::new(Vec::new())).err().unwrap();
        assert!(matches!(err, WeatherError::MissingHeader));
    }

    #[test]
    fn opens_files_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,tavg,prcp,wdir,wspd").unwrap();
        writeln!(file, "2019-06-10,18.2,0.0,90,5.0").unwrap();
        let mut src = CsvWeatherSource::open(file.path()).unwrap();
        assert_eq!(src.next_record().unwrap().wind_direction, 90);
    }

    #[test]
    fn scripted_weather_drains_in_order() {
        let mut src = ScriptedWeather::new((1..=2).map(|d| WeatherRecord {
            date: format!("2020-01-0{d}"),
            temperature: 10.0,
            precipitation: 1.0,
            wind_direction: 0,
            wind_speed: 0.0,
        }));
        assert_eq!(src.remaining(), 2);
        assert_eq!(src.next_record().unwrap().date, "2020-01-01");
        assert_eq!(src.next_record().unwrap().date, "2020-01-02");
        assert!(src.next_record().is_none());
    }
}
