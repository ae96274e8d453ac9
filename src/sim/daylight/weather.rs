use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

const DAYS_IN_MONTH: [u16; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Number of comma separated fields in an EPW data row.
const EPW_FIELDS: usize = 35;

/// Date and time of one hourly weather record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourlyRecord {
    /// Month (1-12).
    pub month: u8,
    /// Day of month (1-31).
    pub day: u8,
    /// Hour (1-24), the hour ending at this time.
    pub hour: u8,
}

impl HourlyRecord {
    /// Checks the date against the calendar of a non-leap year.
    pub fn new(month: u8, day: u8, hour: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            anyhow::bail!("Month {month} out of range 1-12");
        }
        let days = DAYS_IN_MONTH[(month - 1) as usize];
        if day == 0 || day as u16 > days {
            anyhow::bail!("Day {day} out of range 1-{days} for month {month}");
        }
        if !(1..=24).contains(&hour) {
            anyhow::bail!("Hour {hour} out of range 1-24");
        }
        Ok(Self { month, day, hour })
    }

    /// Hour of the year, 0 for the first hour of January 1st.
    pub fn hoy(&self) -> f64 {
        let month_idx = (self.month as usize).saturating_sub(1).min(11);
        let days_before: u16 = DAYS_IN_MONTH[..month_idx].iter().sum();
        let day_of_year = days_before as f64 + self.day as f64;
        (day_of_year - 1.0) * 24.0 + self.hour as f64 - 1.0
    }
}

/// Hourly records of an EPW weather file.
#[derive(Debug, Clone)]
pub struct WeatherData {
    pub records: Vec<HourlyRecord>,
}

impl WeatherData {
    /// Parses EPW (EnergyPlus Weather) file content.
    ///
    /// EPW format: 8 header lines followed by hourly data rows.
    /// Each data row has 35 fields, comma-separated. Only the date columns
    /// are read; sky generation converts the file itself.
    pub fn from_epw(content: &str) -> Result<Self> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() < 9 {
            anyhow::bail!("EPW file too short: expected at least 9 lines");
        }
        if !lines[0].starts_with("LOCATION") {
            anyhow::bail!("Missing LOCATION header");
        }

        let mut records = Vec::new();
        for (i, line) in lines.iter().enumerate().skip(8) {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < EPW_FIELDS {
                warn!(
                    "skipping EPW line {}: expected {EPW_FIELDS} fields, found {}",
                    i + 1,
                    fields.len()
                );
                continue;
            }

            let parse = |idx: usize, what: &str| -> Result<u8> {
                fields[idx]
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid {what} at line {}", i + 1))
            };
            let record = HourlyRecord::new(parse(1, "month")?, parse(2, "day")?, parse(3, "hour")?)
                .with_context(|| format!("Invalid date at line {}", i + 1))?;
            records.push(record);
        }

        if records.is_empty() {
            anyhow::bail!("EPW file has no hourly records");
        }

        Ok(Self { records })
    }

    /// Reads and parses an EPW file from disk.
    pub fn read_epw(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read weather file: {}", path.display()))?;
        Self::from_epw(&content)
            .with_context(|| format!("Failed to parse weather file: {}", path.display()))
    }

    /// Hours of the year covered by the records, in file order.
    pub fn hoys(&self) -> Vec<f64> {
        self.records.iter().map(HourlyRecord::hoy).collect()
    }
}

/// Converts an hour of the year into `(month, day, decimal hour)`.
///
/// The decimal hour is the middle of the hour, as expected in `.wea` files.
pub fn date_from_hoy(hoy: f64) -> (u8, u8, f64) {
    let hoy = hoy.clamp(0.0, 8759.0);
    let mut day_of_year = (hoy / 24.0).floor() as u16;
    let hour = hoy - day_of_year as f64 * 24.0 + 0.5;
    for (month_idx, days) in DAYS_IN_MONTH.iter().enumerate() {
        if day_of_year < *days {
            return ((month_idx + 1) as u8, (day_of_year + 1) as u8, hour);
        }
        day_of_year -= days;
    }
    (12, 31, hour)
}

/// EPW content with one data row per `(month, day, hour)`.
#[cfg(test)]
pub(crate) fn minimal_epw(hours: &[(u8, u8, u8)]) -> String {
    let mut content = String::from(
        "LOCATION,TestCity,State,Country,Source,123456,52.0,13.0,1.0,50.0\n\
         DESIGN CONDITIONS,0\n\
         TYPICAL/EXTREME PERIODS,0\n\
         GROUND TEMPERATURES,0\n\
         HOLIDAYS/DAYLIGHT SAVINGS,No,0,0,0\n\
         COMMENTS 1,test\n\
         COMMENTS 2,test\n\
         DATA PERIODS,1,1,Data,Sunday,1/1,12/31\n",
    );
    for (month, day, hour) in hours {
        content.push_str(&format!(
            "2020,{month},{day},{hour},60,?,5.0,2.0,80,101325,0,0,0,0,350,120,0,0,0,0,180,3.0,0,0,0,0,0,0,0,0,0,0,0,0,0\n"
        ));
    }
    content
}
