//! Unit roster CSV import.
//!
//! Expected headers: `unit_number,area,rent,deposit,bedrooms`. `deposit` and `bedrooms` may be
//! blank or absent. Every row passes the same validation as a JSON bulk request.

use std::collections::HashSet;
use std::io::Read;

use serde::Deserialize;
use validator::Validate;

use super::domain::NewUnit;

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("malformed roster csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("roster line {line}: {message}")]
    InvalidRow { line: u64, message: String },
    #[error("roster line {line}: unit number '{unit_number}' appears more than once")]
    DuplicateNumber { line: u64, unit_number: String },
    #[error("roster contains no units")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    unit_number: String,
    area: f64,
    rent: u32,
    #[serde(default)]
    deposit: Option<u32>,
    #[serde(default)]
    bedrooms: Option<u8>,
}

impl From<RosterRow> for NewUnit {
    fn from(row: RosterRow) -> Self {
        NewUnit {
            unit_number: row.unit_number,
            area: row.area,
            rent: row.rent,
            deposit: row.deposit.unwrap_or(0),
            bedrooms: row.bedrooms,
        }
    }
}

/// Parses and validates a roster. Fails on the first bad row; line numbers count the header.
pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<NewUnit>, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut units = Vec::new();
    let mut seen = HashSet::new();

    for (index, record) in csv_reader.deserialize::<RosterRow>().enumerate() {
        let line = index as u64 + 2;
        let unit: NewUnit = record?.into();

        unit.validate().map_err(|errors| RosterError::InvalidRow {
            line,
            message: errors.to_string(),
        })?;

        if !seen.insert(unit.number_key()) {
            return Err(RosterError::DuplicateNumber {
                line,
                unit_number: unit.unit_number,
            });
        }

        units.push(unit);
    }

    if units.is_empty() {
        return Err(RosterError::Empty);
    }

    tracing::debug!(units = units.len(), "parsed unit roster");
    Ok(units)
}
