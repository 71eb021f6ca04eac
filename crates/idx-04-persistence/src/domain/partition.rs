//! # Time-Range Partitions
//!
//! Transactions, messages and events are written into key ranges named
//! after the period that contains the block time, e.g. `tx_2023_11`.
//! A partition must be registered before rows are written into it.

use super::keys::Table;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Tables split by block time.
pub const PARTITIONED_TABLES: [Table; 3] = [Table::Tx, Table::Event, Table::Message];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionPeriod {
    #[default]
    Monthly,
    Yearly,
}

/// A registered partition and the time range it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub name: String,
    pub table: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PartitionPeriod {
    /// Partition name for a row of `table` written at `time`.
    pub fn name(&self, table: Table, time: DateTime<Utc>) -> String {
        match self {
            PartitionPeriod::Monthly => {
                format!("{}_{:04}_{:02}", table.as_str(), time.year(), time.month())
            }
            PartitionPeriod::Yearly => format!("{}_{:04}", table.as_str(), time.year()),
        }
    }

    /// The partition of `table` covering `time`.
    pub fn partition(&self, table: Table, time: DateTime<Utc>) -> Partition {
        let (start, end) = self.bounds(time);
        Partition {
            name: self.name(table, time),
            table: table.as_str().to_string(),
            start,
            end,
        }
    }

    fn bounds(&self, time: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let year = time.year();
        let (start, end) = match self {
            PartitionPeriod::Monthly => {
                let month = time.month();
                let (next_year, next_month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                (
                    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0),
                    Utc.with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0),
                )
            }
            PartitionPeriod::Yearly => (
                Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0),
                Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0),
            ),
        };
        // The first day of a month at midnight always exists in UTC.
        (
            start.single().unwrap_or(time),
            end.single().unwrap_or(time),
        )
    }
}
