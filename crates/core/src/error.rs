use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid day key: {0}")]
    InvalidDayKey(String),

    #[error("invalid period: year {year}, month {month0} (zero-based)")]
    InvalidPeriod { year: i32, month0: u32 },

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}
