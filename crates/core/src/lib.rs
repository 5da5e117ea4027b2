pub mod calendar;
pub mod day_key;
pub mod error;
pub mod identity;
pub mod ids;
pub mod items;

pub use calendar::{CellPreview, GridCell, MonthView};
pub use day_key::{DayKey, PeriodKey};
pub use error::CoreError;
pub use identity::{Anonymous, SessionProvider, SharedSession};
pub use ids::*;
pub use items::{ItemList, TodoMap};
