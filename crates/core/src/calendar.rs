//! Month grid projection of a [`TodoMap`].
//!
//! The grid always has six Sunday-first weeks so the layout never jumps
//! between months. Leading and trailing cells belong to the adjacent months
//! and still show their items.

use chrono::{Datelike, Days};

use crate::day_key::{DayKey, PeriodKey};
use crate::items::{ItemList, TodoMap};

pub const GRID_CELLS: usize = 42;
pub const WEEKDAY_LABELS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Items per cell before the rest collapse into a "+N more" line.
pub const PREVIEW_ITEMS: usize = 3;
pub const ITEM_CLIP_CHARS: usize = 10;
pub const SINGLE_LINE_CLIP_CHARS: usize = 10;

// A day switches to the single-line preview past either threshold. Both are
// measured in UTF-16 code units, so an astral emoji counts twice.
const LONG_FIRST_ITEM_UNITS: usize = 8;
const LONG_TOTAL_UNITS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellPreview {
    Empty,
    /// Day too wordy for a list: only its first item, clipped.
    Single(String),
    List { items: Vec<String>, more: usize },
}

impl CellPreview {
    pub fn for_items(items: Option<&ItemList>) -> Self {
        let Some(items) = items.filter(|items| !items.is_empty()) else {
            return Self::Empty;
        };
        let first = items.first().unwrap_or_default();
        let is_long = first.encode_utf16().count() >= LONG_FIRST_ITEM_UNITS
            || items.total_utf16_len() >= LONG_TOTAL_UNITS;
        if is_long {
            return Self::Single(clip(first, SINGLE_LINE_CLIP_CHARS));
        }
        Self::List {
            items: items
                .iter()
                .take(PREVIEW_ITEMS)
                .map(|item| clip(item, ITEM_CLIP_CHARS))
                .collect(),
            more: items.len().saturating_sub(PREVIEW_ITEMS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub day: DayKey,
    pub in_month: bool,
    pub preview: CellPreview,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthView {
    pub period: PeriodKey,
    pub cells: Vec<GridCell>,
}

impl MonthView {
    pub fn build(period: PeriodKey, todos: &TodoMap) -> Self {
        let cells = grid_days(period)
            .into_iter()
            .map(|day| GridCell {
                day,
                in_month: period.contains(day),
                preview: CellPreview::for_items(todos.get(&day)),
            })
            .collect();
        Self { period, cells }
    }

    /// `2025 / 11`
    pub fn title(&self) -> String {
        format!("{} / {}", self.period.year(), self.period.month())
    }

    pub fn prev_month_label(&self) -> u32 {
        self.period.prev().month()
    }

    pub fn next_month_label(&self) -> u32 {
        self.period.next().month()
    }

    pub fn weeks(&self) -> std::slice::Chunks<'_, GridCell> {
        self.cells.chunks(WEEKDAY_LABELS.len())
    }
}

/// The 42 days shown for `period`, starting on the Sunday on or before the 1st.
pub fn grid_days(period: PeriodKey) -> Vec<DayKey> {
    let first = period.first_day().date();
    let lead = u64::from(first.weekday().num_days_from_sunday());
    let start = first.checked_sub_days(Days::new(lead)).unwrap_or(first);
    start
        .iter_days()
        .take(GRID_CELLS)
        .map(DayKey::from_date)
        .collect()
}

/// Keeps the first `max` characters of `text`, marking the cut with `…`.
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> DayKey {
        DayKey::parse(s).unwrap()
    }

    #[test]
    fn november_2025_grid_starts_on_sunday_before() {
        let nov = PeriodKey::new(2025, 10).unwrap();
        let days = grid_days(nov);
        assert_eq!(days.len(), GRID_CELLS);
        // 2025-11-01 is a Saturday.
        assert_eq!(days[0].to_string(), "2025-10-26");
        assert_eq!(days[6].to_string(), "2025-11-01");
        assert_eq!(days[41].to_string(), "2025-12-06");
    }

    #[test]
    fn month_starting_on_sunday_has_no_leading_days() {
        // 2026-02-01 is a Sunday.
        let feb = PeriodKey::new(2026, 1).unwrap();
        let view = MonthView::build(feb, &TodoMap::new());
        assert_eq!(view.cells[0].day.to_string(), "2026-02-01");
        assert!(view.cells[0].in_month);
        assert!(!view.cells[28].in_month);
        assert_eq!(view.weeks().count(), 6);
    }

    #[test]
    fn preview_switches_on_item_length() {
        let items = ItemList::parse("Buy milk\nCall mom");
        // "Buy milk" is exactly 8 characters.
        assert_eq!(
            CellPreview::for_items(Some(&items)),
            CellPreview::Single("Buy milk".into())
        );

        let items = ItemList::parse("gym\nmail\nbank\nvet");
        assert_eq!(
            CellPreview::for_items(Some(&items)),
            CellPreview::List {
                items: vec!["gym".into(), "mail".into(), "bank".into()],
                more: 1,
            }
        );
    }

    #[test]
    fn wordy_day_collapses_to_clipped_first_item() {
        let items = ItemList::parse("Renew passport at city hall\nx");
        assert_eq!(
            CellPreview::for_items(Some(&items)),
            CellPreview::Single("Renew pass…".into())
        );

        let items = ItemList::parse("aaaaaaa\nbbbbbbb\ncccccc");
        assert!(matches!(CellPreview::for_items(Some(&items)), CellPreview::Single(_)));
    }

    #[test]
    fn long_thresholds_count_utf16_units() {
        // Four emoji are eight UTF-16 units: long, though only four characters.
        let items = ItemList::parse("🍎🍎🍎🍎");
        assert_eq!(
            CellPreview::for_items(Some(&items)),
            CellPreview::Single("🍎🍎🍎🍎".into())
        );

        // Six BMP characters stay short.
        let items = ItemList::parse("牛乳を買う日");
        assert!(matches!(
            CellPreview::for_items(Some(&items)),
            CellPreview::List { .. }
        ));

        // Ten emoji across items reach the total threshold.
        let items = ItemList::parse("🍎🍎🍎\n🍌🍌🍌\n🍇🍇🍇🍇");
        assert!(matches!(
            CellPreview::for_items(Some(&items)),
            CellPreview::Single(_)
        ));
    }

    #[test]
    fn clip_counts_characters_not_bytes() {
        assert_eq!(clip("牛乳を買う", 10), "牛乳を買う");
        assert_eq!(clip("あいうえおかきくけこさ", 10), "あいうえおかきくけこ…");
    }

    #[test]
    fn view_carries_items_and_labels() {
        let mut todos = TodoMap::new();
        todos.set(day("2025-10-31"), ItemList::parse("halloween"));
        let view = MonthView::build(PeriodKey::new(2025, 10).unwrap(), &todos);

        let cell = view.cells.iter().find(|c| c.day == day("2025-10-31")).unwrap();
        assert!(!cell.in_month);
        assert_eq!(cell.preview, CellPreview::Single("halloween".into()));
        assert_eq!(view.title(), "2025 / 11");
        assert_eq!((view.prev_month_label(), view.next_month_label()), (10, 12));
    }
}
