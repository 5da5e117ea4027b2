use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::day_key::{DayKey, PeriodKey};

/// Ordered, trimmed, non-blank lines for one day.
///
/// Every constructor goes through the same normalization, so text parsed from
/// the editor, from a remote row and from a persisted snapshot all agree.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ItemList(Vec<String>);

impl ItemList {
    /// Splits free-form text on line breaks, trims each line, drops blanks.
    pub fn parse(raw: &str) -> Self {
        Self::from_lines(raw.split('\n'))
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            lines
                .into_iter()
                .map(|line| line.as_ref().trim().to_string())
                .filter(|line| !line.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// UTF-16 length of all items concatenated, ignoring separators.
    pub fn total_utf16_len(&self) -> usize {
        self.0.iter().map(|line| line.encode_utf16().count()).sum()
    }

    /// The text stored remotely and shown in the editor.
    pub fn join(&self) -> String {
        self.0.join("\n")
    }
}

impl From<Vec<String>> for ItemList {
    fn from(lines: Vec<String>) -> Self {
        Self::from_lines(lines)
    }
}

impl From<ItemList> for Vec<String> {
    fn from(list: ItemList) -> Self {
        list.0
    }
}

impl fmt::Debug for ItemList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.0).finish()
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Day → items. Never holds an empty list.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<DayKey, ItemList>", into = "BTreeMap<DayKey, ItemList>")]
pub struct TodoMap(BTreeMap<DayKey, ItemList>);

impl TodoMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, day: &DayKey) -> Option<&ItemList> {
        self.0.get(day)
    }

    /// Sets the items for `day`; an empty list removes the day instead.
    /// Returns the previous items.
    pub fn set(&mut self, day: DayKey, items: ItemList) -> Option<ItemList> {
        if items.is_empty() {
            self.0.remove(&day)
        } else {
            self.0.insert(day, items)
        }
    }

    pub fn remove(&mut self, day: &DayKey) -> Option<ItemList> {
        self.0.remove(day)
    }

    pub fn contains(&self, day: &DayKey) -> bool {
        self.0.contains_key(day)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DayKey, &ItemList)> {
        self.0.iter()
    }

    pub fn days_in(&self, period: PeriodKey) -> impl Iterator<Item = (&DayKey, &ItemList)> {
        let (from, to) = period.day_range();
        self.0.range(from..to)
    }

    /// Drops every day of `period` and installs the days of `fresh` that fall
    /// inside it. Days outside `period` are left as they are. Returns the number
    /// of days installed.
    pub fn replace_period(&mut self, period: PeriodKey, fresh: TodoMap) -> usize {
        self.0.retain(|day, _| !period.contains(*day));
        let mut installed = 0;
        for (day, items) in fresh.0 {
            if period.contains(day) {
                self.0.insert(day, items);
                installed += 1;
            }
        }
        installed
    }
}

impl From<BTreeMap<DayKey, ItemList>> for TodoMap {
    fn from(mut days: BTreeMap<DayKey, ItemList>) -> Self {
        days.retain(|_, items| !items.is_empty());
        Self(days)
    }
}

impl From<TodoMap> for BTreeMap<DayKey, ItemList> {
    fn from(map: TodoMap) -> Self {
        map.0
    }
}

/// Empty lists are skipped, not treated as deletions of an earlier entry.
impl FromIterator<(DayKey, ItemList)> for TodoMap {
    fn from_iter<T: IntoIterator<Item = (DayKey, ItemList)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .filter(|(_, items)| !items.is_empty())
                .collect(),
        )
    }
}

impl fmt::Debug for TodoMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> DayKey {
        DayKey::parse(s).unwrap()
    }

    #[test]
    fn parse_trims_and_drops_blank_lines() {
        let items = ItemList::parse("  Buy milk \n\n\t\nCall mom\r\n");
        assert_eq!(items.as_slice(), ["Buy milk", "Call mom"]);
        assert_eq!(items.join(), "Buy milk\nCall mom");
    }

    #[test]
    fn blank_text_is_empty() {
        assert!(ItemList::parse("").is_empty());
        assert!(ItemList::parse("   \n\n").is_empty());
    }

    #[test]
    fn joined_text_parses_back_to_the_same_items() {
        let items = ItemList::parse("a\n b \nc");
        assert_eq!(ItemList::parse(&items.join()), items);
    }

    #[test]
    fn set_with_empty_list_removes_day() {
        let mut map = TodoMap::new();
        map.set(day("2025-11-06"), ItemList::parse("x"));
        assert!(map.contains(&day("2025-11-06")));
        map.set(day("2025-11-06"), ItemList::default());
        assert!(map.is_empty());
    }

    #[test]
    fn replace_period_leaves_other_months_alone() {
        let mut map = TodoMap::new();
        map.set(day("2025-10-31"), ItemList::parse("october"));
        map.set(day("2025-11-03"), ItemList::parse("stale"));
        map.set(day("2025-12-01"), ItemList::parse("december"));

        let fresh: TodoMap = [
            (day("2025-11-06"), ItemList::parse("fresh")),
            (day("2025-12-02"), ItemList::parse("outside")),
        ]
        .into_iter()
        .collect();

        let installed = map.replace_period(PeriodKey::new(2025, 10).unwrap(), fresh);
        assert_eq!(installed, 1);
        assert!(map.contains(&day("2025-10-31")));
        assert!(!map.contains(&day("2025-11-03")));
        assert!(map.contains(&day("2025-11-06")));
        assert!(map.contains(&day("2025-12-01")));
        assert!(!map.contains(&day("2025-12-02")));
    }

    #[test]
    fn decoding_normalizes_snapshot_content() {
        let mut raw: BTreeMap<String, Vec<String>> = BTreeMap::new();
        raw.insert("2025-11-06".into(), vec![" Buy milk ".into(), "".into()]);
        raw.insert("2025-11-07".into(), vec!["   ".into()]);
        let bytes = rmp_serde::to_vec(&raw).unwrap();

        let map: TodoMap = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&day("2025-11-06")).unwrap().as_slice(), ["Buy milk"]);
    }

    #[test]
    fn collecting_skips_empty_lists_without_dropping_earlier_days() {
        let map: TodoMap = [
            (day("2025-11-06"), ItemList::parse("Buy milk")),
            (day("2025-11-06"), ItemList::parse("  \n")),
            (day("2025-11-07"), ItemList::default()),
        ]
        .into_iter()
        .collect();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&day("2025-11-06")).unwrap().as_slice(), ["Buy milk"]);
    }

    #[test]
    fn days_in_period() {
        let mut map = TodoMap::new();
        map.set(day("2025-11-01"), ItemList::parse("a"));
        map.set(day("2025-11-30"), ItemList::parse("b"));
        map.set(day("2025-12-01"), ItemList::parse("c"));
        let nov: Vec<_> = map
            .days_in(PeriodKey::new(2025, 10).unwrap())
            .map(|(d, _)| d.to_string())
            .collect();
        assert_eq!(nov, ["2025-11-01", "2025-11-30"]);
    }
}
