//! Indexed views over a keyword store.
//!
//! A [`View`] is an ordered list of global descriptor positions plus a name
//! index over that list. The global view of a file holds every position;
//! child views cut out one report step, or any other marker-delimited block.
//!
//! ```text
//! global: SEQNUM INTEHEAD DOUBHEAD PRESSURE | SEQNUM INTEHEAD DOUBHEAD PRESSURE | ...
//!         └──────── block_view("SEQNUM", None, 0) ┘└──── block_view(.., 1) ─────┘
//! ```
//!
//! Views hold positions only. Payloads are loaded through the store and
//! stay owned by it, so dropping a view never frees keyword data.

use std::fmt;

use chrono::NaiveDateTime;

use crate::{
    backend::StreamBackend,
    error::{Error, Result},
    index::NameIndex,
    keyword::{Keyword, KeywordHeader},
    restart::{DOUBHEAD, INTEHEAD, SEQNUM, sim_days_of, sim_time_of},
    store::KeywordStore,
};

/// How a restart step is addressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepSelector {
    /// The n-th block in the file, counting from zero.
    Index(usize),
    /// The block whose `SEQNUM` equals this report step.
    ReportStep(i32),
    /// The block whose `INTEHEAD` date equals this time.
    SimTime(NaiveDateTime),
    /// The block whose `DOUBHEAD` elapsed days equal this value.
    SimDays(f64),
}

impl fmt::Display for StepSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "block index {index}"),
            Self::ReportStep(step) => write!(f, "report step {step}"),
            Self::SimTime(time) => write!(f, "simulation time {time}"),
            Self::SimDays(days) => write!(f, "simulation day {days}"),
        }
    }
}

/// Ordered subset of a store's keywords with a name index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    positions: Vec<usize>,
    names: Vec<String>,
    index: NameIndex,
}

impl View {
    /// Creates an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a view from `(global position, header)` pairs in file order.
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (usize, &'a KeywordHeader)>,
    {
        let mut view = Self::new();
        for (position, header) in headers {
            view.append(position, header.name());
        }
        view.rebuild_index();
        view
    }

    /// View over every keyword the store found.
    pub fn global<B: StreamBackend>(store: &KeywordStore<B>) -> Self {
        Self::from_headers(store.descriptors().iter().map(|d| d.header()).enumerate())
    }

    /// Appends one entry. Call [`rebuild_index`](Self::rebuild_index) when
    /// done appending.
    pub fn append(&mut self, position: usize, name: &str) {
        self.positions.push(position);
        self.names.push(name.to_string());
    }

    /// Rebuilds the name index from the current entries.
    pub fn rebuild_index(&mut self) {
        self.index = NameIndex::build(self.names.iter().map(String::as_str));
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True if the view has no entries.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of occurrences of `name`.
    pub fn count(&self, name: &str) -> usize {
        self.index.count(name)
    }

    /// True if `name` occurs in the view.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Distinct names in first-seen order.
    pub fn distinct_names(&self) -> impl Iterator<Item = &str> {
        self.index.distinct_names()
    }

    /// Global positions in file order.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Name of the entry at view index `index`.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Global position of the `occurrence`-th `name`.
    pub fn nth(&self, name: &str, occurrence: usize) -> Option<usize> {
        self.index.get(name, occurrence).map(|local| self.positions[local])
    }

    /// Loads the `occurrence`-th `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeywordNotFound`] if the keyword does not occur that
    /// often, and any load error from the store.
    pub fn get<'s, B: StreamBackend>(
        &self,
        store: &'s KeywordStore<B>,
        name: &str,
        occurrence: usize,
    ) -> Result<&'s Keyword> {
        let position = self.nth(name, occurrence).ok_or_else(|| Error::KeywordNotFound {
            name: name.to_string(),
            occurrence,
        })?;
        store.get_or_load(position)
    }

    /// Loads the entry at view index `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if `index >= len()`.
    pub fn iget<'s, B: StreamBackend>(
        &self,
        store: &'s KeywordStore<B>,
        index: usize,
    ) -> Result<&'s Keyword> {
        let position = *self.positions.get(index).ok_or_else(|| Error::OutOfBounds {
            name: "<view>".to_string(),
            index,
            len: self.positions.len(),
        })?;
        store.get_or_load(position)
    }

    /// Global position of the first `name` whose payload equals `raw` byte
    /// for byte.
    ///
    /// Candidates are loaded one at a time in occurrence order.
    ///
    /// # Errors
    ///
    /// Returns any load error from the store.
    pub fn find_position_by_value<B: StreamBackend>(
        &self,
        store: &KeywordStore<B>,
        name: &str,
        raw: &[u8],
    ) -> Result<Option<usize>> {
        for &local in self.index.occurrences(name) {
            let position = self.positions[local];
            if store.get_or_load(position)?.equal_data(raw) {
                return Ok(Some(position));
            }
        }
        Ok(None)
    }

    /// Child view for one marker-delimited block.
    ///
    /// The block starts at the `occurrence`-th `start` keyword. It ends
    /// before the next `end` keyword when `end` is given, otherwise before
    /// the next `start` keyword, and at the end of this view if no such
    /// keyword follows.
    pub fn block_view(&self, start: &str, end: Option<&str>, occurrence: usize) -> Option<View> {
        let first = self.index.get(start, occurrence)?;
        let stop = match end {
            Some(end) => self.index.occurrences(end).iter().copied().find(|&i| i > first),
            None => self.index.get(start, occurrence + 1),
        }
        .unwrap_or(self.len());

        let mut child = View::new();
        for local in first..stop {
            child.append(self.positions[local], &self.names[local]);
        }
        child.rebuild_index();
        Some(child)
    }

    /// Keyword that opens a report step in this view.
    pub fn step_marker(&self) -> &'static str {
        if self.contains(SEQNUM) { SEQNUM } else { INTEHEAD }
    }

    /// Number of report step blocks.
    pub fn step_count(&self) -> usize {
        self.count(self.step_marker())
    }

    // Blocks are in increasing time order, so the walk stops at the first
    // key not below the target.
    fn find_block<K, F>(&self, marker: &str, target: K, key: F) -> Result<Option<usize>>
    where
        K: PartialOrd,
        F: Fn(&View) -> Result<K>,
    {
        for occurrence in 0..self.count(marker) {
            let Some(block) = self.block_view(marker, None, occurrence) else { break };
            let value = key(&block)?;
            if value >= target {
                return Ok((value == target).then_some(occurrence));
            }
        }
        Ok(None)
    }

    fn block_time<B: StreamBackend>(store: &KeywordStore<B>, block: &View) -> Result<NaiveDateTime> {
        sim_time_of(block.get(store, INTEHEAD, 0)?)
    }

    fn block_days<B: StreamBackend>(store: &KeywordStore<B>, block: &View) -> Result<f64> {
        sim_days_of(block.get(store, DOUBHEAD, 0)?)
    }

    /// True if some `marker` block carries exactly the date `target`.
    ///
    /// # Errors
    ///
    /// Returns load errors and [`Error::KeywordNotFound`] for a block
    /// without `INTEHEAD`.
    pub fn has_block_matching_date<B: StreamBackend>(
        &self,
        store: &KeywordStore<B>,
        marker: &str,
        target: NaiveDateTime,
    ) -> Result<bool> {
        Ok(self.find_block(marker, target, |b| Self::block_time(store, b))?.is_some())
    }

    /// True if some `marker` block carries exactly `target` elapsed days.
    ///
    /// # Errors
    ///
    /// Returns load errors and [`Error::KeywordNotFound`] for a block
    /// without `DOUBHEAD`.
    pub fn has_block_matching_days<B: StreamBackend>(
        &self,
        store: &KeywordStore<B>,
        marker: &str,
        target: f64,
    ) -> Result<bool> {
        Ok(self.find_block(marker, target, |b| Self::block_days(store, b))?.is_some())
    }

    /// Block index whose date equals `time`.
    ///
    /// # Errors
    ///
    /// See [`has_block_matching_date`](Self::has_block_matching_date).
    pub fn index_for_sim_time<B: StreamBackend>(
        &self,
        store: &KeywordStore<B>,
        time: NaiveDateTime,
    ) -> Result<Option<usize>> {
        self.find_block(self.step_marker(), time, |b| Self::block_time(store, b))
    }

    /// Block index whose elapsed days equal `days`.
    ///
    /// # Errors
    ///
    /// See [`has_block_matching_days`](Self::has_block_matching_days).
    pub fn index_for_sim_days<B: StreamBackend>(
        &self,
        store: &KeywordStore<B>,
        days: f64,
    ) -> Result<Option<usize>> {
        self.find_block(self.step_marker(), days, |b| Self::block_days(store, b))
    }

    /// `SEQNUM` occurrence holding `step`.
    ///
    /// Views without `SEQNUM` carry no step numbers and always yield `None`.
    ///
    /// # Errors
    ///
    /// Returns any load error from the store.
    pub fn index_for_report_step<B: StreamBackend>(
        &self,
        store: &KeywordStore<B>,
        step: i32,
    ) -> Result<Option<usize>> {
        for occurrence in 0..self.count(SEQNUM) {
            if self.get(store, SEQNUM, occurrence)?.get::<i32>(0)? == step {
                return Ok(Some(occurrence));
            }
        }
        Ok(None)
    }

    /// Block index addressed by `selector`, if any.
    ///
    /// # Errors
    ///
    /// Returns any load error from the store.
    pub fn index_for_step<B: StreamBackend>(
        &self,
        store: &KeywordStore<B>,
        selector: StepSelector,
    ) -> Result<Option<usize>> {
        match selector {
            StepSelector::Index(index) => Ok((index < self.step_count()).then_some(index)),
            StepSelector::ReportStep(step) => self.index_for_report_step(store, step),
            StepSelector::SimTime(time) => self.index_for_sim_time(store, time),
            StepSelector::SimDays(days) => self.index_for_sim_days(store, days),
        }
    }

    /// Child view for the report step addressed by `selector`.
    ///
    /// # Errors
    ///
    /// Returns any load error from the store.
    pub fn restart_view<B: StreamBackend>(
        &self,
        store: &KeywordStore<B>,
        selector: StepSelector,
    ) -> Result<Option<View>> {
        let marker = self.step_marker();
        Ok(self
            .index_for_step(store, selector)?
            .and_then(|occurrence| self.block_view(marker, None, occurrence)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use chrono::NaiveDate;

    use super::*;
    use crate::{
        backend::InMemoryBackend,
        fortio::{Endian, FortIo},
        restart::RestartHeader,
    };

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    /// Unified restart file with SEQNUM steps 1, 3 and 5.
    fn unified_store() -> KeywordStore<InMemoryBackend> {
        let mut io = FortIo::new(Cursor::new(Vec::new()), false, Endian::Big);
        for (step, d) in [(1, 2u32), (3, 4), (5, 6)] {
            let header = RestartHeader::builder().report_step(step).sim_time(day(d)).sim_days(f64::from(d)).build();
            Keyword::from_values(SEQNUM, &[step]).unwrap().write_to(&mut io).unwrap();
            header.to_intehead().unwrap().write_to(&mut io).unwrap();
            header.to_doubhead().unwrap().write_to(&mut io).unwrap();
            Keyword::from_values("PRESSURE", &[step as f32; 4]).unwrap().write_to(&mut io).unwrap();
        }
        let bytes = io.into_inner().into_inner();
        KeywordStore::open(InMemoryBackend::new(bytes), false, Endian::Big, false).unwrap()
    }

    #[test]
    fn test_global_view_index() {
        let store = unified_store();
        let view = View::global(&store);
        assert_eq!(view.len(), 12);
        assert_eq!(view.count(SEQNUM), 3);
        assert_eq!(view.nth("PRESSURE", 2), Some(11));
        assert_eq!(view.distinct_names().collect::<Vec<_>>(), vec![SEQNUM, INTEHEAD, DOUBHEAD, "PRESSURE"]);
        assert_eq!(view.step_marker(), SEQNUM);
    }

    #[test]
    fn test_block_view_holds_one_step() {
        let store = unified_store();
        let view = View::global(&store);
        let block = view.block_view(SEQNUM, None, 1).unwrap();
        assert_eq!(block.positions(), &[4, 5, 6, 7]);
        assert_eq!(block.get(&store, SEQNUM, 0).unwrap().get::<i32>(0).unwrap(), 3);
        assert_eq!(block.get(&store, "PRESSURE", 0).unwrap().get::<f32>(0).unwrap(), 3.0);
        assert!(view.block_view(SEQNUM, None, 3).is_none());
    }

    #[test]
    fn test_block_view_with_end_marker() {
        let store = unified_store();
        let view = View::global(&store);
        let block = view.block_view(INTEHEAD, Some("PRESSURE"), 0).unwrap();
        assert_eq!(block.positions(), &[1, 2]);
        // No end marker after the last start: runs to the end of the parent.
        let tail = view.block_view("PRESSURE", Some(INTEHEAD), 2).unwrap();
        assert_eq!(tail.positions(), &[11]);
    }

    #[test]
    fn test_step_lookups() {
        let store = unified_store();
        let view = View::global(&store);
        assert_eq!(view.index_for_report_step(&store, 3).unwrap(), Some(1));
        assert_eq!(view.index_for_report_step(&store, 2).unwrap(), None);
        assert_eq!(view.index_for_sim_time(&store, day(6)).unwrap(), Some(2));
        assert_eq!(view.index_for_sim_time(&store, day(5)).unwrap(), None);
        assert_eq!(view.index_for_sim_days(&store, 4.0).unwrap(), Some(1));
        assert!(view.has_block_matching_date(&store, SEQNUM, day(2)).unwrap());
        assert!(!view.has_block_matching_days(&store, SEQNUM, 100.0).unwrap());
    }

    #[test]
    fn test_restart_view_selectors() {
        let store = unified_store();
        let view = View::global(&store);
        for selector in [
            StepSelector::Index(2),
            StepSelector::ReportStep(5),
            StepSelector::SimTime(day(6)),
            StepSelector::SimDays(6.0),
        ] {
            let block = view.restart_view(&store, selector).unwrap().unwrap();
            assert_eq!(block.positions(), &[8, 9, 10, 11], "{selector}");
        }
        assert!(view.restart_view(&store, StepSelector::Index(3)).unwrap().is_none());
    }

    #[test]
    fn test_find_position_by_value() {
        let store = unified_store();
        let view = View::global(&store);
        let wanted = Keyword::from_values(SEQNUM, &[5i32]).unwrap();
        let found = view.find_position_by_value(&store, SEQNUM, wanted.as_bytes()).unwrap();
        assert_eq!(found, Some(8));
        assert_eq!(found, view.nth(SEQNUM, 2));

        // Child views report global positions too.
        let block = view.block_view(SEQNUM, None, 1).unwrap();
        let three = Keyword::from_values(SEQNUM, &[3i32]).unwrap();
        assert_eq!(block.find_position_by_value(&store, SEQNUM, three.as_bytes()).unwrap(), Some(4));
        let missing = Keyword::from_values(SEQNUM, &[4i32]).unwrap();
        assert_eq!(view.find_position_by_value(&store, SEQNUM, missing.as_bytes()).unwrap(), None);
    }

    #[test]
    fn test_get_and_iget_errors() {
        let store = unified_store();
        let view = View::global(&store);
        assert!(matches!(view.get(&store, "SWAT", 0), Err(Error::KeywordNotFound { .. })));
        assert!(matches!(view.get(&store, SEQNUM, 3), Err(Error::KeywordNotFound { occurrence: 3, .. })));
        assert!(matches!(view.iget(&store, 12), Err(Error::OutOfBounds { index: 12, len: 12, .. })));
        assert_eq!(view.iget(&store, 0).unwrap().name(), SEQNUM);
    }

    #[test]
    fn test_manual_append_and_rebuild() {
        let mut view = View::new();
        view.append(10, "A");
        view.append(11, "B");
        view.append(12, "A");
        assert_eq!(view.count("A"), 0, "index is stale until rebuilt");
        view.rebuild_index();
        assert_eq!(view.nth("A", 1), Some(12));
        let again = {
            let mut v = view.clone();
            v.rebuild_index();
            v
        };
        assert_eq!(again, view);
    }
}
