//! Process-wide reservation set over the external cell inventory
//!
//! A cell is reserved the moment it is selected and stays invisible to
//! other selections until its reservation expires, is released, or is
//! converted into a "consumed" hold after broadcast.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::FundingError;
use crate::chain::{CellIndexer, LiveCell, OutPoint, Script, SearchOrder};

/// Held out-points and when each hold lapses
#[derive(Debug, Default)]
pub struct CellReservations {
    held: Mutex<HashMap<OutPoint, Instant>>,
}

impl CellReservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, out_point: &OutPoint) -> bool {
        self.held
            .lock()
            .get(out_point)
            .is_some_and(|until| Instant::now() < *until)
    }

    pub fn held_count(&self) -> usize {
        let now = Instant::now();
        self.held.lock().values().filter(|until| now < **until).count()
    }

    /// Drop lapsed holds
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut held = self.held.lock();
        let before = held.len();
        held.retain(|_, until| now < *until);
        before - held.len()
    }
}

/// Cells picked for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub cells: Vec<LiveCell>,
    pub total: u64,
}

impl Selection {
    pub fn out_points(&self) -> Vec<OutPoint> {
        self.cells.iter().map(|c| c.out_point.clone()).collect()
    }
}

/// Walk candidates in order; stop on an exact fit or once the change floor is covered
fn pick(
    candidates: impl IntoIterator<Item = LiveCell>,
    need: u64,
    floor: u64,
) -> Result<Selection, FundingError> {
    let mut cells = Vec::new();
    let mut total = 0u64;
    let target = need.saturating_add(floor);

    for cell in candidates {
        if cell.capacity == 0 {
            continue;
        }
        total = total.saturating_add(cell.capacity);
        cells.push(cell);
        if total == need || total >= target {
            return Ok(Selection { cells, total });
        }
    }

    if total < need {
        Err(FundingError::InsufficientBalance {
            need,
            available: total,
        })
    } else {
        Err(FundingError::NotEnoughChange {
            need,
            floor,
            selected: total,
        })
    }
}

#[derive(Clone)]
pub struct CellInventory {
    indexer: Arc<dyn CellIndexer>,
    reservations: Arc<CellReservations>,
}

impl CellInventory {
    pub fn new(indexer: Arc<dyn CellIndexer>, reservations: Arc<CellReservations>) -> Self {
        Self {
            indexer,
            reservations,
        }
    }

    pub fn reservations(&self) -> &Arc<CellReservations> {
        &self.reservations
    }

    /// Select and reserve cells covering `need` with at least `floor` change
    /// (or exactly `need`). Nothing is reserved on failure.
    pub async fn select(
        &self,
        lock: &Script,
        need: u64,
        floor: u64,
        order: SearchOrder,
        hold: Duration,
    ) -> Result<Selection, FundingError> {
        let live = self.indexer.live_cells(lock, order).await?;

        // Filter, pick and reserve under one lock so concurrent selections
        // against the same lock script cannot overlap.
        let mut held = self.reservations.held.lock();
        let now = Instant::now();
        let candidates = live
            .into_iter()
            .filter(|c| held.get(&c.out_point).is_none_or(|until| now >= *until));
        let selection = pick(candidates, need, floor)?;

        let until = now + hold;
        for cell in &selection.cells {
            held.insert(cell.out_point.clone(), until);
        }
        drop(held);

        tracing::debug!(
            need,
            floor,
            total = selection.total,
            cells = selection.cells.len(),
            "funding cells reserved"
        );
        Ok(selection)
    }

    /// Would `select` succeed right now? Reserves nothing.
    pub async fn probe(
        &self,
        lock: &Script,
        need: u64,
        floor: u64,
        order: SearchOrder,
    ) -> Result<u64, FundingError> {
        let live = self.indexer.live_cells(lock, order).await?;
        let candidates = live
            .into_iter()
            .filter(|c| !self.reservations.is_held(&c.out_point));
        Ok(pick(candidates, need, floor)?.total)
    }

    /// Keep broadcast inputs hidden until the indexer drops them
    pub fn mark_consumed(&self, out_points: &[OutPoint], ttl: Duration) {
        let until = Instant::now() + ttl;
        let mut held = self.reservations.held.lock();
        for op in out_points {
            held.insert(op.clone(), until);
        }
    }

    pub fn release(&self, out_points: &[OutPoint]) {
        let mut held = self.reservations.held.lock();
        for op in out_points {
            held.remove(op);
        }
    }
}
