//! Memoized `find` results for one repository.
//!
//! # Invariants
//! - Slots are numbered in reservation order; a slot is reserved before the
//!   remote select and filled once materialization finishes.
//! - Only filled slots answer lookups. A released slot never short-circuits a
//!   later identical query.
//! - `clear` drops every slot; outstanding slot numbers become stale and are
//!   ignored on fill.
//! - A reserved slot never answers as in-flight. Repositories resolve finds
//!   under `&mut self`, so no second lookup can run while a select is
//!   pending; the reservation only fixes the slot's order.

use crate::model::params::Params;
use crate::model::record::RecordRef;

/// Result of one resolved `find` query.
#[derive(Debug, Clone)]
pub enum FindResult {
    One(Option<RecordRef>),
    Many(Vec<RecordRef>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheQuery {
    params: Params,
    one: bool,
}

#[derive(Debug)]
struct CacheSlot {
    query: CacheQuery,
    result: Option<FindResult>,
}

#[derive(Debug, Default)]
pub(crate) struct FindCache {
    slots: Vec<Option<CacheSlot>>,
    generation: u64,
}

/// Handle to a reserved slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotTicket {
    index: usize,
    generation: u64,
}

impl FindCache {
    pub(crate) fn lookup(&self, params: &Params, one: bool) -> Option<FindResult> {
        self.slots.iter().flatten().find_map(|slot| {
            if slot.query.one == one && slot.query.params == *params {
                slot.result.clone()
            } else {
                None
            }
        })
    }

    pub(crate) fn reserve(&mut self, params: &Params, one: bool) -> SlotTicket {
        self.slots.push(Some(CacheSlot {
            query: CacheQuery {
                params: params.clone(),
                one,
            },
            result: None,
        }));
        SlotTicket {
            index: self.slots.len() - 1,
            generation: self.generation,
        }
    }

    pub(crate) fn fill(&mut self, ticket: SlotTicket, result: FindResult) {
        if let Some(slot) = self.live_slot(ticket) {
            slot.result = Some(result);
        }
    }

    pub(crate) fn release(&mut self, ticket: SlotTicket) {
        if self.live_slot(ticket).is_some() {
            self.slots[ticket.index] = None;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.generation += 1;
    }

    /// Number of filled slots.
    pub(crate) fn len(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.result.is_some())
            .count()
    }

    fn live_slot(&mut self, ticket: SlotTicket) -> Option<&mut CacheSlot> {
        if ticket.generation != self.generation {
            return None;
        }
        self.slots.get_mut(ticket.index).and_then(Option::as_mut)
    }
}
