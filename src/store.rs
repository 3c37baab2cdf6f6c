use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use crate::error::Error;
use crate::types::Booking;

/// Keyed booking storage with per-record atomic updates.
pub trait BookingStore: Send + Sync {
    /// Fails when the id is already taken.
    fn insert(&self, booking: Booking) -> Result<(), Error>;

    /// Insert or replace.
    fn put(&self, booking: Booking);

    fn get(&self, id: &str) -> Result<Booking, Error>;

    /// Drops the record and its owner index entry.
    fn remove(&self, id: &str) -> Option<Booking>;

    /// Bookings owned by `owner_id`, oldest first.
    fn list_by_owner(&self, owner_id: &str) -> Vec<Booking>;

    /// Runs `f` against a copy of the record while holding that record's lock
    /// and commits the copy only when `f` succeeds.
    fn update<R, F>(&self, id: &str, f: F) -> Result<R, Error>
    where
        Self: Sized,
        F: FnOnce(&mut Booking) -> Result<R, Error>;
}

#[derive(Default)]
pub struct InMemoryBookingStore {
    records: DashMap<String, Arc<Mutex<Booking>>>,
    owners: DashMap<String, Vec<String>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // The map guard is dropped before the record lock is taken so a slow
    // update never blocks a shard.
    fn cell(&self, id: &str) -> Result<Arc<Mutex<Booking>>, Error> {
        self.records
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotFound { id: id.to_string() })
    }

    fn index_owner(&self, owner_id: &str, id: &str) {
        let mut ids = self.owners.entry(owner_id.to_string()).or_default();
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
}

impl BookingStore for InMemoryBookingStore {
    fn insert(&self, booking: Booking) -> Result<(), Error> {
        let id = booking.id.clone();
        let owner_id = booking.owner_id.clone();
        match self.records.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(Error::validation(format!("booking id {id} already exists")));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(booking)));
            }
        }
        self.index_owner(&owner_id, &id);
        Ok(())
    }

    fn put(&self, booking: Booking) {
        let id = booking.id.clone();
        let owner_id = booking.owner_id.clone();
        let existing = self.records.get(&id).map(|entry| Arc::clone(entry.value()));
        match existing {
            Some(cell) => *cell.lock() = booking,
            None => {
                self.records
                    .entry(id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(booking)));
            }
        }
        self.index_owner(&owner_id, &id);
    }

    fn get(&self, id: &str) -> Result<Booking, Error> {
        let cell = self.cell(id)?;
        let booking = cell.lock().clone();
        Ok(booking)
    }

    fn remove(&self, id: &str) -> Option<Booking> {
        let (_, cell) = self.records.remove(id)?;
        let booking = cell.lock().clone();
        if let Some(mut ids) = self.owners.get_mut(&booking.owner_id) {
            ids.retain(|existing| existing != id);
        }
        Some(booking)
    }

    fn list_by_owner(&self, owner_id: &str) -> Vec<Booking> {
        let ids = self
            .owners
            .get(owner_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        let mut bookings: Vec<Booking> = ids.iter().filter_map(|id| self.get(id).ok()).collect();
        bookings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        bookings
    }

    fn update<R, F>(&self, id: &str, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Booking) -> Result<R, Error>,
    {
        let cell = self.cell(id)?;
        let mut guard = cell.lock();
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        *guard = draft;
        Ok(out)
    }
}
