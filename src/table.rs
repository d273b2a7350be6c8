//! ProbeTable: the open-addressed slot array at the bottom of the crate.
//!
//! All entries live directly in one contiguous array. Collisions are
//! resolved by linear probing with wraparound; deletions leave a tombstone
//! in place so probe chains that pass through the deleted slot stay intact;
//! a resize rebuilds the table at twice the capacity and is the only point
//! where tombstones are reclaimed.
//!
//! Invariants maintained across every operation:
//! - `size + tombstones <= capacity`, and an insertion grows the table
//!   before occupancy would reach the 0.75 load threshold.
//! - For any live key `k` with home index `h = hash(k) % capacity`, the
//!   forward walk from `h` reaches `k` before reaching any never-written
//!   slot. Only a never-written slot terminates a walk; tombstones do not.

use log::debug;

use crate::error::{Result, StoreError};

/// Reserved key marking a deleted slot. Writing it through [`ProbeTable::set`]
/// is rejected with [`StoreError::InvalidParam`], so it can never collide
/// with a real entry.
pub const TOMBSTONE_KEY: i32 = i32::MIN;

const DEFAULT_CAPACITY: usize = 16;
const GROWTH_FACTOR: usize = 2;
const LOAD_FACTOR_THRESHOLD: f64 = 0.75;

/// One slot of the table. Three states, distinguished without extra space:
/// never written (`occupied == false`), tombstone (`occupied` with the
/// reserved key), or live (`occupied` with any other key, value present).
#[derive(Debug)]
struct Slot {
    key: i32,
    value: Option<String>,
    occupied: bool,
}

impl Slot {
    fn empty() -> Self {
        Slot {
            key: 0,
            value: None,
            occupied: false,
        }
    }

    fn is_tombstone(&self) -> bool {
        self.occupied && self.key == TOMBSTONE_KEY
    }

    fn is_live(&self) -> bool {
        self.occupied && self.key != TOMBSTONE_KEY
    }
}

/// FNV-1a over the four native-order bytes of the key.
///
/// Deterministic across runs and processes: no per-process seed. Not a
/// cryptographic hash; it only has to spread small integer keys well.
fn hash_key(key: i32) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for byte in key.to_ne_bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// Open-addressed hash table mapping `i32` keys to owned `String` values.
///
/// Single-threaded by design: exclusive mutation is enforced by `&mut self`,
/// and there is no internal locking to pretend otherwise. Independent tables
/// share nothing.
pub struct ProbeTable {
    slots: Vec<Slot>,
    size: usize,
    tombstones: usize,
}

impl ProbeTable {
    /// Creates a table with `initial_capacity` slots; `0` selects the
    /// built-in default of 16. Fails only when the slot array cannot be
    /// allocated.
    pub fn with_capacity(initial_capacity: usize) -> Result<Self> {
        let capacity = if initial_capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            initial_capacity
        };

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| StoreError::Memory)?;
        slots.resize_with(capacity, Slot::empty);

        Ok(Self {
            slots,
            size: 0,
            tombstones: 0,
        })
    }

    /// Number of live entries. Tombstones and never-written slots are
    /// excluded. O(1).
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Total number of slots in the array.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of tombstone slots currently awaiting reclamation.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Resolves `key` to a slot index by linear probing.
    ///
    /// Lookup mode returns the live slot holding `key`, or `None` when an
    /// empty slot (or a full unsuccessful wrap) proves the key absent.
    /// Insertion mode returns, in order of preference: the live slot holding
    /// `key`, the first tombstone seen on the walk, or the terminating empty
    /// slot. A full wrap without any of those yields `None`.
    fn find_slot(&self, key: i32, for_insertion: bool) -> Option<usize> {
        let capacity = self.slots.len();
        let mut index = hash_key(key) as usize % capacity;
        let mut first_tombstone = None;

        for _ in 0..capacity {
            let slot = &self.slots[index];

            if !slot.occupied {
                // A never-written slot terminates the walk: the key cannot
                // be stored further along this chain.
                return if for_insertion {
                    Some(first_tombstone.unwrap_or(index))
                } else {
                    None
                };
            }

            if slot.is_tombstone() {
                if for_insertion && first_tombstone.is_none() {
                    first_tombstone = Some(index);
                }
            } else if slot.key == key {
                return Some(index);
            }

            index = (index + 1) % capacity;
        }

        // Wrapped the whole table without hitting an empty slot. The load
        // threshold keeps this from happening in practice.
        if for_insertion {
            first_tombstone
        } else {
            None
        }
    }

    fn insertion_would_cross_threshold(&self) -> bool {
        let occupancy = (self.size + self.tombstones + 1) as f64;
        occupancy / self.slots.len() as f64 >= LOAD_FACTOR_THRESHOLD
    }

    /// Inserts or updates a key-value pair, returning the previous value
    /// when the key was already live.
    ///
    /// Rejects the reserved tombstone key with
    /// [`StoreError::InvalidParam`]. Grows the table first whenever this
    /// insertion would bring occupancy (live plus tombstones) to the load
    /// threshold; on a failed growth the table is left untouched.
    pub fn set(&mut self, key: i32, value: impl Into<String>) -> Result<Option<String>> {
        if key == TOMBSTONE_KEY {
            return Err(StoreError::InvalidParam);
        }

        if self.insertion_would_cross_threshold() {
            self.grow()?;
        }

        let index = self.find_slot(key, true).ok_or(StoreError::Memory)?;

        if self.slots[index].is_live() {
            // Update in place; size and tombstone counters are unchanged.
            return Ok(self.slots[index].value.replace(value.into()));
        }

        if self.slots[index].is_tombstone() {
            self.tombstones -= 1;
        }
        let slot = &mut self.slots[index];
        slot.key = key;
        slot.value = Some(value.into());
        slot.occupied = true;
        self.size += 1;
        Ok(None)
    }

    /// Returns the value stored under `key`, or [`StoreError::KeyNotFound`].
    /// Read-only: never mutates occupancy or counters.
    pub fn get(&self, key: i32) -> Result<&str> {
        if key == TOMBSTONE_KEY {
            return Err(StoreError::InvalidParam);
        }

        let index = self.find_slot(key, false).ok_or(StoreError::KeyNotFound)?;
        self.slots[index]
            .value
            .as_deref()
            .ok_or(StoreError::KeyNotFound)
    }

    pub fn contains_key(&self, key: i32) -> bool {
        key != TOMBSTONE_KEY && self.find_slot(key, false).is_some()
    }

    /// Removes `key`, returning its owned value.
    ///
    /// The slot becomes a tombstone: it keeps `occupied` set so probe
    /// chains for keys inserted after it remain reachable, and is only
    /// reclaimed by the next resize (or reused by a later insertion that
    /// probes through it).
    pub fn delete(&mut self, key: i32) -> Result<String> {
        if key == TOMBSTONE_KEY {
            return Err(StoreError::InvalidParam);
        }

        let index = self.find_slot(key, false).ok_or(StoreError::KeyNotFound)?;
        let slot = &mut self.slots[index];
        let value = slot.value.take().ok_or(StoreError::KeyNotFound)?;
        slot.key = TOMBSTONE_KEY;
        self.size -= 1;
        self.tombstones += 1;
        Ok(value)
    }

    /// Drops every stored value and resets all slots to never-written,
    /// keeping the current allocation.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::empty();
        }
        self.size = 0;
        self.tombstones = 0;
    }

    /// Rebuilds the table at twice the capacity.
    ///
    /// Copy-and-swap: the fresh array is allocated up front, so a failed
    /// allocation leaves the table exactly as it was. Once the allocation
    /// holds, moving the live entries over cannot fail, and the swap drops
    /// every tombstone along with the old array.
    fn grow(&mut self) -> Result<()> {
        let old_capacity = self.slots.len();
        let new_capacity = old_capacity.saturating_mul(GROWTH_FACTOR);

        let mut fresh = Vec::new();
        fresh
            .try_reserve_exact(new_capacity)
            .map_err(|_| StoreError::Memory)?;
        fresh.resize_with(new_capacity, Slot::empty);

        let mut moved = 0;
        for slot in &mut self.slots {
            if slot.is_live() {
                if let Some(value) = slot.value.take() {
                    place_rehashed(&mut fresh, slot.key, value);
                    moved += 1;
                }
            }
        }

        self.slots = fresh;
        self.size = moved;
        self.tombstones = 0;
        debug!("resized table {old_capacity} -> {new_capacity} slots ({moved} live entries)");
        Ok(())
    }

    /// Forward-only cursor over live entries in slot-array order. Holding
    /// it borrows the table, so mutation during iteration is rejected at
    /// compile time.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    /// Every live key is reachable from its home index before any
    /// never-written slot.
    #[cfg(test)]
    pub(crate) fn probe_chains_intact(&self) -> bool {
        let capacity = self.slots.len();
        self.slots.iter().filter(|s| s.is_live()).all(|slot| {
            let mut index = hash_key(slot.key) as usize % capacity;
            for _ in 0..capacity {
                let probe = &self.slots[index];
                if !probe.occupied {
                    return false;
                }
                if probe.is_live() && probe.key == slot.key {
                    return true;
                }
                index = (index + 1) % capacity;
            }
            false
        })
    }

    /// `size`/`tombstones` agree with the slot array.
    #[cfg(test)]
    pub(crate) fn counters_consistent(&self) -> bool {
        let live = self.slots.iter().filter(|s| s.is_live()).count();
        let dead = self.slots.iter().filter(|s| s.is_tombstone()).count();
        live == self.size
            && dead == self.tombstones
            && self.size + self.tombstones <= self.slots.len()
    }
}

impl std::fmt::Debug for ProbeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Places one live entry into a fresh slot array during a resize. The array
/// always has spare never-written slots (live entries stay below the load
/// threshold of the old, smaller array), so the walk terminates at one.
fn place_rehashed(slots: &mut [Slot], key: i32, value: String) {
    let capacity = slots.len();
    let mut index = hash_key(key) as usize % capacity;
    while slots[index].occupied {
        index = (index + 1) % capacity;
    }
    slots[index] = Slot {
        key,
        value: Some(value),
        occupied: true,
    };
}

/// Iterator over live entries of a [`ProbeTable`], in slot-array order.
pub struct Iter<'a> {
    slots: std::slice::Iter<'a, Slot>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (i32, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if slot.is_live() {
                if let Some(value) = slot.value.as_deref() {
                    return Some((slot.key, value));
                }
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a ProbeTable {
    type Item = (i32, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
