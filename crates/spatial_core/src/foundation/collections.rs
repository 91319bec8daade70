//! Specialized collection types
//!
//! Entities live in a generation-checked slot map; every subsystem keeps its
//! own dense registry of records that point back into it. Removing a record
//! from a dense registry is a swap-and-pop, and the record that gets moved
//! into the hole must have its owner's back-reference index rewritten.

pub use slotmap::{new_key_type, SlotMap};

/// A record stored in a dense, swap-and-pop registry
pub trait DenseRecord {
    /// Whether the record should be dropped at the end of the frame
    fn is_dead(&self) -> bool;
}

/// Remove every dead record from `records` by swap-and-pop.
///
/// `relink` is called for each surviving record that changed position, with
/// the record and its new index, so the caller can write the index back into
/// whatever owns the record. Removed records are returned in removal order.
///
/// Registry order is otherwise stable: only the moved tail element changes
/// position.
pub fn swap_remove_dead<T, F>(records: &mut Vec<T>, mut relink: F) -> Vec<T>
where
    T: DenseRecord,
    F: FnMut(&T, usize),
{
    let mut removed = Vec::new();
    let mut index = 0;

    while index < records.len() {
        if records[index].is_dead() {
            let dead = records.swap_remove(index);
            removed.push(dead);
            // The moved record may itself be dead; it is handled on the next pass.
            if index < records.len() && !records[index].is_dead() {
                relink(&records[index], index);
            }
        } else {
            index += 1;
        }
    }

    removed
}
