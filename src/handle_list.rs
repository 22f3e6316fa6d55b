//! Insertion-ordered collection with O(1) removal through handles.
//!
//! Every element added to a [`HandleList`] gets a [`Handle`]. The handle
//! removes exactly that element in constant time, no matter how large the
//! list is, and removing through a stale handle is a no-op. Storage is an
//! arena of slots: each slot carries a generation counter which is bumped on
//! removal, so a handle whose generation no longer matches is simply ignored.
//!
//! Traversal that must tolerate removals between steps uses a detached
//! [`Cursor`], which does not borrow the list:
//!
//! ```rust
//! use mqtt_publish_router::handle_list::HandleList;
//!
//! let mut list = HandleList::new();
//! let a = list.add("a");
//! let b = list.add("b");
//! list.add("c");
//!
//! let mut cursor = list.cursor();
//! let mut seen = Vec::new();
//! while let Some((handle, value)) = cursor.next(&list) {
//! 	seen.push(*value);
//! 	if handle == a {
//! 		list.remove(b);
//! 	}
//! }
//! assert_eq!(seen, ["a", "c"]);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

/// Removal capability for one element of a [`HandleList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
	list: u64,
	index: u32,
	generation: u32,
}

impl fmt::Display for Handle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Handle({}:{}v{})", self.list, self.index, self.generation)
	}
}

/// Slot position plus the generation it had when the link was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
	index: u32,
	generation: u32,
}

#[derive(Debug)]
enum SlotState<T> {
	Occupied {
		value: T,
		prev: Option<u32>,
		next: Option<u32>,
	},
	Vacant {
		/// Live successor at the time of removal, kept for cursors that
		/// still point at this slot.
		successor: Option<Link>,
		next_free: Option<u32>,
	},
}

#[derive(Debug)]
struct Slot<T> {
	generation: u32,
	seq: u64,
	state: SlotState<T>,
}

/// Ordered, removable collection. See the [module docs](self).
pub struct HandleList<T> {
	id: u64,
	slots: Vec<Slot<T>>,
	head: Option<u32>,
	tail: Option<u32>,
	free_head: Option<u32>,
	len: usize,
	next_seq: u64,
}

impl<T> Default for HandleList<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: fmt::Debug> fmt::Debug for HandleList<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter().map(|(_, v)| v)).finish()
	}
}

impl<T> HandleList<T> {
	pub fn new() -> Self {
		Self {
			id: NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed),
			slots: Vec::new(),
			head: None,
			tail: None,
			free_head: None,
			len: 0,
			next_seq: 0,
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Appends `value` and returns the handle that removes it.
	pub fn add(&mut self, value: T) -> Handle {
		let seq = self.next_seq;
		self.next_seq += 1;
		let occupied = SlotState::Occupied {
			value,
			prev: self.tail,
			next: None,
		};

		let index = match self.free_head {
			| Some(index) => {
				let slot = &mut self.slots[index as usize];
				if let SlotState::Vacant { next_free, .. } = slot.state {
					self.free_head = next_free;
				}
				slot.seq = seq;
				slot.state = occupied;
				index
			}
			| None => {
				let index = u32::try_from(self.slots.len())
					.expect("HandleList cannot hold more than u32::MAX slots");
				self.slots.push(Slot {
					generation: 0,
					seq,
					state: occupied,
				});
				index
			}
		};

		match self.tail {
			| Some(tail) => self.set_next(tail, Some(index)),
			| None => self.head = Some(index),
		}
		self.tail = Some(index);
		self.len += 1;

		Handle {
			list: self.id,
			index,
			generation: self.slots[index as usize].generation,
		}
	}

	/// Removes the element behind `handle`.
	///
	/// Returns `None` when the element was already removed or the handle
	/// belongs to another list.
	pub fn remove(&mut self, handle: Handle) -> Option<T> {
		self.live_slot(handle)?;
		let index = handle.index;
		let free_head = self.free_head;
		let slot = &mut self.slots[index as usize];
		slot.generation = slot.generation.wrapping_add(1);
		let state = std::mem::replace(
			&mut slot.state,
			SlotState::Vacant {
				successor: None,
				next_free: free_head,
			},
		);
		let SlotState::Occupied { value, prev, next } = state else {
			unreachable!("live_slot only accepts occupied slots");
		};

		match prev {
			| Some(prev) => self.set_next(prev, next),
			| None => self.head = next,
		}
		match next {
			| Some(next) => self.set_prev(next, prev),
			| None => self.tail = prev,
		}

		let successor = next.map(|index| self.link(index));
		if let SlotState::Vacant {
			successor: slot_successor,
			..
		} = &mut self.slots[index as usize].state
		{
			*slot_successor = successor;
		}
		self.free_head = Some(index);
		self.len -= 1;
		Some(value)
	}

	pub fn contains(&self, handle: Handle) -> bool {
		self.live_slot(handle).is_some()
	}

	pub fn get(&self, handle: Handle) -> Option<&T> {
		match &self.live_slot(handle)?.state {
			| SlotState::Occupied { value, .. } => Some(value),
			| SlotState::Vacant { .. } => None,
		}
	}

	/// Borrowing iterator over live elements in insertion order.
	pub fn iter(&self) -> Iter<'_, T> {
		Iter {
			list: self,
			next: self.head,
			remaining: self.len,
		}
	}

	/// Detached cursor positioned before the first element.
	pub fn cursor(&self) -> Cursor {
		Cursor {
			list: self.id,
			next: self.head.map(|index| self.link(index)),
			last_seq: None,
		}
	}

	fn live_slot(&self, handle: Handle) -> Option<&Slot<T>> {
		if handle.list != self.id {
			return None;
		}
		let slot = self.slots.get(handle.index as usize)?;
		match slot.state {
			| SlotState::Occupied { .. }
				if slot.generation == handle.generation =>
			{
				Some(slot)
			}
			| _ => None,
		}
	}

	fn link(&self, index: u32) -> Link {
		Link {
			index,
			generation: self.slots[index as usize].generation,
		}
	}

	fn set_next(&mut self, index: u32, value: Option<u32>) {
		if let SlotState::Occupied { next, .. } =
			&mut self.slots[index as usize].state
		{
			*next = value;
		}
	}

	fn set_prev(&mut self, index: u32, value: Option<u32>) {
		if let SlotState::Occupied { prev, .. } =
			&mut self.slots[index as usize].state
		{
			*prev = value;
		}
	}

	/// First live element inserted after `seq`, found by walking from head.
	fn first_after(&self, seq: Option<u64>) -> Option<Link> {
		let mut current = self.head;
		while let Some(index) = current {
			let slot = &self.slots[index as usize];
			if seq.is_none_or(|seq| slot.seq > seq) {
				return Some(self.link(index));
			}
			current = match slot.state {
				| SlotState::Occupied { next, .. } => next,
				| SlotState::Vacant { .. } => None,
			};
		}
		None
	}
}

/// Borrowing iterator returned by [`HandleList::iter`].
pub struct Iter<'a, T> {
	list: &'a HandleList<T>,
	next: Option<u32>,
	remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
	type Item = (Handle, &'a T);

	fn next(&mut self) -> Option<Self::Item> {
		let index = self.next?;
		let slot = &self.list.slots[index as usize];
		let SlotState::Occupied { value, next, .. } = &slot.state else {
			self.next = None;
			return None;
		};
		self.next = *next;
		self.remaining -= 1;
		let handle = Handle {
			list: self.list.id,
			index,
			generation: slot.generation,
		};
		Some((handle, value))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl<'a, T> IntoIterator for &'a HandleList<T> {
	type Item = (Handle, &'a T);
	type IntoIter = Iter<'a, T>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Traversal position that survives removals from the list between steps.
#[derive(Debug, Clone)]
pub struct Cursor {
	list: u64,
	next: Option<Link>,
	last_seq: Option<u64>,
}

impl Cursor {
	/// Yields the next live element, skipping everything removed so far.
	///
	/// Returns `None` at the end, or when `list` is not the list the cursor
	/// was created from.
	pub fn next<'a, T>(
		&mut self,
		list: &'a HandleList<T>,
	) -> Option<(Handle, &'a T)> {
		if self.list != list.id {
			return None;
		}
		loop {
			let link = self.next?;
			let slot = &list.slots[link.index as usize];
			match &slot.state {
				| SlotState::Occupied { value, next, .. }
					if slot.generation == link.generation =>
				{
					self.last_seq = Some(slot.seq);
					self.next = next.map(|index| list.link(index));
					let handle = Handle {
						list: list.id,
						index: link.index,
						generation: slot.generation,
					};
					return Some((handle, value));
				}
				| SlotState::Vacant { successor, .. }
					if slot.generation == link.generation.wrapping_add(1) =>
				{
					self.next = *successor;
				}
				// slot was reused since the link was taken
				| _ => self.next = list.first_after(self.last_seq),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn values<T: Clone>(list: &HandleList<T>) -> Vec<T> {
		list.iter().map(|(_, v)| v.clone()).collect()
	}

	#[test]
	fn test_add_keeps_insertion_order() {
		let mut list = HandleList::new();
		list.add(1);
		list.add(2);
		list.add(3);

		assert_eq!(values(&list), vec![1, 2, 3]);
		assert_eq!(list.len(), 3);
		assert!(!list.is_empty());
	}

	#[test]
	fn test_remove_is_idempotent() {
		let mut list = HandleList::new();
		let a = list.add("a");
		let b = list.add("b");

		assert_eq!(list.remove(a), Some("a"));
		assert_eq!(list.remove(a), None);
		assert!(!list.contains(a));
		assert!(list.contains(b));
		assert_eq!(values(&list), vec!["b"]);
	}

	#[test]
	fn test_remove_head_middle_and_tail() {
		let mut list = HandleList::new();
		let handles: Vec<_> = (0 .. 5).map(|i| list.add(i)).collect();

		list.remove(handles[0]);
		list.remove(handles[2]);
		list.remove(handles[4]);
		assert_eq!(values(&list), vec![1, 3]);

		list.remove(handles[1]);
		list.remove(handles[3]);
		assert!(list.is_empty());
		assert_eq!(list.iter().count(), 0);
	}

	#[test]
	fn test_stale_handle_does_not_remove_reused_slot() {
		let mut list = HandleList::new();
		let old = list.add("old");
		list.remove(old);
		let new = list.add("new");

		assert_eq!(list.remove(old), None);
		assert_eq!(list.get(new), Some(&"new"));
	}

	#[test]
	fn test_handle_from_other_list_is_ignored() {
		let mut first = HandleList::new();
		let mut second = HandleList::new();
		let handle = first.add(1);
		second.add(2);

		assert_eq!(second.remove(handle), None);
		assert_eq!(values(&second), vec![2]);
		assert_eq!(first.get(handle), Some(&1));
	}

	#[test]
	fn test_reused_slot_appends_at_tail() {
		let mut list = HandleList::new();
		let a = list.add('a');
		list.add('b');
		list.remove(a);
		list.add('c');

		assert_eq!(values(&list), vec!['b', 'c']);
	}

	#[test]
	fn test_cursor_skips_elements_removed_during_traversal() {
		let mut list = HandleList::new();
		let handles: Vec<_> = (0 .. 5).map(|i| list.add(i)).collect();

		let mut cursor = list.cursor();
		let mut seen = Vec::new();
		while let Some((_, value)) = cursor.next(&list) {
			let value = *value;
			seen.push(value);
			if value == 1 {
				list.remove(handles[2]);
				list.remove(handles[3]);
			}
		}
		assert_eq!(seen, vec![0, 1, 4]);
	}

	#[test]
	fn test_cursor_survives_removal_of_current_element() {
		let mut list = HandleList::new();
		for i in 0 .. 4 {
			list.add(i);
		}

		let mut cursor = list.cursor();
		let mut seen = Vec::new();
		while let Some((handle, value)) = cursor.next(&list) {
			seen.push(*value);
			list.remove(handle);
		}
		assert_eq!(seen, vec![0, 1, 2, 3]);
		assert!(list.is_empty());
	}

	#[test]
	fn test_cursor_resyncs_after_slot_reuse() {
		let mut list = HandleList::new();
		let a = list.add("a");
		let b = list.add("b");
		list.add("c");

		let mut cursor = list.cursor();
		assert_eq!(cursor.next(&list).map(|(_, v)| *v), Some("a"));
		// cursor now points at b; free b and immediately reuse its slot
		list.remove(b);
		list.add("d");
		list.remove(a);

		let rest: Vec<_> =
			std::iter::from_fn(|| cursor.next(&list).map(|(_, v)| *v))
				.collect();
		assert_eq!(rest, vec!["c", "d"]);
	}

	#[test]
	fn test_cursor_is_restartable() {
		let mut list = HandleList::new();
		list.add(1);
		list.add(2);

		for _ in 0 .. 2 {
			let mut cursor = list.cursor();
			let mut seen = Vec::new();
			while let Some((_, v)) = cursor.next(&list) {
				seen.push(*v);
			}
			assert_eq!(seen, vec![1, 2]);
		}
	}

	#[test]
	fn test_cursor_on_foreign_list_yields_nothing() {
		let mut first = HandleList::new();
		first.add(1);
		let second: HandleList<i32> = HandleList::new();

		let mut cursor = second.cursor();
		assert!(cursor.next(&first).is_none());
	}
}
