use std::collections::{BTreeMap, HashMap};
use std::fmt;

use arcstr::Substr;

use super::topic_filter::{FilterSegment, TopicFilter};
use super::topic_name::TopicName;

/// Node in the topic matching tree that represents a part of the filter path.
///
/// Lookup cost follows the number of trie paths a topic can take (exact
/// child, `+` child, `#` data per level), not the number of stored filters.
pub struct TopicMatcherNode<T> {
	/// Data for filters ending exactly at this node
	exact_match_data: Option<T>,

	/// Children nodes for exact matches of next segment
	exact_children: HashMap<Substr, TopicMatcherNode<T>>,

	/// Node for '+' wildcard match (single segment)
	single_level_wildcard_node: Option<Box<TopicMatcherNode<T>>>,

	/// Data for '#' wildcard match (this level and everything below)
	multi_level_wildcard_data: Option<T>,
}

/// Emptiness check for data stored in trie nodes.
pub trait Len {
	fn len(&self) -> usize;
	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<K, V> Len for BTreeMap<K, V> {
	fn len(&self) -> usize {
		self.len()
	}
	fn is_empty(&self) -> bool {
		self.is_empty()
	}
}

impl<K, V> Len for HashMap<K, V> {
	fn len(&self) -> usize {
		self.len()
	}
	fn is_empty(&self) -> bool {
		self.is_empty()
	}
}

impl<T> Len for Vec<T> {
	fn len(&self) -> usize {
		self.len()
	}
	fn is_empty(&self) -> bool {
		self.is_empty()
	}
}

impl<T: Default + Len> Default for TopicMatcherNode<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Default + Len> TopicMatcherNode<T> {
	/// Creates a new empty topic matcher node
	pub fn new() -> Self {
		Self {
			exact_match_data: None,
			exact_children: HashMap::new(),
			single_level_wildcard_node: None,
			multi_level_wildcard_data: None,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.exact_match_data.as_ref().is_none_or(T::is_empty)
			&& self.exact_children.is_empty()
			&& self.single_level_wildcard_node.is_none()
			&& self
				.multi_level_wildcard_data
				.as_ref()
				.is_none_or(T::is_empty)
	}

	/// Finds or creates the data entry for the given filter
	pub fn get_or_create(&mut self, filter: &TopicFilter) -> &mut T {
		let mut current_node = self;

		for segment in filter.segments() {
			match segment {
				| FilterSegment::Literal(s) => {
					current_node = current_node
						.exact_children
						.entry(s.clone())
						.or_default()
				}
				| FilterSegment::SingleLevel => {
					current_node = current_node
						.single_level_wildcard_node
						.get_or_insert_with(|| Box::new(TopicMatcherNode::new()))
				}
				| FilterSegment::MultiLevel => {
					// Hash wildcard must be the last segment, so we can return immediately
					return current_node
						.multi_level_wildcard_data
						.get_or_insert_with(T::default);
				}
			}
		}
		current_node.exact_match_data.get_or_insert_with(T::default)
	}

	/// Finds the data entry for the given filter without creating it
	pub fn get(&self, filter: &TopicFilter) -> Option<&T> {
		let mut current_node = self;
		for segment in filter.segments() {
			match segment {
				| FilterSegment::Literal(s) => {
					current_node = current_node.exact_children.get(s)?
				}
				| FilterSegment::SingleLevel => {
					current_node =
						current_node.single_level_wildcard_node.as_deref()?
				}
				| FilterSegment::MultiLevel => {
					return current_node.multi_level_wildcard_data.as_ref();
				}
			}
		}
		current_node.exact_match_data.as_ref()
	}


	/// Applies `f` to the data stored for `filter_path` and prunes branches
	/// left empty afterwards.
	///
	/// `f` is not called when nothing is stored for the path. Returns `true`
	/// when this node became empty and can be removed by its parent.
	pub fn update_node<F>(&mut self, filter_path: &[FilterSegment], f: F) -> bool
	where F: FnOnce(&mut T) {
		// '#' ends the path: its data lives on the node before it
		let (node_path, multi_level) = match filter_path
			.iter()
			.position(|s| matches!(s, FilterSegment::MultiLevel))
		{
			| Some(pos) => (&filter_path[..pos], true),
			| None => (filter_path, false),
		};

		let Some(node) = self.descend_mut(node_path) else {
			return false;
		};
		let slot = if multi_level {
			&mut node.multi_level_wildcard_data
		} else {
			&mut node.exact_match_data
		};
		let Some(data) = slot.as_mut() else {
			return false;
		};
		f(data);
		if !data.is_empty() {
			return false;
		}
		*slot = None;

		self.prune(node_path);
		self.is_empty()
	}

	fn descend_mut(&mut self, path: &[FilterSegment]) -> Option<&mut Self> {
		let mut node = self;
		for segment in path {
			node = match segment {
				| FilterSegment::Literal(s) => node.exact_children.get_mut(s)?,
				| FilterSegment::SingleLevel => {
					node.single_level_wildcard_node.as_deref_mut()?
				}
				| FilterSegment::MultiLevel => return None,
			};
		}
		Some(node)
	}

	/// Whether the node holds nothing but the one child on the pruned path.
	fn holds_only_path_child(&self) -> bool {
		self.exact_match_data.as_ref().is_none_or(T::is_empty)
			&& self
				.multi_level_wildcard_data
				.as_ref()
				.is_none_or(T::is_empty)
			&& self.exact_children.len()
				+ usize::from(self.single_level_wildcard_node.is_some())
				== 1
	}

	/// Cuts the topmost branch of `path` that holds no data any more.
	fn prune(&mut self, path: &[FilterSegment]) {
		let mut chain = Vec::with_capacity(path.len() + 1);
		let mut node: &Self = self;
		chain.push(node);
		for segment in path {
			node = match segment {
				| FilterSegment::Literal(s) => match node.exact_children.get(s) {
					| Some(child) => child,
					| None => return,
				},
				| FilterSegment::SingleLevel => {
					match node.single_level_wildcard_node.as_deref() {
						| Some(child) => child,
						| None => return,
					}
				}
				| FilterSegment::MultiLevel => return,
			};
			chain.push(node);
		}
		if path.is_empty() || !node.is_empty() {
			return;
		}

		// chain[cut] is the highest node that can go; its parent keeps living
		let mut cut = path.len();
		while cut > 1 && chain[cut - 1].holds_only_path_child() {
			cut -= 1;
		}
		let Some(parent) = self.descend_mut(&path[..cut - 1]) else {
			return;
		};
		match &path[cut - 1] {
			| FilterSegment::Literal(s) => {
				parent.exact_children.remove(s);
			}
			| FilterSegment::SingleLevel => {
				parent.single_level_wildcard_node = None;
			}
			| FilterSegment::MultiLevel => {}
		}
	}

	/// Collects all data whose filter matches `topic[depth..]`, starting at
	/// this node.
	///
	/// Order: exact child subtree, `+` subtree, then `#` data of the level.
	fn collect_matching<'a>(
		&'a self,
		topic: &[Substr],
		depth: usize,
		matching_data: &mut Vec<&'a T>,
	) {
		let mut stack = vec![Visit::Node(self, depth)];
		while let Some(visit) = stack.pop() {
			let (node, depth) = match visit {
				| Visit::Node(node, depth) => (node, depth),
				| Visit::Data(data) => {
					matching_data.push(data);
					continue;
				}
			};
			let Some(segment) = topic.get(depth) else {
				matching_data.extend(node.exact_match_data.iter());
				// '#' also matches the parent level itself
				matching_data.extend(node.multi_level_wildcard_data.iter());
				continue;
			};
			if let Some(data) = &node.multi_level_wildcard_data {
				stack.push(Visit::Data(data));
			}
			if let Some(plus_node) = node.single_level_wildcard_node.as_deref() {
				stack.push(Visit::Node(plus_node, depth + 1));
			}
			if let Some(child) = node.exact_children.get(segment) {
				stack.push(Visit::Node(child, depth + 1));
			}
		}
	}

	/// Finds all data entries whose filter matches the given topic.
	///
	/// Wildcards at the root never match topics starting with `$`.
	pub fn find_by_topic<'a>(&'a self, topic: &TopicName) -> Vec<&'a T> {
		let mut matching = Vec::new();
		let segments = topic.segments();
		match segments.first() {
			| Some(first) if topic.is_system() => {
				if let Some(child) = self.exact_children.get(first) {
					child.collect_matching(segments, 1, &mut matching);
				}
			}
			| _ => self.collect_matching(segments, 0, &mut matching),
		}
		matching
	}

	/// Visits every data entry stored in the tree
	pub fn for_each<'a, F>(&'a self, f: &mut F)
	where F: FnMut(&'a T) {
		let mut stack = vec![self];
		while let Some(node) = stack.pop() {
			if let Some(data) = &node.exact_match_data {
				f(data);
			}
			if let Some(data) = &node.multi_level_wildcard_data {
				f(data);
			}
			stack.extend(node.single_level_wildcard_node.as_deref());
			stack.extend(node.exact_children.values());
		}
	}
}

/// Pending work of the matching walk.
enum Visit<'a, T> {
	Node(&'a TopicMatcherNode<T>, usize),
	Data(&'a T),
}

impl<T> Drop for TopicMatcherNode<T> {
	// Flattens the tree so deep filters do not drop recursively.
	fn drop(&mut self) {
		let mut pending: Vec<TopicMatcherNode<T>> =
			self.exact_children.drain().map(|(_, child)| child).collect();
		pending.extend(self.single_level_wildcard_node.take().map(|node| *node));
		while let Some(mut node) = pending.pop() {
			pending.extend(node.exact_children.drain().map(|(_, child)| child));
			pending.extend(node.single_level_wildcard_node.take().map(|node| *node));
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for TopicMatcherNode<T> {
	// Shallow: children are listed by key only.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TopicMatcherNode")
			.field("exact_match_data", &self.exact_match_data)
			.field("exact_children", &self.exact_children.keys())
			.field(
				"single_level_wildcard",
				&self.single_level_wildcard_node.is_some(),
			)
			.field("multi_level_wildcard_data", &self.multi_level_wildcard_data)
			.finish()
	}
}
