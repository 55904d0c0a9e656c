use hashbrown::HashMap;

use crate::pipeline::ConfigError;

/// Whitelist of marker identities, and the semantic label for each.
///
/// Built once at startup from two index-aligned lists and never modified.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
	/// (identity, label), in configuration order
	entries: Vec<(i64, String)>,
	/// identity -> index into `entries`
	index: HashMap<i64, usize>,
}

impl TagRegistry {
	/// Pair up `ids[i]` with `labels[i]`.
	///
	/// Fails if the lists differ in length or an identity repeats.
	pub fn new<S: Into<String>>(ids: impl IntoIterator<Item = i64>, labels: impl IntoIterator<Item = S>) -> Result<Self, ConfigError> {
		let ids = ids.into_iter().collect::<Vec<_>>();
		let labels = labels.into_iter().map(Into::into).collect::<Vec<String>>();

		if ids.len() != labels.len() {
			return Err(ConfigError::LengthMismatch { ids: ids.len(), labels: labels.len() });
		}

		let mut registry = Self {
			entries: Vec::with_capacity(ids.len()),
			index: HashMap::with_capacity(ids.len()),
		};
		for (id, label) in ids.into_iter().zip(labels) {
			registry.insert(id, label)?;
		}
		Ok(registry)
	}

	pub(crate) fn insert(&mut self, id: i64, label: String) -> Result<(), ConfigError> {
		if self.index.contains_key(&id) {
			return Err(ConfigError::DuplicateId(id));
		}
		self.index.insert(id, self.entries.len());
		self.entries.push((id, label));
		Ok(())
	}

	/// Label for `id`, or `None` if the marker is not whitelisted
	pub fn lookup(&self, id: i64) -> Option<&str> {
		let idx = *self.index.get(&id)?;
		Some(self.entries[idx].1.as_str())
	}

	pub fn contains(&self, id: i64) -> bool {
		self.index.contains_key(&id)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// (identity, label) pairs in configuration order
	pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> + '_ {
		self.entries.iter().map(|(id, label)| (*id, label.as_str()))
	}
}
