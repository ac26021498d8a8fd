// ---------------------------------------------------------------------------
// Annotation store interface + in-memory reference store
// ---------------------------------------------------------------------------
//
// `AnnotationStore` and `Filterable` are the primitives the correction overlay
// wraps. `MemoryStore` is a plain ordered in-memory implementation: duplicate
// inserts fail, deleting a missing record is a logged no-op, and every
// mutation is recorded as a `StoreChange` for listeners to drain.
// ---------------------------------------------------------------------------

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::RevisionsError;
use crate::model::Annotation;

// ---------------------------------------------------------------------------
// Origin / references / changes
// ---------------------------------------------------------------------------

/// Who caused a mutation. Informational only: it never decides whether a
/// mutation is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
	#[default]
	Local,
	Remote,
}

/// An annotation passed either by id or as the full record.
#[derive(Debug, Clone)]
pub enum AnnotationRef {
	Id(String),
	Record(Annotation),
}

impl AnnotationRef {
	pub fn id(&self) -> &str {
		match self {
			Self::Id(id) => id,
			Self::Record(a) => &a.id,
		}
	}
}

impl From<&str> for AnnotationRef {
	fn from(id: &str) -> Self {
		Self::Id(id.to_string())
	}
}

impl From<String> for AnnotationRef {
	fn from(id: String) -> Self {
		Self::Id(id)
	}
}

impl From<Annotation> for AnnotationRef {
	fn from(annotation: Annotation) -> Self {
		Self::Record(annotation)
	}
}

/// One applied mutation, as delivered to store listeners.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreChange {
	pub origin: Origin,
	pub created: Vec<Annotation>,
	pub deleted: Vec<Annotation>,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Record-level primitives of an annotation store.
pub trait AnnotationStore {
	/// Fails with [`RevisionsError::AlreadyExists`] if the id is taken.
	fn add_annotation(&mut self, annotation: Annotation, origin: Origin)
		-> Result<(), RevisionsError>;

	/// With `replace`, the store is emptied first. Fails without applying
	/// anything if any id is already taken.
	fn bulk_add_annotations(
		&mut self,
		annotations: Vec<Annotation>,
		replace: bool,
		origin: Origin,
	) -> Result<(), RevisionsError>;

	fn delete_annotation(
		&mut self,
		target: AnnotationRef,
		origin: Origin,
	) -> Result<(), RevisionsError>;

	fn bulk_delete_annotations(
		&mut self,
		targets: Vec<AnnotationRef>,
		origin: Origin,
	) -> Result<(), RevisionsError>;

	fn get_annotation(&self, id: &str) -> Option<&Annotation>;

	/// Every record in insertion order, regardless of any filter.
	fn all(&self) -> Vec<&Annotation>;

	/// Take the changes applied since the last call.
	fn drain_changes(&mut self) -> Vec<StoreChange>;
}

/// Visibility predicate. Returns true to keep a record visible.
#[derive(Clone)]
pub struct Filter(Arc<dyn Fn(&Annotation) -> bool + Send + Sync>);

impl Filter {
	pub fn new(predicate: impl Fn(&Annotation) -> bool + Send + Sync + 'static) -> Self {
		Self(Arc::new(predicate))
	}

	pub fn matches(&self, annotation: &Annotation) -> bool {
		(self.0)(annotation)
	}
}

impl fmt::Debug for Filter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Filter(..)")
	}
}

/// Store-wide visibility filtering.
pub trait Filterable {
	fn set_filter(&mut self, filter: Option<Filter>) -> Result<(), RevisionsError>;

	fn filter(&self) -> Option<&Filter>;

	/// Records that pass the current filter.
	fn visible(&self) -> Vec<&Annotation>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
	annotations: Vec<Annotation>,
	filter: Option<Filter>,
	pending_changes: Vec<StoreChange>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.annotations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.annotations.is_empty()
	}

	fn position(&self, id: &str) -> Option<usize> {
		self.annotations.iter().position(|a| a.id == id)
	}

	fn record_change(&mut self, origin: Origin, created: Vec<Annotation>, deleted: Vec<Annotation>) {
		if created.is_empty() && deleted.is_empty() {
			return;
		}
		self.pending_changes.push(StoreChange {
			origin,
			created,
			deleted,
		});
	}
}

impl AnnotationStore for MemoryStore {
	fn add_annotation(
		&mut self,
		annotation: Annotation,
		origin: Origin,
	) -> Result<(), RevisionsError> {
		if self.position(&annotation.id).is_some() {
			return Err(RevisionsError::AlreadyExists(annotation.id));
		}
		self.annotations.push(annotation.clone());
		self.record_change(origin, vec![annotation], Vec::new());
		Ok(())
	}

	fn bulk_add_annotations(
		&mut self,
		annotations: Vec<Annotation>,
		replace: bool,
		origin: Origin,
	) -> Result<(), RevisionsError> {
		let mut seen = HashSet::new();
		for a in &annotations {
			let taken = !replace && self.position(&a.id).is_some();
			if taken || !seen.insert(a.id.as_str()) {
				return Err(RevisionsError::AlreadyExists(a.id.clone()));
			}
		}

		let deleted = if replace {
			std::mem::take(&mut self.annotations)
		} else {
			Vec::new()
		};
		self.annotations.extend(annotations.iter().cloned());
		self.record_change(origin, annotations, deleted);
		Ok(())
	}

	fn delete_annotation(
		&mut self,
		target: AnnotationRef,
		origin: Origin,
	) -> Result<(), RevisionsError> {
		match self.position(target.id()) {
			Some(idx) => {
				let removed = self.annotations.remove(idx);
				self.record_change(origin, Vec::new(), vec![removed]);
			}
			None => tracing::warn!("Attempt to delete missing annotation: {}", target.id()),
		}
		Ok(())
	}

	fn bulk_delete_annotations(
		&mut self,
		targets: Vec<AnnotationRef>,
		origin: Origin,
	) -> Result<(), RevisionsError> {
		let ids: HashSet<&str> = targets.iter().map(AnnotationRef::id).collect();
		let (deleted, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.annotations)
			.into_iter()
			.partition(|a| ids.contains(a.id.as_str()));
		self.annotations = kept;

		if deleted.len() < ids.len() {
			tracing::debug!(
				"Bulk delete skipped {} missing annotation(s)",
				ids.len() - deleted.len()
			);
		}
		self.record_change(origin, Vec::new(), deleted);
		Ok(())
	}

	fn get_annotation(&self, id: &str) -> Option<&Annotation> {
		self.annotations.iter().find(|a| a.id == id)
	}

	fn all(&self) -> Vec<&Annotation> {
		self.annotations.iter().collect()
	}

	fn drain_changes(&mut self) -> Vec<StoreChange> {
		std::mem::take(&mut self.pending_changes)
	}
}

impl Filterable for MemoryStore {
	fn set_filter(&mut self, filter: Option<Filter>) -> Result<(), RevisionsError> {
		self.filter = filter;
		Ok(())
	}

	fn filter(&self) -> Option<&Filter> {
		self.filter.as_ref()
	}

	fn visible(&self) -> Vec<&Annotation> {
		match &self.filter {
			Some(f) => self.annotations.iter().filter(|a| f.matches(a)).collect(),
			None => self.all(),
		}
	}
}
