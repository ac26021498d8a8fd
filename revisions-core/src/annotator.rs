// ---------------------------------------------------------------------------
// Annotator — store + selection
// ---------------------------------------------------------------------------

use crate::error::RevisionsError;
use crate::model::Annotation;
use crate::overlay::CorrectionQuery;
use crate::store::{AnnotationStore, Filter, Filterable};

/// Host-side view of an annotation store: owns the store and tracks which
/// annotations are selected.
pub struct Annotator<S> {
	store: S,
	selected: Vec<String>,
}

impl<S: AnnotationStore + Filterable> Annotator<S> {
	pub fn new(store: S) -> Self {
		Self {
			store,
			selected: Vec::new(),
		}
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	pub fn store_mut(&mut self) -> &mut S {
		&mut self.store
	}

	pub fn into_store(self) -> S {
		self.store
	}

	/// Every annotation held by the store, ignoring the filter.
	pub fn get_annotations(&self) -> Vec<&Annotation> {
		self.store.all()
	}

	/// Selected annotations still present in the store.
	pub fn get_selected(&self) -> Vec<&Annotation> {
		self.selected
			.iter()
			.filter_map(|id| self.store.get_annotation(id))
			.collect()
	}

	/// Select a single annotation, or clear the selection with `None`.
	pub fn set_selected(&mut self, id: Option<&str>) -> Result<(), RevisionsError> {
		match id {
			Some(id) => {
				if self.store.get_annotation(id).is_none() {
					return Err(RevisionsError::NotFound(id.to_string()));
				}
				self.selected = vec![id.to_string()];
			}
			None => self.selected.clear(),
		}
		Ok(())
	}

	pub fn set_filter(&mut self, filter: Option<Filter>) -> Result<(), RevisionsError> {
		self.store.set_filter(filter)
	}
}

impl<S: CorrectionQuery> CorrectionQuery for Annotator<S> {
	fn has_correction(&self, annotation: &Annotation) -> bool {
		self.store.has_correction(annotation)
	}
}
