// ---------------------------------------------------------------------------
// RevisionsOverlay — correction-tracking store decorator
// ---------------------------------------------------------------------------
//
// Wraps any `AnnotationStore` and intercepts the four mutation primitives and
// the filter setter, so that of each original/correction pair only the
// correction is held by the store. Deleting the correction brings the
// original back from the ledger snapshot.
//
// Everything the overlay does to the inner store on its own behalf is tagged
// `Origin::Remote` and goes straight to the inner store, so it is never
// re-interpreted as a user edit.
// ---------------------------------------------------------------------------

use std::collections::HashSet;

use crate::correction::{corrects, is_correction};
use crate::error::RevisionsError;
use crate::ledger::CorrectionLedger;
use crate::model::Annotation;
use crate::store::{AnnotationRef, AnnotationStore, Filter, Filterable, Origin, StoreChange};

/// Lets presentation logic ask whether an annotation already has a
/// correction, e.g. to avoid offering a second one.
pub trait CorrectionQuery {
	fn has_correction(&self, annotation: &Annotation) -> bool;
}

pub struct RevisionsOverlay<S> {
	inner: S,
	ledger: CorrectionLedger,
}

impl<S: AnnotationStore> RevisionsOverlay<S> {
	/// Attach the overlay to a store. The ledger starts empty, so records
	/// already in the store are not reconciled.
	pub fn mount(inner: S) -> Self {
		tracing::info!("Mounting revisions overlay");
		Self {
			inner,
			ledger: CorrectionLedger::new(),
		}
	}

	/// Detach and hand back the wrapped store. The ledger is discarded.
	pub fn unmount(self) -> S {
		tracing::info!(
			"Unmounting revisions overlay ({} active correction(s))",
			self.ledger.linked_count()
		);
		self.inner
	}

	pub fn inner(&self) -> &S {
		&self.inner
	}

	pub fn ledger(&self) -> &CorrectionLedger {
		&self.ledger
	}

	// -- Helpers ------------------------------------------------------------

	/// Mark `original_id` as superseded by `correction_id`. If the original
	/// is in the store, snapshot it and take it out; the removed record is
	/// pushed onto `hidden`.
	fn hide_original(
		&mut self,
		correction_id: &str,
		original_id: &str,
		hidden: &mut Vec<Annotation>,
	) -> Result<(), RevisionsError> {
		self.ledger.mark_corrected(original_id);

		if let Some(original) = self.inner.get_annotation(original_id).cloned() {
			tracing::debug!("Hiding {} behind correction {}", original_id, correction_id);
			self.ledger.link(correction_id, original.clone());
			self.inner
				.delete_annotation(AnnotationRef::Id(original_id.to_string()), Origin::Remote)?;
			hidden.push(original);
		}
		Ok(())
	}

	/// Undo a failed add: the ledger goes back to `saved` and every original
	/// taken out on the way is put back.
	fn roll_back(&mut self, saved: CorrectionLedger, hidden: Vec<Annotation>) {
		self.ledger = saved;

		let missing: Vec<Annotation> = hidden
			.into_iter()
			.filter(|a| self.inner.get_annotation(&a.id).is_none())
			.collect();
		if missing.is_empty() {
			return;
		}
		tracing::debug!("Add failed, putting back {} hidden original(s)", missing.len());
		if let Err(e) = self.inner.bulk_add_annotations(missing, false, Origin::Remote) {
			tracing::error!("Failed to put back hidden originals: {}", e);
		}
	}

	fn add_correction(
		&mut self,
		annotation: Annotation,
		origin: Origin,
		hidden: &mut Vec<Annotation>,
	) -> Result<(), RevisionsError> {
		if let Some(original_id) = corrects(&annotation).map(str::to_string) {
			self.hide_original(&annotation.id, &original_id, hidden)?;
		}
		self.inner.add_annotation(annotation, origin)
	}

	/// Both passes of a bulk add. With `replace` the inner store is about to
	/// be emptied, so the ledger restarts and nothing already stored is
	/// hidden or linked.
	fn reconcile_bulk_add(
		&mut self,
		annotations: Vec<Annotation>,
		replace: bool,
		origin: Origin,
		hidden: &mut Vec<Annotation>,
	) -> Result<(), RevisionsError> {
		if replace {
			self.ledger = CorrectionLedger::new();
		}

		// Originals may arrive before, after, or in the same batch as their
		// corrections.
		for a in annotations.iter().filter(|a| is_correction(a)) {
			if let Some(original_id) = corrects(a) {
				if replace {
					self.ledger.mark_corrected(original_id);
				} else {
					self.hide_original(&a.id, original_id, hidden)?;
				}
			}
		}

		let (to_add, corrected): (Vec<_>, Vec<_>) = annotations
			.into_iter()
			.partition(|a| !self.ledger.has_correction(&a.id));

		if !corrected.is_empty() {
			let ids: Vec<&str> = corrected.iter().map(|a| a.id.as_str()).collect();
			tracing::debug!("Discarding corrected annotations from view: {:?}", ids);
		}

		self.inner.bulk_add_annotations(to_add, replace, origin)?;

		// Brute force over the whole store, but this normally only runs once,
		// when the initial batch loads.
		if !corrected.is_empty() {
			let corrections: Vec<&Annotation> = self
				.inner
				.all()
				.into_iter()
				.filter(|a| is_correction(a))
				.collect();

			for original in corrected {
				if let Some(correction) = corrections
					.iter()
					.find(|c| corrects(c) == Some(original.id.as_str()))
				{
					self.ledger.link(&correction.id, original);
				}
			}
		}

		Ok(())
	}

	/// Id of the first correction in the store that supersedes `original_id`.
	fn find_correction_of(&self, original_id: &str) -> Option<String> {
		self.inner
			.all()
			.into_iter()
			.find(|a| is_correction(a) && corrects(a) == Some(original_id))
			.map(|a| a.id.clone())
	}

	/// Undo the link held by `correction_id`: the original is put back unless
	/// the store already holds it, and stops being marked as corrected.
	fn release_original(&mut self, correction_id: &str) -> Result<(), RevisionsError> {
		match self.ledger.original_of(correction_id).cloned() {
			Some(original) => {
				let original_id = original.id.clone();
				if self.inner.get_annotation(&original_id).is_none() {
					tracing::debug!("Restoring {} (correction {} removed)", original_id, correction_id);
					self.inner.add_annotation(original, Origin::Remote)?;
				}
				self.ledger.unmark_corrected(&original_id);
			}
			None => {
				// Correction whose original never arrived.
				let pending = self
					.inner
					.get_annotation(correction_id)
					.filter(|a| is_correction(a))
					.and_then(corrects)
					.map(str::to_string);
				if let Some(original_id) = pending {
					self.ledger.unmark_corrected(&original_id);
				}
			}
		}
		Ok(())
	}
}

impl<S: AnnotationStore> CorrectionQuery for RevisionsOverlay<S> {
	fn has_correction(&self, annotation: &Annotation) -> bool {
		self.ledger.has_correction(&annotation.id)
	}
}

impl<S: AnnotationStore> AnnotationStore for RevisionsOverlay<S> {
	fn add_annotation(
		&mut self,
		annotation: Annotation,
		origin: Origin,
	) -> Result<(), RevisionsError> {
		if self.ledger.has_correction(&annotation.id) {
			// The store stays as it is. The correction that arrived first may
			// still lack the snapshot it needs to restore this record later.
			if let Some(correction_id) = self.find_correction_of(&annotation.id) {
				if !self.ledger.is_linked(&correction_id) {
					self.ledger.link(&correction_id, annotation.clone());
				}
			}
			tracing::debug!("Discarding corrected annotation {}", annotation.id);
			return Ok(());
		}

		if !is_correction(&annotation) {
			return self.inner.add_annotation(annotation, origin);
		}

		let saved = self.ledger.clone();
		let mut hidden = Vec::new();
		let result = self.add_correction(annotation, origin, &mut hidden);
		if result.is_err() {
			self.roll_back(saved, hidden);
		}
		result
	}

	fn bulk_add_annotations(
		&mut self,
		annotations: Vec<Annotation>,
		replace: bool,
		origin: Origin,
	) -> Result<(), RevisionsError> {
		let saved = self.ledger.clone();
		let mut hidden = Vec::new();
		let result = self.reconcile_bulk_add(annotations, replace, origin, &mut hidden);
		if result.is_err() {
			self.roll_back(saved, hidden);
		}
		result
	}

	fn delete_annotation(
		&mut self,
		target: AnnotationRef,
		origin: Origin,
	) -> Result<(), RevisionsError> {
		let id = target.id().to_string();

		self.release_original(&id)?;
		self.inner.delete_annotation(target, origin)?;
		self.ledger.forget(&id);
		Ok(())
	}

	fn bulk_delete_annotations(
		&mut self,
		targets: Vec<AnnotationRef>,
		origin: Origin,
	) -> Result<(), RevisionsError> {
		let ids: Vec<String> = targets.iter().map(|t| t.id().to_string()).collect();

		let mut restorable = Vec::new();
		let mut released = Vec::new();
		let mut seen = HashSet::new();

		for id in &ids {
			match self.ledger.original_of(id) {
				Some(original) => {
					if seen.insert(original.id.clone())
						&& self.inner.get_annotation(&original.id).is_none()
					{
						restorable.push(original.clone());
					}
					released.push(original.id.clone());
				}
				None => {
					let pending = self
						.inner
						.get_annotation(id)
						.filter(|a| is_correction(a))
						.and_then(corrects);
					if let Some(original_id) = pending {
						released.push(original_id.to_string());
					}
				}
			}
		}

		if !restorable.is_empty() {
			tracing::debug!("Restoring {} original(s) after bulk delete", restorable.len());
			self.inner
				.bulk_add_annotations(restorable, false, Origin::Remote)?;
		}
		for original_id in &released {
			self.ledger.unmark_corrected(original_id);
		}

		self.inner.bulk_delete_annotations(targets, origin)?;

		for id in &ids {
			self.ledger.forget(id);
		}
		Ok(())
	}

	fn get_annotation(&self, id: &str) -> Option<&Annotation> {
		self.inner.get_annotation(id)
	}

	fn all(&self) -> Vec<&Annotation> {
		self.inner.all()
	}

	fn drain_changes(&mut self) -> Vec<StoreChange> {
		self.inner.drain_changes()
	}
}

impl<S: AnnotationStore + Filterable> Filterable for RevisionsOverlay<S> {
	fn set_filter(&mut self, filter: Option<Filter>) -> Result<(), RevisionsError> {
		match &filter {
			Some(f) => {
				// Corrections the new filter hides may reveal their originals,
				// provided the filter lets those through.
				let mut seen = HashSet::new();
				let restorable: Vec<Annotation> = self
					.inner
					.all()
					.into_iter()
					.filter(|a| is_correction(a) && !f.matches(a))
					.filter_map(|c| self.ledger.original_of(&c.id))
					.filter(|original| f.matches(original))
					// A correction that was already filtered out before has
					// its original in the store; adding it twice would fail.
					.filter(|original| self.inner.get_annotation(&original.id).is_none())
					.filter(|original| seen.insert(original.id.clone()))
					.cloned()
					.collect();

				if !restorable.is_empty() {
					tracing::debug!("Filter reveals {} original(s)", restorable.len());
					self.inner
						.bulk_add_annotations(restorable, false, Origin::Remote)?;
				}
			}
			None => {
				// Take back out every original a previous filter revealed.
				let ids: Vec<AnnotationRef> = self
					.ledger
					.corrected_ids()
					.into_iter()
					.map(AnnotationRef::Id)
					.collect();
				if !ids.is_empty() {
					self.inner.bulk_delete_annotations(ids, Origin::Remote)?;
				}
			}
		}

		self.inner.set_filter(filter)
	}

	fn filter(&self) -> Option<&Filter> {
		self.inner.filter()
	}

	fn visible(&self) -> Vec<&Annotation> {
		self.inner.visible()
	}
}
