// ---------------------------------------------------------------------------
// Correction ledger
// ---------------------------------------------------------------------------
//
// Private bookkeeping of the correction overlay:
//
// - `has_correction`: ids of originals that are hidden (or must stay out of
//   the store on arrival) because a correction supersedes them.
// - `is_correction_to`: correction id -> snapshot of the original it
//   supersedes, captured when the link was made. The snapshot is what gets
//   re-added when the correction goes away, since the live store no longer
//   holds the original by then.
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use crate::model::Annotation;

#[derive(Debug, Clone, Default)]
pub struct CorrectionLedger {
	has_correction: HashSet<String>,
	is_correction_to: HashMap<String, Annotation>,
}

impl CorrectionLedger {
	pub fn new() -> Self {
		Self::default()
	}

	// -- Hidden originals ---------------------------------------------------

	pub fn has_correction(&self, original_id: &str) -> bool {
		self.has_correction.contains(original_id)
	}

	pub fn mark_corrected(&mut self, original_id: &str) {
		self.has_correction.insert(original_id.to_string());
	}

	pub fn unmark_corrected(&mut self, original_id: &str) {
		self.has_correction.remove(original_id);
	}

	/// Ids of every original currently superseded, sorted.
	pub fn corrected_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.has_correction.iter().cloned().collect();
		ids.sort();
		ids
	}

	// -- Snapshots ----------------------------------------------------------

	pub fn link(&mut self, correction_id: &str, original: Annotation) {
		self.is_correction_to
			.insert(correction_id.to_string(), original);
	}

	pub fn original_of(&self, correction_id: &str) -> Option<&Annotation> {
		self.is_correction_to.get(correction_id)
	}

	pub fn is_linked(&self, correction_id: &str) -> bool {
		self.is_correction_to.contains_key(correction_id)
	}

	pub fn forget(&mut self, correction_id: &str) -> Option<Annotation> {
		self.is_correction_to.remove(correction_id)
	}

	/// Number of corrections holding a snapshot of their original.
	pub fn linked_count(&self) -> usize {
		self.is_correction_to.len()
	}

	pub fn is_empty(&self) -> bool {
		self.has_correction.is_empty() && self.is_correction_to.is_empty()
	}
}
