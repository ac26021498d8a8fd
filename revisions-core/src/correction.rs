//! Classifies annotations as corrections.
//!
//! A correction carries a marker body whose purpose is [`CORRECTING`] and
//! whose value is the id of the annotation it supersedes.

use crate::model::Annotation;

/// Purpose tag of the marker body linking a correction to its original.
pub const CORRECTING: &str = "correcting";

/// True if any body is a non-empty `correcting` marker.
pub fn is_correction(annotation: &Annotation) -> bool {
	annotation.bodies.iter().any(|b| {
		b.purpose.as_deref() == Some(CORRECTING) && b.value.as_deref().is_some_and(|v| !v.is_empty())
	})
}

/// Id of the annotation this one corrects, taken from the first marker body.
pub fn corrects(annotation: &Annotation) -> Option<&str> {
	annotation
		.bodies
		.iter()
		.find(|b| b.purpose.as_deref() == Some(CORRECTING))
		.and_then(|b| b.value.as_deref())
}
