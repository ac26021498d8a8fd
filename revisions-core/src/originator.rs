// ---------------------------------------------------------------------------
// Revision originator
// ---------------------------------------------------------------------------
//
// "Make editable": clone a read-only annotation into the active layer as a
// correction of the original. Submitting the clone through the overlay hides
// the original, so the user only sees their editable copy.
// ---------------------------------------------------------------------------

use chrono::Utc;
use uuid::Uuid;

use crate::annotator::Annotator;
use crate::correction::CORRECTING;
use crate::error::RevisionsError;
use crate::model::{Annotation, Body, Layer, Target, User};
use crate::overlay::CorrectionQuery;
use crate::store::{AnnotationStore, Filterable, Origin};

/// What the annotation editor knows when it renders the affordance.
#[derive(Debug, Clone)]
pub struct EditorContext {
	pub layers: Vec<Layer>,
	pub me: User,
	pub is_read_only: bool,
	pub is_selected: bool,
}

impl EditorContext {
	pub fn active_layer(&self) -> Option<&str> {
		self.layers
			.iter()
			.find(|l| l.is_active)
			.map(|l| l.id.as_str())
	}
}

/// Build a correction of `original`, owned by `author`, in `active_layer_id`.
///
/// Every id is fresh. Bodies are copied with new authorship; an existing
/// `correcting` marker is dropped so the clone links to `original` only.
pub fn create_correction(original: &Annotation, active_layer_id: &str, author: &User) -> Annotation {
	let id = Uuid::new_v4().to_string();
	let now = Utc::now();

	let mut bodies: Vec<Body> = original
		.bodies
		.iter()
		.filter(|b| b.purpose.as_deref() != Some(CORRECTING))
		.map(|b| Body {
			id: Uuid::new_v4().to_string(),
			annotation: id.clone(),
			creator: Some(author.clone()),
			created: Some(now),
			updated: None,
			updated_by: None,
			..b.clone()
		})
		.collect();

	bodies.push(Body {
		id: Uuid::new_v4().to_string(),
		annotation: id.clone(),
		purpose: Some(CORRECTING.to_string()),
		value: Some(original.id.clone()),
		creator: None,
		created: None,
		updated: None,
		updated_by: None,
	});

	Annotation {
		id,
		layer_id: Some(active_layer_id.to_string()),
		bodies,
		target: Target {
			creator: Some(author.clone()),
			created: Some(now),
			updated: None,
			updated_by: None,
			..original.target.clone()
		},
	}
}

/// The single selected annotation, if exactly one is selected.
fn single_selected<S: AnnotationStore + Filterable>(annotator: &Annotator<S>) -> Option<&Annotation> {
	let selected = annotator.get_selected();
	match selected.as_slice() {
		[only] => Some(*only),
		_ => None,
	}
}

/// Whether the editor should offer to make the selected annotation editable.
///
/// An annotation can be visible while corrected (a filter revealed it); it
/// must not get a second correction.
pub fn can_make_editable<S>(annotator: &Annotator<S>, ctx: &EditorContext) -> bool
where
	S: AnnotationStore + Filterable + CorrectionQuery,
{
	if !ctx.is_read_only || !ctx.is_selected {
		return false;
	}
	match single_selected(annotator) {
		Some(annotation) => !annotator.has_correction(annotation),
		None => false,
	}
}

/// Clone the selected annotation into the active layer as a correction and
/// select the clone. Returns the new id, or `None` if nothing was done.
pub fn make_editable<S>(
	annotator: &mut Annotator<S>,
	ctx: &EditorContext,
) -> Result<Option<String>, RevisionsError>
where
	S: AnnotationStore + Filterable + CorrectionQuery,
{
	if !can_make_editable(annotator, ctx) {
		return Ok(None);
	}
	let Some(layer_id) = ctx.active_layer() else {
		tracing::debug!("No active layer, not creating a correction");
		return Ok(None);
	};
	let Some(original) = single_selected(annotator) else {
		return Ok(None);
	};

	let clone = create_correction(original, layer_id, &ctx.me);
	let id = clone.id.clone();
	tracing::debug!("Creating correction {} of {}", id, original.id);

	annotator
		.store_mut()
		.add_annotation(clone, Origin::Local)?;
	annotator.set_selected(Some(&id))?;
	Ok(Some(id))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::correction::{corrects, is_correction};
	use crate::overlay::RevisionsOverlay;
	use crate::store::MemoryStore;
	use serde_json::json;

	fn original() -> Annotation {
		let mut a = Annotation::new("orig")
			.with_layer("base")
			.with_body(Some("commenting"), Some("hello"));
		a.bodies[0].creator = Some(User::new("someone-else"));
		a.bodies[0].updated_by = Some(User::new("editor"));
		a.target
			.extra
			.insert("selector".into(), json!({ "type": "RECTANGLE", "x": 4 }));
		a
	}

	fn context(read_only: bool) -> EditorContext {
		EditorContext {
			layers: vec![
				Layer {
					id: "base".into(),
					is_active: false,
				},
				Layer {
					id: "mine".into(),
					is_active: true,
				},
			],
			me: User::new("me"),
			is_read_only: read_only,
			is_selected: true,
		}
	}

	fn annotator() -> Annotator<RevisionsOverlay<MemoryStore>> {
		let mut anno = Annotator::new(RevisionsOverlay::mount(MemoryStore::new()));
		anno.store_mut()
			.add_annotation(original(), Origin::Remote)
			.unwrap();
		anno
	}

	#[test]
	fn correction_links_to_original() {
		let me = User::new("me");
		let c = create_correction(&original(), "mine", &me);

		assert_ne!(c.id, "orig");
		assert_eq!(c.layer_id.as_deref(), Some("mine"));
		assert!(is_correction(&c));
		assert_eq!(corrects(&c), Some("orig"));
		assert_eq!(c.bodies.len(), 2);
	}

	#[test]
	fn marker_body_carries_no_authorship() {
		let c = create_correction(&original(), "mine", &User::new("me"));
		let marker = c
			.bodies
			.iter()
			.find(|b| b.purpose.as_deref() == Some(CORRECTING))
			.unwrap();
		assert_eq!(marker.annotation, c.id);
		assert!(marker.creator.is_none());
		assert!(marker.created.is_none());
	}

	#[test]
	fn bodies_get_new_ids_and_authorship() {
		let me = User::new("me");
		let orig = original();
		let c = create_correction(&orig, "mine", &me);

		let copied = &c.bodies[0];
		assert_ne!(copied.id, orig.bodies[0].id);
		assert_eq!(copied.annotation, c.id);
		assert_eq!(copied.value.as_deref(), Some("hello"));
		assert_eq!(copied.creator.as_ref(), Some(&me));
		assert!(copied.created.is_some());
		assert!(copied.updated_by.is_none());
		assert!(c.bodies.iter().all(|b| b.annotation == c.id));
	}

	#[test]
	fn target_is_copied_with_new_authorship() {
		let me = User::new("me");
		let orig = original();
		let c = create_correction(&orig, "mine", &me);

		assert_eq!(c.target.extra, orig.target.extra);
		assert_eq!(c.target.annotation, orig.target.annotation);
		assert_eq!(c.target.creator.as_ref(), Some(&me));
		assert!(c.target.created.is_some());
	}

	#[test]
	fn correcting_a_correction_links_only_once() {
		let me = User::new("me");
		let first = create_correction(&original(), "mine", &me);
		let second = create_correction(&first, "mine", &me);
		let markers = second
			.bodies
			.iter()
			.filter(|b| b.purpose.as_deref() == Some(CORRECTING))
			.count();
		assert_eq!(markers, 1);
		assert_eq!(corrects(&second), Some(first.id.as_str()));
	}

	#[test]
	fn make_editable_hides_original_and_selects_clone() {
		let mut anno = annotator();
		anno.set_selected(Some("orig")).unwrap();

		let id = make_editable(&mut anno, &context(true)).unwrap().unwrap();
		let ids: Vec<_> = anno.get_annotations().into_iter().map(|a| a.id.clone()).collect();
		assert_eq!(ids, vec![id.clone()]);
		assert_eq!(anno.get_selected()[0].id, id);
		assert!(anno.has_correction(&original()));
	}

	#[test]
	fn make_editable_requires_preconditions() {
		let mut anno = annotator();

		// Nothing selected.
		assert_eq!(make_editable(&mut anno, &context(true)).unwrap(), None);

		anno.set_selected(Some("orig")).unwrap();

		// Editable annotations need no copy.
		assert_eq!(make_editable(&mut anno, &context(false)).unwrap(), None);

		// No active layer.
		let mut ctx = context(true);
		ctx.layers.iter_mut().for_each(|l| l.is_active = false);
		assert_eq!(make_editable(&mut anno, &ctx).unwrap(), None);

		assert_eq!(anno.get_annotations().len(), 1);
	}

	#[test]
	fn corrected_annotation_is_not_offered_again() {
		let mut anno = annotator();
		anno.set_selected(Some("orig")).unwrap();
		assert!(can_make_editable(&anno, &context(true)));
		let id = make_editable(&mut anno, &context(true)).unwrap().unwrap();

		// A filter hiding the clone's layer reveals the original.
		anno.set_filter(Some(crate::store::Filter::new(|a| {
			a.layer_id.as_deref() == Some("base")
		})))
		.unwrap();
		anno.set_selected(Some("orig")).unwrap();
		assert!(!can_make_editable(&anno, &context(true)));
		assert_eq!(make_editable(&mut anno, &context(true)).unwrap(), None);
		assert!(anno.store().get_annotation(&id).is_some());
	}
}
