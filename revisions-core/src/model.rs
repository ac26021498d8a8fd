// ---------------------------------------------------------------------------
// Annotation records
// ---------------------------------------------------------------------------
//
// Only the fields the correction overlay and the revision originator inspect
// are typed. Everything else on a target (selectors, geometry, ...) is carried
// through untouched in `Target::extra`.
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a body or target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

impl User {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: None,
		}
	}
}

/// An annotation layer as seen by the editor. At most one layer is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
	pub id: String,
	#[serde(default)]
	pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
	pub id: String,
	pub annotation: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub purpose: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub creator: Option<User>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated_by: Option<User>,
}

impl Body {
	/// A bare body with just a purpose and value.
	pub fn new(
		id: impl Into<String>,
		annotation: impl Into<String>,
		purpose: Option<&str>,
		value: Option<&str>,
	) -> Self {
		Self {
			id: id.into(),
			annotation: annotation.into(),
			purpose: purpose.map(str::to_string),
			value: value.map(str::to_string),
			creator: None,
			created: None,
			updated: None,
			updated_by: None,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub annotation: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub creator: Option<User>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated_by: Option<User>,
	/// Selector, geometry and anything else the host attaches.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
	pub id: String,
	#[serde(rename = "layer_id", default, skip_serializing_if = "Option::is_none")]
	pub layer_id: Option<String>,
	#[serde(default)]
	pub bodies: Vec<Body>,
	#[serde(default)]
	pub target: Target,
}

impl Annotation {
	/// An annotation with no bodies and an empty target.
	pub fn new(id: impl Into<String>) -> Self {
		let id = id.into();
		Self {
			target: Target {
				annotation: Some(id.clone()),
				..Default::default()
			},
			id,
			layer_id: None,
			bodies: Vec::new(),
		}
	}

	pub fn with_layer(mut self, layer_id: impl Into<String>) -> Self {
		self.layer_id = Some(layer_id.into());
		self
	}

	pub fn with_body(mut self, purpose: Option<&str>, value: Option<&str>) -> Self {
		let body_id = format!("{}-b{}", self.id, self.bodies.len());
		self.bodies.push(Body::new(body_id, self.id.clone(), purpose, value));
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn target_keeps_unknown_fields() {
		let value = json!({
			"id": "a1",
			"layer_id": "l1",
			"bodies": [],
			"target": {
				"annotation": "a1",
				"selector": { "type": "RECTANGLE", "geometry": { "x": 1, "y": 2 } }
			}
		});
		let annotation: Annotation = serde_json::from_value(value.clone()).unwrap();
		assert_eq!(annotation.layer_id.as_deref(), Some("l1"));
		assert!(annotation.target.extra.contains_key("selector"));

		let back = serde_json::to_value(&annotation).unwrap();
		assert_eq!(back["target"]["selector"], value["target"]["selector"]);
	}

	#[test]
	fn bodies_and_target_are_optional() {
		let annotation: Annotation = serde_json::from_value(json!({ "id": "a1" })).unwrap();
		assert!(annotation.bodies.is_empty());
		assert!(annotation.target.extra.is_empty());
	}

	#[test]
	fn body_fields_use_camel_case() {
		let mut body = Body::new("b1", "a1", Some("commenting"), Some("hi"));
		body.updated_by = Some(User::new("u1"));
		let value = serde_json::to_value(&body).unwrap();
		assert_eq!(value["updatedBy"]["id"], "u1");
		assert!(value.get("created").is_none());
	}
}
