use std::collections::HashSet;

use revisions_core::{Annotation, Filter, Layer, User};
use serde::Deserialize;

// ── JSON-RPC 2.0 error codes ────────────────────────────────────────────────

pub const INTERNAL_ERROR: i32 = -32603;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const REVISIONS_ERROR: i32 = -32000;

// ── Incoming request ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

// ── Params ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParams {
    pub annotation: Annotation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddParams {
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdParams {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdsParams {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectParams {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFilterParams {
    pub filter: Option<FilterSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorParams {
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default = "default_true")]
    pub is_read_only: bool,
    #[serde(default = "default_true")]
    pub is_selected: bool,
}

fn default_true() -> bool {
    true
}

// ── Filters ─────────────────────────────────────────────────────────────────

/// Wire form of a visibility filter. Every field that is set must match.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// Keep annotations whose layer is listed.
    pub layers: Option<Vec<String>>,
    /// Keep annotations with at least one body by a listed creator.
    pub creators: Option<Vec<String>>,
    /// Drop these annotation ids.
    pub exclude_ids: Option<Vec<String>>,
}

impl FilterSpec {
    pub fn into_filter(self) -> Filter {
        let layers: Option<HashSet<String>> = self.layers.map(|v| v.into_iter().collect());
        let creators: Option<HashSet<String>> = self.creators.map(|v| v.into_iter().collect());
        let excluded: HashSet<String> = self.exclude_ids.unwrap_or_default().into_iter().collect();

        Filter::new(move |a: &Annotation| {
            if excluded.contains(&a.id) {
                return false;
            }
            if let Some(layers) = &layers {
                match &a.layer_id {
                    Some(layer) if layers.contains(layer) => {}
                    _ => return false,
                }
            }
            if let Some(creators) = &creators {
                let by_creator = a
                    .bodies
                    .iter()
                    .filter_map(|b| b.creator.as_ref())
                    .any(|u| creators.contains(&u.id));
                if !by_creator {
                    return false;
                }
            }
            true
        })
    }
}
