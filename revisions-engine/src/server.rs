// ---------------------------------------------------------------------------
// RevisionsServer — JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes JSON-RPC 2.0 requests (NDJSON over stdin) to an annotator whose store
// is a `MemoryStore` behind the revisions overlay. Store mutations, including
// the ones the overlay makes on its own, are forwarded as
// `annotations/changed` notifications ahead of the response.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead};

use revisions_core::originator::{self, EditorContext};
use revisions_core::{
    AnnotationRef, AnnotationStore, Annotator, Filterable, MemoryStore, Origin, RevisionsOverlay,
    User,
};

use crate::config::CliArgs;
use crate::error::EngineError;
use crate::protocol::*;
use crate::transport::NdjsonTransport;

type Store = RevisionsOverlay<MemoryStore>;

pub struct RevisionsServer {
    transport: NdjsonTransport,
    annotator: Option<Annotator<Store>>,
    user: User,
    server_name: String,
    server_version: String,
}

impl RevisionsServer {
    /// The annotator is created when `initialize` is called.
    pub fn new(transport: NdjsonTransport, args: &CliArgs) -> Self {
        Self {
            transport,
            annotator: None,
            user: args.user(),
            server_name: args.server_name.clone(),
            server_version: args.server_version.clone(),
        }
    }

    /// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
    pub fn run(&mut self) -> Result<(), EngineError> {
        let stdin = io::stdin();
        let reader = stdin.lock();

        for line_result in reader.lines() {
            let line = line_result?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(req) => self.dispatch(req),
                Err(e) => {
                    tracing::warn!("Parse error: {}", e);
                    self.transport
                        .write_error(0, INTERNAL_ERROR, "Parse error: invalid JSON", None);
                }
            }
        }

        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    pub fn dispatch(&mut self, req: JsonRpcRequest) {
        let id = req.id;
        let result = match req.method.as_str() {
            "initialize" => self.handle_initialize(req.params),

            // -- Store -----------------------------------------------------
            "annotations/add" => self.with_annotator_mut(|a| {
                let p: AddParams = parse_params(req.params)?;
                a.store_mut().add_annotation(p.annotation, Origin::Local)?;
                Ok(serde_json::json!({}))
            }),
            "annotations/bulkAdd" => self.with_annotator_mut(|a| {
                let p: BulkAddParams = parse_params(req.params)?;
                a.store_mut()
                    .bulk_add_annotations(p.annotations, p.replace, Origin::Local)?;
                Ok(serde_json::json!({}))
            }),
            "annotations/delete" => self.with_annotator_mut(|a| {
                let p: IdParams = parse_params(req.params)?;
                a.store_mut()
                    .delete_annotation(AnnotationRef::Id(p.id), Origin::Local)?;
                Ok(serde_json::json!({}))
            }),
            "annotations/bulkDelete" => self.with_annotator_mut(|a| {
                let p: IdsParams = parse_params(req.params)?;
                let targets = p.ids.into_iter().map(AnnotationRef::Id).collect();
                a.store_mut()
                    .bulk_delete_annotations(targets, Origin::Local)?;
                Ok(serde_json::json!({}))
            }),
            "annotations/get" => self.with_annotator(|a| {
                let p: IdParams = parse_params(req.params)?;
                Ok(serde_json::json!({ "annotation": a.store().get_annotation(&p.id) }))
            }),
            "annotations/all" => self.with_annotator(|a| {
                Ok(serde_json::json!({ "annotations": a.get_annotations() }))
            }),
            "annotations/visible" => self.with_annotator(|a| {
                Ok(serde_json::json!({ "annotations": a.store().visible() }))
            }),

            // -- Filter / selection ----------------------------------------
            "filter/set" => self.with_annotator_mut(|a| {
                let p: SetFilterParams = parse_params(req.params)?;
                a.set_filter(p.filter.map(FilterSpec::into_filter))?;
                Ok(serde_json::json!({}))
            }),
            "selection/set" => self.with_annotator_mut(|a| {
                let p: SelectParams = parse_params(req.params)?;
                a.set_selected(p.id.as_deref())?;
                Ok(serde_json::json!({}))
            }),
            "selection/get" => self.with_annotator(|a| {
                Ok(serde_json::json!({ "annotations": a.get_selected() }))
            }),

            // -- Revisions -------------------------------------------------
            "revisions/hasCorrection" => self.with_annotator(|a| {
                let p: IdParams = parse_params(req.params)?;
                let has = a.store().ledger().has_correction(&p.id);
                Ok(serde_json::json!({ "hasCorrection": has }))
            }),
            "revisions/canMakeEditable" => {
                let ctx = self.editor_context(req.params);
                self.with_annotator(|a| {
                    let can = originator::can_make_editable(a, &ctx?);
                    Ok(serde_json::json!({ "canMakeEditable": can }))
                })
            }
            "revisions/makeEditable" => {
                let ctx = self.editor_context(req.params);
                self.with_annotator_mut(|a| {
                    let id = originator::make_editable(a, &ctx?)?;
                    Ok(serde_json::json!({ "id": id }))
                })
            }

            // -- Unknown ---------------------------------------------------
            _ => {
                self.transport.write_error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", req.method),
                    None,
                );
                return;
            }
        };

        if let Some(annotator) = &mut self.annotator {
            let changes = annotator.store_mut().drain_changes();
            self.transport.write_changes(&changes);
        }

        match result {
            Ok(value) => self.transport.write_response(id, value),
            Err(e) => {
                let code = match e {
                    EngineError::InvalidParams(_) => INVALID_PARAMS,
                    _ => REVISIONS_ERROR,
                };
                self.transport
                    .write_error(id, code, e.to_string(), Some(e.to_json_rpc_error()))
            }
        }
    }

    // ── Annotator accessors ───────────────────────────────────────────────

    fn with_annotator<F>(&self, f: F) -> Result<serde_json::Value, EngineError>
    where
        F: FnOnce(&Annotator<Store>) -> Result<serde_json::Value, EngineError>,
    {
        match &self.annotator {
            Some(a) => f(a),
            None => Err(EngineError::NotInitialized),
        }
    }

    fn with_annotator_mut<F>(&mut self, f: F) -> Result<serde_json::Value, EngineError>
    where
        F: FnOnce(&mut Annotator<Store>) -> Result<serde_json::Value, EngineError>,
    {
        match &mut self.annotator {
            Some(a) => f(a),
            None => Err(EngineError::NotInitialized),
        }
    }

    fn editor_context(&self, params: serde_json::Value) -> Result<EditorContext, EngineError> {
        let p: EditorParams = parse_params(params)?;
        Ok(EditorContext {
            layers: p.layers,
            me: self.user.clone(),
            is_read_only: p.is_read_only,
            is_selected: p.is_selected,
        })
    }

    // ── Initialize ────────────────────────────────────────────────────────

    fn handle_initialize(&mut self, params: serde_json::Value) -> Result<serde_json::Value, EngineError> {
        let p: InitializeParams = if params.is_null() {
            InitializeParams::default()
        } else {
            parse_params(params)?
        };
        if let Some(user) = p.user {
            self.user = user;
        }

        if self.annotator.is_some() {
            tracing::info!("Re-initializing: previous annotations and corrections dropped");
        }
        self.annotator = Some(Annotator::new(RevisionsOverlay::mount(MemoryStore::new())));

        Ok(serde_json::json!({
            "serverInfo": {
                "name": self.server_name,
                "version": self.server_version,
            },
            "user": self.user,
        }))
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: serde_json::Value) -> Result<T, EngineError> {
    serde_json::from_value(params).map_err(|e| EngineError::InvalidParams(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use revisions_core::CorrectionQuery;
    use serde_json::json;

    fn server() -> RevisionsServer {
        let args = CliArgs::parse_from(["revisions-engine", "--user-id", "tester"]);
        let mut server = RevisionsServer::new(NdjsonTransport::with_writer(io::sink()), &args);
        server.dispatch(request("initialize", json!({})));
        server
    }

    fn request(method: &str, params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest {
            id: 1,
            method: method.to_string(),
            params,
        }
    }

    fn store_ids(server: &RevisionsServer) -> Vec<String> {
        server
            .annotator
            .as_ref()
            .unwrap()
            .get_annotations()
            .into_iter()
            .map(|a| a.id.clone())
            .collect()
    }

    #[test]
    fn requests_before_initialize_fail() {
        let args = CliArgs::parse_from(["revisions-engine"]);
        let server = RevisionsServer::new(NdjsonTransport::with_writer(io::sink()), &args);
        let err = server.with_annotator(|_| Ok(json!({}))).unwrap_err();
        assert_eq!(err.code(), "REVISIONS_NOT_INITIALIZED");
    }

    #[test]
    fn make_editable_uses_configured_user() {
        let mut server = server();
        server.dispatch(request(
            "annotations/add",
            json!({ "annotation": { "id": "a", "layer_id": "base" } }),
        ));
        server.dispatch(request("selection/set", json!({ "id": "a" })));
        server.dispatch(request(
            "revisions/makeEditable",
            json!({ "layers": [{ "id": "mine", "isActive": true }] }),
        ));

        let ids = store_ids(&server);
        assert_eq!(ids.len(), 1);
        assert_ne!(ids[0], "a");

        let annotator = server.annotator.as_ref().unwrap();
        let clone = annotator.store().get_annotation(&ids[0]).unwrap();
        assert_eq!(clone.target.creator.as_ref().map(|u| u.id.as_str()), Some("tester"));
        assert!(annotator.has_correction(&revisions_core::Annotation::new("a")));
    }

    #[test]
    fn filter_set_and_clear() {
        let mut server = server();
        server.dispatch(request(
            "annotations/bulkAdd",
            json!({ "annotations": [
                { "id": "a", "layer_id": "base" },
                { "id": "c", "layer_id": "mine", "bodies": [
                    { "id": "m", "annotation": "c", "purpose": "correcting", "value": "a" }
                ] }
            ] }),
        ));
        assert_eq!(store_ids(&server), vec!["c"]);

        server.dispatch(request("filter/set", json!({ "filter": { "layers": ["base"] } })));
        assert_eq!(store_ids(&server), vec!["c", "a"]);

        server.dispatch(request("filter/set", json!({ "filter": null })));
        assert_eq!(store_ids(&server), vec!["c"]);
    }
}
