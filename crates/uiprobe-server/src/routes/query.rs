//! Query routes: version, tree, inspect, select, exists, setattr, click,
//! pick, and keyboard injection.

use super::{ApiError, run_blocking};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uiprobe_core::ProbeContext;
use uiprobe_protocol::{
    ClickRequest, ExistsRequest, ExistsResponse, KeycodesRequest, PickParams, PickResponse,
    PickResult, PropertyMap, SelectRequest, SelectResponse, SetAttrRequest, SetAttrResponse,
    TreeDump, VersionInfo,
};

/// `GET /version`
pub async fn version(State(ctx): State<ProbeContext>) -> Json<VersionInfo> {
    Json(VersionInfo {
        version: ctx.version().to_string(),
    })
}

/// `GET /tree` — dump the whole scene graph, exposing node ids.
pub async fn tree(State(ctx): State<ProbeContext>) -> Result<Json<TreeDump>, ApiError> {
    let entries = run_blocking(move || ctx.tree()).await?;
    Ok(Json(TreeDump {
        tree: ("root".to_string(), entries),
    }))
}

/// `GET /inspect/{id}` — property map of an exposed node, or `null` when
/// the id no longer resolves.
pub async fn inspect(
    Path(id): Path<u64>,
    State(ctx): State<ProbeContext>,
) -> Result<Json<Option<PropertyMap>>, ApiError> {
    let props = run_blocking(move || ctx.inspect(id)).await?;
    Ok(Json(props))
}

/// `POST /select`
pub async fn select(
    State(ctx): State<ProbeContext>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, ApiError> {
    let selector = req.selector.clone();
    let with_bounds = req.with_bounds;
    let results = run_blocking(move || ctx.select(&req.selector, req.with_bounds)).await??;
    Ok(Json(SelectResponse {
        selector,
        with_bounds,
        results,
    }))
}

/// `POST /exists`
pub async fn exists(
    State(ctx): State<ProbeContext>,
    Json(req): Json<ExistsRequest>,
) -> Result<Json<ExistsResponse>, ApiError> {
    let result = run_blocking(move || ctx.exists(&req.selector)).await??;
    Ok(Json(ExistsResponse { result }))
}

/// `POST /setattr`
pub async fn setattr(
    State(ctx): State<ProbeContext>,
    Json(req): Json<SetAttrRequest>,
) -> Result<Json<SetAttrResponse>, ApiError> {
    let updated =
        run_blocking(move || ctx.set_attr(&req.selector, &req.key, &req.value)).await??;
    Ok(Json(SetAttrResponse { updated }))
}

/// `POST /click` — synthesize a click on the first match.
pub async fn click(
    State(ctx): State<ProbeContext>,
    Json(req): Json<ClickRequest>,
) -> Result<StatusCode, ApiError> {
    run_blocking(move || ctx.click(&req.selector)).await??;
    Ok(StatusCode::OK)
}

/// `GET /pick` — resolve a point (or the next real pointer-down) to node
/// path(s).
pub async fn pick(
    State(ctx): State<ProbeContext>,
    Query(params): Query<PickParams>,
) -> Result<Json<PickResponse>, ApiError> {
    let all = params.all;
    let paths = run_blocking(move || ctx.pick(params.x, params.y, params.all)).await??;
    let results = if all {
        PickResult::Paths(paths)
    } else {
        match paths.into_iter().next() {
            Some(path) => PickResult::Path(path),
            None => PickResult::Paths(Vec::new()),
        }
    };
    Ok(Json(PickResponse { results }))
}

/// `POST /sendkeycodes` — compose and dispatch one keyboard gesture.
pub async fn sendkeycodes(
    State(ctx): State<ProbeContext>,
    Json(req): Json<KeycodesRequest>,
) -> Result<StatusCode, ApiError> {
    run_blocking(move || ctx.send_keycodes(&req.keycodes)).await??;
    Ok(StatusCode::OK)
}
