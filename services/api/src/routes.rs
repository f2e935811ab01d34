use crate::infra::AppState;
use assessment_flow::workflows::assessment::{
    assessment_router, AssessmentCatalog, AssessmentService, AssessmentTypeId, FormDataStore,
    SubmissionGateway,
};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct CategoryStepView {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) questions: usize,
    pub(crate) ends_assessment: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssessmentTypeView {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) is_default: bool,
    pub(crate) steps: Vec<CategoryStepView>,
}

pub(crate) fn with_assessment_routes<S, G>(
    service: Arc<AssessmentService<S, G>>,
    catalog: Arc<AssessmentCatalog>,
) -> axum::Router
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    let catalog_routes = axum::Router::new()
        .route("/api/v1/catalog", axum::routing::get(catalog_endpoint))
        .route(
            "/api/v1/catalog/:assessment_type",
            axum::routing::get(assessment_type_endpoint),
        )
        .with_state(catalog);

    assessment_router(service)
        .merge(catalog_routes)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn catalog_endpoint(
    State(catalog): State<Arc<AssessmentCatalog>>,
) -> Json<Vec<AssessmentTypeView>> {
    let views = catalog
        .assessment_types()
        .iter()
        .map(|definition| assessment_type_view(&catalog, &definition.id))
        .collect();
    Json(views)
}

pub(crate) async fn assessment_type_endpoint(
    State(catalog): State<Arc<AssessmentCatalog>>,
    Path(assessment_type): Path<String>,
) -> impl IntoResponse {
    let assessment_type = AssessmentTypeId::new(assessment_type);
    if !catalog.is_known_type(&assessment_type) {
        let payload = json!({
            "error": format!("assessment type {assessment_type} is not defined"),
        });
        return (StatusCode::NOT_FOUND, Json(payload)).into_response();
    }

    let view = assessment_type_view(&catalog, &assessment_type);
    (StatusCode::OK, Json(view)).into_response()
}

/// Category sequence for a type as shown by the catalog endpoint and CLI.
pub(crate) fn assessment_type_view(
    catalog: &AssessmentCatalog,
    assessment_type: &AssessmentTypeId,
) -> AssessmentTypeView {
    let definition = catalog.resolve_type(assessment_type);
    let steps = catalog
        .categories_for(&definition.id)
        .into_iter()
        .map(|category_id| {
            let questions = catalog.questions_for(&category_id, &definition.id).len();
            let (title, ends_assessment) = catalog
                .category(&category_id)
                .map(|category| (category.title.clone(), category.ends_assessment))
                .unwrap_or_else(|| (category_id.to_string(), false));
            CategoryStepView {
                id: category_id.to_string(),
                title,
                questions,
                ends_assessment,
            }
        })
        .collect();

    AssessmentTypeView {
        id: definition.id.to_string(),
        title: definition.title.clone(),
        is_default: &definition.id == catalog.default_type(),
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemorySubmissionGateway;
    use assessment_flow::workflows::assessment::{GuidancePolicy, InMemoryFormStore};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router() -> axum::Router {
        let catalog = Arc::new(AssessmentCatalog::standard());
        let service = Arc::new(AssessmentService::new(
            Arc::clone(&catalog),
            Arc::new(InMemoryFormStore::default()),
            Arc::new(InMemorySubmissionGateway::default()),
            GuidancePolicy::default(),
        ));
        with_assessment_routes(service, catalog)
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn catalog_endpoint_lists_types_with_organization_first() {
        let response = router()
            .oneshot(
                Request::get("/api/v1/catalog/quick")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["steps"][0]["id"], "organization");
        assert_eq!(body["steps"][1]["id"], "governance");
        assert_eq!(body["is_default"], false);
    }

    #[tokio::test]
    async fn unknown_type_returns_not_found() {
        let response = router()
            .oneshot(
                Request::get("/api/v1/catalog/audit")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn type_view_flags_the_terminal_category() {
        let catalog = AssessmentCatalog::standard();
        let view = assessment_type_view(&catalog, &AssessmentTypeId::new("comprehensive"));

        assert!(view.is_default);
        let last = view.steps.last().expect("steps");
        assert_eq!(last.id, "data_management");
        assert!(last.ends_assessment);
    }
}
