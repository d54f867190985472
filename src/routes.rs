// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{config::AppState, handlers, middleware::timeout::request_timeout};

pub fn build_router(app_state: AppState) -> Router {
    let package_routes = Router::new()
        .route(
            "/",
            post(handlers::packages::create_package).get(handlers::packages::list_packages),
        )
        .route(
            "/{id}",
            get(handlers::packages::get_package).patch(handlers::packages::update_package),
        );

    let contract_routes = Router::new()
        .route(
            "/",
            post(handlers::contracts::create_contract).get(handlers::contracts::list_contracts),
        )
        .route("/mine", get(handlers::contracts::list_my_contracts))
        .route("/coach", get(handlers::contracts::list_coach_contracts))
        .route("/{id}", get(handlers::contracts::get_contract))
        .route("/{id}/status", patch(handlers::contracts::update_contract_status))
        .route(
            "/{id}/active-schedules",
            get(handlers::contracts::count_active_schedules),
        );

    let schedule_routes = Router::new()
        .route(
            "/",
            post(handlers::schedules::create_schedule).get(handlers::schedules::list_schedules),
        )
        .route("/mine", get(handlers::schedules::list_my_schedules))
        .route(
            "/{id}",
            get(handlers::schedules::get_schedule).delete(handlers::schedules::delete_schedule),
        )
        .route("/{id}/reschedule", patch(handlers::schedules::reschedule))
        .route("/{id}/confirm", post(handlers::schedules::confirm_reschedule))
        .route("/{id}/complete", post(handlers::schedules::complete_session))
        .route("/{id}/transition", post(handlers::schedules::transition_schedule))
        .route(
            "/{id}/exercises",
            post(handlers::workouts::add_planned_exercise)
                .get(handlers::workouts::list_planned_exercises),
        )
        .route(
            "/{id}/set-logs",
            post(handlers::workouts::log_set).get(handlers::workouts::list_set_logs),
        );

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/packages", package_routes)
        .nest("/api/contracts", contract_routes)
        .nest("/api/schedules", schedule_routes)
        .route("/api/ledger/reconcile", post(handlers::contracts::reconcile_ledger))
        .route(
            "/api/members/{id}/personal-bests",
            get(handlers::workouts::list_personal_bests),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            request_timeout,
        ))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Settings, db::MemoryStore};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    struct Api {
        router: Router,
        tenant: Uuid,
        admin: Uuid,
        coach: Uuid,
        member: Uuid,
        branch: Uuid,
    }

    impl Api {
        fn new() -> Self {
            let state = AppState::with_memory_store(&Settings::in_memory(), MemoryStore::new());
            Self {
                router: build_router(state),
                tenant: Uuid::new_v4(),
                admin: Uuid::new_v4(),
                coach: Uuid::new_v4(),
                member: Uuid::new_v4(),
                branch: Uuid::new_v4(),
            }
        }

        async fn call(
            &self,
            method: &str,
            uri: &str,
            actor: Option<(Uuid, &str)>,
            body: Option<Value>,
        ) -> Response {
            let mut builder = Request::builder()
                .method(method)
                .uri(uri)
                .header("x-tenant-id", self.tenant.to_string());
            if let Some((id, role)) = actor {
                builder = builder
                    .header("x-actor-id", id.to_string())
                    .header("x-actor-role", role);
            }
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.router.clone().oneshot(request).await.unwrap()
        }

        fn admin(&self) -> Option<(Uuid, &'static str)> {
            Some((self.admin, "tenant_admin"))
        }

        fn coach(&self) -> Option<(Uuid, &'static str)> {
            Some((self.coach, "coach"))
        }

        fn member(&self) -> Option<(Uuid, &'static str)> {
            Some((self.member, "member"))
        }

        // Cria modelo + contrato e devolve o id do contrato
        async fn contract(&self, sessions: i32) -> String {
            let template = json_body(
                self.call(
                    "POST",
                    "/api/packages",
                    self.admin(),
                    Some(json!({ "name": "Pacote", "total_sessions": sessions, "price": 450.0 })),
                )
                .await,
            )
            .await;

            let contract = json_body(
                self.call(
                    "POST",
                    "/api/contracts",
                    self.admin(),
                    Some(json!({
                        "package_id": template["id"],
                        "member_id": self.member,
                        "coach_id": self.coach,
                        "branch_id": self.branch,
                    })),
                )
                .await,
            )
            .await;
            contract["id"].as_str().unwrap().to_string()
        }

        async fn book(&self, contract_id: &str, client_id: Option<&str>) -> Response {
            self.call(
                "POST",
                "/api/schedules",
                self.coach(),
                Some(json!({
                    "contract_id": contract_id,
                    "member_id": self.member,
                    "branch_id": self.branch,
                    "client_id": client_id,
                    "start_time": "2030-01-10T10:00:00Z",
                })),
            )
            .await
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let api = Api::new();
        let response = api.call("GET", "/api/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_actor_headers_is_unauthorized() {
        let api = Api::new();
        let response = api
            .call("POST", "/api/packages", None, Some(json!({ "name": "X" })))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn member_cannot_create_packages() {
        let api = Api::new();
        let response = api
            .call(
                "POST",
                "/api/packages",
                api.member(),
                Some(json!({ "name": "Pacote", "total_sessions": 10, "price": 1.0 })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["code"], "INSUFFICIENT_ROLE");
    }

    #[tokio::test]
    async fn invalid_tier_is_bad_request() {
        let api = Api::new();
        let response = api
            .call(
                "POST",
                "/api/packages",
                api.admin(),
                Some(json!({ "name": "Pacote", "total_sessions": 12, "price": 1.0 })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_SESSION_AMOUNT");
    }

    #[tokio::test]
    async fn booking_and_completion_flow() {
        let api = Api::new();
        let contract_id = api.contract(10).await;

        let response = api.book(&contract_id, Some("01HZXROUTE")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let schedule = json_body(response).await;
        assert_eq!(schedule["status"], "Scheduled");
        assert_eq!(schedule["end_time"], "2030-01-10T11:00:00Z");

        let active = json_body(
            api.call(
                "GET",
                &format!("/api/contracts/{}/active-schedules", contract_id),
                api.coach(),
                None,
            )
            .await,
        )
        .await;
        assert_eq!(active["active_schedules"], 1);

        // Conclusão pelo client_id
        let response = api
            .call("POST", "/api/schedules/01HZXROUTE/complete", api.coach(), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let done = json_body(response).await;
        assert_eq!(done["schedule"]["status"], "Completed");
        assert_eq!(done["contract"]["remaining_sessions"], 9);

        let again = api
            .call("POST", "/api/schedules/01HZXROUTE/complete", api.coach(), None)
            .await;
        assert_eq!(again.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(again).await["code"], "ALREADY_COMPLETED");
    }

    #[tokio::test]
    async fn member_reschedule_waits_for_coach() {
        let api = Api::new();
        let contract_id = api.contract(10).await;
        let schedule = json_body(api.book(&contract_id, None).await).await;
        let id = schedule["id"].as_str().unwrap();

        let moved = json_body(
            api.call(
                "PATCH",
                &format!("/api/schedules/{}/reschedule", id),
                api.member(),
                Some(json!({
                    "start_time": "2030-01-11T10:00:00Z",
                    "end_time": "2030-01-11T11:00:00Z",
                })),
            )
            .await,
        )
        .await;
        assert_eq!(moved["status"], "Pending_Confirmation");

        let confirmed = json_body(
            api.call("POST", &format!("/api/schedules/{}/confirm", id), api.coach(), None)
                .await,
        )
        .await;
        assert_eq!(confirmed["status"], "Scheduled");
    }

    #[tokio::test]
    async fn no_show_then_delete_is_rejected() {
        let api = Api::new();
        let contract_id = api.contract(10).await;
        let schedule = json_body(api.book(&contract_id, None).await).await;
        let id = schedule["id"].as_str().unwrap();

        let response = api
            .call(
                "POST",
                &format!("/api/schedules/{}/transition", id),
                api.admin(),
                Some(json!({ "action": "no_show" })),
            )
            .await;
        assert_eq!(json_body(response).await["status"], "No-Show");

        let response = api
            .call("DELETE", &format!("/api/schedules/{}", id), api.coach(), None)
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["code"], "SCHEDULE_NOT_DELETABLE");
    }

    #[tokio::test]
    async fn delete_scheduled_returns_no_content() {
        let api = Api::new();
        let contract_id = api.contract(10).await;
        let schedule = json_body(api.book(&contract_id, None).await).await;
        let id = schedule["id"].as_str().unwrap();

        let response = api
            .call("DELETE", &format!("/api/schedules/{}", id), api.coach(), None)
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = api
            .call("GET", &format!("/api/schedules/{}", id), api.coach(), None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn depleted_status_cannot_be_requested() {
        let api = Api::new();
        let contract_id = api.contract(10).await;
        let response = api
            .call(
                "PATCH",
                &format!("/api/contracts/{}/status", contract_id),
                api.admin(),
                Some(json!({ "status": "Depleted" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["code"], "DERIVED_STATUS");
    }

    #[tokio::test]
    async fn set_logs_feed_personal_bests() {
        let api = Api::new();
        let contract_id = api.contract(10).await;
        let schedule = json_body(api.book(&contract_id, None).await).await;
        let id = schedule["id"].as_str().unwrap();
        let exercise_id = Uuid::new_v4();

        let planned = json_body(
            api.call(
                "POST",
                &format!("/api/schedules/{}/exercises", id),
                api.coach(),
                Some(json!({ "exercise_id": exercise_id, "target_sets": 3, "target_reps": 5 })),
            )
            .await,
        )
        .await;

        let response = api
            .call(
                "POST",
                &format!("/api/schedules/{}/set-logs", id),
                api.coach(),
                Some(json!({
                    "planned_exercise_id": planned["id"],
                    "set_index": 1,
                    "weight": 80.0,
                    "reps": 5,
                    "completed": true,
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let done = json_body(
            api.call("POST", &format!("/api/schedules/{}/complete", id), api.coach(), None)
                .await,
        )
        .await;
        assert_eq!(done["new_personal_bests"][0], exercise_id.to_string());

        let pbs = json_body(
            api.call(
                "GET",
                &format!("/api/members/{}/personal-bests", api.member),
                api.member(),
                None,
            )
            .await,
        )
        .await;
        assert_eq!(pbs[0]["weight"], 80.0);

        // Mesmo aluno visto de outro tenant: nenhum recorde
        let foreign = Api {
            router: api.router.clone(),
            tenant: Uuid::new_v4(),
            ..api
        };
        let pbs = json_body(
            foreign
                .call(
                    "GET",
                    &format!("/api/members/{}/personal-bests", foreign.member),
                    foreign.member(),
                    None,
                )
                .await,
        )
        .await;
        assert_eq!(pbs, json!([]));
    }

    #[tokio::test]
    async fn reconcile_with_nothing_pending() {
        let api = Api::new();
        let report = json_body(
            api.call("POST", "/api/ledger/reconcile", api.admin(), None)
                .await,
        )
        .await;
        assert_eq!(report["replayed"], json!([]));
        assert_eq!(report["failed"], json!([]));
        assert_eq!(report["reservations_resynced"], json!([]));
    }
}
