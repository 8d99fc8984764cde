use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use restaurant_menu::data::Dish;
use restaurant_menu::db::NotFound;
use restaurant_menu::form::{CommentForm, CommentInput, FormErrors, RATING_RANGE};
use restaurant_menu::service::{DishService, LeaderService, Store};

pub(super) struct ApiState {
    store: Store,
}

impl ApiState {
    pub(super) fn new(store: Store) -> Self {
        Self { store }
    }
}

#[derive(serde::Serialize)]
struct ErrJsonResp {
    message: String,
}

#[derive(serde::Serialize)]
struct FormErrJsonResp {
    message: String,
    errors: FormErrors,
}

fn error_response(err: anyhow::Error) -> HttpResponse {
    let message = err.to_string();
    if err.downcast_ref::<NotFound>().is_some() {
        HttpResponse::NotFound().json(ErrJsonResp { message })
    } else {
        tracing::error!("fail to serve request: {err:#}");
        HttpResponse::InternalServerError().json(ErrJsonResp { message })
    }
}

fn respond<T: serde::Serialize>(result: anyhow::Result<T>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(err) => error_response(err),
    }
}

fn respond_some<T: serde::Serialize>(
    result: anyhow::Result<Option<T>>,
    what: &str,
) -> HttpResponse {
    match result {
        Ok(Some(value)) => HttpResponse::Ok().json(value),
        Ok(None) => HttpResponse::NotFound().json(ErrJsonResp {
            message: format!("no featured {what}"),
        }),
        Err(err) => error_response(err),
    }
}

/// Unreadable bodies get the same JSON error shape as every other failure.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let resp = HttpResponse::BadRequest().json(ErrJsonResp {
        message: err.to_string(),
    });
    InternalError::from_response(err, resp).into()
}

/// Order matters: the literal dish routes have to be tried before `/dishes/{id}`.
pub(super) fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(list_leaders)
        .service(featured_leader)
        .service(list_dishes)
        .service(list_dish_ids)
        .service(featured_dish)
        .service(dish_by_id)
        .service(put_dish)
        .service(post_comment);
}

#[actix_web::get("/api/v1/leaders")]
async fn list_leaders(data: web::Data<ApiState>) -> HttpResponse {
    respond(data.store.get_leaders().await)
}

#[actix_web::get("/api/v1/leaders/featured")]
async fn featured_leader(data: web::Data<ApiState>) -> HttpResponse {
    respond_some(data.store.get_featured_leader().await, "leader")
}

#[actix_web::get("/api/v1/dishes")]
async fn list_dishes(data: web::Data<ApiState>) -> HttpResponse {
    respond(data.store.get_dishes().await)
}

#[actix_web::get("/api/v1/dishes/ids")]
async fn list_dish_ids(data: web::Data<ApiState>) -> HttpResponse {
    respond(data.store.get_dish_ids().await)
}

#[actix_web::get("/api/v1/dishes/featured")]
async fn featured_dish(data: web::Data<ApiState>) -> HttpResponse {
    respond_some(data.store.get_featured_dish().await, "dish")
}

#[derive(serde::Deserialize)]
struct DishPath {
    id: i64,
}

#[actix_web::get("/api/v1/dishes/{id}")]
async fn dish_by_id(data: web::Data<ApiState>, path: web::Path<DishPath>) -> HttpResponse {
    respond(data.store.get_dish(path.id).await)
}

#[actix_web::put("/api/v1/dishes/{id}")]
async fn put_dish(
    data: web::Data<ApiState>,
    path: web::Path<DishPath>,
    body: web::Json<Dish>,
) -> HttpResponse {
    let mut dish = body.into_inner();
    dish.id = path.id;
    if dish.comments.iter().any(|c| !RATING_RANGE.contains(&c.rating)) {
        return HttpResponse::BadRequest().json(ErrJsonResp {
            message: "Rating must be between 1 and 5.".to_string(),
        });
    }
    respond(data.store.save_dish(&dish).await)
}

#[actix_web::post("/api/v1/dishes/{id}/comments")]
async fn post_comment(
    data: web::Data<ApiState>,
    path: web::Path<DishPath>,
    body: web::Json<CommentInput>,
) -> HttpResponse {
    let mut form = CommentForm::from(body.into_inner());
    let comment = match form.build(Utc::now()) {
        Ok(comment) => comment,
        Err(errors) => {
            return HttpResponse::BadRequest().json(FormErrJsonResp {
                message: errors.to_string(),
                errors,
            })
        }
    };

    match data.store.add_comment(path.id, &comment).await {
        Ok(saved) => HttpResponse::Created().json(saved),
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use restaurant_menu::db;

    async fn state() -> web::Data<ApiState> {
        let pool = db::connect_in_memory().await.unwrap();
        db::seed(&pool, &db::Seed::bundled().unwrap()).await.unwrap();
        web::Data::new(ApiState::new(Store::new(pool)))
    }

    #[actix_web::test]
    async fn test_dish_ids_before_dish_route() {
        let app = test::init_service(App::new().app_data(state().await).configure(routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/dishes/ids").to_request();
        let ids: Vec<i64> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids, vec![0, 1, 2, 3]);

        let req = test::TestRequest::get().uri("/api/v1/dishes/featured").to_request();
        let dish: Dish = test::call_and_read_body_json(&app, req).await;
        assert_eq!(dish.name, "Uthappizza");
    }

    #[actix_web::test]
    async fn test_get_dish() {
        let app = test::init_service(App::new().app_data(state().await).configure(routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/dishes/1").to_request();
        let dish: Dish = test::call_and_read_body_json(&app, req).await;
        assert_eq!(dish.name, "Zucchipakoda");
        assert_eq!(dish.comments.len(), 2);

        let req = test::TestRequest::get().uri("/api/v1/dishes/8").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_leaders() {
        let app = test::init_service(App::new().app_data(state().await).configure(routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/leaders").to_request();
        let leaders: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(leaders.len(), 4);
        assert_eq!(leaders[0]["role"], "Chief Epicurious Officer");
    }

    #[actix_web::test]
    async fn test_add_comment() {
        let app = test::init_service(App::new().app_data(state().await).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/dishes/3/comments")
            .set_json(serde_json::json!({
                "author": "Ringo Starry",
                "rating": 4,
                "comment": "Ultimate, Reaching for the stars!"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let dish: Dish = test::read_body_json(resp).await;
        assert_eq!(dish.comments.len(), 1);
        assert_eq!(dish.comments[0].author, "Ringo Starry");
    }

    #[actix_web::test]
    async fn test_add_invalid_comment() {
        let app = test::init_service(App::new().app_data(state().await).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/dishes/3/comments")
            .set_json(serde_json::json!({ "author": "R", "comment": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(
            body["errors"]["author"],
            "Name must be at least 2 characters long."
        );
        assert_eq!(body["errors"]["comment"], "Your comments are required.");
    }

    #[actix_web::test]
    async fn test_save_dish() {
        let app = test::init_service(App::new().app_data(state().await).configure(routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/dishes/2").to_request();
        let mut dish: Dish = test::call_and_read_body_json(&app, req).await;
        dish.price = 2.49;
        dish.comments.clear();

        let req = test::TestRequest::put()
            .uri("/api/v1/dishes/2")
            .set_json(&dish)
            .to_request();
        let saved: Dish = test::call_and_read_body_json(&app, req).await;
        assert_eq!(saved, dish);

        let req = test::TestRequest::put()
            .uri("/api/v1/dishes/20")
            .set_json(&dish)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_comment_without_author() {
        let app = test::init_service(App::new().app_data(state().await).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/dishes/3/comments")
            .set_json(serde_json::json!({ "comment": "Nice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["author"], "Name is required.");
        assert_eq!(body["message"], "Name is required.");
    }

    #[actix_web::test]
    async fn test_comment_with_text_rating() {
        let app = test::init_service(App::new().app_data(state().await).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/dishes/3/comments")
            .set_json(serde_json::json!({ "author": "Paul", "rating": "5", "comment": "Nice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/v1/dishes/3/comments")
            .set_json(serde_json::json!({ "author": "Paul", "rating": 300, "comment": "Nice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["rating"], "Rating must be between 1 and 5.");
    }

    #[actix_web::test]
    async fn test_unreadable_body_is_json_error() {
        let app = test::init_service(App::new().app_data(state().await).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/dishes/3/comments")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"author\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().starts_with("Json deserialize error"));

        let req = test::TestRequest::put()
            .uri("/api/v1/dishes/2")
            .set_json(serde_json::json!({ "name": "Vadonut" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"].is_string());
    }

    #[actix_web::test]
    async fn test_comment_on_unknown_dish() {
        let app = test::init_service(App::new().app_data(state().await).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/dishes/42/comments")
            .set_json(serde_json::json!({ "author": "Paul", "comment": "Nice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
