use actix_web::HttpResponse;

#[utoipa::path(
    get,
    path = "/health_check",
    tag = "ops",
    responses((status = 200, description = "The service is up"))
)]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}
