use actix_web::HttpResponse;

pub async fn banner() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Social Media Backend API",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "Server is running" }))
}
