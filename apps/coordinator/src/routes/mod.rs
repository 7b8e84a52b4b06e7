use actix_web::web;

pub mod health;
pub mod realtime;

/// Register every route. `main.rs` and the integration tests share this.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Health check routes: /health, /health/ready
    cfg.service(web::scope("/health").configure(health::configure_routes));

    // Realtime channel: /ws
    cfg.configure(realtime::configure_routes);
}
