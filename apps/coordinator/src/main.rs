use actix_web::{web, App, HttpServer};
use coordinator::config::Config;
use coordinator::infra::state::build_state;
use coordinator::middleware::{RequestTrace, StructuredLogger, TraceSpan};
use coordinator::routes;
use coordinator::telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = telemetry::init_tracing(config.log_format) {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
    let host = config.host.clone();
    let port = config.port;

    println!("🚀 Starting session coordinator on http://{}:{}", host, port);
    println!("   backend: {}", config.gateway.endpoint);

    let app_state = match build_state().with_config(config).build() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("❌ Failed to build application state: {e}");
            std::process::exit(1);
        }
    };

    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
