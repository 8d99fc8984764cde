use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use restaurant_menu::config::Config;

mod api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::from_env()?;
    cfg.setup_logging()?;

    let state = web::Data::new(api::ApiState::new(cfg.open_store().await?));
    let origin = cfg.cors_origin.clone();

    tracing::info!("serving the menu on {}", cfg.api_bind);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allowed_origin(&origin)
                    .allow_any_method()
                    .allow_any_header(),
            )
            .configure(api::routes)
    })
    .bind(cfg.api_bind.as_str())?
    .run()
    .await?;
    Ok(())
}
