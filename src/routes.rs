use crate::{
    api::{attendance, justification},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// Helper to build per-scope limiter
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let scope = web::scope(&config.api_prefix).wrap(from_fn(auth_middleware)); // authentication

    match build_limiter(config.rate_protected_per_min) {
        Some(limiter) => cfg.service(scope.wrap(limiter).configure(api_routes)), // rate limiting
        None => {
            tracing::warn!(rate = config.rate_protected_per_min, "Invalid rate limit, limiter disabled");
            cfg.service(scope.configure(api_routes))
        }
    };
}

/// Every authenticated route, relative to the API prefix.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attendance")
            // /attendance/check-in
            .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
            // /attendance/check-out
            .service(web::resource("/check-out").route(web::post().to(attendance::check_out)))
            // /attendance/today
            .service(web::resource("/today").route(web::get().to(attendance::today)))
            // /attendance/nearest-zone
            .service(
                web::resource("/nearest-zone").route(web::post().to(attendance::nearest_zone)),
            ),
    )
    .service(
        web::scope("/justifications")
            // /justifications
            .service(
                web::resource("")
                    .route(web::post().to(justification::submit_justification))
                    .route(web::get().to(justification::list_justifications)),
            )
            // /justifications/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(justification::get_justification))
                    .route(web::put().to(justification::update_justification))
                    .route(web::delete().to(justification::withdraw_justification)),
            )
            // /justifications/{id}/approve
            .service(
                web::resource("/{id}/approve")
                    .route(web::put().to(justification::approve_justification)),
            )
            // /justifications/{id}/reject
            .service(
                web::resource("/{id}/reject")
                    .route(web::put().to(justification::reject_justification)),
            ),
    );
}

/// App over a memory store, without the rate limiter (test requests carry no peer address).
#[cfg(test)]
macro_rules! test_app {
    ($store:expr, $clock:expr) => {{
        let store: std::sync::Arc<$crate::repository::memory::MemoryStore> = $store;
        let clock: std::sync::Arc<dyn $crate::service::clock::Clock> = $clock;
        let config = $crate::config::testing::config();

        let registrar = $crate::service::registrar::fixtures::registrar(store.clone());
        let workflow = $crate::service::justification::JustificationWorkflow::new(
            store.clone(),
            store.clone(),
            clock.clone(),
            config.justification_max_days,
        );

        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(config.clone()))
                .app_data(actix_web::web::Data::new(registrar))
                .app_data(actix_web::web::Data::new(workflow))
                .app_data(actix_web::web::Data::from(clock))
                .service(
                    actix_web::web::scope(&config.api_prefix)
                        .wrap(actix_web::middleware::from_fn(
                            $crate::auth::middleware::auth_middleware,
                        ))
                        .configure($crate::routes::api_routes),
                ),
        )
        .await
    }};
}

#[cfg(test)]
pub(crate) use test_app;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_configured_rates() {
        assert!(build_limiter(1000).is_some());
        assert!(build_limiter(0).is_some());
        assert!(build_limiter(120_000).is_some());
    }
}
