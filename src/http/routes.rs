use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::http::handlers;
use crate::http::state::AppState;

/// Builds the complete command-surface router. Middleware (CORS, tracing)
/// is attached by `main.rs` so tests can exercise the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/add/{username}/{money}/{trans}", get(handlers::add))
        .route(
            "/api/getQuote/{username}/{symbol}/{trans}",
            get(handlers::get_quote),
        )
        .route(
            "/api/buy/{username}/{symbol}/{amount}/{trans}",
            get(handlers::buy),
        )
        .route("/api/commitBuy/{username}/{trans}", get(handlers::commit_buy))
        .route("/api/cancelBuy/{username}/{trans}", get(handlers::cancel_buy))
        .route(
            "/api/sell/{username}/{symbol}/{amount}/{trans}",
            get(handlers::sell),
        )
        .route(
            "/api/commitSell/{username}/{trans}",
            get(handlers::commit_sell),
        )
        .route(
            "/api/cancelSell/{username}/{trans}",
            get(handlers::cancel_sell),
        )
        .route(
            "/api/setBuyAmount/{username}/{symbol}/{amount}/{trans}",
            get(handlers::set_buy_amount),
        )
        .route(
            "/api/setBuyTrigger/{username}/{symbol}/{triggerPrice}/{trans}",
            get(handlers::set_buy_trigger),
        )
        .route(
            "/api/cancelSetBuy/{username}/{symbol}/{trans}",
            get(handlers::cancel_set_buy),
        )
        .route(
            "/api/setSellAmount/{username}/{symbol}/{amount}/{trans}",
            get(handlers::set_sell_amount),
        )
        .route(
            "/api/setSellTrigger/{username}/{symbol}/{triggerPrice}/{trans}",
            get(handlers::set_sell_trigger),
        )
        .route(
            "/api/cancelSetSell/{username}/{symbol}/{trans}",
            get(handlers::cancel_set_sell),
        )
        .route("/api/dumplog/{filename}/{trans}", get(handlers::dumplog))
        .route(
            "/api/dumplog/{filename}/{username}/{trans}",
            get(handlers::dumplog_for_user),
        )
        .route(
            "/api/displaySummary/{username}/{trans}",
            get(handlers::display_summary),
        )
        .with_state(state)
}
