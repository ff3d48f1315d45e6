use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/content", content_routes())
        .nest("/purchases", purchase_routes())
        .nest("/cart", cart_routes())
        .nest("/earnings", earnings_routes())
        .nest("/payouts", payout_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
        .routes(routes!(handlers::auth::update_user_role))
}

fn content_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::content::list_content,
            handlers::content::create_content
        ))
        .routes(routes!(handlers::content::bulk_check_purchased))
        .routes(routes!(
            handlers::content::get_content,
            handlers::content::update_content,
            handlers::content::delete_content
        ))
        .routes(routes!(handlers::content::approve_content))
        .routes(routes!(handlers::content::reject_content))
        .routes(routes!(handlers::content::record_download))
}

fn purchase_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::purchase::list_my_purchases))
        .routes(routes!(handlers::purchase::create_order))
        .routes(routes!(handlers::purchase::verify_payment))
}

fn cart_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::cart::get_cart,
            handlers::cart::clear_cart
        ))
        .routes(routes!(handlers::cart::add_item))
        .routes(routes!(handlers::cart::remove_item))
        .routes(routes!(handlers::cart::checkout))
}

fn earnings_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::earnings::get_my_earnings))
        .routes(routes!(handlers::earnings::get_developer_earnings))
}

fn payout_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::payout::list_payouts,
            handlers::payout::create_payout
        ))
        .routes(routes!(handlers::payout::list_my_payouts))
        .routes(routes!(handlers::payout::get_payout))
        .routes(routes!(handlers::payout::cancel_payout))
        .routes(routes!(handlers::payout::approve_payout))
        .routes(routes!(handlers::payout::reject_payout))
        .routes(routes!(handlers::payout::start_processing_payout))
        .routes(routes!(handlers::payout::complete_payout))
}
