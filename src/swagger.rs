use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::promotion::create_promotion,
        handlers::promotion::list_promotions,
        handlers::promotion::get_promotion,
        handlers::promotion::deactivate_promotion,
        handlers::promotion::claim_promotion,
        handlers::coupon::get_my_coupons,
        handlers::coupon::get_coupon,
        handlers::coupon::get_coupon_history,
        handlers::coupon::gift_coupon,
        handlers::redemption::issue_redemption_token,
        handlers::redemption::finalize_redemption,
        handlers::listing::create_listing,
        handlers::listing::list_listings,
        handlers::listing::get_listing,
        handlers::listing::cancel_listing,
        handlers::listing::buy_listing,
        handlers::auction::create_auction,
        handlers::auction::list_auctions,
        handlers::auction::get_auction,
        handlers::auction::place_bid,
        handlers::auction::buy_now,
        handlers::auction::settle_auction,
        handlers::auction::cancel_auction,
        handlers::staking::stake_coupon,
        handlers::staking::get_my_stakes,
        handlers::staking::get_stake,
        handlers::staking::claim_rewards,
        handlers::staking::unstake,
        handlers::group_deal::create_group_deal,
        handlers::group_deal::get_group_deal,
        handlers::group_deal::join_group_deal,
        handlers::group_deal::convert_group_deal,
    ),
    components(
        schemas(
            Promotion,
            CreatePromotionRequest,
            PromotionQuery,
            Coupon,
            CouponState,
            CouponQuery,
            TransferReason,
            TransferRecord,
            GiftCouponRequest,
            RedemptionToken,
            FinalizeRedemptionRequest,
            Listing,
            CreateListingRequest,
            ListingQuery,
            Auction,
            AuctionStatus,
            Bid,
            CreateAuctionRequest,
            PlaceBidRequest,
            SettleAuctionResponse,
            AuctionQuery,
            StakePosition,
            StakeStatus,
            StakeRequest,
            ClaimRewardsResponse,
            StakeQuery,
            GroupDeal,
            GroupDealTier,
            GroupParticipant,
            CreateGroupDealRequest,
            GroupDealResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "promotion", description = "Promotion catalog API"),
        (name = "coupon", description = "Coupon ledger API"),
        (name = "redemption", description = "Redemption token API"),
        (name = "listing", description = "Marketplace listing API"),
        (name = "auction", description = "Auction API"),
        (name = "staking", description = "Coupon staking API"),
        (name = "group_deal", description = "Group deal API"),
    ),
    info(
        title = "Agora Deals Backend API",
        version = "1.0.0",
        description = "Coupon lifecycle and marketplace REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_engine_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/auctions/{id}/bids"));
        assert!(doc.paths.paths.contains_key("/redemptions/finalize"));
        assert!(doc.paths.paths.contains_key("/group-deals/{id}/convert"));
    }
}
