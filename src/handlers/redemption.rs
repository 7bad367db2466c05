use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

use super::get_user_id_from_request;
use crate::models::*;
use crate::services::RedemptionService;

#[utoipa::path(
    post,
    path = "/coupons/{id}/redemption-token",
    tag = "redemption",
    params(
        ("id" = Uuid, Path, description = "券ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "生成核销码成功，旧码作废", body = RedemptionToken),
        (status = 403, description = "不是券的持有人"),
        (status = 409, description = "券当前不可核销")
    )
)]
pub async fn issue_redemption_token(
    redemption_service: web::Data<RedemptionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match redemption_service
        .issue_token(path.into_inner(), &user_id)
        .await
    {
        Ok(token) => Ok(HttpResponse::Ok().json(ApiResponse::success(token))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 商户扫码核销，调用方即商户
#[utoipa::path(
    post,
    path = "/redemptions/finalize",
    tag = "redemption",
    request_body = FinalizeRedemptionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "核销成功", body = Coupon),
        (status = 404, description = "核销码不存在"),
        (status = 409, description = "核销码已使用"),
        (status = 410, description = "核销码已过期")
    )
)]
pub async fn finalize_redemption(
    redemption_service: web::Data<RedemptionService>,
    req: HttpRequest,
    request: web::Json<FinalizeRedemptionRequest>,
) -> Result<HttpResponse> {
    let merchant_id = get_user_id_from_request(&req)?;

    match redemption_service
        .finalize(request.code.trim(), Some(&merchant_id))
        .await
    {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn redemption_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/redemptions").route("/finalize", web::post().to(finalize_redemption)),
    );
}
