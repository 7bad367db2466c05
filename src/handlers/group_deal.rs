use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

use super::get_user_id_from_request;
use crate::models::*;
use crate::services::GroupDealService;

#[utoipa::path(
    post,
    path = "/group-deals",
    tag = "group_deal",
    request_body = CreateGroupDealRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "发起拼团成功", body = GroupDeal),
        (status = 400, description = "档位配置无效")
    )
)]
pub async fn create_group_deal(
    group_deal_service: web::Data<GroupDealService>,
    req: HttpRequest,
    request: web::Json<CreateGroupDealRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match group_deal_service
        .create_group_deal(&user_id, request.into_inner())
        .await
    {
        Ok(deal) => Ok(HttpResponse::Ok().json(ApiResponse::success(deal))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/group-deals/{id}",
    tag = "group_deal",
    params(
        ("id" = Uuid, Path, description = "拼团ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取拼团及当前折扣成功", body = GroupDealResponse),
        (status = 404, description = "拼团不存在")
    )
)]
pub async fn get_group_deal(
    group_deal_service: web::Data<GroupDealService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match group_deal_service.get(path.into_inner()).await {
        Ok(view) => Ok(HttpResponse::Ok().json(ApiResponse::success(view))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/group-deals/{id}/join",
    tag = "group_deal",
    params(
        ("id" = Uuid, Path, description = "拼团ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "加入成功，重复加入不计数", body = GroupDeal),
        (status = 409, description = "拼团已满"),
        (status = 410, description = "拼团已结束")
    )
)]
pub async fn join_group_deal(
    group_deal_service: web::Data<GroupDealService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match group_deal_service.join(path.into_inner(), &user_id).await {
        Ok(deal) => Ok(HttpResponse::Ok().json(ApiResponse::success(deal))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/group-deals/{id}/convert",
    tag = "group_deal",
    params(
        ("id" = Uuid, Path, description = "拼团ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "按冻结折扣领券成功", body = Coupon),
        (status = 404, description = "未参与该拼团"),
        (status = 409, description = "拼团尚未结束")
    )
)]
pub async fn convert_group_deal(
    group_deal_service: web::Data<GroupDealService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match group_deal_service
        .convert_to_claim(path.into_inner(), &user_id)
        .await
    {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn group_deal_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/group-deals")
            .route("", web::post().to(create_group_deal))
            .route("/{id}", web::get().to(get_group_deal))
            .route("/{id}/join", web::post().to(join_group_deal))
            .route("/{id}/convert", web::post().to(convert_group_deal)),
    );
}
