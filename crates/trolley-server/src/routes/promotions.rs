//! Personalised offers, ranked promotions and adding a promotion to a card.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Response,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{BRAND_ZA, BRAND_ZA_LOWER, forward};
use crate::error::BffError;
use crate::server::AppState;
use crate::upstream::{QueryString, UpstreamRequest};

#[derive(Debug, Default, Deserialize)]
pub struct OffersParams {
    pub uid: Option<String>,
    pub storecode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RankedParams {
    pub uid: Option<String>,
    /// CHECKERS_RES, CHECKERS_ROF, CHECKERS_PER or CHECKERS_RD
    pub scenariotype: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddPromotionParams {
    pub uid: Option<String>,
    pub promotionid: Option<String>,
    /// YYYY-MM-DD
    pub startdate: Option<String>,
    /// YYYY-MM-DD
    pub enddate: Option<String>,
}

pub fn add_promotion_payload(params: &AddPromotionParams) -> Value {
    json!({
        "promotionItemList": [{
            "promotionId": params.promotionid.as_deref().unwrap_or_default(),
            "registrationStartDate": params.startdate.as_deref().unwrap_or_default(),
            "registrationEndDate": params.enddate.as_deref().unwrap_or_default(),
        }]
    })
}

/// `GET /backend/promotions/offersforyou?uid=&storecode=`
pub async fn offers_for_you(
    State(state): State<AppState>,
    query: Result<Query<OffersParams>, QueryRejection>,
) -> Result<Response, BffError> {
    let Query(params) = query?;

    let request = UpstreamRequest::get(format!("{BRAND_ZA}/offers/promotions/household"))
        .query(
            QueryString::new()
                .param("uid", params.uid.as_deref().unwrap_or_default())
                .param("offerType", "FOR_YOU")
                .param(
                    "preferredStoreId",
                    params.storecode.as_deref().unwrap_or_default(),
                ),
        )
        .bearer();
    forward(&state, request, "offers for you").await
}

/// `GET /backend/promotions/ranked?uid=&scenariotype=`
pub async fn ranked(
    State(state): State<AppState>,
    query: Result<Query<RankedParams>, QueryRejection>,
) -> Result<Response, BffError> {
    let Query(params) = query?;

    let request = UpstreamRequest::get(format!("{BRAND_ZA}/promotions/ranked"))
        .query(
            QueryString::new()
                .param("uid", params.uid.as_deref().unwrap_or_default())
                .param("tacticId", "GEN")
                .param("channel", "ALL")
                .param(
                    "scenarioType",
                    params.scenariotype.as_deref().unwrap_or_default(),
                ),
        )
        .bearer();
    forward(&state, request, "ranked promotions").await
}

/// `POST /backend/promotions/add?uid=&promotionid=&startdate=&enddate=`
pub async fn add(
    State(state): State<AppState>,
    query: Result<Query<AddPromotionParams>, QueryRejection>,
) -> Result<Response, BffError> {
    let Query(params) = query?;

    let request = UpstreamRequest::post(format!("{BRAND_ZA_LOWER}/customers/promotions"))
        .query(QueryString::new().param("uid", params.uid.as_deref().unwrap_or_default()))
        .json(add_promotion_payload(&params))
        .bearer();
    forward(&state, request, "add promotion").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_promotion_payload() {
        let params = AddPromotionParams {
            uid: Some("00001MC6".into()),
            promotionid: Some("200939716".into()),
            startdate: Some("2020-03-07".into()),
            enddate: Some("2020-04-07".into()),
        };
        assert_eq!(
            add_promotion_payload(&params),
            json!({
                "promotionItemList": [{
                    "promotionId": "200939716",
                    "registrationStartDate": "2020-03-07",
                    "registrationEndDate": "2020-04-07"
                }]
            })
        );
    }
}
