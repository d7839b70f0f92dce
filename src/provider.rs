//! Outbound calls to the Kakao profile API and the listing-details provider.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use log::{error, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::validation::NumberOrText;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct KakaoProfile {
    pub id: i64,
    #[serde(default)]
    pub kakao_account: KakaoAccount,
}

#[derive(Debug, Default, Deserialize)]
pub struct KakaoAccount {
    pub email: Option<String>,
    pub gender: Option<String>,
    pub birthday: Option<String>,
    pub profile: Option<KakaoProfileImage>,
}

#[derive(Debug, Deserialize)]
pub struct KakaoProfileImage {
    pub profile_image_url: Option<String>,
}

impl KakaoProfile {
    pub fn email(&self) -> Option<&str> {
        self.kakao_account
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    pub fn profile_url(&self) -> Option<String> {
        self.kakao_account
            .profile
            .as_ref()
            .and_then(|p| p.profile_image_url.clone())
    }
}

fn client() -> Result<Client, AppError> {
    Client::builder().timeout(PROVIDER_TIMEOUT).build().map_err(|e| {
        error!("http client build failed: {}", e);
        AppError::system_exception()
    })
}

pub async fn fetch_kakao_profile(config: &AppConfig, access_token: &str) -> Result<KakaoProfile, AppError> {
    let resp = client()?
        .get(config.kakao_profile_url())
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| {
            error!("kakao request failed: {}", e);
            AppError::upstream()
        })?;

    let status = resp.status();
    if [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN, StatusCode::BAD_REQUEST].contains(&status) {
        warn!("kakao rejected access token: {}", status);
        return Err(AppError::invalid_token());
    }
    if !status.is_success() {
        error!("kakao answered {}", status);
        return Err(AppError::upstream());
    }

    resp.json::<KakaoProfile>().await.map_err(|e| {
        error!("kakao payload unreadable: {}", e);
        AppError::upstream()
    })
}

/// Listing details as served by the provider. Numeric fields may arrive as
/// strings.
#[derive(Debug, Deserialize)]
pub struct Listing {
    pub id: Option<NumberOrText>,
    pub name: String,
    pub city: Option<String>,
    pub category: String,
    pub capacity: NumberOrText,
    pub price: NumberOrText,
    pub min_date: Option<NumberOrText>,
    #[serde(default)]
    pub is_refund: bool,
    #[serde(default)]
    pub able_time: Vec<String>,
    #[serde(default)]
    pub disable_date: Vec<String>,
    /// `[name, image]` pairs.
    #[serde(default)]
    pub amenity: Vec<Vec<String>>,
    pub address: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub struct ListingAmenity {
    pub name: String,
    pub image: Option<String>,
}

/// A listing with every field checked and converted to storage types.
#[derive(Debug)]
pub struct RoomPlan {
    pub listing_id: Option<i64>,
    pub name: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub category: String,
    pub capacity: i32,
    pub price: i64,
    pub min_date: i32,
    pub is_refund: bool,
    pub able_times: Vec<NaiveTime>,
    pub disable_dates: Vec<NaiveDate>,
    pub amenities: Vec<ListingAmenity>,
    pub images: Vec<String>,
}

impl Listing {
    pub fn into_plan(self) -> Result<RoomPlan, AppError> {
        let invalid = || AppError::bad_request("INVALID LISTING");

        let name = self.name.trim().to_string();
        let category = self.category.trim().to_string();
        if name.is_empty() || category.is_empty() {
            return Err(invalid());
        }

        let capacity = self
            .capacity
            .to_i64()
            .and_then(|v| i32::try_from(v).ok())
            .filter(|v| *v > 0)
            .ok_or_else(invalid)?;
        let price = self.price.to_i64().filter(|v| *v >= 0).ok_or_else(invalid)?;
        let min_date = match self.min_date {
            Some(v) => v
                .to_i64()
                .and_then(|v| i32::try_from(v).ok())
                .filter(|v| *v > 0)
                .ok_or_else(invalid)?,
            None => 1,
        };
        let listing_id = match self.id {
            Some(v) => Some(v.to_i64().ok_or_else(invalid)?),
            None => None,
        };

        let able_times = self
            .able_time
            .iter()
            .map(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M").map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut disable_dates = self
            .disable_date
            .iter()
            .map(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        disable_dates.sort();
        disable_dates.dedup();

        let mut amenities: Vec<ListingAmenity> = Vec::with_capacity(self.amenity.len());
        for pair in self.amenity {
            let mut it = pair.into_iter();
            let name = it.next().map(|n| n.trim().to_string()).filter(|n| !n.is_empty()).ok_or_else(invalid)?;
            let image = it.next().filter(|i| !i.is_empty());
            if amenities.iter().all(|a| a.name != name) {
                amenities.push(ListingAmenity { name, image });
            }
        }

        Ok(RoomPlan {
            listing_id,
            name,
            city: self.city,
            address: self.address,
            category,
            capacity,
            price,
            min_date,
            is_refund: self.is_refund,
            able_times,
            disable_dates,
            amenities,
            images: self.images.into_iter().filter(|i| !i.trim().is_empty()).collect(),
        })
    }
}

/// Fetches the listing the session owner is registering, forwarding their
/// session token.
pub async fn fetch_listing(config: &AppConfig, session_token: &str) -> Result<Listing, AppError> {
    let resp = client()?
        .get(config.listing_url())
        .header(config.token_header.as_str(), session_token)
        .send()
        .await
        .map_err(|e| {
            error!("listing request failed: {}", e);
            AppError::upstream()
        })?;

    if !resp.status().is_success() {
        error!("listing provider answered {}", resp.status());
        return Err(AppError::upstream());
    }

    let body = resp.json::<serde_json::Value>().await.map_err(|e| {
        error!("listing payload unreadable: {}", e);
        AppError::upstream()
    })?;
    parse_listing(body)
}

/// Well-formed JSON that does not describe a listing is the caller's problem,
/// not the provider's.
fn parse_listing(body: serde_json::Value) -> Result<Listing, AppError> {
    serde_json::from_value(body).map_err(|e| {
        warn!("listing payload rejected: {}", e);
        AppError::bad_request("INVALID LISTING")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(value: serde_json::Value) -> Listing {
        serde_json::from_value(value).unwrap()
    }

    fn sample() -> serde_json::Value {
        json!({
            "id": 1,
            "name": "room",
            "min_date": "123",
            "city": "test_type",
            "category": "test_type",
            "capacity": "123",
            "is_refund": true,
            "price": "40000",
            "able_time": ["11:00", "13:00"],
            "disable_date": ["2021-12-31", "2022-1-1"],
            "amenity": [["test_amenity", "i'm url"], ["test2_amenity", "i'm url2"]],
            "address": "서울특별시 강남구 테헤란로 427 위워크 선릉역2"
        })
    }

    #[test]
    fn string_numbers_are_converted() {
        let plan = listing(sample()).into_plan().unwrap();
        assert_eq!(plan.listing_id, Some(1));
        assert_eq!(plan.capacity, 123);
        assert_eq!(plan.price, 40000);
        assert_eq!(plan.min_date, 123);
        assert!(plan.is_refund);
        assert_eq!(plan.able_times.len(), 2);
        assert_eq!(plan.disable_dates[1], NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(
            plan.amenities[0],
            ListingAmenity { name: "test_amenity".to_string(), image: Some("i'm url".to_string()) }
        );
    }

    #[test]
    fn bad_time_is_rejected() {
        let mut value = sample();
        value["able_time"] = json!(["25:99"]);
        let err = listing(value).into_plan().unwrap_err();
        assert_eq!(err.msg(), "INVALID LISTING");
    }

    #[test]
    fn non_numeric_capacity_is_rejected() {
        let mut value = sample();
        value["capacity"] = json!("many");
        assert!(listing(value).into_plan().is_err());
    }

    #[test]
    fn duplicate_amenities_collapse() {
        let mut value = sample();
        value["amenity"] = json!([["wifi", "a"], ["wifi", "b"], ["tv"]]);
        let plan = listing(value).into_plan().unwrap();
        assert_eq!(plan.amenities.len(), 2);
        assert_eq!(plan.amenities[1].image, None);
    }

    #[test]
    fn integral_float_capacity_is_accepted() {
        let mut value = sample();
        value["capacity"] = json!(2.0);
        let plan = parse_listing(value).unwrap().into_plan().unwrap();
        assert_eq!(plan.capacity, 2);
    }

    #[test]
    fn malformed_listing_shape_is_invalid_listing() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("name");
        assert_eq!(parse_listing(value).unwrap_err().msg(), "INVALID LISTING");

        let mut value = sample();
        value["is_refund"] = json!("true");
        assert_eq!(parse_listing(value).unwrap_err().msg(), "INVALID LISTING");
    }

    #[test]
    fn kakao_email_is_optional() {
        let profile: KakaoProfile = serde_json::from_value(json!({
            "id": 1,
            "kakao_account": {"gender": "M", "birthday": "2021-05-31"}
        }))
        .unwrap();
        assert_eq!(profile.email(), None);

        let profile: KakaoProfile = serde_json::from_value(json!({"id": 2})).unwrap();
        assert_eq!(profile.email(), None);
    }
}
