use actix_web::{web, HttpRequest, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use log::{error, info, warn};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_token, issue_token, AuthUser};
use crate::config::AppConfig;
use crate::entity::{able_time, amenity, category, disable_date, host, image, room, room_amenity, user, wishlist};
use crate::error::AppError;
use crate::provider::{self, RoomPlan};
use crate::response::MessageDto;
use crate::validation::{is_valid_email, is_valid_password, is_valid_phone_number, NumberOrText};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/signup").route(web::post().to(sign_up)))
        .service(web::resource("/signin").route(web::post().to(sign_in)))
        .service(web::resource("/kakao").route(web::get().to(kakao_sign_in)))
        .service(web::resource("/host").route(web::get().to(register_host)))
        .service(web::resource("/wishlist").route(web::get().to(list_wishlist)))
        .service(
            web::resource("/wishlist/{room_id}")
                .route(web::post().to(add_wishlist))
                .route(web::delete().to(remove_wishlist)),
        );
}

#[derive(Deserialize)]
struct SignUpRequest {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    phone_number: NumberOrText,
    sex: Option<String>,
    birthday: Option<String>,
    profile_url: Option<String>,
}

#[derive(Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    message: &'static str,
    access_token: String,
}

#[derive(Serialize)]
struct HostResponse {
    message: &'static str,
    room_id: i64,
}

#[derive(Serialize)]
struct WishlistItemDto {
    room_id: i64,
    name: String,
    city: Option<String>,
    price: i64,
}

async fn sign_up(
    db: web::Data<DatabaseConnection>,
    payload: web::Json<SignUpRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let email = payload.email.trim().to_string();
    let phone_number = payload.phone_number.to_text();

    if !is_valid_email(&email) {
        return Err(AppError::bad_request("INVALID EMAIL"));
    }
    if !is_valid_password(&payload.password) {
        return Err(AppError::bad_request("INVALID PASSWORD"));
    }
    if !is_valid_phone_number(&phone_number) {
        return Err(AppError::bad_request("INVALID PHONE NUMBER"));
    }

    let db = db.get_ref();
    if exists(db, user::Column::Email.eq(email.as_str())).await? {
        return Err(AppError::bad_request("DUPLICATE EMAIL"));
    }
    if exists(db, user::Column::PhoneNumber.eq(phone_number.as_str())).await? {
        return Err(AppError::bad_request("DUPLICATE PHONE_NUMBER"));
    }
    let same_name = user::Column::FirstName
        .eq(payload.first_name.as_str())
        .and(user::Column::LastName.eq(payload.last_name.as_str()));
    if exists(db, same_name).await? {
        return Err(AppError::bad_request("DUPLICATE NAME"));
    }

    let password = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        error!("password hash failed: {}", e);
        AppError::system_exception()
    })?;
    let now = Utc::now();

    let model = user::ActiveModel {
        email: Set(Some(email)),
        password: Set(Some(password)),
        first_name: Set(Some(payload.first_name)),
        last_name: Set(Some(payload.last_name)),
        phone_number: Set(Some(phone_number)),
        sex: Set(payload.sex),
        birthday: Set(payload.birthday),
        profile_url: Set(payload.profile_url),
        is_allowed: Set(true),
        create_at: Set(Some(now)),
        update_at: Set(Some(now)),
        ..Default::default()
    };

    match model.insert(db).await {
        Ok(created) => {
            info!("user {} signed up", created.id);
            Ok(HttpResponse::Ok().json(MessageDto::success()))
        }
        Err(err) => Err(duplicate_from_db_error(err)),
    }
}

async fn exists(db: &DatabaseConnection, cond: sea_orm::sea_query::SimpleExpr) -> Result<bool, AppError> {
    Ok(user::Entity::find().filter(cond).one(db).await?.is_some())
}

/// Maps a unique-constraint failure that raced past the pre-checks.
fn duplicate_from_db_error(err: DbErr) -> AppError {
    let msg = err.to_string();
    if !(msg.contains("UNIQUE") || msg.contains("Duplicate")) {
        return err.into();
    }
    if msg.contains("phone_number") {
        AppError::bad_request("DUPLICATE PHONE_NUMBER")
    } else if msg.contains("first_name") || msg.contains("last_name") {
        AppError::bad_request("DUPLICATE NAME")
    } else {
        AppError::bad_request("DUPLICATE EMAIL")
    }
}

async fn sign_in(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<SignInRequest>,
) -> Result<HttpResponse, AppError> {
    let invalid_user = || AppError::unauthorized("INVALID_USER");

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.trim()))
        .one(db.get_ref())
        .await?
        .ok_or_else(invalid_user)?;

    // Social-only accounts have no password and a malformed hash never verifies.
    let password_ok = user
        .password
        .as_deref()
        .map(|hashed| verify(&payload.password, hashed).unwrap_or(false))
        .unwrap_or(false);
    if !password_ok || !user.is_allowed {
        return Err(invalid_user());
    }

    let access_token = issue_token(&config, user.id)?;
    Ok(HttpResponse::Ok().json(TokenResponse {
        message: "SUCCESS",
        access_token,
    }))
}

async fn kakao_sign_in(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let kakao_token = extract_token(&req, &config).ok_or_else(|| AppError::bad_request("TOKEN REQUIRED"))?;
    let profile = provider::fetch_kakao_profile(&config, &kakao_token).await?;
    let email = profile.email().ok_or_else(AppError::email_required)?.to_string();
    let social_id = profile.id.to_string();
    let db = db.get_ref();

    let by_social = user::Entity::find()
        .filter(user::Column::SocialId.eq(social_id.as_str()))
        .one(db)
        .await?;

    let user_id = match by_social {
        Some(found) => found.id,
        None => {
            let by_email = user::Entity::find()
                .filter(user::Column::Email.eq(email.as_str()))
                .one(db)
                .await?;
            match by_email {
                Some(found) => {
                    if found.social_id.as_deref().is_some_and(|linked| linked != social_id) {
                        warn!("user {} already linked to another kakao account", found.id);
                        return Err(AppError::bad_request("SOCIAL ACCOUNT CONFLICT"));
                    }
                    let mut active: user::ActiveModel = found.into();
                    active.social_id = Set(Some(social_id));
                    active.update_at = Set(Some(Utc::now()));
                    let linked = active.update(db).await?;
                    info!("linked kakao account to user {}", linked.id);
                    linked.id
                }
                None => {
                    let now = Utc::now();
                    let created = user::ActiveModel {
                        email: Set(Some(email)),
                        social_id: Set(Some(social_id)),
                        sex: Set(profile.kakao_account.gender.clone()),
                        birthday: Set(profile.kakao_account.birthday.clone()),
                        profile_url: Set(profile.profile_url()),
                        is_allowed: Set(true),
                        create_at: Set(Some(now)),
                        update_at: Set(Some(now)),
                        ..Default::default()
                    }
                    .insert(db)
                    .await?;
                    info!("created user {} from kakao", created.id);
                    created.id
                }
            }
        }
    };

    let access_token = issue_token(&config, user_id)?;
    Ok(HttpResponse::Ok().json(TokenResponse {
        message: "existing user",
        access_token,
    }))
}

async fn register_host(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let session_token = extract_token(&req, &config).ok_or_else(AppError::invalid_token)?;
    let plan = provider::fetch_listing(&config, &session_token).await?.into_plan()?;
    let user_id = auth.user_id;

    let room_id = db
        .transaction::<_, i64, AppError>(|txn| Box::pin(async move { create_room(txn, user_id, plan).await }))
        .await?;

    info!("user {} registered room {}", user_id, room_id);
    Ok(HttpResponse::Ok().json(HostResponse {
        message: "success",
        room_id,
    }))
}

async fn create_room<C: ConnectionTrait>(db: &C, user_id: i64, plan: RoomPlan) -> Result<i64, AppError> {
    let host_id = match host::Entity::find()
        .filter(host::Column::UserId.eq(user_id))
        .one(db)
        .await?
    {
        Some(h) => h.id,
        None => {
            host::ActiveModel {
                user_id: Set(user_id),
                is_super: Set(false),
                ..Default::default()
            }
            .insert(db)
            .await?
            .id
        }
    };

    let category_id = find_or_create_category(db, &plan.category).await?;
    let now = Utc::now();
    let room = room::ActiveModel {
        host_id: Set(host_id),
        category_id: Set(category_id),
        listing_id: Set(plan.listing_id),
        name: Set(plan.name),
        city: Set(plan.city),
        address: Set(plan.address),
        capacity: Set(plan.capacity),
        price: Set(plan.price),
        min_date: Set(plan.min_date),
        is_refund: Set(plan.is_refund),
        create_at: Set(Some(now)),
        update_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for item in plan.amenities {
        let amenity_id = find_or_create_amenity(db, &item.name, item.image).await?;
        room_amenity::ActiveModel {
            room_id: Set(room.id),
            amenity_id: Set(amenity_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    if !plan.able_times.is_empty() {
        able_time::Entity::insert_many(plan.able_times.into_iter().map(|slot| able_time::ActiveModel {
            room_id: Set(room.id),
            slot: Set(slot),
            ..Default::default()
        }))
        .exec(db)
        .await?;
    }

    if !plan.disable_dates.is_empty() {
        disable_date::Entity::insert_many(plan.disable_dates.into_iter().map(|night| disable_date::ActiveModel {
            room_id: Set(room.id),
            night: Set(night),
            ..Default::default()
        }))
        .exec(db)
        .await?;
    }

    if !plan.images.is_empty() {
        image::Entity::insert_many(plan.images.into_iter().map(|url| image::ActiveModel {
            room_id: Set(room.id),
            image_url: Set(url),
            ..Default::default()
        }))
        .exec(db)
        .await?;
    }

    Ok(room.id)
}

async fn find_or_create_category<C: ConnectionTrait>(db: &C, name: &str) -> Result<i64, AppError> {
    if let Some(found) = category::Entity::find()
        .filter(category::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(found.id);
    }
    let created = category::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created.id)
}

async fn find_or_create_amenity<C: ConnectionTrait>(
    db: &C,
    name: &str,
    image: Option<String>,
) -> Result<i64, AppError> {
    if let Some(found) = amenity::Entity::find()
        .filter(amenity::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(found.id);
    }
    let created = amenity::ActiveModel {
        name: Set(name.to_string()),
        image: Set(image),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created.id)
}

async fn list_wishlist(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let rows = wishlist::Entity::find()
        .filter(wishlist::Column::UserId.eq(auth.user_id))
        .order_by_desc(wishlist::Column::Id)
        .find_also_related(room::Entity)
        .all(db.get_ref())
        .await?;

    let list: Vec<WishlistItemDto> = rows
        .into_iter()
        .filter_map(|(_, room)| room)
        .map(|room| WishlistItemDto {
            room_id: room.id,
            name: room.name,
            city: room.city,
            price: room.price,
        })
        .collect();
    Ok(HttpResponse::Ok().json(list))
}

async fn add_wishlist(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let room_id = path.into_inner();
    let db = db.get_ref();
    room::Entity::find_by_id(room_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("ROOM NOT FOUND"))?;

    let already = wishlist::Entity::find()
        .filter(wishlist::Column::UserId.eq(auth.user_id))
        .filter(wishlist::Column::RoomId.eq(room_id))
        .one(db)
        .await?
        .is_some();
    if !already {
        wishlist::ActiveModel {
            user_id: Set(auth.user_id),
            room_id: Set(room_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(HttpResponse::Ok().json(MessageDto::success()))
}

async fn remove_wishlist(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    wishlist::Entity::delete_many()
        .filter(wishlist::Column::UserId.eq(auth.user_id))
        .filter(wishlist::Column::RoomId.eq(path.into_inner()))
        .exec(db.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(MessageDto::success()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_column() {
        let err = DbErr::Custom("UNIQUE constraint failed: users.phone_number".to_string());
        assert_eq!(duplicate_from_db_error(err).msg(), "DUPLICATE PHONE_NUMBER");

        let err = DbErr::Custom("UNIQUE constraint failed: users.first_name, users.last_name".to_string());
        assert_eq!(duplicate_from_db_error(err).msg(), "DUPLICATE NAME");

        let err = DbErr::Custom("UNIQUE constraint failed: users.email".to_string());
        assert_eq!(duplicate_from_db_error(err).msg(), "DUPLICATE EMAIL");
    }

    #[test]
    fn other_db_errors_are_system_exceptions() {
        let err = DbErr::Custom("disk I/O error".to_string());
        assert_eq!(duplicate_from_db_error(err).msg(), "SYSTEM_EXCEPTION");
    }
}
