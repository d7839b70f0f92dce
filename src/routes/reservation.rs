use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, SecondsFormat, Utc};
use log::{error, info};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::entity::{disable_date, host, reservation, room, status};
use crate::error::AppError;
use crate::response::MessageDto;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::post().to(create_reservation))
            .route(web::get().to(list_reservations)),
    )
    .service(web::resource("/{id}/cancel").route(web::post().to(cancel_reservation)))
    .service(web::resource("/{id}/confirm").route(web::post().to(confirm_reservation)));
}

#[derive(Deserialize)]
struct CreateReservationRequest {
    room_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: i32,
}

#[derive(Serialize)]
struct CreateReservationResponse {
    message: &'static str,
    reservation_id: i64,
}

#[derive(Serialize)]
struct ReservationDto {
    id: i64,
    room_id: i64,
    status: Option<String>,
    check_in: String,
    check_out: String,
    guests: i32,
    create_at: Option<String>,
}

async fn create_reservation(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<CreateReservationRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = auth.user_id;
    let request = payload.into_inner();
    let reservation_id = db
        .transaction::<_, i64, AppError>(|txn| Box::pin(async move { book_room(txn, user_id, request).await }))
        .await?;

    info!("user {} reserved ({})", user_id, reservation_id);
    Ok(HttpResponse::Ok().json(CreateReservationResponse {
        message: "SUCCESS",
        reservation_id,
    }))
}

/// Availability checks and the insert share one transaction so two bookings
/// of the same nights cannot both pass the overlap check.
async fn book_room<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    request: CreateReservationRequest,
) -> Result<i64, AppError> {
    let mut query = room::Entity::find_by_id(request.room_id);
    if db.get_database_backend() == DbBackend::MySql {
        query = query.lock_exclusive();
    }
    let room = query
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("ROOM NOT FOUND"))?;

    check_stay(&room, request.check_in, request.check_out, request.guests)?;

    let blocked = disable_date::Entity::find()
        .filter(disable_date::Column::RoomId.eq(room.id))
        .filter(disable_date::Column::Night.gte(request.check_in))
        .filter(disable_date::Column::Night.lt(request.check_out))
        .one(db)
        .await?;
    if blocked.is_some() {
        return Err(AppError::bad_request("DATE UNAVAILABLE"));
    }

    let cancelled = status_id(db, status::CANCELLED).await?;
    // Half-open stays [check_in, check_out) overlap when each starts before the other ends.
    let overlapping = reservation::Entity::find()
        .filter(reservation::Column::RoomId.eq(room.id))
        .filter(reservation::Column::StatusId.ne(cancelled))
        .filter(reservation::Column::CheckIn.lt(request.check_out))
        .filter(reservation::Column::CheckOut.gt(request.check_in))
        .one(db)
        .await?;
    if overlapping.is_some() {
        return Err(AppError::bad_request("ALREADY BOOKED"));
    }

    let pending = status_id(db, status::PENDING).await?;
    let created = reservation::ActiveModel {
        user_id: Set(user_id),
        room_id: Set(room.id),
        status_id: Set(pending),
        check_in: Set(request.check_in),
        check_out: Set(request.check_out),
        guests: Set(request.guests),
        create_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created.id)
}

fn check_stay(room: &room::Model, check_in: NaiveDate, check_out: NaiveDate, guests: i32) -> Result<(), AppError> {
    if check_in >= check_out {
        return Err(AppError::bad_request("INVALID DATE"));
    }
    if guests < 1 || guests > room.capacity {
        return Err(AppError::bad_request("INVALID GUESTS"));
    }
    let nights = (check_out - check_in).num_days();
    if nights < i64::from(room.min_date) {
        return Err(AppError::bad_request("MINIMUM STAY"));
    }
    Ok(())
}

async fn status_id<C: ConnectionTrait>(db: &C, name: &str) -> Result<i64, AppError> {
    status::Entity::find()
        .filter(status::Column::Name.eq(name))
        .one(db)
        .await?
        .map(|s| s.id)
        .ok_or_else(|| {
            error!("status {} missing from lookup table", name);
            AppError::system_exception()
        })
}

async fn list_reservations(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let rows = reservation::Entity::find()
        .filter(reservation::Column::UserId.eq(auth.user_id))
        .order_by_desc(reservation::Column::Id)
        .find_also_related(status::Entity)
        .all(db.get_ref())
        .await?;

    let list: Vec<ReservationDto> = rows
        .into_iter()
        .map(|(r, s)| ReservationDto {
            id: r.id,
            room_id: r.room_id,
            status: s.map(|s| s.name),
            check_in: r.check_in.format("%Y-%m-%d").to_string(),
            check_out: r.check_out.format("%Y-%m-%d").to_string(),
            guests: r.guests,
            create_at: r.create_at.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        })
        .collect();
    Ok(HttpResponse::Ok().json(list))
}

async fn cancel_reservation(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let db = db.get_ref();
    let found = reservation::Entity::find_by_id(path.into_inner())
        .filter(reservation::Column::UserId.eq(auth.user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("RESERVATION NOT FOUND"))?;

    let cancelled = status_id(db, status::CANCELLED).await?;
    if found.status_id == cancelled {
        return Err(AppError::bad_request("ALREADY CANCELLED"));
    }

    let mut active: reservation::ActiveModel = found.into();
    active.status_id = Set(cancelled);
    let updated = active.update(db).await?;
    info!("reservation {} cancelled", updated.id);
    Ok(HttpResponse::Ok().json(MessageDto::success()))
}

/// The host of the reserved room accepts a pending reservation.
async fn confirm_reservation(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let db = db.get_ref();
    let not_found = || AppError::not_found("RESERVATION NOT FOUND");

    let (found, room) = reservation::Entity::find_by_id(path.into_inner())
        .find_also_related(room::Entity)
        .one(db)
        .await?
        .ok_or_else(not_found)?;
    let room = room.ok_or_else(not_found)?;
    let hosted_by_caller = host::Entity::find_by_id(room.host_id)
        .filter(host::Column::UserId.eq(auth.user_id))
        .one(db)
        .await?
        .is_some();
    if !hosted_by_caller {
        return Err(not_found());
    }

    if found.status_id == status_id(db, status::CANCELLED).await? {
        return Err(AppError::bad_request("ALREADY CANCELLED"));
    }
    let confirmed = status_id(db, status::CONFIRMED).await?;
    if found.status_id == confirmed {
        return Err(AppError::bad_request("ALREADY CONFIRMED"));
    }

    let mut active: reservation::ActiveModel = found.into();
    active.status_id = Set(confirmed);
    let updated = active.update(db).await?;
    info!("reservation {} confirmed by host user {}", updated.id, auth.user_id);
    Ok(HttpResponse::Ok().json(MessageDto::success()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(capacity: i32, min_date: i32) -> room::Model {
        room::Model {
            id: 1,
            host_id: 1,
            category_id: 1,
            listing_id: None,
            name: "room".to_string(),
            city: None,
            address: None,
            capacity,
            price: 40000,
            min_date,
            is_refund: false,
            create_at: None,
            update_at: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 3, d).unwrap()
    }

    #[test]
    fn stay_dates_must_be_ordered() {
        let err = check_stay(&room(2, 1), day(5), day(5), 1).unwrap_err();
        assert_eq!(err.msg(), "INVALID DATE");
    }

    #[test]
    fn guests_bounded_by_capacity() {
        assert_eq!(check_stay(&room(2, 1), day(1), day(2), 3).unwrap_err().msg(), "INVALID GUESTS");
        assert_eq!(check_stay(&room(2, 1), day(1), day(2), 0).unwrap_err().msg(), "INVALID GUESTS");
        assert!(check_stay(&room(2, 1), day(1), day(2), 2).is_ok());
    }

    #[test]
    fn minimum_stay_enforced() {
        assert_eq!(check_stay(&room(2, 3), day(1), day(3), 1).unwrap_err().msg(), "MINIMUM STAY");
        assert!(check_stay(&room(2, 3), day(1), day(4), 1).is_ok());
    }
}
