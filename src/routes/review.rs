use actix_web::{web, HttpResponse};
use chrono::{SecondsFormat, Utc};
use log::info;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::entity::{review, room, user};
use crate::error::AppError;
use crate::validation::is_valid_score;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::post().to(create_review)))
        .service(web::resource("/room/{room_id}").route(web::get().to(list_room_reviews)));
}

#[derive(Deserialize)]
struct CreateReviewRequest {
    room_id: i64,
    comment: Option<String>,
    cleanliness: Option<f64>,
    communication: Option<f64>,
    checkin: Option<f64>,
    accuracy: Option<f64>,
    location: Option<f64>,
    cost_effectiveness: Option<f64>,
}

impl CreateReviewRequest {
    fn scores(&self) -> [Option<f64>; 6] {
        [
            self.cleanliness,
            self.communication,
            self.checkin,
            self.accuracy,
            self.location,
            self.cost_effectiveness,
        ]
    }
}

#[derive(Serialize)]
struct CreateReviewResponse {
    message: &'static str,
    review_id: i64,
}

#[derive(Serialize)]
struct ReviewDto {
    id: i64,
    user_id: i64,
    first_name: Option<String>,
    comment: Option<String>,
    cleanliness: Option<f64>,
    communication: Option<f64>,
    checkin: Option<f64>,
    accuracy: Option<f64>,
    location: Option<f64>,
    cost_effectiveness: Option<f64>,
    average: Option<f64>,
    create_at: Option<String>,
}

async fn create_review(
    db: web::Data<DatabaseConnection>,
    auth: AuthUser,
    payload: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    if payload.scores().into_iter().flatten().any(|s| !is_valid_score(s)) {
        return Err(AppError::bad_request("INVALID SCORE"));
    }

    let db = db.get_ref();
    room::Entity::find_by_id(payload.room_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("ROOM NOT FOUND"))?;

    let comment = payload.comment.filter(|c| !c.trim().is_empty());
    let created = review::ActiveModel {
        user_id: Set(auth.user_id),
        room_id: Set(payload.room_id),
        comment: Set(comment),
        cleanliness: Set(payload.cleanliness),
        communication: Set(payload.communication),
        checkin: Set(payload.checkin),
        accuracy: Set(payload.accuracy),
        location: Set(payload.location),
        cost_effectiveness: Set(payload.cost_effectiveness),
        create_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("user {} reviewed room {}", auth.user_id, payload.room_id);
    Ok(HttpResponse::Ok().json(CreateReviewResponse {
        message: "SUCCESS",
        review_id: created.id,
    }))
}

async fn list_room_reviews(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let rows = review::Entity::find()
        .filter(review::Column::RoomId.eq(path.into_inner()))
        .order_by_desc(review::Column::Id)
        .find_also_related(user::Entity)
        .all(db.get_ref())
        .await?;

    let list: Vec<ReviewDto> = rows
        .into_iter()
        .map(|(r, u)| ReviewDto {
            average: r.average(),
            id: r.id,
            user_id: r.user_id,
            first_name: u.and_then(|u| u.first_name),
            comment: r.comment,
            cleanliness: r.cleanliness,
            communication: r.communication,
            checkin: r.checkin,
            accuracy: r.accuracy,
            location: r.location,
            cost_effectiveness: r.cost_effectiveness,
            create_at: r.create_at.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        })
        .collect();
    Ok(HttpResponse::Ok().json(list))
}
