use actix_web::{web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::entity::{able_time, category, disable_date, image, review, room};
use crate::error::AppError;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/{id}").route(web::get().to(get_room)));
}

#[derive(Serialize)]
struct AmenityDto {
    name: String,
    image: Option<String>,
}

#[derive(Serialize)]
struct RoomDto {
    id: i64,
    host_id: i64,
    name: String,
    category: Option<String>,
    city: Option<String>,
    address: Option<String>,
    capacity: i32,
    price: i64,
    min_date: i32,
    is_refund: bool,
    amenities: Vec<AmenityDto>,
    images: Vec<String>,
    able_times: Vec<String>,
    disable_dates: Vec<String>,
    review_count: usize,
    rating: Option<f64>,
}

async fn get_room(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let db = db.get_ref();
    let room = room::Entity::find_by_id(path.into_inner())
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("ROOM NOT FOUND"))?;

    let category = room.find_related(category::Entity).one(db).await?.map(|c| c.name);
    let amenities = room
        .find_related(crate::entity::amenity::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(|a| AmenityDto { name: a.name, image: a.image })
        .collect();
    let images = image::Entity::find()
        .filter(image::Column::RoomId.eq(room.id))
        .order_by_asc(image::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|i| i.image_url)
        .collect();
    let able_times = able_time::Entity::find()
        .filter(able_time::Column::RoomId.eq(room.id))
        .order_by_asc(able_time::Column::Slot)
        .all(db)
        .await?
        .into_iter()
        .map(|t| t.slot.format("%H:%M").to_string())
        .collect();
    let disable_dates = disable_date::Entity::find()
        .filter(disable_date::Column::RoomId.eq(room.id))
        .order_by_asc(disable_date::Column::Night)
        .all(db)
        .await?
        .into_iter()
        .map(|d| d.night.format("%Y-%m-%d").to_string())
        .collect();

    let reviews = review::Entity::find()
        .filter(review::Column::RoomId.eq(room.id))
        .all(db)
        .await?;
    let averages: Vec<f64> = reviews.iter().filter_map(review::Model::average).collect();
    let rating = if averages.is_empty() {
        None
    } else {
        let mean = averages.iter().sum::<f64>() / averages.len() as f64;
        Some((mean * 100.0).round() / 100.0)
    };

    Ok(HttpResponse::Ok().json(RoomDto {
        id: room.id,
        host_id: room.host_id,
        name: room.name,
        category,
        city: room.city,
        address: room.address,
        capacity: room.capacity,
        price: room.price,
        min_date: room.min_date,
        is_refund: room.is_refund,
        amenities,
        images,
        able_times,
        disable_dates,
        review_count: reviews.len(),
        rating,
    }))
}
