#![allow(dead_code)]

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use bcrypt::hash;
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::Value;

use stay_backend::config::AppConfig;
use stay_backend::db::init_schema;
use stay_backend::entity::{category, disable_date, host, room, user};

/// Builds the service under test from a config and a database connection.
macro_rules! test_app {
    ($config:expr, $db:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($config))
                .app_data(actix_web::web::Data::new($db))
                .configure(stay_backend::configure),
        )
        .await
    };
}

pub async fn test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.expect("connect in-memory sqlite");
    init_schema(&db).await.expect("apply schema");
    db
}

pub fn test_config(provider_url: &str) -> AppConfig {
    AppConfig {
        server_port: 0,
        sqlite_path: String::new(),
        database_url: Some("sqlite::memory:".to_string()),
        jwt_secret: "test-secret-key".to_string(),
        token_header: "Authorization".to_string(),
        token_ttl_days: 1,
        kakao_api_url: provider_url.to_string(),
        listing_api_url: provider_url.to_string(),
    }
}

/// Kakao access token the stub provider refuses.
pub const REJECTED_KAKAO_TOKEN: &str = "expired-token";

/// Serves canned Kakao profile and listing payloads on an ephemeral port and
/// returns its base URL.
pub fn spawn_provider(kakao_profile: Value, listing: Value) -> String {
    let server = HttpServer::new(move || {
        let kakao_profile = kakao_profile.clone();
        let listing = listing.clone();
        App::new()
            .route(
                "/v2/user/me",
                web::get().to(move |req: HttpRequest| {
                    let body = kakao_profile.clone();
                    async move {
                        let auth = req
                            .headers()
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        if auth == format!("Bearer {}", REJECTED_KAKAO_TOKEN) || !auth.starts_with("Bearer ") {
                            return HttpResponse::Unauthorized().json(serde_json::json!({"code": -401}));
                        }
                        HttpResponse::Ok().json(body)
                    }
                }),
            )
            .route(
                "/listing",
                web::get().to(move || {
                    let body = listing.clone();
                    async move { HttpResponse::Ok().json(body) }
                }),
            )
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .expect("bind stub provider");

    let addr = server.addrs()[0];
    actix_rt::spawn(server.run());
    format!("http://{}", addr)
}

pub async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    phone_number: &str,
    is_allowed: bool,
) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        email: Set(Some(email.to_string())),
        password: Set(Some(hash(password, 4).expect("hash"))),
        first_name: Set(Some(first_name.to_string())),
        last_name: Set(Some(last_name.to_string())),
        phone_number: Set(Some(phone_number.to_string())),
        sex: Set(Some("M".to_string())),
        birthday: Set(Some("0000-00-00".to_string())),
        is_allowed: Set(is_allowed),
        create_at: Set(Some(now)),
        update_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn default_user(db: &DatabaseConnection) -> user::Model {
    create_user(
        db,
        "abc@gmail.com",
        "12345678",
        "test_user_first_name",
        "test_user_last_name",
        "1012345678",
        true,
    )
    .await
}

/// Inserts a host-owned room, returning its id.
pub async fn create_room(
    db: &DatabaseConnection,
    owner_id: i64,
    capacity: i32,
    min_date: i32,
    blocked_nights: &[NaiveDate],
) -> i64 {
    let host = host::ActiveModel {
        user_id: Set(owner_id),
        is_super: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert host");
    let category = category::ActiveModel {
        name: Set(format!("category-{}", host.id)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert category");
    let room = room::ActiveModel {
        host_id: Set(host.id),
        category_id: Set(category.id),
        listing_id: Set(None),
        name: Set("seaside room".to_string()),
        city: Set(Some("Busan".to_string())),
        address: Set(None),
        capacity: Set(capacity),
        price: Set(80000),
        min_date: Set(min_date),
        is_refund: Set(true),
        create_at: Set(Some(Utc::now())),
        update_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert room");
    for night in blocked_nights {
        disable_date::ActiveModel {
            room_id: Set(room.id),
            night: Set(*night),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert disable date");
    }
    room.id
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
