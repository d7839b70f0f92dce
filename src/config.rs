use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_header: String,
    pub token_ttl_days: i64,
    pub kakao_api_url: String,
    pub listing_api_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8000);

        let sqlite_path = env::var("SQLITE_PATH").unwrap_or_else(|_| "./data/stay.sqlite".to_string());
        let database_url = env::var("DATABASE_URL").ok();

        let jwt_secret = env::var("SECRET_KEY")
            .or_else(|_| env::var("JWT_SECRET"))
            .unwrap_or_else(|_| "stay-dev-secret-change-me".to_string());

        let token_header = env::var("TOKEN_HEADER").unwrap_or_else(|_| "Authorization".to_string());

        let token_ttl_days = env::var("TOKEN_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(30);

        let kakao_api_url = env::var("KAKAO_API_URL").unwrap_or_else(|_| "https://kapi.kakao.com".to_string());
        let listing_api_url =
            env::var("LISTING_API_URL").unwrap_or_else(|_| "http://localhost:8001".to_string());

        Self {
            server_port,
            sqlite_path,
            database_url,
            jwt_secret,
            token_header,
            token_ttl_days,
            kakao_api_url,
            listing_api_url,
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}?mode=rwc", path)
    }

    pub fn kakao_profile_url(&self) -> String {
        format!("{}/v2/user/me", self.kakao_api_url.trim_end_matches('/'))
    }

    pub fn listing_url(&self) -> String {
        format!("{}/listing", self.listing_api_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            server_port: 8000,
            sqlite_path: "/tmp/stay.sqlite".to_string(),
            database_url: None,
            jwt_secret: "secret".to_string(),
            token_header: "Authorization".to_string(),
            token_ttl_days: 30,
            kakao_api_url: "https://kapi.kakao.com/".to_string(),
            listing_api_url: "http://127.0.0.1:9000".to_string(),
        }
    }

    #[test]
    fn sqlite_path_becomes_url() {
        let cfg = sample();
        assert_eq!(cfg.database_url(), "sqlite:///tmp/stay.sqlite?mode=rwc");
    }

    #[test]
    fn explicit_url_wins() {
        let mut cfg = sample();
        cfg.database_url = Some("mysql://root@localhost/stay".to_string());
        assert_eq!(cfg.database_url(), "mysql://root@localhost/stay");
    }

    #[test]
    fn provider_urls_join_cleanly() {
        let cfg = sample();
        assert_eq!(cfg.kakao_profile_url(), "https://kapi.kakao.com/v2/user/me");
        assert_eq!(cfg.listing_url(), "http://127.0.0.1:9000/listing");
    }
}
