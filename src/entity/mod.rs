pub mod able_time;
pub mod amenity;
pub mod category;
pub mod disable_date;
pub mod host;
pub mod image;
pub mod reservation;
pub mod review;
pub mod room;
pub mod room_amenity;
pub mod status;
pub mod user;
pub mod wishlist;
