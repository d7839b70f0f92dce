pub mod cors;
pub mod reservation;
pub mod review;
pub mod room;
pub mod user;
