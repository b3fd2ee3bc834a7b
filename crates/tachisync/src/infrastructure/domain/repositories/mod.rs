pub mod category;
pub mod chapter;
pub mod favorite;
pub mod manga;
pub mod unit_of_work;
