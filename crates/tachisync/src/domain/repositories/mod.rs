pub mod category;
pub mod chapter;
pub mod favorite;
pub mod gallery;
pub mod manga;
pub mod unit_of_work;
