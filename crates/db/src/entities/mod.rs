//! `SeaORM` entity definitions.

pub mod classifications;
pub mod feedback;
pub mod images;
pub mod sea_orm_active_enums;
pub mod users;
