pub mod notification;
pub mod tier;
pub mod usage;
