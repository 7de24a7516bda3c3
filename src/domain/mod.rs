pub mod ai;
pub mod bestiary;
pub mod combat;
pub mod entity;
pub mod physics;
pub mod tile;
