pub mod event;
pub mod game;
pub mod level;
pub mod step;
pub mod transition;
pub mod world;
