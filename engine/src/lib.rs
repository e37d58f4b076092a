pub mod types;
pub mod entity;
pub mod fov;
pub mod grid;
pub mod player;
pub mod orders;
pub mod config;
pub mod error;
pub mod state;
pub mod engine;
pub mod visibility;
pub mod setup;
pub mod invariants;


pub use types::*;
pub use entity::*;
pub use config::RulesConfig;
pub use engine::{handle, Rejection, TurnReport};
pub use error::*;
pub use grid::{Grid, TickReport};
pub use orders::{Action, Command, Order, StructureOrder, UnitOrder};
pub use player::Player;
pub use state::State;
pub use visibility::{player_view, PlayerView};
