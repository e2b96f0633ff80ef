pub mod nomination;
pub mod roster;
