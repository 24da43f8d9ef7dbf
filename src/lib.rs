// Mode/ability and locomotion state machine for animal characters

pub mod core;
pub mod engine;
pub mod game;
