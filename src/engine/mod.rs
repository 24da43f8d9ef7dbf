// Engine modules: physics queries, input, timed tasks, loop timing

pub mod game_loop;
pub mod input;
pub mod physics;
pub mod scheduler;
