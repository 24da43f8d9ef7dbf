// Animal decision engine: modes, locomotion states and the animal that runs them

pub mod animal;
pub mod modes;
pub mod states;
