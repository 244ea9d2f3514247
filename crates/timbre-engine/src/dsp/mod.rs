pub mod coefficients;
pub mod effect;
pub mod gain;
pub mod processor;
pub mod sample;
pub mod stage;
