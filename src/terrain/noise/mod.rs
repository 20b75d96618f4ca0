pub mod noise_parameters;
pub mod noise_manager;
pub mod noise_utils;

pub use noise_parameters::{NoiseParameters, NoiseParametersPatch};
pub use noise_manager::{NoiseLayer, NoiseManager};
pub use noise_utils::{fractal_noise_2d, hash, ridge_noise, value_noise_2d};
