mod monitor;
mod scheduler;

pub use scheduler::{LoaderFactory, RenderLoop};
