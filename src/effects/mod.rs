mod blur;
mod composite;

pub use blur::BlurStrategy;
pub use composite::composite;
