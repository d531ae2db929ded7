mod checks;
mod encoder;
mod engine;
mod placeholder;

pub use checks::WafPreCheck;
pub use encoder::Encoder;
pub use engine::PayloadScanner;
pub use placeholder::Placeholder;
