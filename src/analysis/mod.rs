pub mod monte_carlo;
pub mod risk;
pub mod summary;

pub use monte_carlo::Simulator;
pub use risk::analyze;
pub use summary::{render_text, summarize};
