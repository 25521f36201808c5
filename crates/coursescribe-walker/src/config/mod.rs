pub mod params;
pub mod schema;
pub mod selectors;

pub use params::Params;
pub use schema::{BrowserConfig, Config, Diagnostics, SummaryConfig, Timing, Viewport};
pub use selectors::Selectors;
