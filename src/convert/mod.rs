// Dimension conversion: currency, magnitude, and time basis

pub mod fx;
pub mod rescale;

pub use fx::{FxConverter, FxQuote, FxTable};
pub use rescale::{rescale_magnitude, rescale_time, Rescaled};
