mod settings;

pub use settings::{CliConfig, TuiConfig};
