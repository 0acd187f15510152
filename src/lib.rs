pub mod chart;
pub mod codec;
pub mod config;
pub mod grid;
pub mod session;
pub mod style;
pub mod timeline;

pub use chart::{ChartOptions, OutputFormat, RenderError, render_chart};
pub use codec::{DecodedTable, TableError, TableFormat, decode, encode, load_table, save_table};
pub use config::{ConfigError, SessionConfig, load_config};
pub use grid::{DataGrid, Entry, reconcile};
pub use session::{Session, SessionError};
pub use style::{PaletteKind, StyleConfig, StyleError, generate_color_palette};
pub use timeline::{Granularity, TimeConfig, TimelineError, generate_time_points};
