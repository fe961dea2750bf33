pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{banner, dim, muted, section, success, summary_row, warn};
pub use table::{chain_table, ChainTableBuilder};
pub use theme::{theme, Theme};
