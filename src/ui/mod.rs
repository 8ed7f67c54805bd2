pub mod format;
pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use format::{format_timestamp, preview};
pub use icons::Icons;
pub use output::{
    answer_pane, dim, error, header, hit_line, info, info_pane, muted, question_pane, section,
    section_line, success, summary_row, warn,
};
pub use table::{TableBuilder, sections_table, stats_table};
pub use theme::{Theme, theme};
