pub mod dialogs;
pub mod gantt_chart;
pub mod row_tree;
pub mod theme;
pub mod toolbar;
