pub mod file;

pub use file::{load_collapse_state, load_nodes, save_collapse_state, save_nodes};
