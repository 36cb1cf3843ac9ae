//! Data-driven loading of research content: bodies, experiments, the tech
//! tree, parts and session parameters, from RON, TOML or JSON files.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, ResearchData, load_research_data, stock_data_dir};
pub use schema::SessionConfig;
