// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{expand_output_dir, parse_target_url};

// Re-export the scrape surface from curio-core
pub use curio_core::scrape::{ScrapeOptions, Strategy, execute_scrape};
