pub mod commands;
pub mod handlers;

pub use handlers::{build_run_config, load_urls_from_file, parse_url_line, render_result};
