pub mod aggregate;
pub mod crawl_api;
pub mod detect;
pub mod discover;
pub mod enrich;
pub mod normalize;
pub mod report;
pub mod scrape;

pub use detect::{CollectionNode, detect_collections};
pub use report::{CollectionEntry, ScrapeReport, save_report};
pub use scrape::{ScrapeOptions, Strategy, execute_scrape};

use colored::Colorize;

pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}", r"   ██████╗██╗   ██╗██████╗ ██╗ ██████╗ ".cyan());
    println!("{}", r"  ██╔════╝██║   ██║██╔══██╗██║██╔═══██╗".cyan());
    println!("{}", r"  ██║     ██║   ██║██████╔╝██║██║   ██║".cyan());
    println!("{}", r"  ██║     ██║   ██║██╔══██╗██║██║   ██║".cyan());
    println!("{}", r"  ╚██████╗╚██████╔╝██║  ██║██║╚██████╔╝".cyan());
    println!("{}", r"   ╚═════╝ ╚═════╝ ╚═╝  ╚═╝╚═╝ ╚═════╝ ".cyan());
    println!();
    println!(
        "  {} {}",
        "Curio - catalog discovery for brand websites".bold(),
        format!("v{}", version).dimmed()
    );
    println!();
}
