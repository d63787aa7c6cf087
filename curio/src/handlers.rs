use clap::ArgMatches;
use colored::Colorize;
use curio_core::report::generate_text_summary;
use curio_core::scrape::{ScrapeOptions, Strategy, execute_scrape};
use curio_core::save_report;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Expand `~` and environment variables in an output directory argument.
pub fn expand_output_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(raw).map_or_else(|_| raw.to_string(), |s| s.into_owned()))
}

/// Parse a target URL, trying to add https:// if the scheme is missing.
pub fn parse_target_url(raw: &str) -> Option<String> {
    if Url::parse(raw).is_ok() {
        return Some(raw.to_string());
    }

    let with_scheme = format!("https://{}", raw);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("⚠️  Invalid URL '{}'", raw);
    None
}

pub async fn handle_scrape(sub_matches: &ArgMatches, quiet: bool) {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let url = sub_matches.get_one::<Url>("url").unwrap();
    let brand = sub_matches.get_one::<String>("brand").unwrap();
    let strategy_raw = sub_matches.get_one::<String>("strategy").unwrap();
    let limit = *sub_matches.get_one::<usize>("limit").unwrap_or(&50);
    let page_budget = *sub_matches.get_one::<usize>("page-budget").unwrap_or(&5);
    let delay_ms = *sub_matches.get_one::<u64>("delay").unwrap_or(&500);
    let enrich = sub_matches.get_flag("enrich");
    let tier = sub_matches.get_one::<String>("tier").unwrap();
    let output = sub_matches.get_one::<String>("output").unwrap();
    let api_base = sub_matches.get_one::<String>("api-base").unwrap();

    let Some(strategy) = Strategy::parse(strategy_raw) else {
        eprintln!(
            "✗ Unknown strategy '{}'. Use auto, static, browser, or crawl-api.",
            strategy_raw
        );
        std::process::exit(1);
    };

    let mut options = ScrapeOptions::new(url.as_str(), brand);
    options.strategy = strategy;
    options.limit = limit;
    options.page_budget = page_budget;
    options.delay = Duration::from_millis(delay_ms);
    options.enrich = enrich;
    options.api_base = api_base.clone();

    if !quiet {
        println!("\n🛋️  Scraping catalog for {}", brand.bold());
        println!("Target:   {}", url);
        println!("Strategy: {}\n", strategy_raw);
    }

    let spinner = if quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(format!("Scraping {}...", url));
        Some(pb)
    };

    let report = execute_scrape(&options).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if let Some(ref error) = report.error {
        eprintln!("✗ Scrape failed: {}", error.red());
        std::process::exit(1);
    }

    let output_dir = expand_output_dir(output);
    match save_report(&report, tier, &output_dir) {
        Ok(path) => {
            if !quiet {
                print!("{}", generate_text_summary(&report));
            }
            println!(
                "\n✓ {} products in {} collections saved to {}",
                report.total_products.to_string().green().bold(),
                report.total_collections.to_string().green().bold(),
                path.display()
            );
        }
        Err(e) => {
            eprintln!("✗ Failed to save report: {}", e);
            std::process::exit(1);
        }
    }
}
