use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("curio")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("curio")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("scrape")
                .about(
                    "Discover a brand site's category tree and harvest its product catalog \
                into a JSON report.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("Homepage or collection URL of the brand website")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-b --"brand" <NAME>)
                        .required(true)
                        .help("Brand name used in the report and output filename"),
                )
                .arg(
                    arg!(-s --"strategy" <STRATEGY>)
                        .required(false)
                        .help("Extraction strategy: auto, static, browser, or crawl-api")
                        .default_value("auto"),
                )
                .arg(
                    arg!(--"limit" <COUNT>)
                        .required(false)
                        .help("Max products per listing page (page limit for crawl-api)")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("50"),
                )
                .arg(
                    arg!(--"page-budget" <N>)
                        .required(false)
                        .help("Maximum paginated pages harvested per listing")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(--"delay" <MILLIS>)
                        .required(false)
                        .help("Pause between page fetches, in milliseconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("500"),
                )
                .arg(
                    arg!(--"enrich")
                        .required(false)
                        .help("Revisit detail pages to backfill missing descriptions/prices/images"),
                )
                .arg(
                    arg!(--"tier" <TIER>)
                        .required(false)
                        .help("Report tier suffix used in the output filename")
                        .default_value("catalog"),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Directory the JSON report is written to")
                        .default_value("./reports"),
                )
                .arg(
                    arg!(--"api-base" <URL>)
                        .required(false)
                        .help("Base URL of the crawl service (crawl-api strategy)")
                        .default_value("https://api.firecrawl.dev"),
                ),
        )
}
