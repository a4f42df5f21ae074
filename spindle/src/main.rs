use colored::Colorize;
use spindle::commands::command_argument_builder;
use spindle::handlers::{build_run_config, init_tracing, StdoutSink};
use spindle_scanner::{Crawler, RunConfig};
use tracing::{debug, warn};

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();
    init_tracing(matches.get_count("verbose"));

    let config = match build_run_config(&matches) {
        Ok(config) => config,
        Err(e) => fail(e),
    };

    if let Err(e) = handle_crawl(config, matches.get_flag("print-errors")).await {
        fail(e);
    }
}

fn fail(e: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "error:".red().bold(), e);
    std::process::exit(1);
}

async fn handle_crawl(config: RunConfig, print_errors: bool) -> anyhow::Result<()> {
    if config.fetch.accept_invalid_certs {
        warn!("TLS certificate verification is disabled");
    }

    let crawler = Crawler::new(config)?;

    let token = crawler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping crawl");
            token.cancel();
        }
    });

    let (sink, summary) = crawler.run(StdoutSink::new(print_errors)).await?;
    debug!(
        "{} results printed, summary: {}",
        sink.printed(),
        serde_json::to_string(&summary)?
    );

    Ok(())
}
