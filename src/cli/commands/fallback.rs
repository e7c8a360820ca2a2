//! Bibliographic-only harvest.

use std::sync::Arc;

use console::style;
use tracing::warn;

use review_harvester::config::Config;
use review_harvester::discovery::{CrossrefClient, FallbackResolver};
use review_harvester::output::RecordWriter;
use review_harvester::topics::TopicIndex;

use crate::cli::helpers::{print_empty_hint, print_written};

pub async fn cmd_fallback(
    mut config: Config,
    topic: &str,
    output: Option<String>,
    append: bool,
    cap: Option<usize>,
    no_filter: bool,
) -> anyhow::Result<()> {
    if let Some(output) = output {
        config.output = output;
    }
    config.append |= append;

    // The API only needs the name, so an unknown topic is still usable.
    let index = TopicIndex::builtin()?;
    let name = match index.resolve(topic, config.topic_match_threshold) {
        Some(found) => found.name.clone(),
        None => {
            warn!("'{}' is not a known topic; searching for it as given", topic);
            topic.trim().to_string()
        }
    };

    let mut writer = RecordWriter::create(config.output_path(), config.append)?;

    let client = CrossrefClient::new(&config.crossref)?;
    let resolver = FallbackResolver::new(Arc::new(client), &config.crossref.container_title)
        .with_rows(config.crossref.rows)
        .with_title_filter(config.fallback.filter_titles && !no_filter);

    println!(
        "{} Searching {} for {}",
        style("→").cyan(),
        config.crossref.container_title,
        style(&name).bold()
    );

    let cap = cap.unwrap_or(config.fallback.cap);
    for record in resolver.resolve_by_topic(&name, cap).await {
        writer.write_record(&record)?;
    }

    print_written(writer.path(), writer.records_written());
    if writer.records_written() == 0 {
        print_empty_hint();
    }
    Ok(())
}
