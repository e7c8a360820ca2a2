//! Output file summary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use console::style;

use review_harvester::config::Config;
use review_harvester::output::RecordReader;

use crate::cli::helpers::truncate;

pub fn cmd_stats(config: &Config, file: Option<PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(|| config.output_path());
    if !path.exists() {
        println!("{} {} does not exist", style("!").yellow(), path.display());
        return Ok(());
    }

    let records = RecordReader::read_path(&path)?;
    let comments = RecordReader::read_comments(&path)?;

    let mut per_topic: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &records {
        *per_topic.entry(record.topic.as_str()).or_default() += 1;
    }
    let undated = records.iter().filter(|r| r.date.is_empty()).count();
    let newest = records.iter().map(|r| r.date.as_str()).max().unwrap_or("-");

    println!("\n{}", style(path.display().to_string()).bold());
    println!("{}", "─".repeat(70));
    println!("Records:   {}", records.len());
    println!("Undated:   {}", undated);
    println!("Newest:    {}", newest);

    if !per_topic.is_empty() {
        println!("\n{}", style("By topic").bold());
        for (topic, count) in &per_topic {
            println!("  {:<40} {}", truncate(topic, 40), count);
        }
    }

    if !comments.is_empty() {
        println!("\n{}", style("Notes").bold());
        for comment in &comments {
            let marker = if comment.starts_with("CHALLENGE_DETECTED") {
                style("!").yellow()
            } else {
                style("✗").red()
            };
            println!("  {} {}", marker, truncate(comment, 100));
        }
    }
    Ok(())
}
