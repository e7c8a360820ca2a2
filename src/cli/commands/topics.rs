//! Topic table listing.

use console::style;

use review_harvester::topics::{normalize_topic, TopicIndex};

pub fn cmd_topics(filter: Option<&str>) -> anyhow::Result<()> {
    let index = TopicIndex::builtin()?;
    let needle = filter.map(normalize_topic);

    println!("\n{}", style("Topics").bold());
    println!("{}", "─".repeat(70));

    let mut shown = 0;
    for topic in index.topics() {
        if let Some(needle) = &needle {
            if !normalize_topic(&topic.name).contains(needle.as_str()) {
                continue;
            }
        }
        println!("  {:<40} {}", topic.name, style(&topic.id).dim());
        shown += 1;
    }

    if shown == 0 {
        println!("  {} No matching topics", style("!").yellow());
    }
    Ok(())
}
