use std::io::{self, Write};

use scraper::Html;
use serde::Serialize;

use crate::domain::{FeedUpdate, RepoUpdate, Update};
use crate::services::SourceUpdates;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// JSON view of one source and its updates.
#[derive(Serialize)]
pub struct SourceReport<'a> {
    pub name: &'a str,
    pub title: &'a str,
    #[serde(rename = "type")]
    pub source_type: String,
    pub icon: Option<&'a str>,
    pub link: Option<&'a str>,
    pub updates: &'a [Update],
}

impl<'a> From<&'a SourceUpdates<'a>> for SourceReport<'a> {
    fn from(polled: &'a SourceUpdates<'a>) -> Self {
        Self {
            name: polled.source.name(),
            title: polled.source.title(),
            source_type: polled.source.source_type().to_string(),
            icon: polled.source.icon(),
            link: polled.source.link(),
            updates: &polled.updates,
        }
    }
}

/// Text content of a markup fragment, entities decoded.
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn write_sections<W: Write>(out: &mut W, polled: &[SourceUpdates<'_>]) -> io::Result<()> {
    for (i, section) in polled.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{} [{}]", section.source.title(), section.source.source_type())?;
        if let Some(link) = section.source.link() {
            writeln!(out, "  {}", link)?;
        }
        if section.updates.is_empty() {
            writeln!(out, "  (nothing new)")?;
        }
        for update in &section.updates {
            write_update(out, update, false)?;
        }
    }
    Ok(())
}

pub fn write_merged<W: Write>(out: &mut W, updates: &[Update]) -> io::Result<()> {
    for update in updates {
        write_update(out, update, true)?;
    }
    Ok(())
}

fn write_update<W: Write>(out: &mut W, update: &Update, with_source: bool) -> io::Result<()> {
    let prefix = if with_source {
        format!("{} ", update.source())
    } else {
        String::new()
    };

    match update {
        Update::Feed(feed) => write_feed(out, feed, &prefix),
        Update::Repo(repo) => write_repo(out, repo, &prefix),
    }
}

fn write_feed<W: Write>(out: &mut W, feed: &FeedUpdate, prefix: &str) -> io::Result<()> {
    let title = feed
        .title
        .as_deref()
        .map(plain_text)
        .unwrap_or_else(|| "(untitled)".to_string());
    writeln!(
        out,
        "  {}[{}] {}",
        prefix,
        feed.timestamp.format(TIME_FORMAT),
        title
    )?;
    if let Some(link) = &feed.link {
        writeln!(out, "    {}", link)?;
    }
    Ok(())
}

fn write_repo<W: Write>(out: &mut W, repo: &RepoUpdate, prefix: &str) -> io::Result<()> {
    let noun = if repo.commits.len() == 1 { "commit" } else { "commits" };
    writeln!(
        out,
        "  {}[{}] {} ({} {})",
        prefix,
        repo.timestamp.format(TIME_FORMAT),
        repo.tag_label,
        repo.commits.len(),
        noun
    )?;
    for commit in &repo.commits {
        writeln!(
            out,
            "    {} {}: {} ({})",
            commit.short_hash,
            commit.repository,
            plain_text(&commit.subject),
            commit.author_name
        )?;
    }
    Ok(())
}
