use std::process::Command;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::errors::{FrontpageError, FrontpageResult};

/// Null-separated fields: short hash, author name, author email, author time, subject.
const LOG_FORMAT: &str = "--pretty=format:%h%x00%an%x00%aE%x00%at%x00%s";

/// A commit as read from `git log`, before any presentation rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    pub hash: String,
    pub author: String,
    pub email: String,
    pub time: DateTime<Utc>,
    pub subject: String,
}

/// The few version control queries a repository source needs.
pub trait GitCommands: Send + Sync {
    /// Tags matching `pattern` (all tags when `None`), oldest first.
    fn list_tags(&self, repo: &str, pattern: Option<&str>) -> FrontpageResult<Vec<String>>;

    /// When `tag` was created.
    fn tag_time(&self, repo: &str, tag: &str) -> FrontpageResult<DateTime<Utc>>;

    /// Commits reachable from `until` but not from `since`, newest first.
    fn log_between(&self, repo: &str, since: &str, until: &str)
        -> FrontpageResult<Vec<RawCommit>>;
}

/// Runs the `git` executable against bare or non-bare repository directories.
pub struct GitCli {
    program: String,
}

impl GitCli {
    pub fn new() -> Self {
        Self::with_program("git")
    }

    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn run(&self, repo: &str, args: &[&str]) -> FrontpageResult<String> {
        debug!(repo, ?args, "running git");

        let output = Command::new(&self.program)
            .arg(format!("--git-dir={}", repo))
            .args(args)
            .output()
            .map_err(|e| FrontpageError::Git(format!("could not run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(FrontpageError::Git(format!(
                "`git {}` in {} exited with {}: {}",
                args.join(" "),
                repo,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCommands for GitCli {
    fn list_tags(&self, repo: &str, pattern: Option<&str>) -> FrontpageResult<Vec<String>> {
        let mut args = vec!["tag", "--list", "--sort=creatordate"];
        if let Some(pattern) = pattern {
            args.push(pattern);
        }

        let output = self.run(repo, &args)?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn tag_time(&self, repo: &str, tag: &str) -> FrontpageResult<DateTime<Utc>> {
        let reference = format!("refs/tags/{}", tag);
        let output = self.run(
            repo,
            &["for-each-ref", "--format=%(creatordate:unix)", reference.as_str()],
        )?;
        parse_unix_time(&output)
            .ok_or_else(|| FrontpageError::Git(format!("no creation date for tag {}", tag)))
    }

    fn log_between(
        &self,
        repo: &str,
        since: &str,
        until: &str,
    ) -> FrontpageResult<Vec<RawCommit>> {
        let range = format!("{}..{}", since, until);
        let output = self.run(repo, &["log", LOG_FORMAT, range.as_str()])?;
        Ok(parse_log(&output))
    }
}

pub fn parse_unix_time(raw: &str) -> Option<DateTime<Utc>> {
    let seconds = raw.split_whitespace().next()?.parse::<i64>().ok()?;
    DateTime::from_timestamp(seconds, 0)
}

/// Parse `git log` output produced with the null-separated log format.
pub fn parse_log(output: &str) -> Vec<RawCommit> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let commit = parse_log_line(line);
            if commit.is_none() {
                warn!(line, "skipping malformed git log line");
            }
            commit
        })
        .collect()
}

fn parse_log_line(line: &str) -> Option<RawCommit> {
    let mut fields = line.splitn(5, '\0');
    let hash = fields.next()?.trim();
    let author = fields.next()?;
    let email = fields.next()?;
    let time = parse_unix_time(fields.next()?)?;
    let subject = fields.next()?;

    if hash.is_empty() {
        return None;
    }

    Some(RawCommit {
        hash: hash.to_string(),
        author: author.to_string(),
        email: email.to_string(),
        time,
        subject: subject.trim_end().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn git_in(dir: &Path, unix_time: i64, args: &[&str]) {
        let date = format!("{} +0000", unix_time);
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
            .args(args)
            .env("GIT_AUTHOR_NAME", "Ash Ketchum")
            .env("GIT_AUTHOR_EMAIL", "ash@example.com")
            .env("GIT_COMMITTER_NAME", "Ash Ketchum")
            .env("GIT_COMMITTER_EMAIL", "ash@example.com")
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    /// A repository with tags `v1` and `v2`, two commits apart.
    fn tagged_repo() -> Option<(TempDir, String)> {
        if Command::new("git").arg("--version").output().is_err() {
            return None;
        }

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        git_in(root, 1_700_000_000, &["init", "--quiet"]);
        git_in(root, 1_700_000_000, &["commit", "--quiet", "--allow-empty", "-m", "Initial import"]);
        git_in(root, 1_700_000_000, &["tag", "-a", "v1", "-m", "First release"]);
        git_in(root, 1_700_001_800, &["commit", "--quiet", "--allow-empty", "-m", "fixes #42"]);
        git_in(root, 1_700_002_700, &["commit", "--quiet", "--allow-empty", "-m", "Add abilities page"]);
        git_in(root, 1_700_003_600, &["tag", "-a", "v2", "-m", "Second release"]);

        let git_dir = root.join(".git").to_string_lossy().into_owned();
        Some((dir, git_dir))
    }

    #[test]
    fn test_cli_against_real_repository() {
        let Some((_dir, repo)) = tagged_repo() else {
            return;
        };
        let git = GitCli::new();

        assert_eq!(git.list_tags(&repo, None).unwrap(), vec!["v1", "v2"]);
        assert_eq!(git.list_tags(&repo, Some("v2*")).unwrap(), vec!["v2"]);

        assert_eq!(git.tag_time(&repo, "v1").unwrap().timestamp(), 1_700_000_000);
        assert_eq!(git.tag_time(&repo, "v2").unwrap().timestamp(), 1_700_003_600);

        let commits = git.log_between(&repo, "v1", "v2").unwrap();
        let subjects: Vec<&str> = commits.iter().map(|c| c.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Add abilities page", "fixes #42"]);
        assert_eq!(commits[1].author, "Ash Ketchum");
        assert_eq!(commits[1].email, "ash@example.com");
        assert_eq!(commits[1].time.timestamp(), 1_700_001_800);
        assert!(!commits[1].hash.is_empty());
    }

    #[test]
    fn test_cli_reports_unknown_tag() {
        let Some((_dir, repo)) = tagged_repo() else {
            return;
        };
        let git = GitCli::new();

        assert!(git.tag_time(&repo, "v9").is_err());
        assert!(matches!(
            git.log_between(&repo, "v1", "v9").unwrap_err(),
            FrontpageError::Git(_)
        ));
    }

    #[test]
    fn test_parse_log() {
        let output = "abc1234\0Ash Ketchum\0ash@example.com\01700000000\0Add pokedex entry for #42\n\
                      def5678\0Misty\0misty@example.com\01699990000\0Fix water types\n";

        let commits = parse_log(output);

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "abc1234");
        assert_eq!(commits[0].author, "Ash Ketchum");
        assert_eq!(commits[0].email, "ash@example.com");
        assert_eq!(commits[0].time.timestamp(), 1_700_000_000);
        assert_eq!(commits[0].subject, "Add pokedex entry for #42");
        assert_eq!(commits[1].subject, "Fix water types");
    }

    #[test]
    fn test_parse_log_skips_malformed_lines() {
        let output = "garbage line\nabc1234\0A\0a@example.com\0notatime\0Subject\n\n\
                      def5678\0B\0b@example.com\01700000000\0Kept\n";

        let commits = parse_log(output);

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].subject, "Kept");
    }

    #[test]
    fn test_parse_log_trims_subject() {
        let commits = parse_log("a1\0B\0c@d\01700000000\0Subject with spaces  \n");
        assert_eq!(commits[0].subject, "Subject with spaces");
    }

    #[test]
    fn test_parse_unix_time() {
        assert_eq!(parse_unix_time("1700000000\n").unwrap().timestamp(), 1_700_000_000);
        assert_eq!(
            parse_unix_time("1700000000 +0100").unwrap().timestamp(),
            1_700_000_000
        );
        assert!(parse_unix_time("").is_none());
        assert!(parse_unix_time("yesterday").is_none());
    }

    #[test]
    fn test_missing_program_is_a_git_error() {
        let git = GitCli::with_program("definitely-not-a-real-git-binary");
        let err = git.list_tags("/nonexistent", None).unwrap_err();
        assert!(matches!(err, FrontpageError::Git(_)));
    }
}
