// hookworm/src/watch/push_event.rs

//! A lenient view of a GitHub push event: only what the watch stage needs. Missing
//! and `null` fields decode to their defaults instead of failing.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

static PULL_REQUEST_MERGE_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"Merge pull request #[0-9]+ from.*").unwrap()
});

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushEvent {
  #[serde(rename = "ref", default, deserialize_with = "nullable")]
  pub git_ref: String,
  #[serde(default, deserialize_with = "nullable")]
  pub commits: Vec<Commit>,
  #[serde(default)]
  pub head_commit: Option<Commit>,
  #[serde(default)]
  pub repository: Option<Repository>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commit {
  #[serde(default, deserialize_with = "nullable")]
  pub id: String,
  #[serde(default, deserialize_with = "nullable")]
  pub message: String,
  #[serde(default, deserialize_with = "nullable")]
  pub timestamp: String,
  #[serde(default, deserialize_with = "nullable")]
  pub url: String,
  #[serde(default, deserialize_with = "nullable")]
  pub author: Person,
  #[serde(default, deserialize_with = "nullable")]
  pub committer: Person,
  #[serde(default, deserialize_with = "nullable")]
  pub added: Vec<String>,
  #[serde(default, deserialize_with = "nullable")]
  pub removed: Vec<String>,
  #[serde(default, deserialize_with = "nullable")]
  pub modified: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Person {
  #[serde(default, deserialize_with = "nullable")]
  pub name: String,
  #[serde(default, deserialize_with = "nullable")]
  pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
  #[serde(default, deserialize_with = "nullable")]
  pub name: String,
  #[serde(default, deserialize_with = "nullable")]
  pub url: String,
  #[serde(default, deserialize_with = "nullable")]
  pub owner: Person,
}

impl PushEvent {
  pub fn from_slice(raw: &[u8]) -> serde_json::Result<Self> {
    serde_json::from_slice(raw)
  }

  /// A push of several commits whose head commit is GitHub's merge commit.
  pub fn is_pull_request_merge(&self) -> bool {
    self.commits.len() > 1
      && self
        .head_commit
        .as_ref()
        .is_some_and(|hc| PULL_REQUEST_MERGE_RE.is_match(&hc.message))
  }

  /// Every path touched by the push: the commits followed by the head commit. For a
  /// pull-request merge the first commit is left out.
  pub fn paths(&self) -> Vec<String> {
    let skip_first = self.is_pull_request_merge();
    self
      .commits
      .iter()
      .chain(self.head_commit.iter())
      .enumerate()
      .filter(|(i, _)| !(skip_first && *i == 0))
      .flat_map(|(_, commit)| commit.paths())
      .collect()
  }

  /// `owner/name`, as far as the payload says.
  pub fn repo_full_name(&self) -> String {
    match &self.repository {
      Some(repo) if !repo.owner.name.is_empty() => format!("{}/{}", repo.owner.name, repo.name),
      Some(repo) => repo.name.clone(),
      None => String::new(),
    }
  }
}

impl Commit {
  /// Added, removed and modified paths, sorted and de-duplicated.
  pub fn paths(&self) -> Vec<String> {
    let set: BTreeSet<&String> = self.added.iter().chain(&self.removed).chain(&self.modified).collect();
    set.into_iter().cloned().collect()
  }
}
