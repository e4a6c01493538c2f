use crate::model::{Task, TaskList};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::cmp::Ordering;
use std::time::Duration;
use tracing::{debug, warn};

pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const RELEASE_URL: &str = "https://github.com/stickydesk/stickydesk/releases";
pub const LATEST_RELEASE_URL: &str =
    "https://api.github.com/repos/stickydesk/stickydesk/releases/latest";
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

const RELEASE_NOTES: &[&str] = &[
    "Minimized notes show a progress gauge",
    "Arrange minimized notes separately with ^B",
    "Paste several lines at once to add them as tasks",
    "Cancel a fading note with ^X (pro)",
];

/// Whether dot-separated version `a` is numerically newer than `b`.
/// Missing or non-numeric components count as zero.
pub fn is_newer(a: &str, b: &str) -> bool {
    compare_versions(a, b) == Ordering::Greater
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.trim()
            .trim_start_matches('v')
            .split('.')
            .map(|part| part.parse().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Where the latest published version is looked up.
pub trait UpdateSource {
    /// The latest version, or `None` whenever it cannot be determined.
    fn latest_version(&self) -> Option<String>;
}

/// Latest release of the project's GitHub repository.
pub struct GithubReleases {
    url: String,
}

#[derive(Deserialize)]
struct Release {
    tag_name: String,
}

impl GithubReleases {
    pub fn new(url: impl Into<String>) -> Self {
        GithubReleases { url: url.into() }
    }

    fn fetch(&self) -> Result<String, ureq::Error> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(CHECK_TIMEOUT))
            .build()
            .into();
        let release: Release = agent
            .get(&self.url)
            .header("Accept", "application/vnd.github+json")
            .call()?
            .into_body()
            .read_json()?;
        Ok(release.tag_name)
    }
}

impl Default for GithubReleases {
    fn default() -> Self {
        GithubReleases::new(LATEST_RELEASE_URL)
    }
}

impl UpdateSource for GithubReleases {
    fn latest_version(&self) -> Option<String> {
        match self.fetch() {
            Ok(tag) => {
                let version = tag.trim().trim_start_matches('v').to_string();
                debug!(%version, "latest release");
                (!version.is_empty()).then_some(version)
            }
            Err(err) => {
                warn!(%err, url = %self.url, "update check failed");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    Available { latest: String, current: String },
    UpToDate { current: String },
}

impl UpdateStatus {
    /// An unknown latest version reads as up to date.
    pub fn from_versions(latest: Option<&str>, current: &str) -> Self {
        match latest {
            Some(latest) if is_newer(latest, current) => UpdateStatus::Available {
                latest: latest.to_string(),
                current: current.to_string(),
            },
            _ => UpdateStatus::UpToDate {
                current: current.to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, UpdateStatus::Available { .. })
    }

    pub fn headline(&self) -> &'static str {
        match self {
            UpdateStatus::Available { .. } => "There is an update available!",
            UpdateStatus::UpToDate { .. } => "Your app is up to date",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            UpdateStatus::Available { latest, current } => {
                format!("Version {} (yours is {})", latest, current)
            }
            UpdateStatus::UpToDate { current } => format!("Version {}", current),
        }
    }
}

pub fn check_for_update(source: &dyn UpdateSource, current: &str) -> UpdateStatus {
    UpdateStatus::from_versions(source.latest_version().as_deref(), current)
}

/// The "what's new" checklist to show after an upgrade. Nothing on first run
/// or when the running version is not newer than the last one seen.
pub fn release_checklist(last_seen: Option<&str>, current: &str) -> Option<TaskList> {
    let last_seen = last_seen?;
    if !is_newer(current, last_seen) {
        return None;
    }
    let now = Utc::now();
    let mut list = TaskList::new(now);
    list.topic = Some(format!("What's new in v{}", current));
    list.items = RELEASE_NOTES
        .iter()
        .enumerate()
        .map(|(idx, note)| {
            let mut task = Task::new(*note, now + ChronoDuration::nanoseconds(idx as i64 + 1));
            task.order = Some(idx);
            task
        })
        .collect();
    list.system_url = Some(RELEASE_URL.to_string());
    list.system_content = Some(current.to_string());
    Some(list)
}
