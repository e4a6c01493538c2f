use crate::geometry::Frame;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type ListHash = String;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub order: Option<usize>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TaskList {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub items: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
}

impl Task {
    pub fn new(text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Task {
            text: text.into(),
            created_at,
            order: None,
            completed_at: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn set_done(&mut self, done: bool) {
        self.completed_at = if done { Some(Utc::now()) } else { None };
    }
}

/// Explicit order first (missing order sorts last), then creation time.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    let by_order = match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_order.then_with(|| a.created_at.cmp(&b.created_at))
}

/// Sorts in place and backfills a missing `order` with the task's sorted
/// position, bumped past the previous task so explicit indices are never reused.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
    let mut previous: Option<usize> = None;
    for (position, task) in tasks.iter_mut().enumerate() {
        let order = match task.order {
            Some(order) => order,
            None => {
                let assigned = previous.map_or(position, |p| position.max(p + 1));
                task.order = Some(assigned);
                assigned
            }
        };
        previous = Some(order);
    }
}

pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Creation stamps double as identity, so a new one must be strictly later
/// than every stamp already taken.
pub fn fresh_stamp(taken: impl Iterator<Item = DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match taken.max() {
        Some(latest) if latest >= now => latest + ChronoDuration::nanoseconds(1),
        _ => now,
    }
}

impl TaskList {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        TaskList {
            created_at,
            topic: None,
            items: Vec::new(),
            system_url: None,
            system_content: None,
            frame: None,
        }
    }

    /// Stable correlation key for windows and command-line lookups.
    pub fn hash(&self) -> ListHash {
        hash_stamp(&self.created_at)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.topic.is_none()
    }

    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(Task::is_done)
    }

    pub fn is_deletable(&self) -> bool {
        self.is_complete() || self.is_empty()
    }

    pub fn is_system(&self) -> bool {
        self.system_content.is_some()
    }

    pub fn done_count(&self) -> usize {
        self.items.iter().filter(|t| t.is_done()).count()
    }

    pub fn pending_count(&self) -> usize {
        self.items.len() - self.done_count()
    }

    pub fn task(&self, created_at: DateTime<Utc>) -> Option<&Task> {
        self.items.iter().find(|t| t.created_at == created_at)
    }

    fn task_mut(&mut self, created_at: DateTime<Utc>) -> Option<&mut Task> {
        self.items.iter_mut().find(|t| t.created_at == created_at)
    }

    /// Tasks in display order; runs the one-time order backfill.
    pub fn sorted(&mut self) -> &[Task] {
        sort_tasks(&mut self.items);
        &self.items
    }

    /// Display order without touching stored indices.
    pub fn ordered(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.items.iter().collect();
        tasks.sort_by(|a, b| compare_tasks(a, b));
        tasks
    }

    /// Position of a task in display order.
    pub fn position_of(&self, created_at: DateTime<Utc>) -> Option<usize> {
        self.ordered()
            .iter()
            .position(|t| t.created_at == created_at)
    }

    pub fn next_order(&self) -> usize {
        self.items
            .iter()
            .filter_map(|t| t.order)
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    /// Inserts `text` at order `at`, shifting every task at or after it.
    /// Returns the new task's identity, or `None` for blank text.
    pub fn create_task(&mut self, text: &str, at: usize) -> Option<DateTime<Utc>> {
        if text.trim().is_empty() {
            return None;
        }
        sort_tasks(&mut self.items);
        // a stored order at the ceiling leaves no room to shift; renumber first
        let at = if self.items.iter().any(|t| t.order == Some(usize::MAX)) {
            self.flatten_indexes();
            at.min(self.items.len())
        } else {
            at
        };
        let created_at = fresh_stamp(self.items.iter().map(|t| t.created_at));
        self.leave_place(at);
        let mut task = Task::new(capitalize_first(text), created_at);
        task.order = Some(at);
        self.items.push(task);
        sort_tasks(&mut self.items);
        Some(created_at)
    }

    pub fn append_task(&mut self, text: &str) -> Option<DateTime<Utc>> {
        let at = self.next_order();
        self.create_task(text, at)
    }

    pub fn remove_task(&mut self, created_at: DateTime<Utc>) -> Option<Task> {
        let idx = self.items.iter().position(|t| t.created_at == created_at)?;
        let removed = self.items.remove(idx);
        self.flatten_indexes();
        Some(removed)
    }

    pub fn edit_task(&mut self, created_at: DateTime<Utc>, text: &str) -> bool {
        match self.task_mut(created_at) {
            Some(task) => {
                task.text = capitalize_first(text);
                true
            }
            None => false,
        }
    }

    /// Flips completion without reordering; returns the new state.
    pub fn toggle_done(&mut self, created_at: DateTime<Utc>) -> Option<bool> {
        let task = self.task_mut(created_at)?;
        let done = !task.is_done();
        task.set_done(done);
        Some(done)
    }

    pub fn set_topic(&mut self, topic: &str) {
        self.topic = if topic.trim().is_empty() {
            None
        } else {
            Some(capitalize_first(topic))
        };
    }

    /// Drops abandoned rows whose text was emptied; returns how many went.
    pub fn clean_empty_tasks(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|t| !t.text.is_empty());
        let removed = before - self.items.len();
        if removed > 0 {
            self.flatten_indexes();
        }
        removed
    }

    pub fn copy_html(&self) -> String {
        let items: String = self
            .ordered()
            .iter()
            .map(|t| format!("<li>{}</li>", escape_html(&t.text)))
            .collect();
        let title = self
            .topic
            .as_ref()
            .map(|t| format!("<strong>{}</strong>", escape_html(t)))
            .unwrap_or_default();
        format!("{}<ul>{}</ul>", title, items)
    }

    /// Inserts each non-blank line as a task starting at order `at`.
    pub fn paste_lines(&mut self, content: &str, at: usize) -> usize {
        let lines = pasted_lines(content);
        for (offset, line) in lines.iter().enumerate() {
            self.create_task(line, at.saturating_add(offset));
        }
        lines.len()
    }

    /// Replaces the task's text with the first pasted line and inserts the
    /// rest right after it. Returns how many lines were used.
    pub fn paste_into_task(&mut self, created_at: DateTime<Utc>, content: &str) -> usize {
        let lines = pasted_lines(content);
        let Some((first, rest)) = lines.split_first() else {
            return 0;
        };
        sort_tasks(&mut self.items);
        let Some(task) = self.task_mut(created_at) else {
            return 0;
        };
        task.text = capitalize_first(first);
        let order = task.order.unwrap_or_default();
        for (offset, line) in rest.iter().enumerate() {
            self.create_task(line, order.saturating_add(1 + offset));
        }
        lines.len()
    }

    /// Plain text of a single task.
    pub fn copy_task(&self, created_at: DateTime<Utc>) -> Option<String> {
        self.task(created_at).map(|t| t.text.clone())
    }

    fn leave_place(&mut self, at: usize) {
        for task in self.items.iter_mut() {
            if let Some(order) = task.order.as_mut() {
                if *order >= at {
                    *order = order.saturating_add(1);
                }
            }
        }
    }

    fn flatten_indexes(&mut self) {
        sort_tasks(&mut self.items);
        for (idx, task) in self.items.iter_mut().enumerate() {
            task.order = Some(idx);
        }
    }
}

fn hash_stamp(stamp: &DateTime<Utc>) -> String {
    let text = stamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    format!("{:016x}", hash)
}

fn pasted_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
