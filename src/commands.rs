use crate::ui;
use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use stickydesk::arrange::Scope;
use stickydesk::geometry::Size;
use stickydesk::model::{fresh_stamp, ListHash, TaskList};
use stickydesk::settings::{Axis, Corner, License, Settings, Spacing};
use stickydesk::storage::{MemoryStore, Store, YamlStore};
use stickydesk::updates::{check_for_update, GithubReleases, CURRENT_VERSION, RELEASE_URL};
use stickydesk::window::{main_screen, VirtualHost, WindowHost};
use stickydesk::Desktop;

pub const MENU_BAR_HEIGHT: i32 = 25;

pub struct SettingsUpdate {
    pub corner: Option<Corner>,
    pub axis: Option<Axis>,
    pub margin: Option<Spacing>,
    pub spacing: Option<Spacing>,
    pub license: Option<License>,
}

pub fn tui(store: YamlStore, settings: Settings, config_path: &Path) -> Result<()> {
    ui::run(store, settings, config_path)
}

pub fn list(store: &YamlStore) -> Result<()> {
    if store.query_all().is_empty() {
        println!("(no notes)");
        return Ok(());
    }
    for note in store.query_all() {
        print_list(note);
        println!();
    }
    Ok(())
}

pub fn add(mut store: YamlStore, topic: Option<String>, tasks: Vec<String>) -> Result<()> {
    let created_at = fresh_stamp(store.query_all().iter().map(|l| l.created_at));
    let mut list = TaskList::new(created_at);
    if let Some(topic) = topic {
        list.set_topic(&topic);
    }
    let added = tasks
        .iter()
        .filter_map(|text| list.append_task(text))
        .count();
    if added == 0 && list.topic.is_none() {
        bail!("nothing to add: every task was blank");
    }
    let hash = list.hash();
    store.insert(list);
    store.save().context("saving desk")?;
    println!("Added note {} with {} task(s)", short(&hash), added);
    Ok(())
}

pub fn toggle(mut store: YamlStore, note: &str, index: usize) -> Result<()> {
    let hash = find_list(&store, note)?;
    let list = store
        .get_mut(&hash)
        .ok_or_else(|| anyhow!("note {} not found", note))?;
    let created_at = index
        .checked_sub(1)
        .and_then(|idx| list.ordered().get(idx).map(|t| t.created_at))
        .ok_or_else(|| anyhow!("note {} has no task {}", short(&hash), index))?;
    let done = list.toggle_done(created_at).unwrap_or(false);
    store.save().context("saving desk")?;
    println!(
        "Task {} of {} is now {}",
        index,
        short(&hash),
        if done { "done" } else { "open" }
    );
    Ok(())
}

pub fn copy(store: &YamlStore, note: &str) -> Result<()> {
    let hash = find_list(store, note)?;
    let list = store
        .get(&hash)
        .ok_or_else(|| anyhow!("note {} not found", note))?;
    println!("{}", list.copy_html());
    Ok(())
}

pub fn check_updates(url: &str) -> Result<()> {
    let status = check_for_update(&GithubReleases::new(url), CURRENT_VERSION);
    println!("{}", status.headline());
    println!("{}", status.detail());
    if status.is_available() {
        println!("{}", RELEASE_URL);
    }
    Ok(())
}

/// Same housekeeping the desktop does on focus loss and on quit.
pub fn clean(mut store: YamlStore) -> Result<()> {
    let hashes: Vec<ListHash> = store.query_all().iter().map(|l| l.hash()).collect();
    let mut tasks = 0;
    let mut notes = 0;
    for hash in hashes {
        if let Some(list) = store.get_mut(&hash) {
            tasks += list.clean_empty_tasks();
            if list.is_deletable() {
                store.delete(&hash);
                notes += 1;
            }
        }
    }
    store.save().context("saving desk")?;
    println!("Removed {} empty task(s) and {} note(s)", tasks, notes);
    Ok(())
}

/// Dry run of an arrangement pass; the desk file is not modified.
pub fn layout(store: YamlStore, settings: Settings, width: i32, height: i32) -> Result<()> {
    if store.query_all().is_empty() {
        println!("(no notes)");
        return Ok(());
    }
    let scratch = MemoryStore::with_lists(store.query_all().to_vec());
    let host = VirtualHost::new(vec![main_screen(Size::new(width, height), MENU_BAR_HEIGHT)]);
    let mut desk = Desktop::new(scratch, host, settings);
    desk.open_windows_for_all_lists()?;
    desk.arrange(Scope::Expanded);
    desk.host_mut().finish_animations();

    println!(
        "{} x {} screen, {} corner, {:?} axis",
        width,
        height,
        desk.settings().arrangement_corner.label(),
        desk.settings().arrangement_axis
    );
    for note in desk.notes() {
        let Some(frame) = desk.host().frame(note.window) else {
            continue;
        };
        let title = desk
            .list(&note.hash)
            .and_then(|l| l.topic.clone())
            .unwrap_or_else(|| "(untitled)".to_string());
        println!(
            "  {}  x={:<5} y={:<5} {}x{}  {}",
            short(&note.hash),
            frame.x,
            frame.y,
            frame.width,
            frame.height,
            title
        );
    }
    Ok(())
}

pub fn settings(mut settings: Settings, path: &Path, update: SettingsUpdate) -> Result<()> {
    let mut changed = false;
    if let Some(corner) = update.corner {
        settings.arrangement_corner = corner;
        changed = true;
    }
    if let Some(axis) = update.axis {
        settings.arrangement_axis = axis;
        changed = true;
    }
    if let Some(margin) = update.margin {
        settings.arrangement_corner_margin = margin;
        changed = true;
    }
    if let Some(spacing) = update.spacing {
        settings.arrangement_spacing = spacing;
        changed = true;
    }
    if let Some(license) = update.license {
        settings.license = license;
        changed = true;
    }
    if changed {
        settings
            .save(path)
            .with_context(|| format!("saving settings to {:?}", path))?;
        tracing::info!(?settings, "settings updated");
    }
    let yaml = serde_yaml::to_string(&settings).context("rendering settings")?;
    print!("{}", yaml);
    Ok(())
}

/// Resolves a unique hash prefix.
fn find_list(store: &impl Store, prefix: &str) -> Result<ListHash> {
    let matches: Vec<ListHash> = store
        .query_all()
        .iter()
        .map(|l| l.hash())
        .filter(|h| h.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [] => bail!("no note matches {}", prefix),
        [hash] => Ok(hash.clone()),
        _ => bail!("{} matches {} notes, use a longer prefix", prefix, matches.len()),
    }
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

fn print_list(list: &TaskList) {
    let title = list.topic.as_deref().unwrap_or("(untitled)");
    let marker = if list.is_system() { " [what's new]" } else { "" };
    println!(
        "{}  {}{}  {}/{} done",
        short(&list.hash()),
        title,
        marker,
        list.done_count(),
        list.items.len()
    );
    for (idx, task) in list.ordered().iter().enumerate() {
        let check = if task.is_done() { "x" } else { " " };
        println!("  {:>2}. [{}] {}", idx + 1, check, task.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn prefix_lookup_requires_a_unique_match() {
        let a = TaskList::new(Utc.timestamp_opt(1, 0).unwrap());
        let b = TaskList::new(Utc.timestamp_opt(2, 0).unwrap());
        let (ha, hb) = (a.hash(), b.hash());
        let store = MemoryStore::with_lists(vec![a, b]);
        assert_eq!(find_list(&store, &ha).unwrap(), ha);
        assert_eq!(find_list(&store, &hb[..10]).unwrap(), hb);
        assert!(find_list(&store, "").is_err());
        assert!(find_list(&store, "zz").is_err());
    }
}
