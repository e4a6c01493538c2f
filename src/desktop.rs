use crate::arrange::{plan, Arrangement, Candidate, Scope};
use crate::events::{ChangeFeed, DeskEvent, ListChange};
use crate::fade::{FadeEffect, FadeOut};
use crate::geometry::{Frame, Point, Size};
use crate::minimize::{MinimizeState, GAUGE_SIZE};
use crate::model::{fresh_stamp, ListHash, TaskList};
use crate::settings::Settings;
use crate::storage::{Store, StoreError};
use crate::window::{WindowHost, WindowId, WindowLevel};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, error, info, warn};

pub const DEFAULT_NOTE_SIZE: Size = Size::new(250, 300);
pub const DEFAULT_NOTE_POSITION: Point = Point::new(50, 90);
const CASCADE_OFFSET: i32 = 20;

#[derive(Debug)]
pub struct NoteWindow {
    pub hash: ListHash,
    pub window: WindowId,
    pub minimize: MinimizeState,
    pub fade: FadeOut,
}

/// Focus-filter driven presentation applied to every note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    pub blur: bool,
    pub normal_level: bool,
}

#[derive(Debug)]
pub struct Desktop<S: Store, H: WindowHost> {
    store: S,
    host: H,
    settings: Settings,
    notes: Vec<NoteWindow>,
    focused_window: Option<WindowId>,
    focused_list: Option<ListHash>,
    visibility: Visibility,
    changes: ChangeFeed,
}

impl<S: Store, H: WindowHost> Desktop<S, H> {
    pub fn new(store: S, host: H, settings: Settings) -> Self {
        Desktop {
            store,
            host,
            settings,
            notes: Vec::new(),
            focused_window: None,
            focused_list: None,
            visibility: Visibility::default(),
            changes: ChangeFeed::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn notes(&self) -> &[NoteWindow] {
        &self.notes
    }

    pub fn note(&self, hash: &str) -> Option<&NoteWindow> {
        self.notes.iter().find(|n| n.hash == hash)
    }

    pub fn note_for_window(&self, window: WindowId) -> Option<&NoteWindow> {
        self.notes.iter().find(|n| n.window == window)
    }

    pub fn list(&self, hash: &str) -> Option<&TaskList> {
        self.store.get(hash)
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.focused_window
    }

    pub fn focused_list(&self) -> Option<&str> {
        self.focused_list.as_deref()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&ListChange) + 'static) {
        self.changes.subscribe(subscriber);
    }

    pub fn handle(&mut self, event: DeskEvent) -> Result<(), StoreError> {
        debug!(?event, "desk event");
        match event {
            DeskEvent::ApplicationWillTerminate => self.handle_app_termination()?,
            DeskEvent::WindowDidBecomeKey(window) => self.handle_focus_changed(window)?,
            DeskEvent::WindowWillClose(window) => self.handle_window_closed(window)?,
            DeskEvent::ScreenParametersChanged | DeskEvent::ArrangeRequested => {
                self.arrange(Scope::Expanded)
            }
            DeskEvent::ArrangeMinimizedRequested => self.arrange(Scope::Minimized),
            DeskEvent::NewNoteRequested => {
                self.create_and_show_new_note(None)?;
            }
            DeskEvent::CloseRequested => self.handle_close_command()?,
            DeskEvent::VisibilityChanged {
                blur,
                to_normal_level,
            } => self.set_visibility(blur, to_normal_level),
            DeskEvent::CleanRequested(hash) => self.clean_empty_tasks(&hash)?,
            DeskEvent::MinimizeAllRequested => self.minimize_all(),
            DeskEvent::BringAllUpRequested => self.restore_all(),
        }
        Ok(())
    }

    /// Startup: guarantees at least one list, then opens a window per list.
    pub fn open_windows_for_all_lists(&mut self) -> Result<(), StoreError> {
        if self.store.query_all().is_empty() {
            self.create_list()?;
        }
        let hashes: Vec<ListHash> = self.store.query_all().iter().map(|l| l.hash()).collect();
        for hash in hashes {
            if self.note(&hash).is_none() {
                self.open_window(&hash, None)?;
            }
        }
        Ok(())
    }

    /// Stores and opens a "what's new" checklist. A failed save only skips it.
    pub fn open_release_notes(&mut self, mut checklist: TaskList) -> Result<(), StoreError> {
        checklist.created_at = fresh_stamp(
            self.store
                .query_all()
                .iter()
                .map(|l| l.created_at)
                .chain(std::iter::once(checklist.created_at)),
        );
        let hash = checklist.hash();
        self.store.insert(checklist);
        if let Err(err) = self.store.save() {
            warn!(%err, "could not store release notes");
            self.store.delete(&hash);
            return Ok(());
        }
        self.changes.publish(ListChange::Created(hash.clone()));
        self.open_window(&hash, None)?;
        Ok(())
    }

    pub fn create_and_show_new_note(&mut self, at: Option<Point>) -> Result<ListHash, StoreError> {
        let center = at.unwrap_or_else(|| self.new_note_position());
        let hash = self.create_list()?;
        self.open_window(&hash, Some(center))?;
        Ok(hash)
    }

    /// Upper-right corner of the focused window, or somewhere on the main screen.
    pub fn new_note_position(&self) -> Point {
        match self.focused_window.and_then(|w| self.host.frame(w)) {
            Some(frame) => Point::new(frame.max_x(), frame.max_y()),
            None => self.random_position(),
        }
    }

    fn random_position(&self) -> Point {
        let Some(screen) = self.host.main_screen() else {
            return DEFAULT_NOTE_POSITION;
        };
        let margin = self.settings.arrangement_corner_margin.points();
        let area = screen.frame;
        let half_w = DEFAULT_NOTE_SIZE.width / 2;
        let half_h = DEFAULT_NOTE_SIZE.height / 2;
        let (min_x, max_x) = (area.x + half_w, area.max_x() - half_w - margin);
        let (min_y, max_y) = (
            area.y + half_h,
            area.max_y() - screen.menu_bar_height - half_h - margin,
        );
        let mut rng = rand::thread_rng();
        let x = if max_x > min_x {
            rng.gen_range(min_x..=max_x)
        } else {
            area.center().x
        };
        let y = if max_y > min_y {
            rng.gen_range(min_y..=max_y)
        } else {
            area.center().y
        };
        Point::new(x, y)
    }

    pub fn handle_focus_changed(&mut self, window: WindowId) -> Result<(), StoreError> {
        self.focused_window = Some(window);
        self.focused_list = self.note_for_window(window).map(|n| n.hash.clone());
        self.clean_unfocused_notes()
    }

    /// Cycles key focus through note windows.
    pub fn focus_next(&mut self, forward: bool) -> Result<(), StoreError> {
        if self.notes.is_empty() {
            return Ok(());
        }
        let len = self.notes.len();
        let current = self
            .focused_window
            .and_then(|w| self.notes.iter().position(|n| n.window == w));
        let next = match (current, forward) {
            (Some(idx), true) => (idx + 1) % len,
            (Some(idx), false) => (idx + len - 1) % len,
            (None, true) => 0,
            (None, false) => len - 1,
        };
        let window = self.notes[next].window;
        self.host.focus(window);
        self.handle_focus_changed(window)
    }

    pub fn handle_close_command(&mut self) -> Result<(), StoreError> {
        match self.focused_list.clone() {
            Some(hash) => {
                let deletable = self.store.get(&hash).map_or(false, |l| l.is_deletable());
                let fading = self.note(&hash).map_or(false, |n| n.fade.is_fading());
                if deletable && !fading {
                    self.delete_list(&hash)?;
                } else {
                    debug!(%hash, deletable, fading, "close ignored");
                }
            }
            None => {
                if let Some(window) = self.focused_window.take() {
                    self.host.close(window);
                }
            }
        }
        Ok(())
    }

    /// Native close of a window; note data is only dropped when deletable.
    pub fn handle_window_closed(&mut self, window: WindowId) -> Result<(), StoreError> {
        match self.note_for_window(window).map(|n| n.hash.clone()) {
            Some(hash) => {
                if self.store.get(&hash).map_or(false, |l| l.is_deletable()) {
                    self.delete_list(&hash)?;
                } else {
                    self.forget_window(&hash);
                }
            }
            None => {
                self.host.close(window);
                if self.focused_window == Some(window) {
                    self.focused_window = None;
                }
            }
        }
        Ok(())
    }

    /// Remembers window frames and discards every deletable list.
    pub fn handle_app_termination(&mut self) -> Result<(), StoreError> {
        for note in &self.notes {
            if let Some(frame) = self.host.frame(note.window) {
                if let Some(list) = self.store.get_mut(&note.hash) {
                    list.frame = Some(note.minimize.expanded_frame(frame));
                }
            }
        }
        let doomed: Vec<ListHash> = self
            .store
            .query_all()
            .iter()
            .filter(|l| l.is_deletable())
            .map(|l| l.hash())
            .collect();
        for hash in &doomed {
            self.forget_window(hash);
            self.store.delete(hash);
        }
        self.commit("terminating")?;
        info!(deleted = doomed.len(), "discarded finished notes");
        for hash in doomed {
            self.changes.publish(ListChange::Deleted(hash));
        }
        Ok(())
    }

    pub fn arrange(&mut self, scope: Scope) {
        let candidates: Vec<Candidate> = self
            .notes
            .iter()
            .filter_map(|note| {
                Some(Candidate {
                    window: note.window,
                    frame: self.host.frame(note.window)?,
                    screen: self.host.screen(note.window),
                    minimized: note.minimize.is_minimized(),
                })
            })
            .collect();
        let arrangement = Arrangement::from(&self.settings);
        for placement in plan(&candidates, &arrangement, scope) {
            self.host.set_frame(placement.window, placement.frame, true);
        }
    }

    pub fn add_task(
        &mut self,
        hash: &str,
        text: &str,
        at: Option<usize>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let Some(list) = self.store.get_mut(hash) else {
            return Ok(None);
        };
        let created = match at {
            Some(at) => list.create_task(text, at),
            None => list.append_task(text),
        };
        if created.is_some() {
            self.commit("creating task")?;
            self.refresh_note(hash);
        }
        Ok(created)
    }

    pub fn edit_task(
        &mut self,
        hash: &str,
        created_at: DateTime<Utc>,
        text: &str,
    ) -> Result<bool, StoreError> {
        let edited = self
            .store
            .get_mut(hash)
            .map_or(false, |l| l.edit_task(created_at, text));
        if edited {
            self.commit("editing task")?;
            self.refresh_note(hash);
        }
        Ok(edited)
    }

    pub fn toggle_task(
        &mut self,
        hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Option<bool>, StoreError> {
        let done = self
            .store
            .get_mut(hash)
            .and_then(|l| l.toggle_done(created_at));
        if done.is_some() {
            self.commit("toggling task")?;
            self.refresh_note(hash);
        }
        Ok(done)
    }

    pub fn remove_task(&mut self, hash: &str, created_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let removed = self
            .store
            .get_mut(hash)
            .and_then(|l| l.remove_task(created_at))
            .is_some();
        if removed {
            self.commit("deleting task")?;
            self.refresh_note(hash);
        }
        Ok(removed)
    }

    pub fn set_topic(&mut self, hash: &str, topic: &str) -> Result<(), StoreError> {
        let Some(list) = self.store.get_mut(hash) else {
            return Ok(());
        };
        list.set_topic(topic);
        self.commit("editing topic")?;
        self.refresh_note(hash);
        Ok(())
    }

    pub fn clean_empty_tasks(&mut self, hash: &str) -> Result<(), StoreError> {
        let removed = self
            .store
            .get_mut(hash)
            .map_or(0, |l| l.clean_empty_tasks());
        if removed > 0 {
            self.commit("cleaning tasks")?;
            self.refresh_note(hash);
        }
        Ok(())
    }

    pub fn paste(&mut self, hash: &str, content: &str, at: usize) -> Result<usize, StoreError> {
        let pasted = self
            .store
            .get_mut(hash)
            .map_or(0, |l| l.paste_lines(content, at));
        if pasted > 0 {
            self.commit("pasting tasks")?;
            self.refresh_note(hash);
        }
        Ok(pasted)
    }

    /// Pastes over one task: its text becomes the first line and the rest follow it.
    pub fn paste_into_task(
        &mut self,
        hash: &str,
        created_at: DateTime<Utc>,
        content: &str,
    ) -> Result<usize, StoreError> {
        let pasted = self
            .store
            .get_mut(hash)
            .map_or(0, |l| l.paste_into_task(created_at, content));
        if pasted > 0 {
            self.commit("pasting into task")?;
            self.refresh_note(hash);
        }
        Ok(pasted)
    }

    pub fn copy(&self, hash: &str) -> Option<String> {
        self.store.get(hash).map(TaskList::copy_html)
    }

    pub fn copy_task(&self, hash: &str, created_at: DateTime<Utc>) -> Option<String> {
        self.store.get(hash)?.copy_task(created_at)
    }

    /// Closes the list's window and deletes it with its tasks.
    pub fn delete_list(&mut self, hash: &str) -> Result<(), StoreError> {
        self.forget_window(hash);
        if self.store.delete(hash).is_some() {
            self.commit("deleting list")?;
            info!(hash, "deleted note");
            self.changes.publish(ListChange::Deleted(hash.to_string()));
        }
        Ok(())
    }

    pub fn minimize(&mut self, hash: &str) {
        let Some(idx) = self.note_index(hash) else {
            return;
        };
        let window = self.notes[idx].window;
        let Some(current) = self.host.frame(window) else {
            return;
        };
        if self.notes[idx].minimize.minimize(current).is_none() {
            return;
        }
        self.host.set_close_button_hidden(window, true);
        // Settle once with the old size, then again once the gauge size is known.
        self.arrange(Scope::Minimized);
        let origin = self
            .host
            .frame(window)
            .map_or(current.origin(), |f| f.origin());
        self.host
            .set_frame(window, Frame::from_parts(origin, GAUGE_SIZE), true);
        self.arrange(Scope::Minimized);
    }

    pub fn restore(&mut self, hash: &str) {
        let Some(idx) = self.note_index(hash) else {
            return;
        };
        let window = self.notes[idx].window;
        let Some(frame) = self.notes[idx].minimize.restore() else {
            return;
        };
        self.host.set_frame(window, frame, true);
        let fading = self.notes[idx].fade.is_fading();
        self.host.set_close_button_hidden(window, fading);
        if let Some(list) = self.store.get(hash) {
            self.host
                .set_close_button_enabled(window, list.is_deletable());
        }
    }

    pub fn toggle_minimized(&mut self, hash: &str) {
        match self.note(hash).map(|n| n.minimize.is_minimized()) {
            Some(true) => self.restore(hash),
            Some(false) => self.minimize(hash),
            None => {}
        }
    }

    pub fn minimize_all(&mut self) {
        for hash in self.note_hashes() {
            self.minimize(&hash);
        }
    }

    pub fn restore_all(&mut self) {
        for hash in self.note_hashes() {
            self.restore(&hash);
        }
    }

    pub fn set_visibility(&mut self, blur: bool, to_normal_level: bool) {
        self.visibility = Visibility {
            blur,
            normal_level: to_normal_level,
        };
        for note in &self.notes {
            self.host.set_blurred(note.window, blur);
            let level = if to_normal_level || note.fade.is_fading() {
                WindowLevel::Normal
            } else {
                WindowLevel::Floating
            };
            self.host.set_level(note.window, level);
        }
    }

    /// Explicit cancel of a running countdown; only offered on the pro tier.
    pub fn cancel_fade(&mut self, hash: &str) -> bool {
        let Some(idx) = self.note_index(hash) else {
            return false;
        };
        let license = self.settings.license;
        match self.notes[idx].fade.cancel(license) {
            Some(effect) => {
                self.apply_fade(idx, effect);
                true
            }
            None => false,
        }
    }

    /// Advances every fade timer by `elapsed` seconds.
    pub fn tick(&mut self, elapsed: f64) -> Result<(), StoreError> {
        let mut vanished = Vec::new();
        for idx in 0..self.notes.len() {
            match self.notes[idx].fade.tick(elapsed) {
                FadeEffect::Disappear => vanished.push(self.notes[idx].hash.clone()),
                effect => self.apply_fade(idx, effect),
            }
        }
        for hash in vanished {
            info!(%hash, "note faded out");
            self.delete_list(&hash)?;
        }
        Ok(())
    }

    fn create_list(&mut self) -> Result<ListHash, StoreError> {
        let created_at = fresh_stamp(self.store.query_all().iter().map(|l| l.created_at));
        let list = TaskList::new(created_at);
        let hash = list.hash();
        self.store.insert(list);
        self.commit("creating list")?;
        info!(%hash, "created note");
        self.changes.publish(ListChange::Created(hash.clone()));
        Ok(hash)
    }

    fn open_window(&mut self, hash: &str, center: Option<Point>) -> Result<(), StoreError> {
        let Some(list) = self.store.get(hash) else {
            return Ok(());
        };
        let cascade = self.notes.len() as i32 * CASCADE_OFFSET;
        let frame = match (center, list.frame) {
            (Some(center), _) => Frame::centered_at(center, DEFAULT_NOTE_SIZE),
            (None, Some(saved)) => saved,
            (None, None) => Frame::from_parts(
                Point::new(
                    DEFAULT_NOTE_POSITION.x + cascade,
                    DEFAULT_NOTE_POSITION.y + cascade,
                ),
                DEFAULT_NOTE_SIZE,
            ),
        };
        let deletable = list.is_deletable();
        let fade = FadeOut::opened(list.is_complete(), self.settings.fade_out_seconds);

        let window = self.host.open(hash, frame);
        self.host.set_close_button_enabled(window, deletable);
        if self.visibility.blur {
            self.host.set_blurred(window, true);
        }
        if self.visibility.normal_level {
            self.host.set_level(window, WindowLevel::Normal);
        }
        debug!(hash, window, ?frame, "opened note window");
        self.notes.push(NoteWindow {
            hash: hash.to_string(),
            window,
            minimize: MinimizeState::default(),
            fade,
        });
        self.host.focus(window);
        self.handle_focus_changed(window)
    }

    fn clean_unfocused_notes(&mut self) -> Result<(), StoreError> {
        let unfocused: Vec<ListHash> = self
            .notes
            .iter()
            .filter(|n| Some(n.hash.as_str()) != self.focused_list.as_deref())
            .map(|n| n.hash.clone())
            .collect();
        for hash in unfocused {
            self.clean_empty_tasks(&hash)?;
        }
        Ok(())
    }

    /// Re-derives window state after a list mutation and publishes it.
    fn refresh_note(&mut self, hash: &str) {
        if let Some(list) = self.store.get(hash) {
            let deletable = list.is_deletable();
            let complete = list.is_complete();
            if let Some(idx) = self.note_index(hash) {
                let window = self.notes[idx].window;
                self.host.set_close_button_enabled(window, deletable);
                let effect = self.notes[idx].fade.completion_changed(complete);
                self.apply_fade(idx, effect);
            }
        }
        self.changes.publish(ListChange::Updated(hash.to_string()));
    }

    fn apply_fade(&mut self, idx: usize, effect: FadeEffect) {
        let note = &self.notes[idx];
        let window = note.window;
        match effect {
            FadeEffect::Opacity { alpha } => {
                self.host.set_alpha(window, alpha);
                if alpha < 1.0 {
                    self.host.set_level(window, WindowLevel::Normal);
                    self.host.set_shadow(window, false);
                    self.host.set_close_button_hidden(window, true);
                }
            }
            FadeEffect::Restore => {
                let level = if self.visibility.normal_level {
                    WindowLevel::Normal
                } else {
                    WindowLevel::Floating
                };
                self.host.set_alpha(window, 1.0);
                self.host.set_level(window, level);
                self.host.set_shadow(window, true);
                self.host
                    .set_close_button_hidden(window, note.minimize.is_minimized());
            }
            FadeEffect::Unchanged | FadeEffect::Disappear => {}
        }
    }

    fn forget_window(&mut self, hash: &str) {
        if let Some(idx) = self.note_index(hash) {
            let note = self.notes.remove(idx);
            self.host.close(note.window);
            if self.focused_window == Some(note.window) {
                self.focused_window = None;
                self.focused_list = None;
            }
        }
    }

    fn note_index(&self, hash: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.hash == hash)
    }

    fn note_hashes(&self) -> Vec<ListHash> {
        self.notes.iter().map(|n| n.hash.clone()).collect()
    }

    fn commit(&mut self, action: &str) -> Result<(), StoreError> {
        self.store.save().map_err(|err| {
            error!(%err, action, "store save failed");
            err
        })
    }
}
