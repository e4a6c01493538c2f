use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use stickydesk::arrange::Scope;
use stickydesk::fade::FadePhase;
use stickydesk::geometry::{Frame, Point, Size};
use stickydesk::minimize::GAUGE_SIZE;
use stickydesk::settings::{Axis, Corner, License, Settings, Spacing};
use stickydesk::window::{main_screen, WindowLevel};
use stickydesk::{
    DeskEvent, Desktop, ListChange, MemoryStore, Store, TaskList, VirtualHost, WindowHost,
    YamlStore,
};

type Desk = Desktop<MemoryStore, VirtualHost>;

fn host() -> VirtualHost {
    VirtualHost::new(vec![main_screen(Size::new(1440, 900), 25)])
}

fn desk_with(lists: Vec<TaskList>, settings: Settings) -> Desk {
    let mut desk = Desktop::new(MemoryStore::with_lists(lists), host(), settings);
    desk.open_windows_for_all_lists().unwrap();
    desk
}

fn list_at(secs: i64, topic: Option<&str>, tasks: &[&str]) -> TaskList {
    let mut list = TaskList::new(Utc.timestamp_opt(secs, 0).unwrap());
    list.topic = topic.map(str::to_string);
    for task in tasks {
        list.append_task(task);
    }
    list
}

fn only_hash<S: Store>(desk: &Desktop<S, VirtualHost>) -> String {
    assert_eq!(desk.notes().len(), 1);
    desk.notes()[0].hash.clone()
}

fn task_ids(desk: &Desk, hash: &str) -> Vec<chrono::DateTime<Utc>> {
    desk.list(hash)
        .unwrap()
        .ordered()
        .iter()
        .map(|t| t.created_at)
        .collect()
}

#[test]
fn launch_with_empty_store_opens_one_empty_note() {
    let desk = desk_with(Vec::new(), Settings::default());
    let lists = desk.store().query_all();
    assert_eq!(lists.len(), 1);
    assert!(lists[0].is_empty());
    assert_eq!(desk.host().open_count(), 1);
    assert_eq!(desk.focused_list(), Some(lists[0].hash().as_str()));
    assert!(desk.store().saves >= 1);
}

#[test]
fn completing_every_task_fades_the_note_away() {
    let desk_list = list_at(10, None, &["Write report", "Send invoice", "Call bank"]);
    let mut desk = desk_with(vec![desk_list], Settings::default());
    let hash = only_hash(&desk);
    let window = desk.notes()[0].window;

    for id in task_ids(&desk, &hash) {
        desk.toggle_task(&hash, id).unwrap();
    }
    assert!(desk.list(&hash).unwrap().is_complete());
    assert!(matches!(
        desk.note(&hash).unwrap().fade.phase(),
        FadePhase::ConfirmedDone { .. }
    ));

    desk.tick(1.0).unwrap();
    assert_eq!(
        desk.note(&hash).unwrap().fade.phase(),
        FadePhase::Counting { progress: 0.0 }
    );

    for _ in 0..5 {
        desk.tick(1.0).unwrap();
    }
    let faded = desk.host().window(window).unwrap();
    assert_eq!(faded.alpha, 0.75);
    assert_eq!(faded.level, WindowLevel::Normal);
    assert!(!faded.shadow);
    assert!(faded.close_hidden);

    for _ in 5..20 {
        desk.tick(1.0).unwrap();
    }
    assert!(desk.store().query_all().is_empty());
    assert!(!desk.host().is_open(window));
    assert!(desk.notes().is_empty());
}

#[test]
fn note_complete_at_launch_never_counts_down() {
    let mut groceries = list_at(10, Some("Groceries"), &["Milk", "Eggs"]);
    for task in groceries.items.iter_mut() {
        task.set_done(true);
    }
    let mut desk = desk_with(vec![groceries], Settings::default());
    let hash = only_hash(&desk);
    let window = desk.notes()[0].window;

    let fade = &desk.note(&hash).unwrap().fade;
    assert!(fade.already_done());
    assert!(fade.is_done());
    assert!(!fade.shows_progress());

    for _ in 0..60 {
        desk.tick(1.0).unwrap();
    }
    assert!(desk.list(&hash).is_some());
    assert_eq!(desk.host().window(window).unwrap().alpha, 1.0);
}

#[test]
fn vertical_top_left_arrangement_stacks_down_from_the_corner() {
    let settings = Settings {
        arrangement_corner: Corner::TopLeft,
        arrangement_axis: Axis::Vertical,
        arrangement_corner_margin: Spacing::Medium,
        arrangement_spacing: Spacing::Minimum,
        ..Settings::default()
    };
    let tall = VirtualHost::new(vec![main_screen(Size::new(1920, 1400), 25)]);
    let mut desk = Desktop::new(MemoryStore::new(), tall, settings);
    for center in [
        Point::new(300, 1200),
        Point::new(700, 900),
        Point::new(1100, 600),
        Point::new(1500, 300),
    ] {
        desk.create_and_show_new_note(Some(center)).unwrap();
    }
    desk.handle(DeskEvent::ArrangeRequested).unwrap();

    let margin = Spacing::Medium.points();
    let spacing = Spacing::Minimum.points();
    let top = 1400 - 25;
    let mut above = 0;
    for (count, note) in desk.notes().iter().enumerate() {
        let frame = desk.host().frame(note.window).unwrap();
        assert_eq!(frame.x, margin);
        assert_eq!(top - frame.max_y(), margin + above + spacing * count as i32);
        above += frame.height;
    }
}

#[test]
fn close_respects_deletability_and_fading() {
    let mut desk = desk_with(vec![list_at(10, None, &["Pending"])], Settings::default());
    let busy = only_hash(&desk);

    desk.handle(DeskEvent::CloseRequested).unwrap();
    assert!(desk.list(&busy).is_some(), "pending note must stay open");

    let fresh = desk.create_and_show_new_note(None).unwrap();
    desk.handle(DeskEvent::CloseRequested).unwrap();
    assert!(desk.list(&fresh).is_none());
    assert!(desk.note(&fresh).is_none());

    let window = desk.note(&busy).unwrap().window;
    desk.host_mut().focus(window);
    desk.handle(DeskEvent::WindowDidBecomeKey(window)).unwrap();
    let id = task_ids(&desk, &busy)[0];
    desk.toggle_task(&busy, id).unwrap();
    desk.tick(1.0).unwrap();
    desk.tick(2.0).unwrap();
    assert!(desk.note(&busy).unwrap().fade.is_fading());
    desk.handle(DeskEvent::CloseRequested).unwrap();
    assert!(desk.list(&busy).is_some(), "fading note closes itself");
}

#[test]
fn close_on_auxiliary_window_closes_it_unconditionally() {
    let mut desk = desk_with(vec![list_at(10, None, &["Pending"])], Settings::default());
    let about = desk
        .host_mut()
        .open("About", Frame::new(500, 400, 420, 160));
    desk.handle(DeskEvent::WindowDidBecomeKey(about)).unwrap();
    assert_eq!(desk.focused_list(), None);

    desk.handle(DeskEvent::CloseRequested).unwrap();
    assert!(!desk.host().is_open(about));
    assert_eq!(desk.notes().len(), 1);
    assert_eq!(desk.store().query_all().len(), 1);
}

#[test]
fn termination_discards_finished_notes_and_remembers_frames() {
    let mut done = list_at(20, Some("Done"), &["Ship it"]);
    done.items[0].set_done(true);
    let lists = vec![
        list_at(10, None, &[]),
        done,
        list_at(30, Some("Keep"), &["Still open"]),
    ];
    let keep = lists[2].hash();
    let mut desk = desk_with(lists, Settings::default());
    let window = desk.note(&keep).unwrap().window;
    desk.host_mut()
        .set_frame(window, Frame::new(600, 300, 250, 300), false);

    desk.handle(DeskEvent::ApplicationWillTerminate).unwrap();

    let remaining: Vec<String> = desk.store().query_all().iter().map(|l| l.hash()).collect();
    assert_eq!(remaining, vec![keep.clone()]);
    assert_eq!(
        desk.list(&keep).unwrap().frame,
        Some(Frame::new(600, 300, 250, 300))
    );
}

#[test]
fn minimized_notes_arrange_separately_and_restore_their_frame() {
    let lists = vec![list_at(10, None, &["a"]), list_at(20, None, &["b"])];
    let (first, second) = (lists[0].hash(), lists[1].hash());
    let mut desk = desk_with(lists, Settings::default());
    let second_window = desk.note(&second).unwrap().window;
    desk.host_mut()
        .set_frame(second_window, Frame::new(875, 350, 250, 300), false);
    let first_window = desk.note(&first).unwrap().window;
    let original = desk.host().frame(first_window).unwrap();

    desk.minimize(&first);
    let note = desk.note(&first).unwrap();
    assert!(note.minimize.is_minimized());
    assert_eq!(
        desk.host().frame(first_window),
        Some(Frame::from_parts(Point::new(40, 40), GAUGE_SIZE))
    );
    assert!(desk.host().window(first_window).unwrap().close_hidden);

    desk.minimize(&second);
    assert_eq!(
        desk.host().frame(second_window),
        Some(Frame::from_parts(Point::new(40 + 96 + 20, 40), GAUGE_SIZE))
    );

    desk.arrange(Scope::Expanded);
    assert_eq!(
        desk.host().frame(first_window),
        Some(Frame::from_parts(Point::new(40, 40), GAUGE_SIZE))
    );

    desk.handle(DeskEvent::BringAllUpRequested).unwrap();
    assert_eq!(desk.host().frame(first_window), Some(original));
    assert_eq!(
        desk.host().frame(second_window),
        Some(Frame::new(875, 350, 250, 300))
    );
    assert!(!desk.host().window(first_window).unwrap().close_hidden);
}

#[test]
fn cancelling_a_fade_is_a_pro_feature() {
    let fading_desk = |license| {
        let settings = Settings {
            license,
            ..Settings::default()
        };
        let mut desk = desk_with(vec![list_at(10, None, &["Only"])], settings);
        let hash = only_hash(&desk);
        let id = task_ids(&desk, &hash)[0];
        desk.toggle_task(&hash, id).unwrap();
        desk.tick(1.0).unwrap();
        desk.tick(5.0).unwrap();
        (desk, hash)
    };

    let (mut free, hash) = fading_desk(License::Free);
    assert!(!free.cancel_fade(&hash));
    assert!(free.note(&hash).unwrap().fade.is_fading());

    let (mut pro, hash) = fading_desk(License::Pro);
    let window = pro.note(&hash).unwrap().window;
    assert!(pro.cancel_fade(&hash));
    assert_eq!(pro.note(&hash).unwrap().fade.phase(), FadePhase::Active);
    let restored = pro.host().window(window).unwrap();
    assert_eq!(restored.alpha, 1.0);
    assert_eq!(restored.level, WindowLevel::Floating);
    assert!(restored.shadow);
    assert!(!restored.close_hidden);

    for _ in 0..40 {
        pro.tick(1.0).unwrap();
    }
    assert!(pro.list(&hash).is_some());
}

#[test]
fn reopening_a_task_restores_a_fading_note() {
    let mut desk = desk_with(vec![list_at(10, None, &["Only"])], Settings::default());
    let hash = only_hash(&desk);
    let window = desk.notes()[0].window;
    let id = task_ids(&desk, &hash)[0];
    desk.toggle_task(&hash, id).unwrap();
    desk.tick(1.0).unwrap();
    desk.tick(10.0).unwrap();
    assert_eq!(desk.host().window(window).unwrap().alpha, 0.5);

    desk.toggle_task(&hash, id).unwrap();
    let restored = desk.host().window(window).unwrap();
    assert_eq!(restored.alpha, 1.0);
    assert!(!restored.close_enabled);
    assert_eq!(desk.note(&hash).unwrap().fade.phase(), FadePhase::Active);
}

#[test]
fn clean_request_drops_abandoned_rows() {
    let mut desk = desk_with(vec![list_at(10, None, &["Keep"])], Settings::default());
    let hash = only_hash(&desk);
    let blank = desk.add_task(&hash, "Draft", None).unwrap().unwrap();
    desk.edit_task(&hash, blank, "").unwrap();
    assert_eq!(desk.list(&hash).unwrap().items.len(), 2);

    desk.handle(DeskEvent::CleanRequested(hash.clone())).unwrap();
    let texts: Vec<String> = desk
        .list(&hash)
        .unwrap()
        .ordered()
        .iter()
        .map(|t| t.text.clone())
        .collect();
    assert_eq!(texts, vec!["Keep".to_string()]);
}

#[test]
fn list_changes_are_published() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let mut desk = Desktop::new(MemoryStore::new(), host(), Settings::default());
    desk.subscribe(move |change| sink.borrow_mut().push(change.clone()));

    desk.open_windows_for_all_lists().unwrap();
    let hash = only_hash(&desk);
    desk.add_task(&hash, "milk", None).unwrap();
    desk.set_topic(&hash, "").unwrap();
    desk.delete_list(&hash).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            ListChange::Created(hash.clone()),
            ListChange::Updated(hash.clone()),
            ListChange::Updated(hash.clone()),
            ListChange::Deleted(hash),
        ]
    );
}

#[test]
fn failed_save_propagates_to_the_caller() {
    let mut desk = desk_with(Vec::new(), Settings::default());
    desk.store_mut().fail_saves = true;
    assert!(desk.handle(DeskEvent::NewNoteRequested).is_err());
    assert!(desk.handle(DeskEvent::ApplicationWillTerminate).is_err());
}

#[test]
fn notes_reopen_where_they_were_left() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desk.yml");

    let hash = {
        let store = YamlStore::open(&path).unwrap();
        let mut desk = Desktop::new(store, host(), Settings::default());
        desk.open_windows_for_all_lists().unwrap();
        let hash = only_hash(&desk);
        desk.add_task(&hash, "water plants", None).unwrap();
        let window = desk.notes()[0].window;
        desk.host_mut()
            .set_frame(window, Frame::new(700, 420, 250, 300), false);
        desk.handle(DeskEvent::ApplicationWillTerminate).unwrap();
        hash
    };

    let store = YamlStore::open(&path).unwrap();
    let mut desk = Desktop::new(store, host(), Settings::default());
    desk.open_windows_for_all_lists().unwrap();
    assert_eq!(only_hash(&desk), hash);
    let window = desk.notes()[0].window;
    assert_eq!(
        desk.host().frame(window),
        Some(Frame::new(700, 420, 250, 300))
    );
    assert_eq!(
        desk.list(&hash).unwrap().items[0].text,
        "Water plants".to_string()
    );
}
