use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;
use stickydesk::model::{compare_tasks, sort_tasks};
use stickydesk::{Task, TaskList};

fn stamp(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000 + millis).unwrap()
}

prop_compose! {
    fn arb_tasks()(raw in prop::collection::vec((prop::option::of(0usize..16), 0i64..500, any::<bool>()), 0..12)) -> Vec<Task> {
        raw.into_iter()
            .enumerate()
            // the index keeps identities unique while leaving creation order shuffled
            .map(|(idx, (order, secs, done))| {
                let mut task = Task::new(format!("task {}", idx), stamp(secs * 1000 + idx as i64));
                task.order = order;
                if done {
                    task.set_done(true);
                }
                task
            })
            .collect()
    }
}

fn list_of(tasks: Vec<Task>) -> TaskList {
    let mut list = TaskList::new(stamp(-1));
    list.items = tasks;
    list
}

fn orders_by_identity(tasks: &[Task]) -> HashMap<DateTime<Utc>, Option<usize>> {
    tasks.iter().map(|t| (t.created_at, t.order)).collect()
}

proptest! {
    #[test]
    fn null_orders_sort_last_and_ties_follow_creation(tasks in arb_tasks()) {
        let mut sorted = tasks.clone();
        sorted.sort_by(compare_tasks);
        for pair in sorted.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(!(a.order.is_none() && b.order.is_some()));
            if a.order == b.order {
                prop_assert!(a.created_at <= b.created_at);
            }
        }
        let mut again = sorted.clone();
        again.sort_by(compare_tasks);
        prop_assert_eq!(again, sorted);
    }

    #[test]
    fn backfill_is_idempotent(tasks in arb_tasks()) {
        let mut once = tasks.clone();
        sort_tasks(&mut once);
        prop_assert!(once.iter().all(|t| t.order.is_some()));
        let mut twice = once.clone();
        sort_tasks(&mut twice);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn inserting_shifts_only_tasks_at_or_after_the_index(tasks in arb_tasks(), at in 0usize..20) {
        let mut list = list_of(tasks);
        let before = orders_by_identity(list.sorted());

        let created = list.create_task("inserted", at).unwrap();

        let at_index: Vec<&Task> = list.items.iter().filter(|t| t.order == Some(at)).collect();
        prop_assert_eq!(at_index.len(), 1);
        prop_assert_eq!(at_index[0].created_at, created);
        for task in list.items.iter().filter(|t| t.created_at != created) {
            let previous = before[&task.created_at].unwrap();
            let expected = if previous >= at { previous + 1 } else { previous };
            prop_assert_eq!(task.order, Some(expected));
        }
    }

    #[test]
    fn removing_leaves_a_dense_sequence(tasks in arb_tasks(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!tasks.is_empty());
        let mut list = list_of(tasks);
        let before: Vec<DateTime<Utc>> = list.ordered().iter().map(|t| t.created_at).collect();
        let removed = before[pick.index(before.len())];

        list.remove_task(removed).unwrap();

        let after = list.ordered();
        let orders: Vec<Option<usize>> = after.iter().map(|t| t.order).collect();
        let dense: Vec<Option<usize>> = (0..after.len()).map(Some).collect();
        prop_assert_eq!(orders, dense);
        let expected: Vec<DateTime<Utc>> = before.into_iter().filter(|c| *c != removed).collect();
        let actual: Vec<DateTime<Utc>> = after.iter().map(|t| t.created_at).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn deletable_iff_empty_or_all_done(tasks in arb_tasks(), topic in prop::option::of("[a-z]{1,8}")) {
        let mut list = list_of(tasks);
        list.topic = topic;
        let expected = (list.items.is_empty() && list.topic.is_none())
            || (!list.items.is_empty() && list.items.iter().all(Task::is_done));
        prop_assert_eq!(list.is_deletable(), expected);
    }
}
