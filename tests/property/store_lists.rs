//! Property-based tests for the client task store.
//!
//! Uses proptest to verify that after any sequence of list responses the
//! store holds exactly the most recent list, in server order, and that
//! creates made in between are dropped by the next list.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use taskdesk::api::loopback::LoopbackApi;
use taskdesk::store::TaskStore;
use taskdesk_proto::task::{NewTask, Task, TaskId, TaskPriority, TaskStatus};

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
    ]
}

fn arb_priority() -> impl Strategy<Value = TaskPriority> {
    prop_oneof![
        Just(TaskPriority::Low),
        Just(TaskPriority::Medium),
        Just(TaskPriority::High),
    ]
}

/// A server list with unique ids, in arbitrary order.
fn arb_list() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(("[A-Za-z ]{1,16}", arb_status(), arb_priority()), 0..12)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (title, status, priority))| Task {
                    id: TaskId::new(format!("t{i}")),
                    title,
                    description: String::new(),
                    status,
                    priority,
                    assignee_id: String::new(),
                    created_at: None,
                    updated_at: None,
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn last_list_wins(lists in prop::collection::vec(arb_list(), 1..6)) {
        let api = LoopbackApi::default();
        let store = TaskStore::new(api.clone());
        let rt = runtime();

        for list in &lists {
            api.set_tasks(list.clone());
            rt.block_on(store.list()).unwrap();
            rt.block_on(store.create(&NewTask::new("between lists"))).unwrap();
        }
        let last = lists.last().unwrap().clone();
        api.set_tasks(last.clone());
        rt.block_on(store.list()).unwrap();

        prop_assert_eq!(store.tasks(), last.clone());
        let state = store.snapshot();
        prop_assert_eq!(state.len(), last.len());
        for task in &last {
            prop_assert_eq!(state.get(&task.id), Some(task));
        }
        prop_assert!(!state.loading);
        prop_assert_eq!(state.error, None);
    }
}
