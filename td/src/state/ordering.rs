//! Ordering rules shared by the store and the in-memory board

use std::collections::HashSet;

use crate::domain::Task;

/// Sort tasks by their `order` field
pub fn sort_by_order(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| t.order);
}

/// Order value for a task appended at the end
pub fn next_order(tasks: &[Task]) -> i64 {
    tasks.iter().map(|t| t.order).max().map_or(0, |max| max + 1)
}

/// Rearrange `tasks` so the named ids come first, in the given order
///
/// Unknown and repeated ids are ignored. Tasks not named keep their previous
/// relative order after the named ones. Every task's `order` becomes its
/// position; only tasks whose position changed are touched.
pub fn reorder(mut tasks: Vec<Task>, ids: &[String]) -> Vec<Task> {
    sort_by_order(&mut tasks);
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(tasks.len());

    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        if let Some(pos) = tasks.iter().position(|t| &t.id == id) {
            result.push(tasks.remove(pos));
        }
    }
    result.extend(tasks);

    for (position, task) in result.iter_mut().enumerate() {
        let position = position as i64;
        if task.order != position {
            task.order = position;
            task.touch();
        }
    }
    result
}

/// Id sequence with `id` moved to the front
pub fn ids_with_first(tasks: &[Task], id: &str) -> Vec<String> {
    std::iter::once(id.to_string())
        .chain(tasks.iter().filter(|t| t.id != id).map(|t| t.id.clone()))
        .collect()
}

/// Id sequence with `id` moved to the end
pub fn ids_with_last(tasks: &[Task], id: &str) -> Vec<String> {
    tasks
        .iter()
        .filter(|t| t.id != id)
        .map(|t| t.id.clone())
        .chain(std::iter::once(id.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks(n: usize) -> Vec<Task> {
        (0..n)
            .map(|i| Task::with_id(format!("t{}", i), &format!("Task {}", i), i as i64).unwrap())
            .collect()
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_move_last_to_first() {
        let requested: Vec<String> = ["t3", "t0", "t1", "t2"].iter().map(|s| s.to_string()).collect();
        let result = reorder(tasks(4), &requested);
        assert_eq!(ids(&result), vec!["t3", "t0", "t1", "t2"]);
        for (i, task) in result.iter().enumerate() {
            assert_eq!(task.order, i as i64);
        }
    }

    #[test]
    fn test_partial_ids_append_rest_in_previous_order() {
        let result = reorder(tasks(4), &["t2".to_string(), "missing".to_string(), "t2".to_string()]);
        assert_eq!(ids(&result), vec!["t2", "t0", "t1", "t3"]);
        assert_eq!(result.iter().map(|t| t.order).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_sparse_orders_are_renumbered() {
        let mut input = tasks(3);
        input[0].order = 10;
        input[1].order = 20;
        input[2].order = 5;
        let result = reorder(input, &[]);
        assert_eq!(ids(&result), vec!["t2", "t0", "t1"]);
        assert_eq!(result[2].order, 2);
    }

    #[test]
    fn test_next_order() {
        assert_eq!(next_order(&[]), 0);
        let mut input = tasks(2);
        input[1].order = 7;
        assert_eq!(next_order(&input), 8);
    }

    #[test]
    fn test_first_and_last_id_sequences() {
        let input = tasks(3);
        assert_eq!(ids_with_first(&input, "t2"), vec!["t2", "t0", "t1"]);
        assert_eq!(ids_with_last(&input, "t0"), vec!["t1", "t2", "t0"]);
    }
}
