//! Task bucketing, filtering, sorting and statistics.
//!
//! An incomplete task with a due date belongs to exactly one bucket. The
//! calendar-day check runs first: a task due at any instant of today's date
//! (in the zone of `now`) is `DueToday`, even if that instant has passed.
//! Only the remaining tasks are split into `Overdue` / `Upcoming` by
//! comparing against `now`.

use std::cmp::Ordering;

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{Task, TaskStats};
use crate::sort::{cmp_case_insensitive, cmp_nulls_last, SortOrder};

/// Where a task stands relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskBucket {
    Completed,
    DueToday,
    Overdue,
    Upcoming,
    /// Incomplete with no due date.
    Undated,
}

/// Classify a task against `now`. Day boundaries follow `now`'s time zone.
pub fn bucket<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> TaskBucket {
    if task.completed {
        return TaskBucket::Completed;
    }
    let Some(due) = task.due_date else {
        return TaskBucket::Undated;
    };

    if due.with_timezone(&now.timezone()).date_naive() == now.date_naive() {
        return TaskBucket::DueToday;
    }

    let now_utc = now.with_timezone(&Utc);
    match due.cmp(&now_utc) {
        Ordering::Less => TaskBucket::Overdue,
        Ordering::Greater => TaskBucket::Upcoming,
        // Unreachable in practice: an instant equal to now is on today's date.
        Ordering::Equal => TaskBucket::DueToday,
    }
}

/// Listing filter for tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Today,
    Upcoming,
    Overdue,
    Completed,
    Pending,
}

impl TaskFilter {
    /// Unrecognized values mean no filter.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("today") => TaskFilter::Today,
            Some("upcoming") => TaskFilter::Upcoming,
            Some("overdue") => TaskFilter::Overdue,
            Some("completed") => TaskFilter::Completed,
            Some("pending") => TaskFilter::Pending,
            _ => TaskFilter::All,
        }
    }

    pub fn matches<Tz: TimeZone>(self, task: &Task, now: &DateTime<Tz>) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Completed => task.completed,
            TaskFilter::Pending => !task.completed,
            TaskFilter::Today => bucket(task, now) == TaskBucket::DueToday,
            TaskFilter::Overdue => bucket(task, now) == TaskBucket::Overdue,
            TaskFilter::Upcoming => bucket(task, now) == TaskBucket::Upcoming,
        }
    }
}

/// Sortable task fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSortField {
    #[default]
    DueDate,
    /// high < medium < low, ties by due date ascending.
    Priority,
    CreatedAt,
    /// Case-insensitive, like note titles.
    Title,
}

impl TaskSortField {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("due_date") => TaskSortField::DueDate,
            Some("priority") => TaskSortField::Priority,
            Some("created_at") => TaskSortField::CreatedAt,
            Some("title") => TaskSortField::Title,
            _ => TaskSortField::default(),
        }
    }
}

/// Compare two tasks for listing. Missing dates sort last in both directions.
pub fn compare_tasks(a: &Task, b: &Task, field: TaskSortField, order: SortOrder) -> Ordering {
    match field {
        TaskSortField::DueDate => cmp_nulls_last(a.due_date, b.due_date, order),
        TaskSortField::CreatedAt => order.apply(a.created_at.cmp(&b.created_at)),
        TaskSortField::Title => order.apply(cmp_case_insensitive(&a.title, &b.title)),
        TaskSortField::Priority => order
            .apply(a.priority.rank().cmp(&b.priority.rank()))
            .then_with(|| cmp_nulls_last(a.due_date, b.due_date, SortOrder::Asc)),
    }
}

/// Listing request for tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskListQuery {
    pub filter: TaskFilter,
    pub sort: TaskSortField,
    pub order: SortOrder,
}

impl Default for TaskListQuery {
    fn default() -> Self {
        Self {
            filter: TaskFilter::All,
            sort: TaskSortField::DueDate,
            order: SortOrder::Asc,
        }
    }
}

impl TaskListQuery {
    /// Build from raw request values. Order is ascending unless `desc`.
    pub fn from_params(filter: Option<&str>, sort: Option<&str>, order: Option<&str>) -> Self {
        Self {
            filter: TaskFilter::parse(filter),
            sort: TaskSortField::parse(sort),
            order: SortOrder::parse_or(order, SortOrder::Asc),
        }
    }

    /// Filter then stable-sort `tasks`.
    pub fn apply<Tz: TimeZone>(&self, tasks: Vec<Task>, now: &DateTime<Tz>) -> Vec<Task> {
        let mut selected: Vec<Task> = tasks
            .into_iter()
            .filter(|t| self.filter.matches(t, now))
            .collect();
        selected.sort_by(|a, b| compare_tasks(a, b, self.sort, self.order));
        selected
    }
}

impl TaskStats {
    /// Single pass over a user's tasks.
    pub fn tally<'a, Tz: TimeZone>(
        tasks: impl IntoIterator<Item = &'a Task>,
        now: &DateTime<Tz>,
    ) -> Self {
        let mut stats = TaskStats::default();
        for task in tasks {
            stats.total += 1;
            match bucket(task, now) {
                TaskBucket::Completed => stats.completed += 1,
                TaskBucket::DueToday => stats.due_today += 1,
                TaskBucket::Overdue => stats.overdue += 1,
                TaskBucket::Upcoming => stats.upcoming += 1,
                TaskBucket::Undated => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, RecurringType};
    use chrono::{Duration, FixedOffset, NaiveDate};
    use uuid::Uuid;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
            .and_utc()
    }

    fn task(title: &str) -> Task {
        let created = utc(2024, 1, 1, 0, 0);
        Task {
            id: Uuid::now_v7(),
            user_id: Uuid::nil(),
            title: title.to_string(),
            description: None,
            completed: false,
            due_date: None,
            priority: Priority::Medium,
            note_id: None,
            recurring_type: RecurringType::None,
            recurring_interval: 1,
            reminder: None,
            created_at: created,
            updated_at: created,
            note_title: None,
        }
    }

    fn due(title: &str, at: DateTime<Utc>) -> Task {
        Task {
            due_date: Some(at),
            ..task(title)
        }
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    // -- Bucketing ------------------------------------------------------------

    #[test]
    fn test_task_due_earlier_today_is_today_not_overdue() {
        let now = utc(2024, 3, 10, 15, 0);
        let t = due("morning", utc(2024, 3, 10, 8, 0));

        assert_eq!(bucket(&t, &now), TaskBucket::DueToday);
        assert!(TaskFilter::Today.matches(&t, &now));
        assert!(!TaskFilter::Overdue.matches(&t, &now));
        assert!(!TaskFilter::Upcoming.matches(&t, &now));
    }

    #[test]
    fn test_task_due_later_today_is_today_not_upcoming() {
        let now = utc(2024, 3, 10, 9, 0);
        let t = due("evening", utc(2024, 3, 10, 23, 59));

        assert_eq!(bucket(&t, &now), TaskBucket::DueToday);
        assert!(!TaskFilter::Upcoming.matches(&t, &now));
    }

    #[test]
    fn test_yesterday_is_overdue_tomorrow_is_upcoming() {
        let now = utc(2024, 3, 10, 0, 30);
        assert_eq!(bucket(&due("y", utc(2024, 3, 9, 23, 59)), &now), TaskBucket::Overdue);
        assert_eq!(bucket(&due("t", utc(2024, 3, 11, 0, 0)), &now), TaskBucket::Upcoming);
    }

    #[test]
    fn test_day_boundary_follows_time_zone_of_now() {
        // 2024-03-10 23:30 UTC is 2024-03-11 01:30 at UTC+2.
        let due_at = utc(2024, 3, 10, 23, 30);
        let t = due("late", due_at);

        let now_utc = utc(2024, 3, 10, 12, 0);
        assert_eq!(bucket(&t, &now_utc), TaskBucket::DueToday);

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let now_local = now_utc.with_timezone(&plus_two);
        assert_eq!(bucket(&t, &now_local), TaskBucket::Upcoming);
    }

    #[test]
    fn test_completed_and_undated_buckets() {
        let now = utc(2024, 3, 10, 12, 0);
        let done = Task {
            completed: true,
            ..due("done", utc(2024, 3, 10, 8, 0))
        };
        assert_eq!(bucket(&done, &now), TaskBucket::Completed);
        assert!(!TaskFilter::Today.matches(&done, &now));
        assert_eq!(bucket(&task("someday"), &now), TaskBucket::Undated);
    }

    // -- Filters --------------------------------------------------------------

    #[test]
    fn test_filter_parse_unknown_is_all() {
        assert_eq!(TaskFilter::parse(Some("everything")), TaskFilter::All);
        assert_eq!(TaskFilter::parse(None), TaskFilter::All);
        assert_eq!(TaskFilter::parse(Some("pending")), TaskFilter::Pending);
    }

    #[test]
    fn test_pending_and_completed_filters() {
        let now = Utc::now();
        let open = task("open");
        let done = Task {
            completed: true,
            ..task("done")
        };
        assert!(TaskFilter::Pending.matches(&open, &now));
        assert!(!TaskFilter::Pending.matches(&done, &now));
        assert!(TaskFilter::Completed.matches(&done, &now));
        assert!(TaskFilter::All.matches(&done, &now));
    }

    // -- Sorting --------------------------------------------------------------

    #[test]
    fn test_priority_sort_ties_break_by_due_date() {
        let tasks = vec![
            Task {
                priority: Priority::High,
                ..due("high/01-03", utc(2024, 1, 3, 0, 0))
            },
            Task {
                priority: Priority::Low,
                ..due("low/01-01", utc(2024, 1, 1, 0, 0))
            },
            Task {
                priority: Priority::High,
                ..due("high/01-01", utc(2024, 1, 1, 0, 0))
            },
        ];
        let query = TaskListQuery::from_params(None, Some("priority"), Some("asc"));
        let sorted = query.apply(tasks, &utc(2023, 12, 1, 0, 0));
        assert_eq!(titles(&sorted), vec!["high/01-01", "high/01-03", "low/01-01"]);
    }

    #[test]
    fn test_priority_desc_keeps_due_date_tie_break_ascending() {
        let tasks = vec![
            Task {
                priority: Priority::Low,
                ..due("low/01-05", utc(2024, 1, 5, 0, 0))
            },
            Task {
                priority: Priority::Low,
                ..due("low/01-02", utc(2024, 1, 2, 0, 0))
            },
            Task {
                priority: Priority::High,
                ..due("high", utc(2024, 1, 1, 0, 0))
            },
        ];
        let query = TaskListQuery::from_params(None, Some("priority"), Some("DESC"));
        let sorted = query.apply(tasks, &utc(2023, 12, 1, 0, 0));
        assert_eq!(titles(&sorted), vec!["low/01-02", "low/01-05", "high"]);
    }

    #[test]
    fn test_null_due_dates_sort_last_ascending() {
        let tasks = vec![
            task("none"),
            due("later", utc(2024, 2, 1, 0, 0)),
            due("sooner", utc(2024, 1, 1, 0, 0)),
        ];
        let sorted = TaskListQuery::default().apply(tasks, &utc(2023, 1, 1, 0, 0));
        assert_eq!(titles(&sorted), vec!["sooner", "later", "none"]);
    }

    #[test]
    fn test_null_due_dates_sort_last_descending() {
        let tasks = vec![
            task("none"),
            due("sooner", utc(2024, 1, 1, 0, 0)),
            due("later", utc(2024, 2, 1, 0, 0)),
        ];
        let query = TaskListQuery::from_params(None, Some("due_date"), Some("desc"));
        let sorted = query.apply(tasks, &utc(2023, 1, 1, 0, 0));
        assert_eq!(titles(&sorted), vec!["later", "sooner", "none"]);
    }

    #[test]
    fn test_title_sort_is_case_insensitive() {
        let tasks = vec![task("banana"), task("Cherry"), task("apple")];
        let query = TaskListQuery::from_params(None, Some("title"), None);
        let sorted = query.apply(tasks, &Utc::now());
        assert_eq!(titles(&sorted), vec!["apple", "banana", "Cherry"]);
    }

    #[test]
    fn test_created_at_sort_desc() {
        let base = utc(2024, 1, 1, 0, 0);
        let tasks = vec![
            Task {
                created_at: base,
                ..task("first")
            },
            Task {
                created_at: base + Duration::hours(1),
                ..task("second")
            },
        ];
        let query = TaskListQuery::from_params(None, Some("created_at"), Some("desc"));
        let sorted = query.apply(tasks, &Utc::now());
        assert_eq!(titles(&sorted), vec!["second", "first"]);
    }

    #[test]
    fn test_unknown_sort_and_order_fall_back() {
        let q = TaskListQuery::from_params(Some("bogus"), Some("reminder"), Some("sideways"));
        assert_eq!(q, TaskListQuery::default());
    }

    #[test]
    fn test_apply_filters_before_sorting() {
        let now = utc(2024, 3, 10, 12, 0);
        let tasks = vec![
            due("tomorrow", utc(2024, 3, 11, 9, 0)),
            due("yesterday", utc(2024, 3, 9, 9, 0)),
            due("next week", utc(2024, 3, 17, 9, 0)),
        ];
        let query = TaskListQuery::from_params(Some("upcoming"), None, None);
        let result = query.apply(tasks, &now);
        assert_eq!(titles(&result), vec!["tomorrow", "next week"]);
    }

    // -- Statistics -----------------------------------------------------------

    #[test]
    fn test_stats_partition() {
        let now = utc(2024, 3, 10, 12, 0);
        let tasks = vec![
            due("today-past", utc(2024, 3, 10, 1, 0)),
            due("today-future", utc(2024, 3, 10, 22, 0)),
            due("overdue", utc(2024, 3, 1, 0, 0)),
            due("upcoming", utc(2024, 4, 1, 0, 0)),
            Task {
                completed: true,
                ..due("done", utc(2024, 3, 1, 0, 0))
            },
            task("undated"),
        ];
        let stats = TaskStats::tally(&tasks, &now);
        assert_eq!(
            stats,
            TaskStats {
                total: 6,
                completed: 1,
                due_today: 2,
                overdue: 1,
                upcoming: 1,
            }
        );
        assert!(stats.due_today + stats.overdue + stats.upcoming + stats.completed < stats.total);
    }

    #[test]
    fn test_stats_sum_equals_total_when_every_open_task_is_dated() {
        let now = utc(2024, 3, 10, 12, 0);
        let tasks = vec![
            due("a", utc(2024, 3, 10, 1, 0)),
            due("b", utc(2024, 2, 1, 0, 0)),
            Task {
                completed: true,
                ..task("c")
            },
        ];
        let stats = TaskStats::tally(&tasks, &now);
        assert_eq!(
            stats.due_today + stats.overdue + stats.upcoming + stats.completed,
            stats.total
        );
    }

    #[test]
    fn test_stats_empty() {
        let none: Vec<Task> = Vec::new();
        let stats = TaskStats::tally(&none, &Utc::now());
        assert_eq!(stats, TaskStats::default());
    }
}
