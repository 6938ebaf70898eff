//! Integration tests for the planner pipelines.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pomodoroom_planner::auto_schedule::ProjectedTask;
use pomodoroom_planner::schedule::{calendar_blocks_from_records, CalendarEventRecord};
use pomodoroom_planner::scheduler::{
    calculate_churn_outside_window, detect_impacted_window_from_calendar_delta,
    merge_local_replan, ImpactedWindow,
};
use pomodoroom_planner::task::split_preview::SegmentKind;
use pomodoroom_planner::{
    build_initial_split_preview, build_projected_tasks_with_auto_breaks,
    recalculate_estimated_starts, AutoScheduler, BlockIdGenerator, BlockType, DailyTemplate,
    EventDrivenReplanner, FixedEvent, PlannerConfig, ProgressiveSelector, ReplanRequest,
    ScheduleBlock, ScheduleRequest, SplitPreviewInput, Task,
};

/// 2025-03-10 is a Monday.
fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
}

fn block(id: &str, kind: BlockType, start: DateTime<Utc>, end: DateTime<Utc>) -> ScheduleBlock {
    ScheduleBlock::new(id, kind, start, end).unwrap()
}

fn template() -> DailyTemplate {
    DailyTemplate {
        wake_up: "08:00".to_string(),
        sleep: "13:00".to_string(),
        fixed_events: vec![FixedEvent {
            id: "standup".to_string(),
            name: "Standup".to_string(),
            start_time: "09:00".to_string(),
            duration_minutes: 15,
            days: vec![1, 2, 3, 4, 5],
            enabled: true,
        }],
        max_parallel_lanes: None,
    }
}

fn backlog() -> Vec<Task> {
    vec![
        Task::with_id("write", "Write report")
            .with_priority(80)
            .with_pomodoros(3, 0),
        Task::with_id("review", "Review PRs")
            .with_priority(60)
            .with_pomodoros(2, 1),
        Task::with_id("mail", "Inbox zero").with_pomodoros(4, 0),
    ]
}

fn assert_well_formed(blocks: &[ScheduleBlock], day_start: DateTime<Utc>, day_end: DateTime<Utc>) {
    assert!(
        blocks.windows(2).all(|w| w[0].start_time <= w[1].start_time),
        "blocks must be sorted by start"
    );
    for b in blocks {
        assert!(b.end_time > b.start_time, "block {} has empty range", b.id);
    }

    let locked: Vec<&ScheduleBlock> = blocks.iter().filter(|b| b.locked).collect();
    let generated: Vec<&ScheduleBlock> = blocks.iter().filter(|b| !b.locked).collect();
    for g in &generated {
        assert!(g.start_time >= day_start && g.end_time <= day_end, "{} outside day", g.id);
        for l in &locked {
            assert!(!l.overlaps(g.start_time, g.end_time), "{} overlaps locked {}", g.id, l.id);
        }
    }
    for (i, a) in generated.iter().enumerate() {
        for b in &generated[i + 1..] {
            if a.lane == b.lane && a.block_type == b.block_type {
                assert!(!a.overlaps(b.start_time, b.end_time), "{} overlaps {}", a.id, b.id);
            }
        }
    }
}

#[test]
fn moved_event_yields_padded_impacted_window() {
    let prev = vec![block("cal-1", BlockType::Calendar, at(10, 0), at(11, 0))];
    let next = vec![block("cal-1", BlockType::Calendar, at(10, 30), at(11, 30))];

    let window = detect_impacted_window_from_calendar_delta(&prev, &next, 10).unwrap();
    assert_eq!(window, ImpactedWindow::new(at(9, 50), at(11, 40)));
}

#[test]
fn merge_substitutes_window_and_locks_outside_blocks() {
    let current = vec![
        block("b1", BlockType::Focus, at(8, 0), at(8, 30)),
        block("b2", BlockType::Focus, at(10, 0), at(10, 30)),
        block("b3", BlockType::Focus, at(12, 0), at(12, 30)),
    ];
    let replanned = vec![block("b2-new", BlockType::Focus, at(10, 15), at(10, 45))];
    let window = ImpactedWindow::new(at(9, 45), at(11, 15));

    let merged = merge_local_replan(&current, &replanned, &window);
    let ids: Vec<&str> = merged.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["b1", "b2-new", "b3"]);
    assert!(merged[0].locked);
    assert!(!merged[1].locked);
    assert!(merged[2].locked);
    assert_eq!(calculate_churn_outside_window(&current, &merged, &window), 0);
}

#[test]
fn progressive_selector_prefers_longest_fitting_focus() {
    let selector = ProgressiveSelector::new();
    assert_eq!(selector.break_for(0), 5);
    assert_eq!(selector.pick_focus_duration(95, 0), Some(75));
    assert_eq!(selector.pick_focus_duration(18, 0), None);
}

#[test]
fn split_preview_alternates_and_sums_to_total() {
    let segments = build_initial_split_preview(&SplitPreviewInput {
        title: "Implement API".to_string(),
        total_minutes: 95,
        focus_block_minutes: 50,
        break_minutes: 10,
    });
    let kinds: Vec<SegmentKind> = segments.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![SegmentKind::Focus, SegmentKind::Break, SegmentKind::Focus]);
    assert_eq!(segments.iter().map(|s| s.minutes).sum::<u32>(), 95);
}

#[test]
fn full_day_schedule_fills_gaps_around_locked_blocks() {
    let template = template();
    let calendar = vec![block("cal-1", BlockType::Calendar, at(10, 0), at(10, 30))];
    let tasks = backlog();
    let scheduler = AutoScheduler::new();
    let mut ids = BlockIdGenerator::new("day");

    let blocks = scheduler.generate_schedule(
        &ScheduleRequest {
            template: &template,
            calendar_events: &calendar,
            tasks: &tasks,
            now: at(7, 0),
            max_parallel_lanes: None,
        },
        &mut ids,
    );

    assert_well_formed(&blocks, at(8, 0), at(13, 0));
    assert!(blocks.iter().any(|b| b.id == "routine-standup-20250310" && b.locked));
    assert!(blocks.iter().any(|b| b.id == "cal-1" && b.locked));

    let focus: Vec<&ScheduleBlock> = blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Focus)
        .collect();
    // The first gap is 08:00-09:00: 45 min focus fits after 75 and 60 do not.
    assert_eq!(focus[0].start_time, at(8, 0));
    assert_eq!(focus[0].duration_minutes(), 45);
    // Highest priority task is consumed first; "review" has one pomodoro left.
    let assigned: Vec<Option<&str>> = focus.iter().map(|b| b.task_id.as_deref()).collect();
    assert_eq!(
        &assigned[..5],
        &[Some("write"), Some("write"), Some("write"), Some("review"), Some("mail")]
    );
}

#[test]
fn multi_lane_schedule_only_materializes_breaks_on_lane_zero() {
    let template = DailyTemplate {
        max_parallel_lanes: Some(3),
        ..template()
    };
    let tasks = backlog();
    let mut ids = BlockIdGenerator::default();

    let blocks = AutoScheduler::new().generate_schedule(
        &ScheduleRequest {
            template: &template,
            calendar_events: &[],
            tasks: &tasks,
            now: at(7, 0),
            max_parallel_lanes: None,
        },
        &mut ids,
    );

    assert_well_formed(&blocks, at(8, 0), at(13, 0));
    let lanes: std::collections::BTreeSet<i32> = blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Focus)
        .filter_map(|b| b.lane)
        .collect();
    assert_eq!(lanes.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Break)
        .all(|b| b.lane == Some(0)));
}

#[test]
fn identical_inputs_produce_identical_schedules() {
    let template = template();
    let tasks = backlog();
    let request = ScheduleRequest {
        template: &template,
        calendar_events: &[],
        tasks: &tasks,
        now: at(7, 0),
        max_parallel_lanes: Some(2),
    };
    let scheduler = AutoScheduler::new();
    let a = scheduler.generate_schedule(&request, &mut BlockIdGenerator::new("x"));
    let b = scheduler.generate_schedule(&request, &mut BlockIdGenerator::new("x"));
    assert_eq!(a, b);
}

#[test]
fn calendar_move_replans_only_the_impacted_window() {
    let template = template();
    let tasks = backlog();
    let config = PlannerConfig::default();
    let previous = calendar_blocks_from_records(&[CalendarEventRecord {
        id: "cal-1".to_string(),
        start: "2025-03-10T10:00:00Z".to_string(),
        end: "2025-03-10T10:30:00Z".to_string(),
        summary: Some("Design sync".to_string()),
    }]);
    let next = vec![ScheduleBlock {
        start_time: at(11, 0),
        end_time: at(11, 30),
        ..previous[0].clone()
    }];

    let mut ids = BlockIdGenerator::new("plan");
    let current = config.scheduler().generate_schedule(
        &ScheduleRequest {
            template: &template,
            calendar_events: &previous,
            tasks: &tasks,
            now: at(7, 0),
            max_parallel_lanes: None,
        },
        &mut ids,
    );

    let outcome = config.replanner().replan(
        &ReplanRequest {
            current_blocks: &current,
            previous_calendar: &previous,
            next_calendar: &next,
            template: &template,
            tasks: &tasks,
            now: at(7, 0),
            max_parallel_lanes: None,
        },
        &mut ids,
    );

    let window = outcome.window.unwrap();
    assert_eq!(window, ImpactedWindow::new(at(9, 45), at(11, 45)));
    assert_eq!(outcome.churn_outside_window, 0);
    assert!(!outcome.diff.is_empty());

    // Everything outside the window is carried over unchanged and locked.
    for old in current.iter().filter(|b| !window.intersects(b)) {
        let kept = outcome.blocks.iter().find(|b| b.id == old.id).unwrap();
        assert!(kept.same_shape(old));
        assert!(kept.locked);
    }
    // The moved event is present at its new time; the old slot is free for work.
    assert!(outcome
        .blocks
        .iter()
        .any(|b| b.id == "cal-1" && b.start_time == at(11, 0)));
    assert!(outcome
        .blocks
        .iter()
        .filter(|b| !b.locked)
        .all(|b| window.intersects(b)));
    assert_well_formed(&outcome.blocks, at(8, 0), at(13, 0));
}

#[test]
fn unchanged_calendar_keeps_current_plan() {
    let template = template();
    let calendar = vec![block("cal-1", BlockType::Calendar, at(10, 0), at(10, 30))];
    let current = vec![block("f1", BlockType::Focus, at(8, 0), at(8, 45))];

    let outcome = EventDrivenReplanner::new(AutoScheduler::new()).replan(
        &ReplanRequest {
            current_blocks: &current,
            previous_calendar: &calendar,
            next_calendar: &calendar,
            template: &template,
            tasks: &[],
            now: at(7, 0),
            max_parallel_lanes: None,
        },
        &mut BlockIdGenerator::default(),
    );
    assert_eq!(outcome.window, None);
    assert_eq!(outcome.blocks, current);
    assert!(outcome.diff.is_empty());
}

#[test]
fn estimated_starts_feed_the_projection() {
    let tasks = vec![
        Task::with_id("a", "Draft").with_required_minutes(50),
        Task::with_id("sync", "Sync")
            .with_fixed(at(10, 30), Some(at(11, 0)))
            .with_required_minutes(15)
            .with_tags(["meeting"]),
        Task::with_id("b", "Polish").with_required_minutes(30),
    ];
    let now = at(9, 2);

    let planned = recalculate_estimated_starts(&tasks, now);
    assert_eq!(planned[0].estimated_start_at, Some(at(9, 15)));
    // 10:05 + 30 would run into the meeting, so "b" waits until 11:00.
    assert_eq!(planned[2].estimated_start_at, Some(at(11, 0)));

    let projected = build_projected_tasks_with_auto_breaks(&tasks, now);
    let starts: Vec<DateTime<Utc>> = projected.iter().filter_map(|p| p.start_at()).collect();
    assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    assert!(projected
        .iter()
        .any(|p| matches!(p, ProjectedTask::Segment(s) if s.parent_task_id == "a")));
    assert!(projected.iter().any(|p| p.id() == "sync"));
    assert!(projected.iter().all(|p| match p {
        ProjectedTask::Break(b) => b.end_at - b.start_at >= Duration::minutes(1),
        _ => true,
    }));
}

#[test]
fn back_to_back_replans_never_repeat_block_ids() {
    let template = template();
    let tasks = backlog();
    let config = PlannerConfig::default();
    let event = |id: &str, start: DateTime<Utc>, end: DateTime<Utc>| {
        block(id, BlockType::Calendar, start, end).locked()
    };
    let first = vec![event("a", at(9, 30), at(10, 0)), event("b", at(11, 30), at(12, 0))];
    let second = vec![event("a", at(10, 0), at(10, 30)), event("b", at(11, 30), at(12, 0))];
    let third = vec![event("a", at(10, 0), at(10, 30)), event("b", at(12, 0), at(12, 30))];

    let current = config.scheduler().generate_schedule(
        &ScheduleRequest {
            template: &template,
            calendar_events: &first,
            tasks: &tasks,
            now: at(7, 0),
            max_parallel_lanes: None,
        },
        &mut BlockIdGenerator::new("block"),
    );

    let replan = |current: &[ScheduleBlock], previous: &[ScheduleBlock], next: &[ScheduleBlock]| {
        // Each call starts a fresh generator with the same prefix.
        config.replanner().replan(
            &ReplanRequest {
                current_blocks: current,
                previous_calendar: previous,
                next_calendar: next,
                template: &template,
                tasks: &tasks,
                now: at(7, 0),
                max_parallel_lanes: None,
            },
            &mut BlockIdGenerator::new("replan"),
        )
    };

    let once = replan(&current, &first, &second);
    let twice = replan(&once.blocks, &second, &third);

    for outcome in [&once, &twice] {
        let mut ids: Vec<&str> = outcome.blocks.iter().map(|b| b.id.as_str()).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total, "duplicate block ids in {ids:?}");
        assert_eq!(outcome.churn_outside_window, 0);
    }
    // The first replan's blocks survive the second untouched.
    let first_window = once.window.unwrap();
    let second_window = twice.window.unwrap();
    for kept in once
        .blocks
        .iter()
        .filter(|b| b.id.starts_with("replan-") && !second_window.intersects(b))
    {
        assert!(first_window.intersects(kept));
        let carried = twice.blocks.iter().find(|b| b.id == kept.id).unwrap();
        assert!(carried.same_shape(kept));
    }
}

#[test]
fn malformed_task_timestamp_only_drops_that_anchor() {
    let tasks: Vec<Task> = serde_json::from_str(
        r#"[
            {"id": "draft", "title": "Draft", "required_minutes": 30},
            {"id": "sync", "title": "Sync", "kind": "fixed_event",
             "fixed_start_at": "not-a-date", "required_minutes": 30},
            {"id": "lunch", "title": "Lunch", "kind": "fixed_event",
             "fixed_start_at": "2025-03-10T09:45:00Z", "fixed_end_at": "2025-03-10T10:30:00Z"},
            {"id": "polish", "title": "Polish", "required_minutes": 30}
        ]"#,
    )
    .unwrap();

    let planned = recalculate_estimated_starts(&tasks, at(9, 0));
    assert_eq!(planned[0].estimated_start_at, Some(at(9, 0)));
    // The unreadable fixed event is neither an anchor nor auto-placed.
    assert_eq!(planned[1].estimated_start_at, None);
    assert_eq!(planned[2].resolved_start(), Some(at(9, 45)));
    assert_eq!(planned[3].estimated_start_at, Some(at(10, 30)));
}
