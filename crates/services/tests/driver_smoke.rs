use std::time::Duration;

use quiz_core::model::{DifficultyRating, ItemId, SessionItemDraft};
use quiz_core::scheduler::StageChange;
use quiz_core::session::{Advance, SessionEngine, SessionMode, SessionPhase};
use quiz_core::time::fixed_time_source;
use quiz_core::EngineConfig;
use quiz_services::{DriverError, DriverEvent, InMemoryReportSink, SessionDriver};

fn drafts(n: u64) -> Vec<SessionItemDraft> {
    (1..=n)
        .map(|id| {
            SessionItemDraft::new(
                ItemId::new(id),
                format!("Translate word {id}"),
                ["house", "tree", "river"],
                "tree",
            )
        })
        .collect()
}

fn driver(mode: SessionMode, n: u64) -> SessionDriver {
    let engine = SessionEngine::from_drafts(mode, drafts(n), EngineConfig::default())
        .unwrap()
        .with_time_source(fixed_time_source());
    SessionDriver::new(engine)
}

#[tokio::test(start_paused = true)]
async fn timed_session_mixes_answers_and_expiry() {
    let mut driver = driver(SessionMode::Timed, 2);
    driver.start().unwrap();
    assert!(driver.is_ticking());

    assert_eq!(
        driver.next_event().await,
        Some(DriverEvent::Tick { remaining: 29 })
    );
    let outcome = driver.submit_answer(ItemId::new(1), "tree").unwrap();
    assert_eq!(outcome.answer.time_remaining, 29);
    assert!(!driver.is_ticking());
    assert_eq!(driver.next_event().await, None);

    assert!(matches!(driver.advance().unwrap(), Advance::Next { .. }));

    let expired = loop {
        match driver.next_event().await {
            Some(DriverEvent::Tick { .. }) => continue,
            Some(DriverEvent::Expired { outcome, advance }) => break (outcome, advance),
            other => panic!("unexpected event: {other:?}"),
        }
    };
    assert_eq!(expired.0.answer.chosen_option, None);
    assert!(matches!(expired.1, Advance::Completed(_)));
    assert_eq!(driver.engine().phase(), SessionPhase::Completed);
    assert!(!driver.is_ticking());

    let sink = InMemoryReportSink::new();
    let id = driver.finalize(&sink).await.unwrap();
    assert_eq!(id.value(), 1);

    let stored = sink.reports().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].correct_count, 1);
    assert_eq!(stored[0].items[1].chosen_option, None);
    // 100 base + round(100 * 29 / 30) time bonus, no combo on a streak of one
    assert_eq!(stored[0].total_score, Some(197));
}

#[tokio::test(start_paused = true)]
async fn tick_queued_before_answer_is_ignored() {
    let mut driver = driver(SessionMode::Timed, 2);
    driver.start().unwrap();

    // the first tick is sitting in the channel, not yet applied
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let outcome = driver.submit_answer(ItemId::new(1), "tree").unwrap();
    assert_eq!(outcome.answer.time_remaining, 30);

    driver.advance().unwrap();
    assert_eq!(driver.next_event().await, Some(DriverEvent::Ignored));
    assert_eq!(
        driver.next_event().await,
        Some(DriverEvent::Tick { remaining: 29 })
    );
    let score = driver.engine().score().unwrap();
    assert_eq!(score.total_answered(), 1);
    assert_eq!(score.total_score(), 200);
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_ticks_and_blocks_finalize() {
    let mut driver = driver(SessionMode::Timed, 3);
    driver.start().unwrap();
    driver.next_event().await.unwrap();

    assert!(driver.cancel());
    assert!(!driver.cancel());
    assert!(!driver.is_ticking());
    assert_eq!(driver.next_event().await, None);
    assert_eq!(driver.engine().phase(), SessionPhase::Cancelled);

    let sink = InMemoryReportSink::new();
    let err = driver.finalize(&sink).await.unwrap_err();
    assert!(matches!(err, DriverError::NotComplete));
    assert!(sink.raw_reports().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unattended_session_runs_out() {
    let mut driver = driver(SessionMode::Timed, 3);
    driver.start().unwrap();

    let report = driver.run_out().await.unwrap().clone();
    assert_eq!(report.unanswered_count(), 3);
    assert_eq!(report.total_score, Some(0));
    assert_eq!(report.percentage, 0);
    assert!(report.items.iter().all(|item| item.time_taken == 30));
}

#[tokio::test]
async fn finalize_retries_after_sink_failure() {
    let mut driver = driver(SessionMode::Timed, 1);
    driver.start().unwrap();
    driver.submit_answer(ItemId::new(1), "house").unwrap();
    driver.advance().unwrap();

    let sink = InMemoryReportSink::new().failing_next(1);
    let err = driver.finalize(&sink).await.unwrap_err();
    assert!(matches!(err, DriverError::Sink(_)));
    assert_eq!(driver.submission_id(), None);

    let id = driver.finalize(&sink).await.unwrap();
    let again = driver.finalize(&sink).await.unwrap();
    assert_eq!(id, again);
    assert_eq!(sink.raw_reports().unwrap().len(), 1);
}

#[tokio::test]
async fn untimed_session_schedules_review() {
    let mut driver = driver(SessionMode::Untimed, 3);
    assert_eq!(driver.start().unwrap(), None);
    assert_eq!(driver.next_event().await, None);

    for id in 1..=3 {
        let option = if id == 2 { "river" } else { "tree" };
        driver.submit_answer(ItemId::new(id), option).unwrap();
        driver
            .submit_rating(ItemId::new(id), DifficultyRating::new(4).unwrap())
            .unwrap();
        driver.advance().unwrap();
    }

    let sink = InMemoryReportSink::new();
    driver.finalize(&sink).await.unwrap();
    let raw = sink.raw_reports().unwrap();
    assert!(raw[0].contains("\"schedule\":{"));

    let reports = sink.reports().unwrap();
    let report = &reports[0];
    // 2 of 3 correct: 0.67 holds the stage
    let schedule = report.schedule.unwrap();
    assert_eq!(schedule.change, StageChange::Held);
    assert_eq!(schedule.stage, 1);
    assert_eq!(report.percentage, 67);
}
