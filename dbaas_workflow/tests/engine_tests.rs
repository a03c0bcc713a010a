//! Engine ordering and rollback tests.

mod common;

use std::sync::Arc;

use common::{calls, empty_context, new_log, RecordingStep};
use dbaas_workflow::{ErrorCode, RollbackPolicy, Step, StepState, WorkflowBuilder, WorkflowEngine};

#[tokio::test]
async fn test_all_steps_succeed_without_undo() {
    let log = new_log();
    let workflow = WorkflowBuilder::new("happy")
        .add_step(RecordingStep::new("a", &log))
        .add_step(RecordingStep::new("b", &log))
        .add_step(RecordingStep::new("c", &log))
        .build()
        .unwrap();
    let mut context = empty_context();

    let result = WorkflowEngine::new().execute(&workflow, &mut context).await;

    assert!(result.success);
    assert_eq!(calls(&log), vec!["execute:a", "execute:b", "execute:c"]);
    assert!(context.exceptions.is_empty());
    assert!(result.rollback_report.is_none());
}

#[tokio::test]
async fn test_failure_undoes_completed_steps_in_reverse() {
    let log = new_log();
    let workflow = WorkflowBuilder::new("fails-at-3")
        .add_step(RecordingStep::new("s0", &log))
        .add_step(RecordingStep::new("s1", &log))
        .add_step(RecordingStep::new("s2", &log))
        .add_step(RecordingStep::new("s3", &log).failing())
        .add_step(RecordingStep::new("s4", &log))
        .build()
        .unwrap();
    let mut context = empty_context();

    let result = WorkflowEngine::new().execute(&workflow, &mut context).await;

    assert!(!result.success);
    assert_eq!(result.failed_step.as_deref(), Some("s3"));
    assert_eq!(
        calls(&log),
        vec![
            "execute:s0",
            "execute:s1",
            "execute:s2",
            "execute:s3",
            "undo:s2",
            "undo:s1",
            "undo:s0",
        ]
    );
    assert_eq!(result.error_codes, vec![ErrorCode::new("s3")]);
    assert!(result.tracebacks[0].contains("s3 refused to run"));

    let report = result.rollback_report.unwrap();
    assert_eq!(report.rolled_back_steps, vec!["s2", "s1", "s0"]);
    assert!(report.is_clean());
    assert_eq!(
        result.step_states,
        vec![
            ("s0".to_string(), StepState::Undone),
            ("s1".to_string(), StepState::Undone),
            ("s2".to_string(), StepState::Undone),
            ("s3".to_string(), StepState::Failed),
            ("s4".to_string(), StepState::NotStarted),
        ]
    );
}

#[tokio::test]
async fn test_first_step_failure_undoes_nothing() {
    let log = new_log();
    let workflow = WorkflowBuilder::new("fails-first")
        .add_step(RecordingStep::new("s0", &log).failing())
        .add_step(RecordingStep::new("s1", &log))
        .build()
        .unwrap();
    let mut context = empty_context();

    let result = WorkflowEngine::new().execute(&workflow, &mut context).await;

    assert!(!result.success);
    assert_eq!(calls(&log), vec!["execute:s0"]);
    assert_eq!(result.rollback_report.unwrap().attempted(), 0);
}

#[tokio::test]
async fn test_failed_undo_does_not_stop_rollback() {
    let log = new_log();
    let workflow = WorkflowBuilder::new("bad-undo")
        .add_step(RecordingStep::new("s0", &log))
        .add_step(RecordingStep::new("s1", &log).failing_undo())
        .add_step(RecordingStep::new("s2", &log).failing())
        .build()
        .unwrap();
    let mut context = empty_context();

    let result = WorkflowEngine::new().execute(&workflow, &mut context).await;

    assert!(!result.success);
    assert_eq!(
        calls(&log),
        vec!["execute:s0", "execute:s1", "execute:s2", "undo:s1", "undo:s0"]
    );
    assert_eq!(
        result.error_codes,
        vec![ErrorCode::new("s2"), ErrorCode::new("s1")]
    );
    assert_eq!(result.tracebacks.len(), 2);

    let report = result.rollback_report.as_ref().unwrap();
    assert_eq!(report.rolled_back_steps, vec!["s0"]);
    assert_eq!(report.failed_compensations.len(), 1);
    assert_eq!(report.failed_compensations[0].0, "s1");
    assert_eq!(result.state_of("s1"), Some(StepState::UndoFailed));
    assert_eq!(result.state_of("s0"), Some(StepState::Undone));
}

#[tokio::test]
async fn test_include_failed_policy_undoes_failing_step() {
    let log = new_log();
    let workflow = WorkflowBuilder::new("include-failed")
        .add_step(RecordingStep::new("s0", &log))
        .add_step(RecordingStep::new("s1", &log).failing())
        .build()
        .unwrap();
    let mut context = empty_context();

    let engine = WorkflowEngine::new().with_rollback_policy(RollbackPolicy::IncludeFailed);
    let result = engine.execute(&workflow, &mut context).await;

    assert!(!result.success);
    assert_eq!(
        calls(&log),
        vec!["execute:s0", "execute:s1", "undo:s1", "undo:s0"]
    );
    assert_eq!(result.state_of("s1"), Some(StepState::Undone));
}

#[tokio::test]
async fn test_compensate_runs_every_step_in_reverse() {
    let log = new_log();
    let steps: Vec<Arc<dyn Step>> = vec![
        Arc::new(RecordingStep::new("a", &log)),
        Arc::new(RecordingStep::new("b", &log).failing_undo()),
        Arc::new(RecordingStep::new("c", &log)),
    ];
    let mut context = empty_context();

    let report = WorkflowEngine::new().compensate(&steps, &mut context).await;

    assert_eq!(calls(&log), vec!["undo:c", "undo:b", "undo:a"]);
    assert_eq!(report.rolled_back_steps, vec!["c", "a"]);
    assert_eq!(report.failed_compensations.len(), 1);
    assert_eq!(context.exceptions.error_codes(), &[ErrorCode::new("b")]);
}
