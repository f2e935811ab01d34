use std::sync::Arc;

use super::common::*;
use crate::workflows::assessment::store::FormDataStore;
use crate::workflows::assessment::{
    AssessmentSession, BlockReason, CategoryId, GuidancePolicy, InMemoryFormStore,
    NavigationIntent, PersistedResponse, ResponseMergeStore, SessionError, SubmissionStatus,
    DONT_KNOW_SCORE,
};

fn category(id: &str) -> CategoryId {
    CategoryId::new(id)
}

fn stored(store: &InMemoryFormStore) -> Vec<PersistedResponse> {
    let value = store
        .load("session-under-test")
        .expect("store readable")
        .unwrap_or_else(|| serde_json::json!([]));
    serde_json::from_value(value).expect("record parses")
}

#[test]
fn start_discards_a_previous_record() {
    let store = Arc::new(InMemoryFormStore::default());
    store
        .save(
            "session-under-test",
            serde_json::json!([{ "questionId": "gov_policy", "score": 4, "dontKnow": false }]),
        )
        .expect("seeded");

    let session = session_with_store(Arc::clone(&store), "quick");

    assert!(session.answers().is_empty());
    assert!(store.load("session-under-test").expect("readable").is_none());
}

#[test]
fn session_opens_on_organization_with_zero_progress() {
    let (session, _) = session("quick");
    let state = session.flow_state();

    assert!(state.category_id.is_organization());
    assert_eq!(state.progress_percent, 0);
    assert_eq!(state.category_position, 0);
    assert_eq!(state.total_categories, 2);
    assert_eq!((state.step, state.total_steps), (1, 3));
    assert!(!state.is_complete);
}

#[test]
fn advance_is_blocked_until_visible_questions_are_answered() {
    let (mut session, store) = session("quick");
    session.answer(&question("org_size"), 2).expect("valid");

    let intent = session.advance();

    assert_eq!(
        intent,
        NavigationIntent::Blocked {
            reason: BlockReason::IncompleteForm {
                missing: vec![question("org_it_team")],
            },
        }
    );
    assert!(session.current_category().is_organization());
    assert!(stored(&store).is_empty());
}

#[test]
fn revealed_dependent_question_joins_the_gate() {
    let (mut session, _) = session("quick");
    session.answer(&question("org_size"), 1).expect("valid");
    session.answer(&question("org_it_team"), 1).expect("valid");

    match session.advance() {
        NavigationIntent::Blocked {
            reason: BlockReason::IncompleteForm { missing },
        } => assert_eq!(missing, vec![question("org_outsourced_it")]),
        other => panic!("expected incomplete form, got {other:?}"),
    }
}

#[test]
fn quick_assessment_walks_to_submit_with_increasing_progress() {
    let (mut session, _) = session("quick");
    let mut seen = Vec::new();

    complete_category(&mut session, 2);
    assert_eq!(
        session.advance(),
        NavigationIntent::Advance {
            destination: category("governance"),
        }
    );
    seen.push(session.flow_state().progress_percent);

    complete_category(&mut session, 4);
    assert_eq!(
        session.advance(),
        NavigationIntent::Advance {
            destination: category("technology"),
        }
    );
    seen.push(session.flow_state().progress_percent);

    complete_category(&mut session, 4);
    assert_eq!(session.advance(), NavigationIntent::Submit);

    assert_eq!(seen, vec![50, 100]);
}

#[test]
fn targeted_assessment_skips_categories_without_applicable_questions() {
    let (mut session, _) = session("targeted");

    complete_category(&mut session, 2);
    session.advance();
    complete_category(&mut session, 3);
    session.advance();
    assert_eq!(session.current_category(), &category("risk_management"));

    complete_category(&mut session, 3);
    assert_eq!(
        session.advance(),
        NavigationIntent::Advance {
            destination: category("technology"),
        }
    );

    assert_eq!(session.back(), Some(category("risk_management")));
}

#[test]
fn unknown_assessment_type_falls_back_to_default() {
    let (session, _) = session("audit");

    assert_eq!(session.assessment_type().as_str(), "comprehensive");
    assert_eq!(session.flow_state().total_categories, 6);
}

#[test]
fn navigation_merges_without_clobbering_other_categories() {
    let (mut session, store) = session("quick");
    complete_category(&mut session, 2);
    session.advance();
    complete_category(&mut session, 4);
    session.advance();

    let after_governance = stored(&store);
    assert!(after_governance
        .iter()
        .any(|response| response.question_id == question("org_size")));
    assert!(after_governance
        .iter()
        .any(|response| response.question_id == question("gov_policy") && response.score == 4));

    // Edit governance after the fact; organization entries must survive.
    session.back();
    session.answer(&question("gov_policy"), 1).expect("valid");
    session.advance();

    let after_edit = stored(&store);
    assert!(after_edit
        .iter()
        .any(|response| response.question_id == question("org_size")));
    assert!(after_edit
        .iter()
        .any(|response| response.question_id == question("gov_policy") && response.score == 1));
    let gov_policy_entries = after_edit
        .iter()
        .filter(|response| response.question_id == question("gov_policy"))
        .count();
    assert_eq!(gov_policy_entries, 1);
}

#[test]
fn cleared_answer_is_removed_from_the_record() {
    let (mut session, store) = session("quick");
    complete_category(&mut session, 2);
    session.advance();
    complete_category(&mut session, 4);
    session.advance();
    assert!(stored(&store)
        .iter()
        .any(|response| response.question_id == question("gov_policy_review")));

    session.back();
    session.answer(&question("gov_policy"), 1).expect("valid");
    session.clear_answer(&question("gov_policy_review")).expect("valid");
    session.advance();

    assert!(!stored(&store)
        .iter()
        .any(|response| response.question_id == question("gov_policy_review")));
}

#[test]
fn back_persists_partial_answers_and_re_entry_hydrates_them() {
    let (mut session, store) = session("quick");
    complete_category(&mut session, 2);
    session.advance();
    complete_category(&mut session, 3);
    session.advance();

    session.answer(&question("tech_patching"), 2).expect("valid");
    assert_eq!(session.back(), Some(category("governance")));
    assert_eq!(session.answers().get(&question("gov_policy")), Some(3));

    assert!(stored(&store)
        .iter()
        .any(|response| response.question_id == question("tech_patching")));

    session.advance();
    assert_eq!(session.answers().get(&question("tech_patching")), Some(2));
    assert_eq!(session.answers().len(), 1);
}

#[test]
fn back_from_organization_stays_put() {
    let (mut session, _) = session("quick");

    assert_eq!(session.back(), None);
    assert!(session.current_category().is_organization());
}

#[test]
fn answer_rejects_questions_outside_the_current_category() {
    let (mut session, _) = session("quick");

    assert!(matches!(
        session.answer(&question("gov_policy"), 3),
        Err(SessionError::QuestionOutsideCategory { .. })
    ));
    assert!(matches!(
        session.answer(&question("nope"), 3),
        Err(SessionError::UnknownQuestion(_))
    ));
    assert!(matches!(
        session.answer(&question("org_size"), 9),
        Err(SessionError::InvalidScore { score: 9, .. })
    ));
    session
        .answer(&question("org_size"), DONT_KNOW_SCORE)
        .expect("don't know is always accepted");
}

#[test]
fn answer_rejects_questions_excluded_from_the_type() {
    let (mut session, _) = session("quick");
    complete_category(&mut session, 2);
    session.advance();

    assert!(matches!(
        session.answer(&question("gov_board_reporting"), 3),
        Err(SessionError::NotApplicable { .. })
    ));
}

#[test]
fn guidance_shows_once_enough_dont_know_answers_accumulate() {
    let (mut session, _) = session("quick");
    complete_category(&mut session, 2);
    session.advance();
    complete_category(&mut session, 3);
    session.advance();

    session
        .answer(&question("tech_asset_inventory"), DONT_KNOW_SCORE)
        .expect("valid");
    session
        .answer(&question("tech_patching"), DONT_KNOW_SCORE)
        .expect("valid");
    assert!(!session.flow_state().show_guidance);

    session.answer(&question("tech_mfa"), DONT_KNOW_SCORE).expect("valid");
    assert!(session.flow_state().show_guidance);
    assert!(session.flow_state().is_complete);
}

#[test]
fn submit_is_refused_before_the_final_category() {
    let (mut session, _) = session("quick");
    let gateway = RecordingGateway::default();

    assert_eq!(
        session.submit(&gateway),
        Err(BlockReason::NotFinalCategory)
    );
    assert!(gateway.submissions().is_empty());
}

fn finish_quick(session: &mut AssessmentSession<InMemoryFormStore>) {
    for _ in 0..3 {
        complete_category(session, 3);
        session.advance();
    }
}

#[test]
fn submit_delivers_the_merged_record_once() {
    let (mut session, _) = session("quick");
    let gateway = RecordingGateway::default();
    finish_quick(&mut session);

    let outcome = session.submit(&gateway).expect("submission accepted");

    assert_eq!(outcome.status, SubmissionStatus::Delivered);
    assert!(outcome.notice.is_none());
    let submissions = gateway.submissions();
    assert_eq!(submissions.len(), 1);
    let ids: Vec<&str> = submissions[0]
        .responses
        .iter()
        .map(|response| response.question_id.as_str())
        .collect();
    assert!(ids.contains(&"org_size"));
    assert!(ids.contains(&"gov_policy"));
    assert!(ids.contains(&"tech_mfa"));
    assert_eq!(outcome.response_count, submissions[0].responses.len());

    assert_eq!(session.submit(&gateway), Err(BlockReason::AlreadySubmitted));
    assert!(matches!(
        session.answer(&question("tech_mfa"), 1),
        Err(SessionError::AlreadySubmitted)
    ));
    assert_eq!(gateway.submissions().len(), 1);
}

#[test]
fn pending_submission_blocks_repeat_requests() {
    let (mut session, _) = session("quick");
    finish_quick(&mut session);

    let submission = session.begin_submission().expect("first submit starts");
    assert_eq!(session.submission_status(), SubmissionStatus::Pending);
    assert_eq!(
        session.begin_submission(),
        Err(BlockReason::SubmissionPending)
    );
    assert_eq!(
        session.advance(),
        NavigationIntent::Blocked {
            reason: BlockReason::SubmissionPending,
        }
    );

    let outcome = session.finish_submission(&submission, Ok(()));
    assert_eq!(outcome.status, SubmissionStatus::Delivered);
}

#[test]
fn delivery_failure_finishes_with_a_notice_and_allows_retry() {
    let (mut session, _) = session("quick");
    finish_quick(&mut session);

    let outcome = session.submit(&UnreachableGateway).expect("submit runs");

    assert_eq!(outcome.status, SubmissionStatus::DeliveryFailed);
    assert!(outcome.status.is_finished());
    assert!(outcome
        .notice
        .as_deref()
        .is_some_and(|notice| notice.contains("connection refused")));

    let gateway = RecordingGateway::default();
    let retried = session.submit(&gateway).expect("retry accepted");
    assert_eq!(retried.status, SubmissionStatus::Delivered);
}

#[test]
fn offline_store_does_not_block_the_flow() {
    let mut session = session_with_store(Arc::new(OfflineStore), "quick");

    complete_category(&mut session, 2);
    assert_eq!(
        session.advance(),
        NavigationIntent::Advance {
            destination: category("governance"),
        }
    );
    assert!(session.answers().is_empty());

    complete_category(&mut session, 3);
    session.advance();
    complete_category(&mut session, 4);
    assert_eq!(session.advance(), NavigationIntent::Submit);

    let gateway = RecordingGateway::default();
    session.submit(&gateway).expect("submit runs");

    let submitted = gateway.submissions();
    let ids: Vec<&str> = submitted[0]
        .responses
        .iter()
        .map(|response| response.question_id.as_str())
        .collect();
    for expected in ["org_size", "gov_policy", "tech_mfa"] {
        assert!(ids.contains(&expected), "{expected} missing from {ids:?}");
    }
}

#[test]
fn offline_store_keeps_earlier_answers_when_going_back() {
    let mut session = session_with_store(Arc::new(OfflineStore), "quick");
    complete_category(&mut session, 2);
    session.advance();

    assert_eq!(session.back(), Some(CategoryId::organization()));
    assert_eq!(session.answers().get(&question("org_size")), Some(2));
}

#[test]
fn resume_hydrates_the_organization_answers() {
    let store = Arc::new(InMemoryFormStore::default());
    let mut merge_store = ResponseMergeStore::new(Arc::clone(&store), "resumed");
    merge_store
        .save(&[
            PersistedResponse::new(question("org_size"), 3),
            PersistedResponse::new(question("gov_policy"), 5),
        ])
        .expect("seeded");

    let session = AssessmentSession::resume(
        catalog(),
        &assessment_type("quick"),
        merge_store,
        GuidancePolicy::default(),
    );

    assert_eq!(session.answers().get(&question("org_size")), Some(3));
    assert!(!session.answers().contains(&question("gov_policy")));
    assert_eq!(session.responses().len(), 2);
}

#[test]
fn report_reflects_live_answers_of_the_current_category() {
    let (mut session, _) = session("quick");
    complete_category(&mut session, 2);
    session.advance();
    session.answer(&question("gov_policy"), 5).expect("valid");

    let report = session.report();

    assert_eq!(report.categories[0].answered, 1);
    assert_eq!(report.categories[0].mean_score, Some(5.0));
}
