use super::*;
use serde_json::json;

fn submission(body: serde_json::Value) -> VoteSubmission {
    serde_json::from_value(body).expect("submission should deserialize")
}

#[test]
fn submit_valid_vote_returns_count() {
    let mut ledger = Ledger::new();
    let count = ledger
        .submit(submission(json!({"userId": "u1", "statementId": 5, "vote": 1})), 1_000)
        .expect("valid vote");
    assert_eq!(count, 1);

    let votes = ledger.list_all();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].user_id, "u1");
    assert_eq!(votes[0].statement_id, 5);
    assert_eq!(votes[0].vote, VoteValue::Agree);
    assert_eq!(votes[0].timestamp, 1_000);
}

#[test]
fn out_of_range_vote_is_rejected_without_mutation() {
    let mut ledger = Ledger::new();
    ledger
        .submit(submission(json!({"userId": "u1", "statementId": 5, "vote": 1})), 0)
        .expect("valid vote");

    let err = ledger
        .submit(submission(json!({"userId": "u2", "statementId": 5, "vote": 7})), 0)
        .expect_err("vote 7 must be rejected");

    assert_eq!(err, LedgerError::InvalidVote);
    assert_eq!(ledger.count(), 1);
    assert!(ledger.list_all().iter().all(|v| v.user_id != "u2"));
}

#[test]
fn fractional_vote_is_rejected() {
    let err = submission(json!({"userId": "u", "statementId": 1, "vote": 0.5}))
        .validate(0)
        .expect_err("fractional vote");
    assert_eq!(err, LedgerError::InvalidVote);
}

#[test]
fn missing_or_blank_user_id_is_rejected() {
    let err = submission(json!({"statementId": 1, "vote": 0})).validate(0).expect_err("no user");
    assert_eq!(err, LedgerError::MissingUserId);

    let err = submission(json!({"userId": "   ", "statementId": 1, "vote": 0}))
        .validate(0)
        .expect_err("blank user");
    assert_eq!(err, LedgerError::MissingUserId);
}

#[test]
fn statement_id_must_be_numeric() {
    let err = submission(json!({"userId": "u", "statementId": "abc", "vote": 0}))
        .validate(0)
        .expect_err("non-numeric statement");
    assert_eq!(err, LedgerError::InvalidStatementId);

    let vote = submission(json!({"userId": "u", "statementId": "12", "vote": -1}))
        .validate(0)
        .expect("numeric string statement id");
    assert_eq!(vote.statement_id, 12);
    assert_eq!(vote.vote, VoteValue::Disagree);
}

#[test]
fn value_alias_and_explicit_timestamp_are_accepted() {
    let vote = submission(json!({"userId": "u", "statementId": 3, "value": 0, "timestamp": 77}))
        .validate(1_000)
        .expect("valid");
    assert_eq!(vote.vote, VoteValue::Pass);
    assert_eq!(vote.timestamp, 77);
}

#[test]
fn from_slice_reports_malformed_json() {
    let err = VoteSubmission::from_slice(b"not json").expect_err("malformed");
    assert!(matches!(err, LedgerError::Malformed(_)));
    assert_eq!(err.error_code(), "E_VOTE_MALFORMED");
}

#[test]
fn same_user_may_vote_repeatedly() {
    let mut ledger = Ledger::new();
    for _ in 0..3 {
        ledger
            .submit(submission(json!({"userId": "u1", "statementId": 5, "vote": 1})), 0)
            .expect("valid");
    }
    assert_eq!(ledger.count(), 3);
}

#[test]
fn clear_all_returns_previous_count() {
    let mut ledger = Ledger::new();
    ledger
        .submit(submission(json!({"userId": "a", "statementId": 1, "vote": 1})), 0)
        .expect("valid");
    ledger
        .submit(submission(json!({"userId": "b", "statementId": 1, "vote": -1})), 0)
        .expect("valid");

    assert_eq!(ledger.clear_all(), 2);
    assert!(ledger.is_empty());
    assert_eq!(ledger.clear_all(), 0);
}

#[test]
fn tallies_group_by_statement() {
    let mut ledger = Ledger::new();
    for (user, statement, vote) in [("a", 2, 1), ("b", 2, -1), ("c", 2, 1), ("d", 1, 0)] {
        ledger
            .submit(submission(json!({"userId": user, "statementId": statement, "vote": vote})), 0)
            .expect("valid");
    }

    let tallies = ledger.tallies();
    assert_eq!(
        tallies,
        vec![
            Tally { statement_id: 1, agree: 0, disagree: 0, pass: 1 },
            Tally { statement_id: 2, agree: 2, disagree: 1, pass: 0 },
        ]
    );
}

#[test]
fn vote_serializes_value_as_integer() {
    let vote = Vote { user_id: "u".into(), statement_id: 4, vote: VoteValue::Disagree, timestamp: 9 };
    assert_eq!(
        serde_json::to_value(&vote).expect("serialize"),
        json!({"userId": "u", "statementId": 4, "vote": -1, "timestamp": 9})
    );
}
