use askdb2::sql::{RejectionReason, StatementKind, classify_statement, validate_generated_sql};

fn rejection_reason(sql: &str, write_mode: bool) -> RejectionReason {
    validate_generated_sql(sql, write_mode)
        .expect_err("statement should be rejected")
        .reason
}

#[test]
fn read_mode_accepts_select_and_with_queries() {
    for sql in [
        "SELECT * FROM LIB.CUSTOMERS",
        "  select count(*) as cnt from lib.orders  ",
        "WITH X AS (SELECT ID FROM LIB.T) SELECT * FROM X",
    ] {
        let validated = validate_generated_sql(sql, false).expect("query should be accepted");
        assert_eq!(validated, sql.trim());
    }
}

#[test]
fn read_mode_rejects_every_dml_form() {
    for sql in [
        "INSERT INTO LIB.T VALUES (1)",
        "UPDATE LIB.T SET X = 1 WHERE ID = 5",
        "DELETE FROM LIB.T WHERE ID = 5",
        "MERGE INTO LIB.T USING LIB.S ON T.ID = S.ID WHEN MATCHED THEN UPDATE SET X = 1",
    ] {
        assert_eq!(rejection_reason(sql, false), RejectionReason::WriteDisabled, "{sql}");
    }
}

#[test]
fn write_disabled_message_points_at_prefix() {
    let rejection = validate_generated_sql("UPDATE T SET X=1 WHERE ID=5", false)
        .expect_err("update must be rejected in read mode");
    assert!(rejection.message().starts_with("Write queries are disabled"));
    assert!(rejection.message().contains("`write:`"));
}

#[test]
fn semicolons_are_rejected_in_both_modes() {
    for write_mode in [false, true] {
        assert_eq!(
            rejection_reason("SELECT 1 FROM SYSIBM.SYSDUMMY1;", write_mode),
            RejectionReason::MultiStatement
        );
        assert_eq!(
            rejection_reason("SELECT 1 FROM A; SELECT 2 FROM B", write_mode),
            RejectionReason::MultiStatement
        );
    }
}

#[test]
fn empty_statement_wins_over_other_rules() {
    let rejection = validate_generated_sql("   \n ", true).expect_err("blank must be rejected");
    assert_eq!(rejection.reason, RejectionReason::Empty);
    assert_eq!(rejection.message(), "Empty SQL produced by AI.");
}

#[test]
fn privileged_keywords_are_rejected_even_in_write_mode() {
    for sql in [
        "DROP TABLE LIB.T",
        "SELECT * FROM LIB.T WHERE NOTE = 'please alter'",
        "CALL QSYS2.QCMDEXC('DLTLIB X')",
        "INSERT INTO LIB.T SELECT * FROM LIB.CREATED_ROWS",
    ] {
        assert_eq!(rejection_reason(sql, true), RejectionReason::Privileged, "{sql}");
    }
}

#[test]
fn unsupported_leading_keyword_is_rejected() {
    let rejection =
        validate_generated_sql("VALUES 1", true).expect_err("VALUES must be rejected");
    assert_eq!(rejection.reason, RejectionReason::Unsupported);
    assert_eq!(
        rejection.message(),
        "Only SELECT or INSERT/UPDATE/DELETE are allowed."
    );
}

#[test]
fn update_and_delete_need_a_where_clause() {
    assert_eq!(
        rejection_reason("UPDATE T SET X=1", true),
        RejectionReason::UnboundedWrite
    );
    assert_eq!(
        rejection_reason("DELETE FROM LIB.T", true),
        RejectionReason::UnboundedWrite
    );
    assert_eq!(
        validate_generated_sql("UPDATE T SET X=1 WHERE ID=5", true).as_deref(),
        Ok("UPDATE T SET X=1 WHERE ID=5")
    );
}

#[test]
fn where_must_be_space_padded_on_one_line() {
    assert_eq!(
        rejection_reason("DELETE FROM LIB.T\nWHERE ID = 5", true),
        RejectionReason::UnboundedWrite
    );
    assert_eq!(
        rejection_reason("UPDATE LIB.T SET X = 1\tWHERE ID = 5", true),
        RejectionReason::UnboundedWrite
    );
}

#[test]
fn insert_without_where_is_fine_in_write_mode() {
    assert!(validate_generated_sql("INSERT INTO LIB.T (ID) VALUES (7)", true).is_ok());
}

#[test]
fn classifies_statement_kinds() {
    assert_eq!(classify_statement(" with x as (select 1 from t) select * from x"), Some(StatementKind::Query));
    assert_eq!(classify_statement("merge into t using s on 1=1"), Some(StatementKind::Dml));
    assert_eq!(classify_statement("VALUES 1"), None);
}
