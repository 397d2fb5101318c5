use std::time::Instant;

use askdb2::models::SchemaSnapshot;
use askdb2::sql::add_header_if_select_star;

fn snapshot() -> SchemaSnapshot {
    SchemaSnapshot::from_rows(
        "RAJ2001",
        [
            ("CUSTOMERS", "ID", "INTEGER"),
            ("CUSTOMERS", "NAME", "VARCHAR"),
            ("CUSTOMERS", "STATUS", "CHARACTER"),
        ],
        Instant::now(),
    )
}

#[test]
fn prepends_header_for_plain_table_read() {
    let csv = "1,\"ACME\",\"A\"\r\n2,\"BOLT\",\"I\"\r\n";
    let output = add_header_if_select_star(csv, "SELECT * FROM RAJ2001.CUSTOMERS", &snapshot());
    assert_eq!(output, format!("ID,NAME,STATUS\r\n{csv}"));
}

#[test]
fn matching_is_case_insensitive_and_uses_lf_when_data_does() {
    let output =
        add_header_if_select_star("1,2,3\n", "  select *\nfrom raj2001.customers ", &snapshot());
    assert_eq!(output, "ID,NAME,STATUS\n1,2,3\n");
}

#[test]
fn filtered_or_projected_reads_pass_through() {
    let csv = "1,2,3\r\n";
    for sql in [
        "SELECT * FROM RAJ2001.CUSTOMERS WHERE ID = 1",
        "SELECT ID FROM RAJ2001.CUSTOMERS",
        "SELECT * FROM OTHERLIB.CUSTOMERS",
        "SELECT * FROM RAJ2001.UNKNOWN",
    ] {
        assert_eq!(add_header_if_select_star(csv, sql, &snapshot()), csv, "{sql}");
    }
}

#[test]
fn empty_output_stays_empty() {
    assert_eq!(
        add_header_if_select_star("", "SELECT * FROM RAJ2001.CUSTOMERS", &snapshot()),
        ""
    );
}

#[test]
fn empty_snapshot_adds_nothing() {
    let empty = SchemaSnapshot::empty("RAJ2001", Instant::now());
    assert_eq!(
        add_header_if_select_star("1\r\n", "SELECT * FROM RAJ2001.CUSTOMERS", &empty),
        "1\r\n"
    );
}
