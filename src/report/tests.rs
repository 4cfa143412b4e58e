// Report assembly and filter tests.

use super::*;
use crate::classifier::ThematicLabel;
use crate::domain::Domain;
use crate::metrics::{DropMetrics, DropStatus};
use chrono::{TimeDelta, TimeZone, Utc};

fn metrics(status: DropStatus, captures: usize, gap_days: i64) -> DropMetrics {
    let first = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
    let last = first + TimeDelta::days(gap_days);
    DropMetrics {
        first_seen: Some(first),
        last_seen: Some(last),
        longest_gap: Some(TimeDelta::days(gap_days)),
        average_interval: Some(TimeDelta::days(gap_days / 2)),
        last_seen_age: Some(TimeDelta::days(400)),
        total_captures: captures,
        years_covered: 3,
        capture_density: 12.5,
        error_tail: 0,
        oldest_url: Some("http://a.com/".to_string()),
        newest_url: Some("http://a.com/new".to_string()),
        status,
    }
}

fn label(category: &str, confidence: f64) -> ThematicLabel {
    ThematicLabel {
        primary_category: category.to_string(),
        main_topics: vec!["Organic Gardening".to_string()],
        keywords: vec!["seeds".to_string()],
        summary: Some("A garden shop.".to_string()),
        confidence,
        model: "test-model".to_string(),
    }
}

fn completed(name: &str, m: DropMetrics, l: Option<ThematicLabel>) -> AnalysisResult {
    AnalysisResult::completed(&Domain::parse(name).unwrap(), m, l, false, Vec::new(), 1)
}

fn sample_results() -> Vec<AnalysisResult> {
    vec![
        completed(
            "garden.com",
            metrics(DropStatus::Dropped, 50, 200),
            Some(label("E-commerce", 0.9)),
        ),
        completed("news.org", metrics(DropStatus::Active, 5, 30), None),
        AnalysisResult::failed("broken.net", ErrorCause::Timeout, "archive timed out", 4),
        AnalysisResult::failed("", ErrorCause::Validation, "domain is empty", 0),
    ]
}

#[test]
fn test_general_report_keeps_everything() {
    let report = assemble_report(sample_results(), None).unwrap();
    assert_eq!(report.kind, ReportKind::General);
    assert_eq!(report.rows.len(), 4);
    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.summary.excluded, 0);
    assert!(report.summary.is_reconciled());
}

#[test]
fn test_filtered_counts_come_from_full_list() {
    let criteria = FilterCriteria {
        statuses: vec![DropStatus::Dropped],
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();

    assert_eq!(report.kind, ReportKind::Filtered);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].domain, "garden.com");
    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.summary.included, 1);
    assert_eq!(report.summary.excluded, 3);
    assert_eq!(report.summary.enriched, 1);
}

#[test]
fn test_rows_keep_submission_order() {
    let criteria = FilterCriteria {
        include_failed: true,
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    let domains: Vec<&str> = report.rows.iter().map(|r| r.domain.as_str()).collect();
    assert_eq!(domains, vec!["garden.com", "news.org", "broken.net", ""]);
}

#[test]
fn test_failed_results_need_opt_in() {
    let report = assemble_report(sample_results(), Some(FilterCriteria::default())).unwrap();
    assert!(report.rows.iter().all(|r| !r.is_failed()));

    let criteria = FilterCriteria {
        analysis_statuses: vec![AnalysisStatus::Failed],
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    assert_eq!(report.rows.len(), 2);
    assert!(report.rows.iter().all(|r| r.is_failed()));
}

#[test]
fn test_numeric_thresholds() {
    let criteria = FilterCriteria {
        min_snapshots: Some(10),
        min_years: Some(3),
        max_gap_days: Some(365.0),
        min_gap_days: Some(100.0),
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].domain, "garden.com");

    let criteria = FilterCriteria {
        max_avg_interval_days: Some(20.0),
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].domain, "news.org");
}

#[test]
fn test_missing_metric_fails_threshold() {
    let mut single = metrics(DropStatus::Active, 1, 0);
    single.average_interval = None;
    let results = vec![completed("single.com", single, None)];
    let criteria = FilterCriteria {
        max_avg_interval_days: Some(1000.0),
        ..Default::default()
    };
    let report = assemble_report(results, Some(criteria)).unwrap();
    assert!(report.rows.is_empty());
}

#[test]
fn test_thematic_criterion_never_matches_absent_label() {
    let criteria = FilterCriteria {
        topic: Some("garden".to_string()),
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].domain, "garden.com");

    // news.org has no label and must not match any thematic criterion
    for criteria in [
        FilterCriteria {
            category: Some("News".to_string()),
            ..Default::default()
        },
        FilterCriteria {
            min_confidence: Some(0.0),
            ..Default::default()
        },
    ] {
        let report = assemble_report(sample_results(), Some(criteria)).unwrap();
        assert!(report.rows.iter().all(|r| r.domain != "news.org"));
    }
}

#[test]
fn test_included_failures_still_face_thematic_criteria() {
    let criteria = FilterCriteria {
        topic: Some("garden".to_string()),
        include_failed: true,
        ..Default::default()
    };
    let failed = AnalysisResult::failed("x.com", ErrorCause::Timeout, "archive timed out", 4);
    assert!(!criteria.matches(&failed));

    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    let domains: Vec<&str> = report.rows.iter().map(|r| r.domain.as_str()).collect();
    assert_eq!(domains, vec!["garden.com"]);
}

#[test]
fn test_included_failures_fail_metric_criteria() {
    let criteria = FilterCriteria {
        statuses: vec![DropStatus::Dropped],
        include_failed: true,
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].domain, "garden.com");
    assert_eq!(report.summary.failed, 2);

    let criteria = FilterCriteria {
        min_snapshots: Some(1),
        analysis_statuses: vec![AnalysisStatus::Failed],
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    assert!(report.rows.is_empty());
}

#[test]
fn test_included_failures_with_label_wildcard() {
    let criteria = FilterCriteria {
        topic: Some("garden".to_string()),
        include_failed: true,
        absent_label_matches: true,
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    let domains: Vec<&str> = report.rows.iter().map(|r| r.domain.as_str()).collect();
    assert_eq!(domains, vec!["garden.com", "news.org", "broken.net", ""]);
}

#[test]
fn test_absent_label_wildcard_is_opt_in() {
    let criteria = FilterCriteria {
        topic: Some("garden".to_string()),
        absent_label_matches: true,
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    let domains: Vec<&str> = report.rows.iter().map(|r| r.domain.as_str()).collect();
    assert_eq!(domains, vec!["garden.com", "news.org"]);
}

#[test]
fn test_category_and_confidence() {
    let criteria = FilterCriteria {
        category: Some("e-commerce".to_string()),
        min_confidence: Some(0.95),
        ..Default::default()
    };
    let report = assemble_report(sample_results(), Some(criteria)).unwrap();
    assert!(report.rows.is_empty());
}

#[test]
fn test_invalid_criteria_rejected() {
    let cases = [
        FilterCriteria {
            max_gap_days: Some(-1.0),
            ..Default::default()
        },
        FilterCriteria {
            min_gap_days: Some(10.0),
            max_gap_days: Some(5.0),
            ..Default::default()
        },
        FilterCriteria {
            min_confidence: Some(1.5),
            ..Default::default()
        },
        FilterCriteria {
            topic: Some("   ".to_string()),
            ..Default::default()
        },
        FilterCriteria {
            max_avg_interval_days: Some(f64::NAN),
            ..Default::default()
        },
    ];
    for criteria in cases {
        assert!(matches!(
            assemble_report(sample_results(), Some(criteria)),
            Err(ValidationError::InvalidCriteria(_))
        ));
    }
}

#[test]
fn test_criteria_deserialize_with_defaults() {
    let criteria: FilterCriteria =
        serde_json::from_str(r#"{"statuses": ["dropped"], "min_snapshots": 5}"#).unwrap();
    assert_eq!(criteria.statuses, vec![DropStatus::Dropped]);
    assert_eq!(criteria.min_snapshots, Some(5));
    assert!(!criteria.include_failed);
    assert!(criteria.topic.is_none());
}

#[test]
fn test_table_projection() {
    let report = assemble_report(sample_results(), None).unwrap();
    let table = report.table();

    assert_eq!(table.columns().len(), REPORT_COLUMNS.len());
    assert_eq!(table.len(), 4);
    assert_eq!(table.cell(0, "domain"), Some("garden.com"));
    assert_eq!(table.cell(0, "drop_status"), Some("dropped"));
    assert_eq!(table.cell(0, "first_seen"), Some("2018-01-01T00:00:00Z"));
    assert_eq!(table.cell(0, "longest_gap_days"), Some("200.0"));
    assert_eq!(table.cell(0, "primary_category"), Some("E-commerce"));
    assert_eq!(table.cell(0, "label_confidence"), Some("0.90"));
    assert_eq!(table.cell(1, "primary_category"), Some(""));
    assert_eq!(table.cell(2, "analysis_status"), Some("failed"));
    assert_eq!(table.cell(2, "failure_cause"), Some("timeout"));
    assert_eq!(table.cell(2, "total_captures"), Some(""));
    assert_eq!(table.cell(3, "failure_cause"), Some("validation"));
    assert_eq!(table.cell(0, "no_such_column"), None);
}
