use coverage_metrics::{CoverageData, CoverageParseError};

const SIMPLE: &str = include_str!("fixtures/simple.xml");
const OVERLAP_1: &str = include_str!("fixtures/overlap_1.xml");
const OVERLAP_2: &str = include_str!("fixtures/overlap_2.xml");
const INVALID: &str = include_str!("fixtures/invalid.xml");

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.unwrap_or_else(|| panic!("expected {expected}, got None"));
    assert!(
        (actual - expected).abs() < 0.001,
        "expected {expected}, got {actual}"
    );
}

fn data_from(reports: &[&str]) -> CoverageData {
    let mut data = CoverageData::new();
    for report in reports {
        data.add_report(report).unwrap();
    }
    data
}

/// A single-package report with one class per `(filename, hits per line)` entry
fn report(classes: &[(&str, Vec<u64>)]) -> String {
    let mut xml = String::from("<coverage><packages><package><classes>");
    for (filename, hits) in classes {
        xml.push_str(&format!(r#"<class filename="{filename}"><lines>"#));
        for (i, hits) in hits.iter().enumerate() {
            xml.push_str(&format!(r#"<line number="{}" hits="{hits}"/>"#, i + 1));
        }
        xml.push_str("</lines></class>");
    }
    xml.push_str("</classes></package></packages></coverage>");
    xml
}

#[test]
fn test_simple_report() {
    let data = data_from(&[SIMPLE]);

    assert_close(data.coverage("*"), 84.615384615385);
    assert_close(data.coverage("*.py"), 84.615384615385);
    assert_close(data.coverage("group_1/*.py"), 83.333333333333);
    assert_close(data.coverage("group_2/*.py"), 85.714285714286);
    assert_eq!(data.coverage("none"), None);
    assert_eq!(data.coverage(""), None);
}

#[test]
fn test_two_file_scenario() {
    let a: Vec<u64> = (0..10).map(|i| if i < 8 { 1 } else { 0 }).collect();
    let b = vec![3, 1, 1, 7];
    let data = data_from(&[report(&[("group_1/a.py", a), ("group_2/b.py", b)]).as_str()]);

    assert_close(data.coverage("*"), 100.0 * 12.0 / 14.0);
    assert_close(data.coverage("group_1/*.py"), 80.0);
    assert_close(data.coverage("group_2/*.py"), 100.0);
    assert_eq!(data.coverage("none"), None);
}

#[test]
fn test_covered_and_uncovered_files() {
    for (n, m) in [(1usize, 1usize), (3, 7), (10, 1), (2, 0)] {
        let xml = report(&[("full.py", vec![1; n]), ("empty.py", vec![0; m])]);
        let data = data_from(&[xml.as_str()]);

        assert_close(data.coverage("*"), 100.0 * n as f64 / (n + m) as f64);
    }
}

#[test]
fn test_report_overlap() {
    let data = data_from(&[OVERLAP_1, OVERLAP_2]);
    assert_close(data.coverage("group_1/*.py"), 83.333333333333);
    assert_close(data.coverage("group_1/foo.py"), 100.0);
}

#[test]
fn test_report_order_does_not_matter() {
    let forward = data_from(&[OVERLAP_1, OVERLAP_2, SIMPLE]);
    let backward = data_from(&[SIMPLE, OVERLAP_2, OVERLAP_1]);

    for pattern in ["*", "group_1/*", "group_2/*", "group_1/bar.py"] {
        assert_eq!(forward.coverage(pattern), backward.coverage(pattern));
    }

    let files: Vec<_> = forward.files().collect();
    let reversed: Vec<_> = backward.files().collect();
    assert_eq!(files, reversed);
}

#[test]
fn test_disjoint_reports_sum() {
    let r1 = report(&[("a/one.py", vec![1, 0, 0, 1])]);
    let r2 = report(&[("b/two.py", vec![1, 1, 1]), ("b/three.py", vec![0])]);
    let data = data_from(&[r1.as_str(), r2.as_str()]);

    assert_close(data.coverage("*"), 100.0 * 5.0 / 8.0);
    assert_close(data.coverage("a/*"), 50.0);
    assert_close(data.coverage("b/*"), 75.0);
}

#[test]
fn test_adding_same_report_twice_is_idempotent() {
    let once = data_from(&[SIMPLE]);
    let twice = data_from(&[SIMPLE, SIMPLE]);

    for pattern in ["*", "group_1/*.py", "group_2/*.py"] {
        assert_eq!(once.coverage(pattern), twice.coverage(pattern));
    }
    assert_eq!(twice.summary("*").unwrap().lines_total, 13);
}

#[test]
fn test_covered_lines_stay_covered() {
    let mut data = data_from(&[report(&[("a.py", vec![4, 0])]).as_str()]);
    assert_close(data.coverage("a.py"), 50.0);

    data.add_report(&report(&[("a.py", vec![0, 0])])).unwrap();
    assert_eq!(data.file("a.py").unwrap().is_covered(1), Some(true));
    assert_close(data.coverage("a.py"), 50.0);

    // A report that omits the file entirely changes nothing either
    data.add_report(&report(&[("b.py", vec![0])])).unwrap();
    assert_eq!(data.file("a.py").unwrap().is_covered(1), Some(true));
    assert_close(data.coverage("a.py"), 50.0);
}

#[test]
fn test_missing_filename() {
    let data = data_from(&[include_str!("fixtures/missing_filename.xml")]);
    assert_close(data.coverage("*.py"), 84.615384615385);
    assert_close(data.coverage("*"), 84.615384615385);
    assert_eq!(data.files().count(), 3);
}

#[test]
fn test_unicode_filename() {
    let data = data_from(&[include_str!("fixtures/unicode_filename.xml")]);
    assert_close(data.coverage("*.py"), 84.615384615385);
    assert_close(data.coverage("group_1/föö.py"), 100.0);
    assert_close(data.coverage("group_2/b?z.py"), 85.714285714286);
    assert_eq!(data.coverage("group_2/baz.py"), None);
}

#[test]
fn test_missing_line_root() {
    let data = data_from(&[include_str!("fixtures/missing_line_root.xml")]);
    assert_close(data.coverage("*.py"), 50.0);
    assert_eq!(data.coverage("group_1/a.py"), None);
}

#[test]
fn test_missing_line_hits() {
    let data = data_from(&[include_str!("fixtures/missing_line_hits.xml")]);
    assert_close(data.coverage("*.py"), 50.0);
    assert_eq!(data.summary("*.py").unwrap().lines_total, 4);
}

#[test]
fn test_missing_line_num() {
    let data = data_from(&[include_str!("fixtures/missing_line_num.xml")]);
    assert_close(data.coverage("*.py"), 50.0);
    assert_eq!(data.summary("*.py").unwrap().lines_total, 2);
}

#[test]
fn test_non_int_hits() {
    let data = data_from(&[include_str!("fixtures/non_int_hits.xml")]);
    assert_close(data.coverage("*.py"), 33.333333333333);
}

#[test]
fn test_non_int_line_num() {
    let data = data_from(&[include_str!("fixtures/non_int_line_num.xml")]);
    assert_close(data.coverage("*.py"), 100.0);
    assert_eq!(data.summary("*.py").unwrap().lines_total, 2);
}

#[test]
fn test_invalid_xml() {
    let mut data = CoverageData::new();
    let err = data.add_report(INVALID).unwrap_err();
    assert!(matches!(err, CoverageParseError::Xml { .. }));
    assert!(data.is_empty());
}

#[test]
fn test_invalid_xml_leaves_data_unchanged() {
    let mut data = data_from(&[SIMPLE]);

    assert!(data.add_report(INVALID).is_err());
    assert!(data.add_report(&SIMPLE[..SIMPLE.len() / 2]).is_err());

    assert_close(data.coverage("*"), 84.615384615385);
    assert_eq!(data.file("group_1/a.py"), None);

    // Later reports still merge normally
    data.add_report(OVERLAP_1).unwrap();
    assert_close(data.coverage("group_1/*.py"), 83.333333333333);
}

#[test]
fn test_unicode_pattern() {
    let data = data_from(&[SIMPLE]);
    assert_eq!(data.coverage("\u{9202}.py"), None);
}

/// One covered line in `filename`, under a `<source>` holding `source`
fn report_with(root: &str, source: &str, filename: &str) -> String {
    format!(
        r#"<{root}><sources><source>{source}</source></sources><packages><package><classes>
            <class filename="{filename}"><lines><line number="1" hits="1"/></lines></class>
        </classes></package></packages></{root}>"#
    )
}

#[test]
fn test_not_well_formed_reports_are_rejected() {
    let cases = [
        report_with("coverage", "&bogus;", "a.py"),
        report_with("coverage", "a & b", "a.py"),
        report_with("coverage", "/repo", "a<b.py"),
        report_with("1coverage", "/repo", "a.py"),
    ];

    let mut data = CoverageData::new();
    for xml in &cases {
        assert!(data.add_report(xml).is_err(), "accepted {xml}");
    }
    assert!(data.is_empty());
    assert_eq!(data.coverage("*"), None);

    data.add_report(&report_with("coverage", "/repo &amp; co", "a&lt;b.py"))
        .unwrap();
    assert_close(data.coverage("a<b.py"), 100.0);
}

#[test]
fn test_huge_hit_count_is_covered() {
    let xml = r#"<coverage><packages><package><classes>
        <class filename="a.py"><lines>
            <line number="1" hits="99999999999999999999999"/>
        </lines></class>
    </classes></package></packages></coverage>"#;

    let data = data_from(&[xml]);
    assert_close(data.coverage("a.py"), 100.0);
}
