use std::path::Path;

use crate::engines::Reasoner;

pub const REPORT_FILENAME: &str = "robot.report";
pub const MEASURE_FILENAME: &str = "robot.measure";

/// Runs the reasoner's quality report and metrics over the original dump,
/// writing both next to the graph tables. Returns false if either failed;
/// a failed report never fails the file.
pub fn write_audit_reports(reasoner: &dyn Reasoner, source: &Path, output_dir: &Path) -> bool {
    let mut complete = true;
    if let Err(err) = reasoner.report(source, &output_dir.join(REPORT_FILENAME)) {
        tracing::warn!(source = %source.display(), error = %err, "robot report failed");
        complete = false;
    }
    if let Err(err) = reasoner.measure(source, &output_dir.join(MEASURE_FILENAME)) {
        tracing::warn!(source = %source.display(), error = %err, "robot measure failed");
        complete = false;
    }
    complete
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::artifacts::inspect_output_dir;
    use crate::engines::test_support::FakeReasoner;

    #[test]
    fn writes_report_and_measure_into_output_dir() {
        let temp = tempdir().expect("tempdir");
        let reasoner = FakeReasoner::default();

        assert!(write_audit_reports(&reasoner, Path::new("dump"), temp.path()));
        assert_eq!(reasoner.calls(), vec!["report", "measure"]);
        assert!(temp.path().join(REPORT_FILENAME).exists());
        assert!(temp.path().join(MEASURE_FILENAME).exists());
        assert!(inspect_output_dir(temp.path()).expect("inspect").has_report);
    }

    #[test]
    fn missing_output_dir_reports_incomplete() {
        let temp = tempdir().expect("tempdir");
        let reasoner = FakeReasoner::default();
        assert!(!write_audit_reports(
            &reasoner,
            Path::new("dump"),
            &temp.path().join("absent")
        ));
    }
}
