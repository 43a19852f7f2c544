use std::path::{Path, PathBuf};

use crate::config::RobotConfig;

use super::{EngineResult, Reasoner, path_arg, run_engine};

const ROBOT_JAVA_ARGS: &str = "ROBOT_JAVA_ARGS";

/// ROBOT invoked as `robot <verb> --input … --output …`.
#[derive(Debug, Clone)]
pub struct RobotEngine {
    program: String,
    java_args: String,
}

impl RobotEngine {
    #[must_use]
    pub fn new(config: &RobotConfig) -> Self {
        Self {
            program: path_arg(&config.program),
            java_args: config.java_args.clone(),
        }
    }

    fn run(&self, verb: &str, args: Vec<String>) -> EngineResult<String> {
        let operation = format!("robot:{verb}");
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(verb.to_string());
        full.extend(args);
        tracing::debug!(verb, java_args = %self.java_args, "running robot");
        run_engine(
            &operation,
            &self.program,
            &full,
            &[(ROBOT_JAVA_ARGS, self.java_args.as_str())],
            None,
        )
    }
}

fn io_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "--input".to_string(),
        path_arg(input),
        "--output".to_string(),
        path_arg(output),
    ]
}

impl Reasoner for RobotEngine {
    fn relax(&self, input: &Path, output: &Path) -> EngineResult<()> {
        self.run("relax", io_args(input, output)).map(|_| ())
    }

    fn remove_by_term(&self, input: &Path, output: &Path, term: &str) -> EngineResult<PathBuf> {
        let args = vec![
            "--input".to_string(),
            path_arg(input),
            "--term".to_string(),
            term.to_string(),
            "--output".to_string(),
            path_arg(output),
        ];
        self.run("remove", args)?;
        Ok(output.to_path_buf())
    }

    fn report(&self, input: &Path, output: &Path) -> EngineResult<()> {
        let mut args = io_args(input, output);
        args.extend(["--fail-on".to_string(), "none".to_string()]);
        self.run("report", args).map(|_| ())
    }

    fn measure(&self, input: &Path, output: &Path) -> EngineResult<()> {
        let mut args = io_args(input, output);
        args.extend(["--metrics".to_string(), "all".to_string()]);
        self.run("measure", args).map(|_| ())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use tempfile::tempdir;

    use super::*;
    use crate::engines::EngineError;

    /// A stand-in `robot` that records its argv and ROBOT_JAVA_ARGS.
    fn fake_robot(dir: &Path, exit_code: i32) -> PathBuf {
        let script = dir.join("robot");
        let log = dir.join("calls.log");
        fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$ROBOT_JAVA_ARGS|$*\" >> '{}'\nexit {exit_code}\n",
                log.display()
            ),
        )
        .expect("write script");
        let mut perms = fs::metadata(&script).expect("meta").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script, perms).expect("chmod");
        script
    }

    fn engine(program: PathBuf) -> RobotEngine {
        RobotEngine::new(&RobotConfig {
            program,
            java_args: "-Xmx1g".to_string(),
        })
    }

    #[test]
    fn relax_passes_java_args_and_io_paths() {
        let temp = tempdir().expect("tempdir");
        let robot = engine(fake_robot(temp.path(), 0));

        robot
            .relax(Path::new("in.owl"), Path::new("out.json"))
            .expect("relax");
        let term_out = robot
            .remove_by_term(Path::new("in.owl"), Path::new("clean.owl"), "rdfs:comment")
            .expect("remove");
        assert_eq!(term_out, PathBuf::from("clean.owl"));

        let calls = fs::read_to_string(temp.path().join("calls.log")).expect("calls");
        let lines = calls.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "-Xmx1g|relax --input in.owl --output out.json");
        assert_eq!(
            lines[1],
            "-Xmx1g|remove --input in.owl --term rdfs:comment --output clean.owl"
        );
    }

    #[test]
    fn non_zero_exit_is_a_failure() {
        let temp = tempdir().expect("tempdir");
        let robot = engine(fake_robot(temp.path(), 1));
        let err = robot
            .report(Path::new("in.owl"), Path::new("robot.report"))
            .expect_err("must fail");
        assert!(matches!(err, EngineError::Failed(_)));
    }
}
