mod actor;

use crate::actors::coordinator::messages::CoordinatorMessage;
use crate::events::Output;
use crate::store::Job;
use actor::Actor;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::{process, sync::mpsc, task::JoinHandle};

/// One worker per job: owns the solver subprocess from spawn to exit.
pub struct Worker;

impl Worker {
    /// Launch the solver and the actor that shepherds it.
    ///
    /// The subprocess is exec'd directly with an argument vector --
    /// user-supplied solver names and options never pass through a shell.
    pub fn spawn(
        program: &Path,
        args: &[String],
        job: &Job,
        output_tx: mpsc::UnboundedSender<Output>,
        log_writer: JoinHandle<()>,
        completion_tx: mpsc::Sender<CoordinatorMessage>,
    ) -> io::Result<()> {
        let mut command = process::Command::new(program);
        let child = command
            .args(args)
            .current_dir(&job.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        Actor::spawn(job.id, child, output_tx, log_writer, completion_tx);
        Ok(())
    }
}

/// Solver names are plain identifiers; anything else could smuggle extra
/// flags or paths onto the command line.
pub fn valid_solver_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Argument vector for one solve. Extra options are forwarded verbatim, each
/// as its own argv element.
pub fn solver_args(job: &Job, solver: &str, extra_options: &[String]) -> Vec<String> {
    let mut args = vec![
        "solve".to_string(),
        job.model_path().display().to_string(),
        job.data_path().display().to_string(),
        "--output-directory".to_string(),
        job.dir.display().to_string(),
        "--solver".to_string(),
        solver.to_string(),
        "--output-format=json".to_string(),
        "--solutions-in-one-file".to_string(),
        "--copy-solutions=no".to_string(),
    ];
    args.extend(extra_options.iter().cloned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn solver_names() {
        assert!(valid_solver_name("kissat"));
        assert!(valid_solver_name("chuffed"));
        assert!(valid_solver_name("or-tools_9.4"));
        assert!(!valid_solver_name(""));
        assert!(!valid_solver_name("--seed=1"));
        assert!(!valid_solver_name("kissat; rm -rf /"));
        assert!(!valid_solver_name("../minion"));
    }

    #[test]
    fn args_keep_option_order() {
        let job = Job {
            id: Uuid::new_v4(),
            dir: "/work/job".into(),
        };
        let extra = vec!["--log-level".to_string(), "2".to_string()];
        let args = solver_args(&job, "minion", &extra);
        assert_eq!(args[0], "solve");
        assert_eq!(args[1], "/work/job/model.essence");
        assert_eq!(args[2], "/work/job/data.json");
        let solver_flag = args.iter().position(|a| a == "--solver").unwrap();
        assert_eq!(args[solver_flag + 1], "minion");
        assert_eq!(&args[args.len() - 2..], &extra[..]);
    }
}
