//! Remote-access argument vectors.
//!
//! Pure construction of `ssh`, `scp`, and `rsync` invocations. The first
//! element of every returned vector is the program name; the core manages
//! these processes but never speaks their protocols.

use crate::domain::InstanceRecord;

/// Resolved remote-access credentials applied to a whole batch.
///
/// An empty `key_path` is legal and simply omits `-i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAccess {
    pub user: String,
    pub key_path: String,
}

/// Direction of a remote copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    /// Local `file` → remote `location`.
    Put,
    /// Remote `file` → local `location`.
    Get,
}

impl RemoteAccess {
    fn ssh_options(&self, tty: bool) -> Vec<String> {
        let mut opts = Vec::new();
        if !self.key_path.is_empty() {
            opts.push("-i".to_string());
            opts.push(self.key_path.clone());
        }
        if tty {
            opts.push("-t".to_string());
        }
        opts
    }

    fn target(&self, inst: &InstanceRecord) -> String {
        format!("{}@{}", self.user, inst.dns_name)
    }

    /// `ssh [-i key] [-t] user@dns [command words...]`
    ///
    /// `-t` forces pseudo-terminal allocation for elevated execution. An
    /// empty command opens an interactive session.
    #[must_use]
    pub fn ssh_argv(&self, inst: &InstanceRecord, command: &str, tty: bool) -> Vec<String> {
        let mut argv = vec!["ssh".to_string()];
        argv.extend(self.ssh_options(tty));
        argv.push(self.target(inst));
        argv.extend(command.split_whitespace().map(str::to_string));
        argv
    }

    /// The trivial no-op used to probe reachability: output is discarded,
    /// only the exit status matters.
    #[must_use]
    pub fn probe_argv(&self, inst: &InstanceRecord, connect_timeout_secs: u64) -> Vec<String> {
        let mut argv = vec![
            "ssh".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={connect_timeout_secs}"),
        ];
        argv.extend(self.ssh_options(false));
        argv.push(self.target(inst));
        argv.push("exit".to_string());
        argv
    }

    /// `scp [-i key] [-r] <src> <dst>` with src/dst ordered by direction.
    #[must_use]
    pub fn scp_argv(
        &self,
        inst: &InstanceRecord,
        file: &str,
        location: &str,
        direction: CopyDirection,
        recursive: bool,
    ) -> Vec<String> {
        let mut argv = vec!["scp".to_string()];
        argv.extend(self.ssh_options(false));
        if recursive {
            argv.push("-r".to_string());
        }
        match direction {
            CopyDirection::Put => {
                argv.push(file.to_string());
                argv.push(format!("{}:{location}", self.target(inst)));
            }
            CopyDirection::Get => {
                argv.push(format!("{}:{file}", self.target(inst)));
                argv.push(location.to_string());
            }
        }
        argv
    }

    /// `rsync -auzh -zz -e "ssh [-i key]" [--exclude p]... <src> user@dns:<dst>`
    #[must_use]
    pub fn rsync_argv(
        &self,
        inst: &InstanceRecord,
        file: &str,
        location: &str,
        exclusions: &[String],
    ) -> Vec<String> {
        let mut transport = vec!["ssh".to_string()];
        transport.extend(self.ssh_options(false));
        let mut argv = vec![
            "rsync".to_string(),
            "-auzh".to_string(),
            "-zz".to_string(),
            "-e".to_string(),
            transport.join(" "),
        ];
        for pattern in exclusions {
            argv.push("--exclude".to_string());
            argv.push(pattern.clone());
        }
        argv.push(file.to_string());
        argv.push(format!("{}:{location}", self.target(inst)));
        argv
    }
}
