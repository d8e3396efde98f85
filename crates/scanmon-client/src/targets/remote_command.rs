use super::common::shell_quote;

/// Builds the command line handed to the remote login shell. Arguments are
/// quoted; `raw` fragments (user-supplied command templates) are not.
#[derive(Debug, Clone)]
pub struct RemoteCommand {
    parts: Vec<String>,
}

impl RemoteCommand {
    pub fn new(program: &str) -> Self {
        Self {
            parts: vec![program.to_string()],
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.parts.push(shell_quote(arg));
        self
    }

    pub fn raw(mut self, fragment: &str) -> Self {
        self.parts.push(fragment.to_string());
        self
    }

    pub fn and_raw(self, fragment: &str) -> Self {
        self.raw("&&").raw(fragment)
    }

    pub fn to_shell_string(&self) -> String {
        self.parts.join(" ")
    }
}

/// `cd <directory> && <command>`, the shape of every submission.
pub fn in_directory(directory: &str, command: &str) -> RemoteCommand {
    RemoteCommand::new("cd").arg(directory).and_raw(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_arguments() {
        let cmd = RemoteCommand::new("mkdir").arg("-p").arg("scan output");
        assert_eq!(cmd.to_shell_string(), "mkdir '-p' 'scan output'");
    }

    #[test]
    fn test_in_directory_keeps_command_unquoted() {
        let cmd = in_directory("/scratch/it's", "sbatch scan.sh EA0001 && echo ok");
        assert_eq!(
            cmd.to_shell_string(),
            "cd '/scratch/it'\\''s' && sbatch scan.sh EA0001 && echo ok"
        );
    }
}
