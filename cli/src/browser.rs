use crate::capabilities::BrowserLauncher;
use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::process::Command;

/// Opens URLs by running a desktop opener command with the URL appended.
#[derive(Clone, Debug)]
pub struct CommandBrowser {
    program: String,
    args: Vec<String>,
}

impl CommandBrowser {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The platform's default browser opener.
    pub fn system() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("open", vec![])
        } else if cfg!(windows) {
            // hand the URL straight to the shell URL handler; cmd would reparse `&` and `^`
            Self::new("rundll32", vec!["url.dll,FileProtocolHandler".into()])
        } else {
            Self::new("xdg-open", vec![])
        }
    }
}

#[async_trait]
impl BrowserLauncher for CommandBrowser {
    async fn open(&self, url: &str) -> io::Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} exited with {}", self.program, status),
            ))
        }
    }
}
