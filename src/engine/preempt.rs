//! Best-effort preemption of a process already bound to the engine port.

use tokio::process::Command;

/// Port-owner lookup and terminate capability. Advisory on every path: a
/// failed lookup or kill is logged and swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortPreempt {
    /// netstat-based lookup plus SIGKILL, for Unix-likes.
    Unix,
    /// For platforms without a supported lookup.
    Noop,
}

impl PortPreempt {
    /// Pick the implementation for the current platform.
    pub fn for_platform() -> Self {
        if cfg!(unix) {
            Self::Unix
        } else {
            Self::Noop
        }
    }

    /// Terminate whatever currently owns `port`, if anything.
    pub async fn preempt(&self, port: &str) {
        match self {
            Self::Noop => {}
            Self::Unix => {
                if let Err(err) = preempt_unix(port).await {
                    tracing::warn!(port, error = %err, "could not preempt port owner");
                }
            }
        }
    }
}

async fn preempt_unix(port: &str) -> std::io::Result<()> {
    let lookup = format!(
        "netstat -plnt 2>/dev/null | grep :{port} | awk '{{print $7}}' | cut -d/ -f 1"
    );
    let output = Command::new("sh").arg("-c").arg(lookup).output().await?;
    let pid = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if pid.is_empty() {
        return Ok(());
    }

    tracing::info!(port, pid = %pid, "killing stale engine process");
    let status = Command::new("kill").arg("-9").arg(&pid).status().await?;
    if !status.success() {
        tracing::warn!(port, pid = %pid, code = ?status.code(), "kill exited nonzero");
    }
    Ok(())
}
