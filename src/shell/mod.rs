//! Shell startup-file integration.
//!
//! Installs a marker-delimited block into the user's shell rc file that
//! wraps the host tool so every invocation carries the profile fragment.
//! The patching itself is a line-based text transform, independent of shell
//! dialect: insert one uniquely marked block, remove by marker-delimited
//! span. The rc file is backed up before every modification.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// First line of the managed block.
pub const MARKER_BEGIN: &str = "# >>> promem integration >>>";

/// Last line of the managed block.
pub const MARKER_END: &str = "# <<< promem integration <<<";

/// Supported shell families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    /// GNU Bash (`~/.bashrc`).
    Bash,
    /// Zsh (`~/.zshrc`).
    Zsh,
    /// Fish (`~/.config/fish/config.fish`).
    Fish,
}

/// Result of an install attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The block was appended.
    Installed,
    /// The block was already present; nothing changed.
    AlreadyInstalled,
}

/// Result of an uninstall attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallOutcome {
    /// The block was removed.
    Removed,
    /// No block was present; nothing changed.
    NotPresent,
}

/// Current integration state, for the status command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    /// The managed block is present in the rc file.
    Installed,
    /// The rc file exists but carries no managed block.
    NotInstalled,
    /// The rc file does not exist.
    NoRcFile,
}

impl ShellKind {
    /// Detects the shell family from a shell executable path (the value of
    /// the `SHELL` environment variable).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unrecognized shells.
    pub fn from_shell_path(shell_path: &str) -> Result<Self> {
        let name = Path::new(shell_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(shell_path);
        match name {
            "bash" => Ok(Self::Bash),
            "zsh" => Ok(Self::Zsh),
            "fish" => Ok(Self::Fish),
            other => Err(Error::InvalidInput(format!(
                "unsupported shell '{other}' (supported: bash, zsh, fish)"
            ))),
        }
    }

    /// Detects the shell family from the `SHELL` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `SHELL` is unset or names an
    /// unsupported shell.
    pub fn detect() -> Result<Self> {
        let shell = std::env::var("SHELL")
            .map_err(|_| Error::InvalidInput("SHELL environment variable is not set".to_string()))?;
        Self::from_shell_path(&shell)
    }

    /// The startup file this shell family reads.
    fn rc_path(self, home: &Path) -> PathBuf {
        match self {
            Self::Bash => home.join(".bashrc"),
            Self::Zsh => home.join(".zshrc"),
            Self::Fish => home.join(".config").join("fish").join("config.fish"),
        }
    }

    /// The wrapper snippet for this shell family.
    fn snippet(self, host_command: &str) -> String {
        match self {
            Self::Bash | Self::Zsh => format!(
                "{host_command}() {{\n\
                 \x20 local _promem_fragment\n\
                 \x20 _promem_fragment=\"$(promem fragment auto 2>/dev/null)\"\n\
                 \x20 if [ -n \"$_promem_fragment\" ]; then\n\
                 \x20   command {host_command} --system \"$_promem_fragment\" \"$@\"\n\
                 \x20 else\n\
                 \x20   command {host_command} \"$@\"\n\
                 \x20 fi\n\
                 }}"
            ),
            Self::Fish => format!(
                "function {host_command}\n\
                 \x20   set -l _promem_fragment (promem fragment auto 2>/dev/null | string collect)\n\
                 \x20   if test -n \"$_promem_fragment\"\n\
                 \x20       command {host_command} --system \"$_promem_fragment\" $argv\n\
                 \x20   else\n\
                 \x20       command {host_command} $argv\n\
                 \x20   end\n\
                 end"
            ),
        }
    }
}

/// Manages the promem block in one shell startup file.
#[derive(Debug, Clone)]
pub struct ShellIntegration {
    /// The startup file being managed.
    rc_path: PathBuf,
    /// The full marker-delimited block.
    block: String,
}

impl ShellIntegration {
    /// Creates an integration for an explicit shell family and rc file.
    #[must_use]
    pub fn new(kind: ShellKind, rc_path: impl Into<PathBuf>, host_command: &str) -> Self {
        let block = format!(
            "{MARKER_BEGIN}\n{}\n{MARKER_END}",
            kind.snippet(host_command)
        );
        Self {
            rc_path: rc_path.into(),
            block,
        }
    }

    /// Creates an integration for the detected shell and the user's home
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the shell cannot be detected and
    /// [`Error::OperationFailed`] when no home directory is available.
    pub fn detect(host_command: &str) -> Result<Self> {
        let kind = ShellKind::detect()?;
        let home = directories::BaseDirs::new()
            .ok_or_else(|| Error::operation("detect_shell", "no home directory"))?
            .home_dir()
            .to_path_buf();
        Ok(Self::new(kind, kind.rc_path(&home), host_command))
    }

    /// The startup file being managed.
    #[must_use]
    pub fn rc_path(&self) -> &Path {
        &self.rc_path
    }

    /// Appends the managed block to the rc file, creating it if missing.
    /// Idempotent: an existing block is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] on I/O failures, including a
    /// failed backup.
    pub fn install(&self) -> Result<InstallOutcome> {
        let contents = self.read_rc()?.unwrap_or_default();
        if contains_block(&contents) {
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        self.backup_existing()?;

        let mut updated = contents;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        if !updated.is_empty() {
            updated.push('\n');
        }
        updated.push_str(&self.block);
        updated.push('\n');

        self.write_rc(&updated)?;
        tracing::info!(rc = %self.rc_path.display(), "shell integration installed");
        Ok(InstallOutcome::Installed)
    }

    /// Removes the managed block from the rc file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] on I/O failures.
    pub fn uninstall(&self) -> Result<UninstallOutcome> {
        let Some(contents) = self.read_rc()? else {
            return Ok(UninstallOutcome::NotPresent);
        };

        let (updated, removed) = remove_block(&contents);
        if !removed {
            return Ok(UninstallOutcome::NotPresent);
        }

        self.backup_existing()?;
        self.write_rc(&updated)?;
        tracing::info!(rc = %self.rc_path.display(), "shell integration removed");
        Ok(UninstallOutcome::Removed)
    }

    /// Reports whether the managed block is present.
    #[must_use]
    pub fn status(&self) -> InstallStatus {
        match self.read_rc() {
            Ok(Some(contents)) if contains_block(&contents) => InstallStatus::Installed,
            Ok(Some(_)) => InstallStatus::NotInstalled,
            Ok(None) | Err(_) => InstallStatus::NoRcFile,
        }
    }

    /// Reads the rc file; `None` when it does not exist.
    fn read_rc(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.rc_path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::operation("read_rc_file", e)),
        }
    }

    /// Writes the rc file, creating parent directories as needed (fish keeps
    /// its config under `~/.config/fish/`).
    fn write_rc(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.rc_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_rc_dir", e))?;
        }
        std::fs::write(&self.rc_path, contents).map_err(|e| Error::operation("write_rc_file", e))
    }

    /// Copies the current rc file to a timestamped backup, when it exists.
    fn backup_existing(&self) -> Result<()> {
        if !self.rc_path.exists() {
            return Ok(());
        }
        let suffix = chrono::Local::now().format("%Y%m%d%H%M%S");
        let file_name = self
            .rc_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let backup = self
            .rc_path
            .with_file_name(format!("{file_name}.promem-backup-{suffix}"));
        std::fs::copy(&self.rc_path, &backup)
            .map_err(|e| Error::operation("backup_rc_file", e))?;
        tracing::debug!(backup = %backup.display(), "rc file backed up");
        Ok(())
    }
}

/// Whether `contents` carries the managed block.
fn contains_block(contents: &str) -> bool {
    contents.lines().any(|line| line.trim() == MARKER_BEGIN)
}

/// Removes the marker-delimited span, line-based. Returns the new contents
/// and whether anything was removed.
fn remove_block(contents: &str) -> (String, bool) {
    let mut kept = Vec::new();
    let mut in_block = false;
    let mut removed = false;

    for line in contents.lines() {
        if line.trim() == MARKER_BEGIN {
            in_block = true;
            removed = true;
            continue;
        }
        if line.trim() == MARKER_END {
            in_block = false;
            continue;
        }
        if !in_block {
            kept.push(line);
        }
    }

    let mut result = kept.join("\n");
    if contents.ends_with('\n') && !result.is_empty() {
        result.push('\n');
    }
    (result, removed)
}
