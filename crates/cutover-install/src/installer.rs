//! Artifact installer.
//!
//! Installs a build into the inactive slot: verify, stop, back up the old
//! root, extract into a clean root, render the slot's environment file,
//! hand the service to the supervisor and start it. The active slot is
//! never an argument here, so it cannot be touched.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use walkdir::WalkDir;

use cutover_core::{
    ArtifactKind, DeploymentArtifact, Environment, InstallSettings, Invocation, ResolvedTier,
    epoch_secs,
};

use crate::error::{InstallError, InstallResult};
use crate::supervisor::Supervisor;

/// What an install left on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub root: PathBuf,
    /// Where the previous contents of the root were moved, if there were any.
    pub backup: Option<PathBuf>,
    pub env_file: PathBuf,
}

pub struct ArtifactInstaller {
    service: String,
    tier: String,
    settings: InstallSettings,
    extract_timeout: Duration,
    supervisor: Arc<dyn Supervisor>,
}

impl ArtifactInstaller {
    pub fn new(
        service: &str,
        tier: &str,
        settings: InstallSettings,
        extract_timeout: Duration,
        supervisor: Arc<dyn Supervisor>,
    ) -> Self {
        Self {
            service: service.to_string(),
            tier: tier.to_string(),
            settings,
            extract_timeout,
            supervisor,
        }
    }

    pub fn for_tier(tier: &ResolvedTier, supervisor: Arc<dyn Supervisor>) -> Self {
        Self::new(
            &tier.config.service,
            &tier.name,
            tier.config.install.clone(),
            tier.extract_timeout,
            supervisor,
        )
    }

    /// Install `artifact` into `env` and start its service.
    pub async fn install(
        &self,
        env: &Environment,
        artifact: &DeploymentArtifact,
    ) -> InstallResult<InstallReport> {
        // Verification happens before anything on disk changes. Hashing a
        // large archive is blocking work.
        let to_verify = artifact.clone();
        let kind = tokio::task::spawn_blocking(move || to_verify.verify())
            .await
            .map_err(|e| InstallError::Verify(e.to_string()))??;
        info!(slot = %env.slot, artifact = %artifact.path.display(), ?kind, "installing artifact");

        self.supervisor.stop(env).await?;

        let backup = backup_root(&env.root)?;
        if let Some(backup) = &backup {
            info!(slot = %env.slot, backup = %backup.display(), "previous root preserved");
        }
        std::fs::create_dir_all(&env.root).map_err(|source| InstallError::Io {
            path: env.root.clone(),
            source,
        })?;

        self.extract(kind, &artifact.path, &env.root).await?;

        let start_script = env.root.join(&self.settings.start_script);
        let env_template = env.root.join(&self.settings.env_template);
        for required in [&start_script, &env_template] {
            if !required.is_file() {
                return Err(InstallError::MissingFile(
                    required
                        .strip_prefix(&env.root)
                        .unwrap_or(required)
                        .display()
                        .to_string(),
                ));
            }
        }
        std::fs::set_permissions(&start_script, std::fs::Permissions::from_mode(0o755)).map_err(
            |source| InstallError::Io {
                path: start_script.clone(),
                source,
            },
        )?;

        let env_file = env.root.join(&self.settings.env_file);
        self.write_env_file(env, &env_template, &env_file)?;

        self.supervisor
            .configure(env, &start_script, &env_file)
            .await?;
        self.supervisor.start(env).await?;

        info!(slot = %env.slot, port = env.port, "artifact installed and service started");
        Ok(InstallReport {
            root: env.root.clone(),
            backup,
            env_file,
        })
    }

    async fn extract(&self, kind: ArtifactKind, from: &Path, into: &Path) -> InstallResult<()> {
        match kind {
            ArtifactKind::TarGz | ArtifactKind::Tar => {
                let flags = if kind == ArtifactKind::TarGz { "-xzf" } else { "-xf" };
                let output = Invocation::new([
                    "tar".to_string(),
                    flags.to_string(),
                    from.display().to_string(),
                    "-C".to_string(),
                    into.display().to_string(),
                ])
                .timeout(self.extract_timeout)
                .run()
                .await
                .map_err(|e| InstallError::Extract(e.to_string()))?;
                if !output.success() {
                    return Err(InstallError::Extract(output.describe_failure()));
                }
                Ok(())
            }
            ArtifactKind::Directory => {
                let (from, into) = (from.to_path_buf(), into.to_path_buf());
                tokio::task::spawn_blocking(move || copy_tree(&from, &into))
                    .await
                    .map_err(|e| InstallError::Extract(e.to_string()))?
            }
        }
    }

    fn write_env_file(
        &self,
        env: &Environment,
        template: &Path,
        target: &Path,
    ) -> InstallResult<()> {
        let contents = std::fs::read_to_string(template).map_err(|source| InstallError::Io {
            path: template.to_path_buf(),
            source,
        })?;
        let vars = [
            ("PORT", env.port.to_string()),
            ("SLOT", env.name().to_string()),
            ("SERVICE", self.service.clone()),
            ("TIER", self.tier.clone()),
        ];
        let rendered = render_env(&contents, &vars);
        std::fs::write(target, rendered).map_err(|source| InstallError::Io {
            path: target.to_path_buf(),
            source,
        })?;
        debug!(slot = %env.slot, path = %target.display(), "environment file rendered");
        Ok(())
    }
}

/// Move an existing root aside as `<root>.backup-<epoch>`.
fn backup_root(root: &Path) -> InstallResult<Option<PathBuf>> {
    if !root.exists() {
        return Ok(None);
    }
    let stamp = epoch_secs();
    let mut backup = sibling(root, &format!("backup-{stamp}"));
    let mut n = 1;
    while backup.exists() {
        backup = sibling(root, &format!("backup-{stamp}-{n}"));
        n += 1;
    }
    std::fs::rename(root, &backup).map_err(|source| InstallError::Backup {
        from: root.to_path_buf(),
        to: backup.clone(),
        source,
    })?;
    Ok(Some(backup))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn copy_tree(from: &Path, into: &Path) -> InstallResult<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| InstallError::Extract(e.to_string()))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| InstallError::Extract(e.to_string()))?;
        let dest = into.join(rel);
        let io_err = |source| InstallError::Io {
            path: dest.clone(),
            source,
        };
        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&dest).map_err(io_err)?;
        } else if file_type.is_symlink() {
            let link = std::fs::read_link(entry.path()).map_err(io_err)?;
            std::os::unix::fs::symlink(link, &dest).map_err(io_err)?;
        } else {
            std::fs::copy(entry.path(), &dest).map_err(io_err)?;
        }
    }
    Ok(())
}

/// Substitute `{{KEY}}` placeholders and append any key the template does
/// not assign itself.
fn render_env(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{key}}}}}"), value)
    });
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for (key, value) in vars {
        if !assigns(&out, key) {
            out.push_str(&format!("{key}={value}\n"));
        }
    }
    out
}

fn assigns(contents: &str, key: &str) -> bool {
    contents.lines().any(|line| {
        let line = line.trim_start();
        let line = line.strip_prefix("export ").unwrap_or(line);
        line.split_once('=').is_some_and(|(k, _)| k.trim() == key)
    })
}
