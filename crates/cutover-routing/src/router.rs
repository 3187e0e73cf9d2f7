//! Hooks into the external router process.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info};

use cutover_core::{Invocation, substitute};

/// Boxed future returned by [`RouterControl`] methods.
pub type RouterFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// Validate and reload the external router.
pub trait RouterControl: Send + Sync {
    /// Syntax-check a staged routing file before it goes live.
    fn validate<'a>(&'a self, staged: &'a Path) -> RouterFuture<'a>;

    /// Tell the router to re-read its configuration without dropping
    /// in-flight connections.
    fn reload(&self) -> RouterFuture<'_>;
}

/// Runs the tier's configured validate/reload commands.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    validate: Option<Vec<String>>,
    reload: Vec<String>,
    timeout: Duration,
}

impl CommandRouter {
    pub fn new(validate: Option<Vec<String>>, reload: Vec<String>, timeout: Duration) -> Self {
        Self {
            validate,
            reload,
            timeout,
        }
    }

    async fn run(&self, argv: Vec<String>, what: &str) -> Result<(), String> {
        let output = Invocation::new(argv)
            .timeout(self.timeout)
            .run()
            .await
            .map_err(|e| e.to_string())?;
        if output.success() {
            debug!(what, "router command succeeded");
            Ok(())
        } else {
            Err(output.describe_failure())
        }
    }
}

impl RouterControl for CommandRouter {
    fn validate<'a>(&'a self, staged: &'a Path) -> RouterFuture<'a> {
        Box::pin(async move {
            let Some(argv) = &self.validate else {
                return Ok(());
            };
            let staged = staged.display().to_string();
            let argv = substitute(argv, &[("config", staged.as_str())]);
            self.run(argv, "validate").await
        })
    }

    fn reload(&self) -> RouterFuture<'_> {
        Box::pin(async move {
            info!(command = %self.reload.join(" "), "reloading router");
            self.run(self.reload.clone(), "reload").await
        })
    }
}
