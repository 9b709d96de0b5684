//! Reuse / rebuild / create decision.
//!
//! The reconciler compares the fingerprint recorded on the existing container
//! (if any) with the fingerprint of the desired spec:
//!
//! ```text
//!            inspect <name>
//!                  │
//!     ┌────────────┼─────────────────┐
//!   Absent      Matching          Drifted
//!     │            │                 │
//!     │          reuse          rm -f <id>
//!     │                              │
//!     └──────── build? → create ◄────┘
//! ```
//!
//! A create that loses a race for the name re-inspects and decides once more.
//! The image is built at most once per call.

use crate::container::args::create_args;
use crate::container::{
    ContainerSpec, DevContainer, Environment, Fingerprint, ImageBuilder, Result, RuntimeClient,
    RuntimeContainer,
};
use crate::executor::{CommandExecutor, OutputSink};
use std::fmt;
use tracing::{debug, info, warn};

/// What the runtime currently holds under the spec's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Absent,
    /// Present, created from the same spec
    Matching(RuntimeContainer),
    /// Present, created from a different or unknown spec
    Drifted(RuntimeContainer),
}

/// What reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Reused,
    Created,
    Recreated,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Reused => write!(f, "reused"),
            Outcome::Created => write!(f, "created"),
            Outcome::Recreated => write!(f, "recreated"),
        }
    }
}

/// A container that satisfies the spec, and how it came to be.
pub struct Reconciled<'a, E: CommandExecutor> {
    pub container: DevContainer<'a, E>,
    pub outcome: Outcome,
}

/// Drives the runtime until a container matching the spec exists.
pub struct Reconciler<'a, E: CommandExecutor> {
    client: &'a RuntimeClient<E>,
    env: &'a Environment,
}

impl<'a, E: CommandExecutor> Reconciler<'a, E> {
    pub fn new(client: &'a RuntimeClient<E>, env: &'a Environment) -> Self {
        Self { client, env }
    }

    /// Inspect the runtime and classify what it holds under `spec.name`.
    pub async fn observe(&self, spec: &ContainerSpec, desired: &Fingerprint) -> Result<Observation> {
        let Some(container) = self.client.inspect(&spec.name).await? else {
            return Ok(Observation::Absent);
        };

        debug!(
            "Container {} has fingerprint {:?}, want {}",
            container.name,
            container.recorded_fingerprint.as_ref().map(Fingerprint::as_str),
            desired
        );
        if container.recorded_fingerprint.as_ref() == Some(desired) {
            Ok(Observation::Matching(container))
        } else {
            Ok(Observation::Drifted(container))
        }
    }

    /// Make sure a container matching `spec` exists.
    ///
    /// The spec is validated before the runtime is contacted. Build output,
    /// if any, is streamed to `stdout` and `stderr`.
    pub async fn reconcile(
        &self,
        spec: &ContainerSpec,
        stdout: OutputSink<'_>,
        stderr: OutputSink<'_>,
    ) -> Result<Reconciled<'a, E>> {
        spec.validate()?;
        let fingerprint = Fingerprint::of(spec)?;
        let mut retried = false;
        let mut built = false;

        loop {
            let outcome = match self.observe(spec, &fingerprint).await? {
                Observation::Matching(existing) => {
                    info!("Reusing container {} ({})", existing.name, existing.short_id());
                    return Ok(self.reconciled(existing.id, spec, Outcome::Reused));
                }
                Observation::Drifted(existing) => {
                    info!(
                        "Configuration of {} changed, recreating container {}",
                        existing.name,
                        existing.short_id()
                    );
                    self.client.remove(&existing.id).await?;
                    Outcome::Recreated
                }
                Observation::Absent => Outcome::Created,
            };

            if !built {
                ImageBuilder::new(self.client, self.env)
                    .build(spec, &mut *stdout, &mut *stderr)
                    .await?;
                built = true;
            }

            match self.client.create(create_args(spec, &fingerprint, self.env)).await {
                Ok(id) => {
                    info!("Created container {}", spec.name);
                    return Ok(self.reconciled(id, spec, outcome));
                }
                Err(e) if e.is_name_conflict() && !retried => {
                    warn!("Container name {} was taken concurrently, re-inspecting", spec.name);
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn reconciled(&self, id: String, spec: &ContainerSpec, outcome: Outcome) -> Reconciled<'a, E> {
        Reconciled {
            container: DevContainer::new(self.client, self.env, id, spec.clone()),
            outcome,
        }
    }
}
