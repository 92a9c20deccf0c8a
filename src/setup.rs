use crate::{
    api::{Source, apsystems},
    coordinator::Coordinator,
    entity::{Entities, Record, system_name},
    prelude::*,
};

/// User-facing validation failure.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SetupError {
    #[error("cannot_connect")]
    CannotConnect,

    #[error("invalid_auth")]
    InvalidAuth,

    #[error("unknown")]
    Unknown,
}

impl From<&apsystems::Error> for SetupError {
    fn from(error: &apsystems::Error) -> Self {
        match error {
            apsystems::Error::Auth(_) => Self::InvalidAuth,
            apsystems::Error::Transport(_)
            | apsystems::Error::Api { .. }
            | apsystems::Error::Unsupported(_) => Self::CannotConnect,
            apsystems::Error::Configuration { .. } => Self::Unknown,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SetupInfo {
    pub title: String,
    pub system_name: String,
}

/// Check the credentials by fetching the system details once.
#[instrument(skip_all, fields(system_id = source.system_id()))]
pub async fn validate(source: &impl Source) -> Result<SetupInfo, SetupError> {
    match source.get_system_details().await {
        Ok(details) => Ok(SetupInfo {
            title: format!("APSystems {}", source.system_id()),
            system_name: system_name(&details),
        }),
        Err(error) => {
            let setup_error = SetupError::from(&error);
            warn!(%setup_error, "validation failed: {error:#}");
            Err(setup_error)
        }
    }
}

/// Everything one configured system needs at runtime.
pub struct Integration<S> {
    pub info: SetupInfo,
    pub coordinator: Coordinator<S>,
    pub entities: Entities,
}

impl<S: Source> Integration<S> {
    /// Validate, refresh once, and discover the entities.
    ///
    /// A failed first refresh means the system is not ready and aborts the setup.
    pub async fn setup(source: S) -> Result<Self> {
        let coordinator = Coordinator::new(source);
        let info = validate(coordinator.source()).await?;
        info!(title = info.title.as_str(), system_name = info.system_name.as_str(), "validated");
        let snapshot = coordinator.refresh().await.context("the system is not ready")?;
        let entities = Entities::discover(coordinator.source().system_id(), &snapshot);
        info!(
            n_sensors = entities.sensors.len(),
            n_trackers = entities.trackers.len(),
            "discovered",
        );
        Ok(Self { info, coordinator, entities })
    }

    /// Entity states of the latest committed snapshot.
    pub fn records(&self) -> Vec<Record> {
        let state = self.coordinator.state();
        self.entities.records(&state.snapshot, state.is_available)
    }
}
