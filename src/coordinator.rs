use std::{
    collections::BTreeMap,
    sync::Arc,
    time::Duration,
};

use chrono::Local;
use tokio::{
    sync::{Mutex, watch},
    time::{MissedTickBehavior, interval},
};

use crate::{
    api::{
        Source,
        apsystems::{self, Attributes, EnergyLevel},
    },
    prelude::*,
    snapshot::Snapshot,
};

pub const UPDATE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum UpdateFailed {
    #[error("update cycle aborted: {0}")]
    Fatal(#[source] apsystems::Error),

    #[error("no usable data was obtained")]
    NoData,
}

/// What the coordinator publishes after every cycle.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Latest committed snapshot, the empty default before the first commit.
    pub snapshot: Arc<Snapshot>,

    /// Whether the last cycle committed.
    pub is_available: bool,
}

/// Polls a [`Source`] and publishes the resulting [`Snapshot`].
///
/// Readers get the whole snapshot behind an [`Arc`], so they see either the old
/// or the new one, never a mix.
pub struct Coordinator<S> {
    source: S,
    sender: watch::Sender<State>,

    /// Held for the duration of a cycle, so cycles never overlap.
    cycle: Mutex<()>,
}

impl<S: Source> Coordinator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            sender: watch::Sender::new(State::default()),
            cycle: Mutex::new(()),
        }
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> State {
        self.sender.borrow().clone()
    }

    /// Receiver notified at the end of every cycle, failed ones included.
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.sender.subscribe()
    }

    /// Run one cycle and commit its snapshot.
    ///
    /// On failure the previously committed snapshot stays in place and the state turns unavailable.
    #[instrument(skip_all, fields(system_id = self.source.system_id()))]
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, UpdateFailed> {
        let _cycle = self.cycle.lock().await;
        match self.fetch().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.sender
                    .send_replace(State { snapshot: Arc::clone(&snapshot), is_available: true });
                info!(
                    n_inverters = snapshot.inverters.len(),
                    n_errors = snapshot.errors.len(),
                    "committed",
                );
                Ok(snapshot)
            }
            Err(error) => {
                self.sender.send_modify(|state| state.is_available = false);
                Err(error)
            }
        }
    }

    /// Refresh on every tick, forever.
    ///
    /// The first tick fires after one interval: the initial refresh belongs to the setup.
    pub async fn run(&self) {
        let mut interval = interval(UPDATE_INTERVAL);
        interval.reset_after(UPDATE_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(error) = self.refresh().await {
                warn!("unavailable until the next cycle: {error:#}");
            }
        }
    }

    async fn fetch(&self) -> Result<Snapshot, UpdateFailed> {
        let today = Local::now().date_naive();
        let mut cycle = Cycle::default();

        let system_details =
            cycle.isolate("system details", self.source.get_system_details().await)?;
        let system_energy =
            cycle.isolate("system energy", self.source.get_system_energy().await)?;
        let inverters = cycle.isolate("inverters", self.source.get_inverters().await)?;

        let meters = self.source.get_meters().await.unwrap_or_else(|error| {
            debug!("meters are unavailable: {error:#}");
            Vec::new()
        });

        let mut inverter_data = BTreeMap::new();
        for uid in inverters.iter().map(|inverter| inverter.uid.as_str()) {
            if uid.is_empty() {
                continue;
            }
            let data = match self.source.get_inverter_energy(uid).await {
                Ok(data) => data,
                Err(error) if error.is_isolated() => {
                    warn!(uid, "failed to fetch the inverter energy: {error:#}");
                    cycle.errors.push(format!("inverter {uid} energy: {error}"));
                    Attributes::new()
                }
                Err(error) => return Err(UpdateFailed::Fatal(error)),
            };
            inverter_data.insert(uid.to_owned(), data);
        }

        let system_energy_today = cycle.isolate(
            "system energy today",
            self.source.get_system_energy_period(today, today).await,
        )?;

        if cycle.n_succeeded == 0 && !cycle.errors.is_empty() {
            return Err(UpdateFailed::NoData);
        }
        Ok(Snapshot {
            system_details,
            system_energy,
            system_energy_today,
            inverters,
            meters,
            inverter_data,
            errors: cycle.errors,
            last_update: Some(Local::now()),
        })
    }

    /// Today's energy of a single inverter, empty on failure.
    #[instrument(skip_all, fields(inverter_id = inverter_id))]
    pub async fn inverter_energy_today(&self, inverter_id: &str) -> Attributes {
        let today = Local::now().date_naive();
        self.source.get_inverter_energy_period(inverter_id, today, today).await.unwrap_or_else(
            |error| {
                error!("failed to fetch today's inverter energy: {error:#}");
                Attributes::new()
            },
        )
    }

    /// Today's power telemetry of the inverters under an ECU, empty on failure.
    #[instrument(skip_all, fields(ecu_id = ecu_id))]
    pub async fn inverter_power(&self, ecu_id: &str) -> Attributes {
        let today = Local::now().date_naive();
        self.source
            .get_inverter_batch_energy(ecu_id, EnergyLevel::Power, today)
            .await
            .unwrap_or_else(|error| {
                error!("failed to fetch the inverter power: {error:#}");
                Attributes::new()
            })
    }
}

/// Bookkeeping of the isolated steps within one cycle.
#[derive(Default)]
struct Cycle {
    errors: Vec<String>,
    n_succeeded: usize,
}

impl Cycle {
    /// Fold an isolated step into the cycle.
    ///
    /// Failures turn into the empty default and an advisory message. Operations
    /// the preset does not offer are skipped silently. Anything else aborts the cycle.
    fn isolate<T: Default>(
        &mut self,
        step: &str,
        result: Result<T, apsystems::Error>,
    ) -> Result<T, UpdateFailed> {
        match result {
            Ok(value) => {
                self.n_succeeded += 1;
                Ok(value)
            }
            Err(apsystems::Error::Unsupported(operation)) => {
                debug!(%operation, "skipped");
                Ok(T::default())
            }
            Err(error) if error.is_isolated() => {
                warn!(step, "failed: {error:#}");
                self.errors.push(format!("{step}: {error}"));
                Ok(T::default())
            }
            Err(error) => Err(UpdateFailed::Fatal(error)),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::{
        collections::HashSet,
        sync::{
            Mutex as StdMutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    use super::*;
    use crate::api::apsystems::{Error, Inverter, Operation};

    /// Steps of the cycle that can be told to fail.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub enum Step {
        SystemDetails,
        SystemEnergy,
        Inverters,
        Meters,
        SystemEnergyToday,
    }

    /// In-memory source with scripted failures.
    pub struct FakeSource {
        pub inverters: StdMutex<Vec<&'static str>>,
        pub failing: StdMutex<HashSet<Step>>,
        pub failing_inverters: StdMutex<HashSet<&'static str>>,

        /// Makes the system energy call fail with a non-isolated error.
        pub is_broken: AtomicBool,

        /// Alternates the inverter list between `[A, B]` and `[C]` on every listing.
        pub alternates: AtomicBool,

        n_listings: AtomicUsize,
    }

    impl Default for FakeSource {
        fn default() -> Self {
            Self {
                inverters: StdMutex::new(vec!["INV1", "INV2", "INV3"]),
                failing: StdMutex::default(),
                failing_inverters: StdMutex::default(),
                is_broken: AtomicBool::new(false),
                alternates: AtomicBool::new(false),
                n_listings: AtomicUsize::new(0),
            }
        }
    }

    impl FakeSource {
        pub fn failing(steps: &[Step]) -> Self {
            let source = Self::default();
            source.failing.lock().unwrap().extend(steps);
            source
        }

        fn step(&self, step: Step, value: Value) -> Result<Attributes, Error> {
            if self.failing.lock().unwrap().contains(&step) {
                return Err(Error::Transport(format!("{step:?} is down")));
            }
            let Value::Object(attributes) = value else { unreachable!() };
            Ok(attributes)
        }
    }

    #[async_trait]
    impl Source for FakeSource {
        fn system_id(&self) -> &str {
            "SYS1"
        }

        async fn get_system_details(&self) -> Result<Attributes, Error> {
            self.step(Step::SystemDetails, json!({"name": "Roof", "type": 1}))
        }

        async fn get_system_energy(&self) -> Result<Attributes, Error> {
            if self.is_broken.load(Ordering::Relaxed) {
                return Err(Error::Configuration {
                    operation: Operation::SystemEnergySummary,
                    message: "missing system ID".to_owned(),
                });
            }
            self.step(Step::SystemEnergy, json!({"power": 812.0, "energy": 1234.5}))
        }

        async fn get_system_energy_period(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Attributes, Error> {
            self.step(Step::SystemEnergyToday, json!({"energy": 4.2}))
        }

        async fn get_inverters(&self) -> Result<Vec<Inverter>, Error> {
            self.step(Step::Inverters, json!({}))?;
            let uids = if self.alternates.load(Ordering::Relaxed) {
                if self.n_listings.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
                    vec!["A", "B"]
                } else {
                    vec!["C"]
                }
            } else {
                self.inverters.lock().unwrap().clone()
            };
            Ok(uids
                .into_iter()
                .map(|uid| Inverter {
                    uid: uid.to_owned(),
                    model: Some("DS3".to_owned()),
                    ..Inverter::default()
                })
                .collect())
        }

        async fn get_meters(&self) -> Result<Vec<Attributes>, Error> {
            Ok(vec![self.step(Step::Meters, json!({"id": "M1"}))?])
        }

        async fn get_inverter_energy(&self, inverter_id: &str) -> Result<Attributes, Error> {
            if self.failing_inverters.lock().unwrap().contains(inverter_id) {
                return Err(Error::Api { code: "2005".to_owned(), message: "offline".to_owned() });
            }
            let Value::Object(attributes) =
                json!({"uid": inverter_id, "power": 270.0, "energy": 321.0})
            else {
                unreachable!()
            };
            Ok(attributes)
        }

        async fn get_inverter_energy_period(
            &self,
            _inverter_id: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Attributes, Error> {
            Err(Error::Transport("timed out".to_owned()))
        }

        async fn get_inverter_batch_energy(
            &self,
            _ecu_id: &str,
            _level: EnergyLevel,
            _date: NaiveDate,
        ) -> Result<Attributes, Error> {
            Err(Error::Unsupported(Operation::InverterBatchEnergy))
        }
    }

    #[tokio::test]
    async fn full_cycle_ok() -> Result<(), UpdateFailed> {
        let coordinator = Coordinator::new(FakeSource::default());
        let snapshot = coordinator.refresh().await?;
        assert!(snapshot.is_committed());
        assert!(coordinator.state().is_available);
        assert_eq!(snapshot.system_details["name"], "Roof");
        assert_eq!(snapshot.system_energy["power"], 812.0);
        assert_eq!(snapshot.system_energy_today["energy"], 4.2);
        assert_eq!(snapshot.inverters.len(), 3);
        assert_eq!(snapshot.meters.len(), 1);
        assert_eq!(snapshot.inverter_data.len(), 3);
        assert!(snapshot.errors.is_empty());
        assert!(Arc::ptr_eq(&snapshot, &coordinator.state().snapshot));
        Ok(())
    }

    #[tokio::test]
    async fn merge_is_idempotent() -> Result<(), UpdateFailed> {
        let coordinator = Coordinator::new(FakeSource::failing(&[Step::SystemEnergy]));
        let first = coordinator.refresh().await?;
        let second = coordinator.refresh().await?;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(
            Snapshot { last_update: None, ..(*first).clone() },
            Snapshot { last_update: None, ..(*second).clone() },
        );
        Ok(())
    }

    #[tokio::test]
    async fn steps_are_isolated() -> Result<(), UpdateFailed> {
        for step in [Step::SystemDetails, Step::SystemEnergy, Step::Inverters, Step::SystemEnergyToday] {
            let snapshot = Coordinator::new(FakeSource::failing(&[step])).refresh().await?;
            assert_eq!(snapshot.errors.len(), 1, "{step:?}");
            assert_eq!(snapshot.system_details.is_empty(), step == Step::SystemDetails);
            assert_eq!(snapshot.system_energy.is_empty(), step == Step::SystemEnergy);
            assert_eq!(snapshot.system_energy_today.is_empty(), step == Step::SystemEnergyToday);
            assert_eq!(snapshot.inverters.is_empty(), step == Step::Inverters);
            assert_eq!(snapshot.inverter_data.is_empty(), step == Step::Inverters);
            assert_eq!(snapshot.meters.len(), 1);
        }
        Ok(())
    }

    #[tokio::test]
    async fn meters_are_optional() -> Result<(), UpdateFailed> {
        let snapshot = Coordinator::new(FakeSource::failing(&[Step::Meters])).refresh().await?;
        assert!(snapshot.meters.is_empty());
        assert!(snapshot.errors.is_empty());
        assert_eq!(snapshot.inverter_data.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn inverter_failures_are_isolated() -> Result<(), UpdateFailed> {
        let source = FakeSource::default();
        source.failing_inverters.lock().unwrap().insert("INV2");
        let snapshot = Coordinator::new(source).refresh().await?;
        assert_eq!(snapshot.inverter_data.len(), 3);
        assert!(snapshot.inverter_data["INV2"].is_empty());
        assert_eq!(snapshot.inverter_data["INV1"]["energy"], 321.0);
        assert_eq!(snapshot.inverter_data["INV3"]["energy"], 321.0);
        assert_eq!(snapshot.errors.len(), 1);
        assert!(snapshot.errors[0].contains("INV2"));
        Ok(())
    }

    #[tokio::test]
    async fn inverters_without_id_are_skipped() -> Result<(), UpdateFailed> {
        let source = FakeSource::default();
        *source.inverters.lock().unwrap() = vec!["INV1", ""];
        let snapshot = Coordinator::new(source).refresh().await?;
        assert_eq!(snapshot.inverters.len(), 2);
        assert_eq!(snapshot.inverter_data.keys().collect::<Vec<_>>(), ["INV1"]);
        Ok(())
    }

    #[tokio::test]
    async fn fatal_fault_keeps_previous_snapshot() -> Result<(), UpdateFailed> {
        let coordinator = Coordinator::new(FakeSource::default());
        let previous = coordinator.refresh().await?;

        coordinator.source().is_broken.store(true, Ordering::Relaxed);
        let result = coordinator.refresh().await;
        assert!(matches!(result, Err(UpdateFailed::Fatal(Error::Configuration { .. }))));
        assert!(Arc::ptr_eq(&previous, &coordinator.state().snapshot));
        assert!(!coordinator.state().is_available);

        coordinator.source().is_broken.store(false, Ordering::Relaxed);
        coordinator.refresh().await?;
        assert!(coordinator.state().is_available);
        Ok(())
    }

    #[tokio::test]
    async fn no_data_is_a_failure() {
        let coordinator = Coordinator::new(FakeSource::failing(&[
            Step::SystemDetails,
            Step::SystemEnergy,
            Step::Inverters,
            Step::SystemEnergyToday,
        ]));
        let result = coordinator.refresh().await;
        assert!(matches!(result, Err(UpdateFailed::NoData)));
        assert!(!coordinator.state().snapshot.is_committed());
        assert!(!coordinator.state().is_available);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn publish_is_atomic() -> Result<(), UpdateFailed> {
        let source = FakeSource::default();
        source.alternates.store(true, Ordering::Relaxed);
        let coordinator = Arc::new(Coordinator::new(source));

        let reader = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                let mut n_samples = 0_usize;
                loop {
                    let snapshot = coordinator.state().snapshot;
                    let uids = snapshot.inverter_ids().collect::<HashSet<_>>();
                    assert!(snapshot.inverter_data.keys().all(|uid| uids.contains(uid.as_str())));
                    assert_eq!(snapshot.inverter_data.len(), uids.len());
                    n_samples += 1;
                    if snapshot.errors.iter().any(|error| error == "stop") {
                        break n_samples;
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..50 {
            coordinator.refresh().await?;
        }
        let last = coordinator.state().snapshot;
        coordinator.sender.send_replace(State {
            snapshot: Arc::new(Snapshot { errors: vec!["stop".to_owned()], ..(*last).clone() }),
            is_available: true,
        });

        let n_samples = reader.await.unwrap();
        assert!(n_samples > 0);
        Ok(())
    }

    #[tokio::test]
    async fn subscribers_are_notified() -> Result<(), UpdateFailed> {
        let coordinator = Coordinator::new(FakeSource::default());
        let mut receiver = coordinator.subscribe();
        coordinator.refresh().await?;
        assert!(receiver.has_changed().unwrap());
        assert!(receiver.borrow_and_update().snapshot.is_committed());
        Ok(())
    }

    #[tokio::test]
    async fn failures_are_notified() -> Result<(), UpdateFailed> {
        let coordinator = Coordinator::new(FakeSource::default());
        let previous = coordinator.refresh().await?;
        let mut receiver = coordinator.subscribe();

        coordinator.source().is_broken.store(true, Ordering::Relaxed);
        assert!(coordinator.refresh().await.is_err());
        assert!(receiver.has_changed().unwrap());
        let state = receiver.borrow_and_update().clone();
        assert!(!state.is_available);
        assert!(Arc::ptr_eq(&previous, &state.snapshot));

        // Every failed cycle notifies, not only the first one.
        assert!(coordinator.refresh().await.is_err());
        assert!(receiver.has_changed().unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn on_demand_failures_are_empty() {
        let coordinator = Coordinator::new(FakeSource::default());
        assert!(coordinator.inverter_energy_today("INV1").await.is_empty());
        assert!(coordinator.inverter_power("ECU1").await.is_empty());
    }
}
