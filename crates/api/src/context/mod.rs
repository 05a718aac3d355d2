//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use greenwindow_core::device::seed_device_store;
use greenwindow_core::session::load_credentials;
use greenwindow_core::{
    CapabilitySink, Clock, DevicePairing, DeviceRegistry, DeviceStore, GreenestMomentService,
    TokenLifecycleManager,
};
use greenwindow_domain::constants::{DEVICE_NAME, STORE_ORGANIZATION_ID, STORE_USER_ID};
use greenwindow_domain::{Config, Credentials, GreenWindowError, PairedDevice, Result};
use greenwindow_infra::api::EnergyApiConfig;
use greenwindow_infra::scheduling::DeviceSchedulerConfig;
use greenwindow_infra::{
    config as loader, CapabilityBoard, DeviceScheduler, EnergyApiClient, HttpClient, JsonFileStore,
    OAuthTokenClient, SchedulerError, SystemClock,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub settings: Arc<JsonFileStore>,
    pub device_store: Arc<JsonFileStore>,
    pub capabilities: Arc<CapabilityBoard>,
    pub session: Arc<TokenLifecycleManager>,
    pub api: Arc<EnergyApiClient>,
    pub service: Arc<GreenestMomentService>,
    pub registry: Arc<DeviceRegistry>,
    scheduler: Mutex<DeviceScheduler>,
    registered_id: Mutex<Option<String>>,
}

impl AppContext {
    /// Build a context from the loaded configuration.
    ///
    /// # Errors
    /// Configuration, storage or client construction failures.
    pub async fn new() -> Result<Self> {
        let config = loader::load()?;
        Self::new_with_config(config).await
    }

    /// Build a context from an explicit configuration.
    ///
    /// Opens the stores under `storage.data_dir` and wires every adapter.
    /// Nothing talks to the network until [`connect`](Self::connect).
    ///
    /// # Errors
    /// Returns `GreenWindowError::Config` for invalid settings and
    /// `GreenWindowError::Storage`/`Data` for unreadable stores.
    pub async fn new_with_config(config: Config) -> Result<Self> {
        loader::validate(&config)?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock::from_config(&config.device)?);
        let settings = Arc::new(JsonFileStore::open(config.storage.settings_path()).await?);
        let device_store = Arc::new(JsonFileStore::open(config.storage.device_store_path()).await?);

        let http = HttpClient::builder().timeout(Duration::from_secs(config.api.timeout_secs)).build()?;
        let endpoint = Arc::new(OAuthTokenClient::new(&config.oauth, http, Arc::clone(&clock))?);
        let session = Arc::new(TokenLifecycleManager::new(endpoint, settings.clone()));

        // Shared by the scheduler and the API client's backoff sleeps.
        let cancel = CancellationToken::new();
        let api = Arc::new(EnergyApiClient::new(
            EnergyApiConfig::from_config(&config)?,
            session.clone(),
            Arc::clone(&clock),
            cancel.clone(),
        )?);

        let capabilities = Arc::new(CapabilityBoard::new());
        let service = Arc::new(GreenestMomentService::new(
            api.clone(),
            device_store.clone(),
            capabilities.clone(),
            clock,
        ));

        let scheduler = DeviceScheduler::new(
            Arc::clone(&service),
            Arc::clone(&session),
            DeviceSchedulerConfig::from_device(&config.device),
            cancel,
        );

        info!(
            data_dir = %config.storage.data_dir,
            timezone = %config.device.timezone,
            "Application context created"
        );

        Ok(Self {
            config,
            settings,
            device_store,
            capabilities,
            session,
            api,
            service,
            registry: Arc::new(DeviceRegistry::new()),
            scheduler: Mutex::new(scheduler),
            registered_id: Mutex::new(None),
        })
    }

    /// Whether the device store holds a pairing result.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn is_paired(&self) -> Result<bool> {
        Ok(self.device_store.get(STORE_ORGANIZATION_ID).await?.is_some())
    }

    /// Pair a new device and seed its store.
    ///
    /// # Errors
    /// Any failing pairing step.
    pub async fn pair(&self, credentials: &Credentials) -> Result<PairedDevice> {
        let pairing = DevicePairing::new(Arc::clone(&self.session), self.api.clone());
        let device = pairing.pair(credentials).await?;
        seed_device_store(&device, self.device_store.as_ref()).await?;
        Ok(device)
    }

    /// Obtain a session, pairing first if the device store is empty.
    ///
    /// `credentials` takes precedence over the ones saved in settings. On a
    /// paired device a failed sign-in is logged and left to the refresh
    /// chain, which keeps retrying with the stored credentials.
    ///
    /// # Errors
    /// Returns `GreenWindowError::Config` when no credentials are available,
    /// otherwise the pairing error of a first run.
    #[instrument(skip_all)]
    pub async fn connect(&self, credentials: Option<Credentials>) -> Result<()> {
        let credentials = match credentials {
            Some(credentials) => credentials,
            None => load_credentials(self.settings.as_ref()).await?.ok_or_else(|| {
                GreenWindowError::Config(
                    "No credentials stored; set GREENWINDOW_USERNAME and GREENWINDOW_PASSWORD".into(),
                )
            })?,
        };

        if self.is_paired().await? {
            match self.session.authenticate_with_credentials(&credentials).await {
                Ok(()) => info!("Authenticated paired device"),
                Err(err) => warn!(
                    error = %err,
                    kind = err.kind(),
                    "Authentication failed; refresh chain will retry with stored credentials"
                ),
            }
        } else {
            let device = self.pair(&credentials).await?;
            info!(device_id = %device.id, "Paired new device");
        }
        Ok(())
    }

    /// Start the device timers and expose the device to queries.
    ///
    /// # Errors
    /// Returns `GreenWindowError::Internal` if the scheduler is already
    /// running or was shut down.
    pub async fn start(&self) -> Result<()> {
        self.scheduler.lock().await.start()?;

        let id = match self.device_store.get(STORE_USER_ID).await? {
            Some(Value::String(id)) => id,
            _ => DEVICE_NAME.to_string(),
        };
        let sink: Arc<dyn CapabilitySink> = self.capabilities.clone();
        self.registry.register(id.clone(), sink);
        *self.registered_id.lock().await = Some(id);
        Ok(())
    }

    /// Check if the device timers are running
    pub async fn is_running(&self) -> bool {
        self.scheduler.lock().await.is_running()
    }

    /// Cancel every timer and withdraw the device from queries.
    ///
    /// Safe to call when nothing was started.
    ///
    /// # Errors
    /// Returns `GreenWindowError::Internal` if the timers do not wind down
    /// within the join timeout.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application context");

        if let Some(id) = self.registered_id.lock().await.take() {
            self.registry.unregister(&id);
        }

        let mut scheduler = self.scheduler.lock().await;
        match scheduler.stop().await {
            Ok(()) | Err(SchedulerError::NotRunning) => {}
            Err(err) => {
                warn!(error = %err, "Device scheduler did not stop cleanly");
                return Err(err.into());
            }
        }
        // Never started: cancel anyway so in-flight backoff sleeps end.
        scheduler.cancellation_token().cancel();

        info!("Application context shut down");
        Ok(())
    }
}
