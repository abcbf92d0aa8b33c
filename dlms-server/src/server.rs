//! DLMS/COSEM server object host
//!
//! The server owns the logical device's COSEM objects and the capture
//! schedulers of its profiles. Starting, stopping and triggering captures
//! goes through here so that object and scheduler lifetimes stay together.

use dlms_core::{DlmsError, DlmsResult, ObisCode};
use dlms_interface::{CosemObject, ObjectDirectory, ProfileGeneric};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::SchedulerConfig;
use crate::scheduler::{CaptureScheduler, SchedulerHandle};
use crate::statistics::CaptureStatistics;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Configuration shared by all capture schedulers
    pub scheduler: SchedulerConfig,
    /// Start capturing a profile as soon as it is registered, unless its
    /// capture period is 0
    pub auto_start_capture: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            auto_start_capture: false,
        }
    }
}

/// DLMS/COSEM server
///
/// Manages:
/// - COSEM object registry
/// - Profile Generic objects and their background capture
///
/// # Usage Example
/// ```rust,no_run
/// use dlms_core::{DataObject, ObisCode};
/// use dlms_interface::{CaptureObjectDefinition, Data, ProfileGeneric};
/// use dlms_server::DlmsServer;
/// use std::sync::Arc;
///
/// # async fn demo() -> dlms_core::DlmsResult<()> {
/// let server = DlmsServer::new();
/// let energy = ObisCode::new(1, 0, 1, 8, 0, 255);
/// server.register_object(Arc::new(Data::new(energy, DataObject::Unsigned32(0)))).await?;
///
/// let profile = server.register_profile(ProfileGeneric::with_default_obis(96)).await?;
/// profile.add_capture_object(CaptureObjectDefinition::new(1, energy, 2)).await;
///
/// server.start_capture(&ProfileGeneric::default_obis()).await?;
/// server.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct DlmsServer {
    objects: ObjectDirectory,
    profiles: Arc<RwLock<HashMap<ObisCode, Arc<ProfileGeneric>>>>,
    scheduler: CaptureScheduler,
    handles: Arc<RwLock<HashMap<ObisCode, SchedulerHandle>>>,
    config: ServerConfig,
}

impl DlmsServer {
    /// Create a new DLMS server with default configuration
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new DLMS server with custom configuration
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            objects: ObjectDirectory::new(),
            profiles: Arc::new(RwLock::new(HashMap::new())),
            scheduler: CaptureScheduler::new(config.scheduler.clone()),
            handles: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Directory of every registered object, profiles included
    pub fn objects(&self) -> &ObjectDirectory {
        &self.objects
    }

    /// Register a COSEM object with the server
    ///
    /// # Errors
    /// Returns error if an object with the same OBIS code is already registered
    pub async fn register_object(&self, object: Arc<dyn CosemObject>) -> DlmsResult<()> {
        self.objects.insert(object).await
    }

    /// Register a Profile Generic object
    ///
    /// The profile resolves its capture objects through this server's
    /// object directory. Returns the shared instance so the host can keep
    /// configuring it.
    pub async fn register_profile(&self, profile: ProfileGeneric) -> DlmsResult<Arc<ProfileGeneric>> {
        let profile = Arc::new(profile.with_resolver(self.objects.resolver()));
        let obis = profile.logical_name();

        self.objects.insert(profile.clone()).await?;
        self.profiles.write().await.insert(obis, profile.clone());
        log::debug!("Registered profile {}", obis);

        if self.config.auto_start_capture && profile.capture_period().await > 0 {
            self.start_capture(&obis).await?;
        }
        Ok(profile)
    }

    /// Unregister a COSEM object, stopping its capture first
    ///
    /// The object is removed even when its capture task ended abnormally;
    /// that failure is still returned.
    pub async fn unregister_object(&self, obis_code: &ObisCode) -> DlmsResult<()> {
        let stopped = self.stop_capture(obis_code).await;
        self.profiles.write().await.remove(obis_code);
        self.objects.remove(obis_code).await;
        stopped
    }

    /// Find an object by OBIS code
    pub async fn find_object(&self, obis_code: &ObisCode) -> Option<Arc<dyn CosemObject>> {
        self.objects.get(obis_code).await
    }

    /// Find a registered profile by OBIS code
    pub async fn find_profile(&self, obis_code: &ObisCode) -> Option<Arc<ProfileGeneric>> {
        self.profiles.read().await.get(obis_code).cloned()
    }

    async fn profile(&self, obis_code: &ObisCode) -> DlmsResult<Arc<ProfileGeneric>> {
        self.find_profile(obis_code).await.ok_or_else(|| {
            DlmsError::InvalidData(format!("No profile registered with OBIS code {}", obis_code))
        })
    }

    /// Start periodic capture of a registered profile
    ///
    /// # Errors
    /// - `InvalidData` if no profile is registered under `obis_code`
    /// - `SchedulerActive` if the profile is already being captured
    pub async fn start_capture(&self, obis_code: &ObisCode) -> DlmsResult<()> {
        let profile = self.profile(obis_code).await?;
        let mut handles = self.handles.write().await;
        let handle = self.scheduler.start(profile)?;
        handles.insert(*obis_code, handle);
        Ok(())
    }

    /// Stop periodic capture of a profile and wait for the loop to exit
    ///
    /// Stopping a profile that is not being captured is a no-op.
    pub async fn stop_capture(&self, obis_code: &ObisCode) -> DlmsResult<()> {
        let handle = self.handles.write().await.remove(obis_code);
        match handle {
            Some(handle) => {
                handle.stop();
                handle.join().await
            }
            None => Ok(()),
        }
    }

    /// Capture a profile now
    ///
    /// Wakes the profile's scheduler when one is running, otherwise captures
    /// directly and reports the capture result.
    pub async fn trigger_capture(&self, obis_code: &ObisCode) -> DlmsResult<()> {
        if self.scheduler.wake_target(obis_code) {
            return Ok(());
        }
        let profile = self.profile(obis_code).await?;
        profile.capture().await
    }

    pub fn is_capturing(&self, obis_code: &ObisCode) -> bool {
        self.scheduler.is_active(obis_code)
    }

    /// Capture counters of a running scheduler
    pub fn capture_statistics(&self, obis_code: &ObisCode) -> Option<CaptureStatistics> {
        self.scheduler.statistics(obis_code)
    }

    /// Stop all captures and wait for their loops to exit
    pub async fn shutdown(&self) {
        let handles: Vec<_> = self.handles.write().await.drain().map(|(_, handle)| handle).collect();
        self.scheduler.shutdown().await;
        for handle in handles {
            if let Err(e) = handle.join().await {
                log::warn!("Error while shutting down capture: {}", e);
            }
        }
        log::info!("DLMS server captures shut down");
    }
}

impl Default for DlmsServer {
    fn default() -> Self {
        Self::new()
    }
}
