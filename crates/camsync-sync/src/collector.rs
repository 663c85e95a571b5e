//! Snapshot collection: which streams exist right now.
//!
//! For every group in the camera map the directory is asked which devices are
//! online, and one endpoint is built per (device, channel). A failing group is
//! logged and skipped; it never aborts the other groups.

use std::fmt;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use camsync_core::{CameraGroup, CameraMap, NamingMode, Session, Snapshot, StreamEndpoint, UrlBuilder};

use crate::error::{Result, SyncError};

/// Identifier space a group key may belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdSpace {
    /// Terminal (DVR) id.
    Device,
    /// Vehicle id / plate.
    Vehicle,
}

impl IdSpace {
    /// Priority order used when resolving a key.
    pub const ORDER: [IdSpace; 2] = [IdSpace::Device, IdSpace::Vehicle];
}

impl fmt::Display for IdSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdSpace::Device => f.write_str("device"),
            IdSpace::Vehicle => f.write_str("vehicle"),
        }
    }
}

/// Online-status lookup on the video platform.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// Online device ids for `key` interpreted in `space`.
    async fn query_online(&self, session: &Session, space: IdSpace, key: &str) -> Result<Vec<String>>;

    /// Last-resort whole-status query for `key`.
    async fn query_status(&self, session: &Session, key: &str) -> Result<Vec<String>>;

    /// Resolve `key` across id spaces in priority order, then the status
    /// query. First non-empty answer wins.
    async fn online_devices(&self, session: &Session, key: &str) -> Result<Vec<String>> {
        for space in IdSpace::ORDER {
            let ids = self.query_online(session, space, key).await?;
            if !ids.is_empty() {
                debug!(key, %space, count = ids.len(), "resolved online devices");
                return Ok(ids);
            }
        }
        self.query_status(session, key).await
    }
}

/// Snapshot plus per-group bookkeeping for one collection pass.
#[derive(Debug, Clone, Default)]
pub struct CollectReport {
    pub snapshot: Snapshot,
    /// Groups queried.
    pub groups: usize,
    /// Groups whose query failed.
    pub failed: Vec<String>,
    /// Groups with no device online.
    pub offline: Vec<String>,
    /// Online devices across all groups.
    pub devices: usize,
}

/// Builds the current snapshot from the directory and a URL builder.
pub struct SnapshotCollector<D: DeviceDirectory, U: UrlBuilder> {
    directory: D,
    url_builder: U,
    camera_map: CameraMap,
    naming: NamingMode,
    stream: u32,
    concurrency: usize,
}

impl<D: DeviceDirectory, U: UrlBuilder> SnapshotCollector<D, U> {
    pub fn new(directory: D, url_builder: U, camera_map: CameraMap) -> Self {
        Self {
            directory,
            url_builder,
            camera_map,
            naming: NamingMode::default(),
            stream: 1,
            concurrency: 1,
        }
    }

    pub fn with_naming(mut self, naming: NamingMode) -> Self {
        self.naming = naming;
        self
    }

    /// Stream index to request (main/sub stream).
    pub fn with_stream(mut self, stream: u32) -> Self {
        self.stream = stream;
        self
    }

    /// Number of groups queried at once. Output order is unaffected.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn camera_map(&self) -> &CameraMap {
        &self.camera_map
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Collect the snapshot for every configured group.
    ///
    /// Fails only when the map is non-empty and every group's query errored.
    pub async fn collect(&self, session: &Session) -> Result<CollectReport> {
        let groups = self.camera_map.groups();

        let lookups: Vec<(&CameraGroup, Result<Vec<String>>)> = stream::iter(groups)
            .map(|group| async move {
                let devices = self.directory.online_devices(session, &group.key).await;
                (group, devices)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = CollectReport {
            groups: groups.len(),
            ..CollectReport::default()
        };

        for (group, lookup) in lookups {
            let devices = match lookup {
                Ok(devices) => devices,
                Err(e) => {
                    warn!(key = %group.key, error = %e, "device lookup failed, skipping group");
                    report.failed.push(group.key.clone());
                    continue;
                }
            };

            if devices.is_empty() {
                warn!(key = %group.key, "no device online");
                report.offline.push(group.key.clone());
                continue;
            }

            report.devices += devices.len();
            for device in &devices {
                for spec in &group.channels {
                    let url = self.url_builder.build(session, device, spec.channel, self.stream);
                    let name = self
                        .naming
                        .endpoint_name(&group.key, device, spec.channel, &spec.label);
                    report.snapshot.push(StreamEndpoint { name, url });
                }
            }
        }

        if report.groups > 0 && report.failed.len() == report.groups {
            return Err(SyncError::CollectFailed {
                groups: report.groups,
            });
        }

        info!(
            groups = report.groups,
            failed = report.failed.len(),
            offline = report.offline.len(),
            devices = report.devices,
            endpoints = report.snapshot.len(),
            "snapshot collected"
        );
        Ok(report)
    }
}
