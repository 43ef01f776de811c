// SPDX-License-Identifier: GPL-3.0-only

//! Camera and storage permissions
//!
//! Inside a Flatpak sandbox camera access goes through the XDG desktop
//! portal (`org.freedesktop.portal.Camera`), which shows the prompt and
//! remembers the answer. Outside a sandbox there is no prompt; access is
//! whatever the device nodes and directories allow.

use crate::constants::app_info;
use crate::storage;
use futures::StreamExt;
use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

const PORTAL_DESTINATION: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const CAMERA_INTERFACE: &str = "org.freedesktop.portal.Camera";
const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";

/// A permission gating one of the scanner's features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Live camera capture
    Camera,
    /// Reading images picked from storage
    StorageRead,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Camera => write!(f, "camera"),
            Permission::StorageRead => write!(f, "storage"),
        }
    }
}

/// Source of truth for permission state
///
/// `is_granted` must be cheap; it is called on the UI thread. `request`
/// shows whatever prompt the platform has and resolves once with the answer.
pub trait PermissionBroker: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;

    fn request(&self, permission: Permission) -> BoxFuture<'static, bool>;
}

/// Permissions of the running desktop session
#[derive(Debug, Clone)]
pub struct SystemPermissions {
    sandboxed: bool,
    /// Configured picker directory; storage access is checked where the
    /// picker actually opens
    picker_directory: Option<PathBuf>,
    /// Portal answers received during this run
    granted: Arc<Mutex<HashSet<Permission>>>,
}

impl SystemPermissions {
    pub fn new(picker_directory: Option<PathBuf>) -> Self {
        Self {
            sandboxed: app_info::is_flatpak(),
            picker_directory,
            granted: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn remembered(&self, permission: Permission) -> bool {
        self.granted
            .lock()
            .map(|granted| granted.contains(&permission))
            .unwrap_or(false)
    }
}

impl PermissionBroker for SystemPermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        match (permission, self.sandboxed) {
            (Permission::Camera, true) => self.remembered(permission),
            (Permission::Camera, false) => camera_nodes_accessible(Path::new("/dev")),
            // The file chooser portal hands out access per picked file
            (Permission::StorageRead, true) => true,
            (Permission::StorageRead, false) => storage_readable(&storage::picker_start_dir(
                self.picker_directory.as_deref(),
            )),
        }
    }

    fn request(&self, permission: Permission) -> BoxFuture<'static, bool> {
        let this = self.clone();

        async move {
            let answer = match (permission, this.sandboxed) {
                (Permission::Camera, true) => match access_camera_via_portal().await {
                    Ok(answer) => answer,
                    Err(e) => {
                        warn!(error = %e, "Camera portal request failed");
                        false
                    }
                },
                // No prompt exists outside a sandbox; re-check the system
                _ => this.is_granted(permission),
            };

            info!(%permission, granted = answer, "Permission request resolved");
            if answer && let Ok(mut set) = this.granted.lock() {
                set.insert(permission);
            }
            answer
        }
        .boxed()
    }
}

/// Ask the desktop portal for camera access
///
/// The request object path is derived from our unique bus name and a fresh
/// handle token, so the `Response` subscription is in place before the call
/// and the answer cannot be missed.
async fn access_camera_via_portal() -> Result<bool, zbus::Error> {
    let connection = zbus::Connection::session().await?;

    let sender = connection
        .unique_name()
        .map(|name| name.as_str().trim_start_matches(':').replace('.', "_"))
        .ok_or_else(|| zbus::Error::Failure("no unique bus name".to_string()))?;
    let token = format!("barcode_scanner_{}", uuid::Uuid::new_v4().simple());
    let request_path = format!("{}/request/{}/{}", PORTAL_PATH, sender, token);

    let request = zbus::Proxy::new(
        &connection,
        PORTAL_DESTINATION,
        request_path.as_str(),
        REQUEST_INTERFACE,
    )
    .await?;
    let mut responses = request.receive_signal("Response").await?;

    let camera = zbus::Proxy::new(&connection, PORTAL_DESTINATION, PORTAL_PATH, CAMERA_INTERFACE)
        .await?;

    match camera.get_property::<bool>("IsCameraPresent").await {
        Ok(false) => {
            debug!("Portal reports no camera present");
        }
        Ok(true) => {}
        Err(e) => debug!(error = %e, "IsCameraPresent not readable"),
    }

    let mut options: HashMap<&str, Value<'_>> = HashMap::new();
    options.insert("handle_token", Value::from(token.as_str()));
    let handle: OwnedObjectPath = camera.call("AccessCamera", &(options,)).await?;
    debug!(handle = %handle.as_str(), "AccessCamera request issued");

    let message = responses
        .next()
        .await
        .ok_or_else(|| zbus::Error::Failure("portal closed the request".to_string()))?;
    let (response, _results): (u32, HashMap<String, OwnedValue>) = message.body().deserialize()?;

    // 0 = granted, 1 = cancelled, 2 = other
    Ok(response == 0)
}

/// Whether the camera device nodes can be opened
///
/// With no `video*` node at all the permission is not the problem; the
/// camera session reports the missing camera itself.
pub(crate) fn camera_nodes_accessible(dev_dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dev_dir) else {
        return true;
    };

    let nodes: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("video"))
        })
        .collect();

    if nodes.is_empty() {
        return true;
    }

    nodes.iter().any(|node| {
        std::fs::OpenOptions::new()
            .read(true)
            .open(node)
            .map_err(|e| debug!(node = %node.display(), error = %e, "Camera node not accessible"))
            .is_ok()
    })
}

/// Whether images under `dir` can be listed
pub(crate) fn storage_readable(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_nodes_without_devices() {
        let dir = tempfile::tempdir().unwrap();
        assert!(camera_nodes_accessible(dir.path()));
    }

    #[test]
    fn test_camera_nodes_readable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("video0"), b"").unwrap();
        assert!(camera_nodes_accessible(dir.path()));
    }

    #[test]
    fn test_storage_readable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(storage_readable(dir.path()));
        assert!(!storage_readable(&dir.path().join("missing")));
    }

    #[test]
    fn test_storage_granted_when_picker_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let permissions = SystemPermissions {
            sandboxed: false,
            picker_directory: Some(dir.path().join("Pictures")),
            granted: Arc::new(Mutex::new(HashSet::new())),
        };

        assert!(permissions.is_granted(Permission::StorageRead));
    }

    #[test]
    fn test_permission_display() {
        assert_eq!(Permission::Camera.to_string(), "camera");
        assert_eq!(Permission::StorageRead.to_string(), "storage");
    }
}
