// SPDX-License-Identifier: GPL-3.0-only

//! PipeWire camera enumeration
//!
//! Cameras are discovered by parsing `pw-cli ls Node`. The sensor placement
//! (`api.libcamera.location`) is only reported by `pw-cli info <id>`, so it
//! is queried per node.

use super::super::types::{CameraDevice, CameraFacing};
use tracing::{debug, info, warn};

/// Whether GStreamer and its `pipewiresrc` element are usable
pub fn is_pipewire_available() -> bool {
    if gstreamer::init().is_err() {
        warn!("GStreamer init failed");
        return false;
    }
    gstreamer::ElementFactory::find("pipewiresrc").is_some()
}

/// Enumerate cameras using PipeWire
///
/// Returns `None` when PipeWire is unusable. When PipeWire works but
/// `pw-cli` is missing, a single default camera is returned and PipeWire
/// picks the device itself.
pub fn enumerate_pipewire_cameras() -> Option<Vec<CameraDevice>> {
    if !is_pipewire_available() {
        debug!("pipewiresrc not available");
        return None;
    }

    if let Some(cameras) = try_enumerate_with_pw_cli() {
        return Some(cameras);
    }

    info!("Using PipeWire auto-selection (default camera)");
    Some(vec![CameraDevice {
        name: "Default Camera (PipeWire)".to_string(),
        path: String::new(),
        facing: CameraFacing::External,
    }])
}

fn try_enumerate_with_pw_cli() -> Option<Vec<CameraDevice>> {
    let output = std::process::Command::new("pw-cli")
        .args(["ls", "Node"])
        .output()
        .ok()?;

    if !output.status.success() {
        debug!("pw-cli command failed");
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let cameras: Vec<CameraDevice> = parse_video_sources(&stdout)
        .into_iter()
        .map(|node| {
            let facing = query_node_location(&node.id);
            debug!(id = %node.id, name = %node.name, %facing, "Found video camera");
            CameraDevice {
                path: node.target_path(),
                name: node.name,
                facing,
            }
        })
        .collect();

    if cameras.is_empty() {
        debug!("No cameras found via pw-cli");
        None
    } else {
        Some(cameras)
    }
}

/// A `Video/Source` node from `pw-cli ls Node`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VideoSourceNode {
    pub id: String,
    pub serial: Option<String>,
    pub name: String,
}

impl VideoSourceNode {
    /// Path understood by the pipeline builder
    fn target_path(&self) -> String {
        match &self.serial {
            Some(serial) => format!("pipewire-serial-{}", serial),
            None => format!("pipewire-{}", self.id),
        }
    }
}

/// Parse the output of `pw-cli ls Node` into its video sources
pub(crate) fn parse_video_sources(listing: &str) -> Vec<VideoSourceNode> {
    #[derive(Default)]
    struct Pending {
        id: Option<String>,
        serial: Option<String>,
        name: Option<String>,
        nick: Option<String>,
        is_video_source: bool,
    }

    fn finish(pending: Pending, out: &mut Vec<VideoSourceNode>) {
        if !pending.is_video_source {
            return;
        }
        let Some(id) = pending.id else { return };
        let Some(name) = pending.name.or(pending.nick) else {
            return;
        };
        out.push(VideoSourceNode {
            id,
            serial: pending.serial,
            name,
        });
    }

    let mut nodes = Vec::new();
    let mut current = Pending::default();

    for line in listing.lines() {
        let trimmed = line.trim();

        // "id 76, type PipeWire:Interface:Node/3"
        if let Some(rest) = trimmed.strip_prefix("id ")
            && trimmed.contains("type PipeWire:Interface:Node")
        {
            finish(std::mem::take(&mut current), &mut nodes);
            current.id = rest.split(',').next().map(|id| id.trim().to_string());
            continue;
        }

        let Some((key, _)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = extract_quoted_value(trimmed);

        match key {
            "media.class" => current.is_video_source = value.as_deref() == Some("Video/Source"),
            "object.serial" => current.serial = value,
            "node.description" => current.name = value,
            "node.nick" => current.nick = value,
            _ => {}
        }
    }
    finish(current, &mut nodes);

    nodes
}

/// Extract quoted value from a property line (e.g., 'property = "value"' -> "value")
fn extract_quoted_value(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let end = line[start + 1..].find('"')?;
    Some(line[start + 1..start + 1 + end].to_string())
}

fn query_node_location(node_id: &str) -> CameraFacing {
    let output = match std::process::Command::new("pw-cli")
        .args(["info", node_id])
        .output()
    {
        Ok(output) if output.status.success() => output,
        _ => {
            debug!(node_id, "Failed to query node info for location");
            return CameraFacing::External;
        }
    };

    parse_location(&String::from_utf8_lossy(&output.stdout))
}

/// Find the sensor placement in `pw-cli info` output
pub(crate) fn parse_location(info: &str) -> CameraFacing {
    info.lines()
        .map(str::trim)
        .find(|line| {
            line.contains("api.libcamera.location") || line.contains("camera.location")
        })
        .and_then(extract_quoted_value)
        .map(|value| CameraFacing::from_location(&value))
        .unwrap_or(CameraFacing::External)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
	id 31, type PipeWire:Interface:Node/3
 		object.serial = "31"
 		factory.id = "19"
 		node.description = "Dummy-Driver"
 		node.name = "Dummy-Driver"
 		media.class = "Audio/Sink"
	id 64, type PipeWire:Interface:Node/3
 		object.serial = "2146"
 		object.path = "v4l2:/dev/video0"
 		node.description = "Integrated Camera (V4L2)"
 		node.nick = "Integrated Camera"
 		media.class = "Video/Source"
	id 71, type PipeWire:Interface:Node/3
 		node.nick = "ov5675"
 		media.class = "Video/Source"
"#;

    #[test]
    fn test_parse_video_sources() {
        let nodes = parse_video_sources(LISTING);
        assert_eq!(nodes.len(), 2);

        assert_eq!(nodes[0].id, "64");
        assert_eq!(nodes[0].name, "Integrated Camera (V4L2)");
        assert_eq!(nodes[0].target_path(), "pipewire-serial-2146");

        // No description, no serial: falls back to nick and node id
        assert_eq!(nodes[1].name, "ov5675");
        assert_eq!(nodes[1].target_path(), "pipewire-71");
    }

    #[test]
    fn test_parse_location() {
        let info = "  * \t\tapi.libcamera.location = \"back\"\n";
        assert_eq!(parse_location(info), CameraFacing::Back);
        assert_eq!(parse_location("nothing here"), CameraFacing::External);
    }

    #[test]
    fn test_parse_location_with_changed_marker() {
        let info = "\t  properties:\n\t*\t\tcamera.location = \"front\"\n";
        assert_eq!(parse_location(info), CameraFacing::Front);
    }

    #[test]
    fn test_extract_quoted_value() {
        assert_eq!(
            extract_quoted_value("node.nick = \"Webcam\""),
            Some("Webcam".to_string())
        );
        assert_eq!(extract_quoted_value("no quotes"), None);
    }
}
