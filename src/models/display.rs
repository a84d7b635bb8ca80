use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::EndpointDescriptor;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NOT_APPLICABLE: &str = "N/A";

/// Flat record handed to the rendering collaborator after each cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub server_address: String,
    pub location: String,
    pub node_type: String,
    pub test_time: String,
    pub qr_content: String,
}

impl DisplayRecord {
    /// Record describing the node selected this cycle
    pub fn for_descriptor(descriptor: &EndpointDescriptor, at: DateTime<Local>) -> Self {
        Self {
            server_address: descriptor.host().to_string(),
            location: descriptor.label().to_string(),
            node_type: descriptor.scheme().display_name().to_string(),
            test_time: at.format(TIME_FORMAT).to_string(),
            qr_content: descriptor.raw_uri().to_string(),
        }
    }

    /// Record shown when no node could be selected
    pub fn placeholder(message: &str, qr_content: &str, at: DateTime<Local>) -> Self {
        Self {
            server_address: message.to_string(),
            location: NOT_APPLICABLE.to_string(),
            node_type: NOT_APPLICABLE.to_string(),
            test_time: at.format(TIME_FORMAT).to_string(),
            qr_content: qr_content.to_string(),
        }
    }
}

/// What a refresh cycle published, as exposed on the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Outcome name: selected, none_reachable, empty_source or no_source_file
    pub outcome: String,
    pub record: DisplayRecord,
}
