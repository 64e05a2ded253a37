/// mDNS service types a Boom server may advertise under, depending on its version
pub const BOOM2_SERVICE_TYPE: &str = "_boom2._tcp.local.";
pub const BOOM3_SERVICE_TYPE: &str = "_boom3._tcp.local.";
pub const SERVICE_TYPES: [&str; 2] = [BOOM2_SERVICE_TYPE, BOOM3_SERVICE_TYPE];

/// Prefix of the plain-text line that opens every connection
pub const HANDSHAKE_PREFIX: &str = "1.3-";

/// Handshake ack body sent by a server that approved the client
pub const HANDSHAKE_ACCEPTED: &str = "Accepted";

/// Every frame starts with two little-endian u32s: an opaque tag and the body length
pub const HEADER_LEN: usize = 8;

/// Tag written into the first header word of every outbound request.
/// Its meaning is unknown; servers reject requests without it.
pub const REQUEST_TAG: u32 = 17;

/// `RemoteRequestType` of the "set active preset" command
pub const SET_ACTIVE_PRESET_REQUEST: u32 = 23;

/// Preset name keys: the active preset carries `PresetName`, list entries `PresetDisplayName`
pub const KEY_PRESET_NAME: &str = "PresetName";
pub const KEY_PRESET_DISPLAY_NAME: &str = "PresetDisplayName";
