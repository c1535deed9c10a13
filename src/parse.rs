//! Parsers for `adb` text output.
//!
//! Every function here is pure: raw text in, typed value out. None of them
//! fail. When the expected structure is missing they fall back to a sentinel
//! (`"N/A"`), `None`, or zero, so a partially readable device still yields a
//! partially filled record.
//!
//! The parsers are intentionally as loose as the tool output they read.
//! They are positional and do not validate the shape of each line beyond
//! the minimum token counts documented on each function.

use serde::Serialize;

/// Value reported by [`extract_value`] when a key is absent.
pub const NOT_AVAILABLE: &str = "N/A";

// ── Device list ──────────────────────────────────────────────────────

/// Connection state from the second column of `adb devices -l`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    /// `device`: online and authorized.
    Connected,
    Offline,
    Unauthorized,
    /// Anything else `adb` reports (`recovery`, `sideload`, `no`, ...),
    /// kept verbatim.
    Other(String),
}

impl DeviceStatus {
    pub fn from_token(token: &str) -> Self {
        match token {
            "device" => Self::Connected,
            "offline" => Self::Offline,
            "unauthorized" => Self::Unauthorized,
            other => Self::Other(other.to_string()),
        }
    }

    /// The token exactly as `adb` prints it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => "device",
            Self::Offline => "offline",
            Self::Unauthorized => "unauthorized",
            Self::Other(s) => s,
        }
    }
}

impl Serialize for DeviceStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One row of `adb devices -l`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub id: String,
    pub status: DeviceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
}

/// Parse `adb devices -l`.
///
/// The first line is always discarded as the header. Each remaining
/// non-blank line is split on whitespace: token 0 is the serial, token 1 the
/// status, and later `key:value` tokens fill `model`, `product` and
/// `transport` (other keys such as `device:` or `transport_id:` are
/// ignored). Lines with fewer than two tokens are skipped.
///
/// ```text
/// List of devices attached
/// emulator-5554          device product:sdk_gphone64 model:sdk_gphone64 transport_id:1
/// ```
pub fn parse_device_list(output: &str) -> Vec<DeviceRecord> {
    let mut devices = Vec::new();

    for line in output.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let mut device = DeviceRecord {
            id: parts[0].to_string(),
            status: DeviceStatus::from_token(parts[1]),
            model: None,
            product: None,
            transport: None,
        };

        for token in &parts[2..] {
            let mut kv = token.split(':');
            let key = kv.next().unwrap_or_default();
            let value = kv.next().map(String::from);
            match key {
                "model" => device.model = value,
                "product" => device.product = value,
                "transport" => device.transport = value,
                _ => {}
            }
        }

        devices.push(device);
    }

    devices
}

// ── key: value blocks ────────────────────────────────────────────────

/// Find the first `key: value` occurrence in `text` and return the value.
///
/// Matching is case-sensitive and line-local; the key may appear anywhere
/// in the line (`dumpsys` indents its fields). Returns [`NOT_AVAILABLE`] when
/// no line carries a non-empty value for the key.
pub fn extract_value(text: &str, key: &str) -> String {
    let needle = format!("{key}:");
    text.lines()
        .filter_map(|line| {
            let idx = line.find(&needle)?;
            let value = line[idx + needle.len()..].trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .next()
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

// ── Directory listing ────────────────────────────────────────────────

/// One entry of `ls -la`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub permissions: String,
    pub size: String,
    pub date: String,
    pub name: String,
}

/// Parse `ls -la` output.
///
/// The first line (`total N`) is dropped. Remaining lines need at least
/// nine whitespace tokens:
///
/// ```text
/// 0:perms 1:links 2:owner 3:group 4:size 5..=7:date 8..:name
/// ```
///
/// Tokens 5–7 are joined as the date, tokens 8 onward are re-joined with
/// single spaces as the name. Shorter lines are dropped silently.
pub fn parse_directory_listing(output: &str) -> Vec<FileEntry> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 9 {
                return None;
            }
            Some(FileEntry {
                permissions: parts[0].to_string(),
                size: parts[4].to_string(),
                date: parts[5..8].join(" "),
                name: parts[8..].join(" "),
            })
        })
        .collect()
}

// ── Package list ─────────────────────────────────────────────────────

const PACKAGE_PREFIX: &str = "package:";

/// Parse `pm list packages`: strip the `package:` prefix from each line and
/// drop blanks.
pub fn parse_package_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.replacen(PACKAGE_PREFIX, "", 1).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

// ── Pattern extractors ───────────────────────────────────────────────

/// First `versionName=<non-space>` in `dumpsys package` output.
pub fn parse_version_name(output: &str) -> Option<String> {
    let idx = output.find("versionName=")?;
    let value: String = output[idx + "versionName=".len()..]
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    (!value.is_empty()).then_some(value)
}

/// First `versionCode=<digits>` in `dumpsys package` output.
pub fn parse_version_code(output: &str) -> Option<u64> {
    let idx = output.find("versionCode=")?;
    leading_digits(&output[idx + "versionCode=".len()..])?
        .parse()
        .ok()
}

/// First `<W>x<H>` pair in `wm size` output (`Physical size: 1080x2400`).
/// Returns `(0, 0)` when no pair is present.
pub fn parse_screen_size(output: &str) -> (u32, u32) {
    let bytes = output.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() && (i == 0 || !bytes[i - 1].is_ascii_digit()) {
            let rest = &output[i..];
            if let Some(width) = leading_digits(rest) {
                let after = &rest[width.len()..];
                if let Some(height) = after.strip_prefix('x').and_then(leading_digits) {
                    if let (Ok(w), Ok(h)) = (width.parse(), height.parse()) {
                        return (w, h);
                    }
                }
                i += width.len();
                continue;
            }
        }
        i += 1;
    }
    (0, 0)
}

/// Leading integer of `getprop ro.build.version.sdk`; `0` if not numeric.
pub fn parse_api_level(output: &str) -> u32 {
    let trimmed = output.trim_start();
    leading_digits(trimmed)
        .and_then(|d| d.parse().ok())
        .unwrap_or(0)
}

/// Battery percentage from `dumpsys battery`, if the `level:` field is numeric.
pub fn parse_battery_level(output: &str) -> Option<u32> {
    extract_value(output, "level").parse().ok()
}

fn leading_digits(s: &str) -> Option<&str> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    (end > 0).then(|| &s[..end])
}

// ── Records built from dumpsys ───────────────────────────────────────

/// Fields of `dumpsys battery`, each [`NOT_AVAILABLE`] when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatteryInfo {
    pub level: String,
    pub scale: String,
    pub status: String,
    pub health: String,
    pub present: String,
    pub plugged: String,
    pub voltage: String,
    pub temperature: String,
    pub technology: String,
}

pub fn parse_battery_info(output: &str) -> BatteryInfo {
    BatteryInfo {
        level: extract_value(output, "level"),
        scale: extract_value(output, "scale"),
        status: extract_value(output, "status"),
        health: extract_value(output, "health"),
        present: extract_value(output, "present"),
        plugged: extract_value(output, "plugged"),
        voltage: extract_value(output, "voltage"),
        temperature: extract_value(output, "temperature"),
        technology: extract_value(output, "technology"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub package_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_code: Option<u64>,
    pub installed: bool,
}

/// Build [`AppInfo`] from `dumpsys package <pkg>` output.
pub fn parse_app_info(package_name: &str, output: &str) -> AppInfo {
    AppInfo {
        package_name: package_name.to_string(),
        version_name: parse_version_name(output),
        version_code: parse_version_code(output),
        installed: !output.contains("Unable to find package"),
    }
}
