use std::collections::HashSet;

/// An immutable set of identifiers that readings must match to be kept.
///
/// An empty allowlist matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist(HashSet<String>);

impl Allowlist {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(items.into_iter().map(Into::into).collect())
    }

    /// Parses a comma-separated list, ignoring surrounding whitespace and empty items.
    pub fn from_csv(src: &str) -> Self {
        Self::new(
            src.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty()),
        )
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Block devices and network interfaces the host collectors report on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    /// Block devices, e.g. `/dev/sda`.
    pub devices: Allowlist,
    /// Network interfaces, e.g. `eth0`.
    pub interfaces: Allowlist,
}

impl DeviceFilter {
    pub fn new(devices: Allowlist, interfaces: Allowlist) -> Self {
        Self {
            devices,
            interfaces,
        }
    }
}
