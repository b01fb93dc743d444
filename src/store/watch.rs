use crate::GroupVersionResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Added,
    Modified,
    Deleted,
}

/// Change notification published by [`Client`](super::Client) after a
/// successful write reached the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub resource: GroupVersionResource,
    pub namespace: String,
    pub name: String,
}
