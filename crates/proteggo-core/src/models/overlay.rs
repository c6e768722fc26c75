use serde::{Deserialize, Serialize};

/// Obscured overlay descriptor returned to clients.
///
/// An empty descriptor (all fields `""`) means no overlay exists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObscuredOverlay {
    pub id: String,
    pub url: String,
    pub storage_path: String,
}

impl ObscuredOverlay {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.storage_path.is_empty()
    }
}

/// Border overlay descriptor for one image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacesOverlay {
    pub overlay_id: String,
    pub overlay_url: String,
    pub overlay_storage_path: String,
    pub width: u32,
    pub height: u32,
}

/// Which overlay a compositor call renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStyle {
    /// Fixed-thickness outline per face.
    Border,
    /// Filled opaque rectangle per face.
    Obscure,
}
