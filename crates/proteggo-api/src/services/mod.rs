//! Business logic behind the HTTP handlers.

pub mod maintenance;
pub mod overlays;
pub mod upload;

pub use maintenance::{DeleteImagesRequest, ImagePathsPage, ListImagesQuery, MaintenanceService};
pub use overlays::{
    ConfirmObscuredOutcome, ConfirmObscuredRequest, DeleteFacesRequest, DeleteOutcome,
    ImagesIdsRequest, OverlayService, TempObscuredOverlayRequest,
};
pub use upload::{UploadOutcome, UploadService, UploadedFile};
