//! Shared presentation session
//!
//! One document, one current page, many viewers. A command flows
//! gateway → broadcaster → state, and the resulting snapshot fans out
//! through the viewer registry.
//!
//! ```text
//!  HTTP / WebSocket
//!        │
//!        ▼
//!  SessionGateway ──► DocumentStore, RenderPort, RelayPort
//!        │
//!        ▼
//!  SyncBroadcaster ──► SessionState   (mutate under the command lock)
//!        │
//!        ▼
//!  ViewerRegistry ──► viewer queues   (non-blocking fan-out)
//! ```

mod broadcaster;
mod error;
mod gateway;
mod registry;
mod state;

pub use broadcaster::SyncBroadcaster;
pub use error::{SessionError, SessionResult};
pub use gateway::{SessionGateway, ViewerConnection};
pub use registry::{
    BroadcastReport, Delivery, Viewer, ViewerHandle, ViewerReceiver, ViewerRegistry,
    DEFAULT_VIEWER_BUFFER,
};
pub use state::{DocumentHandle, SessionSnapshot, SessionState, NO_DOCUMENT_SENTINEL};
