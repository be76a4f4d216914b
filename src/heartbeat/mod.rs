pub mod payload;
pub mod reporter;
pub mod state;
pub mod stats;
mod ticker;
pub mod transport;
pub mod visibility;


pub use payload::{HeartbeatPayload, SessionCoordinates};
pub use reporter::ActivityReporter;
pub use state::{ReporterState, ReporterStatus};
pub use stats::{DeliverySnapshot, DeliveryStats};
pub use transport::{DeliveryOutcome, HeartbeatTransport, TransportError};
pub use visibility::{TabVisibility, VisibilityGate, VisibilitySource};
