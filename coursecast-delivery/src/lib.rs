// CourseCast Delivery Clients
//
// Pure HTTP clients for the external delivery services the playback core
// consumes: the signing service (signed gateway URLs for private
// content-addressed objects), the stream-source service (playback-session
// sources for managed adaptive streams), and the progress-tracking
// collaborator. These clients hold no session state and run no timers;
// credential lifecycle policy lives entirely in coursecast-core.

// Shared error types
pub mod error;

// Shared HTTP pool
mod http;

// HTTP clients
pub mod progress;
pub mod signing;
pub mod stream;

// Re-export client types for convenience
pub use error::DeliveryClientError;
pub use progress::ProgressClient;
pub use signing::{SignedUrl, SigningClient};
pub use stream::{StreamSource, StreamSourceClient};
