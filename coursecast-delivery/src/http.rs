//! Shared HTTP client pool for all delivery requests.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Client;

/// Shared HTTP client for all delivery service requests (connection pooling).
/// Redirects are disabled: the delivery services answer directly, and a
/// redirect on a signed-URL endpoint would leak the request elsewhere.
static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build shared delivery HTTP client")
});

/// Handle to the shared pool. Clients keep their own copy so tests can
/// swap in a differently configured instance per client.
pub(crate) fn shared_client() -> Client {
    SHARED_CLIENT.clone()
}
