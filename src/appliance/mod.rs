//! Network Appliance: the gateway LXC container fronting every deployed
//! application with DHCP, DNS, NAT, and a reverse proxy.

mod bootstrap;
mod errors;
mod health;
mod info;

pub use bootstrap::Bootstrap;
pub use errors::{ApplianceError, Result};
pub use health::verify_health;
pub use info::ApplianceHandle;
