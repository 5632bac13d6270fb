//! Analytics over the canonical activity stream: timeline reconciliation,
//! missing-person and policy alerts, occupancy forecasting, next-location
//! prediction, and face-identity matching.
//!
//! Every computation here is self-contained per request: it reads a snapshot
//! of rows, trains an ephemeral in-process model where one is needed, and
//! returns. No model is cached or shared across requests.

pub mod alerts;
pub mod face;
pub mod features;
pub mod forest;
pub mod narrative;
pub mod occupancy;
pub mod predict;
pub mod timeline;
