//! Demo scenarios.  Each builds its own node so they run independently.

pub mod lifecycle;
pub mod outage;
pub mod tamper;
