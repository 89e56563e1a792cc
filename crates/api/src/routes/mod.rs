//! Route handlers

pub mod camera;
pub mod control;
pub mod gallery;
pub mod status;

use serde::Deserialize;

/// `pin` query parameter carried by every viewer request
#[derive(Debug, Default, Deserialize)]
pub struct PinQuery {
    pub pin: Option<String>,
}
