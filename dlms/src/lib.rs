//! DLMS/COSEM object layer with periodic profile capture
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `dlms-core`: Core types (OBIS codes, data objects) and error handling
//! - `dlms-interface`: COSEM interface classes and the capture contract
//! - `dlms-server`: Object host and background capture scheduler
//!
//! # Usage
//!
//! ```no_run
//! use dlms::interface::ProfileGeneric;
//! use dlms::server::DlmsServer;
//!
//! # async fn demo() -> dlms::DlmsResult<()> {
//! let server = DlmsServer::new();
//! server.register_profile(ProfileGeneric::with_default_obis(96)).await?;
//! server.start_capture(&ProfileGeneric::default_obis()).await?;
//! # Ok(())
//! # }
//! ```

pub use dlms_core::datatypes::*;
pub use dlms_core::{DlmsError, DlmsResult, ObisCode};

pub mod server {
    pub use dlms_server::*;
}

pub mod interface {
    pub use dlms_interface::*;
}
