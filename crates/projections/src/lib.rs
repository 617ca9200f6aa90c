//! Read side of the lending platform.
//!
//! This crate provides the [`QueryProjector`], which serves the denormalized
//! views clients read directly, bypassing the lifecycle manager:
//! - instrument catalog per owner, with mean review rating
//! - discovery feed of instruments a user may still request
//! - a borrower's merged timeline of pending requests and active loans
//! - instruments a requester is waiting on
//! - pending requests per instrument with requester contact details

pub mod error;
pub mod projector;
pub mod view;

pub use error::{ProjectionError, Result};
pub use projector::QueryProjector;
pub use view::View;
